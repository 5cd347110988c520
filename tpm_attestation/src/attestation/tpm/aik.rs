use der_parser::der::parse_der;
use ring::signature::{self, UnparsedPublicKey};
use webpki::EndEntityCert;
use x509_parser::{extensions::X509Extension, prelude::*};

use crate::cose::CoseAlgorithm;
use crate::errors::AttestationError;

use super::san::{TpmDeviceAttributes, parse_san_extension};
use super::vendors::{TpmVendor, lookup_tpm_vendor};

// OID for TCG-KP-AIKCertificate: 2.23.133.8.3
const OID_TCG_KP_AIK_CERTIFICATE: &[u8] = &[0x67, 0x81, 0x05, 0x08, 0x03];
// OID for FIDO AAGUID extension: 1.3.6.1.4.1.45724.1.1.4
const OID_FIDO_GEN_CE_AAGUID: &[u8] = &[
    0x2B, 0x06, 0x01, 0x04, 0x01, 0x82, 0xE5, 0x1C, 0x01, 0x01, 0x04,
];

/// Facts established about a verified AIK certificate.
#[derive(Debug, Clone)]
pub(super) struct VerifiedAik {
    pub(super) attributes: TpmDeviceAttributes,
    pub(super) vendor: &'static TpmVendor,
}

/// Verifies `sig` over `cert_info` with the AIK certificate's key, then
/// checks the certificate against the TPM attestation profile.
pub(super) fn verify_aik_certificate(
    aik_cert_bytes: &[u8],
    alg: CoseAlgorithm,
    cert_info: &[u8],
    sig: &[u8],
    aaguid: &[u8; 16],
) -> Result<VerifiedAik, AttestationError> {
    verify_cert_info_signature(aik_cert_bytes, alg, cert_info, sig)?;

    let (_, cert) = X509Certificate::from_der(aik_cert_bytes).map_err(|e| {
        AttestationError::Format(format!("Failed to parse AIK certificate: {}", e))
    })?;

    // 1. Version must be 3
    if cert.version() != X509Version::V3 {
        return Err(AttestationError::Format(
            "AIK certificate version must be 3".to_string(),
        ));
    }

    // 2. Subject must be empty
    if !cert.subject().to_string().is_empty() {
        tracing::debug!("AIK certificate subject is not empty: {}", cert.subject());
        return Err(AttestationError::Format(
            "AIK certificate subject must be empty".to_string(),
        ));
    }

    // 3. Subject Alternative Name carries the TPM device attributes
    let san = find_extension(&cert, oid_registry::OID_X509_EXT_SUBJECT_ALT_NAME.as_bytes());
    let attributes = match san {
        Some(ext) => parse_san_extension(ext.value)?,
        None => TpmDeviceAttributes::default(),
    };
    if !attributes.is_complete() {
        return Err(AttestationError::Format(
            "Invalid SAN data in AIK certificate".to_string(),
        ));
    }

    let vendor = lookup_tpm_vendor(&attributes.manufacturer).ok_or_else(|| {
        tracing::debug!("Unknown TPM manufacturer: {}", attributes.manufacturer);
        AttestationError::Format("Invalid TPM manufacturer".to_string())
    })?;

    // 4. Extended Key Usage must lead with tcg-kp-AIKCertificate
    let eku = find_extension(&cert, oid_registry::OID_X509_EXT_EXTENDED_KEY_USAGE.as_bytes())
        .ok_or_else(|| AttestationError::Format("AIK certificate missing EKU".to_string()))?;
    verify_aik_eku(eku.value)?;

    // 5. Basic Constraints, when present, must not mark a CA
    let bc = find_extension(&cert, oid_registry::OID_X509_EXT_BASIC_CONSTRAINTS.as_bytes());
    if let Some(bc) = bc {
        if basic_constraints_is_ca(bc.value)? {
            return Err(AttestationError::Format(
                "AIK certificate basic constraints missing or CA is true".to_string(),
            ));
        }
    }

    // 6. AAGUID extension, when present, must match the authenticator
    if let Some(aaguid_ext) = find_extension(&cert, OID_FIDO_GEN_CE_AAGUID) {
        let cert_aaguid = extract_aaguid_from_extension(aaguid_ext)?;
        if &cert_aaguid != aaguid {
            return Err(AttestationError::Format(
                "AAGUID in AIK certificate does not match AAGUID in authenticator data"
                    .to_string(),
            ));
        }
    }

    Ok(VerifiedAik { attributes, vendor })
}

fn verify_cert_info_signature(
    aik_cert_bytes: &[u8],
    alg: CoseAlgorithm,
    cert_info: &[u8],
    sig: &[u8],
) -> Result<(), AttestationError> {
    let Some(signature_algorithm) = alg.signature_algorithm() else {
        return verify_legacy_rsa_signature(aik_cert_bytes, cert_info, sig);
    };

    let aik_cert = EndEntityCert::try_from(aik_cert_bytes).map_err(|e| {
        AttestationError::Format(format!("Error parsing certificate from ASN.1: {:?}", e))
    })?;

    aik_cert
        .verify_signature(signature_algorithm, cert_info, sig)
        .map_err(|e| {
            AttestationError::Signature(format!("Failed to verify TPM signature: {:?}", e))
        })
}

/// RSASSA-PKCS1-v1_5 with SHA-1, checked with ring against the RSAPublicKey
/// in the certificate's subjectPublicKeyInfo.
fn verify_legacy_rsa_signature(
    aik_cert_bytes: &[u8],
    cert_info: &[u8],
    sig: &[u8],
) -> Result<(), AttestationError> {
    let (_, cert) = X509Certificate::from_der(aik_cert_bytes).map_err(|e| {
        AttestationError::Format(format!("Error parsing certificate from ASN.1: {:?}", e))
    })?;

    let spki = cert.public_key();
    if spki.algorithm.algorithm.as_bytes() != oid_registry::OID_PKCS1_RSAENCRYPTION.as_bytes() {
        return Err(AttestationError::Signature(
            "Failed to verify TPM signature: RS1 requires an RSA AIK".to_string(),
        ));
    }

    let public_key = UnparsedPublicKey::new(
        &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        spki.subject_public_key.data.as_ref(),
    );
    public_key
        .verify(cert_info, sig)
        .map_err(|_| AttestationError::Signature("Failed to verify TPM signature".to_string()))
}

fn find_extension<'a>(
    cert: &'a X509Certificate<'a>,
    oid: &[u8],
) -> Option<&'a X509Extension<'a>> {
    cert.extensions().iter().find(|ext| ext.oid.as_bytes() == oid)
}

fn verify_aik_eku(value: &[u8]) -> Result<(), AttestationError> {
    let missing =
        || AttestationError::Format("AIK certificate EKU missing 2.23.133.8.3".to_string());

    let (rest, parsed) = parse_der(value).map_err(|_| missing())?;
    if !rest.is_empty() {
        return Err(missing());
    }

    // Every KeyPurposeId must be an OID, and the first one the AIK purpose
    let purposes = parsed
        .as_sequence()
        .map_err(|_| missing())?
        .iter()
        .map(|member| member.as_oid())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| missing())?;
    match purposes.first() {
        Some(oid) if oid.as_bytes() == OID_TCG_KP_AIK_CERTIFICATE => Ok(()),
        _ => Err(missing()),
    }
}

/// Decodes a BasicConstraints value and returns its cA flag
/// (DEFAULT FALSE when omitted).
fn basic_constraints_is_ca(value: &[u8]) -> Result<bool, AttestationError> {
    let malformed =
        || AttestationError::Format("AIK certificate basic constraints malformed".to_string());

    let (rest, parsed) = parse_der(value).map_err(|_| malformed())?;
    if !rest.is_empty() {
        return Err(AttestationError::Format(
            "AIK certificate basic constraints contains extra data".to_string(),
        ));
    }

    let items = parsed.as_sequence().map_err(|_| malformed())?;
    match items.first() {
        Some(item) => match item.as_bool() {
            Ok(is_ca) => Ok(is_ca),
            // Only pathLenConstraint present
            Err(_) if item.as_u32().is_ok() => Ok(false),
            Err(_) => Err(malformed()),
        },
        None => Ok(false),
    }
}

/// Extracts the AAGUID from an X509 extension.
fn extract_aaguid_from_extension(ext: &X509Extension) -> Result<[u8; 16], AttestationError> {
    let parsed = match parse_der(ext.value) {
        Ok((_, parsed)) => parsed,
        Err(_) => {
            return Err(AttestationError::Format(
                "Invalid AAGUID extension format".to_string(),
            ));
        }
    };

    if let der_parser::ber::BerObjectContent::OctetString(content) = &parsed.content {
        if content.len() == 16 {
            let mut aaguid = [0u8; 16];
            aaguid.copy_from_slice(content);
            return Ok(aaguid);
        }
    }

    Err(AttestationError::Format(
        "Invalid AAGUID extension format".to_string(),
    ))
}
