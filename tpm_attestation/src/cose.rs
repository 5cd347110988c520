use ciborium::value::Value as CborValue;
use ring::digest;

use crate::errors::AttestationError;

// COSE_Key map labels (RFC 9053)
const COSE_KEY_KTY: i64 = 1;
const COSE_KEY_CRV: i64 = -1;
const COSE_KEY_X: i64 = -2;
const COSE_KEY_Y: i64 = -3;
const COSE_KEY_RSA_N: i64 = -1;
const COSE_KEY_RSA_E: i64 = -2;

const COSE_KTY_OKP: i64 = 1;
const COSE_KTY_EC2: i64 = 2;
const COSE_KTY_RSA: i64 = 3;

/// COSE algorithm identifiers accepted in the `alg` field of an attestation statement.
///
/// The identifier selects both the digest used for `extraData` and the
/// signature algorithm the AIK used over `certInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256 (-7)
    Es256,
    /// ECDSA w/ SHA-384 (-35)
    Es384,
    /// RSASSA-PSS w/ SHA-256 (-37)
    Ps256,
    /// RSASSA-PSS w/ SHA-384 (-38)
    Ps384,
    /// RSASSA-PSS w/ SHA-512 (-39)
    Ps512,
    /// RSASSA-PKCS1-v1_5 w/ SHA-256 (-257)
    Rs256,
    /// RSASSA-PKCS1-v1_5 w/ SHA-384 (-258)
    Rs384,
    /// RSASSA-PKCS1-v1_5 w/ SHA-512 (-259)
    Rs512,
    /// RSASSA-PKCS1-v1_5 w/ SHA-1 (-65535), common on Windows TPMs
    Rs1,
}

impl CoseAlgorithm {
    pub fn id(self) -> i64 {
        match self {
            CoseAlgorithm::Es256 => -7,
            CoseAlgorithm::Es384 => -35,
            CoseAlgorithm::Ps256 => -37,
            CoseAlgorithm::Ps384 => -38,
            CoseAlgorithm::Ps512 => -39,
            CoseAlgorithm::Rs256 => -257,
            CoseAlgorithm::Rs384 => -258,
            CoseAlgorithm::Rs512 => -259,
            CoseAlgorithm::Rs1 => -65535,
        }
    }

    fn digest_algorithm(self) -> &'static digest::Algorithm {
        match self {
            CoseAlgorithm::Es256 | CoseAlgorithm::Ps256 | CoseAlgorithm::Rs256 => &digest::SHA256,
            CoseAlgorithm::Es384 | CoseAlgorithm::Ps384 | CoseAlgorithm::Rs384 => &digest::SHA384,
            CoseAlgorithm::Ps512 | CoseAlgorithm::Rs512 => &digest::SHA512,
            CoseAlgorithm::Rs1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        }
    }

    /// Hashes `data` with the digest this algorithm signs over.
    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        digest::digest(self.digest_algorithm(), data)
            .as_ref()
            .to_vec()
    }

    /// The webpki verifier for this algorithm, or `None` for RS1, which
    /// webpki does not implement.
    pub(crate) fn signature_algorithm(self) -> Option<&'static webpki::SignatureAlgorithm> {
        match self {
            CoseAlgorithm::Es256 => Some(&webpki::ECDSA_P256_SHA256),
            CoseAlgorithm::Es384 => Some(&webpki::ECDSA_P384_SHA384),
            CoseAlgorithm::Ps256 => Some(&webpki::RSA_PSS_2048_8192_SHA256_LEGACY_KEY),
            CoseAlgorithm::Ps384 => Some(&webpki::RSA_PSS_2048_8192_SHA384_LEGACY_KEY),
            CoseAlgorithm::Ps512 => Some(&webpki::RSA_PSS_2048_8192_SHA512_LEGACY_KEY),
            CoseAlgorithm::Rs256 => Some(&webpki::RSA_PKCS1_2048_8192_SHA256),
            CoseAlgorithm::Rs384 => Some(&webpki::RSA_PKCS1_2048_8192_SHA384),
            CoseAlgorithm::Rs512 => Some(&webpki::RSA_PKCS1_2048_8192_SHA512),
            CoseAlgorithm::Rs1 => None,
        }
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = AttestationError;

    fn try_from(alg: i64) -> Result<Self, Self::Error> {
        match alg {
            -7 => Ok(CoseAlgorithm::Es256),
            -35 => Ok(CoseAlgorithm::Es384),
            -37 => Ok(CoseAlgorithm::Ps256),
            -38 => Ok(CoseAlgorithm::Ps384),
            -39 => Ok(CoseAlgorithm::Ps512),
            -257 => Ok(CoseAlgorithm::Rs256),
            -258 => Ok(CoseAlgorithm::Rs384),
            -259 => Ok(CoseAlgorithm::Rs512),
            -65535 => Ok(CoseAlgorithm::Rs1),
            _ => Err(AttestationError::Format(format!(
                "Unsupported algorithm for TPM attestation: {}",
                alg
            ))),
        }
    }
}

/// Credential public key taken from the attested credential data,
/// normalized from its COSE_Key encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPublicKey {
    /// Elliptic curve key with x and y coordinates (kty 2)
    Ec2 { curve: i64, x: Vec<u8>, y: Vec<u8> },
    /// RSA key; `exponent` holds the raw COSE `e` bytes (kty 3)
    Rsa { modulus: Vec<u8>, exponent: Vec<u8> },
    /// Octet key pair such as Ed25519 (kty 1)
    Okp { curve: i64, x: Vec<u8> },
}

impl CredentialPublicKey {
    pub fn key_type(&self) -> &'static str {
        match self {
            CredentialPublicKey::Ec2 { .. } => "EC2",
            CredentialPublicKey::Rsa { .. } => "RSA",
            CredentialPublicKey::Okp { .. } => "OKP",
        }
    }
}

impl TryFrom<&CborValue> for CredentialPublicKey {
    type Error = AttestationError;

    fn try_from(value: &CborValue) -> Result<Self, Self::Error> {
        let CborValue::Map(map) = value else {
            return Err(AttestationError::Format(
                "Credential public key is not a CBOR map".to_string(),
            ));
        };

        match cose_int(map, COSE_KEY_KTY, "kty")? {
            COSE_KTY_EC2 => Ok(CredentialPublicKey::Ec2 {
                curve: cose_int(map, COSE_KEY_CRV, "crv")?,
                x: cose_bytes(map, COSE_KEY_X, "x")?,
                y: cose_bytes(map, COSE_KEY_Y, "y")?,
            }),
            COSE_KTY_RSA => Ok(CredentialPublicKey::Rsa {
                modulus: cose_bytes(map, COSE_KEY_RSA_N, "n")?,
                exponent: cose_bytes(map, COSE_KEY_RSA_E, "e")?,
            }),
            COSE_KTY_OKP => Ok(CredentialPublicKey::Okp {
                curve: cose_int(map, COSE_KEY_CRV, "crv")?,
                x: cose_bytes(map, COSE_KEY_X, "x")?,
            }),
            kty => Err(AttestationError::UnsupportedKeyType(format!(
                "Unsupported COSE key type: {}",
                kty
            ))),
        }
    }
}

fn cose_label(map: &[(CborValue, CborValue)], label: i64) -> Option<&CborValue> {
    map.iter().find_map(|(key, value)| match key {
        CborValue::Integer(i) if i64::try_from(*i).ok() == Some(label) => Some(value),
        _ => None,
    })
}

fn cose_int(map: &[(CborValue, CborValue)], label: i64, name: &str) -> Result<i64, AttestationError> {
    match cose_label(map, label) {
        Some(CborValue::Integer(i)) => i64::try_from(*i).map_err(|_| {
            AttestationError::Format(format!("COSE key {} is out of range", name))
        }),
        Some(_) => Err(AttestationError::Format(format!(
            "COSE key {} must be an integer",
            name
        ))),
        None => Err(AttestationError::Format(format!(
            "Missing {} in credential public key",
            name
        ))),
    }
}

fn cose_bytes(
    map: &[(CborValue, CborValue)],
    label: i64,
    name: &str,
) -> Result<Vec<u8>, AttestationError> {
    match cose_label(map, label) {
        Some(CborValue::Bytes(b)) => Ok(b.clone()),
        Some(_) => Err(AttestationError::Format(format!(
            "COSE key {} must be a byte string",
            name
        ))),
        None => Err(AttestationError::Format(format!(
            "Missing {} in credential public key",
            name
        ))),
    }
}
