//! The `tpm` attestation statement format.
//!
//! Verification runs fail-fast in this order: statement fields, pubArea
//! against the credential key, certInfo, then the AIK signature and
//! certificate profile.

mod aik;
mod cert_info;
mod public_key;
mod san;
mod statement;
mod structures;
mod vendors;

pub use san::TpmDeviceAttributes;
pub use structures::{
    AttestationData, Attested, ClockInfo, PublicArea, SymmetricDefinition, TpmName,
    TpmPublicKey, TpmScheme,
};
pub use vendors::{TpmVendor, is_valid_tpm_manufacturer, lookup_tpm_vendor, tpm_vendors};

use crate::errors::AttestationError;
use crate::types::{AttestationObject, AttestationOutcome, AttestationType, TpmAttestationMetadata};

use aik::verify_aik_certificate;
use cert_info::verify_cert_info;
use public_key::verify_public_key_match;
use statement::TpmStatement;

/// Registry key for this format.
pub const TPM_FORMAT_KEY: &str = "tpm";

/// Verifies a `tpm` attestation statement.
///
/// # Arguments
/// * `att` - The attestation object, with its raw authenticator data and credential key
/// * `client_data_hash` - SHA-256 of the client data JSON
///
/// # Returns
/// * `Result<AttestationOutcome, AttestationError>` - The `attca` trust type with the
///   unmodified `x5c` chain, or the first check that failed
pub fn verify_tpm_format(
    att: &AttestationObject,
    client_data_hash: &[u8],
) -> Result<AttestationOutcome, AttestationError> {
    verify_tpm_statement(att, client_data_hash).inspect_err(|e| {
        tracing::warn!("TPM attestation rejected: {}", e);
    })
}

fn verify_tpm_statement(
    att: &AttestationObject,
    client_data_hash: &[u8],
) -> Result<AttestationOutcome, AttestationError> {
    let stmt = TpmStatement::try_from(att.att_stmt.as_slice())?;
    tracing::debug!(
        "TPM statement: alg {:?}, {} certificate(s)",
        stmt.alg,
        stmt.x5c.len()
    );

    // pubArea must describe the credential public key
    let public = PublicArea::decode(&stmt.pub_area)?;
    tracing::debug!("Decoded pubArea: {:?}", public);
    verify_public_key_match(&public, &att.credential_public_key)?;

    let attestation_data = verify_cert_info(
        &stmt.cert_info,
        &att.auth_data,
        client_data_hash,
        stmt.alg,
        &public,
    )?;

    let aaguid = att.aaguid()?;
    let aik = verify_aik_certificate(
        &stmt.x5c[0],
        stmt.alg,
        &stmt.cert_info,
        &stmt.sig,
        &aaguid,
    )?;

    let metadata = TpmAttestationMetadata {
        aaguid: TpmAttestationMetadata::aaguid_string(&aaguid),
        manufacturer_id: aik.attributes.manufacturer,
        vendor_name: aik.vendor.name.to_string(),
        vendor_code: aik.vendor.code.to_string(),
        model: aik.attributes.model,
        version: aik.attributes.version,
        firmware_version: attestation_data.firmware_version,
    };
    tracing::debug!("TPM attestation verified: {:?}", metadata);

    Ok(AttestationOutcome {
        attestation_type: AttestationType::AttCa,
        trust_path: stmt.x5c,
        tpm: Some(metadata),
    })
}
