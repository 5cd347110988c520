//! Verification of WebAuthn `tpm` attestation statements.
//!
//! A caller builds an [`AttestationFormats`] registry, adds the TPM verifier
//! with [`register_tpm_format`], and hands it decoded attestation objects:
//!
//! ```no_run
//! use tpm_attestation::{AttestationFormats, AttestationObject, register_tpm_format};
//!
//! # fn run(attestation_bytes: &[u8], client_data_json: &[u8]) -> Result<(), tpm_attestation::AttestationError> {
//! let mut formats = AttestationFormats::new();
//! register_tpm_format(&mut formats);
//!
//! let attestation = AttestationObject::from_cbor(attestation_bytes)?;
//! let outcome = formats.verify_client_data(&attestation, client_data_json)?;
//! println!("{} with {} certificate(s)", outcome.attestation_type, outcome.trust_path.len());
//! # Ok(())
//! # }
//! ```
//!
//! Input size limits can be tuned through environment variables:
//! `TPM_ATTESTATION_MAX_TPM_STRUCT_LEN`, `TPM_ATTESTATION_MAX_CERT_LEN` and
//! `TPM_ATTESTATION_MAX_CHAIN_LEN`.

mod attestation;
mod config;
mod cose;
mod errors;
mod types;

pub use attestation::{AttestationFormats, FormatVerifier, register_tpm_format, tpm};
pub use cose::{CoseAlgorithm, CredentialPublicKey};
pub use errors::AttestationError;
pub use types::{AttestationObject, AttestationOutcome, AttestationType, TpmAttestationMetadata};
