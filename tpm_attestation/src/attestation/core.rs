use std::collections::HashMap;
use std::fmt;

use ring::digest;

use crate::errors::AttestationError;
use crate::types::{AttestationObject, AttestationOutcome};

use super::tpm::{TPM_FORMAT_KEY, verify_tpm_format};

/// Verifier for one attestation statement format. Receives the attestation
/// object and the SHA-256 hash of the client data JSON.
pub type FormatVerifier =
    fn(&AttestationObject, &[u8]) -> Result<AttestationOutcome, AttestationError>;

/// Attestation statement verifiers keyed by their `fmt` identifier.
///
/// The registry is built by the caller during initialization; nothing is
/// registered implicitly.
#[derive(Default, Clone)]
pub struct AttestationFormats {
    verifiers: HashMap<String, FormatVerifier>,
}

impl fmt::Debug for AttestationFormats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttestationFormats")
            .field("formats", &self.formats())
            .finish()
    }
}

impl AttestationFormats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `verifier` under `fmt`, returning the verifier it replaced.
    pub fn register(
        &mut self,
        fmt: impl Into<String>,
        verifier: FormatVerifier,
    ) -> Option<FormatVerifier> {
        let fmt = fmt.into();
        tracing::debug!("Registering attestation format '{}'", fmt);
        self.verifiers.insert(fmt, verifier)
    }

    pub fn get(&self, fmt: &str) -> Option<FormatVerifier> {
        self.verifiers.get(fmt).copied()
    }

    /// Registered format identifiers, sorted.
    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.verifiers.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }

    /// Dispatches to the verifier registered for `attestation.fmt`.
    pub fn verify(
        &self,
        attestation: &AttestationObject,
        client_data_hash: &[u8],
    ) -> Result<AttestationOutcome, AttestationError> {
        let verifier = self.get(&attestation.fmt).ok_or_else(|| {
            AttestationError::UnknownFormat(attestation.fmt.clone())
        })?;
        tracing::debug!("Using '{}' attestation format", attestation.fmt);
        verifier(attestation, client_data_hash)
    }

    /// Like [`verify`](Self::verify), hashing the client data JSON first.
    pub fn verify_client_data(
        &self,
        attestation: &AttestationObject,
        client_data: &[u8],
    ) -> Result<AttestationOutcome, AttestationError> {
        let client_data_hash = digest::digest(&digest::SHA256, client_data);
        self.verify(attestation, client_data_hash.as_ref())
    }
}

/// Adds the `tpm` format to `formats`.
pub fn register_tpm_format(formats: &mut AttestationFormats) {
    formats.register(TPM_FORMAT_KEY, verify_tpm_format);
}
