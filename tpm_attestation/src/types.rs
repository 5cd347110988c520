use std::fmt;

use ciborium::value::Value as CborValue;
use uuid::Uuid;

use crate::attestation::utils::{extract_aaguid, extract_credential_public_key};
use crate::cose::CredentialPublicKey;
use crate::errors::AttestationError;

/// A decoded attestation object together with the credential public key
/// taken from its authenticator data.
#[derive(Debug, Clone)]
pub struct AttestationObject {
    pub fmt: String,
    /// Raw authenticator data, exactly as received
    pub auth_data: Vec<u8>,
    pub att_stmt: Vec<(CborValue, CborValue)>,
    pub credential_public_key: CredentialPublicKey,
}

impl AttestationObject {
    pub fn new(
        fmt: impl Into<String>,
        auth_data: Vec<u8>,
        att_stmt: Vec<(CborValue, CborValue)>,
    ) -> Result<Self, AttestationError> {
        let cose_key = extract_credential_public_key(&auth_data)?;
        let credential_public_key = CredentialPublicKey::try_from(&cose_key)?;

        Ok(AttestationObject {
            fmt: fmt.into(),
            auth_data,
            att_stmt,
            credential_public_key,
        })
    }

    /// Decodes a CBOR attestation object (`fmt`, `authData`, `attStmt`).
    pub fn from_cbor(attestation_bytes: &[u8]) -> Result<Self, AttestationError> {
        let attestation_cbor: CborValue = ciborium::de::from_reader(attestation_bytes)
            .map_err(|e| AttestationError::Format(format!("Invalid CBOR data: {}", e)))?;

        let CborValue::Map(map) = attestation_cbor else {
            return Err(AttestationError::Format(
                "Invalid attestation format".to_string(),
            ));
        };

        let mut fmt = None;
        let mut auth_data = None;
        let mut att_stmt = None;

        for (key, value) in map {
            if let CborValue::Text(k) = key {
                match (k.as_str(), value) {
                    ("fmt", CborValue::Text(f)) => fmt = Some(f),
                    ("authData", CborValue::Bytes(d)) => auth_data = Some(d),
                    ("attStmt", CborValue::Map(s)) => att_stmt = Some(s),
                    _ => {}
                }
            }
        }

        tracing::debug!(
            "Attestation format: {:?}, auth data length: {:?}",
            fmt,
            auth_data.as_ref().map(Vec::len)
        );

        match (fmt, auth_data, att_stmt) {
            (Some(f), Some(d), Some(s)) => AttestationObject::new(f, d, s),
            _ => Err(AttestationError::Format(
                "Missing required attestation data".to_string(),
            )),
        }
    }

    pub fn aaguid(&self) -> Result<[u8; 16], AttestationError> {
        extract_aaguid(&self.auth_data)
    }
}

/// Trust category established by a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationType {
    /// Attestation CA: the statement is vouched for by a certificate chain
    /// that must still be resolved against a trust anchor
    AttCa,
}

impl AttestationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttestationType::AttCa => "attca",
        }
    }
}

impl fmt::Display for AttestationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TPM details established while verifying a `tpm` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmAttestationMetadata {
    /// AAGUID of the authenticator, hyphenated
    pub aaguid: String,
    pub manufacturer_id: String,
    pub vendor_name: String,
    pub vendor_code: String,
    pub model: String,
    /// Firmware version string from the AIK certificate
    pub version: String,
    /// `firmwareVersion` from certInfo
    pub firmware_version: u64,
}

impl TpmAttestationMetadata {
    pub(crate) fn aaguid_string(aaguid: &[u8; 16]) -> String {
        Uuid::from_bytes(*aaguid).hyphenated().to_string()
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationOutcome {
    pub attestation_type: AttestationType,
    /// The `x5c` chain as supplied, leaf first
    pub trust_path: Vec<Vec<u8>>,
    pub tpm: Option<TpmAttestationMetadata>,
}
