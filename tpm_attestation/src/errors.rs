use thiserror::Error;

/// Errors that can occur while verifying an attestation statement.
///
/// Verification is fail-fast: the first check that rejects the statement
/// produces the error, and its detail string names that check.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// The statement asks for a sub-protocol that is not implemented
    /// (ECDAA, or basic attestation without an `x5c` chain)
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// A structural or semantic check failed (missing field, digest mismatch,
    /// certificate profile violation, ...)
    #[error("Invalid format: {0}")]
    Format(String),

    /// The credential or TPM key is of a type that cannot be compared
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Binary input (TPM structures or ASN.1) could not be decoded at all
    #[error("Decode error: {0}")]
    Decode(String),

    /// The AIK signature over certInfo did not verify
    #[error("Signature error: {0}")]
    Signature(String),

    /// Error parsing the authenticator data structure
    #[error("Invalid authenticator data: {0}")]
    AuthenticatorData(String),

    /// No verifier is registered for the attestation format
    #[error("Unsupported attestation format: {0}")]
    UnknownFormat(String),
}
