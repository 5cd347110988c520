use crate::cose::CredentialPublicKey;
use crate::errors::AttestationError;

use super::structures::{
    PublicArea, TPM_ECC_NIST_P256, TPM_ECC_NIST_P384, TPM_ECC_NIST_P521, TpmPublicKey,
    effective_rsa_exponent,
};

/// Maps a COSE curve identifier to the TPM_ECC_CURVE value for the same curve.
pub(crate) fn tpm_curve_id(cose_curve: i64) -> Option<u16> {
    match cose_curve {
        1 => Some(TPM_ECC_NIST_P256),
        2 => Some(TPM_ECC_NIST_P384),
        3 => Some(TPM_ECC_NIST_P521),
        _ => None,
    }
}

/// Reads the three-byte COSE exponent the way TPM attestation packs it:
/// `e[0] + e[1] << 8 + e[2] << 16`.
pub(crate) fn packed_exponent(e: &[u8]) -> Result<u32, AttestationError> {
    match e {
        [b0, b1, b2] => Ok(u32::from(*b0) | u32::from(*b1) << 8 | u32::from(*b2) << 16),
        _ => Err(AttestationError::Format(format!(
            "RSA exponent in credentialPublicKey must be 3 bytes, got {}",
            e.len()
        ))),
    }
}

/// Verifies that the key described by pubArea is the credential public key
/// from the attested credential data.
pub(super) fn verify_public_key_match(
    public: &PublicArea,
    credential_key: &CredentialPublicKey,
) -> Result<(), AttestationError> {
    match (&public.key, credential_key) {
        (
            TpmPublicKey::Ecc {
                curve_id,
                x: tpm_x,
                y: tpm_y,
                ..
            },
            CredentialPublicKey::Ec2 { curve, x, y },
        ) => {
            if tpm_curve_id(*curve) != Some(*curve_id) || tpm_x != x || tpm_y != y {
                tracing::debug!(
                    "pubArea curve {:04x}, credential curve {}",
                    curve_id,
                    curve
                );
                return Err(AttestationError::Format(
                    "Mismatch between ECCParameters in pubArea and credentialPublicKey"
                        .to_string(),
                ));
            }
        }
        (
            TpmPublicKey::Rsa {
                exponent: tpm_exponent,
                modulus: tpm_modulus,
                ..
            },
            CredentialPublicKey::Rsa { modulus, exponent },
        ) => {
            let exponent = packed_exponent(exponent)?;
            if tpm_modulus != modulus || effective_rsa_exponent(*tpm_exponent) != exponent {
                return Err(AttestationError::Format(
                    "Mismatch between RSAParameters in pubArea and credentialPublicKey"
                        .to_string(),
                ));
            }
        }
        (tpm_key, credential_key) => {
            return Err(AttestationError::UnsupportedKeyType(format!(
                "Key type mismatch or unsupported key type: pubArea {}, credential {}",
                tpm_key.key_type(),
                credential_key.key_type()
            )));
        }
    }

    Ok(())
}
