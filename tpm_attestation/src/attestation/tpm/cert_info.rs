use crate::cose::CoseAlgorithm;
use crate::errors::AttestationError;

use super::structures::{AttestationData, Attested, PublicArea, TPM_ST_ATTEST_CERTIFY};

/// Validates the TPMS_ATTEST structure the AIK signed.
///
/// Checks, in order: the magic value (during decoding), the attestation type,
/// that `extraData` is the hash of `authData || clientDataHash` under `alg`,
/// and that the certified Name is the Name of `public`.
pub(super) fn verify_cert_info(
    cert_info: &[u8],
    auth_data: &[u8],
    client_data_hash: &[u8],
    alg: CoseAlgorithm,
    public: &PublicArea,
) -> Result<AttestationData, AttestationError> {
    let data = AttestationData::decode(cert_info)?;
    tracing::debug!("Decoded certInfo: {:?}", data);

    if data.attest_type != TPM_ST_ATTEST_CERTIFY {
        return Err(AttestationError::Format(
            "Type is not set to TPM_ST_ATTEST_CERTIFY".to_string(),
        ));
    }

    let mut att_to_be_signed = Vec::with_capacity(auth_data.len() + client_data_hash.len());
    att_to_be_signed.extend_from_slice(auth_data);
    att_to_be_signed.extend_from_slice(client_data_hash);

    if data.extra_data != alg.hash(&att_to_be_signed) {
        return Err(AttestationError::Format(
            "ExtraData is not set to hash of attToBeSigned".to_string(),
        ));
    }

    let Attested::Certify { name, .. } = &data.attested else {
        return Err(AttestationError::Format(
            "certInfo does not contain TPMS_CERTIFY_INFO".to_string(),
        ));
    };

    if !name.matches_public(public)? {
        tracing::debug!("Attested name: {:?}", name);
        return Err(AttestationError::Format(
            "Hash value mismatch attested and pubArea".to_string(),
        ));
    }

    Ok(data)
}
