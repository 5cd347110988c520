use ciborium::value::Value as CborValue;

use crate::errors::AttestationError;

// authenticatorData layout: rpIdHash (32) | flags (1) | signCount (4) | attestedCredentialData
const FLAGS_OFFSET: usize = 32;
const AAGUID_OFFSET: usize = 37;
const CRED_ID_LEN_OFFSET: usize = 53;
const FLAG_AT: u8 = 0x40;

/// Returns the AAGUID from the attested credential data.
pub(crate) fn extract_aaguid(auth_data: &[u8]) -> Result<[u8; 16], AttestationError> {
    let bytes = auth_data
        .get(AAGUID_OFFSET..CRED_ID_LEN_OFFSET)
        .ok_or_else(|| {
            AttestationError::AuthenticatorData(
                "Authenticator data too short to contain AAGUID".to_string(),
            )
        })?;
    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(bytes);
    Ok(aaguid)
}

/// Decodes the COSE credential public key from the attested credential data.
pub(crate) fn extract_credential_public_key(
    auth_data: &[u8],
) -> Result<CborValue, AttestationError> {
    // Check if the authenticator data has the AT flag set (bit 6)
    if auth_data.len() < AAGUID_OFFSET || (auth_data[FLAGS_OFFSET] & FLAG_AT) == 0 {
        return Err(AttestationError::AuthenticatorData(
            "Attested credential data not present in authenticator data".to_string(),
        ));
    }

    let mut offset = CRED_ID_LEN_OFFSET;

    if auth_data.len() < offset + 2 {
        return Err(AttestationError::AuthenticatorData(
            "Authenticator data too short for credential ID length".to_string(),
        ));
    }

    let cred_id_len = u16::from_be_bytes([auth_data[offset], auth_data[offset + 1]]) as usize;
    offset += 2;
    offset += cred_id_len;

    if auth_data.len() <= offset {
        return Err(AttestationError::AuthenticatorData(
            "Authenticator data too short for credential public key".to_string(),
        ));
    }

    // Extensions may follow the key; the reader stops after the first CBOR item
    let cred_pub_key = ciborium::de::from_reader(&auth_data[offset..]).map_err(|e| {
        AttestationError::AuthenticatorData(format!(
            "Failed to parse credential public key CBOR: {}",
            e
        ))
    })?;

    Ok(cred_pub_key)
}
