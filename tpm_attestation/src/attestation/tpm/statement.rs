use ciborium::value::Value as CborValue;

use crate::config::{
    TPM_ATTESTATION_MAX_CERT_LEN, TPM_ATTESTATION_MAX_CHAIN_LEN, TPM_ATTESTATION_MAX_TPM_STRUCT_LEN,
};
use crate::cose::CoseAlgorithm;
use crate::errors::AttestationError;

const TPM_VERSION: &str = "2.0";

/// The fields of a `tpm` attestation statement, type-checked.
#[derive(Debug, Clone)]
pub(super) struct TpmStatement {
    pub(super) alg: CoseAlgorithm,
    pub(super) x5c: Vec<Vec<u8>>,
    pub(super) sig: Vec<u8>,
    pub(super) cert_info: Vec<u8>,
    pub(super) pub_area: Vec<u8>,
}

fn field<'a>(att_stmt: &'a [(CborValue, CborValue)], name: &str) -> Option<&'a CborValue> {
    att_stmt.iter().find_map(|(key, value)| match key {
        CborValue::Text(k) if k == name => Some(value),
        _ => None,
    })
}

fn bytes_field(
    att_stmt: &[(CborValue, CborValue)],
    name: &str,
) -> Result<Vec<u8>, AttestationError> {
    match field(att_stmt, name) {
        Some(CborValue::Bytes(b)) => Ok(b.clone()),
        _ => Err(AttestationError::Format(format!(
            "Error retrieving {} value",
            name
        ))),
    }
}

fn check_len(name: &str, len: usize, limit: usize) -> Result<(), AttestationError> {
    if len > limit {
        return Err(AttestationError::Format(format!(
            "{} is {} bytes, exceeding the limit of {}",
            name, len, limit
        )));
    }
    Ok(())
}

impl TryFrom<&[(CborValue, CborValue)]> for TpmStatement {
    type Error = AttestationError;

    fn try_from(att_stmt: &[(CborValue, CborValue)]) -> Result<Self, Self::Error> {
        let ver = match field(att_stmt, "ver") {
            Some(CborValue::Text(v)) => v,
            _ => {
                return Err(AttestationError::Format(
                    "Error retrieving ver value".to_string(),
                ));
            }
        };
        if ver != TPM_VERSION {
            return Err(AttestationError::Format(format!(
                "Unsupported TPM version: {}",
                ver
            )));
        }

        let alg = match field(att_stmt, "alg") {
            Some(CborValue::Integer(a)) => i64::try_from(*a).map_err(|_| {
                AttestationError::Format("alg value is out of range".to_string())
            })?,
            _ => {
                return Err(AttestationError::Format(
                    "Error retrieving alg value".to_string(),
                ));
            }
        };
        let alg = CoseAlgorithm::try_from(alg)?;

        let certs = match field(att_stmt, "x5c") {
            Some(CborValue::Array(certs)) => certs,
            Some(_) => {
                return Err(AttestationError::Format(
                    "x5c must be an array of certificates".to_string(),
                ));
            }
            None => {
                return Err(AttestationError::NotImplemented(
                    "TPM attestation without x5c".to_string(),
                ));
            }
        };

        if field(att_stmt, "ecdaaKeyId").is_some() {
            return Err(AttestationError::NotImplemented(
                "TPM ECDAA attestation".to_string(),
            ));
        }

        let sig = bytes_field(att_stmt, "sig")?;
        let cert_info = bytes_field(att_stmt, "certInfo")?;
        let pub_area = bytes_field(att_stmt, "pubArea")?;

        if certs.is_empty() {
            return Err(AttestationError::Format(
                "Error getting certificate from x5c cert chain".to_string(),
            ));
        }
        check_len("x5c", certs.len(), *TPM_ATTESTATION_MAX_CHAIN_LEN)?;

        let x5c = certs
            .iter()
            .map(|cert| match cert {
                CborValue::Bytes(der) => {
                    check_len("x5c certificate", der.len(), *TPM_ATTESTATION_MAX_CERT_LEN)?;
                    Ok(der.clone())
                }
                _ => Err(AttestationError::Format(
                    "Error getting certificate from x5c cert chain".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        check_len("certInfo", cert_info.len(), *TPM_ATTESTATION_MAX_TPM_STRUCT_LEN)?;
        check_len("pubArea", pub_area.len(), *TPM_ATTESTATION_MAX_TPM_STRUCT_LEN)?;

        Ok(TpmStatement {
            alg,
            x5c,
            sig,
            cert_info,
            pub_area,
        })
    }
}
