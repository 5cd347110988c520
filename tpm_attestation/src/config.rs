//! Input bounds applied to attestation statements before any decoding

use std::{env, sync::LazyLock};

/// Upper bound for the `pubArea` and `certInfo` byte strings.
///
/// Default: 4096
pub(crate) static TPM_ATTESTATION_MAX_TPM_STRUCT_LEN: LazyLock<usize> =
    LazyLock::new(|| read_limit("TPM_ATTESTATION_MAX_TPM_STRUCT_LEN", 4096));

/// Upper bound for each DER certificate in `x5c`.
///
/// Default: 16384
pub(crate) static TPM_ATTESTATION_MAX_CERT_LEN: LazyLock<usize> =
    LazyLock::new(|| read_limit("TPM_ATTESTATION_MAX_CERT_LEN", 16384));

/// Upper bound for the number of certificates in `x5c`.
///
/// Default: 8
pub(crate) static TPM_ATTESTATION_MAX_CHAIN_LEN: LazyLock<usize> =
    LazyLock::new(|| read_limit("TPM_ATTESTATION_MAX_CHAIN_LEN", 8));

fn read_limit(name: &str, default: usize) -> usize {
    match env::var(name) {
        Err(_) => default,
        Ok(v) => match v.parse::<usize>() {
            Ok(limit) if limit > 0 => limit,
            _ => {
                tracing::warn!("Invalid {}: {}. Using default {}", name, v, default);
                default
            }
        },
    }
}
