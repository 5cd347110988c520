mod core;
pub mod tpm;
pub(crate) mod utils;

pub use self::core::{AttestationFormats, FormatVerifier, register_tpm_format};
