//! Decoders for the TPM 2.0 structures carried in a TPM attestation statement:
//! TPMT_PUBLIC (`pubArea`) and TPMS_ATTEST (`certInfo`).
//!
//! All multi-byte integers are big-endian. Sized buffers (TPM2B_*) carry a
//! two-byte length prefix.

use ring::digest;

use crate::errors::AttestationError;

pub(crate) const TPM_GENERATED_VALUE: u32 = 0xff544347; // 0xFF + "TCG"
pub(crate) const TPM_ST_ATTEST_CERTIFY: u16 = 0x8017;

pub(crate) const TPM_ALG_RSA: u16 = 0x0001;
pub(crate) const TPM_ALG_SHA1: u16 = 0x0004;
pub(crate) const TPM_ALG_SHA256: u16 = 0x000B;
pub(crate) const TPM_ALG_SHA384: u16 = 0x000C;
pub(crate) const TPM_ALG_SHA512: u16 = 0x000D;
pub(crate) const TPM_ALG_NULL: u16 = 0x0010;
pub(crate) const TPM_ALG_ECDAA: u16 = 0x001A;
pub(crate) const TPM_ALG_ECC: u16 = 0x0023;

pub(crate) const TPM_ECC_NIST_P256: u16 = 0x0003;
pub(crate) const TPM_ECC_NIST_P384: u16 = 0x0004;
pub(crate) const TPM_ECC_NIST_P521: u16 = 0x0005;

/// Exponent a TPM uses when the RSA parameters carry 0
const TPM_RSA_DEFAULT_EXPONENT: u32 = 65537;

struct TpmReader<'a> {
    buf: &'a [u8],
    offset: usize,
    structure: &'static str,
}

impl<'a> TpmReader<'a> {
    fn new(buf: &'a [u8], structure: &'static str) -> Self {
        Self {
            buf,
            offset: 0,
            structure,
        }
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8], AttestationError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                AttestationError::Decode(format!(
                    "TPM {} too short to parse {}",
                    self.structure, field
                ))
            })?;
        let bytes = &self.buf[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn u8(&mut self, field: &str) -> Result<u8, AttestationError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &str) -> Result<u16, AttestationError> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, field: &str) -> Result<u32, AttestationError> {
        let b = self.take(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self, field: &str) -> Result<u64, AttestationError> {
        let b = self.take(8, field)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    /// Reads a TPM2B_* buffer: a two-byte size followed by that many bytes.
    fn sized(&mut self, field: &str) -> Result<&'a [u8], AttestationError> {
        let len = self.u16(field)? as usize;
        self.take(len, field)
    }

    /// Bytes decoded so far.
    fn consumed(&self) -> &'a [u8] {
        &self.buf[..self.offset]
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }
}

/// TPMT_SYM_DEF_OBJECT with a non-NULL algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymmetricDefinition {
    pub algorithm: u16,
    pub key_bits: u16,
    pub mode: u16,
}

/// A signing or key-derivation scheme with a non-NULL algorithm
/// (TPMT_RSA_SCHEME, TPMT_ECC_SCHEME, TPMT_KDF_SCHEME).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TpmScheme {
    pub scheme: u16,
    pub hash_alg: u16,
    /// Commit counter, only present for ECDAA
    pub count: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TpmPublicKey {
    Rsa {
        key_bits: u16,
        /// Raw exponent field; 0 selects the TPM default
        exponent: u32,
        modulus: Vec<u8>,
    },
    Ecc {
        curve_id: u16,
        kdf: Option<TpmScheme>,
        x: Vec<u8>,
        y: Vec<u8>,
    },
}

/// Public exponent of an RSA key, mapping the TPM's 0 to 65537.
pub(crate) fn effective_rsa_exponent(exponent: u32) -> u32 {
    if exponent == 0 {
        TPM_RSA_DEFAULT_EXPONENT
    } else {
        exponent
    }
}

impl TpmPublicKey {
    pub fn key_type(&self) -> &'static str {
        match self {
            TpmPublicKey::Rsa { .. } => "RSA",
            TpmPublicKey::Ecc { .. } => "ECC",
        }
    }
}

/// Decoded TPMT_PUBLIC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicArea {
    pub name_alg: u16,
    pub object_attributes: u32,
    pub auth_policy: Vec<u8>,
    pub symmetric: Option<SymmetricDefinition>,
    pub scheme: Option<TpmScheme>,
    pub key: TpmPublicKey,
    /// The exact bytes that make up the structure; the object's Name is
    /// computed over these
    encoded: Vec<u8>,
}

impl PublicArea {
    pub fn decode(pub_area: &[u8]) -> Result<Self, AttestationError> {
        let mut r = TpmReader::new(pub_area, "pubArea");

        let alg_type = r.u16("type")?;
        let name_alg = r.u16("nameAlg")?;
        let object_attributes = r.u32("objectAttributes")?;
        let auth_policy = r.sized("authPolicy")?.to_vec();

        let (symmetric, scheme, key) = match alg_type {
            TPM_ALG_RSA => {
                let symmetric = read_symmetric(&mut r)?;
                let scheme = read_scheme(&mut r, "scheme")?;
                let key_bits = r.u16("keyBits")?;
                let exponent = r.u32("exponent")?;
                let modulus = r.sized("unique")?.to_vec();
                (
                    symmetric,
                    scheme,
                    TpmPublicKey::Rsa {
                        key_bits,
                        exponent,
                        modulus,
                    },
                )
            }
            TPM_ALG_ECC => {
                let symmetric = read_symmetric(&mut r)?;
                let scheme = read_scheme(&mut r, "scheme")?;
                let curve_id = r.u16("curveID")?;
                let kdf = read_scheme(&mut r, "kdf")?;
                let x = r.sized("unique.x")?.to_vec();
                let y = r.sized("unique.y")?.to_vec();
                (
                    symmetric,
                    scheme,
                    TpmPublicKey::Ecc {
                        curve_id,
                        kdf,
                        x,
                        y,
                    },
                )
            }
            other => {
                return Err(AttestationError::UnsupportedKeyType(format!(
                    "Unsupported TPM algorithm type: {:04x}",
                    other
                )));
            }
        };

        if r.remaining() > 0 {
            tracing::debug!("Ignoring {} trailing bytes after TPMT_PUBLIC", r.remaining());
        }

        Ok(PublicArea {
            name_alg,
            object_attributes,
            auth_policy,
            symmetric,
            scheme,
            key,
            encoded: r.consumed().to_vec(),
        })
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Digest part of the object's TPM Name, computed with `nameAlg`.
    pub fn name_digest(&self) -> Result<Vec<u8>, AttestationError> {
        tpm_digest(self.name_alg, &self.encoded)
    }
}

fn read_symmetric(r: &mut TpmReader) -> Result<Option<SymmetricDefinition>, AttestationError> {
    let algorithm = r.u16("symmetric")?;
    if algorithm == TPM_ALG_NULL {
        return Ok(None);
    }
    Ok(Some(SymmetricDefinition {
        algorithm,
        key_bits: r.u16("symmetric.keyBits")?,
        mode: r.u16("symmetric.mode")?,
    }))
}

fn read_scheme(r: &mut TpmReader, field: &str) -> Result<Option<TpmScheme>, AttestationError> {
    let scheme = r.u16(field)?;
    if scheme == TPM_ALG_NULL {
        return Ok(None);
    }
    let hash_alg = r.u16(&format!("{}.hashAlg", field))?;
    let count = if scheme == TPM_ALG_ECDAA {
        Some(r.u16(&format!("{}.count", field))?)
    } else {
        None
    };
    Ok(Some(TpmScheme {
        scheme,
        hash_alg,
        count,
    }))
}

/// Hashes `data` with a TPM hash algorithm.
pub(crate) fn tpm_digest(alg: u16, data: &[u8]) -> Result<Vec<u8>, AttestationError> {
    let algorithm = match alg {
        TPM_ALG_SHA1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        TPM_ALG_SHA256 => &digest::SHA256,
        TPM_ALG_SHA384 => &digest::SHA384,
        TPM_ALG_SHA512 => &digest::SHA512,
        other => {
            return Err(AttestationError::Format(format!(
                "Unsupported TPM name algorithm: {:04x}",
                other
            )));
        }
    };
    Ok(digest::digest(algorithm, data).as_ref().to_vec())
}

/// TPM2B_NAME contents. A Name is either a bare handle or an
/// algorithm-tagged digest of the object's public area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TpmName {
    Empty,
    Handle(u32),
    Digest { alg: u16, digest: Vec<u8> },
}

impl TpmName {
    fn decode(bytes: &[u8]) -> Result<Self, AttestationError> {
        if bytes.is_empty() {
            return Ok(TpmName::Empty);
        }
        if bytes.len() == 4 {
            return Ok(TpmName::Handle(u32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])));
        }
        if bytes.len() < 2 {
            return Err(AttestationError::Decode(format!(
                "TPM name has invalid length {}",
                bytes.len()
            )));
        }
        Ok(TpmName::Digest {
            alg: u16::from_be_bytes([bytes[0], bytes[1]]),
            digest: bytes[2..].to_vec(),
        })
    }

    /// Whether this Name identifies the given public area.
    ///
    /// The Name must use the public area's `nameAlg` and carry the digest of
    /// its encoding. A handle never matches.
    pub fn matches_public(&self, public: &PublicArea) -> Result<bool, AttestationError> {
        match self {
            TpmName::Empty | TpmName::Handle(_) => Ok(false),
            TpmName::Digest { alg, digest } => {
                if *alg != public.name_alg {
                    tracing::debug!(
                        "Name algorithm {:04x} differs from pubArea nameAlg {:04x}",
                        alg,
                        public.name_alg
                    );
                    return Ok(false);
                }
                Ok(*digest == public.name_digest()?)
            }
        }
    }
}

/// TPMS_CLOCK_INFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockInfo {
    pub clock: u64,
    pub reset_count: u32,
    pub restart_count: u32,
    pub safe: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attested {
    /// TPMS_CERTIFY_INFO
    Certify {
        name: TpmName,
        qualified_name: TpmName,
    },
    /// Any other TPMU_ATTEST member; not decoded
    Other(Vec<u8>),
}

/// Decoded TPMS_ATTEST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationData {
    pub magic: u32,
    pub attest_type: u16,
    pub qualified_signer: TpmName,
    pub extra_data: Vec<u8>,
    pub clock_info: ClockInfo,
    pub firmware_version: u64,
    pub attested: Attested,
}

impl AttestationData {
    pub fn decode(cert_info: &[u8]) -> Result<Self, AttestationError> {
        let mut r = TpmReader::new(cert_info, "certInfo");

        let magic = r.u32("magic")?;
        if magic != TPM_GENERATED_VALUE {
            return Err(AttestationError::Decode(format!(
                "Invalid magic value: {:x}, expected: {:x}",
                magic, TPM_GENERATED_VALUE
            )));
        }

        let attest_type = r.u16("type")?;
        let qualified_signer = TpmName::decode(r.sized("qualifiedSigner")?)?;
        let extra_data = r.sized("extraData")?.to_vec();

        let clock_info = ClockInfo {
            clock: r.u64("clockInfo.clock")?,
            reset_count: r.u32("clockInfo.resetCount")?,
            restart_count: r.u32("clockInfo.restartCount")?,
            safe: r.u8("clockInfo.safe")? != 0,
        };
        let firmware_version = r.u64("firmwareVersion")?;

        let attested = if attest_type == TPM_ST_ATTEST_CERTIFY {
            Attested::Certify {
                name: TpmName::decode(r.sized("attested.name")?)?,
                qualified_name: TpmName::decode(r.sized("attested.qualifiedName")?)?,
            }
        } else {
            let rest = r.remaining();
            Attested::Other(r.take(rest, "attested")?.to_vec())
        };

        Ok(AttestationData {
            magic,
            attest_type,
            qualified_signer,
            extra_data,
            clock_info,
            firmware_version,
            attested,
        })
    }
}
