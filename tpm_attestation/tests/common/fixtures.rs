use ciborium::value::Value as CborValue;
use sha2::{Digest, Sha256};
use tpm_attestation::AttestationObject;

/// AIK certificates issued by the test CA. All but `AIK_RSA` carry the same
/// P-256 AIK key.
pub mod certs {
    pub const CA: &[u8] = include_bytes!("../fixtures/ca.der");
    pub const AIK_VALID: &[u8] = include_bytes!("../fixtures/aik_valid.der");
    pub const AIK_AAGUID: &[u8] = include_bytes!("../fixtures/aik_aaguid.der");
    pub const AIK_AAGUID_MISMATCH: &[u8] = include_bytes!("../fixtures/aik_aaguid_mismatch.der");
    pub const AIK_CA_TRUE: &[u8] = include_bytes!("../fixtures/aik_ca_true.der");
    pub const AIK_NO_BASIC_CONSTRAINTS: &[u8] =
        include_bytes!("../fixtures/aik_no_basic_constraints.der");
    pub const AIK_UNKNOWN_VENDOR: &[u8] = include_bytes!("../fixtures/aik_unknown_vendor.der");
    pub const AIK_NO_EKU: &[u8] = include_bytes!("../fixtures/aik_no_eku.der");
    pub const AIK_WRONG_EKU: &[u8] = include_bytes!("../fixtures/aik_wrong_eku.der");
    pub const AIK_WITH_SUBJECT: &[u8] = include_bytes!("../fixtures/aik_with_subject.der");
    pub const AIK_NO_SAN: &[u8] = include_bytes!("../fixtures/aik_no_san.der");
    pub const AIK_SAN_MISSING_MODEL: &[u8] =
        include_bytes!("../fixtures/aik_san_missing_model.der");
    /// Valid profile, RSA-2048 AIK key
    pub const AIK_RSA: &[u8] = include_bytes!("../fixtures/aik_rsa.der");
}

pub const EC_ATTESTATION_OBJECT: &[u8] = include_bytes!("../fixtures/ec_attestation_object.cbor");
pub const CLIENT_DATA: &[u8] = include_bytes!("../fixtures/client_data.json");

/// AAGUID of the fixture authenticator
pub const AAGUID: &str = "08987058-cadc-4b81-b6e1-30de50dcbe96";

/// Offset of the first certInfo clockInfo byte (after magic, type,
/// qualifiedSigner and extraData)
pub const CERT_INFO_CLOCK_OFFSET: usize = 4 + 2 + (2 + 34) + (2 + 32);

/// Offset of the EC pubArea unique.x coordinate
pub const EC_PUB_AREA_X_OFFSET: usize = 22;

pub fn client_data_hash() -> Vec<u8> {
    Sha256::digest(CLIENT_DATA).to_vec()
}

/// One credential with its TPM structures and the AIK signature over certInfo.
#[derive(Debug, Clone)]
pub struct TpmCase {
    pub auth_data: Vec<u8>,
    pub pub_area: Vec<u8>,
    pub cert_info: Vec<u8>,
    pub sig: Vec<u8>,
    /// COSE algorithm of the AIK signature
    pub alg: i64,
}

impl TpmCase {
    /// EC P-256 credential key
    pub fn ec() -> Self {
        Self {
            auth_data: include_bytes!("../fixtures/ec_auth_data.bin").to_vec(),
            pub_area: include_bytes!("../fixtures/ec_pub_area.bin").to_vec(),
            cert_info: include_bytes!("../fixtures/ec_cert_info.bin").to_vec(),
            sig: include_bytes!("../fixtures/ec_sig.bin").to_vec(),
            alg: -7,
        }
    }

    /// RSA-2048 credential key whose pubArea uses the default exponent
    pub fn rsa() -> Self {
        Self {
            auth_data: include_bytes!("../fixtures/rsa_auth_data.bin").to_vec(),
            pub_area: include_bytes!("../fixtures/rsa_pub_area.bin").to_vec(),
            cert_info: include_bytes!("../fixtures/rsa_cert_info.bin").to_vec(),
            sig: include_bytes!("../fixtures/rsa_sig.bin").to_vec(),
            alg: -7,
        }
    }

    /// EC P-256 credential key, certified by the RSA AIK with the given COSE
    /// algorithm (RS1, RS256, RS384 or PS256)
    pub fn ec_rsa_aik(alg: i64) -> Self {
        let (cert_info, sig): (&[u8], &[u8]) = match alg {
            -65535 => (
                include_bytes!("../fixtures/ec_cert_info_rs1.bin"),
                include_bytes!("../fixtures/ec_sig_rs1.bin"),
            ),
            -257 => (
                include_bytes!("../fixtures/ec_cert_info_rs256.bin"),
                include_bytes!("../fixtures/ec_sig_rs256.bin"),
            ),
            -258 => (
                include_bytes!("../fixtures/ec_cert_info_rs384.bin"),
                include_bytes!("../fixtures/ec_sig_rs384.bin"),
            ),
            -37 => (
                include_bytes!("../fixtures/ec_cert_info_ps256.bin"),
                include_bytes!("../fixtures/ec_sig_ps256.bin"),
            ),
            other => panic!("no RSA AIK fixture for alg {}", other),
        };
        Self {
            cert_info: cert_info.to_vec(),
            sig: sig.to_vec(),
            alg,
            ..Self::ec()
        }
    }

    pub fn att_stmt(&self, aik: &[u8]) -> Vec<(CborValue, CborValue)> {
        vec![
            text("ver", CborValue::Text("2.0".to_string())),
            text("alg", CborValue::Integer(self.alg.into())),
            text(
                "x5c",
                CborValue::Array(vec![
                    CborValue::Bytes(aik.to_vec()),
                    CborValue::Bytes(certs::CA.to_vec()),
                ]),
            ),
            text("sig", CborValue::Bytes(self.sig.clone())),
            text("certInfo", CborValue::Bytes(self.cert_info.clone())),
            text("pubArea", CborValue::Bytes(self.pub_area.clone())),
        ]
    }

    pub fn attestation(&self, aik: &[u8]) -> AttestationObject {
        self.attestation_with(self.att_stmt(aik))
    }

    pub fn attestation_with(&self, att_stmt: Vec<(CborValue, CborValue)>) -> AttestationObject {
        AttestationObject::new("tpm", self.auth_data.clone(), att_stmt)
            .expect("fixture authenticator data is valid")
    }
}

fn text(key: &str, value: CborValue) -> (CborValue, CborValue) {
    (CborValue::Text(key.to_string()), value)
}

/// Replaces (or adds) a statement field.
pub fn set_field(att_stmt: &mut Vec<(CborValue, CborValue)>, key: &str, value: CborValue) {
    att_stmt.retain(|(k, _)| k != &CborValue::Text(key.to_string()));
    att_stmt.push(text(key, value));
}

pub fn remove_field(att_stmt: &mut Vec<(CborValue, CborValue)>, key: &str) {
    att_stmt.retain(|(k, _)| k != &CborValue::Text(key.to_string()));
}
