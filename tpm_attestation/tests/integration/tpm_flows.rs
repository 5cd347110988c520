use ciborium::value::Value as CborValue;
use proptest::prelude::*;
use tpm_attestation::tpm::verify_tpm_format;
use tpm_attestation::{AttestationError, AttestationType};

use crate::common::{
    AAGUID, CERT_INFO_CLOCK_OFFSET, EC_PUB_AREA_X_OFFSET, TpmCase, certs, client_data_hash,
    remove_field, set_field,
};

fn expect_format_error(result: Result<impl std::fmt::Debug, AttestationError>, expected: &str) {
    match result {
        Err(AttestationError::Format(msg)) => {
            assert!(msg.contains(expected), "unexpected message: {}", msg)
        }
        other => panic!(
            "Expected AttestationError::Format containing {:?}, got {:?}",
            expected, other
        ),
    }
}

#[test]
fn test_ec_attestation_succeeds_and_returns_chain() {
    let case = TpmCase::ec();
    let att = case.attestation(certs::AIK_VALID);

    let outcome = verify_tpm_format(&att, &client_data_hash()).expect("valid EC attestation");

    assert_eq!(outcome.attestation_type, AttestationType::AttCa);
    assert_eq!(outcome.attestation_type.to_string(), "attca");
    assert_eq!(
        outcome.trust_path,
        vec![certs::AIK_VALID.to_vec(), certs::CA.to_vec()]
    );

    let metadata = outcome.tpm.expect("TPM metadata");
    assert_eq!(metadata.aaguid, AAGUID);
    assert_eq!(metadata.manufacturer_id, "FFFFF1D0");
    assert_eq!(metadata.vendor_name, "FIDO Alliance Conformance Testing");
    assert_eq!(metadata.model, "FIDO-TEST-TPM");
    assert_eq!(metadata.version, "13");
}

#[test]
fn test_rsa_attestation_with_default_exponent_succeeds() {
    let case = TpmCase::rsa();
    let att = case.attestation(certs::AIK_VALID);

    let outcome = verify_tpm_format(&att, &client_data_hash()).expect("valid RSA attestation");

    assert_eq!(outcome.trust_path.len(), 2);
    assert_eq!(att.credential_public_key.key_type(), "RSA");
}

#[test]
fn test_version_other_than_2_0_rejected() {
    let case = TpmCase::ec();
    for ver in ["1.2", "2", "2.00", ""] {
        let mut att_stmt = case.att_stmt(certs::AIK_VALID);
        set_field(&mut att_stmt, "ver", CborValue::Text(ver.to_string()));

        let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

        expect_format_error(result, "Unsupported TPM version");
    }
}

#[test]
fn test_missing_x5c_not_implemented() {
    let case = TpmCase::ec();
    let mut att_stmt = case.att_stmt(certs::AIK_VALID);
    remove_field(&mut att_stmt, "x5c");
    // Broken certInfo must not be reached
    set_field(&mut att_stmt, "certInfo", CborValue::Bytes(vec![]));

    let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

    assert!(matches!(result, Err(AttestationError::NotImplemented(_))));
}

#[test]
fn test_ecdaa_not_implemented() {
    let case = TpmCase::ec();
    let mut att_stmt = case.att_stmt(certs::AIK_VALID);
    set_field(&mut att_stmt, "ecdaaKeyId", CborValue::Bytes(vec![0x01; 32]));

    let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

    assert!(matches!(result, Err(AttestationError::NotImplemented(_))));
}

#[test]
fn test_pub_area_for_other_key_rejected() {
    // EC statement carrying the RSA pubArea
    let case = TpmCase::ec();
    let mut att_stmt = case.att_stmt(certs::AIK_VALID);
    set_field(
        &mut att_stmt,
        "pubArea",
        CborValue::Bytes(TpmCase::rsa().pub_area),
    );

    let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

    assert!(matches!(
        result,
        Err(AttestationError::UnsupportedKeyType(_))
    ));
}

#[test]
fn test_cert_info_tampered_after_signing_fails_signature() {
    let case = TpmCase::ec();
    let mut att_stmt = case.att_stmt(certs::AIK_VALID);
    let mut cert_info = case.cert_info.clone();
    // clockInfo is not cross-checked, only signed
    cert_info[CERT_INFO_CLOCK_OFFSET + 4] ^= 0x01;
    set_field(&mut att_stmt, "certInfo", CborValue::Bytes(cert_info));

    let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

    assert!(matches!(result, Err(AttestationError::Signature(_))));
}

#[test]
fn test_signature_for_other_cert_info_fails() {
    // EC statement signed over the RSA certInfo
    let case = TpmCase::ec();
    let mut att_stmt = case.att_stmt(certs::AIK_VALID);
    set_field(&mut att_stmt, "sig", CborValue::Bytes(TpmCase::rsa().sig));

    let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

    assert!(matches!(result, Err(AttestationError::Signature(_))));
}

#[test]
fn test_certificate_profile_violations() {
    let cases: &[(&[u8], &str)] = &[
        (certs::AIK_WITH_SUBJECT, "AIK certificate subject must be empty"),
        (certs::AIK_NO_SAN, "Invalid SAN data in AIK certificate"),
        (
            certs::AIK_SAN_MISSING_MODEL,
            "Invalid SAN data in AIK certificate",
        ),
        (certs::AIK_UNKNOWN_VENDOR, "Invalid TPM manufacturer"),
        (certs::AIK_NO_EKU, "AIK certificate missing EKU"),
        (certs::AIK_WRONG_EKU, "AIK certificate EKU missing 2.23.133.8.3"),
        (certs::AIK_CA_TRUE, "CA is true"),
        (
            certs::AIK_AAGUID_MISMATCH,
            "AAGUID in AIK certificate does not match",
        ),
    ];

    for (aik, expected) in cases {
        let case = TpmCase::ec();
        let result = verify_tpm_format(&case.attestation(aik), &client_data_hash());
        expect_format_error(result, expected);
    }
}

#[test]
fn test_certificate_without_basic_constraints_accepted() {
    let case = TpmCase::ec();

    let result = verify_tpm_format(
        &case.attestation(certs::AIK_NO_BASIC_CONSTRAINTS),
        &client_data_hash(),
    );

    assert!(result.is_ok());
}

#[test]
fn test_certificate_with_matching_aaguid_accepted() {
    let case = TpmCase::rsa();

    let result = verify_tpm_format(&case.attestation(certs::AIK_AAGUID), &client_data_hash());

    assert!(result.is_ok());
}

#[test]
fn test_rs1_signature_from_rsa_aik_succeeds() {
    let case = TpmCase::ec_rsa_aik(-65535);
    let att = case.attestation(certs::AIK_RSA);

    let outcome = verify_tpm_format(&att, &client_data_hash()).expect("valid RS1 attestation");

    assert_eq!(
        outcome.trust_path,
        vec![certs::AIK_RSA.to_vec(), certs::CA.to_vec()]
    );
    assert_eq!(outcome.tpm.map(|m| m.manufacturer_id), Some("FFFFF1D0".to_string()));
}

#[test]
fn test_rsa_aik_signature_algorithms_succeed() {
    // RS384 carries a SHA-384 extraData
    for (alg, extra_data_len) in [(-257i64, 32usize), (-37, 32), (-258, 48)] {
        let case = TpmCase::ec_rsa_aik(alg);
        assert_eq!(
            u16::from_be_bytes([case.cert_info[42], case.cert_info[43]]) as usize,
            extra_data_len
        );

        let result = verify_tpm_format(&case.attestation(certs::AIK_RSA), &client_data_hash());

        assert!(result.is_ok(), "alg {} failed: {:?}", alg, result);
    }
}

#[test]
fn test_rs1_signature_from_ec_aik_fails() {
    let case = TpmCase::ec_rsa_aik(-65535);

    let result = verify_tpm_format(&case.attestation(certs::AIK_VALID), &client_data_hash());

    assert!(matches!(result, Err(AttestationError::Signature(_))));
}

#[test]
fn test_rs1_tampered_cert_info_fails_signature() {
    let case = TpmCase::ec_rsa_aik(-65535);
    let mut att_stmt = case.att_stmt(certs::AIK_RSA);
    let mut cert_info = case.cert_info.clone();
    // qualifiedName is the last field and is only signed
    let last = cert_info.len() - 1;
    cert_info[last] ^= 0x01;
    set_field(&mut att_stmt, "certInfo", CborValue::Bytes(cert_info));

    let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

    assert!(matches!(result, Err(AttestationError::Signature(_))));
}

#[test]
fn test_extra_data_for_other_algorithm_rejected() {
    // SHA-256 extraData presented as RS384
    let case = TpmCase::ec_rsa_aik(-257);
    let mut att_stmt = case.att_stmt(certs::AIK_RSA);
    set_field(&mut att_stmt, "alg", CborValue::Integer((-258i64).into()));

    let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

    assert!(result.is_err());
}

#[test]
fn test_unsupported_signature_algorithm_rejected() {
    let case = TpmCase::ec();
    let mut att_stmt = case.att_stmt(certs::AIK_VALID);
    // ES512
    set_field(&mut att_stmt, "alg", CborValue::Integer((-36i64).into()));

    let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

    expect_format_error(result, "Unsupported algorithm for TPM attestation");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_tampered_pub_area_x_rejected(index in 0usize..32, flip in 1u8..=255) {
        let case = TpmCase::ec();
        let mut att_stmt = case.att_stmt(certs::AIK_VALID);
        let mut pub_area = case.pub_area.clone();
        pub_area[EC_PUB_AREA_X_OFFSET + index] ^= flip;
        set_field(&mut att_stmt, "pubArea", CborValue::Bytes(pub_area));

        let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

        prop_assert!(
            matches!(result, Err(AttestationError::Format(ref msg)) if msg.contains("ECCParameters"))
        );
    }

    #[test]
    fn prop_tampered_cert_info_never_verifies(index in 0usize..173, flip in 1u8..=255) {
        let case = TpmCase::ec();
        let mut att_stmt = case.att_stmt(certs::AIK_VALID);
        let mut cert_info = case.cert_info.clone();
        cert_info[index] ^= flip;
        set_field(&mut att_stmt, "certInfo", CborValue::Bytes(cert_info));

        let result = verify_tpm_format(&case.attestation_with(att_stmt), &client_data_hash());

        prop_assert!(result.is_err());
    }
}
