use der_parser::asn1_rs::Any;
use der_parser::ber::{Class, Tag};
use der_parser::der::der_read_element_header;
use x509_parser::prelude::{FromDer, X509Name};

use crate::errors::AttestationError;

// GeneralName CHOICE tag for directoryName
const NAME_TYPE_DN: u32 = 4;

// OID for tcg-at-tpmManufacturer: 2.23.133.2.1
const OID_TCG_AT_TPM_MANUFACTURER: &[u8] = &[0x67, 0x81, 0x05, 0x02, 0x01];
// OID for tcg-at-tpmModel: 2.23.133.2.2
const OID_TCG_AT_TPM_MODEL: &[u8] = &[0x67, 0x81, 0x05, 0x02, 0x02];
// OID for tcg-at-tpmVersion: 2.23.133.2.3
const OID_TCG_AT_TPM_VERSION: &[u8] = &[0x67, 0x81, 0x05, 0x02, 0x03];

/// TPM device attributes carried in the AIK certificate's SAN directoryName.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TpmDeviceAttributes {
    pub manufacturer: String,
    pub model: String,
    pub version: String,
}

impl TpmDeviceAttributes {
    pub fn is_complete(&self) -> bool {
        !self.manufacturer.is_empty() && !self.model.is_empty() && !self.version.is_empty()
    }
}

fn read_element(input: &[u8]) -> Result<(u32, Class, bool, &[u8], &[u8]), AttestationError> {
    let (rest, header) = der_read_element_header(input).map_err(|e| {
        AttestationError::Decode(format!("Failed to parse SAN element header: {:?}", e))
    })?;
    let len = header.length().definite().map_err(|e| {
        AttestationError::Decode(format!("SAN element has no definite length: {:?}", e))
    })?;
    if rest.len() < len {
        return Err(AttestationError::Decode(
            "SAN element length exceeds extension data".to_string(),
        ));
    }
    Ok((
        header.tag().0,
        header.class(),
        header.is_constructed(),
        &rest[..len],
        &rest[len..],
    ))
}

/// Walks the GeneralNames of a SubjectAltName extension value, calling
/// `callback` with each choice tag and its raw content bytes.
pub(crate) fn for_each_san<F>(extension: &[u8], mut callback: F) -> Result<(), AttestationError>
where
    F: FnMut(u32, &[u8]) -> Result<(), AttestationError>,
{
    let (tag, class, constructed, content, trailing) = read_element(extension)?;
    if !trailing.is_empty() {
        return Err(AttestationError::Decode(
            "Trailing data after SAN extension".to_string(),
        ));
    }
    if !constructed || tag != Tag::Sequence.0 || class != Class::Universal {
        return Err(AttestationError::Decode("Bad SAN sequence".to_string()));
    }

    let mut rest = content;
    while !rest.is_empty() {
        let (tag, _, _, value, next) = read_element(rest)?;
        callback(tag, value)?;
        rest = next;
    }

    Ok(())
}

/// Decodes a character-string attribute value. Values of any other type
/// yield `None`.
fn attribute_string(value: &Any) -> Option<String> {
    let data = value.data;
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::NumericString => {
            std::str::from_utf8(data).ok().map(str::to_string)
        }
        // One character per octet
        Tag::TeletexString => Some(data.iter().map(|&b| char::from(b)).collect()),
        // UCS-2, big-endian
        Tag::BmpString => {
            if data.len() % 2 != 0 {
                return None;
            }
            let units: Vec<u16> = data
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        _ => None,
    }
}

/// Extracts the TCG manufacturer, model and version attributes from a SAN
/// extension value. Missing attributes are left empty.
pub(crate) fn parse_san_extension(extension: &[u8]) -> Result<TpmDeviceAttributes, AttestationError> {
    let mut attributes = TpmDeviceAttributes::default();

    for_each_san(extension, |tag, data| {
        if tag != NAME_TYPE_DN {
            return Ok(());
        }

        // Only the leading Name is decoded; bytes after it are not inspected
        let (_, name) = X509Name::from_der(data).map_err(|e| {
            AttestationError::Decode(format!("Failed to parse SAN directoryName: {:?}", e))
        })?;

        for atv in name.iter_attributes() {
            let Some(value) = attribute_string(atv.attr_value()) else {
                continue;
            };
            let value = value.as_str();
            let oid = atv.attr_type().as_bytes();
            if oid == OID_TCG_AT_TPM_MANUFACTURER {
                attributes.manufacturer = value.strip_prefix("id:").unwrap_or(value).to_string();
            } else if oid == OID_TCG_AT_TPM_MODEL {
                attributes.model = value.to_string();
            } else if oid == OID_TCG_AT_TPM_VERSION {
                attributes.version = value.strip_prefix("id:").unwrap_or(value).to_string();
            }
        }
        Ok(())
    })?;

    tracing::debug!("TPM device attributes from SAN: {:?}", attributes);
    Ok(attributes)
}
