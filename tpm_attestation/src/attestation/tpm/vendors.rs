/// A TPM manufacturer known to the TCG vendor ID registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TpmVendor {
    /// Hex encoding of the four-byte vendor ID as it appears in tcg-at-tpmManufacturer
    pub id: &'static str,
    pub name: &'static str,
    pub code: &'static str,
}

const fn vendor(id: &'static str, name: &'static str, code: &'static str) -> TpmVendor {
    TpmVendor { id, name, code }
}

static TPM_VENDORS: &[TpmVendor] = &[
    vendor("414D4400", "AMD", "AMD"),
    vendor("41544D4C", "Atmel", "ATML"),
    vendor("4252434D", "Broadcom", "BRCM"),
    vendor("49424d00", "IBM", "IBM"),
    vendor("49465800", "Infineon", "IFX"),
    vendor("494E5443", "Intel", "INTC"),
    vendor("4C454E00", "Lenovo", "LEN"),
    vendor("4E534D20", "National Semiconductor", "NSM"),
    vendor("4E545A00", "Nationz", "NTZ"),
    vendor("4E544300", "Nuvoton Technology", "NTC"),
    vendor("51434F4D", "Qualcomm", "QCOM"),
    vendor("534D5343", "SMSC", "SMSC"),
    vendor("53544D20", "ST Microelectronics", "STM"),
    vendor("534D534E", "Samsung", "SMSN"),
    vendor("534E5300", "Sinosun", "SNS"),
    vendor("54584E00", "Texas Instruments", "TXN"),
    vendor("57454300", "Winbond", "WEC"),
    vendor("524F4343", "Fuzhou Rockchip", "ROCC"),
    vendor("FFFFF1D0", "FIDO Alliance Conformance Testing", "FIDO"),
];

/// Looks up a manufacturer by its hex ID.
///
/// The match is exact and case-sensitive; IDs are compared in the casing
/// used by the registry table.
pub fn lookup_tpm_vendor(id: &str) -> Option<&'static TpmVendor> {
    TPM_VENDORS.iter().find(|v| v.id == id)
}

pub fn is_valid_tpm_manufacturer(id: &str) -> bool {
    lookup_tpm_vendor(id).is_some()
}

/// All registered manufacturers, in registry order.
pub fn tpm_vendors() -> &'static [TpmVendor] {
    TPM_VENDORS
}
