//! Compatibility Gate (§4.2). Runs before any destructive operation.

use num_enum::FromPrimitive as _;

use crate::constants::{DeviceTypeTag, T7_HEADER_MAGIC};
use crate::error::UpgradeError;
use crate::firmware::FirmwareBundle;

/// Rejects the bundle unless the header magic, the intended device tag, and
/// the embedded version all match what's expected. A pure function of the
/// bundle's header fields and declared version - issues no device writes.
pub fn check_compatibility(bundle: &FirmwareBundle) -> Result<(), UpgradeError> {
    let fields = &bundle.header_fields;

    if fields.header_code != T7_HEADER_MAGIC {
        return Err(UpgradeError::InvalidHeaderCode(fields.header_code));
    }

    let tag = DeviceTypeTag::from_primitive(fields.intended_device);
    if !matches!(tag, DeviceTypeTag::T7 | DeviceTypeTag::T7Legacy) {
        return Err(UpgradeError::IncorrectDeviceType(fields.intended_device));
    }

    if fields.contained_version != bundle.declared_version {
        return Err(UpgradeError::IncorrectVersion {
            declared: fields.contained_version,
            expected: bundle.declared_version,
        });
    }

    Ok(())
}
