//! Version Confirmation (§4.7) - the last check before the pipeline declares
//! success, run against the handle `wait_for_enumeration` reopened.

use log::info;

use crate::constants::register;
use crate::device::DeviceLink;
use crate::error::UpgradeError;
use crate::version::Version;

/// Reads `FIRMWARE_VERSION` from the reopened handle and compares it against
/// `expected`. The register holds the bit pattern of an IEEE-754 `f32`, the
/// same encoding the header stores its version fields in.
pub fn check_new_firmware(link: &mut dyn DeviceLink, expected: Version) -> Result<(), UpgradeError> {
    let raw = link
        .read_named(register::FIRMWARE_VERSION)
        .map_err(UpgradeError::RebootFailure)?;

    let actual = Version::from_raw(f32::from_bits(raw));

    if actual != expected {
        return Err(UpgradeError::VersionMismatch { actual, expected });
    }

    info!("firmware version confirmed: {}", actual);

    Ok(())
}
