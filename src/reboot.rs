//! Reboot & Rediscovery (§4.6).

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::constants::{address, register, FWUPG_REQUEST_VALUE};
use crate::device::{DeviceEnumerator, DeviceType, SerialNumber, Transport};
use crate::error::UpgradeError;
use crate::firmware::FirmwareBundle;

/// Default grace period between rediscovery scans, and before the first one.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Default cap on rediscovery attempts (REDESIGN FLAGS: the source waits
/// indefinitely, which this crate treats as a bug to fix rather than a
/// behavior to reproduce).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 24;

/// Issues the firmware-upgrade reboot request and closes the handle - the
/// device is about to disconnect from the bus and will not acknowledge
/// anything sent after this point.
pub fn restart_and_upgrade(bundle: &mut FirmwareBundle) -> Result<(), UpgradeError> {
    let mut link = bundle
        .device_handle
        .take()
        .expect("restart_and_upgrade requires an open device handle");

    link.write(address::REQ_FWUPG, FWUPG_REQUEST_VALUE)
        .map_err(UpgradeError::RebootFailure)?;

    info!("firmware-upgrade reboot requested, closing handle");

    link.close().map_err(UpgradeError::RebootFailure)?;

    Ok(())
}

/// Polls enumeration until `bundle.serial_number` reappears, reopens it,
/// and installs the new handle. Waits `grace_period` before the first scan
/// and between unsuccessful scans; gives up after `max_attempts`.
pub fn wait_for_enumeration(
    bundle: &mut FirmwareBundle,
    enumerator: &dyn DeviceEnumerator,
    device_type: DeviceType,
    transport: Transport,
    grace_period: Duration,
    max_attempts: u32,
) -> Result<(), UpgradeError> {
    let serial = bundle
        .serial_number
        .clone()
        .expect("wait_for_enumeration requires a captured serial number");

    for attempt in 1..=max_attempts {
        thread::sleep(grace_period);

        debug!("rediscovery attempt {}/{} for serial {}", attempt, max_attempts, serial);

        let found = enumerator
            .list_all(device_type, transport)
            .map_err(UpgradeError::RebootFailure)?
            .into_iter()
            .any(|d| d.serial_number == serial);

        if found {
            info!("device {} re-enumerated after {} attempt(s)", serial, attempt);

            let link = enumerator
                .open_by_type(device_type, transport, &serial)
                .map_err(UpgradeError::RebootFailure)?;

            bundle.device_handle = Some(link);
            return Ok(());
        }
    }

    warn!("device {} did not re-enumerate within {} attempts", serial, max_attempts);

    Err(UpgradeError::EnumerationTimeout {
        attempts: max_attempts,
    })
}

/// Captures the bundle's serial number from the currently open handle by
/// reading the `SERIAL_NUMBER` register - no capability beyond the named
/// register read in §6.2 is needed for this.
pub fn capture_serial_number(bundle: &mut FirmwareBundle) -> Result<(), UpgradeError> {
    let link = bundle
        .device_handle
        .as_mut()
        .expect("capture_serial_number requires an open device handle");

    let raw = link
        .read_named(register::SERIAL_NUMBER)
        .map_err(UpgradeError::RebootFailure)?;

    bundle.serial_number = Some(SerialNumber(raw));

    Ok(())
}
