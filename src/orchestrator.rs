//! Upgrade Orchestrator (§4.8) - the linear pipeline every earlier module
//! contributes one stage to.

use std::path::Path;
use std::time::Duration;

use log::info;

use crate::compat;
use crate::confirm;
use crate::device::{DeviceEnumerator, DeviceLink, DeviceType, Transport};
use crate::erase;
use crate::error::UpgradeError;
use crate::firmware;
use crate::reboot::{self, DEFAULT_GRACE_PERIOD, DEFAULT_MAX_ATTEMPTS};
use crate::transfer;

/// Tunables for one upgrade run. The device type and transport narrow
/// `DeviceEnumerator::list_all`'s scan during rediscovery; everything else
/// governs how patiently that scan waits.
#[derive(Debug, Clone, Copy)]
pub struct UpgradeConfig {
    pub device_type: DeviceType,
    pub transport: Transport,
    pub grace_period: Duration,
    pub max_rediscovery_attempts: u32,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        UpgradeConfig {
            device_type: DeviceType::T7,
            transport: Transport::Usb,
            grace_period: DEFAULT_GRACE_PERIOD,
            max_rediscovery_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Runs the full upgrade pipeline against an already-open device handle:
/// compatibility gate, erase, write, verify, reboot, rediscover, confirm.
/// Aborts on the first failing stage - see `UpgradeError`'s doc comment for
/// what state that leaves the device in.
pub fn run_upgrade(
    firmware_path: &Path,
    device_handle: Box<dyn DeviceLink>,
    enumerator: &dyn DeviceEnumerator,
    config: UpgradeConfig,
) -> Result<(), UpgradeError> {
    let mut bundle = firmware::load_firmware_file(firmware_path)?;
    bundle.device_handle = Some(device_handle);

    reboot::capture_serial_number(&mut bundle)?;

    info!(
        "starting upgrade of device {} to version {}",
        bundle.serial_number.expect("captured above"),
        bundle.declared_version
    );

    compat::check_compatibility(&bundle)?;

    let mut link = bundle
        .device_handle
        .take()
        .expect("device handle set above");

    erase::erase_image(link.as_mut())?;
    erase::erase_header(link.as_mut())?;
    erase::check_erase(link.as_mut())?;

    transfer::write_image(link.as_mut(), &bundle)?;
    transfer::write_header(link.as_mut(), &bundle)?;
    transfer::check_image_write(link.as_mut(), &bundle)?;

    bundle.device_handle = Some(link);

    reboot::restart_and_upgrade(&mut bundle)?;

    reboot::wait_for_enumeration(
        &mut bundle,
        enumerator,
        config.device_type,
        config.transport,
        config.grace_period,
        config.max_rediscovery_attempts,
    )?;

    let link = bundle
        .device_handle
        .as_deref_mut()
        .expect("wait_for_enumeration reopened the handle");

    confirm::check_new_firmware(link, bundle.declared_version)?;

    info!("upgrade of device {} complete", bundle.serial_number.expect("captured above"));

    Ok(())
}
