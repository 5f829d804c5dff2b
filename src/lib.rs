pub mod compat;
pub mod confirm;
pub mod constants;
pub mod device;
pub mod engine;
pub mod erase;
mod error;
pub mod firmware;
pub mod orchestrator;
pub mod reboot;
pub mod transfer;
pub mod version;

#[cfg(test)]
mod testutil;

pub use device::{DeviceDescriptor, DeviceEnumerator, DeviceLink, DeviceType, Direction, LinkError, SerialNumber, Transport};
pub use error::UpgradeError;
pub use firmware::{load_firmware_file, FirmwareBundle, HeaderFields};
pub use orchestrator::{run_upgrade, UpgradeConfig};
pub use version::Version;
