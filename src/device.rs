//! The device-link contract this crate consumes (§6.2).
//!
//! Everything in this module is a trait: the concrete USB/serial transport
//! that talks to real hardware is a separate crate's problem. Modeling the
//! link as a trait object rather than a concrete type - per the REDESIGN
//! FLAGS - lets the pipeline be driven end to end in tests against an
//! in-memory mock with no hardware present.

use std::fmt;

use thiserror::Error;

/// Serial number used to recognize a device across a reboot, read from the
/// `SERIAL_NUMBER` register (§6.3) the same way every other numeric
/// register in this protocol is read.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerialNumber(pub u32);

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The family of device this pipeline targets. Only `T7` is meaningful to
/// this crate (Non-goal: other device families), but enumeration still
/// needs to name what it's filtering for.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeviceType {
    T7,
}

/// The transport a device is reachable over.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Transport {
    Usb,
    Ethernet,
    WiFi,
}

/// One frame's direction within a mixed `rw_many` transaction.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    Read,
    Write,
}

/// Error surfaced by a `DeviceLink` or `DeviceEnumerator` implementation.
/// The pipeline never constructs this itself - it only wraps it as the
/// `#[source]` of its own `UpgradeError` variants.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("device link I/O error: {0}")]
    Io(String),
    #[error("device did not acknowledge the transaction")]
    NoAcknowledgement,
    #[error("device not found")]
    NotFound,
}

/// A single open connection to a device. Exclusively owned by the upgrade
/// pipeline for the lifetime of a stage - see §5 Shared Resources.
pub trait DeviceLink {
    /// Writes one 32-bit value to a single register address.
    fn write(&mut self, address: u32, value: u32) -> Result<(), LinkError>;

    /// Writes values to addresses, parallel-indexed.
    fn write_many(&mut self, addresses: &[u32], values: &[u32]) -> Result<(), LinkError>;

    /// Issues a mixed multi-register transaction.
    ///
    /// `addresses`, `directions`, and `counts` are parallel arrays, one
    /// entry per frame. `values` is the concatenation of every frame's
    /// values in order, with zero placeholders occupying the slots of read
    /// frames. Returns the concatenation of the values actually read, in
    /// frame order - write frames contribute nothing to the return value.
    fn rw_many(
        &mut self,
        addresses: &[u32],
        directions: &[Direction],
        counts: &[usize],
        values: &[u32],
    ) -> Result<Vec<u32>, LinkError>;

    /// Reads a single named register.
    fn read_named(&mut self, name: &str) -> Result<u32, LinkError>;

    /// Closes the connection, consuming it. The device may be about to
    /// disconnect from the bus (§4.6) - this must not block waiting for an
    /// acknowledgement the device will never send.
    fn close(self: Box<Self>) -> Result<(), LinkError>;
}

/// A minimal description of a device found by `DeviceEnumerator::list_all`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceDescriptor {
    pub serial_number: SerialNumber,
    pub device_type: DeviceType,
    pub transport: Transport,
}

/// Enumeration and opening by serial number. Kept separate from
/// `DeviceLink` because it doesn't require an already-open handle.
pub trait DeviceEnumerator {
    fn list_all(
        &self,
        device_type: DeviceType,
        transport: Transport,
    ) -> Result<Vec<DeviceDescriptor>, LinkError>;

    fn open_by_type(
        &self,
        device_type: DeviceType,
        transport: Transport,
        serial: &SerialNumber,
    ) -> Result<Box<dyn DeviceLink>, LinkError>;
}
