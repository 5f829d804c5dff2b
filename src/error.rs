use std::io;

use thiserror::Error;

use crate::device::LinkError;

/// Every way the upgrade pipeline can fail, one variant per §7 error kind.
/// A failure anywhere aborts the pipeline; there is no automatic retry.
///
/// A failure between the start of `write_image` and a successful
/// `check_image_write` leaves the device without bootable firmware. The
/// device's bootloader is expected to remain alive and accept a subsequent
/// upgrade attempt - callers should not try to "salvage" a partial upgrade
/// by skipping stages; restart from `erase_image`.
#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("could not read firmware file: {0}")]
    FileIo(#[from] io::Error),

    #[error("filename does not encode a version: {0}")]
    InvalidFilename(String),

    #[error("file is shorter than the 128-byte header")]
    ShortFile,

    #[error("image payload is {0} bytes, not a whole number of 32-bit words")]
    ImageNotWordAligned(usize),

    #[error("header magic {0:#010x} does not match the T7 magic")]
    InvalidHeaderCode(u32),

    #[error("intended device tag {0:#010x} is not a T7 target")]
    IncorrectDeviceType(u32),

    #[error("header declares version {declared}, image was named for {expected}")]
    IncorrectVersion {
        declared: crate::version::Version,
        expected: crate::version::Version,
    },

    #[error("erase failed: {0}")]
    EraseFailure(#[source] LinkError),

    #[error("erase verification failed: word {word_index} of the {region} region read {actual:#010x}, expected all-ones")]
    EraseVerifyNotAllOnes {
        region: &'static str,
        word_index: usize,
        actual: u32,
    },

    #[error("write failed: {0}")]
    WriteFailure(#[source] LinkError),

    #[error("write verification failed at word {0}")]
    WriteVerifyMismatch(usize),

    #[error("reboot request failed: {0}")]
    RebootFailure(#[source] LinkError),

    #[error("device did not re-enumerate within {attempts} attempts")]
    EnumerationTimeout { attempts: u32 },

    #[error("firmware version after reboot is {actual}, expected {expected}")]
    VersionMismatch {
        actual: crate::version::Version,
        expected: crate::version::Version,
    },
}

pub type Result<T> = std::result::Result<T, UpgradeError>;
