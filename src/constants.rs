//! Central constants table for the T7 flash programming protocol.
//!
//! Exact register addresses and region geometry are dictated by the device
//! family; this module is the single place that knows them.

use num_enum::{FromPrimitive, IntoPrimitive};

/// Magic value expected at byte 0 of a well-formed T7 firmware header.
pub const T7_HEADER_MAGIC: u32 = 0x4C4A_4654; // "LJFT"

/// Hardware cap on 32-bit words moved per mixed register transaction.
pub const MAX_CHUNK_WORDS: usize = 8;

/// Value that marks a freshly erased flash word. The physical flash erases
/// to all-ones; a constant of 0 here would be a bug (see REDESIGN FLAGS).
pub const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// Flash page size in bytes, shared by both regions.
pub const PAGE_SIZE: u32 = 4096;

/// Device-type tags accepted by the compatibility gate's `intendedDevice`
/// check. A closed, numeric-tagged enum with an `Unknown` fallback for any
/// tag this crate doesn't recognize.
#[repr(u32)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, FromPrimitive, IntoPrimitive)]
pub enum DeviceTypeTag {
    T7 = 7,
    T7Legacy = 4,
    #[num_enum(default)]
    Unknown = 0xFFFF_FFFF,
}

/// Named registers read through `DeviceLink::read_named`. Flash/erase/reboot
/// registers are addressed numerically instead (`mod address`) since
/// `DeviceLink`'s write-side methods take addresses, not names; only the
/// two registers this crate ever reads by name live here.
pub mod register {
    pub const FIRMWARE_VERSION: &str = "FIRMWARE_VERSION";
    pub const SERIAL_NUMBER: &str = "SERIAL_NUMBER";
}

/// Numeric addresses for every register this crate writes to or reads
/// through a mixed `rw_many` transaction.
pub mod address {
    pub const EXF_KEY: u32 = 0xE414_0000;
    pub const EXF_ERASE: u32 = 0xE414_0004;
    pub const EXF_P_WRITE: u32 = 0xE414_0008;
    pub const EXF_WRITE: u32 = 0xE414_000C;
    pub const EXF_P_READ: u32 = 0xE414_0010;
    pub const EXF_READ: u32 = 0xE414_0014;
    pub const REQ_FWUPG: u32 = 0xE414_0018;
}

/// Magic value written to `REQ_FWUPG` to request a firmware-upgrade reboot.
pub const FWUPG_REQUEST_VALUE: u32 = 0x4646_5552; // "RUFF"

/// The geometry and unlock key of one flash region (image or header).
#[derive(Debug, Clone, Copy)]
pub struct RegionConstants {
    pub base_address: u32,
    pub page_count: u32,
    pub key: u32,
    /// Words per chunk used when writing this region; always <= MAX_CHUNK_WORDS.
    pub block_write_words: usize,
}

impl RegionConstants {
    pub const fn len_words(&self) -> usize {
        (self.page_count as usize * PAGE_SIZE as usize) / 4
    }
}

/// The image region: holds the firmware payload.
pub const IMAGE_REGION: RegionConstants = RegionConstants {
    base_address: 0x0000_0000,
    page_count: 256,
    key: 0xA5A5_A5A5,
    block_write_words: MAX_CHUNK_WORDS,
};

/// The header region: holds the 128-byte image descriptor.
pub const HEADER_REGION: RegionConstants = RegionConstants {
    base_address: 0x0010_0000,
    page_count: 1,
    key: 0x5A5A_5A5A,
    block_write_words: MAX_CHUNK_WORDS,
};

/// Number of 32-bit words in the header region's payload (128 bytes / 4).
pub const HEADER_WORDS: usize = 32;

/// Byte offsets of every named header field, anchored so `options` lands at
/// byte 72 as mandated. The two spans not covered by a named field
/// (36..72 and 84..124) are opaque reserved regions carried verbatim so
/// that header round-tripping reproduces the original bytes exactly.
pub mod header_offset {
    pub const HEADER_CODE: usize = 0;
    pub const INTENDED_DEVICE: usize = 4;
    pub const CONTAINED_VERSION: usize = 8;
    pub const REQUIRED_UPGRADER_VERSION: usize = 12;
    pub const IMAGE_NUMBER: usize = 16;
    pub const NUM_IMG_IN_FILE: usize = 18;
    pub const START_NEXT_IMG: usize = 20;
    pub const LEN_OF_IMG: usize = 24;
    pub const IMG_OFFSET: usize = 28;
    pub const NUM_BYTES_IN_SHA: usize = 32;
    pub const RESERVED_SHA: usize = 36;
    pub const RESERVED_SHA_LEN: usize = 36;
    pub const OPTIONS: usize = 72;
    pub const ENCRYPTED_SHA: usize = 76;
    pub const UNENCRYPTED_SHA: usize = 80;
    pub const RESERVED_TAIL: usize = 84;
    pub const RESERVED_TAIL_LEN: usize = 40;
    pub const HEADER_CHECKSUM: usize = 124;
}

pub const HEADER_LEN: usize = 128;
