//! Image Loader (§4.1) and the header layout it parses.

use std::convert::TryInto;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::constants::{header_offset, HEADER_LEN};
use crate::device::{DeviceLink, SerialNumber};
use crate::error::UpgradeError;
use crate::version::Version;

/// Parsed view over the first 128 bytes of a firmware image, per the §4.1
/// table. The two byte spans not covered by a named field are opaque and
/// carried verbatim so `to_bytes` reproduces the exact input of `from_bytes`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderFields {
    pub header_code: u32,
    pub intended_device: u32,
    pub contained_version: Version,
    pub required_upgrader_version: Version,
    pub image_number: u16,
    pub num_img_in_file: u16,
    pub start_next_img: u32,
    pub len_of_img: u32,
    pub img_offset: u32,
    pub num_bytes_in_sha: u32,
    pub options: u32,
    pub encrypted_sha: u32,
    pub unencrypted_sha: u32,
    pub header_checksum: u32,
    reserved_sha: [u8; header_offset::RESERVED_SHA_LEN],
    reserved_tail: [u8; header_offset::RESERVED_TAIL_LEN],
}

impl HeaderFields {
    /// Parses a 128-byte big-endian header, seeking to each field's offset
    /// from `constants::header_offset` before reading it. Inverse of
    /// `to_bytes`.
    pub fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Result<Self, UpgradeError> {
        let mut cursor = Cursor::new(&bytes[..]);

        cursor.seek(SeekFrom::Start(header_offset::HEADER_CODE as u64))?;
        let header_code = cursor.read_u32::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::INTENDED_DEVICE as u64))?;
        let intended_device = cursor.read_u32::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::CONTAINED_VERSION as u64))?;
        let contained_version = Version::from_raw(cursor.read_f32::<BigEndian>()?);

        cursor.seek(SeekFrom::Start(header_offset::REQUIRED_UPGRADER_VERSION as u64))?;
        let required_upgrader_version = Version::from_raw(cursor.read_f32::<BigEndian>()?);

        cursor.seek(SeekFrom::Start(header_offset::IMAGE_NUMBER as u64))?;
        let image_number = cursor.read_u16::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::NUM_IMG_IN_FILE as u64))?;
        let num_img_in_file = cursor.read_u16::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::START_NEXT_IMG as u64))?;
        let start_next_img = cursor.read_u32::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::LEN_OF_IMG as u64))?;
        let len_of_img = cursor.read_u32::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::IMG_OFFSET as u64))?;
        let img_offset = cursor.read_u32::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::NUM_BYTES_IN_SHA as u64))?;
        let num_bytes_in_sha = cursor.read_u32::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::RESERVED_SHA as u64))?;
        let mut reserved_sha = [0u8; header_offset::RESERVED_SHA_LEN];
        cursor.read_exact(&mut reserved_sha)?;

        cursor.seek(SeekFrom::Start(header_offset::OPTIONS as u64))?;
        let options = cursor.read_u32::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::ENCRYPTED_SHA as u64))?;
        let encrypted_sha = cursor.read_u32::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::UNENCRYPTED_SHA as u64))?;
        let unencrypted_sha = cursor.read_u32::<BigEndian>()?;

        cursor.seek(SeekFrom::Start(header_offset::RESERVED_TAIL as u64))?;
        let mut reserved_tail = [0u8; header_offset::RESERVED_TAIL_LEN];
        cursor.read_exact(&mut reserved_tail)?;

        cursor.seek(SeekFrom::Start(header_offset::HEADER_CHECKSUM as u64))?;
        let header_checksum = cursor.read_u32::<BigEndian>()?;

        Ok(HeaderFields {
            header_code,
            intended_device,
            contained_version,
            required_upgrader_version,
            image_number,
            num_img_in_file,
            start_next_img,
            len_of_img,
            img_offset,
            num_bytes_in_sha,
            options,
            encrypted_sha,
            unencrypted_sha,
            header_checksum,
            reserved_sha,
            reserved_tail,
        })
    }

    /// Serializes back to 128 bytes, seeking to each field's offset from
    /// `constants::header_offset` before writing it. Inverse of
    /// `from_bytes`.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut raw = [0u8; HEADER_LEN];
        let mut cursor = Cursor::new(&mut raw[..]);

        cursor.seek(SeekFrom::Start(header_offset::HEADER_CODE as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.header_code).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::INTENDED_DEVICE as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.intended_device).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::CONTAINED_VERSION as u64)).unwrap();
        cursor.write_f32::<BigEndian>(self.contained_version.raw()).unwrap();

        cursor
            .seek(SeekFrom::Start(header_offset::REQUIRED_UPGRADER_VERSION as u64))
            .unwrap();
        cursor
            .write_f32::<BigEndian>(self.required_upgrader_version.raw())
            .unwrap();

        cursor.seek(SeekFrom::Start(header_offset::IMAGE_NUMBER as u64)).unwrap();
        cursor.write_u16::<BigEndian>(self.image_number).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::NUM_IMG_IN_FILE as u64)).unwrap();
        cursor.write_u16::<BigEndian>(self.num_img_in_file).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::START_NEXT_IMG as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.start_next_img).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::LEN_OF_IMG as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.len_of_img).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::IMG_OFFSET as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.img_offset).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::NUM_BYTES_IN_SHA as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.num_bytes_in_sha).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::RESERVED_SHA as u64)).unwrap();
        cursor.write_all(&self.reserved_sha).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::OPTIONS as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.options).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::ENCRYPTED_SHA as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.encrypted_sha).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::UNENCRYPTED_SHA as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.unencrypted_sha).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::RESERVED_TAIL as u64)).unwrap();
        cursor.write_all(&self.reserved_tail).unwrap();

        cursor.seek(SeekFrom::Start(header_offset::HEADER_CHECKSUM as u64)).unwrap();
        cursor.write_u32::<BigEndian>(self.header_checksum).unwrap();

        raw
    }
}

/// The shared state threaded through the pipeline (§3).
pub struct FirmwareBundle {
    pub header_bytes: [u8; HEADER_LEN],
    pub image_bytes: Vec<u8>,
    pub header_fields: HeaderFields,
    pub declared_version: Version,
    pub device_handle: Option<Box<dyn DeviceLink>>,
    pub serial_number: Option<SerialNumber>,
}

impl FirmwareBundle {
    /// Decodes `image_bytes` as big-endian u32 words, per the engine's
    /// write-chunking byte-offset convention.
    pub fn image_words(&self) -> Vec<u32> {
        self.image_bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes(chunk.try_into().unwrap()))
            .collect()
    }
}

/// Extracts the declared version from the filename convention: an
/// underscore-delimited decimal field equal to the version times 10000
/// (e.g. `T7_firmware_010067_2014-02-24.bin` -> `010067` -> `1.0067`).
fn declared_version_from_filename(filename: &str) -> Result<Version, UpgradeError> {
    let scaled: u32 = filename
        .split('_')
        .find(|field| !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| UpgradeError::InvalidFilename(filename.to_string()))?;

    Ok(Version::from_scaled_int(scaled))
}

/// Loads a firmware `.bin` file into a partially populated bundle:
/// `header_bytes`, `image_bytes`, `header_fields`, and `declared_version`
/// are set; `device_handle` and `serial_number` are filled in later by the
/// orchestrator (§4.8).
pub fn load_firmware_file(path: &Path) -> Result<FirmwareBundle, UpgradeError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UpgradeError::InvalidFilename(path.display().to_string()))?;

    let declared_version = declared_version_from_filename(filename)?;

    let contents = std::fs::read(path)?;

    if contents.len() < HEADER_LEN {
        return Err(UpgradeError::ShortFile);
    }

    let mut header_bytes = [0u8; HEADER_LEN];
    header_bytes.copy_from_slice(&contents[..HEADER_LEN]);

    let image_bytes = contents[HEADER_LEN..].to_vec();

    if image_bytes.len() % 4 != 0 {
        return Err(UpgradeError::ImageNotWordAligned(image_bytes.len()));
    }

    let header_fields = HeaderFields::from_bytes(&header_bytes)?;

    Ok(FirmwareBundle {
        header_bytes,
        image_bytes,
        header_fields,
        declared_version,
        device_handle: None,
        serial_number: None,
    })
}
