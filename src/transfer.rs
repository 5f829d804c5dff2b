//! Image/Header Transfer (§4.5).

use log::debug;

use crate::constants::{HEADER_REGION, IMAGE_REGION};
use crate::device::DeviceLink;
use crate::engine::{self, FlashOpParams, OpDirection};
use crate::error::UpgradeError;
use crate::firmware::FirmwareBundle;

/// Writes `bundle.image_bytes` to the image region.
pub fn write_image(link: &mut dyn DeviceLink, bundle: &FirmwareBundle) -> Result<(), UpgradeError> {
    debug!("writing image ({} bytes)", bundle.image_bytes.len());

    engine::execute(
        link,
        FlashOpParams {
            start_address: IMAGE_REGION.base_address,
            length_ints: bundle.image_bytes.len() / 4,
            chunk_ints: IMAGE_REGION.block_write_words,
            direction: OpDirection::Write,
            key: Some(IMAGE_REGION.key),
            data: Some(&bundle.image_bytes),
        },
    )
    .map_err(UpgradeError::WriteFailure)?;

    Ok(())
}

/// Writes `bundle.header_bytes` to the header region.
pub fn write_header(link: &mut dyn DeviceLink, bundle: &FirmwareBundle) -> Result<(), UpgradeError> {
    debug!("writing header ({} bytes)", bundle.header_bytes.len());

    engine::execute(
        link,
        FlashOpParams {
            start_address: HEADER_REGION.base_address,
            length_ints: bundle.header_bytes.len() / 4,
            chunk_ints: HEADER_REGION.block_write_words,
            direction: OpDirection::Write,
            key: Some(HEADER_REGION.key),
            data: Some(&bundle.header_bytes),
        },
    )
    .map_err(UpgradeError::WriteFailure)?;

    Ok(())
}

/// Reads the image region back and compares it word for word against
/// `bundle.image_words()`, failing at the first mismatch.
pub fn check_image_write(link: &mut dyn DeviceLink, bundle: &FirmwareBundle) -> Result<(), UpgradeError> {
    let expected = bundle.image_words();

    let actual = engine::execute(
        link,
        FlashOpParams {
            start_address: IMAGE_REGION.base_address,
            length_ints: expected.len(),
            chunk_ints: IMAGE_REGION.block_write_words,
            direction: OpDirection::Read,
            key: None,
            data: None,
        },
    )
    .map_err(UpgradeError::WriteFailure)?;

    for (index, (&want, &got)) in expected.iter().zip(actual.iter()).enumerate() {
        if want != got {
            return Err(UpgradeError::WriteVerifyMismatch(index));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::HeaderFields;
    use crate::testutil::MockDeviceLink;
    use crate::version::Version;
    use std::convert::TryInto;

    fn bundle_with_image(image_words: &[u32]) -> FirmwareBundle {
        let header_bytes: [u8; 128] = vec![0u8; 128].try_into().unwrap();
        let image_bytes: Vec<u8> = image_words.iter().flat_map(|w| w.to_be_bytes()).collect();

        FirmwareBundle {
            header_bytes,
            image_bytes,
            header_fields: HeaderFields::from_bytes(&header_bytes).unwrap(),
            declared_version: Version::from_scaled_int(10067),
            device_handle: None,
            serial_number: None,
        }
    }

    #[test]
    fn write_then_check_image_succeeds_on_matching_data() {
        let mut link = MockDeviceLink::new();
        let bundle = bundle_with_image(&[1, 2, 3, 4, 5]);

        write_image(&mut link, &bundle).unwrap();
        check_image_write(&mut link, &bundle).unwrap();
    }

    #[test]
    fn check_image_write_reports_first_mismatch() {
        let mut link = MockDeviceLink::new();
        let bundle = bundle_with_image(&[1, 2, 3]);

        write_image(&mut link, &bundle).unwrap();

        link.fill_flash(IMAGE_REGION.base_address + 4, &[0xDEAD]);

        let err = check_image_write(&mut link, &bundle).unwrap_err();
        assert!(matches!(err, UpgradeError::WriteVerifyMismatch(1)));
    }

    #[test]
    fn write_header_targets_the_header_region_base_address() {
        let mut link = MockDeviceLink::new();
        let mut bundle = bundle_with_image(&[]);
        bundle.header_bytes = {
            let mut raw = vec![0u8; 128];
            raw[0..4].copy_from_slice(&0xCAFEBABEu32.to_be_bytes());
            raw.try_into().unwrap()
        };

        write_header(&mut link, &bundle).unwrap();

        let calls = link.rw_many_calls();
        assert_eq!(calls[0].values[1], HEADER_REGION.base_address);
    }
}
