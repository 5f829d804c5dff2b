//! Erase Controller (§4.4).

use log::debug;

use crate::constants::{address, RegionConstants, ERASED_WORD, HEADER_REGION, IMAGE_REGION, PAGE_SIZE};
use crate::device::DeviceLink;
use crate::engine::{self, FlashOpParams, OpDirection};
use crate::error::UpgradeError;

/// Erases every page of `region` by writing `[key, page_base]` to
/// `[EXF_KEY, EXF_ERASE]` once per page, in ascending address order.
fn erase_region(link: &mut dyn DeviceLink, region: RegionConstants) -> Result<(), UpgradeError> {
    debug!(
        "erasing region base={:#010x} pages={}",
        region.base_address, region.page_count
    );

    for page in 0..region.page_count {
        let page_base = region.base_address + page * PAGE_SIZE;

        link.write_many(&[address::EXF_KEY, address::EXF_ERASE], &[region.key, page_base])
            .map_err(UpgradeError::EraseFailure)?;
    }

    Ok(())
}

/// Erases the image region.
pub fn erase_image(link: &mut dyn DeviceLink) -> Result<(), UpgradeError> {
    erase_region(link, IMAGE_REGION)
}

/// Erases the header region.
pub fn erase_header(link: &mut dyn DeviceLink) -> Result<(), UpgradeError> {
    erase_region(link, HEADER_REGION)
}

/// Reads a region back and confirms every word is `ERASED_WORD`, failing on
/// the first mismatch found.
fn check_region_erased(
    link: &mut dyn DeviceLink,
    region: RegionConstants,
    region_name: &'static str,
) -> Result<(), UpgradeError> {
    let words = engine::execute(
        link,
        FlashOpParams {
            start_address: region.base_address,
            length_ints: region.len_words(),
            chunk_ints: region.block_write_words,
            direction: OpDirection::Read,
            key: None,
            data: None,
        },
    )
    .map_err(UpgradeError::EraseFailure)?;

    for (index, &word) in words.iter().enumerate() {
        if word != ERASED_WORD {
            return Err(UpgradeError::EraseVerifyNotAllOnes {
                region: region_name,
                word_index: index,
                actual: word,
            });
        }
    }

    Ok(())
}

/// Verifies the header region first, then the image region - matching the
/// order the orchestrator erases them in, so the earliest-written region
/// fails fastest.
pub fn check_erase(link: &mut dyn DeviceLink) -> Result<(), UpgradeError> {
    check_region_erased(link, HEADER_REGION, "header")?;
    check_region_erased(link, IMAGE_REGION, "image")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockDeviceLink;

    #[test]
    fn erase_image_issues_one_write_many_per_page() {
        let mut link = MockDeviceLink::new();

        erase_image(&mut link).unwrap();

        let calls = link.write_many_calls();
        assert_eq!(calls.len(), IMAGE_REGION.page_count as usize);
        assert_eq!(calls[0].addresses, vec![address::EXF_KEY, address::EXF_ERASE]);
        assert_eq!(calls[0].values, vec![IMAGE_REGION.key, IMAGE_REGION.base_address]);
        assert_eq!(
            calls[1].values,
            vec![IMAGE_REGION.key, IMAGE_REGION.base_address + PAGE_SIZE]
        );
    }

    #[test]
    fn erase_image_two_pages_matches_documented_sequence() {
        let mut link = MockDeviceLink::new();
        let small_region = RegionConstants {
            base_address: 0,
            page_count: 2,
            key: 0xDEAD_BEEF,
            block_write_words: 8,
        };

        erase_region(&mut link, small_region).unwrap();

        let calls = link.write_many_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].values, vec![0xDEAD_BEEF, 0]);
        assert_eq!(calls[1].values, vec![0xDEAD_BEEF, 4096]);
    }

    #[test]
    fn check_erase_passes_on_freshly_erased_flash() {
        let mut link = MockDeviceLink::new();

        check_erase(&mut link).unwrap();
    }

    #[test]
    fn check_erase_reports_first_mismatch_in_header_region() {
        let mut link = MockDeviceLink::new();
        link.fill_flash(HEADER_REGION.base_address, &[0x1234]);

        let err = check_erase(&mut link).unwrap_err();

        assert!(matches!(
            err,
            UpgradeError::EraseVerifyNotAllOnes {
                region: "header",
                word_index: 0,
                actual: 0x1234,
            }
        ));
    }

    #[test]
    fn check_erase_reports_mismatch_in_image_region_after_header_passes() {
        let mut link = MockDeviceLink::new();
        link.fill_flash(IMAGE_REGION.base_address + 8, &[0xABCD]);

        let err = check_erase(&mut link).unwrap_err();

        assert!(matches!(
            err,
            UpgradeError::EraseVerifyNotAllOnes {
                region: "image",
                word_index: 2,
                actual: 0xABCD,
            }
        ));
    }
}
