//! Nordic receiver firmware
//!
//! Nordic images always start at offset 0 and come in one of two sizes. The last two bytes of the
//! image hold the big endian CRC of everything in front of them. A full flash dump additionally
//! carries the bootloader behind the image.

use byteorder::{BigEndian, ByteOrder};
use log::{debug, trace};

use super::{checksum, Classification, Layout, TargetType, LOGITECH_VENDOR_ID};
use crate::ClassificationError;

/// Offset of the USB vendor id inside an appended bootloader
const BOOTLOADER_VID_OFFSET: usize = 0x7400 + 0x0BB0;

/// Image sizes to try, in order
pub const IMAGE_SIZES: [u16; 2] = [0x6400, 0x6800];

/// Returns `true` if `data` has a bootloader with the Logitech vendor id appended
pub fn has_bootloader(data: &[u8]) -> bool {
    data.len() > BOOTLOADER_VID_OFFSET + 2
        && BigEndian::read_u16(&data[BOOTLOADER_VID_OFFSET..BOOTLOADER_VID_OFFSET + 2])
            == LOGITECH_VENDOR_ID
}

/// Attempts to interpret `data` as a Nordic firmware dump
pub(crate) fn classify(data: &[u8]) -> Result<Classification, ClassificationError> {
    let has_bootloader = has_bootloader(data);

    if has_bootloader {
        debug!("Firmware blob has a bootloader appended");
    } else {
        debug!("Firmware blob has no bootloader appended");
    }

    for &size in IMAGE_SIZES.iter() {
        let len = size as usize;

        if data.len() < len {
            trace!("Blob too short for an image of {:#06x} bytes", size);
            break;
        }

        let stored = BigEndian::read_u16(&data[len - 2..len]);
        let calculated = checksum::crc16(&data[..len - 2]);

        if calculated == stored {
            debug!("Firmware CRC correct: {:#06x}", calculated);

            return Ok(Classification {
                target_type: TargetType::Nordic,
                layout: Layout::new(0, size),
                has_bootloader,
                crc: stored,
                tail_position: None,
            });
        }

        trace!(
            "No valid image of {:#06x} bytes (intended CRC {:#06x}, found {:#06x})",
            size,
            calculated,
            stored
        );
    }

    Err(ClassificationError::NoValidImage)
}

#[cfg(test)]
mod tests {
    use assert_hex::assert_eq_hex;
    use hex_literal::hex;

    use super::*;
    use crate::firmware::tests::nordic_image;

    #[test]
    fn it_should_classify_the_small_layout() {
        let classification = classify(&nordic_image(0x6400, 0x6400)).unwrap();

        assert_eq!(classification.target_type, TargetType::Nordic);
        assert_eq_hex!(classification.layout.size, 0x6400);
        assert_eq_hex!(classification.layout.last_offset(), 0x63FF);
        assert!(!classification.has_bootloader);
    }

    #[test]
    fn it_should_fall_back_to_the_large_layout() {
        let classification = classify(&nordic_image(0x6800, 0x6800)).unwrap();

        assert_eq_hex!(classification.layout.start_offset, 0);
        assert_eq_hex!(classification.layout.size, 0x6800);
        assert_eq_hex!(classification.layout.last_offset(), 0x67FF);
    }

    #[test]
    fn it_should_detect_an_appended_bootloader() {
        let mut dump = nordic_image(0x8000, 0x6400);
        dump[0x7FB0..0x7FB2].copy_from_slice(&hex!("04 6D"));

        assert!(has_bootloader(&dump));

        let classification = classify(&dump).unwrap();

        assert!(classification.has_bootloader);
        assert_eq_hex!(classification.layout.size, 0x6400);
    }

    #[test]
    fn it_should_ignore_the_bootloader_flag_for_classification() {
        let mut dump = vec![0u8; 0x8000];
        dump[0x7FB0..0x7FB2].copy_from_slice(&hex!("04 6D"));

        assert!(has_bootloader(&dump));
        assert_eq!(classify(&dump), Err(ClassificationError::NoValidImage));
    }

    #[test]
    fn it_should_reject_short_blobs() {
        assert_eq!(
            classify(&[0u8; 0x63FF]),
            Err(ClassificationError::NoValidImage)
        );
    }

    #[test]
    fn it_should_not_try_the_large_layout_on_a_small_blob() {
        let mut dump = nordic_image(0x6800, 0x6800);
        dump.truncate(0x6500);

        assert_eq!(classify(&dump), Err(ClassificationError::NoValidImage));
    }
}
