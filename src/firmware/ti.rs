//! Texas Instruments (CC2544) receiver firmware
//!
//! If a bootloader is prepended to the image it occupies the first 0x400 bytes and carries the
//! following data right in front of the image:
//!
//! - 0x03f8 uint16, USB VID (LE)
//! - 0x03fa uint16, USB PID (LE)
//! - 0x03fc byte, BL major
//! - 0x03fd byte, BL minor
//! - 0x03fe uint16, BL build number
//!
//! The image itself ends with a little endian CRC followed by the end marker.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

use super::{checksum, layout_field, Classification, Layout, TargetType, LOGITECH_VENDOR_ID};
use crate::ClassificationError;

/// The sequence terminating every TI image
pub const END_MARKER: [u8; 4] = [0xFE, 0xC0, 0xAD, 0xDE];

/// Size of the prepended bootloader
pub const BOOTLOADER_SIZE: u16 = 0x0400;

/// Offset of the USB vendor id inside the bootloader
const BOOTLOADER_VID_OFFSET: usize = 0x03F8;

/// Length of the CRC and end marker at the end of the image
pub(crate) const TAIL_LEN: usize = 6;

/// Returns `true` if `data` starts with a bootloader carrying the Logitech vendor id
pub fn has_bootloader(data: &[u8]) -> bool {
    data.get(BOOTLOADER_VID_OFFSET..BOOTLOADER_VID_OFFSET + 2)
        .map(LittleEndian::read_u16)
        == Some(LOGITECH_VENDOR_ID)
}

/// Attempts to interpret `data` as a TI firmware dump
pub(crate) fn classify(data: &[u8]) -> Result<Classification, ClassificationError> {
    let has_bootloader = has_bootloader(data);

    let start_offset = if has_bootloader {
        debug!("Firmware blob has a bootloader prepended");
        BOOTLOADER_SIZE
    } else {
        debug!("Firmware blob has no bootloader prepended");
        0
    };

    let start = start_offset as usize;
    let image = data
        .get(start..)
        .ok_or(ClassificationError::ImageTooShort(data.len()))?;

    let pos = image
        .windows(END_MARKER.len())
        .position(|window| window == END_MARKER)
        .ok_or(ClassificationError::MissingEndMarker)?;

    // The CRC has to fit in front of the marker
    if pos < 2 {
        return Err(ClassificationError::ImageTooShort(pos + END_MARKER.len()));
    }

    let size = pos + END_MARKER.len();
    let layout = Layout::new(start_offset, layout_field(size)?);

    // The last offset must stay addressable
    layout_field(start + size - 1)?;

    let tail = start + size - TAIL_LEN;
    let stored = LittleEndian::read_u16(&data[tail..tail + 2]);
    let calculated = checksum::crc16(&data[start..tail]);

    trace!(
        "TI image at {:#06x}, size {:#06x}, CRC at {:#06x}",
        start,
        size,
        tail
    );

    if calculated != stored {
        return Err(ClassificationError::ChecksumMismatch { calculated, stored });
    }

    debug!("Firmware CRC correct: {:#06x}", calculated);

    Ok(Classification {
        target_type: TargetType::TexasInstruments,
        layout,
        has_bootloader,
        crc: stored,
        tail_position: Some(layout_field(tail)?),
    })
}

#[cfg(test)]
mod tests {
    use assert_hex::assert_eq_hex;
    use hex_literal::hex;

    use super::*;
    use crate::firmware::tests::{seal_ti_image, ti_image};

    /// A dump with a bootloader in front of `image`
    fn with_bootloader(image: &[u8]) -> Vec<u8> {
        let mut dump = vec![0x02u8; BOOTLOADER_SIZE as usize];

        dump[0x3F8..0x3FA].copy_from_slice(&hex!("6D 04"));
        dump.extend_from_slice(image);
        dump
    }

    #[test]
    fn it_should_detect_the_bootloader_vendor_id() {
        assert!(has_bootloader(&with_bootloader(&[])));
        assert!(!has_bootloader(&[0u8; 0x400]));
        assert!(!has_bootloader(&[0u8; 0x10]));
    }

    #[test]
    fn it_should_classify_an_image_with_bootloader() {
        let dump = with_bootloader(&ti_image(0x6000));
        let classification = classify(&dump).unwrap();

        assert_eq!(classification.target_type, TargetType::TexasInstruments);
        assert!(classification.has_bootloader);
        assert_eq_hex!(classification.layout.start_offset, 0x0400);
        assert_eq_hex!(classification.layout.size, 0x6000);
        assert_eq_hex!(classification.layout.last_offset(), 0x63FF);
        assert_eq!(classification.tail_position, Some(0x63FA));
    }

    #[test]
    fn it_should_store_a_crc_that_matches_the_image() {
        let mut image = vec![0u8; 0x800];
        for (i, b) in image.iter_mut().enumerate() {
            *b = (i * 7) as u8;
        }
        seal_ti_image(&mut image);

        let dump = with_bootloader(&image);
        let classification = classify(&dump).unwrap();
        let range = classification.layout.range();

        assert_eq_hex!(
            checksum::crc16(&dump[range.start..range.end - TAIL_LEN]),
            classification.crc
        );
        assert_eq_hex!(
            LittleEndian::read_u16(&dump[range.end - TAIL_LEN..]),
            classification.crc
        );
    }

    #[test]
    fn it_should_stop_at_the_first_end_marker() {
        let mut dump = ti_image(0x40);
        dump.extend_from_slice(&[0xFF; 0x40]);
        dump.extend_from_slice(&END_MARKER);

        let classification = classify(&dump).unwrap();

        assert_eq_hex!(classification.layout.size, 0x40);
    }

    #[test]
    fn it_should_reject_a_missing_end_marker() {
        assert_eq!(
            classify(&[0u8; 0x1000]),
            Err(ClassificationError::MissingEndMarker)
        );
    }

    #[test]
    fn it_should_reject_a_wrong_crc() {
        let mut image = ti_image(0x100);
        image[0x10] ^= 0x01;

        assert!(matches!(
            classify(&image),
            Err(ClassificationError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn it_should_reject_a_marker_without_room_for_a_crc() {
        assert_eq!(
            classify(&hex!("00 FE C0 AD DE")),
            Err(ClassificationError::ImageTooShort(5))
        );
    }

    #[test]
    fn it_should_reject_a_truncated_bootloader_dump() {
        let dump = with_bootloader(&[]);

        assert_eq!(
            classify(&dump[..0x3FC]),
            Err(ClassificationError::ImageTooShort(0x3FC))
        );
    }
}
