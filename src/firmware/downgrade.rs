//! Downgrade of TI firmware from bootloader BOT03.02 to BOT03.01
//!
//! Images for BOT03.02 (signed) end at 0x63ff, images for BOT03.01 (unsigned) end at 0x6bff.
//! Every firmware keeps its device data in the two flash pages directly behind the image, so a
//! BOT03.02 image expects device data at 0x6400/0x6800 while a BOT03.01 image expects it at
//! 0x6c00/0x7000. An image that is only resized would boot exactly once and leave the receiver
//! stuck in bootloader mode afterwards.
//!
//! The CC2544 is an 8051 with a Harvard architecture: the 32KB flash is mapped to CODE at 0x0000
//! and to XDATA at 0x8000. Device data is read as XDATA, so the code references 0xe400/0xe800
//! (mostly `mov dptr, #imm16` followed by `movx`) plus a handful of loop counters and MSB-only
//! address loads. Those are moved by 0x800 with a fixed set of byte pattern substitutions.
//!
//! The substitutions were only verified against RQR39.04 (G603 receiver) and RQR24.07 (latest
//! Unifying firmware for TI receivers). They are likely to produce a non-booting image on other
//! firmware releases.

use byteorder::{ByteOrder, LittleEndian};
use log::{info, trace};

use super::ti::{END_MARKER, TAIL_LEN};
use super::{checksum, Firmware, TargetType};
use crate::PatchError;

/// Image size expected by bootloader BOT03.02
pub const BOT0302_IMAGE_SIZE: u16 = 0x6000;

/// Image size expected by bootloader BOT03.01
pub const BOT0301_IMAGE_SIZE: u16 = 0x6800;

/// A byte sequence and its replacement of the same length
struct Patch {
    search: &'static [u8],
    replace: &'static [u8],
}

/// Applied in order, every occurrence is replaced
const PATCHES: [Patch; 14] = [
    // mov dptr, #0xe400
    Patch {
        search: &[0x90, 0xE4, 0x00],
        replace: &[0x90, 0xEC, 0x00],
    },
    // mov r2, #0x04; mov r3, #0xe4
    Patch {
        search: &[0x7A, 0x04, 0x7B, 0xE4],
        replace: &[0x7A, 0x04, 0x7B, 0xEC],
    },
    // mov dptr, #0xe800
    Patch {
        search: &[0x90, 0xE8, 0x00],
        replace: &[0x90, 0xF0, 0x00],
    },
    // mov r2, #0x04; mov r3, #0xe8
    Patch {
        search: &[0x7A, 0x04, 0x7B, 0xE8],
        replace: &[0x7A, 0x04, 0x7B, 0xF0],
    },
    Patch {
        search: &[0x08, 0x74, 0xE4],
        replace: &[0x08, 0x74, 0xEC],
    },
    Patch {
        search: &[0x75, 0x0F, 0xE8],
        replace: &[0x75, 0x0F, 0xF0],
    },
    Patch {
        search: &[0x79, 0x1A],
        replace: &[0x79, 0x1C],
    },
    Patch {
        search: &[0x7F, 0x1A, 0x79, 0x7F],
        replace: &[0x7F, 0x1C, 0x79, 0x7F],
    },
    Patch {
        search: &[0x7F, 0x19],
        replace: &[0x7F, 0x1B],
    },
    Patch {
        search: &[0x79, 0x19],
        replace: &[0x79, 0x1B],
    },
    Patch {
        search: &[0xF2, 0x08, 0x74, 0xE8],
        replace: &[0xF2, 0x08, 0x74, 0xF0],
    },
    Patch {
        search: &[0x0F, 0xE4, 0x22],
        replace: &[0x0F, 0xEC, 0x22],
    },
    // mov r3, #0x64
    Patch {
        search: &[0x00, 0x7B, 0x64],
        replace: &[0x00, 0x7B, 0x6C],
    },
    Patch {
        search: &[0x05, 0x79, 0x19],
        replace: &[0x05, 0x79, 0x1B],
    },
];

/// Replaces every non-overlapping occurrence of `search` in `buf`, scanning left to right
///
/// Returns the number of replacements.
fn replace_all(buf: &mut [u8], search: &[u8], replace: &[u8]) -> usize {
    debug_assert_eq!(search.len(), replace.len());

    let mut count = 0;
    let mut pos = 0;

    while pos + search.len() <= buf.len() {
        if &buf[pos..pos + search.len()] == search {
            buf[pos..pos + search.len()].copy_from_slice(replace);
            pos += search.len();
            count += 1;
        } else {
            pos += 1;
        }
    }

    count
}

/// Builds a BOT03.01 image from a BOT03.02 TI image
pub(crate) fn downgrade(firmware: &Firmware) -> Result<Vec<u8>, PatchError> {
    if firmware.target_type() != TargetType::TexasInstruments {
        return Err(PatchError::UnsupportedTarget(firmware.target_type()));
    }

    if firmware.size() != BOT0302_IMAGE_SIZE {
        return Err(PatchError::UnexpectedSize {
            actual: firmware.size(),
            expected: BOT0302_IMAGE_SIZE,
        });
    }

    let old_len = BOT0302_IMAGE_SIZE as usize;
    let new_len = BOT0301_IMAGE_SIZE as usize;

    info!("Resizing firmware");

    // Old CRC, old end marker and the appended space are erased flash
    let mut image = vec![0xFFu8; new_len];
    image[..old_len - TAIL_LEN].copy_from_slice(&firmware.base_image()[..old_len - TAIL_LEN]);

    info!("Patching firmware");

    for patch in PATCHES.iter() {
        let count = replace_all(&mut image, patch.search, patch.replace);

        trace!(
            "Replaced {} occurrences of {}",
            count,
            hex::encode(patch.search)
        );
    }

    image[new_len - END_MARKER.len()..].copy_from_slice(&END_MARKER);

    info!("Recalculating firmware CRC");

    let crc = checksum::crc16(&image[..new_len - TAIL_LEN]);
    LittleEndian::write_u16(&mut image[new_len - TAIL_LEN..new_len - END_MARKER.len()], crc);

    Ok(image)
}
