//! Logitech receiver firmware images

pub mod checksum;
mod downgrade;
pub mod nordic;
mod record;
mod signature;
pub mod ti;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info};
use num_enum::{FromPrimitive, IntoPrimitive};
use sha2::{Digest, Sha256};

use crate::{ClassificationError, Error};

pub use self::downgrade::{BOT0301_IMAGE_SIZE, BOT0302_IMAGE_SIZE};
pub use self::record::{HexLoader, HexRecord, RecordType};
pub use self::signature::{Signature, SIGNATURE_LEN};

/// The Logitech USB vendor id, used to detect bootloader headers inside firmware dumps
pub const LOGITECH_VENDOR_ID: u16 = 0x046D;

/// The receiver family a firmware image was built for
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, IntoPrimitive, FromPrimitive)]
pub enum TargetType {
    #[num_enum(default)]
    Unknown = 0x00,
    Nordic = 0x01,
    TexasInstruments = 0x02,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Unknown => write!(f, "unknown"),
            TargetType::Nordic => write!(f, "Nordic"),
            TargetType::TexasInstruments => write!(f, "Texas Instruments"),
        }
    }
}

/// Position of the firmware image inside its raw buffer
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Layout {
    /// Offset of the first image byte
    pub start_offset: u16,
    /// Number of image bytes
    pub size: u16,
}

impl Layout {
    pub fn new(start_offset: u16, size: u16) -> Layout {
        Layout { start_offset, size }
    }

    /// Offset of the last image byte
    ///
    /// For an empty layout this wraps to `start_offset - 1`.
    pub fn last_offset(&self) -> u16 {
        self.start_offset.wrapping_add(self.size).wrapping_sub(1)
    }

    /// The image window as a range of buffer indices
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.start_offset as usize;

        start..start + self.size as usize
    }
}

/// Result of a successful family detection, applied to a `Firmware` as a whole
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct Classification {
    pub target_type: TargetType,
    pub layout: Layout,
    pub has_bootloader: bool,
    pub crc: u16,
    pub tail_position: Option<u16>,
}

/// Textual or binary encoding of a firmware file
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SourceFormat {
    /// Intel HEX, possibly with the 0xFD signature record extension
    IntelHex,
    /// A raw memory dump
    Binary,
}

impl SourceFormat {
    /// Guesses the format of `bytes`
    ///
    /// The data is treated as Intel HEX if, after optional leading whitespace, the first line is
    /// a `:` followed only by hex digits. Everything else is a binary dump.
    pub fn detect(bytes: &[u8]) -> SourceFormat {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let first_line = bytes[start..]
            .split(|b| *b == b'\n' || *b == b'\r')
            .next()
            .unwrap_or(&[]);

        match first_line.split_first() {
            Some((b':', rest))
                if !rest.is_empty() && rest.iter().all(|b| b.is_ascii_hexdigit()) =>
            {
                SourceFormat::IntelHex
            }
            _ => SourceFormat::Binary,
        }
    }
}

/// A classified receiver firmware image
#[derive(Debug, Clone)]
pub struct Firmware {
    raw_data: Vec<u8>,
    layout: Layout,
    has_bootloader: bool,
    crc: u16,
    tail_position: Option<u16>,
    signature: Option<Signature>,
    target_type: TargetType,
}

impl Firmware {
    /// Classifies a raw firmware dump
    ///
    /// The buffer may contain a bootloader in front of (TI) or behind (Nordic) the image.
    pub fn from_bin<B: Into<Vec<u8>>>(data: B) -> Result<Firmware, Error> {
        debug!("Parsing raw firmware blob");

        Firmware::classify(data.into(), None)
    }

    /// Reads and classifies a raw firmware dump from `path`
    pub fn from_bin_file<P: AsRef<Path>>(path: P) -> Result<Firmware, Error> {
        let data = std::fs::read(path)?;

        Firmware::from_bin(data)
    }

    /// Loads every line of an Intel HEX stream and classifies the result
    pub fn from_hex_reader<R: BufRead>(reader: R) -> Result<Firmware, Error> {
        HexLoader::from_reader(reader)?.finish()
    }

    /// Loads and classifies the Intel HEX file at `path`
    pub fn from_hex_file<P: AsRef<Path>>(path: P) -> Result<Firmware, Error> {
        debug!("Parsing firmware hex file '{}'", path.as_ref().display());

        let file = File::open(path)?;

        Firmware::from_hex_reader(BufReader::new(file))
    }

    /// Loads the file at `path` as either Intel HEX or raw binary, depending on its contents
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Firmware, Error> {
        let data = std::fs::read(&path)?;

        match SourceFormat::detect(&data) {
            SourceFormat::IntelHex => {
                debug!("Parsing firmware hex file '{}'", path.as_ref().display());

                Firmware::from_hex_reader(&data[..])
            }
            SourceFormat::Binary => Firmware::from_bin(data),
        }
    }

    /// Tries the TI layout first and falls back to the Nordic layout
    ///
    /// Nothing of a failed attempt is kept, the entity only ever sees a complete classification.
    pub(crate) fn classify(
        raw_data: Vec<u8>,
        signature: Option<Signature>,
    ) -> Result<Firmware, Error> {
        let classification = match ti::classify(&raw_data) {
            Ok(classification) => classification,
            Err(ti) => {
                debug!("No Texas Instruments firmware: {}", ti);

                match nordic::classify(&raw_data) {
                    Ok(classification) => classification,
                    Err(nordic) => {
                        debug!("No Nordic firmware: {}", nordic);

                        return Err(Error::UnsupportedFormat { ti, nordic });
                    }
                }
            }
        };

        info!(
            "Provided firmware targets {} based receiver",
            classification.target_type
        );

        Ok(Firmware {
            raw_data,
            layout: classification.layout,
            has_bootloader: classification.has_bootloader,
            crc: classification.crc,
            tail_position: classification.tail_position,
            signature,
            target_type: classification.target_type,
        })
    }

    /// The buffer the image was classified from
    pub fn raw_data(&self) -> &[u8] {
        &self.raw_data
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn size(&self) -> u16 {
        self.layout.size
    }

    pub fn start_offset(&self) -> u16 {
        self.layout.start_offset
    }

    pub fn last_offset(&self) -> u16 {
        self.layout.last_offset()
    }

    /// Whether a bootloader header was found next to the image
    pub fn has_bootloader(&self) -> bool {
        self.has_bootloader
    }

    /// The checksum stored in the image
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// Offset of the CRC field inside `raw_data`, only known for TI images
    pub fn tail_position(&self) -> Option<u16> {
        self.tail_position
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn has_signature(&self) -> bool {
        self.signature.is_some()
    }

    /// Attaches a detached 256 byte signature to the image
    ///
    /// On a size mismatch any previously attached signature is dropped.
    pub fn attach_signature(&mut self, bytes: &[u8]) -> Result<(), Error> {
        debug!("Signature length: {:#x} ({}) bytes", bytes.len(), bytes.len());

        match Signature::from_slice(bytes) {
            Ok(signature) => {
                self.signature = Some(signature);

                Ok(())
            }
            Err(err) => {
                self.signature = None;

                Err(err)
            }
        }
    }

    /// The bytes that make up the firmware image, without any bootloader data
    pub fn base_image(&self) -> &[u8] {
        &self.raw_data[self.layout.range()]
    }

    /// Hex encoded SHA-256 digest of the base image
    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(self.base_image()))
    }

    /// Resizes and patches a TI image for bootloader BOT03.02 so it runs on BOT03.01
    ///
    /// Returns the new base image, `self` is left untouched.
    pub fn downgrade_to_bot0301(&self) -> Result<Vec<u8>, Error> {
        Ok(downgrade::downgrade(self)?)
    }
}

impl fmt::Display for Firmware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Size {:#06x} start: {:#06x} end {:#06x} CRC {:#06x}",
            self.size(),
            self.start_offset(),
            self.last_offset(),
            self.crc
        )
    }
}

/// Converts a byte count into a 16-bit layout field
pub(crate) fn layout_field(value: usize) -> Result<u16, ClassificationError> {
    use std::convert::TryFrom;

    u16::try_from(value).map_err(|_| ClassificationError::SpanTooLarge(value))
}
