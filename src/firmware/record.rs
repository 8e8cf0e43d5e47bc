use std::cmp;
use std::convert::TryFrom;
use std::io::BufRead;

use log::{debug, trace};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::{Firmware, Layout, Signature};
use crate::{Error, RecordError};

/// Value of flash bytes that were never programmed
const ERASED_BYTE: u8 = 0xFF;

/// The record types the loader understands
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
pub enum RecordType {
    /// Firmware data
    Data = 0x00,
    /// Signature data, a Logitech extension of the Intel HEX format
    Signature = 0xFD,
}

/// A decoded Intel HEX record
///
/// The per-line checksum byte that follows the data is not validated.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct HexRecord<'a> {
    pub address: u16,
    pub record_type: RecordType,
    pub data: &'a [u8],
}

impl<'a> HexRecord<'a> {
    /// Parses a decoded record of the form `[length, addr_hi, addr_lo, type, data..]`
    pub fn parse(bytes: &'a [u8]) -> Result<HexRecord<'a>, RecordError> {
        if bytes.len() < 4 {
            return Err(RecordError::TooShort(bytes.len()));
        }

        let length = bytes[0] as usize;
        let address = u16::from_be_bytes([bytes[1], bytes[2]]);
        let record_type =
            RecordType::try_from(bytes[3]).map_err(|_| RecordError::InvalidType(bytes[3]))?;

        let data = bytes
            .get(4..4 + length)
            .ok_or(RecordError::LengthMismatch {
                expected: length,
                actual: bytes.len() - 4,
            })?;

        Ok(HexRecord {
            address,
            record_type,
            data,
        })
    }

    /// The exclusive end address of the record data
    pub fn end(&self) -> usize {
        self.address as usize + self.data.len()
    }
}

/// Folds Intel HEX records into a firmware buffer
///
/// Data records are placed at their absolute address, gaps are filled with erased flash bytes.
/// Once all records are pushed, `finish` trims the buffer to the loaded span and classifies it.
#[derive(Debug, Default)]
pub struct HexLoader {
    data: Vec<u8>,
    start_offset: Option<u16>,
    end: usize,
    signature: Option<Signature>,
}

impl HexLoader {
    pub fn new() -> HexLoader {
        HexLoader::default()
    }

    /// Reads every line from `reader`
    ///
    /// Lines that aren't valid hex or don't hold a supported record are skipped. Only I/O errors
    /// and out of bounds signature data abort the load.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<HexLoader, Error> {
        let mut loader = HexLoader::new();

        for (idx, line) in reader.split(b'\n').enumerate() {
            let line = line?;

            let line = match std::str::from_utf8(&line) {
                Ok(line) => line,
                Err(err) => {
                    debug!("Skip invalid line {}: {}", idx + 1, err);
                    continue;
                }
            };

            match loader.push_line(line) {
                Ok(()) => {}
                Err(Error::MalformedRecord(RecordError::InvalidType(typ))) => {
                    trace!("Skipping record type {:#04x} on line {}", typ, idx + 1);
                }
                Err(Error::MalformedRecord(err)) => {
                    debug!("Skip invalid line {}: {} ({})", idx + 1, line.trim(), err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(loader)
    }

    /// Decodes a single textual line and pushes the record it contains
    ///
    /// Blank lines are ignored. A leading `:` is optional.
    pub fn push_line(&mut self, line: &str) -> Result<(), Error> {
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        let line = line.strip_prefix(':').unwrap_or(line);
        let bytes = hex::decode(line).map_err(RecordError::InvalidHex)?;

        self.push_record(&bytes)
    }

    /// Pushes a decoded record, leaving the loader untouched if the record is rejected
    pub fn push_record(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let record = HexRecord::parse(bytes)?;

        match record.record_type {
            RecordType::Data => self.push_data(&record),
            RecordType::Signature => self.push_signature(&record)?,
        }

        Ok(())
    }

    fn push_data(&mut self, record: &HexRecord<'_>) {
        let addr = record.address as usize;
        let end = record.end();

        let start = match self.start_offset {
            Some(start) => cmp::min(start, record.address),
            None => record.address,
        };

        if self.data.len() < end {
            self.data.resize(end, ERASED_BYTE);
        }

        self.data[addr..end].copy_from_slice(record.data);
        self.start_offset = Some(start);
        self.end = cmp::max(self.end, end);
    }

    fn push_signature(&mut self, record: &HexRecord<'_>) -> Result<(), Error> {
        let mut signature = self.signature.unwrap_or_default();

        signature.write_at(record.address as usize, record.data)?;

        if self.signature.is_none() {
            debug!("Signature data added");
        }

        self.signature = Some(signature);

        Ok(())
    }

    /// The lowest data address seen so far
    pub fn start_offset(&self) -> Option<u16> {
        self.start_offset
    }

    /// The span covered by the data records, if any were loaded and the span fits in 16 bits
    pub fn layout(&self) -> Option<Layout> {
        let start = self.start_offset?;
        let size = u16::try_from(self.end - start as usize).ok()?;

        Some(Layout::new(start, size))
    }

    /// The loaded data, trimmed to the span covered by data records
    pub fn image(&self) -> &[u8] {
        match self.start_offset {
            Some(start) => &self.data[start as usize..self.end],
            None => &[],
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Trims the buffer to the loaded span and classifies it
    ///
    /// Anything outside the span, like a prepended bootloader, is discarded.
    pub fn finish(self) -> Result<Firmware, Error> {
        if let Some(start) = self.start_offset {
            let size = self.end - start as usize;

            if size > u16::MAX as usize {
                return Err(Error::ImageTooLarge(size));
            }
        }

        let raw_data = self.image().to_vec();

        debug!("Determining firmware type");

        Firmware::classify(raw_data, self.signature)
    }
}
