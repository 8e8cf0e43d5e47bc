use std::io;

use thiserror::Error;

use crate::firmware::TargetType;

/// Errors for a single decoded HEX record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Record is too short ({} bytes, need at least 4)", _0)]
    TooShort(usize),
    #[error("Record declares {} data bytes but only {} are present", expected, actual)]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Unsupported record type {:#04x}", _0)]
    InvalidType(u8),
    #[error("Line is not valid hex: {}", _0)]
    InvalidHex(#[from] hex::FromHexError),
}

/// Reasons a buffer could not be interpreted as one particular firmware family
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ClassificationError {
    #[error("Image is too short ({} bytes)", _0)]
    ImageTooShort(usize),
    #[error("End marker is missing")]
    MissingEndMarker,
    #[error("Firmware has wrong CRC (intended {:#06x}, found {:#06x})", calculated, stored)]
    ChecksumMismatch { calculated: u16, stored: u16 },
    #[error("No valid firmware image")]
    NoValidImage,
    #[error("Image span of {} bytes does not fit the 16-bit address space", _0)]
    SpanTooLarge(usize),
}

/// Downgrade precondition failures
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum PatchError {
    #[error("Downgrade is only supported for Texas Instruments firmware, not {}", _0)]
    UnsupportedTarget(TargetType),
    #[error("Can't downgrade an image with a size of {:#06x}, expected {:#06x}", actual, expected)]
    UnexpectedSize { actual: u16, expected: u16 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed record: {}", _0)]
    MalformedRecord(#[from] RecordError),

    #[error("Signature data out of bounds ({} bytes at offset {:#x})", len, offset)]
    SignatureOutOfBounds { offset: usize, len: usize },

    #[error(
        "Unsupported firmware format - neither Nordic ({}), nor TI ({})",
        nordic,
        ti
    )]
    UnsupportedFormat {
        ti: ClassificationError,
        nordic: ClassificationError,
    },

    #[error("Wrong size of firmware signature: {} bytes", _0)]
    SignatureSizeMismatch(usize),

    #[error("Patch precondition failed: {}", _0)]
    PatchPreconditionFailed(#[from] PatchError),

    #[error("Loaded image span of {} bytes exceeds the 16-bit address space", _0)]
    ImageTooLarge(usize),

    #[error("I/O error: {}", _0)]
    IoError(#[from] io::Error),
}
