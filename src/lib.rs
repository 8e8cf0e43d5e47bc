//! Firmware image engine for Logitech Unifying receivers.
//!
//! Loads Intel HEX or raw binary dumps, classifies them as Texas Instruments (CC2544) or Nordic
//! receiver firmware, validates the embedded CRC and can retarget a TI image built for bootloader
//! BOT03.02 so it is accepted by the older BOT03.01 bootloader.

mod error;
pub mod firmware;

pub use error::{ClassificationError, Error, PatchError, RecordError};
pub use firmware::{Firmware, HexLoader, Layout, Signature, SourceFormat, TargetType};
