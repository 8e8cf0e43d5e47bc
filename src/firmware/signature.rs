use std::fmt;

use crate::Error;

/// Size of a firmware signature in bytes
pub const SIGNATURE_LEN: usize = 0x100;

/// An opaque 256 byte firmware signature
///
/// The contents are never verified, the signature is only carried along with the image it belongs
/// to.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// Creates a signature from `bytes`, which has to be exactly `SIGNATURE_LEN` bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Signature, Error> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(Error::SignatureSizeMismatch(bytes.len()));
        }

        let mut sig = Signature::default();
        sig.0.copy_from_slice(bytes);

        Ok(sig)
    }

    /// Copies `data` into the signature at `offset`
    ///
    /// Fails with `Error::SignatureOutOfBounds` without modifying the signature if the destination
    /// range doesn't fit.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<(), Error> {
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= SIGNATURE_LEN)
            .ok_or(Error::SignatureOutOfBounds {
                offset,
                len: data.len(),
            })?;

        self.0[offset..end].copy_from_slice(data);

        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Signature {
        Signature([0u8; SIGNATURE_LEN])
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..8]))
    }
}
