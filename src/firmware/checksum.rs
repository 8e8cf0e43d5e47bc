use crc::{Crc, CRC_16_IBM_3740};

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF, no reflection, no final xor), catalogued by the
/// `crc` crate under its IBM-3740 name
const CCITT_FALSE: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Calculates the CRC-16/CCITT-FALSE checksum for the given slice of `bytes`
pub fn crc16(bytes: &[u8]) -> u16 {
    CCITT_FALSE.checksum(bytes)
}

/// Returns `true` if the checksum of `bytes` equals `expected`
pub fn verify(bytes: &[u8], expected: u16) -> bool {
    crc16(bytes) == expected
}

#[cfg(test)]
mod tests {
    use assert_hex::assert_eq_hex;

    use super::*;

    #[test]
    fn it_should_match_the_catalogue_check_value() {
        assert_eq_hex!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn it_should_return_the_initial_value_for_empty_input() {
        assert_eq_hex!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn it_should_be_deterministic() {
        let buf: Vec<u8> = (0..=255u8).cycle().take(0x1000).collect();

        assert_eq!(crc16(&buf), crc16(&buf));
        assert!(verify(&buf, crc16(&buf)));
        assert!(!verify(&buf, crc16(&buf) ^ 1));
    }
}
