//! Frame checksum.
//!
//! The sensor protects the leading 24 bits of every 32-bit frame with an
//! 8-bit CRC: polynomial `0x1D`, seed `0xFF`, fed one bit at a time from the
//! most significant bit, result inverted.

const POLYNOMIAL: u8 = 0x1D;
const SEED: u8 = 0xFF;

// Folds a single input bit into the running CRC.
fn fold_bit(bit: bool, crc: u8) -> u8 {
    let mut top = crc & 0x80 != 0;
    if bit {
        top = !top;
    }
    let shifted = crc << 1;
    if top {
        shifted ^ POLYNOMIAL
    } else {
        shifted
    }
}

/// Computes the checksum over bits 31..=8 of `word`. Bits 7..=0 are the
/// checksum field itself and are ignored.
pub fn compute(word: u32) -> u8 {
    let crc = (8..32)
        .rev()
        .fold(SEED, |crc, index| fold_bit((word >> index) & 0x01 == 1, crc));
    !crc
}

/// Computes the checksum of the three leading bytes of a frame.
pub fn for_bytes(b0: u8, b1: u8, b2: u8) -> u8 {
    compute(u32::from(b0) << 24 | u32::from(b1) << 16 | u32::from(b2) << 8)
}

/// True when the trailing byte of `frame` matches the checksum of the rest.
pub fn is_valid(frame: &[u8; 4]) -> bool {
    for_bytes(frame[0], frame[1], frame[2]) == frame[3]
}
