//! Response frame decoding and the cumulative checksum statistics.

use core::fmt;

use crate::checksum;
use crate::constants::register_name;

/// Direction bit of a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Return status carried in the two low bits of every reply header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStatus {
    /// `0b00`: the sensor is still starting up.
    StartupInProgress,
    /// `0b01`: normal operation, no flags set.
    Normal,
    /// `0b10`: not applicable.
    NotApplicable,
    /// `0b11`: an error flag is set in the status summary.
    Error,
}

impl ReturnStatus {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0b00 => ReturnStatus::StartupInProgress,
            0b01 => ReturnStatus::Normal,
            0b10 => ReturnStatus::NotApplicable,
            _ => ReturnStatus::Error,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ReturnStatus::StartupInProgress => "Startup_in_progress",
            ReturnStatus::Normal => "Normal",
            ReturnStatus::NotApplicable => "N/A",
            ReturnStatus::Error => "Error",
        }
    }
}

/// A decoded 4-byte reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub direction: Direction,
    /// Register address, bits 6..=2 of the header.
    pub address: u8,
    pub status: ReturnStatus,
    /// Payload bytes, high byte first.
    pub payload: (u8, u8),
    pub checksum_valid: bool,
}

impl Frame {
    /// Decodes raw reply bytes as they came off the bus.
    pub fn decode(raw: &[u8; 4]) -> Frame {
        let header = raw[0];
        Frame {
            direction: if header >> 7 == 1 {
                Direction::Write
            } else {
                Direction::Read
            },
            address: (header & 0x7C) >> 2,
            status: ReturnStatus::from_bits(header),
            payload: (raw[1], raw[2]),
            checksum_valid: checksum::is_valid(raw),
        }
    }

    /// The payload as a signed 16-bit value, high byte first.
    pub fn value(&self) -> i16 {
        i16::from_be_bytes([self.payload.0, self.payload.1])
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rw = match self.direction {
            Direction::Read => 'R',
            Direction::Write => 'W',
        };
        let name = register_name(self.address).unwrap_or("NEW_ADDR");
        write!(
            f,
            "{} {:>10} {:>19} [data: {:02X} {:02X}] {}",
            rw,
            name,
            self.status.label(),
            self.payload.0,
            self.payload.1,
            if self.checksum_valid {
                "[crc_ok]"
            } else {
                "[CRC_CORRUPTED]"
            }
        )
    }
}

/// Cumulative frame counters since the driver was created. Never reset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolStats {
    pub frames: u64,
    pub valid: u64,
}

impl ProtocolStats {
    pub fn record(&mut self, frame: &Frame) {
        self.frames += 1;
        if frame.checksum_valid {
            self.valid += 1;
        }
    }

    /// Share of frames that passed checksum validation, `0.0` before any frame.
    pub fn valid_ratio(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.valid as f64 / self.frames as f64
        }
    }
}
