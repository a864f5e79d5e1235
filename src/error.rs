use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    TransferFailure,
    BadChecksum,
    UnexpectedAddress { expected: u8, found: u8 },
    DeviceNotFound { attempts: u32 },
    InvalidArg,
    NoSamples,
    RecordOverflow,
    ConnectionFailure,
    SpawnFailure,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TransferFailure => f.write_str("SPI transfer failed"),
            Error::BadChecksum => f.write_str("frame checksum mismatch"),
            Error::UnexpectedAddress { expected, found } => write!(
                f,
                "unexpected register in reply: expected {:#04X}, found {:#04X}",
                expected, found
            ),
            Error::DeviceNotFound { attempts } => write!(
                f,
                "can't communicate with SPI device, no WHOAMI or WHOAMI is incorrect after {} retries",
                attempts
            ),
            Error::InvalidArg => f.write_str("invalid argument"),
            Error::NoSamples => f.write_str("no samples collected yet"),
            Error::RecordOverflow => f.write_str("result record does not fit its buffer"),
            Error::ConnectionFailure => f.write_str("client connection failed"),
            Error::SpawnFailure => f.write_str("could not start the sampler thread"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
