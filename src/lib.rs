#![cfg_attr(not(any(test, feature = "std")), no_std)]

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use log::debug;

mod constants;
pub use constants::*;

mod error;
pub use error::*;

mod config;
pub use config::*;

pub mod checksum;

mod frame;
pub use frame::*;

mod handshake;
pub use handshake::*;

mod sampler;
pub use sampler::*;

#[cfg(feature = "std")]
mod accumulator;
#[cfg(feature = "std")]
pub use accumulator::*;

#[cfg(feature = "std")]
mod aggregator;
#[cfg(feature = "std")]
pub use aggregator::*;

#[cfg(feature = "std")]
pub mod server;

#[cfg(test)]
mod testing;

/// Represents an SCL3300 inclinometer on an SPI bus.
///
/// Every exchange on the bus is full duplex: the frame clocked out is the
/// next command, the frame clocked in is the sensor's reply to the command
/// sent during the previous exchange.
///
/// # Type Parameters
///
/// * `SPI`: The SPI device the sensor is attached to, chip select included.
/// * `D`: A blocking delay provider used for settle times and pacing.
pub struct Scl3300<SPI, D> {
    spi: SPI,
    delay: D,
    config: Config,
    stats: ProtocolStats,
}

impl<SPI, D> Scl3300<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// Creates a new `Scl3300` instance. Nothing is sent to the sensor until
    /// [`Scl3300::startup`] is called.
    pub fn new(spi: SPI, delay: D, config: Config) -> Self {
        Self {
            spi,
            delay,
            config,
            stats: ProtocolStats::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Frame counters accumulated since this driver was created.
    pub fn stats(&self) -> ProtocolStats {
        self.stats
    }

    /// Gives back the bus and the delay provider.
    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }

    /// Clocks `next` out and decodes whatever the sensor clocked in, which is
    /// the reply to the previously sent command.
    pub fn exchange(&mut self, next: &Command) -> Result<Frame, Error> {
        let mut reply = [0u8; 4];
        self.spi.transfer(&mut reply, &next.bytes).map_err(|e| {
            log::error!("SPI transfer of {} failed: {:?}", next.name, e);
            Error::TransferFailure
        })?;

        let frame = Frame::decode(&reply);
        self.stats.record(&frame);
        debug!("Sent {}, got {:02X?}: {}", next.name, reply, frame);
        Ok(frame)
    }

    /// Reads one register: sends `command`, then collects its reply while
    /// sending the status summary request as filler.
    ///
    /// # Returns
    ///
    /// * `Ok(i16)` with the signed register value.
    /// * `Err(Error::BadChecksum)` if the reply failed validation.
    /// * `Err(Error::UnexpectedAddress)` if the reply belongs to another register.
    pub fn read_register(&mut self, command: &Command, address: u8) -> Result<i16, Error> {
        self.exchange(command)?;
        let frame = self.exchange(&READ_STATUS_SUMMARY)?;

        if !frame.checksum_valid {
            return Err(Error::BadChecksum);
        }
        if frame.address != address {
            return Err(Error::UnexpectedAddress {
                expected: address,
                found: frame.address,
            });
        }
        Ok(frame.value())
    }

    // Blocks for `duration`, saturating at the largest delay DelayNs can express.
    fn pause(&mut self, duration: Duration) {
        let micros = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
        self.delay.delay_us(micros);
    }
}
