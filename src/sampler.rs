//! One sample cycle over the bus, and the background loop repeating it.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;

use crate::{
    Command, Error, Scl3300, ACC_X, ACC_Y, ACC_Z, READ_ACC_X, READ_ACC_Y, READ_ACC_Z, READ_STO,
    READ_TEMPERATURE, STO, TEMP,
};

/// Outcome of a single register read: the value, or why it was rejected.
pub type Reading = Result<i16, Error>;

/// Every register read during one cycle, each with its own validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleCycle {
    pub x: Reading,
    pub y: Reading,
    pub z: Reading,
    pub sto: Reading,
    pub temperature: Reading,
}

/// A usable cycle: all three axes and the temperature read back intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub temperature: i16,
    /// Self-test output, when its read happened to be intact.
    pub sto: Option<i16>,
}

impl SampleCycle {
    /// Returns the sample if the cycle is usable. The self-test output is optional.
    pub fn sample(&self) -> Option<Sample> {
        Some(Sample {
            x: self.x.ok()?,
            y: self.y.ok()?,
            z: self.z.ok()?,
            temperature: self.temperature.ok()?,
            sto: self.sto.ok(),
        })
    }
}

impl<SPI, D> Scl3300<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// Reads X, Y, Z, the self-test output and the temperature, in that order.
    ///
    /// Corrupted or misaddressed replies are reported per reading; only a
    /// failing bus aborts the cycle.
    pub fn read_cycle(&mut self) -> Result<SampleCycle, Error> {
        Ok(SampleCycle {
            x: self.reading(&READ_ACC_X, ACC_X)?,
            y: self.reading(&READ_ACC_Y, ACC_Y)?,
            z: self.reading(&READ_ACC_Z, ACC_Z)?,
            sto: self.reading(&READ_STO, STO)?,
            temperature: self.reading(&READ_TEMPERATURE, TEMP)?,
        })
    }

    fn reading(&mut self, command: &Command, address: u8) -> Result<Reading, Error> {
        match self.read_register(command, address) {
            Err(Error::TransferFailure) => Err(Error::TransferFailure),
            reading => Ok(reading),
        }
    }
}

#[cfg(feature = "std")]
pub use background::Sampler;

#[cfg(feature = "std")]
mod background {
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};

    use embedded_hal::delay::DelayNs;
    use embedded_hal::spi::SpiDevice;
    use log::{error, info, warn};

    use crate::{Accumulator, Aggregator, Error, Scl3300};

    /// Keeps the sensor busy and feeds every usable cycle into the accumulator.
    pub struct Sampler<SPI, D> {
        sensor: Scl3300<SPI, D>,
        accumulator: Arc<Accumulator>,
    }

    impl<SPI, D> Sampler<SPI, D>
    where
        SPI: SpiDevice,
        D: DelayNs,
    {
        /// Wraps a sensor that already completed [`Scl3300::startup`].
        pub fn new(sensor: Scl3300<SPI, D>, accumulator: Arc<Accumulator>) -> Self {
            Self {
                sensor,
                accumulator,
            }
        }

        /// Runs one cycle and folds it in if usable. Returns whether it was.
        pub fn step(&mut self) -> bool {
            let sample = match self.sensor.read_cycle() {
                Ok(cycle) => {
                    let sample = cycle.sample();
                    if sample.is_none() {
                        warn!("Discarding sample cycle: {:?}", cycle);
                    }
                    sample
                }
                Err(e) => {
                    warn!("Sample cycle aborted: {}", e);
                    None
                }
            };

            let stats = self.sensor.stats();
            match sample {
                Some(sample) => {
                    self.accumulator.fold(&sample, stats);
                    true
                }
                None => {
                    self.accumulator.publish_stats(stats);
                    false
                }
            }
        }

        /// One iteration of [`Sampler::run`]: a cycle, then the pacing delay.
        pub fn tick(&mut self) -> bool {
            let folded = self.step();
            let interval = self.sensor.config().sample_interval();
            self.sensor.pause(interval);
            folded
        }

        /// Samples forever, pacing cycles by the configured rate.
        pub fn run(mut self) -> ! {
            info!("Sampling every {:?}", self.sensor.config().sample_interval());
            loop {
                self.tick();
            }
        }

        /// Moves the sampler onto its own thread.
        pub fn spawn(self) -> std::io::Result<JoinHandle<()>>
        where
            SPI: Send + 'static,
            D: Send + 'static,
        {
            thread::Builder::new()
                .name("scl3300-sampler".into())
                .spawn(move || self.run())
        }
    }

    impl<SPI, D> Scl3300<SPI, D>
    where
        SPI: SpiDevice + Send + 'static,
        D: DelayNs + Send + 'static,
    {
        /// Runs [`Scl3300::startup`], then moves the sensor onto a background
        /// sampler and returns the query side of the pipeline.
        pub fn start_sampling(mut self) -> Result<Aggregator, Error> {
            self.startup()?;

            let mode = self.config().mode;
            let accumulator = Arc::new(Accumulator::new());
            Sampler::new(self, accumulator.clone())
                .spawn()
                .map_err(|e| {
                    error!("Failed to spawn sampler thread: {}", e);
                    Error::SpawnFailure
                })?;
            Ok(Aggregator::new(accumulator, mode))
        }
    }
}
