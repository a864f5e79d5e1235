use core::time::Duration;

use crate::constants::*;
use crate::Error;

/// Measurement mode of the SCL3300.
///
/// Each mode fixes the measurement range, the sensitivity and the output data
/// rate (ODR) of the sensor.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Mode {
    /// 1.2 g full scale, 40 Hz.
    Mode1,
    /// 2.4 g full scale, 70 Hz.
    Mode2,
    /// Inclination mode, 10 Hz.
    Mode3,
    /// Inclination mode with low noise, 10 Hz.
    Inclination,
}

impl Mode {
    /// The command frame selecting this mode.
    pub fn select_command(self) -> Command {
        match self {
            Mode::Mode1 => CHANGE_TO_MODE_1,
            Mode::Mode2 => CHANGE_TO_MODE_2,
            Mode::Mode3 => CHANGE_TO_MODE_3,
            Mode::Inclination => CHANGE_TO_MODE_4,
        }
    }

    /// Accelerometer sensitivity in LSB/g.
    pub fn sensitivity(self) -> f64 {
        match self {
            Mode::Mode1 => 6000.0,
            Mode::Mode2 => 3000.0,
            Mode::Mode3 | Mode::Inclination => 12000.0,
        }
    }

    /// Output data rate in Hz.
    pub fn output_data_rate(self) -> u32 {
        match self {
            Mode::Mode1 => 40,
            Mode::Mode2 => 70,
            Mode::Mode3 | Mode::Inclination => 10,
        }
    }
}

/// Configuration settings for the SCL3300 driver.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// The measurement mode selected during startup.
    pub mode: Mode,
    // Only settable through `rate_percent`, which keeps it in 1..=100.
    rate_percent: u8,
    /// How many WHOAMI reads are attempted before giving up on the device.
    pub identity_retries: u32,
    /// Pause between the software reset and the mode selection.
    pub reset_settle: Duration,
    /// Pause between the mode selection and the first status poll.
    pub mode_settle: Duration,
}

impl Config {
    /// Creates a new `Config` instance for the given mode with default timings.
    ///
    /// # Arguments
    ///
    /// * `mode` - The `Mode` selected during startup.
    pub fn new(mode: Mode) -> Config {
        Config {
            mode,
            ..Config::default()
        }
    }

    /// Sets the measurement mode.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the sampling pace.
    ///
    /// # Arguments
    ///
    /// * `percent` - Percentage of the output data rate, `100` being the fastest.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` with the new pace.
    /// * `Err(Error::InvalidArg)` if `percent` is outside `1..=100`.
    pub fn rate_percent(mut self, percent: u8) -> Result<Self, Error> {
        if !(1..=100).contains(&percent) {
            log::error!("Rate percentage {} out of range (1-100)", percent);
            return Err(Error::InvalidArg);
        }
        self.rate_percent = percent;
        Ok(self)
    }

    /// Sampling pace as a percentage of the mode's output data rate (1-100).
    pub fn pace_percent(&self) -> u8 {
        self.rate_percent
    }

    /// Sets the WHOAMI retry ceiling.
    ///
    /// # Returns
    ///
    /// * `Err(Error::InvalidArg)` if `retries` is zero.
    pub fn identity_retries(mut self, retries: u32) -> Result<Self, Error> {
        if retries == 0 {
            return Err(Error::InvalidArg);
        }
        self.identity_retries = retries;
        Ok(self)
    }

    /// Sets the two startup settle delays.
    pub fn settle_delays(mut self, reset: Duration, mode: Duration) -> Self {
        self.reset_settle = reset;
        self.mode_settle = mode;
        self
    }

    /// One period of the output data rate; used to pace status and WHOAMI polls.
    pub fn output_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.mode.output_data_rate()))
    }

    /// Delay between two sample cycles.
    pub fn sample_interval(&self) -> Duration {
        let percent = self.rate_percent.clamp(1, 100);
        let scaled = u64::from(self.mode.output_data_rate()) * u64::from(percent);
        Duration::from_micros(100_000_000 / scaled)
    }
}

/// Provides default configuration values for the SCL3300 driver.
impl Default for Config {
    /// Returns the default configuration.
    ///
    /// The default configuration selects the low-noise `Inclination` mode at
    /// the full output data rate, 100 WHOAMI attempts, and the datasheet's
    /// recommended 1 ms and 100 ms startup settle times.
    fn default() -> Config {
        Config {
            mode: Mode::Inclination,
            rate_percent: 100,
            identity_retries: 100,
            reset_settle: Duration::from_millis(1),
            mode_settle: Duration::from_millis(100),
        }
    }
}
