//! Startup sequence: software reset, mode selection, wait for normal
//! operation, then confirm the device identity.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use log::{debug, error, info, warn};

use crate::{
    Error, ReturnStatus, Scl3300, READ_STATUS_SUMMARY, READ_WHOAMI, SW_RESET, WHOAMI_VALUE,
};

/// Progress of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    /// Nothing sent yet, or the previous mode selection was rejected.
    Idle,
    /// Software reset sent.
    Resetting,
    /// Mode selection accepted with a valid checksum.
    SelectingMode,
    /// Polling the status summary until it reports normal operation.
    AwaitingNormal,
    /// Normal operation confirmed.
    Normal,
    /// WHOAMI never matched within the retry budget.
    Failed,
}

/// Counters describing how a successful startup went.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    /// Reset-and-select rounds, including the successful one.
    pub mode_selections: u32,
    /// Status summary polls after the mode settle time.
    pub status_polls: u32,
    /// WHOAMI reads until the identity matched.
    pub identity_attempts: u32,
}

impl<SPI, D> Scl3300<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// Brings the sensor from power-on into normal operation in the configured
    /// mode and verifies it answers with the SCL3300 identity.
    ///
    /// A mode selection answered with a corrupted frame restarts the sequence
    /// from the software reset, without limit; so does waiting for normal
    /// status. Only the identity check is bounded, by
    /// [`Config::identity_retries`](crate::Config::identity_retries).
    ///
    /// # Returns
    ///
    /// * `Ok(StartupReport)` once normal operation and the identity are confirmed.
    /// * `Err(Error::DeviceNotFound)` if WHOAMI never matched. The sensor is
    ///   absent or miswired; this is not worth retrying.
    /// * `Err(Error::TransferFailure)` if the SPI bus itself failed.
    pub fn startup(&mut self) -> Result<StartupReport, Error> {
        let mut report = StartupReport::default();
        let mut state = StartupState::Idle;

        loop {
            debug!("Startup state: {:?}", state);
            state = match state {
                StartupState::Idle => {
                    // The reply is to whatever came before the reset.
                    self.exchange(&SW_RESET)?;
                    StartupState::Resetting
                }
                StartupState::Resetting => {
                    self.pause(self.config.reset_settle);
                    report.mode_selections += 1;
                    let command = self.config.mode.select_command();
                    let frame = self.exchange(&command)?;
                    if frame.checksum_valid {
                        StartupState::SelectingMode
                    } else {
                        warn!(
                            "Corrupted reply while selecting {:?}, resetting again",
                            self.config.mode
                        );
                        StartupState::Idle
                    }
                }
                StartupState::SelectingMode => {
                    self.pause(self.config.mode_settle);
                    // Collects the reply to the mode selection itself.
                    self.exchange(&READ_STATUS_SUMMARY)?;
                    self.pause(self.config.output_interval());
                    StartupState::AwaitingNormal
                }
                StartupState::AwaitingNormal => {
                    report.status_polls += 1;
                    let frame = self.exchange(&READ_STATUS_SUMMARY)?;
                    self.pause(self.config.output_interval());
                    if frame.checksum_valid && frame.status == ReturnStatus::Normal {
                        info!(
                            "Sensor in normal operation after {} status polls",
                            report.status_polls
                        );
                        StartupState::Normal
                    } else {
                        StartupState::AwaitingNormal
                    }
                }
                StartupState::Normal => match self.verify_identity()? {
                    Some(attempts) => {
                        report.identity_attempts = attempts;
                        info!("SCL3300 identified after {} WHOAMI reads", attempts);
                        return Ok(report);
                    }
                    None => StartupState::Failed,
                },
                StartupState::Failed => {
                    let attempts = self.config.identity_retries;
                    error!(
                        "Can't communicate with SPI device, no WHOAMI or WHOAMI is incorrect after {} retries",
                        attempts
                    );
                    return Err(Error::DeviceNotFound { attempts });
                }
            };
        }
    }

    // Returns the number of reads it took to see the identity, or None when
    // the budget ran out.
    fn verify_identity(&mut self) -> Result<Option<u32>, Error> {
        self.pause(self.config.output_interval());

        for attempt in 1..=self.config.identity_retries {
            let frame = self.exchange(&READ_WHOAMI)?;
            if frame.checksum_valid && frame.payload.1 == WHOAMI_VALUE {
                return Ok(Some(attempt));
            }
            self.pause(self.config.output_interval());
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{corrupted, reply, spi, FakeDelay, IDLE};
    use crate::{Command, Config, CHANGE_TO_MODE_4};

    // A clean startup up to and including the status poll reporting normal.
    fn until_normal() -> Vec<(Command, [u8; 4])> {
        vec![
            // Whatever the sensor held before the reset.
            (SW_RESET, reply(0x00, 0x00, 0x00)),
            // Reply to SW_RESET.
            (CHANGE_TO_MODE_4, reply(0xB4, 0x00, 0x20)),
            // Reply to the mode selection.
            (READ_STATUS_SUMMARY, reply(0xB4, 0x00, 0x03)),
            (READ_STATUS_SUMMARY, IDLE),
        ]
    }

    // The first WHOAMI read collects the last status reply, the second the identity.
    fn identified() -> [(Command, [u8; 4]); 2] {
        [
            (READ_WHOAMI, IDLE),
            (READ_WHOAMI, reply(0x41, 0x00, WHOAMI_VALUE)),
        ]
    }

    #[test]
    fn clean_startup_selects_inclination_mode() {
        let mut script = until_normal();
        script.extend(identified());
        let delay = FakeDelay::default();
        let mut sensor = Scl3300::new(spi(&script), delay.clone(), Config::default());

        let report = sensor.startup().unwrap();
        assert_eq!(
            report,
            StartupReport {
                mode_selections: 1,
                status_polls: 1,
                identity_attempts: 2,
            }
        );
        // 1 ms reset settle, 100 ms mode settle, then four 100 ms ODR periods.
        assert_eq!(delay.total_ns(), 501_000_000);

        let (mut bus, _) = sensor.release();
        bus.done();
    }

    #[test]
    fn corrupted_mode_selection_restarts_from_reset() {
        const FAILURES: u32 = 3;
        let mut script = vec![];
        for _ in 0..FAILURES {
            script.push((SW_RESET, reply(0x00, 0x00, 0x00)));
            script.push((CHANGE_TO_MODE_4, corrupted(0xB4, 0x00, 0x20)));
        }
        script.extend(until_normal());
        script.extend(identified());
        let mut sensor = Scl3300::new(spi(&script), FakeDelay::default(), Config::default());

        let report = sensor.startup().unwrap();
        assert_eq!(report.mode_selections, FAILURES + 1);

        let (mut bus, _) = sensor.release();
        bus.done();
    }

    #[test]
    fn waits_for_normal_status() {
        let script = [
            (SW_RESET, reply(0x00, 0x00, 0x00)),
            (CHANGE_TO_MODE_4, reply(0xB4, 0x00, 0x20)),
            (READ_STATUS_SUMMARY, reply(0xB4, 0x00, 0x03)),
            // Still starting up, then corrupted, then an error flag.
            (READ_STATUS_SUMMARY, reply(0x18, 0x00, 0x00)),
            (READ_STATUS_SUMMARY, corrupted(0x19, 0x00, 0x00)),
            (READ_STATUS_SUMMARY, reply(0x1B, 0x00, 0x00)),
            (READ_STATUS_SUMMARY, IDLE),
            (READ_WHOAMI, reply(0x41, 0x00, WHOAMI_VALUE)),
        ];
        let mut sensor = Scl3300::new(spi(&script), FakeDelay::default(), Config::default());

        let report = sensor.startup().unwrap();
        assert_eq!(report.status_polls, 4);
        assert_eq!(report.mode_selections, 1);
        assert_eq!(report.identity_attempts, 1);

        let (mut bus, _) = sensor.release();
        bus.done();
    }

    #[test]
    fn missing_identity_is_fatal_after_retry_budget() {
        let mut script = until_normal();
        // Normal status frames without the identity byte, exactly 100 times.
        script.extend((0..100).map(|_| (READ_WHOAMI, IDLE)));
        let mut sensor = Scl3300::new(spi(&script), FakeDelay::default(), Config::default());

        assert_eq!(
            sensor.startup(),
            Err(Error::DeviceNotFound { attempts: 100 })
        );

        let (mut bus, _) = sensor.release();
        bus.done();
    }

    #[test]
    fn corrupted_identity_does_not_count() {
        let mut script = until_normal();
        script.push((READ_WHOAMI, IDLE));
        script.push((READ_WHOAMI, corrupted(0x41, 0x00, WHOAMI_VALUE)));
        let config = Config::default().identity_retries(2).unwrap();
        let mut sensor = Scl3300::new(spi(&script), FakeDelay::default(), config);

        assert_eq!(sensor.startup(), Err(Error::DeviceNotFound { attempts: 2 }));

        let (mut bus, _) = sensor.release();
        bus.done();
    }
}
