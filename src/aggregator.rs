//! Turns drained sums into averaged, calibrated result records.

use core::fmt::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::{Accumulator, Error, Mode, Snapshot};

/// Capacity of a rendered record, newline included.
pub const RECORD_CAPACITY: usize = 1024;

/// Orientation every angle is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    /// Magnitude of `(x, y, z)`.
    pub length: f64,
}

impl Baseline {
    fn from_averages(averages: &Averages) -> Self {
        let x = averages.x.round() as i64;
        let y = averages.y.round() as i64;
        let z = averages.z.round() as i64;
        let length = ((x * x + y * y + z * z) as f64).sqrt();
        Baseline { x, y, z, length }
    }

    /// Angle in degrees between the baseline and `averages`.
    ///
    /// `NaN` if either vector has zero length.
    pub fn angle_to(&self, averages: &Averages) -> f64 {
        let dot = self.x as f64 * averages.x
            + self.y as f64 * averages.y
            + self.z as f64 * averages.z;
        let cosine = dot / (self.length * averages.length());
        // Rounding can push a parallel vector just past 1.
        cosine.clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// Zero reference for tilt angles, taken from the first averaged sample.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Calibration {
    #[default]
    Uninitialized,
    Established(Baseline),
}

/// Per-axis and temperature averages in raw counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Averages {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub temperature: f64,
}

impl Averages {
    /// `None` for a snapshot without samples.
    pub fn of(snapshot: &Snapshot) -> Option<Self> {
        if snapshot.count == 0 {
            return None;
        }
        let n = snapshot.count as f64;
        Some(Averages {
            x: snapshot.sum_x as f64 / n,
            y: snapshot.sum_y as f64 / n,
            z: snapshot.sum_z as f64 / n,
            temperature: snapshot.sum_temperature as f64 / n,
        })
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Converts a raw temperature count to degrees Celsius.
pub fn celsius(raw: f64) -> f64 {
    -273.0 + raw / 18.9
}

/// One answer to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub x_g: f64,
    pub y_g: f64,
    pub z_g: f64,
    pub angle_deg: f64,
    pub checksum_valid_ratio: f64,
    /// Last intact self-test output, 0 until one was seen.
    pub sto: i16,
    pub temperature_celsius: f64,
    /// Number of samples averaged into this record.
    pub samples: u64,
}

impl Record {
    /// Renders the tab-separated line, newline included.
    ///
    /// # Returns
    ///
    /// * `Err(Error::RecordOverflow)` if the line does not fit [`RECORD_CAPACITY`].
    pub fn render(&self) -> Result<heapless::String<RECORD_CAPACITY>, Error> {
        self.render_into()
    }

    fn render_into<const N: usize>(&self) -> Result<heapless::String<N>, Error> {
        let mut line = heapless::String::new();
        writeln!(line, "{}", self).map_err(|_| Error::RecordOverflow)?;
        Ok(line)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.2}\t{}\t{:.2}",
            self.timestamp,
            self.x_g,
            self.y_g,
            self.z_g,
            self.angle_deg,
            self.checksum_valid_ratio,
            self.sto,
            self.temperature_celsius
        )
    }
}

/// Answers queries by draining the accumulator.
pub struct Aggregator {
    accumulator: Arc<Accumulator>,
    mode: Mode,
    calibration: Mutex<Calibration>,
}

impl Aggregator {
    /// `mode` must be the mode the sensor was started in; it fixes the sensitivity.
    pub fn new(accumulator: Arc<Accumulator>, mode: Mode) -> Self {
        Self {
            accumulator,
            mode,
            calibration: Mutex::new(Calibration::Uninitialized),
        }
    }

    pub fn calibration(&self) -> Calibration {
        *self.calibration.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Drains the accumulator and builds a record stamped with the current time.
    pub fn query(&self) -> Result<Record, Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.query_at(now)
    }

    /// Drains the accumulator and builds a record stamped with `timestamp`.
    ///
    /// The first successful query establishes the calibration baseline, so
    /// its angle is always close to 0.
    ///
    /// # Returns
    ///
    /// * `Err(Error::NoSamples)` if nothing was sampled since the previous query.
    pub fn query_at(&self, timestamp: f64) -> Result<Record, Error> {
        // Held across the drain so that concurrent queries establish the
        // baseline from whichever drain came first.
        let mut calibration = self.calibration.lock().unwrap_or_else(|p| p.into_inner());
        let snapshot = self.accumulator.drain();
        let averages = Averages::of(&snapshot).ok_or(Error::NoSamples)?;

        let baseline = match *calibration {
            Calibration::Established(baseline) => baseline,
            Calibration::Uninitialized => {
                let baseline = Baseline::from_averages(&averages);
                info!("Calibration baseline established: {:?}", baseline);
                *calibration = Calibration::Established(baseline);
                baseline
            }
        };
        drop(calibration);

        let sensitivity = self.mode.sensitivity();
        let record = Record {
            timestamp,
            x_g: averages.x / sensitivity,
            y_g: averages.y / sensitivity,
            z_g: averages.z / sensitivity,
            angle_deg: baseline.angle_to(&averages),
            checksum_valid_ratio: snapshot.stats.valid_ratio(),
            sto: snapshot.sto.unwrap_or(0),
            temperature_celsius: celsius(averages.temperature),
            samples: snapshot.count,
        };
        debug!("Averaged {} samples: {:?}", snapshot.count, record);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProtocolStats, Sample};

    fn sample(x: i16, y: i16, z: i16, temperature: i16) -> Sample {
        Sample {
            x,
            y,
            z,
            temperature,
            sto: None,
        }
    }

    // acos is ill-conditioned next to 0 and 180 degrees.
    const ANGLE_TOLERANCE: f64 = 1e-5;

    fn aggregator() -> (Arc<Accumulator>, Aggregator) {
        let accumulator = Arc::new(Accumulator::new());
        let aggregator = Aggregator::new(accumulator.clone(), Mode::Inclination);
        (accumulator, aggregator)
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "{} is not close to {}",
            actual,
            expected
        );
    }

    #[test]
    fn averages_are_arithmetic_means() {
        let (accumulator, aggregator) = aggregator();
        accumulator.fold(&sample(0, 1200, 12000, 5000), ProtocolStats::default());
        accumulator.fold(&sample(600, 0, 11000, 5100), ProtocolStats::default());
        accumulator.fold(&sample(-300, 300, 13000, 5200), ProtocolStats::default());

        let record = aggregator.query_at(1.0).unwrap();
        assert_eq!(record.samples, 3);
        assert_close(record.x_g, 100.0 / 12000.0, 1e-9);
        assert_close(record.y_g, 500.0 / 12000.0, 1e-9);
        assert_close(record.z_g, 1.0, 1e-9);
        assert_close(record.temperature_celsius, -273.0 + 5100.0 / 18.9, 1e-9);
    }

    #[test]
    fn empty_accumulator_reports_no_samples() {
        let (accumulator, aggregator) = aggregator();
        assert_eq!(aggregator.query_at(1.0), Err(Error::NoSamples));

        accumulator.fold(&sample(0, 0, 12000, 0), ProtocolStats::default());
        assert!(aggregator.query_at(2.0).is_ok());
        assert_eq!(aggregator.query_at(3.0), Err(Error::NoSamples));
    }

    #[test]
    fn first_query_establishes_baseline_once() {
        let (accumulator, aggregator) = aggregator();
        assert_eq!(aggregator.calibration(), Calibration::Uninitialized);

        accumulator.fold(&sample(0, 0, 12000, 0), ProtocolStats::default());
        accumulator.fold(&sample(2, 0, 12002, 0), ProtocolStats::default());
        let first = aggregator.query_at(1.0).unwrap();
        assert_close(first.angle_deg, 0.0, ANGLE_TOLERANCE);
        assert_eq!(
            aggregator.calibration(),
            Calibration::Established(Baseline {
                x: 1,
                y: 0,
                z: 12001,
                length: ((1 + 12001i64 * 12001) as f64).sqrt(),
            })
        );

        accumulator.fold(&sample(12000, 0, 0, 0), ProtocolStats::default());
        aggregator.query_at(2.0).unwrap();
        match aggregator.calibration() {
            Calibration::Established(baseline) => assert_eq!(baseline.z, 12001),
            Calibration::Uninitialized => panic!("baseline was lost"),
        }
    }

    #[test]
    fn orthogonal_tilt_is_ninety_degrees() {
        let (accumulator, aggregator) = aggregator();
        accumulator.fold(&sample(0, 0, 12000, 0), ProtocolStats::default());
        aggregator.query_at(1.0).unwrap();

        accumulator.fold(&sample(0, 12000, 0, 0), ProtocolStats::default());
        assert_close(aggregator.query_at(2.0).unwrap().angle_deg, 90.0, ANGLE_TOLERANCE);

        accumulator.fold(&sample(0, 0, 12000, 0), ProtocolStats::default());
        assert_close(aggregator.query_at(3.0).unwrap().angle_deg, 0.0, ANGLE_TOLERANCE);

        accumulator.fold(&sample(0, 0, -12000, 0), ProtocolStats::default());
        assert_close(aggregator.query_at(4.0).unwrap().angle_deg, 180.0, ANGLE_TOLERANCE);
    }

    #[test]
    fn concurrent_queries_take_baseline_from_the_only_drain() {
        let (accumulator, aggregator) = aggregator();
        let aggregator = Arc::new(aggregator);
        accumulator.fold(&sample(0, 12000, 0, 0), ProtocolStats::default());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let aggregator = aggregator.clone();
                std::thread::spawn(move || aggregator.query_at(f64::from(i)))
            })
            .collect();
        let answered: Vec<Record> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap().ok())
            .collect();

        assert_eq!(answered.len(), 1);
        assert_close(answered[0].angle_deg, 0.0, ANGLE_TOLERANCE);
        match aggregator.calibration() {
            Calibration::Established(baseline) => {
                assert_eq!((baseline.x, baseline.y, baseline.z), (0, 12000, 0))
            }
            Calibration::Uninitialized => panic!("no baseline after a successful query"),
        }
    }

    #[test]
    fn record_carries_stats_and_sto() {
        let (accumulator, aggregator) = aggregator();
        accumulator.fold(
            &Sample {
                sto: Some(-3),
                ..sample(0, 0, 12000, 5670)
            },
            ProtocolStats {
                frames: 200,
                valid: 199,
            },
        );
        let record = aggregator.query_at(1.0).unwrap();
        assert_close(record.checksum_valid_ratio, 0.995, 1e-9);
        assert_eq!(record.sto, -3);
    }

    #[test]
    fn renders_tab_separated_line() {
        let record = Record {
            timestamp: 1700000000.25,
            x_g: 0.5,
            y_g: -0.25,
            z_g: 1.0,
            angle_deg: 12.5,
            checksum_valid_ratio: 0.996,
            sto: 3,
            temperature_celsius: 26.7,
            samples: 10,
        };
        assert_eq!(
            record.render().unwrap().as_str(),
            "1700000000.250000\t0.500000\t-0.250000\t1.000000\t12.500000\t1.00\t3\t26.70\n"
        );
        assert_eq!(
            record.render_into::<16>(),
            Err(Error::RecordOverflow)
        );
    }
}
