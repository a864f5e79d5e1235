//! Bus script and delay fake shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

use crate::{checksum, Command};

/// Reply of the STATUS register in normal operation; also what the sensor
/// answers to the filler status request.
pub const IDLE: [u8; 4] = [0x19, 0x00, 0x00, 0x6A];

/// Builds a reply frame with a correct checksum.
pub fn reply(b0: u8, b1: u8, b2: u8) -> [u8; 4] {
    [b0, b1, b2, checksum::for_bytes(b0, b1, b2)]
}

/// Builds a reply frame whose checksum is off by one bit.
pub fn corrupted(b0: u8, b1: u8, b2: u8) -> [u8; 4] {
    [b0, b1, b2, checksum::for_bytes(b0, b1, b2) ^ 0x01]
}

/// Expects each command in order, answering it with the paired frame.
///
/// The frame paired with a command is what the sensor clocks in during that
/// exchange, i.e. the reply to the command before it.
pub fn spi(exchanges: &[(Command, [u8; 4])]) -> SpiMock<u8> {
    let transactions: Vec<SpiTransaction<u8>> = exchanges
        .iter()
        .flat_map(|(command, answer)| {
            [
                SpiTransaction::transaction_start(),
                SpiTransaction::transfer(command.bytes.to_vec(), answer.to_vec()),
                SpiTransaction::transaction_end(),
            ]
        })
        .collect();
    SpiMock::new(&transactions)
}

/// Records requested delays instead of sleeping. Clones share the tally.
#[derive(Debug, Clone, Default)]
pub struct FakeDelay {
    total_ns: Arc<AtomicU64>,
    halted: Arc<AtomicBool>,
    budget_ns: Option<u64>,
}

impl FakeDelay {
    /// Parks the calling thread for good once `budget` of delay was requested.
    pub fn halting_after(budget: Duration) -> Self {
        Self {
            budget_ns: Some(budget.as_nanos() as u64),
            ..Self::default()
        }
    }

    pub fn total_ns(&self) -> u64 {
        self.total_ns.load(Ordering::SeqCst)
    }

    pub fn halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        let total = self.total_ns.fetch_add(u64::from(ns), Ordering::SeqCst) + u64::from(ns);
        if matches!(self.budget_ns, Some(budget) if total >= budget) {
            self.halted.store(true, Ordering::SeqCst);
            loop {
                thread::park();
            }
        }
    }
}
