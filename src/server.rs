//! Line-per-connection TCP responder.
//!
//! Each client that connects gets exactly one line, the current record or a
//! diagnostic, and the connection is closed. Clients are served one at a time.

use std::convert::Infallible;
use std::io::Write;
use std::net::TcpListener;

use log::{error, info, warn};

use crate::{Aggregator, Error};

/// Port the inclinometer responder listens on by default.
pub const DEFAULT_PORT: u16 = 2017;

/// Sent instead of a record when nothing was sampled since the last query.
pub const NO_SAMPLES_LINE: &str = "ERROR: no samples collected yet\n";

/// Answers one query on `out`.
///
/// # Returns
///
/// * `Ok(())` after writing a record or the no-samples diagnostic.
/// * `Err(Error::RecordOverflow)` if the record did not fit its buffer. Nothing
///   is written; the caller should treat this as fatal.
/// * `Err(Error::ConnectionFailure)` if writing to `out` failed.
pub fn respond<W: Write>(out: &mut W, aggregator: &Aggregator) -> Result<(), Error> {
    let written = match aggregator.query() {
        Ok(record) => out.write_all(record.render()?.as_bytes()),
        Err(Error::NoSamples) => {
            warn!("Query before any sample was collected");
            out.write_all(NO_SAMPLES_LINE.as_bytes())
        }
        Err(e) => return Err(e),
    };
    written.and_then(|_| out.flush()).map_err(|e| {
        warn!("Failed to send reply: {}", e);
        Error::ConnectionFailure
    })
}

/// Serves clients from `listener` until a fatal error occurs.
///
/// Failed connections are logged and skipped. Only a record overflow stops
/// the loop.
pub fn serve(listener: &TcpListener, aggregator: &Aggregator) -> Result<Infallible, Error> {
    if let Ok(address) = listener.local_addr() {
        info!("Listening on {}", address);
    }
    loop {
        let mut stream = match listener.accept() {
            Ok((stream, peer)) => {
                log::debug!("Query from {}", peer);
                stream
            }
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        match respond(&mut stream, aggregator) {
            Ok(()) | Err(Error::ConnectionFailure) => {}
            Err(e) => {
                error!("ERROR: trying to write too much data to the network: {}", e);
                return Err(e);
            }
        }
    }
}
