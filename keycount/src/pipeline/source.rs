use crossbeam_channel::Sender;
use std::io::BufRead;
use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::config::EncodingMode;
use crate::errors::{CountError, CountResult};
use crate::metrics::RunMetrics;

/// Strips the line terminator and decodes the raw line
fn decode_line(
    mut bytes: Vec<u8>,
    line_number: u64,
    encoding: EncodingMode,
) -> CountResult<String> {
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
    }

    match String::from_utf8(bytes) {
        Ok(line) => Ok(line),
        Err(e) => match encoding {
            EncodingMode::FailFast => Err(CountError::Encoding { line: line_number }),
            EncodingMode::Lossy => {
                warn!("Invalid UTF-8 replaced in input line {}", line_number);
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        },
    }
}

/// Reads `reader` line by line and hands every line to the workers.
///
/// Each send blocks until a worker takes the line (or the channel has room, when it
/// was created with a capacity). The cancel token is checked before every send; once
/// it is raised no further line is emitted and production ends without error.
/// Dropping `sender` on return closes the channel, which is how the workers learn
/// that the input is exhausted.
///
/// A read or decoding failure raises the cancel token and is returned as the
/// producer's terminal error. Returns the number of lines emitted.
pub fn produce<R: BufRead>(
    mut reader: R,
    sender: Sender<String>,
    cancel: &CancelToken,
    encoding: EncodingMode,
    metrics: &RunMetrics,
) -> CountResult<u64> {
    let mut emitted = 0u64;

    loop {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                cancel.cancel();
                return Err(CountError::read_error(emitted, e));
            }
        }

        if cancel.is_canceled() {
            debug!("Cancellation observed after {} lines", emitted);
            return Ok(emitted);
        }

        let line = decode_line(buf, emitted + 1, encoding).inspect_err(|_| cancel.cancel())?;
        trace!("Emitting line {}", emitted + 1);
        if sender.send(line).is_err() {
            debug!("All workers gone, stopping after {} lines", emitted);
            return Ok(emitted);
        }
        emitted += 1;
        metrics.record_line_read();
    }

    debug!("Input exhausted after {} lines", emitted);
    Ok(emitted)
}
