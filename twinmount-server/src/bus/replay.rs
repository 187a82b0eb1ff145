//! Replay of a recorded candump log
//!
//! Lines look like `(1436509052.249713) can0 200#0000803F`. Frames are
//! released at the pace they were recorded, measured from the first line.
//! Lines that cannot be parsed are logged and skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use twinmount_core::protocol::{BusFrame, MAX_PAYLOAD};

use super::{BusError, BusTransport};

/// Parse one candump line into (timestamp seconds, id, data)
pub fn parse_candump_line(line: &str, line_no: usize) -> Result<(f64, u32, Vec<u8>), BusError> {
    let bad = |reason: &str| BusError::Replay {
        line: line_no,
        reason: reason.to_string(),
    };

    let mut fields = line.split_whitespace();
    let stamp = fields
        .next()
        .and_then(|s| s.strip_prefix('('))
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| bad("missing (timestamp)"))?;
    let stamp: f64 = stamp
        .parse()
        .ok()
        .filter(|s: &f64| s.is_finite())
        .ok_or_else(|| bad("bad timestamp"))?;
    let _interface = fields.next().ok_or_else(|| bad("missing interface"))?;
    let frame = fields.next().ok_or_else(|| bad("missing frame"))?;

    let (id, data) = frame.split_once('#').ok_or_else(|| bad("missing '#'"))?;
    let id = u32::from_str_radix(id, 16).map_err(|_| bad("bad id"))?;
    if data.starts_with('#') || data.starts_with('R') {
        return Err(bad("FD and remote frames are not supported"));
    }
    if !data.is_ascii() || data.len() % 2 != 0 || data.len() / 2 > MAX_PAYLOAD {
        return Err(bad("bad data length"));
    }
    let data = (0..data.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&data[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| bad("bad data"))?;

    Ok((stamp, id, data))
}

struct ReplayState {
    lines: Box<dyn BufRead + Send>,
    line_no: usize,
    first_stamp: Option<f64>,
    started: Instant,
    pending: Option<(Duration, BusFrame)>,
}

impl ReplayState {
    /// Next parseable frame and its offset from the start of the log
    fn next_frame(&mut self) -> Result<Option<(Duration, BusFrame)>, BusError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.lines.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let (stamp, id, data) = match parse_candump_line(text, self.line_no) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::warn!("{}", e);
                    continue;
                }
            };
            let first = *self.first_stamp.get_or_insert(stamp);
            let offset_ms = ((stamp - first).max(0.0) * 1000.0).round() as u64;
            return Ok(Some((
                Duration::from_millis(offset_ms),
                BusFrame::new(id, &data, offset_ms)?,
            )));
        }
    }
}

pub struct ReplayTransport {
    name: String,
    state: Mutex<ReplayState>,
}

impl ReplayTransport {
    pub fn open(path: &Path) -> Result<ReplayTransport, BusError> {
        let file = File::open(path)?;
        Ok(ReplayTransport::from_reader(
            path.display().to_string(),
            BufReader::new(file),
        ))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(name: String, reader: R) -> ReplayTransport {
        ReplayTransport {
            name,
            state: Mutex::new(ReplayState {
                lines: Box::new(reader),
                line_no: 0,
                first_stamp: None,
                started: Instant::now(),
                pending: None,
            }),
        }
    }
}

impl BusTransport for ReplayTransport {
    fn recv(&self, timeout: Duration) -> Result<Option<BusFrame>, BusError> {
        let mut state = self.state.lock().unwrap();
        let (offset, frame) = match state.pending.take() {
            Some(pending) => pending,
            None => match state.next_frame()? {
                Some(next) => next,
                None => return Err(BusError::EndOfReplay),
            },
        };

        let elapsed = state.started.elapsed();
        if offset > elapsed {
            let wait = offset - elapsed;
            if wait > timeout {
                std::thread::sleep(timeout);
                state.pending = Some((offset, frame));
                return Ok(None);
            }
            std::thread::sleep(wait);
        }
        Ok(Some(frame))
    }

    fn send(&self, _frame: &BusFrame) -> Result<(), BusError> {
        Err(BusError::SendRefused(format!("replay {}", self.name)))
    }

    fn name(&self) -> String {
        format!("replay {}", self.name)
    }
}
