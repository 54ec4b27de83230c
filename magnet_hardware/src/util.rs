use std::io::ErrorKind;
use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Read bytes through `read` until `terminator` is seen or `timeout` expires.
/// Returns the line without its terminator. Port-level read timeouts
/// (`TimedOut`/`WouldBlock`) are polled again after `poll_interval`.
pub fn read_line_with_timeout(
    mut read: impl FnMut(&mut [u8]) -> std::io::Result<usize>,
    terminator: &[u8],
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::with_capacity(64);
    let mut byte = [0u8; 1];
    loop {
        if Instant::now() >= deadline {
            return Err(HwError::Timeout);
        }
        match read(&mut byte) {
            Ok(0) => return Err(HwError::UnexpectedEof),
            Ok(_) => {
                line.push(byte[0]);
                if !terminator.is_empty() && line.ends_with(terminator) {
                    line.truncate(line.len() - terminator.len());
                    return String::from_utf8(line).map_err(|_| HwError::Encoding);
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                if !poll_interval.is_zero() {
                    std::thread::sleep(poll_interval);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(HwError::Io(e)),
        }
    }
}
