//! Bounded retry for replies whose signature does not match.

use std::time::Duration;

use magnet_traits::Clock;

use crate::error::ControllerError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Outcome of one failed attempt.
#[derive(Debug)]
pub enum Attempt {
    /// Reply had the wrong shape; try again.
    Mismatch { reply: String },
    /// Not retryable; stop immediately.
    Abort(ControllerError),
}

#[derive(Debug)]
pub enum RetryError {
    Exhausted { attempts: u32, last_reply: String },
    Aborted(ControllerError),
}

/// Run `op` until it succeeds, aborts, or `policy.max_attempts` mismatches
/// have been seen. `op` receives the 1-based attempt number. The backoff is
/// slept between attempts only, never after the last one.
pub fn with_retry<T>(
    policy: RetryPolicy,
    clock: &dyn Clock,
    mut op: impl FnMut(u32) -> Result<T, Attempt>,
) -> Result<T, RetryError> {
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(Attempt::Abort(e)) => return Err(RetryError::Aborted(e)),
            Err(Attempt::Mismatch { reply }) => {
                if attempt >= max {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last_reply: reply,
                    });
                }
                tracing::warn!(attempt, max, reply = %reply, "reply signature mismatch, retrying");
                clock.sleep(policy.backoff);
                attempt += 1;
            }
        }
    }
}
