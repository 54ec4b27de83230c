//! Sampling loops: record a ramp transient, or record until cancelled.

use magnet_traits::Transport;
use tracing::{info, warn};

use crate::controller::Controller;
use crate::error::{ControllerError, ProtocolError, Result};
use crate::types::RampState;

impl<T: Transport> Controller<T> {
    /// Sample output until the supply has reported HOLDING for
    /// `ramp.holding_samples` consecutive polls.
    ///
    /// Returns the number of samples appended. Fails with `RampTimeout` once
    /// `ramp.max_wait` has elapsed and with `Cancelled` when the cancel token
    /// fires; samples taken so far stay in the record either way.
    pub fn record_ramping(&mut self) -> Result<usize> {
        let started = self.clock.now();
        let needed = self.cfg.ramp.holding_samples.max(1);
        let mut holding = 0u32;
        let mut taken = 0usize;
        let mut skipped = 0u32;
        info!(needed, "recording ramp");
        loop {
            self.check_cancel()?;
            if let Some(max_wait) = self.cfg.ramp.max_wait {
                let waited_ms = self.clock.ms_since(started);
                if u128::from(waited_ms) >= max_wait.as_millis() {
                    warn!(waited_ms, "ramp did not settle before the deadline");
                    self.log
                        .note(&format!("ramp timed out after {waited_ms} ms"));
                    return Err(ControllerError::RampTimeout { waited_ms });
                }
            }
            if self.sample(&mut skipped)? {
                taken += 1;
            }
            let status = self.refresh_ramp_status()?;
            match status.state() {
                RampState::Holding => holding += 1,
                RampState::Ramping => holding = 0,
                RampState::Other(s) => {
                    if self.cfg.ramp.strict_state {
                        return Err(ControllerError::RampState(s.clone()));
                    }
                    holding = 0;
                }
            }
            if holding >= needed {
                break;
            }
            self.clock.sleep(self.cfg.ramp.sample_interval);
        }
        info!(samples = taken, "ramp finished");
        self.log.note("ramp finished");
        Ok(taken)
    }

    /// Sample output every `ramp.sample_interval` until the cancel token
    /// fires. Returns the number of samples appended.
    pub fn start_record(&mut self) -> Result<usize> {
        self.record_loop(None)
    }

    /// Like `start_record`, but also stops once `limit` samples were taken.
    pub fn record_samples(&mut self, limit: usize) -> Result<usize> {
        self.record_loop(Some(limit))
    }

    fn record_loop(&mut self, limit: Option<usize>) -> Result<usize> {
        let mut taken = 0usize;
        let mut skipped = 0u32;
        info!(?limit, "recording started");
        loop {
            if self.cancel.is_cancelled() {
                self.cancel.reset();
                break;
            }
            if limit.is_some_and(|n| taken >= n) {
                break;
            }
            if self.sample(&mut skipped)? {
                taken += 1;
                if limit.is_some_and(|n| taken >= n) {
                    break;
                }
            }
            self.clock.sleep(self.cfg.ramp.sample_interval);
        }
        info!(samples = taken, "recording stopped");
        Ok(taken)
    }

    fn check_cancel(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            self.cancel.reset();
            self.log.note("sampling cancelled");
            return Err(ControllerError::Cancelled);
        }
        Ok(())
    }

    /// Read output once and append it. An output read that ran out of
    /// retries is logged and skipped; `ramp.max_skipped` skips in a row
    /// fail the loop with the last mismatch.
    fn sample(&mut self, skipped: &mut u32) -> Result<bool> {
        match self.refresh_output() {
            Ok(r) => {
                *skipped = 0;
                self.record.push(r);
                self.publish();
                Ok(true)
            }
            Err(ControllerError::Protocol(e @ ProtocolError::SchemaMismatch { .. })) => {
                *skipped += 1;
                if *skipped >= self.cfg.ramp.max_skipped.max(1) {
                    warn!(skipped = *skipped, "giving up on unreadable output");
                    self.log
                        .note(&format!("recording aborted after {skipped} skipped samples"));
                    return Err(ControllerError::Protocol(e));
                }
                warn!(error = %e, "output sample skipped");
                self.log.note("output sample skipped");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
