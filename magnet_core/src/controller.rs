//! Protocol client and heater / ramp interlocks.
//!
//! All supply traffic goes through `&mut self`, so commands are strictly
//! serialized: the protocol is half-duplex and an overlapping query would
//! pair replies with the wrong commands. Read-only consumers take
//! `Snapshot`s instead of sharing the controller.

use std::sync::Arc;

use magnet_traits::Transport;
use magnet_traits::clock::{Clock, MonotonicClock};
use tracing::{debug, error, info, warn};

use crate::config::ControllerCfg;
use crate::error::{ControllerError, ProtocolError, Result};
use crate::hw_error::map_transport_error;
use crate::logger::ExchangeLog;
use crate::record::{CancelToken, Record};
use crate::reply::{self, ReplyError};
use crate::retry::{Attempt, RetryError, with_retry};
use crate::session::{Publisher, SessionState, Snapshot, SnapshotFeed};
use crate::status::{Outcome, Refusal};
use crate::types::{HeaterStatus, Output, Polarity, RampState, RampStatus, Reading, Sample};

/// Tolerance used when comparing the reported ramp rate to the nominal one.
const RATE_EPSILON: f64 = 1e-6;

pub struct Controller<T: Transport> {
    pub(crate) transport: T,
    pub(crate) cfg: ControllerCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) state: SessionState,
    pub(crate) record: Record,
    pub(crate) log: ExchangeLog,
    pub(crate) publisher: Publisher,
    pub(crate) cancel: CancelToken,
}

impl<T: Transport> std::fmt::Debug for Controller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("heater", &self.state.heater)
            .field("ramp", &self.state.ramp)
            .field("record_len", &self.record.len())
            .finish()
    }
}

pub struct ControllerBuilder<T> {
    transport: Option<T>,
    cfg: ControllerCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    log: Option<ExchangeLog>,
    cancel: Option<CancelToken>,
}

impl<T: Transport> Default for ControllerBuilder<T> {
    fn default() -> Self {
        Self {
            transport: None,
            cfg: ControllerCfg::default(),
            clock: None,
            log: None,
            cancel: None,
        }
    }
}

impl<T: Transport> ControllerBuilder<T> {
    pub fn with_transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_config(mut self, cfg: ControllerCfg) -> Self {
        self.cfg = cfg;
        self
    }

    /// Inject a clock (tests use a manually advanced one).
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn with_exchange_log(mut self, log: ExchangeLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Share a cancel token created before the controller (e.g. by a
    /// Ctrl-C handler).
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build and prime every cached reading from the supply.
    pub fn build(self) -> Result<Controller<T>> {
        let mut ctl = self.build_unprimed()?;
        ctl.refresh_all()?;
        info!(
            heater_on = ctl.state.heater.switch(),
            persistent = ctl.state.heater.is_persistent(),
            "controller primed"
        );
        Ok(ctl)
    }

    /// Build without talking to the supply; cached readings start empty.
    pub fn build_unprimed(self) -> Result<Controller<T>> {
        let transport = self
            .transport
            .ok_or_else(|| ControllerError::Config("missing transport".into()))?;
        let cfg = self.cfg;
        if cfg.ramp.holding_samples == 0 {
            return Err(ControllerError::Config(
                "ramp.holding_samples must be >= 1".into(),
            ));
        }
        if !(cfg.mid_max.is_finite() && cfg.mid_max > 0.0) {
            return Err(ControllerError::Config("mid_max must be > 0".into()));
        }
        if !(cfg.heater.field_tolerance.is_finite() && cfg.heater.field_tolerance >= 0.0) {
            return Err(ControllerError::Config(
                "heater.field_tolerance must be >= 0".into(),
            ));
        }
        Ok(Controller {
            transport,
            cfg,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            state: SessionState::default(),
            record: Record::new(),
            log: self.log.unwrap_or_default(),
            publisher: Publisher::default(),
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

impl<T: Transport> Controller<T> {
    pub fn builder() -> ControllerBuilder<T> {
        ControllerBuilder::default()
    }

    // ── transport plumbing ───────────────────────────────────────────────────

    /// One raw query, logged both ways.
    fn exchange(&mut self, command: &str) -> Result<String> {
        self.log.command(command);
        match self.transport.query(command) {
            Ok(reply) => {
                debug!(command, reply = %reply, "exchange");
                self.log.reply(&reply);
                Ok(reply)
            }
            Err(e) => {
                let err = map_transport_error(&*e);
                warn!(command, error = %err, "transport failure");
                self.log.note(&format!("`{command}` failed: {err}"));
                Err(err)
            }
        }
    }

    /// Fire-and-forget command.
    fn send(&mut self, command: &str) -> Result<()> {
        self.log.command(command);
        self.transport.write(command).map_err(|e| {
            let err = map_transport_error(&*e);
            warn!(command, error = %err, "transport failure");
            self.log.note(&format!("`{command}` failed: {err}"));
            err
        })
    }

    /// Query `command` and parse the reply, retrying on signature mismatch.
    fn query_parsed<V>(
        &mut self,
        command: &str,
        parse: fn(&str) -> std::result::Result<V, ReplyError>,
    ) -> Result<V> {
        let clock = Arc::clone(&self.clock);
        let policy = self.cfg.retry;
        let res = with_retry(policy, clock.as_ref(), |attempt| {
            let reply = self.exchange(command).map_err(Attempt::Abort)?;
            match parse(&reply) {
                Ok(v) => Ok(v),
                Err(ReplyError::Mismatch) => {
                    self.log.note(&format!(
                        "signature mismatch on `{command}` (attempt {attempt}/{})",
                        policy.max_attempts.max(1)
                    ));
                    Err(Attempt::Mismatch { reply })
                }
                Err(ReplyError::Value { index, token }) => {
                    Err(Attempt::Abort(ControllerError::Protocol(ProtocolError::Value {
                        command: command.to_string(),
                        index,
                        token,
                        reply,
                    })))
                }
            }
        });
        match res {
            Ok(v) => Ok(v),
            Err(RetryError::Aborted(e)) => Err(e),
            Err(RetryError::Exhausted {
                attempts,
                last_reply,
            }) => {
                error!(command, attempts, reply = %last_reply, "no valid reply after retries");
                self.log
                    .note(&format!("`{command}` gave up after {attempts} attempt(s)"));
                Err(ProtocolError::SchemaMismatch {
                    command: command.to_string(),
                    reply: last_reply,
                    attempts,
                }
                .into())
            }
        }
    }

    pub(crate) fn publish(&mut self) {
        if self.publisher.has_subscribers() {
            let snapshot = self.snapshot();
            self.publisher.publish(&snapshot);
        } else {
            self.publisher.prune();
        }
    }

    fn refuse(&mut self, refusal: Refusal) -> Outcome {
        info!(%refusal, "request refused");
        self.log.note(&format!("refused: {refusal}"));
        Outcome::Refused(refusal)
    }

    /// `None` when holding; otherwise the refusal to report.
    fn holding_gate(&mut self, ramp: &RampStatus, when_ramping: Refusal) -> Result<Option<Refusal>> {
        match ramp.state() {
            RampState::Holding => Ok(None),
            RampState::Ramping => Ok(Some(when_ramping)),
            RampState::Other(s) => {
                self.log.note(&format!("unrecognized ramp state {s:?}"));
                if self.cfg.ramp.strict_state {
                    error!(state = %s, "unrecognized ramp state");
                    Err(ControllerError::RampState(s.clone()))
                } else {
                    warn!(state = %s, "unrecognized ramp state");
                    Ok(Some(Refusal::NotHolding))
                }
            }
        }
    }

    // ── reads ────────────────────────────────────────────────────────────────

    pub fn refresh_output(&mut self) -> Result<Reading<Output>> {
        let r = self.query_parsed("GET OUTPUT", reply::parse_output)?;
        self.state.output = Some(r);
        self.publish();
        Ok(r)
    }

    pub fn refresh_mid(&mut self) -> Result<Reading<f64>> {
        let r = self.query_parsed("GET MID", reply::parse_setting)?;
        self.state.mid = Some(r);
        self.publish();
        Ok(r)
    }

    pub fn refresh_max(&mut self) -> Result<Reading<f64>> {
        let r = self.query_parsed("GET MAX", reply::parse_setting)?;
        self.state.max = Some(r);
        self.publish();
        Ok(r)
    }

    /// Read the ramp rate and log whether it matches the nominal rate.
    pub fn refresh_ramp_rate(&mut self) -> Result<Reading<f64>> {
        let r = self.query_parsed("GET RATE", reply::parse_setting)?;
        self.state.ramp_rate = Some(r);
        if self.ramp_rate_ok() == Some(true) {
            info!(rate = r.value, "ramp rate OK");
            self.log.note(&format!("ramp rate OK ({})", r.value));
        } else {
            warn!(
                rate = r.value,
                nominal = self.cfg.nominal_ramp_rate,
                "ramp rate NG"
            );
            self.log.note(&format!(
                "ramp rate NG ({} != {})",
                r.value, self.cfg.nominal_ramp_rate
            ));
        }
        self.publish();
        Ok(r)
    }

    pub fn refresh_heater_voltage(&mut self) -> Result<Reading<f64>> {
        let r = self.query_parsed("GET HV", reply::parse_setting)?;
        self.state.heater_voltage = Some(r);
        self.publish();
        Ok(r)
    }

    pub fn refresh_polarity(&mut self) -> Result<Reading<Polarity>> {
        let r = self.query_parsed("GET SIGN", reply::parse_polarity)?;
        self.state.polarity = Some(r);
        self.publish();
        Ok(r)
    }

    pub fn refresh_heater_status(&mut self) -> Result<HeaterStatus> {
        let r = self.query_parsed("HEATER", reply::parse_heater)?;
        self.state.heater = r.value;
        self.publish();
        Ok(r.value)
    }

    pub fn refresh_ramp_status(&mut self) -> Result<RampStatus> {
        let r = self.query_parsed("RAMP STATUS", reply::parse_ramp_status)?;
        if let RampState::Other(s) = r.value.state() {
            warn!(state = %s, "supply reports an unrecognized ramp state");
        }
        self.state.ramp = r.value.clone();
        self.publish();
        Ok(r.value)
    }

    /// Re-read every cached value.
    pub fn refresh_all(&mut self) -> Result<()> {
        self.refresh_output()?;
        self.refresh_mid()?;
        self.refresh_max()?;
        self.refresh_ramp_rate()?;
        self.refresh_heater_voltage()?;
        self.refresh_polarity()?;
        self.refresh_heater_status()?;
        self.refresh_ramp_status()?;
        Ok(())
    }

    // ── commands ─────────────────────────────────────────────────────────────

    /// Switch the persistent-switch heater, enforcing the interlock.
    ///
    /// Only while holding. Re-energizing a persistent magnet requires the
    /// supply field to be within `heater.field_tolerance` of the latched
    /// field. Blocks for `heater.settle` after the switch.
    pub fn set_heater(&mut self, on: bool) -> Result<Outcome> {
        if on {
            self.heater_on()
        } else {
            self.heater_off()
        }
    }

    fn heater_on(&mut self) -> Result<Outcome> {
        if self.state.heater.switch() {
            return Ok(self.refuse(Refusal::AlreadyOn));
        }
        let ramp = self.refresh_ramp_status()?;
        if let Some(r) = self.holding_gate(&ramp, Refusal::NotHolding)? {
            return Ok(self.refuse(r));
        }
        let latched = self.state.heater.field().filter(|_| self.state.heater.is_persistent());
        if let Some(persistent_field) = latched {
            let field = ramp.field().unwrap_or_default();
            if (field - persistent_field).abs() > self.cfg.heater.field_tolerance {
                return Ok(self.refuse(Refusal::PersistentFieldMismatch {
                    field,
                    persistent_field,
                }));
            }
        }
        self.switch_heater("HEATER ON", true)?;
        self.state.heater = HeaterStatus::on();
        self.publish();
        self.settle();
        info!("heater ON finished");
        Ok(Outcome::Applied)
    }

    fn heater_off(&mut self) -> Result<Outcome> {
        if self.state.heater.is_persistent() {
            error!("heater OFF requested while already persistent");
            self.log
                .note("precondition violated: heater OFF while persistent");
            return Err(ControllerError::Precondition(
                "heater OFF requested while already persistent; switch ON first",
            ));
        }
        if !self.state.heater.switch() {
            return Ok(self.refuse(Refusal::AlreadyOff));
        }
        let ramp = self.refresh_ramp_status()?;
        if let Some(r) = self.holding_gate(&ramp, Refusal::NotHolding)? {
            return Ok(self.refuse(r));
        }
        self.switch_heater("HEATER OFF", false)?;
        let field = ramp.field().unwrap_or_default();
        self.state.heater = if field > 0.0 {
            HeaterStatus::persistent(field)
        } else {
            HeaterStatus::off()
        };
        self.publish();
        self.settle();
        info!(persistent = self.state.heater.is_persistent(), "heater OFF finished");
        Ok(Outcome::Applied)
    }

    fn switch_heater(&mut self, command: &str, expect_on: bool) -> Result<()> {
        info!(command, "heater switch started");
        let reported = self.query_parsed(command, reply::parse_heater_ack)?;
        if let Some(on) = reported.filter(|on| *on != expect_on) {
            warn!(command, reported_on = on, "supply reported unexpected heater state");
            self.log
                .note(&format!("`{command}` acknowledged with heater on={on}"));
        }
        Ok(())
    }

    fn settle(&self) {
        debug!(settle_ms = self.cfg.heater.settle.as_millis() as u64, "heater settling");
        self.clock.sleep(self.cfg.heater.settle);
    }

    /// Ramp to zero and record the transient. No-op while already ramping.
    pub fn ramp_zero(&mut self) -> Result<Outcome> {
        self.ramp_to("RAMP ZERO")
    }

    /// Ramp to the MID setpoint and record the transient. No-op while
    /// already ramping.
    pub fn ramp_mid(&mut self) -> Result<Outcome> {
        self.ramp_to("RAMP MID")
    }

    fn ramp_to(&mut self, command: &str) -> Result<Outcome> {
        let ramp = self.refresh_ramp_status()?;
        if let Some(r) = self.holding_gate(&ramp, Refusal::AlreadyRamping)? {
            return Ok(self.refuse(r));
        }
        info!(command, "ramp requested");
        self.send(command)?;
        self.record_ramping()?;
        Ok(Outcome::Applied)
    }

    /// Change the MID setpoint; values outside `(0, mid_max]` are refused
    /// without sending anything. Records the transient if the supply starts
    /// ramping to the new setpoint.
    pub fn set_mid(&mut self, value: f64) -> Result<Outcome> {
        if !(value > 0.0 && value <= self.cfg.mid_max) {
            return Ok(self.refuse(Refusal::MidOutOfRange {
                value,
                max: self.cfg.mid_max,
            }));
        }
        let reply = self.exchange(&format!("SET MID {value}"))?;
        info!(value, reply = %reply, "MID setpoint sent");
        self.refresh_mid()?;
        if self.refresh_ramp_status()?.is_ramping() {
            self.record_ramping()?;
        }
        Ok(Outcome::Applied)
    }

    /// Set the current direction; only while holding.
    pub fn set_direction(&mut self, polarity: Polarity) -> Result<Outcome> {
        let ramp = self.refresh_ramp_status()?;
        if let Some(r) = self.holding_gate(&ramp, Refusal::NotHolding)? {
            return Ok(self.refuse(r));
        }
        self.send(&format!("DIRECTION {}", polarity.as_token()))?;
        self.refresh_polarity()?;
        Ok(Outcome::Applied)
    }

    // ── read-only accessors ──────────────────────────────────────────────────

    pub fn output(&self) -> Option<Reading<Output>> {
        self.state.output
    }

    pub fn mid(&self) -> Option<Reading<f64>> {
        self.state.mid
    }

    pub fn max(&self) -> Option<Reading<f64>> {
        self.state.max
    }

    pub fn ramp_rate(&self) -> Option<Reading<f64>> {
        self.state.ramp_rate
    }

    /// Whether the last ramp rate read matches the nominal rate.
    pub fn ramp_rate_ok(&self) -> Option<bool> {
        self.state
            .ramp_rate
            .map(|r| (r.value - self.cfg.nominal_ramp_rate).abs() <= RATE_EPSILON)
    }

    pub fn heater_voltage(&self) -> Option<Reading<f64>> {
        self.state.heater_voltage
    }

    pub fn polarity(&self) -> Option<Reading<Polarity>> {
        self.state.polarity
    }

    pub fn heater(&self) -> HeaterStatus {
        self.state.heater
    }

    pub fn ramp_status(&self) -> &RampStatus {
        &self.state.ramp
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_snapshot(&self) -> Vec<Sample> {
        self.record.samples().to_vec()
    }

    pub fn clear_record(&mut self) {
        self.record.clear();
        self.publish();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            record: self.record_snapshot(),
        }
    }

    /// Subscribe to snapshots published after every state change.
    pub fn subscribe(&mut self) -> SnapshotFeed {
        self.publisher.subscribe()
    }

    pub fn exchange_log(&self) -> &ExchangeLog {
        &self.log
    }

    /// Token that stops the sampling loops; safe to trigger from any thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ControllerCfg {
        &self.cfg
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
