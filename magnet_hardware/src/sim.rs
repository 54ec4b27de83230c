//! In-process stand-in for the magnet supply.
//!
//! Speaks the same line protocol as the real instrument so the core and the
//! CLI can run without a serial port. Time is counted in replies: every
//! query advances the instrument clock by one second, and every
//! `RAMP STATUS` query moves the supply field one `step_t` toward its target.

use magnet_traits::Transport;
use tracing::{debug, warn};

use crate::error::HwError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Zero,
    Mid,
}

#[derive(Debug, Clone)]
pub struct SimulatedSupply {
    field_t: f64,
    mid_t: f64,
    max_t: f64,
    rate: f64,
    step_t: f64,
    target: Option<f64>,
    destination: Destination,
    heater_on: bool,
    persistent_t: Option<f64>,
    negative: bool,
    ticks: u32,
    garbled: u32,
    timeouts: u32,
    writes: Vec<String>,
}

impl Default for SimulatedSupply {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSupply {
    /// Supply holding at zero field, heater off, MID = 0.5 T.
    pub fn new() -> Self {
        Self {
            field_t: 0.0,
            mid_t: 0.5,
            max_t: 1.5,
            rate: 0.390,
            step_t: 0.1,
            target: None,
            destination: Destination::Zero,
            heater_on: false,
            persistent_t: None,
            negative: false,
            ticks: 0,
            garbled: 0,
            timeouts: 0,
            writes: Vec::new(),
        }
    }

    pub fn with_field(mut self, field_t: f64) -> Self {
        self.field_t = field_t;
        self.destination = if field_t == 0.0 {
            Destination::Zero
        } else {
            Destination::Mid
        };
        self
    }

    pub fn with_mid(mut self, mid_t: f64) -> Self {
        self.mid_t = mid_t;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Field change per `RAMP STATUS` poll while ramping.
    pub fn with_step(mut self, step_t: f64) -> Self {
        self.step_t = step_t.abs().max(f64::EPSILON);
        self
    }

    pub fn with_heater_on(mut self) -> Self {
        self.heater_on = true;
        self.persistent_t = None;
        self
    }

    /// Heater off with the magnet latched at `field_t`.
    pub fn with_persistent(mut self, field_t: f64) -> Self {
        self.heater_on = false;
        self.persistent_t = Some(field_t);
        self
    }

    /// Corrupt the next `n` query replies.
    pub fn with_garbled_replies(mut self, n: u32) -> Self {
        self.garbled = n;
        self
    }

    /// Time out the next `n` queries.
    pub fn with_timeouts(mut self, n: u32) -> Self {
        self.timeouts = n;
        self
    }

    pub fn field(&self) -> f64 {
        self.field_t
    }

    pub fn heater_on(&self) -> bool {
        self.heater_on
    }

    pub fn is_ramping(&self) -> bool {
        self.target.is_some()
    }

    /// Write-only commands received so far.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    fn stamp(&mut self) -> String {
        let t = 12 * 3600 + self.ticks;
        self.ticks = self.ticks.wrapping_add(1);
        let t = t % 86_400;
        format!("{:02}:{:02}:{:02}", t / 3600, (t / 60) % 60, t % 60)
    }

    fn start_ramp(&mut self, destination: Destination) {
        let goal = match destination {
            Destination::Zero => 0.0,
            Destination::Mid => self.mid_t,
        };
        self.destination = destination;
        if (goal - self.field_t).abs() > f64::EPSILON {
            self.target = Some(goal);
        }
    }

    fn advance_ramp(&mut self) {
        if let Some(goal) = self.target {
            let delta = goal - self.field_t;
            if delta.abs() <= self.step_t {
                self.field_t = goal;
                self.target = None;
            } else {
                self.field_t += self.step_t * delta.signum();
            }
        }
    }

    fn heater_reply(&mut self) -> String {
        let ts = self.stamp();
        match (self.heater_on, self.persistent_t) {
            (true, _) => format!("{ts} HEATER STATUS: ON"),
            (false, Some(f)) => format!("{ts} HEATER STATUS: SWITCHED OFF AT {f:.4} TESLA"),
            (false, None) => format!("{ts} HEATER STATUS: OFF"),
        }
    }

    fn respond(&mut self, command: &str) -> String {
        match command {
            "GET OUTPUT" => {
                let volts = if self.target.is_some() { 0.25 } else { 0.0 };
                let ts = self.stamp();
                format!(
                    "{ts} OUTPUT: {:.4} AMPS OUTPUT: {volts:.3} VOLTS",
                    self.field_t
                )
            }
            "GET MID" => {
                let ts = self.stamp();
                format!("{ts} MID SETTING:  {:.4} TESLA", self.mid_t)
            }
            "GET MAX" => {
                let ts = self.stamp();
                format!("{ts} MAX SETTING:  {:.4} TESLA", self.max_t)
            }
            "GET SIGN" => {
                let sign = if self.negative { '-' } else { '+' };
                let ts = self.stamp();
                format!("{ts} CURRENT DIRECTION: {sign}")
            }
            "GET RATE" => {
                let ts = self.stamp();
                format!("{ts} RAMP RATE:  {:.3} A/SEC", self.rate)
            }
            "GET HV" => {
                let hv = if self.heater_on { 2.5 } else { 0.0 };
                let ts = self.stamp();
                format!("{ts} HEATER OUTPUT:  {hv:.2} VOLTS")
            }
            "HEATER" => self.heater_reply(),
            "HEATER ON" => {
                if let Some(latched) = self.persistent_t
                    && (latched - self.field_t).abs() > 1e-4
                {
                    warn!(latched, supply = self.field_t, "heater energized on field mismatch");
                }
                self.heater_on = true;
                self.persistent_t = None;
                self.heater_reply()
            }
            "HEATER OFF" => {
                self.heater_on = false;
                self.persistent_t = (self.field_t > 0.0).then_some(self.field_t);
                self.heater_reply()
            }
            "RAMP STATUS" => {
                self.advance_ramp();
                let ts = self.stamp();
                match self.target {
                    Some(goal) => format!(
                        "{ts} RAMP STATUS: RAMPING FROM {:.4} TO {goal:.4} TESLA",
                        self.field_t
                    ),
                    None => format!(
                        "{ts} RAMP STATUS: HOLDING ON TARGET AT {:.4} TESLA",
                        self.field_t
                    ),
                }
            }
            other => {
                if let Some(v) = other.strip_prefix("SET MID ") {
                    let ts = self.stamp();
                    return match v.trim().parse::<f64>() {
                        Ok(mid) if mid > 0.0 && mid <= self.max_t => {
                            self.mid_t = mid;
                            if self.destination == Destination::Mid {
                                self.start_ramp(Destination::Mid);
                            }
                            format!("{ts} MID SETTING:  {mid:.4} TESLA")
                        }
                        _ => format!("{ts} ERROR: BAD MID VALUE"),
                    };
                }
                let ts = self.stamp();
                format!("{ts} ERROR: UNKNOWN COMMAND")
            }
        }
    }
}

impl Transport for SimulatedSupply {
    fn query(&mut self, command: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        if self.timeouts > 0 {
            self.timeouts -= 1;
            return Err(Box::new(HwError::Timeout));
        }
        let reply = self.respond(command.trim());
        if self.garbled > 0 {
            self.garbled -= 1;
            debug!(command, "simulated supply garbling reply");
            return Ok(format!("?? {}", reply.replace(':', ";")));
        }
        debug!(command, reply = %reply, "simulated exchange");
        Ok(reply)
    }

    fn write(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let command = command.trim();
        self.writes.push(command.to_string());
        match command {
            "RAMP ZERO" => self.start_ramp(Destination::Zero),
            "RAMP MID" => self.start_ramp(Destination::Mid),
            "DIRECTION +" => self.negative = false,
            "DIRECTION -" => self.negative = true,
            other => {
                // Query commands sent as plain writes still change state.
                let _ = self.respond(other);
            }
        }
        debug!(command, "simulated write");
        Ok(())
    }
}
