//! Test and helper mocks for magnet_core

use std::collections::{HashMap, VecDeque};

use magnet_traits::Transport;

/// Transport that answers from a script and remembers everything sent.
///
/// For each command, queued replies are used first (one per query), then
/// the sticky reply repeats forever. A command with neither fails like an
/// unplugged port.
#[derive(Debug, Default, Clone)]
pub struct ScriptedTransport {
    queued: HashMap<String, VecDeque<String>>,
    sticky: HashMap<String, String>,
    sent: Vec<String>,
    writes: Vec<String>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply holding at `field` with heater off and positive polarity.
    pub fn holding_at(field: f64) -> Self {
        let mut t = Self::new();
        t.stick(
            "GET OUTPUT",
            &format!("12:00:00 OUTPUT: {field:.4} AMPS OUTPUT: 0.000 VOLTS"),
        )
        .stick("GET MID", "12:00:00 MID SETTING:  0.5000 TESLA")
        .stick("GET MAX", "12:00:00 MAX SETTING:  1.5000 TESLA")
        .stick("GET SIGN", "12:00:00 CURRENT DIRECTION: +")
        .stick("GET RATE", "12:00:00 RAMP RATE:  0.390 A/SEC")
        .stick("GET HV", "12:00:00 HEATER OUTPUT:  0.00 VOLTS")
        .stick("HEATER", "12:00:00 HEATER STATUS: OFF")
        .stick("HEATER ON", "12:00:00 HEATER STATUS: ON")
        .stick(
            "HEATER OFF",
            &format!("12:00:00 HEATER STATUS: SWITCHED OFF AT {field:.4} TESLA"),
        )
        .stick(
            "RAMP STATUS",
            &format!("12:00:00 RAMP STATUS: HOLDING ON TARGET AT {field:.4} TESLA"),
        );
        t
    }

    /// Reply used whenever nothing is queued for `command`.
    pub fn stick(&mut self, command: &str, reply: &str) -> &mut Self {
        self.sticky.insert(command.to_string(), reply.to_string());
        self
    }

    /// One-shot reply, consumed before the sticky one.
    pub fn queue(&mut self, command: &str, reply: &str) -> &mut Self {
        self.queued
            .entry(command.to_string())
            .or_default()
            .push_back(reply.to_string());
        self
    }

    /// Every command in send order (queries and writes).
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Write-only commands in send order.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// How many times `command` was sent.
    pub fn count(&self, command: &str) -> usize {
        self.sent.iter().filter(|c| *c == command).count()
    }

    /// Forget what has been sent so far (e.g. after priming).
    pub fn clear_sent(&mut self) {
        self.sent.clear();
        self.writes.clear();
    }
}

impl Transport for ScriptedTransport {
    fn query(&mut self, command: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.sent.push(command.to_string());
        if let Some(reply) = self.queued.get_mut(command).and_then(VecDeque::pop_front) {
            return Ok(reply);
        }
        self.sticky
            .get(command)
            .cloned()
            .ok_or_else(|| std::io::Error::other(format!("no scripted reply for {command:?}")).into())
    }

    fn write(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent.push(command.to_string());
        self.writes.push(command.to_string());
        Ok(())
    }
}
