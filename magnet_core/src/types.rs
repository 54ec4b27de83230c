//! Value types parsed from supply replies.

use chrono::NaiveTime;
use serde::Serialize;

/// A value stamped with the instrument's own `HH:MM:SS` time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading<T> {
    pub timestamp: NaiveTime,
    pub value: T,
}

impl<T> Reading<T> {
    pub fn new(timestamp: NaiveTime, value: T) -> Self {
        Self { timestamp, value }
    }
}

/// Supply output: field (tesla) and lead voltage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Output {
    pub field: f64,
    pub voltage: f64,
}

/// One entry of the ramp record.
pub type Sample = Reading<Output>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn from_token(tok: &str) -> Option<Self> {
        match tok {
            "+" => Some(Self::Positive),
            "-" => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Positive => "+",
            Self::Negative => "-",
        }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RampState {
    Holding,
    Ramping,
    /// Any state word the supply reports that we do not model.
    Other(String),
}

/// Ramp status as last reported by `RAMP STATUS`.
///
/// Built only through the constructors so that `field` is present while
/// holding or ramping and `target_field` only while ramping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RampStatus {
    state: RampState,
    field: Option<f64>,
    target_field: Option<f64>,
}

impl RampStatus {
    pub fn holding(field: f64) -> Self {
        Self {
            state: RampState::Holding,
            field: Some(field),
            target_field: None,
        }
    }

    pub fn ramping(field: f64, target_field: f64) -> Self {
        Self {
            state: RampState::Ramping,
            field: Some(field),
            target_field: Some(target_field),
        }
    }

    pub fn other(state: impl Into<String>) -> Self {
        Self {
            state: RampState::Other(state.into()),
            field: None,
            target_field: None,
        }
    }

    pub fn state(&self) -> &RampState {
        &self.state
    }

    pub fn field(&self) -> Option<f64> {
        self.field
    }

    pub fn target_field(&self) -> Option<f64> {
        self.target_field
    }

    pub fn is_holding(&self) -> bool {
        self.state == RampState::Holding
    }

    pub fn is_ramping(&self) -> bool {
        self.state == RampState::Ramping
    }
}

impl Default for RampStatus {
    /// Placeholder before the first `RAMP STATUS` reply.
    fn default() -> Self {
        Self::other("UNKNOWN")
    }
}

/// Heater / persistent-switch status.
///
/// Invariants: `persistent` implies a latched `field`; `switch` implies not
/// `persistent`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeaterStatus {
    switch: bool,
    persistent: bool,
    field: Option<f64>,
}

impl HeaterStatus {
    pub fn on() -> Self {
        Self {
            switch: true,
            persistent: false,
            field: None,
        }
    }

    pub fn off() -> Self {
        Self {
            switch: false,
            persistent: false,
            field: None,
        }
    }

    /// Heater off with the magnet holding `field` through the switch.
    pub fn persistent(field: f64) -> Self {
        Self {
            switch: false,
            persistent: true,
            field: Some(field),
        }
    }

    pub fn switch(&self) -> bool {
        self.switch
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Field latched when the switch was closed.
    pub fn field(&self) -> Option<f64> {
        self.field
    }
}

impl Default for HeaterStatus {
    fn default() -> Self {
        Self::off()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heater_constructors_hold_invariants() {
        for s in [HeaterStatus::on(), HeaterStatus::off(), HeaterStatus::persistent(0.3)] {
            assert!(!s.is_persistent() || s.field().is_some());
            assert!(!s.switch() || !s.is_persistent());
        }
    }

    #[test]
    fn ramp_constructors_hold_invariants() {
        let h = RampStatus::holding(0.5);
        assert_eq!(h.field(), Some(0.5));
        assert_eq!(h.target_field(), None);
        let r = RampStatus::ramping(0.2, 0.5);
        assert_eq!(r.target_field(), Some(0.5));
        let o = RampStatus::other("QUENCH");
        assert_eq!(o.state(), &RampState::Other("QUENCH".into()));
        assert!(!o.is_holding() && !o.is_ramping());
    }

    #[test]
    fn polarity_tokens() {
        assert_eq!(Polarity::from_token("+"), Some(Polarity::Positive));
        assert_eq!(Polarity::from_token("-"), Some(Polarity::Negative));
        assert_eq!(Polarity::from_token("POSITIVE"), None);
        assert_eq!(Polarity::Negative.to_string(), "-");
    }
}
