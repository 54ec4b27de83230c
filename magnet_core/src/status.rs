//! Outcome of a state-changing request.

use std::fmt;

/// Why a request was turned down without touching the supply.
#[derive(Debug, Clone, PartialEq)]
pub enum Refusal {
    /// Heater is already energized.
    AlreadyOn,
    /// Heater is already off and the magnet is not persistent.
    AlreadyOff,
    /// A ramp is in progress; the command was not sent or queued.
    AlreadyRamping,
    /// The supply is not holding, so switching is unsafe right now.
    NotHolding,
    /// Persistent field and supply field differ; ramp to the persistent
    /// field before re-energizing the heater.
    PersistentFieldMismatch { field: f64, persistent_field: f64 },
    /// Requested MID setpoint outside `(0, max]`.
    MidOutOfRange { value: f64, max: f64 },
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyOn => f.write_str("heater is already ON"),
            Self::AlreadyOff => f.write_str("heater is already OFF"),
            Self::AlreadyRamping => f.write_str("already ramping"),
            Self::NotHolding => f.write_str("hold on: supply is not holding"),
            Self::PersistentFieldMismatch {
                field,
                persistent_field,
            } => write!(
                f,
                "ramp to the persistent field first (supply {field:.4} T, persistent {persistent_field:.4} T)"
            ),
            Self::MidOutOfRange { value, max } if *value <= 0.0 => {
                write!(f, "MID should be positive (got {value}, max {max})")
            }
            Self::MidOutOfRange { value, max } => {
                write!(f, "MID is too high (got {value}, max {max})")
            }
        }
    }
}

/// Public result of a command: either carried out or refused.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    Refused(Refusal),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            Self::Refused(r) => Some(r),
            Self::Applied => None,
        }
    }
}
