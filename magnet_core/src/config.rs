//! Runtime configuration for the controller.
//!
//! These are the structs used by `Controller`. They are separate from the
//! TOML-deserialized config in `magnet_config`; see `conversions`.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Heater interlock settings.
#[derive(Debug, Clone)]
pub struct HeaterCfg {
    /// Wait after every heater switch before returning.
    pub settle: Duration,
    /// Max |supply field − persistent field| to allow re-energizing (tesla).
    pub field_tolerance: f64,
}

impl Default for HeaterCfg {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(30),
            field_tolerance: 1e-4,
        }
    }
}

/// Ramp sampling settings.
#[derive(Debug, Clone)]
pub struct RampCfg {
    pub sample_interval: Duration,
    /// Consecutive HOLDING reports that end `record_ramping`.
    pub holding_samples: u32,
    /// Deadline for `record_ramping`; `None` waits until cancelled.
    pub max_wait: Option<Duration>,
    /// Unrecognized ramp states are errors rather than refusals.
    pub strict_state: bool,
    /// Consecutive skipped output samples before a recording loop gives up.
    pub max_skipped: u32,
}

impl Default for RampCfg {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(500),
            holding_samples: 10,
            max_wait: None,
            strict_state: true,
            max_skipped: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerCfg {
    pub retry: RetryPolicy,
    pub heater: HeaterCfg,
    pub ramp: RampCfg,
    /// Ramp rate the supply is expected to report.
    pub nominal_ramp_rate: f64,
    /// Upper bound for `set_mid` (tesla).
    pub mid_max: f64,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            heater: HeaterCfg::default(),
            ramp: RampCfg::default(),
            nominal_ramp_rate: 0.390,
            mid_max: 1.5,
        }
    }
}
