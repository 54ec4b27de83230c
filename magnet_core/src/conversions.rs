//! `From` implementations bridging `magnet_config` types to `magnet_core` types.

use std::time::Duration;

use crate::config::{ControllerCfg, HeaterCfg, RampCfg};
use crate::retry::RetryPolicy;

// ── RetryPolicy ──────────────────────────────────────────────────────────────

impl From<&magnet_config::ProtocolCfg> for RetryPolicy {
    fn from(c: &magnet_config::ProtocolCfg) -> Self {
        Self {
            max_attempts: c.retry_max,
            backoff: Duration::from_millis(c.retry_backoff_ms),
        }
    }
}

// ── HeaterCfg ────────────────────────────────────────────────────────────────

impl From<&magnet_config::HeaterCfg> for HeaterCfg {
    fn from(c: &magnet_config::HeaterCfg) -> Self {
        Self {
            settle: Duration::from_millis(c.settle_ms),
            field_tolerance: c.field_tolerance_t,
        }
    }
}

// ── RampCfg ──────────────────────────────────────────────────────────────────

impl From<&magnet_config::RampCfg> for RampCfg {
    fn from(c: &magnet_config::RampCfg) -> Self {
        Self {
            sample_interval: Duration::from_millis(c.sample_interval_ms),
            holding_samples: c.holding_samples,
            max_wait: (c.max_wait_ms > 0).then(|| Duration::from_millis(c.max_wait_ms)),
            strict_state: c.strict_state,
            max_skipped: c.max_skipped_samples,
        }
    }
}

// ── ControllerCfg ────────────────────────────────────────────────────────────

impl From<&magnet_config::Config> for ControllerCfg {
    fn from(c: &magnet_config::Config) -> Self {
        Self {
            retry: (&c.protocol).into(),
            heater: (&c.heater).into(),
            ramp: (&c.ramp).into(),
            nominal_ramp_rate: c.protocol.nominal_ramp_rate,
            mid_max: c.limits.mid_max_t,
        }
    }
}
