#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the magnet supply driver.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section has defaults matching the supply's factory setup, so an
//!   empty file is a valid config.
use eyre::WrapErr;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TransportCfg {
    /// Serial device path (e.g. "/dev/ttyUSB0", "COM3")
    pub port: String,
    pub baud_rate: u32,
    /// Max wait for one reply line (ms)
    pub timeout_ms: u64,
    /// Pause before every command (ms)
    pub pace_ms: u64,
    /// Line terminator; accepts escaped form "\\r\\n" as written in TOML basic strings
    pub terminator: String,
}

impl Default for TransportCfg {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            timeout_ms: 25_000,
            pace_ms: 250,
            terminator: "\r\n".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProtocolCfg {
    /// Total attempts per query when the reply signature does not match
    pub retry_max: u32,
    /// Pause between attempts (ms)
    pub retry_backoff_ms: u64,
    /// Expected ramp rate; `GET RATE` is flagged NG when it differs
    pub nominal_ramp_rate: f64,
}

impl Default for ProtocolCfg {
    fn default() -> Self {
        Self {
            retry_max: 3,
            retry_backoff_ms: 100,
            nominal_ramp_rate: 0.390,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HeaterCfg {
    /// Thermal settling time of the persistent switch after ON/OFF (ms)
    pub settle_ms: u64,
    /// Max |ramp field - persistent field| allowed before re-energizing (tesla)
    pub field_tolerance_t: f64,
}

impl Default for HeaterCfg {
    fn default() -> Self {
        Self {
            settle_ms: 30_000,
            field_tolerance_t: 1e-4,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RampCfg {
    /// Output sampling period while recording (ms)
    pub sample_interval_ms: u64,
    /// Consecutive HOLDING reports that end a ramp recording
    pub holding_samples: u32,
    /// Give up waiting for HOLDING after this long (ms); 0 waits forever
    pub max_wait_ms: u64,
    /// Treat an unrecognized ramp state as an error
    pub strict_state: bool,
    /// Consecutive unreadable output samples tolerated before recording fails
    pub max_skipped_samples: u32,
}

impl Default for RampCfg {
    fn default() -> Self {
        Self {
            sample_interval_ms: 500,
            holding_samples: 10,
            max_wait_ms: 0,
            strict_state: true,
            max_skipped_samples: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Upper bound accepted by `SET MID` (tesla)
    pub mid_max_t: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self { mid_max_t: 1.5 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    /// Mirror of the raw command/reply exchange log
    pub exchange_file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub transport: TransportCfg,
    pub protocol: ProtocolCfg,
    pub heater: HeaterCfg,
    pub ramp: RampCfg,
    pub limits: Limits,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

impl TransportCfg {
    /// Terminator with `\r` / `\n` escapes resolved.
    pub fn terminator_bytes(&self) -> String {
        self.terminator.replace("\\r", "\r").replace("\\n", "\n")
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Transport
        if self.transport.port.trim().is_empty() {
            eyre::bail!("transport.port must not be empty");
        }
        if self.transport.baud_rate == 0 {
            eyre::bail!("transport.baud_rate must be > 0");
        }
        if self.transport.timeout_ms == 0 {
            eyre::bail!("transport.timeout_ms must be >= 1");
        }
        if self.transport.pace_ms > 10_000 {
            eyre::bail!("transport.pace_ms is unreasonably large (>10s)");
        }
        if self.transport.terminator_bytes().is_empty() {
            eyre::bail!("transport.terminator must not be empty");
        }

        // Protocol
        if self.protocol.retry_max == 0 {
            eyre::bail!("protocol.retry_max must be >= 1");
        }
        if self.protocol.retry_max > 20 {
            eyre::bail!("protocol.retry_max is unreasonably large (>20)");
        }
        if !(self.protocol.nominal_ramp_rate.is_finite() && self.protocol.nominal_ramp_rate > 0.0)
        {
            eyre::bail!("protocol.nominal_ramp_rate must be > 0");
        }

        // Heater
        if !(self.heater.field_tolerance_t.is_finite() && self.heater.field_tolerance_t >= 0.0) {
            eyre::bail!("heater.field_tolerance_t must be >= 0");
        }
        if self.heater.field_tolerance_t > 0.01 {
            eyre::bail!("heater.field_tolerance_t is unsafe (>0.01 T)");
        }
        if self.heater.settle_ms > 10 * 60 * 1000 {
            eyre::bail!("heater.settle_ms is unreasonably large (>10min)");
        }

        // Ramp
        if self.ramp.sample_interval_ms == 0 {
            eyre::bail!("ramp.sample_interval_ms must be >= 1");
        }
        if self.ramp.holding_samples == 0 {
            eyre::bail!("ramp.holding_samples must be >= 1");
        }
        if self.ramp.max_skipped_samples == 0 {
            eyre::bail!("ramp.max_skipped_samples must be >= 1");
        }

        // Limits
        if !(self.limits.mid_max_t.is_finite() && self.limits.mid_max_t > 0.0) {
            eyre::bail!("limits.mid_max_t must be > 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_factory_defaults() {
        let cfg = load_toml("").expect("parse");
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.transport.timeout_ms, 25_000);
        assert_eq!(cfg.protocol.retry_max, 3);
        assert_eq!(cfg.heater.settle_ms, 30_000);
        assert_eq!(cfg.ramp.holding_samples, 10);
        assert!((cfg.limits.mid_max_t - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn escaped_terminator_is_resolved() {
        let cfg = load_toml("[transport]\nterminator = '\\r\\n'\n").expect("parse");
        assert_eq!(cfg.transport.terminator_bytes(), "\r\n");
    }
}
