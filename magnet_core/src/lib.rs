#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Magnet power-supply controller (hardware-agnostic).
//!
//! All supply traffic goes through `magnet_traits::Transport`; time goes
//! through `magnet_traits::Clock` so interlock waits and sampling loops run
//! instantly under a test clock.
//!
//! ## Architecture
//!
//! - **Replies**: tokenizer and per-command parsers (`reply`)
//! - **Retry**: bounded retry on signature mismatch (`retry`)
//! - **Controller**: cached state, heater interlock, ramp commands (`controller`)
//! - **Sampling**: ramp transient and free-running record loops (`runner`)
//! - **Monitoring**: snapshots and a latest-wins feed (`session`)
//! - **Exchange log**: operator-facing transcript of every exchange (`logger`)

pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod logger;
pub mod mocks;
pub mod record;
pub mod reply;
pub mod retry;
pub mod runner;
pub mod session;
pub mod status;
pub mod types;

pub use config::{ControllerCfg, HeaterCfg, RampCfg};
pub use controller::{Controller, ControllerBuilder};
pub use error::{ControllerError, ProtocolError, Result};
pub use logger::{ExchangeLog, FileLogger, Logger};
pub use record::{CancelToken, Record};
pub use retry::RetryPolicy;
pub use session::{SessionState, Snapshot, SnapshotFeed};
pub use status::{Outcome, Refusal};
pub use types::{HeaterStatus, Output, Polarity, RampState, RampStatus, Reading, Sample};
