//! Transports for the magnet supply.
//!
//! - `SimulatedSupply`: in-process instrument model, always available.
//! - `serial::SerialTransport`: RS-232 link via `serialport` (feature `serial`).
pub mod error;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sim;
pub mod util;

pub use error::HwError;
pub use sim::SimulatedSupply;
