pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Line-oriented request/response link to the magnet supply.
///
/// Implementations own framing (`\r\n`), pacing and the read timeout; a
/// timed-out read should surface an error whose text mentions "timeout" (or
/// a `magnet_hardware::HwError::Timeout`) so the core can classify it.
pub trait Transport {
    /// Send `command` and return exactly one reply line without terminator.
    fn query(&mut self, command: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Send `command` without waiting for a reply.
    fn write(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn query(&mut self, command: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).query(command)
    }

    fn write(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write(command)
    }
}
