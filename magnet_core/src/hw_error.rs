//! Maps `Box<dyn Error>` from the transport boundary to typed `ControllerError`.
//!
//! `magnet_traits::Transport` returns `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `magnet_hardware::HwError` downcasting.

use crate::error::ControllerError;

/// Map a transport-boundary error to a typed `ControllerError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> ControllerError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<magnet_hardware::HwError>() {
            return match hw {
                magnet_hardware::HwError::Timeout => ControllerError::TransportTimeout,
                other => ControllerError::Transport(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>()
        && io.kind() == std::io::ErrorKind::TimedOut
    {
        return ControllerError::TransportTimeout;
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        ControllerError::TransportTimeout
    } else {
        ControllerError::Transport(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_timeout_maps_to_transport_timeout() {
        let e = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert_eq!(map_transport_error(&e), ControllerError::TransportTimeout);
    }

    #[test]
    fn other_errors_keep_their_text() {
        let e = std::io::Error::other("port unplugged");
        assert_eq!(
            map_transport_error(&e),
            ControllerError::Transport("port unplugged".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_timeout_is_downcast() {
        let e = magnet_hardware::HwError::Timeout;
        assert_eq!(map_transport_error(&e), ControllerError::TransportTimeout);
    }
}
