//! RS-232 transport backed by the `serialport` crate.

use std::io::{Read, Write};
use std::time::Duration;

use magnet_traits::Transport;
use serialport::SerialPort;
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::read_line_with_timeout;

/// Link parameters for the supply's serial port.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    /// Port path (e.g. "/dev/ttyUSB0", "COM3").
    pub port: String,
    pub baud_rate: u32,
    /// Overall wait for one reply line.
    pub timeout: Duration,
    /// Pause before every command; the supply drops bytes when driven faster.
    pub pace: Duration,
    /// Line terminator used on both write and read.
    pub terminator: String,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            timeout: Duration::from_millis(25_000),
            pace: Duration::from_millis(250),
            terminator: "\r\n".to_string(),
        }
    }
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    settings: SerialSettings,
}

impl SerialTransport {
    pub fn open(settings: SerialSettings) -> Result<Self> {
        let port = serialport::new(&settings.port, settings.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(50))
            .open()
            .map_err(|e| HwError::Serial(format!("open {}: {e}", settings.port)))?;
        debug!(port = %settings.port, baud = settings.baud_rate, "serial port opened");
        Ok(Self { port, settings })
    }

    fn send_line(&mut self, command: &str) -> Result<()> {
        if !self.settings.pace.is_zero() {
            std::thread::sleep(self.settings.pace);
        }
        let line = format!("{command}{}", self.settings.terminator);
        self.port.write_all(line.as_bytes())?;
        self.port.flush()?;
        trace!(command, "serial write");
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn query(&mut self, command: &str) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        // Drop stale bytes so a late reply cannot be taken for this one.
        let _ = self.port.clear(serialport::ClearBuffer::Input);
        self.send_line(command)?;
        let terminator = self.settings.terminator.clone();
        let port = &mut self.port;
        let reply = read_line_with_timeout(
            |buf| port.read(buf),
            terminator.as_bytes(),
            self.settings.timeout,
            Duration::ZERO,
        )?;
        trace!(command, reply = %reply, "serial read");
        Ok(reply)
    }

    fn write(&mut self, command: &str) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.send_line(command)?;
        Ok(())
    }
}
