use std::io::{self, Write};
use std::time::Duration;

use log::debug;
use serialport::{ClearBuffer, SerialPort};

use crate::error::{Error, Result};

/// Symbol rate the BlinkyTape firmware listens at.
pub const BAUD_RATE: u32 = 115200;

/// Read timeout applied to the serial port.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Byte-oriented, blocking link to the strip.
///
/// The strip exclusively owns its transport once opened.
pub trait Transport: Send {
    /// Discard any unread input.
    fn flush_input(&mut self) -> io::Result<()>;

    /// Write the whole buffer. Blocks until the bytes are handed to the device.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Send one wire payload: drop stale input, then write everything.
pub(crate) fn send(transport: &mut dyn Transport, bytes: &[u8]) -> io::Result<()> {
    transport.flush_input()?;
    transport.write(bytes)
}

/// Serial port transport (USB CDC on the BlinkyTape).
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialTransport {
    /// Open the named serial port at 115200 baud, 8N1, no flow control.
    pub fn open(name: &str) -> Result<Self> {
        let port = serialport::new(name, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| Error::Open {
                port: name.to_string(),
                source,
            })?;

        debug!("opened {} @ {} baud", name, BAUD_RATE);

        Ok(SerialTransport {
            port,
            name: name.to_string(),
        })
    }

    /// Port name the transport was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    fn flush_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }
}
