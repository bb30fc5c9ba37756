use crate::config;
use crate::delta::frame::{RawFrame, RESPONSE_WINDOW};
use crate::error::UpsError;

use log::trace;
use serialport::{DataBits, Parity, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

/// Opens the link to the UPS.
///
/// Every send and every receive acquires a fresh port and drops it when the
/// operation ends, so the handle is released on all exit paths.
pub trait Connect {
    type Port: Read + Write;

    fn connect(&self) -> Result<Self::Port, UpsError>;
}

/// Serial line settings for the physical device (8N1).
#[derive(Clone, Debug)]
pub struct SerialConnector {
    port: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialConnector {
    pub fn new(port: &str, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            port: port.to_owned(),
            baud_rate,
            timeout,
        }
    }

    pub fn from_config(ups: &config::Ups) -> Self {
        Self::new(ups.port(), ups.baud_rate(), ups.read_timeout())
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

impl Connect for SerialConnector {
    type Port = Box<dyn serialport::SerialPort>;

    fn connect(&self) -> Result<Self::Port, UpsError> {
        serialport::new(&self.port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(self.timeout)
            .open()
            .map_err(|err| UpsError::Transport(format!("opening {}: {}", self.port(), err)))
    }
}

pub struct SerialTransport<C> {
    connector: C,
}

impl<C: Connect> SerialTransport<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Frame `mnemonic` as a poll request and write it out.
    pub fn send_command(&self, mnemonic: &str) -> Result<(), UpsError> {
        let frame = RawFrame::poll(mnemonic)?.bytes();

        let mut port = self.connector.connect()?;
        trace!("TX: {:?}", String::from_utf8_lossy(&frame));
        port.write_all(&frame)
            .and_then(|_| port.flush())
            .map_err(|err| UpsError::Transport(format!("writing {}: {}", mnemonic, err)))
    }

    /// Blind read of up to one response window, decoded as ASCII.
    ///
    /// Replies are usually shorter than the window: whatever arrived before
    /// the line went quiet (read timeout or end of stream) is returned.
    pub fn receive_response(&self) -> Result<String, UpsError> {
        let mut port = self.connector.connect()?;

        let mut window = [0u8; RESPONSE_WINDOW];
        let mut len = 0;
        while len < RESPONSE_WINDOW {
            match port.read(&mut window[len..]) {
                Ok(0) => break,
                Ok(n) => len += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) if err.kind() == ErrorKind::TimedOut && len > 0 => break,
                Err(err) => {
                    return Err(UpsError::Transport(format!("reading response: {}", err)));
                }
            }
        }

        if len == 0 {
            return Err(UpsError::Transport("no response".to_string()));
        }
        trace!("RX: {:?}", String::from_utf8_lossy(&window[..len]));

        decode_ascii(&window[..len])
    }
}

pub fn decode_ascii(bytes: &[u8]) -> Result<String, UpsError> {
    if let Some(offset) = bytes.iter().position(|b| !b.is_ascii()) {
        return Err(UpsError::Decode(format!(
            "byte 0x{:02x} at offset {}",
            bytes[offset], offset
        )));
    }

    String::from_utf8(bytes.to_vec()).map_err(|err| UpsError::Decode(err.to_string()))
}
