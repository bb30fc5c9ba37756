#![allow(dead_code)]

use delta_ups_bridge::delta::frame::{FrameType, RawFrame, RESPONSE_WINDOW};
use delta_ups_bridge::prelude::*;

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex};

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub enum Reply {
    Bytes(Vec<u8>),
    Fail(io::ErrorKind),
}

/// Shared state of the fake serial line.
#[derive(Default)]
pub struct Line {
    pub replies: VecDeque<Reply>,
    pub written: Vec<Vec<u8>>,
    pub opened: usize,
    pub released: usize,
    pub refuse_connect: bool,
    pub fail_write: bool,
}

/// In-memory stand-in for the serial device. Every `connect` hands out a
/// fresh port; reads consume the next scripted reply.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    pub line: Arc<Mutex<Line>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a device reply carrying `body`, padded to the response window.
    pub fn respond(&self, body: &str) -> &Self {
        self.respond_bytes(Factory::window(body))
    }

    pub fn respond_bytes(&self, bytes: Vec<u8>) -> &Self {
        self.line.lock().unwrap().replies.push_back(Reply::Bytes(bytes));
        self
    }

    pub fn fail_read(&self, kind: io::ErrorKind) -> &Self {
        self.line.lock().unwrap().replies.push_back(Reply::Fail(kind));
        self
    }

    pub fn refuse_connect(&self) {
        self.line.lock().unwrap().refuse_connect = true;
    }

    pub fn fail_write(&self) {
        self.line.lock().unwrap().fail_write = true;
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.line.lock().unwrap().written.clone()
    }

    pub fn opened(&self) -> usize {
        self.line.lock().unwrap().opened
    }

    pub fn released(&self) -> usize {
        self.line.lock().unwrap().released
    }
}

impl Connect for ScriptedConnector {
    type Port = ScriptedPort;

    fn connect(&self) -> Result<ScriptedPort, UpsError> {
        let mut line = self.line.lock().unwrap();
        if line.refuse_connect {
            return Err(UpsError::Transport("no such device".to_string()));
        }
        line.opened += 1;

        Ok(ScriptedPort {
            line: self.line.clone(),
            rx: None,
            tx: Vec::new(),
        })
    }
}

pub struct ScriptedPort {
    line: Arc<Mutex<Line>>,
    rx: Option<Cursor<Vec<u8>>>,
    tx: Vec<u8>,
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.rx.is_none() {
            let reply = self.line.lock().unwrap().replies.pop_front();
            match reply {
                Some(Reply::Bytes(bytes)) => self.rx = Some(Cursor::new(bytes)),
                Some(Reply::Fail(kind)) => return Err(io::Error::from(kind)),
                None => return Err(io::Error::from(io::ErrorKind::TimedOut)),
            }
        }

        match self.rx.as_mut() {
            Some(rx) => rx.read(buf),
            None => Ok(0),
        }
    }
}

impl io::Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.line.lock().unwrap().fail_write {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ScriptedPort {
    fn drop(&mut self) {
        let mut line = self.line.lock().unwrap();
        line.released += 1;
        if !self.tx.is_empty() {
            line.written.push(std::mem::take(&mut self.tx));
        }
    }
}

pub struct Factory;

impl Factory {
    /// A full response window: data frame around `body`, space padded.
    pub fn window(body: &str) -> Vec<u8> {
        let mut r = RawFrame::new(FrameType::Data, body).unwrap().bytes();
        r.resize(RESPONSE_WINDOW, b' ');
        r
    }

    pub fn yaml() -> &'static str {
        r#"
ups:
  port: /dev/ttyUSB0
  device_number: 7
mqtt:
  host: localhost
"#
    }

    pub fn config() -> ConfigWrapper {
        ConfigWrapper::from_config(Config::from_yaml(Self::yaml()).unwrap())
    }

    /// Connector answering one full poll cycle with the reference readings.
    pub fn healthy_ups() -> ScriptedConnector {
        let connector = ScriptedConnector::new();
        connector
            .respond("1;600;2190")
            .respond("0;600;1;2210;;03169;037")
            .respond("0;0;1;;;000;2720;;031;100")
            .respond("20170322;20200322");
        connector
    }
}
