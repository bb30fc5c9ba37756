//! Request framing.
//!
//! ```text
//! +--------+--------+--------+--------+---------------+----------+
//! | Header |   ID   |  Type  | Length |     Data      | Checksum |
//! +--------+--------+--------+--------+---------------+----------+
//! | 1 byte | 2 byte | 1 byte | 3 byte | 128 bytes max |  2 byte  |
//! +--------+--------+--------+--------+---------------+----------+
//! ```
//!
//! Requests are written without the trailing checksum; the device answers
//! status polls regardless. Responses are not parsed as frames by the client,
//! it reads a fixed window and searches it for the body grammar instead.

use crate::command::Command;
use crate::error::UpsError;

use nom::bytes::complete::{tag, take, take_while_m_n};
use nom::combinator::map;
use nom::number::complete::u8 as byte;
use nom::IResult;
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const HEADER: u8 = b'~';
pub const DEFAULT_DEVICE_ID: [u8; 2] = *b"00";

/// Largest payload whose length fits the 3 digit length field.
pub const MAX_PAYLOAD_LEN: usize = 999;

/// Size of the blind read used for every response.
pub const RESPONSE_WINDOW: usize = 137;

#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FrameType {
    /// Host request carrying a command payload.
    Poll = b'P',
    /// Device reply carrying readings.
    Data = b'D',
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawFrame {
    pub device_id: [u8; 2],
    pub frame_type: FrameType,
    pub payload: String,
}

impl RawFrame {
    pub fn new(frame_type: FrameType, payload: &str) -> Result<Self, UpsError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(UpsError::Payload(format!(
                "{} bytes exceeds the {} byte length field",
                payload.len(),
                MAX_PAYLOAD_LEN
            )));
        }
        if !payload.is_ascii() {
            return Err(UpsError::Payload(format!("{:?} is not ASCII", payload)));
        }

        Ok(Self {
            device_id: DEFAULT_DEVICE_ID,
            frame_type,
            payload: payload.to_owned(),
        })
    }

    /// Host request with a custom payload.
    pub fn poll(payload: &str) -> Result<Self, UpsError> {
        Self::new(FrameType::Poll, payload)
    }

    /// Status request; the mnemonic is the whole payload.
    pub fn command(command: Command) -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID,
            frame_type: FrameType::Poll,
            payload: command.mnemonic().to_owned(),
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut r = Vec::with_capacity(7 + self.payload.len());
        r.push(HEADER);
        r.extend_from_slice(&self.device_id);
        r.push(self.frame_type.into());
        r.extend_from_slice(format!("{:03}", self.payload.len()).as_bytes());
        r.extend_from_slice(self.payload.as_bytes());
        r
    }

    /// Parse a frame from the start of `input`. Anything after the payload
    /// (checksum, padding) is ignored.
    pub fn decode(input: &[u8]) -> Result<Self, UpsError> {
        let (_, (device_id, frame_type, payload)) = Self::parse(input)
            .map_err(|err| UpsError::Format(format!("bad frame: {:?}", err)))?;

        let frame_type = FrameType::try_from(frame_type)
            .map_err(|_| UpsError::Format(format!("unknown frame type 0x{:02x}", frame_type)))?;

        if !payload.is_ascii() {
            return Err(UpsError::Decode(format!("frame payload {:?}", payload)));
        }
        let payload = String::from_utf8(payload.to_vec())
            .map_err(|err| UpsError::Decode(err.to_string()))?;

        Ok(Self {
            device_id,
            frame_type,
            payload,
        })
    }

    fn parse(input: &[u8]) -> IResult<&[u8], ([u8; 2], u8, &[u8])> {
        let (input, _) = tag(&[HEADER][..])(input)?;
        let (input, id) = take(2usize)(input)?;
        let (input, frame_type) = byte(input)?;
        let (input, len) = map(
            take_while_m_n(3, 3, |b: u8| b.is_ascii_digit()),
            |digits: &[u8]| {
                digits
                    .iter()
                    .fold(0usize, |acc, b| acc * 10 + usize::from(b - b'0'))
            },
        )(input)?;
        let (input, payload) = take(len)(input)?;

        Ok((input, ([id[0], id[1]], frame_type, payload)))
    }
}
