//! Delta UPS serial status protocol.

pub mod client;
pub mod frame;
pub mod grammar;
pub mod status;
pub mod transport;

pub use client::UpsClient;
pub use frame::RawFrame;
pub use grammar::{FieldRecord, Grammar};
pub use status::{
    BatteryHealth, BatteryStatus, ChargeMode, ChargeStatus, InputStatus, OutputMode,
    OutputStatus, ReplacementDateInfo,
};
pub use transport::{Connect, SerialConnector, SerialTransport};
