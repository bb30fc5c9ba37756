use crate::command::Command;
use crate::delta::grammar::FieldRecord;
use crate::delta::status::{BatteryStatus, InputStatus, OutputStatus, ReplacementDateInfo};
use crate::delta::transport::{Connect, SerialTransport};
use crate::error::UpsError;

use log::{debug, warn};

/// Query side of the UPS status protocol.
///
/// Each query is a single send-then-read round trip with no state kept in
/// between. When the response does not arrive (transport or decode failure)
/// the failure is logged and the query yields an all-null reading; a response
/// that arrives but breaks its grammar is returned as an error.
pub struct UpsClient<C> {
    transport: SerialTransport<C>,
}

impl<C: Connect> UpsClient<C> {
    pub fn new(connector: C) -> Self {
        Self {
            transport: SerialTransport::new(connector),
        }
    }

    pub fn transport(&self) -> &SerialTransport<C> {
        &self.transport
    }

    pub fn input_status(&self) -> Result<InputStatus, UpsError> {
        InputStatus::from_fields(&self.fields(Command::Input)?)
    }

    pub fn output_status(&self) -> Result<OutputStatus, UpsError> {
        OutputStatus::from_fields(&self.fields(Command::Output)?)
    }

    pub fn battery_status(&self) -> Result<BatteryStatus, UpsError> {
        BatteryStatus::from_fields(&self.fields(Command::Battery)?)
    }

    pub fn battery_replacement_date(&self) -> Result<ReplacementDateInfo, UpsError> {
        ReplacementDateInfo::from_fields(&self.fields(Command::ReplacementDate)?)
    }

    /// Send `command` and return the raw response window.
    pub fn exchange(&self, command: Command) -> Result<String, UpsError> {
        self.transport.send_command(command.mnemonic())?;
        self.transport.receive_response()
    }

    /// Raw slot values for `command`, all null when no response arrived.
    pub fn fields(&self, command: Command) -> Result<FieldRecord, UpsError> {
        let response = match self.exchange(command) {
            Ok(text) => Some(text),
            Err(err) if err.is_missing_response() => {
                warn!("{}: no response, reporting nulls: {}", command, err);
                None
            }
            Err(err) => return Err(err),
        };

        let fields = command.grammar().parse(response.as_deref())?;
        debug!("{}: {:?}", command, fields);
        Ok(fields)
    }
}
