use thiserror::Error;

/// Failures of the serial status protocol.
///
/// `Transport` and `Decode` mean the response never arrived in usable form;
/// the client turns those into an all-null reading for the affected query.
/// `Format` means a response arrived but broke its grammar, or carried an
/// enumeration code or calendar date outside the valid range. The latter only
/// nulls the offending field.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum UpsError {
    #[error("serial transport: {0}")]
    Transport(String),

    #[error("response is not ASCII: {0}")]
    Decode(String),

    #[error("malformed response: {0}")]
    Format(String),

    /// Caller handed the frame encoder something it cannot carry.
    #[error("invalid frame payload: {0}")]
    Payload(String),
}

impl UpsError {
    /// True for failures where no usable response text exists.
    pub fn is_missing_response(&self) -> bool {
        matches!(self, UpsError::Transport(_) | UpsError::Decode(_))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, UpsError::Format(_))
    }
}
