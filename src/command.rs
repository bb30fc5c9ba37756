use crate::prelude::*;
use crate::delta::grammar::{self, Grammar};

/// The status queries the UPS answers, one per logical reading group.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Command {
    Input,
    Output,
    Battery,
    ReplacementDate,
}

impl Command {
    pub const ALL: [Command; 4] = [
        Command::Input,
        Command::Output,
        Command::Battery,
        Command::ReplacementDate,
    ];

    /// 3-character ASCII code sent as the frame payload.
    pub fn mnemonic(&self) -> &'static str {
        use Command::*;

        match self {
            Input => "STI",
            Output => "STO",
            Battery => "STB",
            ReplacementDate => "BRD",
        }
    }

    /// Slot layout of the response body for this query.
    pub fn grammar(&self) -> &'static Grammar {
        use Command::*;

        match self {
            Input => &grammar::INPUT,
            Output => &grammar::OUTPUT,
            Battery => &grammar::BATTERY,
            ReplacementDate => &grammar::REPLACEMENT_DATE,
        }
    }
}

impl std::str::FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|command| command.mnemonic() == s)
            .ok_or_else(|| anyhow!("unknown command mnemonic: {:?}", s))
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
