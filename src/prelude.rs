pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use std::io::Write;
pub use tokio::sync::broadcast;

pub use crate::channels::Channels;
pub use crate::command::Command;
pub use crate::config::{self, Config, ConfigWrapper};
pub use crate::delta::{self, Connect, UpsClient};
pub use crate::error::UpsError;
pub use crate::mqtt;
pub use crate::options::Options;
