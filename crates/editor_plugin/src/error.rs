use thiserror::Error;

use crate::protocol::ProtocolError;

/// Errors the plugin runtime can return.
#[derive(Error, Debug)]
pub enum PluginError {
    /// Reading from the host or writing back to it failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A startup command could not be expressed in the host's line protocol.
    #[error("invalid host command: {0}")]
    Protocol(#[from] ProtocolError),

    /// A configuration value could not be understood.
    #[error("invalid configuration for `{key}`: {reason}")]
    Config { key: String, reason: String },

    /// The tracing subscriber or its log directory could not be set up.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl PluginError {
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        PluginError::Config { key: key.into(), reason: reason.into() }
    }
}
