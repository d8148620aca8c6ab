//! Transport error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device disconnected")]
    Disconnected,

    #[error("No response to command 0x{command:02X} ({})", crate::protocol::cmd::name(*command))]
    Timeout { command: u8 },

    #[error("Device rejected command 0x{command:02X} ({})", crate::protocol::cmd::name(*command))]
    Rejected { command: u8 },
}

impl TransportError {
    /// Whether the error leaves the link usable for further commands
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Rejected { .. })
    }
}
