//! Display driver error types

use cfontz_transport::TransportError;
use thiserror::Error;

/// Errors from display operations
#[derive(Error, Debug)]
pub enum DisplayError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown model: CFA-{0}")]
    UnknownModel(u32),
}
