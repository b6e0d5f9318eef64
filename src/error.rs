//! # Software Serial Error Handling
//!
//! This module defines the SerialError enum, which represents the configuration
//! and resource errors a software serial instance can report. Line-level loss
//! (edge or byte overflow) is never an error; it is surfaced through the
//! sticky overflow query instead.

use crate::hal::HalError;
use thiserror::Error;

/// Represents the different error types that can occur in the softuart crate.
#[derive(Debug, Error)]
pub enum SerialError {
    /// Every slot of the interrupt trampoline table is bound to another instance.
    #[error("No free interrupt slot (all {capacity} in use)")]
    NoFreeSlot { capacity: usize },

    /// Receive buffers could not be reserved up front.
    #[error("Receive buffer allocation failed ({requested} slots)")]
    BufferAllocation { requested: usize },

    /// Indicates a baud rate the cycle clock cannot represent.
    #[error("Invalid baud rate: {0}")]
    InvalidBaud(u32),

    /// Indicates a pin the platform refuses to use.
    #[error("Invalid pin: GPIO{0}")]
    InvalidPin(u8),

    /// A GPIO/interrupt collaborator call failed.
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// Indicates a configuration file or string could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for SerialError {
    fn from(e: serde_json::Error) -> Self {
        SerialError::Config(e.to_string())
    }
}

impl From<std::io::Error> for SerialError {
    fn from(e: std::io::Error) -> Self {
        SerialError::Config(e.to_string())
    }
}
