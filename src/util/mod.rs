//! # Utility Modules
//!
//! This module provides the decoded byte ring and the log rate limiter used
//! by the serial engine.

pub mod logging;
pub mod ring;

// Re-export commonly used types
pub use logging::LogThrottle;
pub use ring::ByteRing;
