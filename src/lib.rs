//! # softuart-rs - A Bit-Banged UART over GPIO Edge Interrupts
//!
//! The softuart-rs crate implements an asynchronous serial port (8 data bits,
//! no parity, 1 stop bit) in software, for pins that have no hardware UART
//! behind them. It needs only three things from the platform: pin control,
//! an interrupt on both edges of the rx pin, and a free-running cycle counter.
//!
//! ## Features
//!
//! - Interrupt-driven reception: edges are timestamped in interrupt context and
//!   decoded in the foreground, with hidden-bit inference and missing stop
//!   edge recovery
//! - Deadline-timed transmission with bit coalescing
//! - Inverted line logic, one-wire (half duplex) operation and a transceiver
//!   driver-enable pin
//! - Push-pull or pull-up-release transmit drive
//! - Sticky overflow reporting for both the edge and the byte buffer
//! - A simulated platform ([`hal::SimPlatform`]) for tests and tools
//! - JSON configuration files
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! softuart-rs = "0.1.0"
//! ```
//!
//! ```rust
//! use softuart_rs::{SerialConfig, SimPlatform, SoftwareSerial};
//! use std::sync::Arc;
//!
//! let sim = Arc::new(SimPlatform::new());
//! sim.connect(12, 14);
//!
//! let mut tx = SoftwareSerial::new(sim.clone(), SerialConfig::new(None, Some(12)));
//! let mut rx = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(14), None));
//! tx.begin(57_600).unwrap();
//! rx.begin(57_600).unwrap();
//!
//! tx.write(b"OK");
//! assert_eq!(rx.read(), Some(b'O'));
//! assert_eq!(rx.read(), Some(b'K'));
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod hal;
pub mod logging;
pub mod serial;
pub mod util;

pub use crate::config::{SerialConfig, TxDrive};
pub use crate::error::SerialError;
pub use crate::hal::{Platform, SimPlatform};
pub use crate::logging::{init_logger, log_info};
pub use crate::serial::{LineMode, OverflowKind, SoftwareSerial};
