//! # Serial Line Configuration
//!
//! [`SerialConfig`] describes one software serial port: its pins, polarity,
//! line speed, buffer sizes and transmit drive style. It can be built in code
//! or loaded from JSON.
//!
//! ```rust
//! use softuart_rs::config::{SerialConfig, TxDrive};
//!
//! let config = SerialConfig::new(Some(14), Some(12))
//!     .with_baud(115_200)
//!     .with_invert(true)
//!     .with_tx_drive(TxDrive::PullUpRelease);
//! assert!(!config.is_one_wire());
//! assert_eq!(config.isr_capacity(), 640);
//! ```

use crate::constants::{DEFAULT_BAUD, DEFAULT_BUFFER_CAPACITY, ISR_BUFFER_FACTOR};
use crate::error::SerialError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the transmit pin produces mark and space levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxDrive {
    /// Pin stays an output and is driven high or low
    #[default]
    PushPull,
    /// High is produced by releasing the pin to its pull-up, low by driving it
    PullUpRelease,
}

/// Configuration for a software serial instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub rx_pin: Option<u8>,
    pub tx_pin: Option<u8>,
    pub tx_enable_pin: Option<u8>,
    pub invert: bool,
    pub baud: u32,
    pub buffer_capacity: usize,
    pub isr_buffer_capacity: Option<usize>,
    pub tx_drive: TxDrive,
    pub interrupts_during_tx: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            rx_pin: None,
            tx_pin: None,
            tx_enable_pin: None,
            invert: false,
            baud: DEFAULT_BAUD,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            isr_buffer_capacity: None,
            tx_drive: TxDrive::PushPull,
            interrupts_during_tx: true,
        }
    }
}

impl SerialConfig {
    /// Configuration for the given pins; pass the same pin twice for one-wire
    pub fn new(rx_pin: Option<u8>, tx_pin: Option<u8>) -> Self {
        Self {
            rx_pin,
            tx_pin,
            ..Self::default()
        }
    }

    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_isr_buffer_capacity(mut self, capacity: usize) -> Self {
        self.isr_buffer_capacity = Some(capacity);
        self
    }

    pub fn with_tx_enable_pin(mut self, pin: u8) -> Self {
        self.tx_enable_pin = Some(pin);
        self
    }

    pub fn with_tx_drive(mut self, drive: TxDrive) -> Self {
        self.tx_drive = drive;
        self
    }

    pub fn with_interrupts_during_tx(mut self, enabled: bool) -> Self {
        self.interrupts_during_tx = enabled;
        self
    }

    /// Receive and transmit share a single pin
    pub fn is_one_wire(&self) -> bool {
        self.rx_pin.is_some() && self.rx_pin == self.tx_pin
    }

    /// Edge ring slots, defaulting to ten per decoded byte slot
    pub fn isr_capacity(&self) -> usize {
        self.isr_buffer_capacity
            .unwrap_or(self.buffer_capacity.saturating_mul(ISR_BUFFER_FACTOR))
    }

    pub fn from_json_str(json: &str) -> Result<Self, SerialError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SerialError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, SerialError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SerialConfig::default();
        assert_eq!(config.baud, 9600);
        assert_eq!(config.buffer_capacity, 64);
        assert_eq!(config.isr_capacity(), 640);
        assert_eq!(config.tx_drive, TxDrive::PushPull);
        assert!(config.interrupts_during_tx);
        assert!(!config.is_one_wire());
    }

    #[test]
    fn test_one_wire_detection() {
        assert!(SerialConfig::new(Some(5), Some(5)).is_one_wire());
        assert!(!SerialConfig::new(Some(5), Some(4)).is_one_wire());
        assert!(!SerialConfig::new(None, None).is_one_wire());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SerialConfig::from_json_str(
            r#"{ "rx_pin": 13, "tx_pin": 15, "invert": true, "tx_drive": "pull_up_release" }"#,
        )
        .unwrap();
        assert_eq!(config.rx_pin, Some(13));
        assert_eq!(config.tx_pin, Some(15));
        assert!(config.invert);
        assert_eq!(config.tx_drive, TxDrive::PullUpRelease);
        assert_eq!(config.baud, 9600);
    }

    #[test]
    fn test_json_file_roundtrip() {
        let config = SerialConfig::new(Some(4), Some(5))
            .with_baud(57_600)
            .with_isr_buffer_capacity(128)
            .with_tx_enable_pin(2);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json_pretty().unwrap().as_bytes())
            .unwrap();

        let loaded = SerialConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = SerialConfig::from_json_str("{ rx_pin: ").unwrap_err();
        assert!(matches!(err, SerialError::Config(_)));
    }
}
