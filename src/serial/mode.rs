//! # Line Mode Control
//!
//! Direction switching for one-wire (half duplex) ports, the optional
//! transceiver driver-enable pin, and arming/disarming of the rx interrupt.
//!
//! A one-wire port is always in exactly one of two states:
//!
//! | Mode       | Shared pin                   | rx interrupt |
//! |------------|------------------------------|--------------|
//! | `Receive`  | input with pull-up           | attached     |
//! | `Transmit` | output, idling at mark level | detached     |
//!
//! Full-duplex ports stay in `Receive`; their tx pin is independent.

use super::{registry, tx, SoftwareSerial};
use crate::error::SerialError;
use crate::hal::{Direction, Platform, Pull};
use log::debug;

/// Direction of a one-wire port's shared pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Receive,
    Transmit,
}

impl<P: Platform> SoftwareSerial<P> {
    /// Current direction of the shared pin
    pub fn line_mode(&self) -> LineMode {
        self.line_mode
    }

    /// Switch a one-wire port between transmitting and receiving.
    ///
    /// Turning transmit on disarms reception before the pin becomes an
    /// output; turning it off restores the input and re-arms reception. No-op
    /// for full-duplex ports.
    pub fn enable_tx(&mut self, on: bool) -> Result<(), SerialError> {
        let Some(pin) = self.tx_pin.filter(|_| self.config.is_one_wire()) else {
            return Ok(());
        };

        if on {
            self.enable_rx(false)?;
            tx::prepare_line(&*self.platform, pin, self.tx.idle_high(), self.tx.drive());
            self.line_mode = LineMode::Transmit;
        } else {
            self.platform.set_pull(pin, Pull::Up);
            self.platform.set_direction(pin, Direction::Input);
            self.line_mode = LineMode::Receive;
            self.enable_rx(true)?;
        }
        debug!("One-wire pin {pin} switched to {:?}", self.line_mode);
        Ok(())
    }

    /// Arm or disarm the rx edge interrupt. Buffers are never reallocated.
    ///
    /// Arming drops any partially received byte. Disarming decodes whatever
    /// was captured up to that point. No-op before [`begin`](Self::begin).
    pub fn enable_rx(&mut self, on: bool) -> Result<(), SerialError> {
        let (Some(pin), Some(slot)) = (self.rx_pin, self.slot) else {
            return Ok(());
        };

        if on {
            let handler = registry::handler(slot).ok_or(SerialError::NoFreeSlot {
                capacity: registry::capacity(),
            })?;
            self.decoder.reset(self.platform.cycle_count());
            self.platform.attach_edge_interrupt(pin, handler)?;
        } else {
            self.platform.detach_interrupt(pin);
            self.rx_bits();
        }
        self.rx_enabled = on;
        Ok(())
    }

    pub fn is_rx_enabled(&self) -> bool {
        self.rx_enabled
    }

    /// Use `pin` to enable an external line driver while transmitting.
    ///
    /// The pin is driven low (driver off) right away and held high for the
    /// duration of each [`write`](Self::write). An invalid pin clears any
    /// previously configured driver-enable pin.
    pub fn set_transmit_enable_pin(&mut self, pin: u8) -> Result<(), SerialError> {
        if !self.platform.is_valid_pin(pin) {
            self.tx_enable_pin = None;
            self.config.tx_enable_pin = None;
            return Err(SerialError::InvalidPin(pin));
        }
        tx::prepare_line(&*self.platform, pin, false, self.tx.drive());
        self.tx_enable_pin = Some(pin);
        self.config.tx_enable_pin = Some(pin);
        debug!("Driver enable on pin {pin}");
        Ok(())
    }

    pub fn transmit_enable_pin(&self) -> Option<u8> {
        self.tx_enable_pin
    }

    /// Keep foreground interrupts enabled while bits are being timed.
    ///
    /// With this off, transmit timing is tighter but other interrupt work,
    /// including reception on other ports, is held off during short holds.
    pub fn enable_int_tx(&mut self, on: bool) {
        self.tx.set_interrupts_during_tx(on);
        self.config.interrupts_during_tx = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerialConfig;
    use crate::hal::SimPlatform;
    use std::sync::Arc;

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        registry::TEST_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_one_wire_direction_switch() {
        let _guard = lock();
        let sim = Arc::new(SimPlatform::new());
        let mut port = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(5)));
        port.begin(9600).unwrap();
        assert_eq!(port.line_mode(), LineMode::Receive);
        assert!(sim.has_interrupt(5));

        port.enable_tx(true).unwrap();
        assert_eq!(port.line_mode(), LineMode::Transmit);
        assert!(!port.is_rx_enabled());
        assert!(!sim.has_interrupt(5));
        assert_eq!(sim.direction(5), Direction::Output);
        assert!(sim.read_level(5), "idles at mark");

        port.enable_tx(false).unwrap();
        assert_eq!(port.line_mode(), LineMode::Receive);
        assert!(sim.has_interrupt(5));
        assert_eq!(sim.direction(5), Direction::Input);
    }

    #[test]
    fn test_enable_tx_ignored_for_full_duplex() {
        let _guard = lock();
        let sim = Arc::new(SimPlatform::new());
        let mut port = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(4)));
        port.begin(9600).unwrap();
        port.enable_tx(true).unwrap();
        assert_eq!(port.line_mode(), LineMode::Receive);
        assert!(sim.has_interrupt(5));
    }

    #[test]
    fn test_enable_rx_toggles_interrupt_only() {
        let _guard = lock();
        let sim = Arc::new(SimPlatform::new());
        let mut port = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(4)));
        port.begin(9600).unwrap();
        let slot = port.slot();

        port.enable_rx(false).unwrap();
        assert!(!sim.has_interrupt(5));
        assert_eq!(port.slot(), slot);

        port.enable_rx(true).unwrap();
        assert!(sim.has_interrupt(5));
    }

    #[test]
    fn test_invalid_enable_pin_clears_previous() {
        let _guard = lock();
        let sim = Arc::new(SimPlatform::builder().valid_pins(&[2, 4, 5]).build());
        let mut port = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(4)));

        port.set_transmit_enable_pin(2).unwrap();
        assert_eq!(port.transmit_enable_pin(), Some(2));
        assert_eq!(sim.direction(2), Direction::Output);
        assert!(!sim.read_level(2));

        assert!(matches!(
            port.set_transmit_enable_pin(40),
            Err(SerialError::InvalidPin(40))
        ));
        assert_eq!(port.transmit_enable_pin(), None);
    }
}
