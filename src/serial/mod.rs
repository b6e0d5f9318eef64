//! # Software Serial Port
//!
//! [`SoftwareSerial`] is a UART built from a GPIO pin with edge interrupts and a
//! free-running cycle counter. Reception is split across two contexts:
//!
//! - interrupt context: [`capture::EdgeCapture`] timestamps every edge of the rx
//!   pin into a lock-free ring
//! - foreground: every consumer call drains that ring through the
//!   [`rx::RxDecoder`] into the decoded byte buffer
//!
//! Transmission is fully foreground: [`tx::TxEngine`] clocks bits out against
//! the cycle counter.
//!
//! ## Usage
//!
//! ```rust
//! use softuart_rs::config::SerialConfig;
//! use softuart_rs::hal::SimPlatform;
//! use softuart_rs::SoftwareSerial;
//! use std::sync::Arc;
//!
//! let sim = Arc::new(SimPlatform::new());
//! sim.connect(4, 5);
//!
//! let mut port = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(4)));
//! port.begin(9600).unwrap();
//! assert_eq!(port.write(b"hi"), 2);
//! assert_eq!(port.available(), 2);
//! assert_eq!(port.read(), Some(b'h'));
//! port.end();
//! ```

pub mod capture;
pub mod mode;
pub mod registry;
pub mod rx;
pub mod tx;

pub use capture::{EdgeCapture, EdgeEvent, EdgeRing};
pub use mode::LineMode;
pub use rx::{DecodeOutcome, RxDecoder};
pub use tx::{HoldPlanner, LevelHold, TxEngine};

use crate::config::SerialConfig;
use crate::constants::{AVAILABLE_YIELD_BITS, OVERFLOW_LOG_CAP, OVERFLOW_LOG_WINDOW_MS};
use crate::error::SerialError;
use crate::hal::{Direction, Platform, Pull};
use crate::log_warn_throttled;
use crate::util::{ByteRing, LogThrottle};
use bitflags::bitflags;
use log::{debug, info, warn};
use std::sync::Arc;

bitflags! {
    /// Kinds of receive data loss since the last overflow query
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct OverflowKind: u8 {
        /// The edge capture ring was full when an interrupt fired
        const EDGE = 0b01;
        /// The decoded byte buffer was full when a byte completed
        const BYTE = 0b10;
    }
}

/// Receive-side buffers, present only for a usable rx pin
struct RxPath<P: Platform> {
    capture: Arc<EdgeCapture<P>>,
    bytes: ByteRing,
}

type ReceiveHandler = Box<dyn FnMut(usize) + Send>;

/// A bit-banged UART on top of a [`Platform`]
pub struct SoftwareSerial<P: Platform> {
    platform: Arc<P>,
    config: SerialConfig,
    rx_pin: Option<u8>,
    tx_pin: Option<u8>,
    tx_enable_pin: Option<u8>,
    rx: Option<RxPath<P>>,
    /// Slots requested when the rx buffers could not be reserved
    alloc_failure: Option<usize>,
    decoder: RxDecoder,
    tx: TxEngine,
    slot: Option<usize>,
    started: bool,
    rx_enabled: bool,
    line_mode: LineMode,
    overflow: OverflowKind,
    throttle: LogThrottle,
    on_receive: Option<ReceiveHandler>,
}

impl<P: Platform> SoftwareSerial<P> {
    /// Create an instance for `config`. Nothing touches the pins until
    /// [`begin`](Self::begin).
    ///
    /// Pins the platform rejects are dropped: without a valid rx pin the port
    /// never receives, without a valid tx pin [`write`](Self::write) sends
    /// nothing.
    pub fn new(platform: Arc<P>, config: SerialConfig) -> Self {
        let rx_pin = config.rx_pin.filter(|&pin| platform.is_valid_pin(pin));
        let tx_pin = config.tx_pin.filter(|&pin| platform.is_valid_pin(pin));
        if rx_pin != config.rx_pin || tx_pin != config.tx_pin {
            warn!(
                "Ignoring invalid pin(s): rx {:?}, tx {:?}",
                config.rx_pin, config.tx_pin
            );
        }

        let mut alloc_failure = None;
        let rx = rx_pin.and_then(|pin| {
            let isr_capacity = config.isr_capacity();
            let ring = match EdgeRing::try_with_capacity(isr_capacity) {
                Ok(ring) => ring,
                Err(e) => {
                    warn!("Cannot reserve {isr_capacity} edge slots: {e}");
                    alloc_failure = Some(isr_capacity);
                    return None;
                }
            };
            let bytes = match ByteRing::try_with_capacity(config.buffer_capacity) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Cannot reserve {} byte slots: {e}", config.buffer_capacity);
                    alloc_failure = Some(config.buffer_capacity);
                    return None;
                }
            };
            Some(RxPath {
                capture: Arc::new(EdgeCapture::new(platform.clone(), pin, ring)),
                bytes,
            })
        });

        let bit_cycles = (platform.cycles_per_second() / config.baud.max(1)).max(1);
        let mut tx = TxEngine::new(bit_cycles, config.invert, config.tx_drive);
        tx.set_interrupts_during_tx(config.interrupts_during_tx);

        Self {
            decoder: RxDecoder::new(bit_cycles, config.invert),
            tx,
            platform,
            rx_pin,
            tx_pin,
            tx_enable_pin: None,
            rx,
            alloc_failure,
            slot: None,
            started: false,
            rx_enabled: false,
            line_mode: LineMode::Receive,
            overflow: OverflowKind::empty(),
            throttle: LogThrottle::new(OVERFLOW_LOG_WINDOW_MS, OVERFLOW_LOG_CAP),
            on_receive: None,
            config,
        }
    }

    /// Start the port at `baud`: claim an interrupt slot, configure the pins
    /// and arm reception.
    ///
    /// Calling `begin` again on a running port re-applies the line speed and
    /// clears buffered data while keeping the claimed slot. On failure the
    /// port is left stopped with no slot held, and `begin` may be retried.
    pub fn begin(&mut self, baud: u32) -> Result<(), SerialError> {
        let bit_cycles = self.bit_cycles_for(baud)?;
        if let Some(requested) = self.alloc_failure {
            return Err(SerialError::BufferAllocation { requested });
        }
        if let (None, Some(pin)) = (self.tx_enable_pin, self.config.tx_enable_pin) {
            self.set_transmit_enable_pin(pin)?;
        }

        if self.slot.is_none() {
            if let Some(rx) = &self.rx {
                self.slot = Some(registry::claim(rx.capture.clone())?);
            }
        }

        self.config.baud = baud;
        self.decoder.set_bit_cycles(bit_cycles);
        self.tx.set_bit_cycles(bit_cycles);

        if let (Some(rx), Some(pin)) = (self.rx.as_mut(), self.rx_pin) {
            rx.bytes.clear();
            rx.capture.ring().discard_all();
            rx.capture.ring().take_overflow();
            self.platform.set_pull(pin, Pull::Up);
            self.platform.set_direction(pin, Direction::Input);
            self.line_mode = LineMode::Receive;
        }
        self.overflow = OverflowKind::empty();
        self.decoder.reset(self.platform.cycle_count());

        if let (Some(pin), false) = (self.tx_pin, self.config.is_one_wire()) {
            tx::prepare_line(&*self.platform, pin, self.tx.idle_high(), self.tx.drive());
        }

        if !self.rx_enabled {
            if let Err(e) = self.enable_rx(true) {
                self.release_slot();
                return Err(e);
            }
        }

        self.started = true;
        info!(
            "Software serial started at {} baud (rx {:?}, tx {:?}, slot {:?})",
            self.baud_rate(),
            self.rx_pin,
            self.tx_pin,
            self.slot
        );
        Ok(())
    }

    /// Disarm reception and give the interrupt slot back
    pub fn end(&mut self) {
        if !self.started && self.slot.is_none() {
            return;
        }
        // Ignoring the result: disabling reception never attaches anything.
        let _ = self.enable_rx(false);
        self.release_slot();
        self.started = false;
        info!("Software serial stopped");
    }

    fn release_slot(&mut self) {
        if let Some(slot) = self.slot.take() {
            registry::release(slot);
        }
    }

    fn bit_cycles_for(&self, baud: u32) -> Result<u32, SerialError> {
        let cycles_per_second = self.platform.cycles_per_second();
        if baud == 0 || baud > cycles_per_second {
            return Err(SerialError::InvalidBaud(baud));
        }
        Ok(cycles_per_second / baud)
    }

    /// Change the line speed of both directions
    pub fn set_baud(&mut self, baud: u32) -> Result<(), SerialError> {
        let bit_cycles = self.bit_cycles_for(baud)?;
        self.config.baud = baud;
        self.decoder.set_bit_cycles(bit_cycles);
        self.tx.set_bit_cycles(bit_cycles);
        debug!("Bit period set to {bit_cycles} cycles for {baud} baud");
        Ok(())
    }

    /// Effective line speed, after integer rounding of the bit period
    pub fn baud_rate(&self) -> u32 {
        self.platform.cycles_per_second() / self.tx.bit_cycles()
    }

    /// Cycle-counter ticks per bit
    pub fn bit_cycles(&self) -> u32 {
        self.tx.bit_cycles()
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Interrupt slot currently held, if any
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    /// Drain captured edges into decoded bytes
    fn rx_bits(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return;
        };
        let ring = rx.capture.ring();

        if ring.take_overflow() {
            self.overflow |= OverflowKind::EDGE;
            log_warn_throttled!(self.throttle, "Edge capture ring overflow, edges lost");
        }

        let mut dropped = 0u32;
        while let Some(event) = ring.pop() {
            dropped += u32::from(self.decoder.decode(event, &mut rx.bytes).dropped);
        }

        if ring.is_empty() {
            let now = self.platform.cycle_count();
            if let Some(stop) = self.decoder.stop_edge_due(now) {
                dropped += u32::from(self.decoder.decode(stop, &mut rx.bytes).dropped);
            }
            self.decoder.rebase_idle(now);
        }

        if dropped > 0 {
            self.overflow |= OverflowKind::BYTE;
            log_warn_throttled!(
                self.throttle,
                "Receive buffer full, {dropped} byte(s) dropped"
            );
        }
    }

    fn buffered(&self) -> usize {
        self.rx.as_ref().map(|rx| rx.bytes.len()).unwrap_or(0)
    }

    /// Number of decoded bytes ready to read.
    ///
    /// When nothing is ready, yields to the platform once for up to twenty bit
    /// periods and checks again.
    pub fn available(&mut self) -> usize {
        if self.rx.is_none() {
            return 0;
        }
        self.rx_bits();
        if self.buffered() == 0 {
            let mhz = (self.platform.cycles_per_second() / 1_000_000).max(1);
            let budget = AVAILABLE_YIELD_BITS.saturating_mul(self.decoder.bit_cycles()) / mhz;
            self.platform.yield_now(budget);
            self.rx_bits();
        }
        self.buffered()
    }

    /// Next decoded byte, or `None` when nothing has been received
    pub fn read(&mut self) -> Option<u8> {
        if self.buffered() == 0 {
            self.rx_bits();
        }
        self.rx.as_mut()?.bytes.pop()
    }

    /// Next decoded byte without consuming it
    pub fn peek(&mut self) -> Option<u8> {
        self.rx_bits();
        self.rx.as_ref()?.bytes.peek()
    }

    /// Discard all received data, captured edges and any partial byte
    pub fn flush(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            rx.bytes.clear();
            rx.capture.ring().discard_all();
        }
        self.decoder.reset(self.platform.cycle_count());
    }

    /// Send `data`, blocking until the last stop bit has been clocked out.
    ///
    /// Returns the number of bytes sent: all of them, or 0 when the port has
    /// no usable tx pin or has not been started.
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.rx_bits();
        let Some(pin) = self.tx_pin else {
            return 0;
        };
        if !self.started || data.is_empty() {
            return 0;
        }

        let switch_direction = self.config.is_one_wire() && self.line_mode == LineMode::Receive;
        if switch_direction {
            self.switch_line(true);
        }
        if let Some(enable) = self.tx_enable_pin {
            tx::drive_line(&*self.platform, enable, true, self.tx.drive());
        }

        let sent = self.tx.transmit(&*self.platform, pin, data);

        if let Some(enable) = self.tx_enable_pin {
            tx::drive_line(&*self.platform, enable, false, self.tx.drive());
        }
        if switch_direction {
            self.switch_line(false);
        }
        sent
    }

    fn switch_line(&mut self, transmit: bool) {
        if let Err(e) = self.enable_tx(transmit) {
            warn!("Line direction switch failed: {e}");
        }
    }

    /// Send a single byte
    pub fn write_byte(&mut self, byte: u8) -> usize {
        self.write(&[byte])
    }

    /// Whether any receive data was lost since the last query; clears the flag
    pub fn overflow(&mut self) -> bool {
        !self.take_overflow().is_empty()
    }

    /// Which kinds of receive data loss happened since the last query; clears
    /// them
    pub fn take_overflow(&mut self) -> OverflowKind {
        if let Some(rx) = &self.rx {
            if rx.capture.ring().take_overflow() {
                self.overflow |= OverflowKind::EDGE;
            }
        }
        std::mem::replace(&mut self.overflow, OverflowKind::empty())
    }

    /// Register a callback run from [`perform_work`](Self::perform_work) with
    /// the number of available bytes
    pub fn on_receive<F>(&mut self, handler: F)
    where
        F: FnMut(usize) + Send + 'static,
    {
        self.on_receive = Some(Box::new(handler));
    }

    /// Foreground poll: decode pending edges and notify the receive handler if
    /// data is waiting
    pub fn perform_work(&mut self) {
        if self.on_receive.is_none() || self.rx.is_none() {
            return;
        }
        self.rx_bits();
        let count = self.buffered();
        if count > 0 {
            if let Some(handler) = self.on_receive.as_mut() {
                handler(count);
            }
        }
    }
}

impl<P: Platform> Drop for SoftwareSerial<P> {
    fn drop(&mut self) {
        self.end();
    }
}

impl<P: Platform> std::fmt::Debug for SoftwareSerial<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareSerial")
            .field("rx_pin", &self.rx_pin)
            .field("tx_pin", &self.tx_pin)
            .field("tx_enable_pin", &self.tx_enable_pin)
            .field("bit_cycles", &self.tx.bit_cycles())
            .field("slot", &self.slot)
            .field("started", &self.started)
            .field("line_mode", &self.line_mode)
            .finish_non_exhaustive()
    }
}
