//! # Hardware Abstraction Layer for GPIO Serial Lines
//!
//! This module defines the platform collaborator a software serial instance is
//! built on: pin direction and pull configuration, level read/write, edge
//! interrupt attach/detach, the free-running cycle counter and the coarse
//! sleep/yield primitives. The serial engine consumes this trait and never
//! touches hardware directly.
//!
//! Chip-specific pin capability checks stay behind [`Platform::is_valid_pin`].

use thiserror::Error;

/// Errors that can occur during HAL operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HalError {
    #[error("GPIO operation error on pin {0}")]
    Gpio(u8),

    #[error("Interrupt attach failed for pin {pin}: {reason}")]
    InterruptAttach { pin: u8, reason: String },
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Pin pull configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
}

/// Edge interrupt entry point.
///
/// The platform interrupt API carries no user context, so handlers are plain
/// function pointers; see [`crate::serial::registry`] for how an entry point
/// finds its owning instance.
pub type IsrHandler = fn();

/// GPIO, interrupt and timing collaborator for a software serial line.
///
/// Implementations must be callable from interrupt context for
/// [`read_level`](Platform::read_level) and [`cycle_count`](Platform::cycle_count):
/// no blocking, no allocation.
pub trait Platform: Send + Sync + 'static {
    /// Whether the pin can be used for serial I/O on this chip
    fn is_valid_pin(&self, _pin: u8) -> bool {
        true
    }

    /// Configure a pin as input or output
    fn set_direction(&self, pin: u8, direction: Direction);

    /// Configure a pin's pull resistor
    fn set_pull(&self, pin: u8, pull: Pull);

    /// Drive an output pin (`true` = high)
    fn write_level(&self, pin: u8, high: bool);

    /// Read the current level of a pin (`true` = high)
    fn read_level(&self, pin: u8) -> bool;

    /// Attach `handler` to fire on both edges of `pin`
    fn attach_edge_interrupt(&self, pin: u8, handler: IsrHandler) -> Result<(), HalError>;

    /// Detach any interrupt handler from `pin`
    fn detach_interrupt(&self, pin: u8);

    /// Free-running cycle counter, wraps at 2^32
    fn cycle_count(&self) -> u32;

    /// Cycle counter rate
    fn cycles_per_second(&self) -> u32;

    /// Coarse sleep with microsecond granularity
    fn delay_micros(&self, micros: u32);

    /// Mask foreground interrupts
    fn disable_interrupts(&self);

    /// Unmask foreground interrupts
    fn enable_interrupts(&self);

    /// Give a cooperative scheduler up to `budget_micros` to run pending work
    fn yield_now(&self, _budget_micros: u32) {}
}

pub mod sim;

pub use sim::{SimPlatform, SimPlatformBuilder};
