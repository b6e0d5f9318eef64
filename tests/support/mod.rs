//! Shared helpers for the integration tests: a lock for the process-wide
//! interrupt slot table and an external line driver for injecting frames.

#![allow(dead_code)]

use softuart_rs::serial::HoldPlanner;
use softuart_rs::SimPlatform;
use std::sync::{Mutex, MutexGuard};

pub const CLOCK_HZ: u32 = 80_000_000;

static SLOT_TABLE: Mutex<()> = Mutex::new(());

/// Serialise tests that claim interrupt slots
pub fn lock() -> MutexGuard<'static, ()> {
    softuart_rs::logging::try_init_logger();
    SLOT_TABLE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Drive `data` onto `pin` from outside the device under test, as a remote
/// transmitter would. The line is left driven at the idle level.
pub fn inject(sim: &SimPlatform, pin: u8, data: &[u8], baud: u32, invert: bool) {
    for hold in HoldPlanner::new(data, CLOCK_HZ / baud, invert) {
        sim.set_level(pin, hold.high);
        sim.advance(hold.cycles);
    }
}

/// Collect everything currently readable
pub fn drain(port: &mut softuart_rs::SoftwareSerial<SimPlatform>) -> Vec<u8> {
    let mut received = Vec::new();
    while port.available() > 0 {
        received.extend(port.read());
    }
    received
}
