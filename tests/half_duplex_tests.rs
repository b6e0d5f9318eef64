//! One-wire (shared pin) operation: direction switching and exclusivity.

mod support;

use softuart_rs::hal::Direction;
use softuart_rs::{LineMode, SerialConfig, SimPlatform, SoftwareSerial};
use std::sync::Arc;
use support::{drain, inject, lock};

const BAUD: u32 = 9600;

#[test]
fn test_no_reception_while_transmit_enabled() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::new());
    let mut port = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(5)));
    port.begin(BAUD).unwrap();

    port.enable_tx(true).unwrap();
    assert_eq!(port.line_mode(), LineMode::Transmit);
    inject(&sim, 5, b"ignored", BAUD, false);
    assert_eq!(port.available(), 0);

    port.enable_tx(false).unwrap();
    assert_eq!(port.available(), 0, "edges seen in transmit mode stay lost");

    inject(&sim, 5, b"heard", BAUD, false);
    assert_eq!(drain(&mut port), b"heard");
}

#[test]
fn test_write_switches_direction_and_back() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::new());
    let mut port = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(5)));
    port.begin(BAUD).unwrap();

    assert_eq!(port.write(b"ping"), 4);
    assert_eq!(port.line_mode(), LineMode::Receive);
    assert_eq!(sim.direction(5), Direction::Input);
    assert!(sim.has_interrupt(5));
    assert_eq!(port.available(), 0, "own transmission is not echoed");
}

#[test]
fn test_explicit_transmit_mode_is_kept_across_writes() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::new());
    let mut port = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(5)));
    port.begin(BAUD).unwrap();

    port.enable_tx(true).unwrap();
    port.write(b"a");
    port.write(b"b");
    assert_eq!(port.line_mode(), LineMode::Transmit);
    assert!(!sim.has_interrupt(5));
}

#[test]
fn test_two_one_wire_ports_take_turns() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::new());
    sim.connect(5, 6);
    let mut left = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(5)));
    let mut right = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(6), Some(6)));
    left.begin(BAUD).unwrap();
    right.begin(BAUD).unwrap();

    left.write(b"request");
    assert_eq!(drain(&mut right), b"request");
    assert_eq!(left.available(), 0);

    right.write(b"reply");
    assert_eq!(drain(&mut left), b"reply");
    assert_eq!(right.available(), 0);
}
