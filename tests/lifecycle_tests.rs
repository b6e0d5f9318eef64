//! Port lifecycle: slot claiming, driver-enable pin, transmit timing.

mod support;

use softuart_rs::constants::MAX_INSTANCES;
use softuart_rs::serial::registry;
use softuart_rs::{Platform, SerialConfig, SerialError, SimPlatform, SoftwareSerial};
use std::sync::Arc;
use support::{drain, lock};

#[test]
fn test_slot_table_exhaustion_through_begin() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::new());
    let mut ports: Vec<_> = (0..MAX_INSTANCES as u8)
        .map(|pin| SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(pin), None)))
        .collect();
    for port in ports.iter_mut() {
        port.begin(9600).unwrap();
    }
    assert_eq!(registry::free_slots(), 0);

    let extra_pin = MAX_INSTANCES as u8;
    let mut extra = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(extra_pin), None));
    let err = extra.begin(9600).unwrap_err();
    assert!(matches!(err, SerialError::NoFreeSlot { capacity: MAX_INSTANCES }));
    assert!(!extra.is_started());
    assert!(!sim.has_interrupt(extra_pin));

    let freed = ports[3].slot();
    ports[3].end();
    extra.begin(9600).unwrap();
    assert_eq!(extra.slot(), freed);
    assert!(sim.has_interrupt(extra_pin));

    drop(ports);
    drop(extra);
    assert_eq!(registry::free_slots(), MAX_INSTANCES);
}

#[test]
fn test_transmit_only_port_needs_no_slot() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::new());
    let mut port = SoftwareSerial::new(sim, SerialConfig::new(None, Some(4)));
    port.begin(9600).unwrap();
    assert!(port.slot().is_none());
    assert_eq!(port.write(b"ok"), 2);
}

#[test]
fn test_ascii_a_edge_timing_at_9600() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::new());
    sim.connect(4, 5);
    let mut sender = SoftwareSerial::new(sim.clone(), SerialConfig::new(None, Some(4)));
    let mut receiver = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), None));
    sender.begin(9600).unwrap();
    receiver.begin(9600).unwrap();
    assert_eq!(sender.bit_cycles(), 8333);

    sim.clear_transitions();
    sender.write_byte(b'A');

    let edges = sim.transitions(4);
    let levels: Vec<bool> = edges.iter().map(|&(_, level)| level).collect();
    assert_eq!(levels, [false, true, false, true, false, true]);
    for (pair, bits) in edges.windows(2).zip([1, 1, 5, 1, 1]) {
        let span = pair[1].0.wrapping_sub(pair[0].0) as i64;
        assert!((span - bits * 8333).abs() <= 8, "span {span} for {bits} bit(s)");
    }

    assert_eq!(drain(&mut receiver), b"A");
}

#[test]
fn test_driver_enable_pin_frames_transmission() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::new());
    let config = SerialConfig::new(None, Some(4)).with_tx_enable_pin(2);
    let mut port = SoftwareSerial::new(sim.clone(), config);
    port.begin(9600).unwrap();
    assert_eq!(port.transmit_enable_pin(), Some(2));
    assert!(!sim.read_level(2));

    sim.clear_transitions();
    port.write(b"RS485");

    let enable = sim.transitions(2);
    assert_eq!(enable.len(), 2);
    let (on_at, on) = enable[0];
    let (off_at, off) = enable[1];
    assert!(on && !off);

    let line = sim.transitions(4);
    assert!(!line.is_empty());
    for (at, _) in line {
        assert!(at >= on_at && at <= off_at);
    }
    assert!(!sim.read_level(2));
}

#[test]
fn test_invalid_enable_pin_fails_begin() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::builder().valid_pins(&[4, 5]).build());
    let config = SerialConfig::new(Some(5), Some(4)).with_tx_enable_pin(33);
    let mut port = SoftwareSerial::new(sim.clone(), config);
    assert!(matches!(port.begin(9600), Err(SerialError::InvalidPin(33))));
    assert!(port.slot().is_none());

    // the bad pin is forgotten, so a retry succeeds without a driver enable
    port.begin(9600).unwrap();
    assert_eq!(port.transmit_enable_pin(), None);
}

#[test]
fn test_end_is_idempotent_and_restartable() {
    let _guard = lock();
    let sim = Arc::new(SimPlatform::new());
    sim.connect(4, 5);
    let mut port = SoftwareSerial::new(sim.clone(), SerialConfig::new(Some(5), Some(4)));
    port.begin(9600).unwrap();
    port.end();
    port.end();
    assert!(!sim.has_interrupt(5));
    assert_eq!(port.write(b"off"), 0);

    port.begin(4800).unwrap();
    assert_eq!(port.baud_rate(), 4800);
    port.write(b"on");
    assert_eq!(drain(&mut port), b"on");
}
