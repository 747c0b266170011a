//! Pin handle integration tests against the simulation driver.
//!
//! Claiming through the pin map and claim registry, split-pair
//! complementarity on the simulated board, and failure cleanup.

use bm_common::hal::driver::{GpioDriver, HalError};
use bm_common::hal::types::{PinId, PinSource};
use bm_common::io::config::{PinName, PinRef};
use bm_common::io::registry::PinClaims;
use bm_hal::{PinHandle, PinMap, PinMode, PinRequest, SimulationDriver};

fn single(name: &str) -> PinRef {
    PinRef::Single(PinName::new(name))
}

fn split(on: &str, off: &str) -> PinRef {
    PinRef::Split {
        on: PinName::new(on),
        off: PinName::new(off),
    }
}

fn request<'a>(pin: &'a PinRef, owner: &'a str) -> PinRequest<'a> {
    PinRequest {
        pin,
        expander: None,
        active_low: false,
        owner,
    }
}

#[test]
fn single_pin_drives_board() {
    let mut driver = SimulationDriver::new();
    driver.init(false).unwrap();
    let board = driver.board();
    let mut claims = PinClaims::new();
    let pin = single("GPIO5");

    let mut handle =
        PinHandle::claim(&mut driver, &PinMap::default(), &mut claims, request(&pin, "lamp"))
            .unwrap();
    assert_eq!(handle.mode(), PinMode::Single);
    assert!(!board.onboard(5));
    handle.set_value(true).unwrap();
    assert!(board.onboard(5));
    assert!(claims.is_claimed(&PinId::onboard(5)));
}

#[test]
fn active_low_starts_high() {
    let mut driver = SimulationDriver::new();
    driver.init(false).unwrap();
    let board = driver.board();
    let mut claims = PinClaims::new();
    let pin = single("7");
    let req = PinRequest {
        active_low: true,
        ..request(&pin, "lamp")
    };

    let handle = PinHandle::claim(&mut driver, &PinMap::default(), &mut claims, req).unwrap();
    assert!(board.onboard(7));
    assert!(!handle.value().unwrap());
}

#[test]
fn split_pair_stays_complementary_on_board() {
    let mut driver = SimulationDriver::new();
    driver.init(false).unwrap();
    let board = driver.board();
    let mut claims = PinClaims::new();
    let pin = split("5", "6");

    let mut handle =
        PinHandle::claim(&mut driver, &PinMap::default(), &mut claims, request(&pin, "relay"))
            .unwrap();
    assert_eq!(handle.mode(), PinMode::Split);
    assert!(!board.onboard(5) && board.onboard(6));
    handle.set_value(true).unwrap();
    assert!(board.onboard(5) && !board.onboard(6));

    board.force_level(PinId::onboard(6), true);
    assert!(matches!(handle.value(), Err(HalError::SplitMismatch { .. })));
}

#[test]
fn duplicate_pin_across_controls_rejected() {
    let mut driver = SimulationDriver::new();
    driver.init(false).unwrap();
    let map = PinMap::default();
    let mut claims = PinClaims::new();
    let a = single("5");
    let b = split("D5", "6");

    let _lamp = PinHandle::claim(&mut driver, &map, &mut claims, request(&a, "lamp")).unwrap();
    let err = PinHandle::claim(&mut driver, &map, &mut claims, request(&b, "relay")).unwrap_err();
    assert!(matches!(err, HalError::DuplicatePin { .. }));
    assert!(!claims.is_claimed(&PinId::onboard(6)));
}

#[test]
fn unknown_pin_name_fails_construction() {
    let mut driver = SimulationDriver::new();
    driver.init(false).unwrap();
    let mut claims = PinClaims::new();
    let pin = single("LED1");
    let err = PinHandle::claim(&mut driver, &PinMap::default(), &mut claims, request(&pin, "x"))
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidPin(_)));
    assert!(claims.is_empty());
}

#[test]
fn expander_pins_resolve_through_extio() {
    let mut driver = SimulationDriver::new();
    driver.init(true).unwrap();
    let board = driver.board();
    let mut claims = PinClaims::new();
    let pin = single("B1");
    let req = PinRequest {
        expander: Some(0x20),
        ..request(&pin, "relay")
    };

    let mut handle = PinHandle::claim(&mut driver, &PinMap::default(), &mut claims, req).unwrap();
    handle.set_value(true).unwrap();
    let id = PinId::new(PinSource::Expander { address: 0x20 }, 9);
    assert_eq!(board.level(id), Some(true));
}

#[test]
fn driver_failure_releases_claims() {
    let mut driver = SimulationDriver::new();
    driver.init(false).unwrap();
    let mut claims = PinClaims::new();
    let pin = single("5");
    driver.board().fail_writes(PinId::onboard(5));

    let result = PinHandle::claim(&mut driver, &PinMap::default(), &mut claims, request(&pin, "x"));
    assert!(matches!(result, Err(HalError::CommunicationError(_))));
    assert!(claims.is_empty());
}
