use std::time::Duration;

use magnet_core::mocks::ScriptedTransport;
use magnet_core::{
    Controller, ControllerCfg, ControllerError, HeaterStatus, Outcome, RampCfg, Refusal,
};
use magnet_traits::clock::test_clock::TestClock;
use rstest::rstest;

const SETTLE: Duration = Duration::from_secs(30);
const PERSISTENT_AT_HALF: &str = "12:00:00 HEATER STATUS: SWITCHED OFF AT 0.5000 TESLA";

fn build(t: ScriptedTransport, clock: &TestClock, cfg: ControllerCfg) -> Controller<ScriptedTransport> {
    let mut ctl = Controller::builder()
        .with_transport(t)
        .with_clock(clock.clone())
        .with_config(cfg)
        .build()
        .expect("controller build");
    ctl.transport_mut().clear_sent();
    ctl
}

fn holding_persistent(field: &str) -> ScriptedTransport {
    let mut t = ScriptedTransport::holding_at(0.5);
    t.stick("HEATER", PERSISTENT_AT_HALF).stick(
        "RAMP STATUS",
        &format!("12:00:00 RAMP STATUS: HOLDING ON TARGET AT {field} TESLA"),
    );
    t
}

#[test]
fn reenergize_persistent_magnet_end_to_end() {
    let clock = TestClock::new();
    let mut ctl = build(holding_persistent("0.5000"), &clock, ControllerCfg::default());
    assert_eq!(ctl.heater(), HeaterStatus::persistent(0.5));

    assert_eq!(ctl.set_heater(true).unwrap(), Outcome::Applied);
    assert_eq!(ctl.transport().count("HEATER ON"), 1);
    assert_eq!(clock.count_sleeps(SETTLE), 1);
    assert_eq!(ctl.heater(), HeaterStatus::on());
    assert!(!ctl.exchange_log().contains("refused"));

    // Second request is a no-op: nothing sent, no settle.
    assert_eq!(
        ctl.set_heater(true).unwrap(),
        Outcome::Refused(Refusal::AlreadyOn)
    );
    assert_eq!(ctl.transport().count("HEATER ON"), 1);
    assert_eq!(clock.count_sleeps(SETTLE), 1);
}

#[rstest]
#[case::exact("0.5000")]
#[case::just_above("0.50005")]
#[case::just_below("0.49995")]
fn reenergize_allowed_within_tolerance(#[case] supply_field: &str) {
    let clock = TestClock::new();
    let mut ctl = build(holding_persistent(supply_field), &clock, ControllerCfg::default());
    assert!(ctl.set_heater(true).unwrap().is_applied());
    assert_eq!(ctl.transport().count("HEATER ON"), 1);
}

#[rstest]
#[case::above("0.5002")]
#[case::below("0.4990")]
#[case::zero("0.0000")]
fn reenergize_refused_on_field_mismatch(#[case] supply_field: &str) {
    let clock = TestClock::new();
    let mut ctl = build(holding_persistent(supply_field), &clock, ControllerCfg::default());
    let outcome = ctl.set_heater(true).unwrap();
    match outcome.refusal() {
        Some(Refusal::PersistentFieldMismatch {
            persistent_field, ..
        }) => assert_eq!(*persistent_field, 0.5),
        other => panic!("expected field mismatch, got {other:?}"),
    }
    assert_eq!(ctl.transport().count("HEATER ON"), 0);
    assert!(clock.sleeps().is_empty());
    assert!(ctl.heater().is_persistent());
    assert!(ctl.exchange_log().contains("persistent field first"));
}

#[test]
fn heater_off_while_persistent_is_a_precondition_violation() {
    let clock = TestClock::new();
    let mut ctl = build(holding_persistent("0.5000"), &clock, ControllerCfg::default());
    let err = ctl.set_heater(false).unwrap_err();
    assert!(matches!(err, ControllerError::Precondition(_)));
    assert!(ctl.transport().sent().is_empty());
    assert!(ctl.heater().is_persistent());
}

#[test]
fn heater_off_at_field_latches_persistent_mode() {
    let clock = TestClock::new();
    let mut t = ScriptedTransport::holding_at(0.5);
    t.stick("HEATER", "12:00:00 HEATER STATUS: ON");
    let mut ctl = build(t, &clock, ControllerCfg::default());

    assert!(ctl.set_heater(false).unwrap().is_applied());
    assert_eq!(ctl.transport().count("HEATER OFF"), 1);
    assert_eq!(ctl.heater(), HeaterStatus::persistent(0.5));
    assert_eq!(clock.count_sleeps(SETTLE), 1);
}

#[test]
fn heater_off_at_zero_field_is_not_persistent() {
    let clock = TestClock::new();
    let mut t = ScriptedTransport::holding_at(0.0);
    t.stick("HEATER", "12:00:00 HEATER STATUS: ON");
    let mut ctl = build(t, &clock, ControllerCfg::default());

    assert!(ctl.set_heater(false).unwrap().is_applied());
    assert_eq!(ctl.heater(), HeaterStatus::off());
    assert!(!ctl.heater().is_persistent());
}

#[test]
fn heater_off_when_already_off_is_a_noop() {
    let clock = TestClock::new();
    let mut ctl = build(ScriptedTransport::holding_at(0.0), &clock, ControllerCfg::default());
    assert_eq!(
        ctl.set_heater(false).unwrap(),
        Outcome::Refused(Refusal::AlreadyOff)
    );
    assert!(ctl.transport().sent().is_empty());
}

#[rstest]
#[case::on(false, true)]
#[case::off(true, false)]
fn heater_switch_refused_while_ramping(#[case] heater_on: bool, #[case] request: bool) {
    let clock = TestClock::new();
    let mut t = ScriptedTransport::holding_at(0.2);
    t.stick(
        "HEATER",
        if heater_on {
            "12:00:00 HEATER STATUS: ON"
        } else {
            "12:00:00 HEATER STATUS: OFF"
        },
    )
    .stick(
        "RAMP STATUS",
        "12:00:00 RAMP STATUS: RAMPING FROM 0.2000 TO 0.5000 TESLA",
    );
    let mut ctl = build(t, &clock, ControllerCfg::default());
    assert_eq!(
        ctl.set_heater(request).unwrap(),
        Outcome::Refused(Refusal::NotHolding)
    );
    assert_eq!(ctl.transport().count("HEATER ON"), 0);
    assert_eq!(ctl.transport().count("HEATER OFF"), 0);
    assert!(clock.sleeps().is_empty());
    assert_eq!(ctl.heater().switch(), heater_on);
}

#[rstest]
#[case::strict(true)]
#[case::lenient(false)]
fn unrecognized_ramp_state_blocks_heater(#[case] strict: bool) {
    let clock = TestClock::new();
    let mut t = ScriptedTransport::holding_at(0.0);
    t.stick("RAMP STATUS", "12:00:00 RAMP STATUS: QUENCH DETECTED");
    let cfg = ControllerCfg {
        ramp: RampCfg {
            strict_state: strict,
            ..RampCfg::default()
        },
        ..ControllerCfg::default()
    };
    let mut ctl = build(t, &clock, cfg);

    let res = ctl.set_heater(true);
    if strict {
        assert_eq!(
            res,
            Err(ControllerError::RampState("QUENCH DETECTED".into()))
        );
    } else {
        assert_eq!(res, Ok(Outcome::Refused(Refusal::NotHolding)));
    }
    assert_eq!(ctl.transport().count("HEATER ON"), 0);
}

#[test]
fn settle_time_comes_from_config() {
    let clock = TestClock::new();
    let mut cfg = ControllerCfg::default();
    cfg.heater.settle = Duration::from_millis(250);
    let mut ctl = build(ScriptedTransport::holding_at(0.0), &clock, cfg);
    assert!(ctl.set_heater(true).unwrap().is_applied());
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
}
