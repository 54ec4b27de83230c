use std::time::Duration;

use magnet_core::mocks::ScriptedTransport;
use magnet_core::{Controller, ControllerCfg, ControllerError, ProtocolError, RetryPolicy};
use magnet_hardware::SimulatedSupply;
use magnet_traits::clock::test_clock::TestClock;
use rstest::rstest;

fn primed(t: ScriptedTransport, clock: &TestClock) -> Controller<ScriptedTransport> {
    let mut ctl = Controller::builder()
        .with_transport(t)
        .with_clock(clock.clone())
        .build()
        .expect("controller build");
    ctl.transport_mut().clear_sent();
    ctl
}

#[test]
fn garbled_reply_is_retried_until_valid() {
    let clock = TestClock::new();
    let mut ctl = primed(ScriptedTransport::holding_at(0.0), &clock);
    ctl.transport_mut()
        .queue("GET MID", "?? 12;00;00 MID SETTING;  0.5000 TESLA")
        .queue("GET MID", "")
        .stick("GET MID", "12:00:05 MID SETTING:  0.7000 TESLA");

    let mid = ctl.refresh_mid().unwrap();
    assert_eq!(mid.value, 0.7);
    assert_eq!(mid.timestamp.to_string(), "12:00:05");
    assert_eq!(ctl.transport().count("GET MID"), 3);
    assert_eq!(clock.count_sleeps(Duration::from_millis(100)), 2);
    assert!(ctl.exchange_log().contains("signature mismatch on `GET MID`"));
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(5)]
fn retries_stop_after_max_attempts(#[case] attempts: u32) {
    let clock = TestClock::new();
    let mut ctl = Controller::builder()
        .with_transport(ScriptedTransport::holding_at(0.0))
        .with_clock(clock.clone())
        .with_config(ControllerCfg {
            retry: RetryPolicy {
                max_attempts: attempts,
                backoff: Duration::from_millis(7),
            },
            ..ControllerCfg::default()
        })
        .build()
        .expect("controller build");
    ctl.transport_mut().clear_sent();
    ctl.transport_mut()
        .stick("GET SIGN", "12:00:00 CURRENT ORIENTATION: +");

    match ctl.refresh_polarity() {
        Err(ControllerError::Protocol(ProtocolError::SchemaMismatch {
            command,
            attempts: n,
            ..
        })) => {
            assert_eq!(command, "GET SIGN");
            assert_eq!(n, attempts);
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
    assert_eq!(ctl.transport().count("GET SIGN"), attempts as usize);
    assert_eq!(
        clock.count_sleeps(Duration::from_millis(7)),
        attempts as usize - 1
    );
}

#[test]
fn malformed_value_is_not_retried() {
    let clock = TestClock::new();
    let mut ctl = primed(ScriptedTransport::holding_at(0.0), &clock);
    ctl.transport_mut()
        .stick("GET RATE", "12:00:00 RAMP RATE:  fast A/SEC");
    let err = ctl.refresh_ramp_rate().unwrap_err();
    assert_eq!(
        err,
        ControllerError::Protocol(ProtocolError::Value {
            command: "GET RATE".into(),
            index: 4,
            token: "fast".into(),
            reply: "12:00:00 RAMP RATE:  fast A/SEC".into(),
        })
    );
    assert_eq!(ctl.transport().count("GET RATE"), 1);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn failed_read_keeps_the_previous_value() {
    let clock = TestClock::new();
    let mut ctl = primed(ScriptedTransport::holding_at(0.0), &clock);
    let before = ctl.max();
    ctl.transport_mut().stick("GET MAX", "?? nothing useful");
    assert!(ctl.refresh_max().is_err());
    assert_eq!(ctl.max(), before);
}

#[rstest]
#[case::nominal("0.390", Some(true))]
#[case::off_nominal("0.500", Some(false))]
fn ramp_rate_health_is_flagged(#[case] rate: &str, #[case] ok: Option<bool>) {
    let clock = TestClock::new();
    let mut t = ScriptedTransport::holding_at(0.0);
    t.stick("GET RATE", &format!("12:00:00 RAMP RATE:  {rate} A/SEC"));
    let ctl = primed(t, &clock);
    assert_eq!(ctl.ramp_rate_ok(), ok);
    let flag = if ok == Some(true) { "ramp rate OK" } else { "ramp rate NG" };
    assert!(ctl.exchange_log().contains(flag));
}

#[test]
fn transport_timeout_is_typed_and_not_retried() {
    let clock = TestClock::new();
    let mut ctl = Controller::builder()
        .with_transport(SimulatedSupply::new().with_timeouts(1))
        .with_clock(clock.clone())
        .build_unprimed()
        .expect("controller build");
    assert_eq!(ctl.refresh_output(), Err(ControllerError::TransportTimeout));
    assert!(clock.sleeps().is_empty());
    // The next query goes through.
    assert!(ctl.refresh_output().is_ok());
}

#[test]
fn build_fails_when_priming_times_out() {
    let err = Controller::builder()
        .with_transport(SimulatedSupply::new().with_timeouts(1))
        .with_clock(TestClock::new())
        .build()
        .unwrap_err();
    assert_eq!(err, ControllerError::TransportTimeout);
}

#[test]
fn unanswered_command_surfaces_transport_error() {
    let mut ctl = Controller::builder()
        .with_transport(ScriptedTransport::new())
        .with_clock(TestClock::new())
        .build_unprimed()
        .expect("controller build");
    match ctl.refresh_heater_status() {
        Err(ControllerError::Transport(msg)) => assert!(msg.contains("no scripted reply")),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[test]
fn builder_rejects_missing_transport_and_bad_config() {
    let err = Controller::<ScriptedTransport>::builder()
        .build_unprimed()
        .unwrap_err();
    assert!(matches!(err, ControllerError::Config(_)));

    let mut cfg = ControllerCfg::default();
    cfg.ramp.holding_samples = 0;
    let err = Controller::builder()
        .with_transport(ScriptedTransport::new())
        .with_config(cfg)
        .build_unprimed()
        .unwrap_err();
    assert!(matches!(err, ControllerError::Config(_)));
}

#[test]
fn every_exchange_is_logged() {
    let clock = TestClock::new();
    let mut ctl = primed(ScriptedTransport::holding_at(0.0), &clock);
    ctl.refresh_heater_voltage().unwrap();
    let lines = ctl.exchange_log().lines();
    let n = lines.len();
    assert!(lines[n - 2].ends_with(">> GET HV"));
    assert!(lines[n - 1].ends_with("<< 12:00:00 HEATER OUTPUT:  0.00 VOLTS"));
}
