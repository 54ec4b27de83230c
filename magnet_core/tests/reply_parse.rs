use magnet_core::reply::{
    ReplyError, parse_heater, parse_heater_ack, parse_output, parse_polarity, parse_ramp_status,
    parse_setting,
};
use magnet_core::{HeaterStatus, Polarity, RampState, RampStatus};
use rstest::rstest;

#[test]
fn output_reply() {
    let r = parse_output("10:15:42 OUTPUT: 0.4521 AMPS OUTPUT: 0.250 VOLTS").unwrap();
    assert_eq!(r.timestamp.to_string(), "10:15:42");
    assert_eq!(r.value.field, 0.4521);
    assert_eq!(r.value.voltage, 0.25);
}

#[rstest]
#[case::mid("12:00:00 MID SETTING:  0.5000 TESLA", 0.5)]
#[case::max("12:00:00 MAX SETTING:  1.5000 TESLA", 1.5)]
#[case::rate("12:00:00 RAMP RATE:  0.390 A/SEC", 0.39)]
#[case::hv("12:00:00 HEATER OUTPUT:  2.50 VOLTS", 2.5)]
#[case::crlf("12:00:00 MID SETTING:  0.2500 TESLA\r\n", 0.25)]
fn settings_read_token_four(#[case] raw: &str, #[case] expected: f64) {
    assert_eq!(parse_setting(raw).unwrap().value, expected);
}

#[rstest]
#[case("12:00:00 CURRENT DIRECTION: +", Polarity::Positive)]
#[case("12:00:00 CURRENT DIRECTION: -", Polarity::Negative)]
fn polarity_reply(#[case] raw: &str, #[case] expected: Polarity) {
    assert_eq!(parse_polarity(raw).unwrap().value, expected);
}

#[test]
fn polarity_with_unknown_sign_is_a_value_error() {
    assert_eq!(
        parse_polarity("12:00:00 CURRENT DIRECTION: ?"),
        Err(ReplyError::Value {
            index: 3,
            token: "?".into()
        })
    );
}

#[rstest]
#[case::on("12:00:00 HEATER STATUS: ON", HeaterStatus::on())]
#[case::off("12:00:00 HEATER STATUS: OFF", HeaterStatus::off())]
#[case::switched_on("12:00:00 HEATER STATUS: SWITCHED ON", HeaterStatus::on())]
#[case::persistent(
    "12:00:00 HEATER STATUS: SWITCHED OFF AT 0.5000 TESLA",
    HeaterStatus::persistent(0.5)
)]
#[case::switched_off_at_zero(
    "12:00:00 HEATER STATUS: SWITCHED OFF AT 0.0000 TESLA",
    HeaterStatus::off()
)]
fn heater_reply(#[case] raw: &str, #[case] expected: HeaterStatus) {
    assert_eq!(parse_heater(raw).unwrap().value, expected);
}

#[rstest]
#[case("12:00:00 HEATER STATUS: ON", Some(true))]
#[case("12:00:00 HEATER STATUS: SWITCHED OFF AT 0.5000 TESLA", Some(false))]
#[case("12:00:00 HEATER ACKNOWLEDGED", None)]
fn heater_ack_only_checks_signature(#[case] raw: &str, #[case] expected: Option<bool>) {
    assert_eq!(parse_heater_ack(raw), Ok(expected));
}

#[test]
fn ramp_status_holding() {
    let r = parse_ramp_status("12:00:00 RAMP STATUS: HOLDING ON TARGET AT 0.5000 TESLA").unwrap();
    assert_eq!(r.value, RampStatus::holding(0.5));
    assert!(r.value.is_holding());
    assert_eq!(r.value.field(), Some(0.5));
}

#[test]
fn ramp_status_ramping() {
    let r =
        parse_ramp_status("12:00:00 RAMP STATUS: RAMPING FROM 0.2000 TO 0.5000 TESLA").unwrap();
    assert!(r.value.is_ramping());
    assert_eq!(r.value.field(), Some(0.2));
    assert_eq!(r.value.target_field(), Some(0.5));
}

#[test]
fn ramp_status_unknown_state_is_kept_verbatim() {
    let r = parse_ramp_status("12:00:00 RAMP STATUS: QUENCH TRIP").unwrap();
    assert_eq!(r.value.state(), &RampState::Other("QUENCH TRIP".into()));
    assert_eq!(r.value.field(), None);
}

#[rstest]
#[case::wrong_word("12:00:00 RAMP RATE:  0.390 A/SEC")]
#[case::truncated("12:00:00 RAMP STATUS:")]
#[case::no_timestamp("RAMP STATUS: HOLDING ON TARGET AT 0.5000 TESLA")]
#[case::bad_timestamp("25:61:00 RAMP STATUS: HOLDING ON TARGET AT 0.5000 TESLA")]
#[case::holding_without_field("12:00:00 RAMP STATUS: HOLDING ON TARGET")]
#[case::empty("")]
fn ramp_status_shape_mismatch(#[case] raw: &str) {
    assert_eq!(parse_ramp_status(raw), Err(ReplyError::Mismatch));
}

#[rstest]
#[case::wrong_word("12:00:00 INPUT: 0.4 AMPS OUTPUT: 0.2 VOLTS")]
#[case::missing_voltage("12:00:00 OUTPUT: 0.4 AMPS")]
#[case::garbled("?? 12;00;00 OUTPUT; 0.4 AMPS OUTPUT; 0.2 VOLTS")]
fn output_shape_mismatch(#[case] raw: &str) {
    assert_eq!(parse_output(raw), Err(ReplyError::Mismatch));
}

#[rstest]
#[case::field("12:00:00 OUTPUT: x AMPS OUTPUT: 0.2 VOLTS", 2, "x")]
#[case::voltage("12:00:00 OUTPUT: 0.4 AMPS OUTPUT: inf VOLTS", 5, "inf")]
fn output_value_errors(#[case] raw: &str, #[case] index: usize, #[case] token: &str) {
    assert_eq!(
        parse_output(raw),
        Err(ReplyError::Value {
            index,
            token: token.into()
        })
    );
}
