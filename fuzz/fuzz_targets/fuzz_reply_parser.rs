#![no_main]
use libfuzzer_sys::fuzz_target;
use magnet_core::reply;

fuzz_target!(|data: &str| {
    let _ = reply::parse_any(data);
    // A well-formed output reply must carry finite numbers.
    if let Ok(r) = reply::parse_output(data) {
        assert!(r.value.field.is_finite() && r.value.voltage.is_finite());
    }
    let _ = reply::parse_heater_ack(data);
});
