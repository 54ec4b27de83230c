//! Human-readable error descriptions and structured JSON error formatting.

use magnet_core::error::{ControllerError, ProtocolError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<ControllerError>() {
        return match ce {
            ControllerError::TransportTimeout => {
                "What happened: The supply did not answer within the read timeout.\nLikely causes: Cable unplugged, supply powered off, wrong port or baud rate.\nHow to fix: Check [transport] port/baud_rate in the config and the RS-232 cable; raise transport.timeout_ms if the supply is just slow.".to_string()
            }
            ControllerError::Transport(msg) => format!(
                "What happened: The serial link failed ({msg}).\nLikely causes: Port in use by another program or missing permissions.\nHow to fix: Close other programs using the port and check access rights to the device."
            ),
            ControllerError::Protocol(ProtocolError::SchemaMismatch {
                command,
                reply,
                attempts,
            }) => format!(
                "What happened: `{command}` got no well-formed reply after {attempts} attempt(s); last reply was {reply:?}.\nLikely causes: Line noise, wrong terminator, or another program talking to the supply.\nHow to fix: Check transport.terminator and the cable; raise protocol.retry_max if noise is intermittent."
            ),
            ControllerError::Protocol(ProtocolError::Value { command, token, .. }) => format!(
                "What happened: `{command}` returned an unreadable value {token:?}.\nLikely causes: Firmware with a different reply format.\nHow to fix: Re-run with --log-level=debug and compare the raw reply with the supply manual."
            ),
            ControllerError::RampState(state) => format!(
                "What happened: The supply reported an unknown ramp state {state:?}.\nLikely causes: Quench, fault or a manual front-panel mode.\nHow to fix: Inspect the supply front panel; set ramp.strict_state = false to treat unknown states as 'not holding'."
            ),
            ControllerError::Precondition(what) => format!(
                "What happened: Request rejected: {what}.\nLikely causes: The magnet is already persistent.\nHow to fix: Switch the heater ON (at the persistent field) before switching it OFF again."
            ),
            ControllerError::RampTimeout { waited_ms } => format!(
                "What happened: The ramp did not settle within {waited_ms} ms.\nLikely causes: Ramp rate too low for the distance or the supply stuck ramping.\nHow to fix: Check the supply; raise ramp.max_wait_ms (0 waits forever)."
            ),
            ControllerError::Cancelled => "Cancelled by user.".to_string(),
            ControllerError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if err.downcast_ref::<toml::de::Error>().is_some() {
        return format!(
            "What happened: The config file is not valid TOML.\nHow to fix: Fix the syntax error below and rerun.\n{err:#}"
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("config file") && lower.contains("not found") {
        return format!(
            "What happened: {msg}.\nHow to fix: Pass --config with an existing file, or omit it to use factory defaults."
        );
    }

    if lower.contains("must be") || lower.contains("unreasonably") || lower.contains("unsafe") {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range value in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    if lower.contains("open serial port") {
        return format!(
            "What happened: Failed to open the serial port.\nLikely causes: Wrong transport.port, missing permissions, or the device is unplugged.\nHow to fix: Fix [transport] port in the config, or run with --sim. Original: {err:#}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<ControllerError>() {
        Some(ControllerError::TransportTimeout | ControllerError::Transport(_)) => 2,
        Some(ControllerError::Protocol(_)) => 3,
        Some(ControllerError::Precondition(_) | ControllerError::RampState(_)) => 4,
        Some(ControllerError::RampTimeout { .. }) => 5,
        Some(ControllerError::Cancelled) => 130,
        Some(ControllerError::Config(_)) | None => 1,
    }
}

/// Short machine-readable name of the error kind.
pub fn error_reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<ControllerError>() {
        Some(ControllerError::TransportTimeout) => "TransportTimeout",
        Some(ControllerError::Transport(_)) => "Transport",
        Some(ControllerError::Protocol(ProtocolError::SchemaMismatch { .. })) => "SchemaMismatch",
        Some(ControllerError::Protocol(ProtocolError::Value { .. })) => "MalformedValue",
        Some(ControllerError::RampState(_)) => "RampState",
        Some(ControllerError::Precondition(_)) => "Precondition",
        Some(ControllerError::RampTimeout { .. }) => "RampTimeout",
        Some(ControllerError::Cancelled) => "Cancelled",
        Some(ControllerError::Config(_)) => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = error_reason_name(err);
    let details = match err.downcast_ref::<ControllerError>() {
        Some(ControllerError::Protocol(ProtocolError::SchemaMismatch {
            command,
            reply,
            attempts,
        })) => Some(json!({ "command": command, "reply": reply, "attempts": attempts })),
        Some(ControllerError::Protocol(ProtocolError::Value {
            command,
            index,
            token,
            ..
        })) => Some(json!({ "command": command, "index": index, "token": token })),
        Some(ControllerError::RampTimeout { waited_ms }) => Some(json!({ "waited_ms": waited_ms })),
        Some(ControllerError::RampState(state)) => Some(json!({ "state": state })),
        _ => None,
    };

    let obj = if let Some(d) = details {
        json!({ "reason": reason, "details": d, "message": humanize(err) })
    } else {
        json!({ "reason": reason, "message": humanize(err) })
    };
    obj.to_string()
}
