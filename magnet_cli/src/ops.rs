//! Supply assembly and one function per CLI command.

use std::path::Path;
use std::time::Duration;

use eyre::WrapErr;
use magnet_config::Config;
use magnet_core::{
    CancelToken, Controller, ControllerCfg, ExchangeLog, FileLogger, Outcome, Polarity, Sample,
    SessionState, Snapshot,
};
use magnet_hardware::SimulatedSupply;
use magnet_traits::Transport;
use serde::Serialize;
use serde_json::json;

use crate::cli::{Commands, Direction, RampTarget, Switch};

pub type Supply = Box<dyn Transport + Send>;

/// Environment hooks for tests: make the simulated supply misbehave.
const SIM_TIMEOUT_ENV: &str = "MAGNET_SIM_TIMEOUT";
const SIM_GARBLE_ENV: &str = "MAGNET_SIM_GARBLE";

fn env_count(key: &str) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn simulated() -> Supply {
    let supply = SimulatedSupply::new()
        .with_timeouts(env_count(SIM_TIMEOUT_ENV))
        .with_garbled_replies(env_count(SIM_GARBLE_ENV));
    tracing::info!("using simulated supply");
    Box::new(supply)
}

/// Pick the simulated or serial transport.
pub fn open_supply(cfg: &Config, sim: bool) -> eyre::Result<Supply> {
    if sim {
        return Ok(simulated());
    }
    #[cfg(feature = "serial")]
    {
        use magnet_hardware::serial::{SerialSettings, SerialTransport};
        let settings = SerialSettings {
            port: cfg.transport.port.clone(),
            baud_rate: cfg.transport.baud_rate,
            timeout: Duration::from_millis(cfg.transport.timeout_ms),
            pace: Duration::from_millis(cfg.transport.pace_ms),
            terminator: cfg.transport.terminator_bytes(),
        };
        let port = SerialTransport::open(settings)
            .wrap_err_with(|| format!("open serial port {}", cfg.transport.port))?;
        Ok(Box::new(port))
    }
    #[cfg(not(feature = "serial"))]
    {
        tracing::warn!(
            port = %cfg.transport.port,
            "built without the `serial` feature; falling back to the simulated supply"
        );
        Ok(simulated())
    }
}

/// Build and prime the controller.
pub fn connect(cfg: &Config, supply: Supply, cancel: &CancelToken) -> eyre::Result<Controller<Supply>> {
    let log = match cfg.logging.exchange_file.as_deref() {
        Some(path) => ExchangeLog::with_sink(Box::new(FileLogger::new(path.to_string()))),
        None => ExchangeLog::new(),
    };
    let ctl = Controller::builder()
        .with_transport(supply)
        .with_config(ControllerCfg::from(cfg))
        .with_exchange_log(log)
        .with_cancel_token(cancel.clone())
        .build()
        .wrap_err("connect to supply")?;
    Ok(ctl)
}

/// Run one command against a primed controller.
pub fn run_command(
    ctl: &mut Controller<Supply>,
    cmd: &Commands,
    cancel: &CancelToken,
    json: bool,
) -> eyre::Result<()> {
    match cmd {
        Commands::Status => {
            print_status(ctl.state(), ctl.ramp_rate_ok(), json);
            Ok(())
        }
        Commands::Heater { state } => {
            let outcome = ctl.set_heater(*state == Switch::On)?;
            report("heater", &outcome, json);
            Ok(())
        }
        Commands::Ramp { target, csv } => {
            let res = match target {
                RampTarget::Zero => ctl.ramp_zero(),
                RampTarget::Mid => ctl.ramp_mid(),
            };
            // Keep whatever was recorded, even on timeout or Ctrl-C.
            if let Some(path) = csv {
                write_csv(path, ctl.record().samples())?;
            }
            let outcome = res?;
            report("ramp", &outcome, json);
            Ok(())
        }
        Commands::SetMid { value } => {
            let outcome = ctl.set_mid(*value)?;
            report("set-mid", &outcome, json);
            Ok(())
        }
        Commands::Direction { sign } => {
            let polarity = match sign {
                Direction::Plus => Polarity::Positive,
                Direction::Minus => Polarity::Negative,
            };
            let outcome = ctl.set_direction(polarity)?;
            report("direction", &outcome, json);
            Ok(())
        }
        Commands::Record { csv, samples } => {
            let taken = match samples {
                Some(n) => ctl.record_samples(*n)?,
                None => {
                    if !json {
                        eprintln!("Recording; press Ctrl-C to stop.");
                    }
                    ctl.start_record()?
                }
            };
            write_csv(csv, ctl.record().samples())?;
            if json {
                println!(
                    "{}",
                    json!({ "command": "record", "samples": taken, "csv": csv.display().to_string() })
                );
            } else {
                println!("Recorded {taken} samples to {}", csv.display());
            }
            Ok(())
        }
        Commands::Watch { interval_ms, count } => watch(ctl, *interval_ms, *count, cancel, json),
        Commands::SelfCheck => {
            let ok = ctl.ramp_rate_ok() == Some(true);
            if json {
                println!(
                    "{}",
                    json!({ "command": "self-check", "ok": ok, "ramp_rate_ok": ok })
                );
            } else if ok {
                println!("OK");
            } else {
                println!("Supply answers, but the ramp rate is not nominal (NG)");
            }
            Ok(())
        }
    }
}

fn report(command: &str, outcome: &Outcome, json: bool) {
    match (outcome.refusal(), json) {
        (None, true) => println!("{}", json!({ "command": command, "outcome": "applied" })),
        (None, false) => println!("{command}: done"),
        (Some(r), true) => println!(
            "{}",
            json!({ "command": command, "outcome": "refused", "reason": r.to_string() })
        ),
        (Some(r), false) => println!("{command}: refused ({r})"),
    }
}

#[derive(Serialize)]
struct StatusLine<'a> {
    command: &'static str,
    state: &'a SessionState,
    ramp_rate_ok: Option<bool>,
}

fn print_status(state: &SessionState, ramp_rate_ok: Option<bool>, json: bool) {
    if json {
        let line = StatusLine {
            command: "status",
            state,
            ramp_rate_ok,
        };
        match serde_json::to_string(&line) {
            Ok(s) => println!("{s}"),
            Err(e) => tracing::error!(error = %e, "status serialization failed"),
        }
        return;
    }
    if let Some(o) = state.output() {
        println!("output:       {:.4} T  {:.3} V  (at {})", o.value.field, o.value.voltage, o.timestamp);
    }
    if let Some(m) = state.mid() {
        println!("mid:          {:.4} T", m.value);
    }
    if let Some(m) = state.max() {
        println!("max:          {:.4} T", m.value);
    }
    if let Some(r) = state.ramp_rate() {
        let flag = match ramp_rate_ok {
            Some(true) => "OK",
            _ => "NG",
        };
        println!("ramp rate:    {:.3} A/s  {flag}", r.value);
    }
    if let Some(hv) = state.heater_voltage() {
        println!("heater out:   {:.2} V", hv.value);
    }
    if let Some(p) = state.polarity() {
        println!("direction:    {}", p.value);
    }
    println!("heater:       {}", heater_text(state));
    println!("ramp:         {}", ramp_text(state));
}

fn heater_text(state: &SessionState) -> String {
    let h = state.heater();
    match (h.switch(), h.field()) {
        (true, _) => "ON".to_string(),
        (false, Some(f)) if h.is_persistent() => format!("OFF (persistent at {f:.4} T)"),
        _ => "OFF".to_string(),
    }
}

fn ramp_text(state: &SessionState) -> String {
    let r = state.ramp();
    match (r.field(), r.target_field()) {
        (Some(f), Some(t)) => format!("RAMPING {f:.4} -> {t:.4} T"),
        (Some(f), None) => format!("HOLDING at {f:.4} T"),
        _ => format!("{:?}", r.state()),
    }
}

fn watch(
    ctl: &mut Controller<Supply>,
    interval_ms: u64,
    count: Option<usize>,
    cancel: &CancelToken,
    json: bool,
) -> eyre::Result<()> {
    let feed = ctl.subscribe();
    let mut ticks = 0usize;
    while !cancel.is_cancelled() {
        ctl.refresh_output()?;
        ctl.refresh_ramp_status()?;
        if let Some(snap) = feed.latest() {
            print_tick(&snap, json);
        }
        ticks += 1;
        if count.is_some_and(|n| ticks >= n) {
            break;
        }
        std::thread::sleep(Duration::from_millis(interval_ms));
    }
    cancel.reset();
    Ok(())
}

fn print_tick(snap: &Snapshot, json: bool) {
    let state = &snap.state;
    if json {
        let line = json!({
            "command": "watch",
            "time": state.output().map(|o| o.timestamp.to_string()),
            "field_t": state.output().map(|o| o.value.field),
            "voltage_v": state.output().map(|o| o.value.voltage),
            "ramp": ramp_text(state),
            "heater": heater_text(state),
        });
        println!("{line}");
    } else if let Some(o) = state.output() {
        println!(
            "{}  {:>8.4} T  {:>7.3} V  {}  heater {}",
            o.timestamp,
            o.value.field,
            o.value.voltage,
            ramp_text(state),
            heater_text(state)
        );
    }
}

#[derive(Serialize)]
struct CsvRow {
    time: String,
    field_t: f64,
    voltage_v: f64,
}

/// Export the record as `time,field_t,voltage_v`.
pub fn write_csv(path: &Path, samples: &[Sample]) -> eyre::Result<()> {
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .wrap_err_with(|| format!("create record file {}", path.display()))?;
    w.write_record(["time", "field_t", "voltage_v"])?;
    for s in samples {
        w.serialize(CsvRow {
            time: s.timestamp.to_string(),
            field_t: s.value.field,
            voltage_v: s.value.voltage,
        })?;
    }
    w.flush()?;
    tracing::info!(path = %path.display(), rows = samples.len(), "record written");
    Ok(())
}
