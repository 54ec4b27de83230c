//! Diagnostic log of raw supply exchanges.
//!
//! Every command, reply, retry and refusal is appended as one text line.
//! Lines stay in memory for the session and can be mirrored to a `Logger`.

use chrono::Local;

pub trait Logger {
    fn log(&self, message: &str);
}

pub struct FileLogger {
    path: String,
}

impl FileLogger {
    pub fn new(path: String) -> Self {
        Self { path }
    }
}

impl Logger for FileLogger {
    fn log(&self, message: &str) {
        use std::fs::OpenOptions;
        use std::io::Write;
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{message}"));
        if let Err(e) = written {
            tracing::warn!(path = %self.path, error = %e, "exchange log mirror write failed");
        }
    }
}

#[derive(Default)]
pub struct ExchangeLog {
    lines: Vec<String>,
    sink: Option<Box<dyn Logger + Send>>,
}

impl std::fmt::Debug for ExchangeLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeLog")
            .field("lines", &self.lines.len())
            .field("mirrored", &self.sink.is_some())
            .finish()
    }
}

impl ExchangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: Box<dyn Logger + Send>) -> Self {
        Self {
            lines: Vec::new(),
            sink: Some(sink),
        }
    }

    pub fn command(&mut self, command: &str) {
        self.push(">>", command);
    }

    pub fn reply(&mut self, reply: &str) {
        self.push("<<", reply);
    }

    /// Free-form diagnostic entry (retry, refusal, health flag).
    pub fn note(&mut self, text: &str) {
        self.push("--", text);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    fn push(&mut self, marker: &str, text: &str) {
        let line = format!("{} {marker} {text}", Local::now().format("%H:%M:%S%.3f"));
        if let Some(sink) = &self.sink {
            sink.log(&line);
        }
        self.lines.push(line);
    }
}
