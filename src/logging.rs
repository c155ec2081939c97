/// Structured logging for the risk zone service
///
/// Implements the `log` facade with component-tagged records, UTC
/// timestamps, and severity levels. Supports both console output
/// and file-based logging for daemon operations.

use chrono::Utc;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;

use crate::model::ZoneError;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Pipeline stage a record comes from. Used as the `log` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Ingest,
    Buffer,
    Aggregator,
    Publisher,
    Transport,
    System,
}

impl Component {
    pub fn target(&self) -> &'static str {
        match self {
            Component::Ingest => "ingest",
            Component::Buffer => "buffer",
            Component::Aggregator => "aggregator",
            Component::Publisher => "publisher",
            Component::Transport => "transport",
            Component::System => "system",
        }
    }

    pub fn from_target(target: &str) -> Self {
        match target {
            "ingest" => Component::Ingest,
            "buffer" => Component::Buffer,
            "aggregator" => Component::Aggregator,
            "publisher" => Component::Publisher,
            "transport" => Component::Transport,
            _ => Component::System,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Ingest => write!(f, "INGEST"),
            Component::Buffer => write!(f, "BUF"),
            Component::Aggregator => write!(f, "AGG"),
            Component::Publisher => write!(f, "PUB"),
            Component::Transport => write!(f, "MQ"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - a producer legitimately omitted or zeroed something
    Expected,
    /// Unexpected failure - producer is broken or the wire format changed
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify why an inbound reading was dropped
pub fn classify_ingest_failure(err: &ZoneError) -> FailureType {
    match err {
        // Not JSON, or wrong types: the producer is sending something else
        ZoneError::MalformedReading(_) => FailureType::Unexpected,
        // Nodes without a GPS fix publish without coordinates
        ZoneError::MissingField(_) => FailureType::Expected,
        // Out-of-range values may be sensor glitches or a bad producer
        ZoneError::InvalidReading { .. } => FailureType::Unknown,
        _ => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

pub struct Logger {
    /// Minimum log level to display
    min_level: LevelFilter,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    pub fn new(min_level: LevelFilter, log_file: Option<String>, console_timestamps: bool) -> Self {
        Self { min_level, log_file, console_timestamps }
    }

    /// Full log line as written to the log file.
    pub fn format_entry(level: Level, component: Component, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        format!("{} {:<5} {}: {}", timestamp, level, component, message)
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.min_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();
        let component = Component::from_target(record.target());
        let message = record.args().to_string();
        let log_entry = Self::format_entry(level, component, &message);

        // Console output
        if self.console_timestamps {
            match level {
                Level::Error => eprintln!("{}", log_entry),
                Level::Warn => eprintln!("   {}", log_entry),
                Level::Info => println!("   {}", log_entry),
                Level::Debug | Level::Trace => println!("   [DEBUG] {}", log_entry),
            }
        } else {
            match level {
                Level::Error => eprintln!("   ✗ {}: {}", component, message),
                Level::Warn => eprintln!("   ⚠ {}: {}", component, message),
                Level::Info => println!("   {}", message),
                Level::Debug | Level::Trace => println!("   [DEBUG] {}: {}", component, message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn flush(&self) {}
}

/// Install the service logger as the global `log` backend
///
/// Fails if a logger was already installed (e.g. called twice).
pub fn init_logger(
    min_level: LevelFilter,
    log_file: Option<&str>,
    console_timestamps: bool,
) -> Result<(), log::SetLoggerError> {
    let logger = Logger::new(min_level, log_file.map(String::from), console_timestamps);
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(min_level);
    Ok(())
}

/// Parse a level name from config ("debug", "info", "warn", ...)
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a dropped reading with automatic classification
pub fn log_ingest_failure(err: &ZoneError) {
    let failure_type = classify_ingest_failure(err);
    let target = Component::Ingest.target();

    match failure_type {
        FailureType::Expected => log::debug!(target: target, "reading dropped [{}]: {}", failure_type, err),
        FailureType::Unexpected => log::error!(target: target, "reading dropped [{}]: {}", failure_type, err),
        FailureType::Unknown => log::warn!(target: target, "reading dropped [{}]: {}", failure_type, err),
    }
}

// ---------------------------------------------------------------------------
// Tick Summary Logging
// ---------------------------------------------------------------------------

/// Severity of a tick summary, from ingestion counters so far
pub fn tick_summary_level(received: u64, rejected: u64) -> Level {
    if rejected == 0 {
        Level::Info
    } else if rejected == received {
        Level::Error
    } else {
        Level::Warn
    }
}

/// Log a summary of ingestion progress at each aggregation tick
pub fn log_tick_summary(received: u64, rejected: u64, buffered: usize) {
    let level = tick_summary_level(received, rejected);
    log::log!(
        target: Component::Aggregator.target(),
        level,
        "Tick: {} readings received, {} rejected, {} observations buffered",
        received,
        rejected,
        buffered
    );
}
