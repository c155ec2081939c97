/// Service configuration.
///
/// Loaded from a TOML file (conventionally `riskzone.toml`), then overridden
/// by `RISKZONE_*` environment variables (a `.env` file is honoured by the
/// binary). Every key has a default, so an empty file or no file at all
/// yields a runnable configuration:
///
/// ```toml
/// [topics]
/// readings = "sensors/data"
/// zone = "risk/zone"
///
/// [risk]
/// threshold = 0.2
/// buffer_capacity = 100
/// cadence_secs = 10
///
/// [sampler]
/// seed = 42
///
/// [logging]
/// level = "info"
/// file = "riskzone.log"
/// timestamps = true
///
/// [bridge]
/// publish_url = "http://localhost:8080/publish"
/// timeout_secs = 5
/// ```

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::buffer::DEFAULT_CAPACITY;
use crate::logging;
use crate::model::ZoneError;
use crate::scoring::DEFAULT_ALERT_THRESHOLD;
use crate::transport::http::DEFAULT_TIMEOUT_SECS;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    /// Inbound raw readings.
    pub readings: String,
    /// Outbound danger zones.
    pub zone: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            readings: "sensors/data".to_string(),
            zone: "risk/zone".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Readings must score strictly above this to be buffered.
    pub threshold: f64,
    pub buffer_capacity: usize,
    pub cadence_secs: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_ALERT_THRESHOLD,
            buffer_capacity: DEFAULT_CAPACITY,
            cadence_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Fixed seed for the auxiliary factor sampler. Entropy-seeded if absent.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None, timestamps: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// HTTP endpoint zone messages are forwarded to, if any.
    pub publish_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { publish_url: None, timeout_secs: DEFAULT_TIMEOUT_SECS }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub topics: TopicsConfig,
    pub risk: RiskConfig,
    pub sampler: SamplerConfig,
    pub logging: LoggingConfig,
    pub bridge: BridgeConfig,
}

impl ServiceConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ZoneError> {
        toml::from_str(content).map_err(|e| ZoneError::Config(e.to_string()))
    }

    /// Reads and parses a config file. Does not apply overrides or validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ZoneError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ZoneError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Applies `RISKZONE_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ZoneError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup. Unset keys keep the
    /// file value; set but unparseable keys are an error.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ZoneError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RISKZONE_READINGS_TOPIC") {
            self.topics.readings = v;
        }
        if let Some(v) = lookup("RISKZONE_ZONE_TOPIC") {
            self.topics.zone = v;
        }
        if let Some(v) = lookup("RISKZONE_THRESHOLD") {
            self.risk.threshold = parse_override("RISKZONE_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("RISKZONE_CADENCE_SECS") {
            self.risk.cadence_secs = parse_override("RISKZONE_CADENCE_SECS", &v)?;
        }
        if let Some(v) = lookup("RISKZONE_SEED") {
            self.sampler.seed = Some(parse_override("RISKZONE_SEED", &v)?);
        }
        if let Some(v) = lookup("RISKZONE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("RISKZONE_PUBLISH_URL") {
            self.bridge.publish_url = if v.trim().is_empty() { None } else { Some(v) };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ZoneError> {
        if !(0.0..1.0).contains(&self.risk.threshold) {
            return Err(ZoneError::Config(format!(
                "risk.threshold must be in [0, 1), got {}",
                self.risk.threshold
            )));
        }
        if self.risk.buffer_capacity == 0 {
            return Err(ZoneError::Config("risk.buffer_capacity must be positive".to_string()));
        }
        if self.risk.cadence_secs == 0 {
            return Err(ZoneError::Config("risk.cadence_secs must be positive".to_string()));
        }
        if self.topics.readings.trim().is_empty() || self.topics.zone.trim().is_empty() {
            return Err(ZoneError::Config("topics must not be empty".to_string()));
        }
        if self.topics.readings == self.topics.zone {
            return Err(ZoneError::Config(format!(
                "readings and zone topics must differ, both are '{}'",
                self.topics.readings
            )));
        }
        if logging::parse_level(&self.logging.level).is_none() {
            return Err(ZoneError::Config(format!("unknown log level '{}'", self.logging.level)));
        }
        Ok(())
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.risk.cadence_secs)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge.timeout_secs)
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ZoneError> {
    value
        .trim()
        .parse()
        .map_err(|_| ZoneError::Config(format!("{} has invalid value '{}'", key, value)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
