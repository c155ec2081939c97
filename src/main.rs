//! `riskzone` daemon.
//!
//! Reads newline-delimited JSON readings from stdin onto the readings topic,
//! runs one aggregation pipeline, and writes every published zone to stdout
//! (and to the HTTP bridge when one is configured). EOF on stdin shuts the
//! pipeline down cleanly.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use log::LevelFilter;

use riskzone_service::config::ServiceConfig;
use riskzone_service::logging;
use riskzone_service::model::ZoneError;
use riskzone_service::pipeline::{self, PipelineSettings};
use riskzone_service::schedule::IntervalTicker;
use riskzone_service::scoring::auxiliary::{AuxiliarySampler, RandomSampler};
use riskzone_service::transport::http::HttpBridge;
use riskzone_service::transport::{Broker, LocalBroker, Subscription};

#[derive(Debug, Parser)]
#[command(name = "riskzone", about = "Aggregate risky readings into danger zones")]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the auxiliary factor sampler (overrides config).
    #[arg(long)]
    seed: Option<u64>,

    /// Forward zone messages to this HTTP publish endpoint (overrides config).
    #[arg(long)]
    publish_url: Option<String>,

    /// Append log entries to this file (overrides config).
    #[arg(long)]
    log_file: Option<String>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<ServiceConfig, ZoneError> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    config.apply_env_overrides()?;

    if let Some(seed) = cli.seed {
        config.sampler.seed = Some(seed);
    }
    if let Some(url) = &cli.publish_url {
        config.bridge.publish_url = Some(url.clone());
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

/// Echoes zone messages to stdout and forwards them through the bridge.
fn relay_zones(subscription: Subscription, bridge: Option<HttpBridge>) {
    let topic = subscription.topic().to_string();
    for payload in subscription.iter() {
        let mut stdout = io::stdout().lock();
        if stdout.write_all(&payload).and_then(|_| stdout.write_all(b"\n")).is_err() {
            log::warn!(target: "publisher", "stdout closed; zone not echoed");
        }
        drop(stdout);

        if let Some(bridge) = &bridge {
            if let Err(err) = bridge.forward(&topic, &payload) {
                log::error!(target: "transport", "bridge forward to {} failed: {}", bridge.base_url(), err);
            }
        }
    }
}

fn run(config: ServiceConfig) -> Result<(), ZoneError> {
    let broker = Arc::new(LocalBroker::new());

    let bridge = match &config.bridge.publish_url {
        Some(url) => Some(HttpBridge::new(url, config.bridge_timeout())?),
        None => None,
    };
    let zones = broker.subscribe(&config.topics.zone)?;
    let relay = thread::spawn(move || relay_zones(zones, bridge));

    let sampler: Box<dyn AuxiliarySampler> = match config.sampler.seed {
        Some(seed) => Box::new(RandomSampler::seeded(seed)),
        None => Box::new(RandomSampler::from_entropy()),
    };
    let ticker = Box::new(IntervalTicker::new(config.cadence()));
    let handle = pipeline::start(&PipelineSettings::from_config(&config), broker.clone(), sampler, ticker)?;

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!(target: "transport", "stdin read failed: {}", err);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        broker.publish(&config.topics.readings, line.as_bytes())?;
    }

    let counts = handle.counts();
    let remaining = handle.stop();
    broker.shutdown();
    if relay.join().is_err() {
        log::error!(target: "system", "zone relay thread panicked");
    }

    log::info!(
        target: "system",
        "input closed: {} readings, {} buffered, {} rejected; {} observations held at exit",
        counts.received,
        counts.buffered,
        counts.rejected,
        remaining.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("riskzone: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let level = logging::parse_level(&config.logging.level).unwrap_or(LevelFilter::Info);
    if let Err(err) = logging::init_logger(level, config.logging.file.as_deref(), config.logging.timestamps) {
        eprintln!("riskzone: logger init failed: {}", err);
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!(target: "system", "fatal: {}", err);
            ExitCode::FAILURE
        }
    }
}
