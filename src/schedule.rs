//! Cadence ticks for the zone aggregator.
//!
//! The aggregator thread blocks in `Ticker::wait_tick` between runs. Every
//! ticker can be stopped from another thread through a `TickerStop`, which is
//! how a pipeline shuts its aggregator down without waiting out the interval.
//!
//! # Clock injection
//! `IntervalTicker` keeps a monotonic `Instant` deadline and waits out the
//! remainder with `recv_timeout`, so time spent inside a tick does not push
//! later ticks back.
//! `ManualTicker` fires only when its `TickDriver` says so, which keeps
//! pipeline tests free of real wall-clock delay.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// Default aggregation cadence.
pub const DEFAULT_CADENCE: Duration = Duration::from_secs(10);

enum Signal {
    Tick,
    Stop,
}

/// Source of aggregation ticks.
pub trait Ticker: Send {
    /// Blocks until the next tick. Returns `false` once the ticker is stopped.
    fn wait_tick(&mut self) -> bool;

    /// Handle that stops this ticker from any thread.
    fn stop_handle(&self) -> TickerStop;
}

/// Stops the ticker it was taken from. Stopping twice is harmless.
#[derive(Clone)]
pub struct TickerStop {
    tx: Sender<Signal>,
}

impl TickerStop {
    pub fn stop(&self) {
        // A closed channel means the ticker is already gone.
        let _ = self.tx.send(Signal::Stop);
    }
}

// ---------------------------------------------------------------------------
// Wall-clock ticker
// ---------------------------------------------------------------------------

/// Fires every `period` on a fixed schedule, independent of how fast
/// messages arrive. Ticks missed while the caller was busy are skipped, not
/// bunched up.
pub struct IntervalTicker {
    period: Duration,
    deadline: Instant,
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { period, deadline: Instant::now() + period, tx, rx }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Ticker for IntervalTicker {
    fn wait_tick(&mut self) -> bool {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Err(RecvTimeoutError::Timeout) | Ok(Signal::Tick) => {
                self.advance_deadline(Instant::now());
                true
            }
            Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn stop_handle(&self) -> TickerStop {
        TickerStop { tx: self.tx.clone() }
    }
}

impl IntervalTicker {
    fn advance_deadline(&mut self, now: Instant) {
        if self.period.is_zero() {
            self.deadline = now;
            return;
        }
        while self.deadline <= now {
            self.deadline += self.period;
        }
    }
}

// ---------------------------------------------------------------------------
// Manual ticker
// ---------------------------------------------------------------------------

/// Fires once per `TickDriver::tick` call.
pub struct ManualTicker {
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
}

/// Drives a `ManualTicker` from outside the aggregator thread.
#[derive(Clone)]
pub struct TickDriver {
    tx: Sender<Signal>,
}

impl ManualTicker {
    pub fn new() -> (Self, TickDriver) {
        let (tx, rx) = mpsc::channel();
        let driver = TickDriver { tx: tx.clone() };
        (Self { tx, rx }, driver)
    }
}

impl TickDriver {
    /// Queues one tick. Returns `false` if the ticker has been dropped.
    pub fn tick(&self) -> bool {
        self.tx.send(Signal::Tick).is_ok()
    }
}

impl Ticker for ManualTicker {
    fn wait_tick(&mut self) -> bool {
        matches!(self.rx.recv(), Ok(Signal::Tick))
    }

    fn stop_handle(&self) -> TickerStop {
        TickerStop { tx: self.tx.clone() }
    }
}
