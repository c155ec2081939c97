//! Bounded FIFO history of above-threshold observations.
//!
//! The ingestion loop is the only writer; the zone aggregator reads
//! point-in-time copies. `SharedRiskBuffer` is the handle both sides hold.
//! Append-with-eviction and snapshot each run under a single lock, so a
//! snapshot always reflects one buffer state and never a half-evicted one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::model::Observation;

/// Default number of observations retained.
pub const DEFAULT_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// RiskBuffer
// ---------------------------------------------------------------------------

/// Ring buffer of observations with a hard capacity.
///
/// Invariant: `len() <= capacity()`. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct RiskBuffer {
    entries: VecDeque<Observation>,
    capacity: usize,
}

impl RiskBuffer {
    /// Creates an empty buffer. A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Appends to the tail and returns the evicted head, if any.
    pub fn append(&mut self, observation: Observation) -> Option<Observation> {
        self.entries.push_back(observation);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Copies the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Observation> {
        self.entries.iter().copied().collect()
    }

    /// Most recently appended observation.
    pub fn latest(&self) -> Option<&Observation> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RiskBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Cloneable, thread-safe handle to one pipeline's risk buffer.
#[derive(Debug, Clone)]
pub struct SharedRiskBuffer {
    inner: Arc<Mutex<RiskBuffer>>,
}

impl SharedRiskBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: Arc::new(Mutex::new(RiskBuffer::with_capacity(capacity))) }
    }

    /// Poisoning only means another thread panicked mid-call; every mutation
    /// here is a single push/pop pair, so the contents are still coherent.
    fn lock(&self) -> MutexGuard<'_, RiskBuffer> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn append(&self, observation: Observation) -> Option<Observation> {
        let evicted = self.lock().append(observation);
        if evicted.is_some() {
            log::debug!(target: "buffer", "capacity reached, evicted oldest observation");
        }
        evicted
    }

    pub fn snapshot(&self) -> Vec<Observation> {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}

impl Default for SharedRiskBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
