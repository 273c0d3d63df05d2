//! Epoch bucketing of wall-clock time.
//!
//! [`EpochClock`] is the pure mapping from unix seconds to 1-indexed epochs.
//! [`EpochSource`] is the seam components read the current epoch through:
//! production uses [`SystemEpochSource`] (wall clock), tests drive epochs by
//! hand with [`ManualEpochSource`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{EPOCH_WIDTH_SECS, FIRST_EPOCH};
use crate::types::Epoch;

/// Pure map from unix time to epoch number.
///
/// `epoch_of(t) = (t - origin) / width + 1`; the origin is fixed at system
/// creation and times before it clamp to the first epoch.
///
/// # Examples
///
/// ```
/// use ebb_core::clock::EpochClock;
/// let clock = EpochClock::new(1_000, 100);
/// assert_eq!(clock.epoch_of(1_000), 1);
/// assert_eq!(clock.epoch_of(1_099), 1);
/// assert_eq!(clock.epoch_of(1_100), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochClock {
    origin_secs: u64,
    width_secs: u64,
}

impl EpochClock {
    /// Create a clock with the given origin and epoch width, both in seconds.
    pub fn new(origin_secs: u64, width_secs: u64) -> Self {
        debug_assert!(width_secs > 0);
        Self { origin_secs, width_secs }
    }

    /// Clock with the protocol's one-week epoch width.
    pub fn weekly(origin_secs: u64) -> Self {
        Self::new(origin_secs, EPOCH_WIDTH_SECS)
    }

    /// Epoch containing the given unix time.
    pub fn epoch_of(&self, unix_secs: u64) -> Epoch {
        unix_secs.saturating_sub(self.origin_secs) / self.width_secs + FIRST_EPOCH
    }

    /// Unix time at which the given epoch begins.
    pub fn epoch_start(&self, epoch: Epoch) -> u64 {
        self.origin_secs + (epoch.saturating_sub(FIRST_EPOCH)) * self.width_secs
    }
}

/// Source of the current epoch.
///
/// The ledger and governance never read the wall clock directly; they ask an
/// `EpochSource` so tests can run entire lifecycles in virtual time.
pub trait EpochSource: Send + Sync {
    fn current_epoch(&self) -> Epoch;
}

/// Wall-clock backed epoch source.
#[derive(Debug, Clone, Copy)]
pub struct SystemEpochSource {
    clock: EpochClock,
}

impl SystemEpochSource {
    pub fn new(clock: EpochClock) -> Self {
        Self { clock }
    }
}

impl EpochSource for SystemEpochSource {
    fn current_epoch(&self) -> Epoch {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        self.clock.epoch_of(now)
    }
}

/// Hand-driven epoch source for tests and simulations.
///
/// Epochs only move when [`set`](Self::set) or [`advance`](Self::advance) is
/// called, so a test controls exactly which epoch every operation sees.
#[derive(Debug)]
pub struct ManualEpochSource {
    epoch: AtomicU64,
}

impl ManualEpochSource {
    pub fn new(epoch: Epoch) -> Self {
        Self { epoch: AtomicU64::new(epoch) }
    }

    pub fn set(&self, epoch: Epoch) {
        self.epoch.store(epoch, Ordering::SeqCst);
    }

    pub fn advance(&self, epochs: u64) {
        self.epoch.fetch_add(epochs, Ordering::SeqCst);
    }
}

impl EpochSource for ManualEpochSource {
    fn current_epoch(&self) -> Epoch {
        self.epoch.load(Ordering::SeqCst)
    }
}
