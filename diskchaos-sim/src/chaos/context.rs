//! The services a chaos file consults on every operation.

use std::rc::Rc;

use diskchaos_core::{RandomProvider, TimeProvider};

use super::{ChaosMetrics, CorruptedBytes, StorageFaultConfig};

/// Explicit bundle of the process-wide services used by [`ChaosFile`](super::ChaosFile).
///
/// - no fault config: fault injection is globally off, nothing is delayed or corrupted
/// - a corruption tracker: the file runs under the simulation harness and
///   successful corrupted writes and truncations are recorded
#[derive(Clone)]
pub struct ChaosContext<T: TimeProvider, R: RandomProvider> {
    pub(crate) time: T,
    pub(crate) random: R,
    pub(crate) faults: Option<Rc<dyn StorageFaultConfig>>,
    pub(crate) metrics: ChaosMetrics,
    pub(crate) corrupted_bytes: Option<CorruptedBytes>,
}

impl<T: TimeProvider, R: RandomProvider> ChaosContext<T, R> {
    /// Context with no fault config and no corruption tracker.
    pub fn new(time: T, random: R, metrics: ChaosMetrics) -> Self {
        Self {
            time,
            random,
            faults: None,
            metrics,
            corrupted_bytes: None,
        }
    }

    /// Use `faults` as the fault config.
    pub fn with_faults(mut self, faults: Rc<dyn StorageFaultConfig>) -> Self {
        self.faults = Some(faults);
        self
    }

    /// Record corruption in `tracker`.
    pub fn with_corrupted_bytes(mut self, tracker: CorruptedBytes) -> Self {
        self.corrupted_bytes = Some(tracker);
        self
    }

    /// Time provider used for delays.
    pub fn time(&self) -> &T {
        &self.time
    }

    /// Random provider used for corruption decisions.
    pub fn random(&self) -> &R {
        &self.random
    }

    /// Fault config, if fault injection is active.
    pub fn faults(&self) -> Option<&Rc<dyn StorageFaultConfig>> {
        self.faults.as_ref()
    }

    /// Chaos counters.
    pub fn metrics(&self) -> &ChaosMetrics {
        &self.metrics
    }

    /// Corruption tracker, present only under simulation.
    pub fn corrupted_bytes(&self) -> Option<&CorruptedBytes> {
        self.corrupted_bytes.as_ref()
    }
}

impl<T: TimeProvider + std::fmt::Debug, R: RandomProvider + std::fmt::Debug> std::fmt::Debug
    for ChaosContext<T, R>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaosContext")
            .field("time", &self.time)
            .field("random", &self.random)
            .field("faults", &self.faults.is_some())
            .field("metrics", &self.metrics)
            .field("corrupted_bytes", &self.corrupted_bytes)
            .finish()
    }
}
