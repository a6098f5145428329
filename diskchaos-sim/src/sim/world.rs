//! Core simulation world and coordination logic.
//!
//! [`SimWorld`] owns logical time, the event queue and the process-wide chaos
//! services of one simulation run: the seeded RNG, the storage fault
//! injector, the chaos metrics and the corrupted-bytes tracker. Creating a new
//! world starts a fresh run; dropping it tears every service down with it.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::{Rc, Weak},
    task::Waker,
    time::Duration,
};
use tracing::instrument;

use diskchaos_core::{SimulationError, SimulationResult};

use super::{
    events::{Event, EventQueue, ScheduledEvent},
    sleep::SleepFuture,
};
use crate::{
    chaos::{
        ChaosConfiguration, ChaosContext, ChaosMetrics, CorruptedBytes, StorageFaultConfig,
        StorageFaultInjector,
    },
    providers::{SimRandomProvider, SimTimeProvider},
    storage::{ChaosStorageProvider, MemoryStorageProvider},
};

/// Fault injector type owned by every simulation world.
pub type SimFaultInjector = StorageFaultInjector<SimTimeProvider, SimRandomProvider>;

/// Internal simulation state holder
#[derive(Debug)]
pub(crate) struct SimInner {
    pub(crate) current_time: Duration,
    pub(crate) event_queue: EventQueue,
    pub(crate) next_sequence: u64,

    // Task management for sleep functionality
    pub(crate) next_task_id: u64,
    pub(crate) awakened_tasks: HashSet<u64>,
    pub(crate) task_wakers: HashMap<u64, Waker>,

    pub(crate) events_processed: u64,

    // Process-wide chaos services for this run
    pub(crate) random: SimRandomProvider,
    pub(crate) faults: Rc<SimFaultInjector>,
    pub(crate) chaos_config: ChaosConfiguration,
    pub(crate) metrics: ChaosMetrics,
    pub(crate) corrupted_bytes: CorruptedBytes,
    pub(crate) storage: MemoryStorageProvider,
}

/// The central simulation coordinator that manages time and event processing.
///
/// Handle-based: clones of the inner `Rc` are handed out through
/// [`WeakSimWorld`] so providers never keep a finished simulation alive.
#[derive(Debug)]
pub struct SimWorld {
    pub(crate) inner: Rc<RefCell<SimInner>>,
}

impl SimWorld {
    fn create(config: ChaosConfiguration, seed: u64) -> Self {
        let random = SimRandomProvider::new(seed);

        let inner = Rc::new_cyclic(|weak: &Weak<RefCell<SimInner>>| {
            let time = SimTimeProvider::new(WeakSimWorld {
                inner: weak.clone(),
            });
            let faults = Rc::new(StorageFaultInjector::new(time, random.clone()));
            RefCell::new(SimInner {
                current_time: Duration::ZERO,
                event_queue: EventQueue::new(),
                next_sequence: 0,
                next_task_id: 0,
                awakened_tasks: HashSet::new(),
                task_wakers: HashMap::new(),
                events_processed: 0,
                random,
                faults,
                chaos_config: ChaosConfiguration::disabled(),
                metrics: ChaosMetrics::new(Duration::ZERO),
                corrupted_bytes: CorruptedBytes::new(),
                storage: MemoryStorageProvider::new(),
            })
        });

        let sim = Self { inner };
        sim.set_chaos_config(config);
        tracing::debug!(seed, "simulation world created");
        sim
    }

    /// Creates a new simulation world with seed 0 and chaos disabled.
    pub fn new() -> Self {
        Self::create(ChaosConfiguration::disabled(), 0)
    }

    /// Creates a new simulation world with a specific seed and chaos disabled.
    pub fn new_with_seed(seed: u64) -> Self {
        Self::create(ChaosConfiguration::disabled(), seed)
    }

    /// Creates a new simulation world with a chaos configuration and seed.
    pub fn new_with_chaos_config(config: ChaosConfiguration, seed: u64) -> Self {
        Self::create(config, seed)
    }

    /// Processes the next scheduled event and advances time.
    ///
    /// Returns `true` if more events are available for processing.
    #[instrument(skip(self))]
    pub fn step(&mut self) -> bool {
        let mut inner = self.inner.borrow_mut();

        if let Some(scheduled_event) = inner.event_queue.pop_earliest() {
            inner.current_time = scheduled_event.time();
            Self::process_event_with_inner(&mut inner, scheduled_event.into_event());
            !inner.event_queue.is_empty()
        } else {
            false
        }
    }

    /// Processes all scheduled events until the queue is empty.
    #[instrument(skip(self))]
    pub fn run_until_empty(&mut self) {
        while self.step() {}
    }

    /// Returns the exact simulation time (equivalent to FDB's now()).
    pub fn now(&self) -> Duration {
        self.inner.borrow().current_time
    }

    /// Schedules an event to execute after the specified delay from the current time.
    ///
    /// A delay past the end of representable time schedules at `Duration::MAX`.
    pub fn schedule_event(&self, event: Event, delay: Duration) {
        let mut inner = self.inner.borrow_mut();
        let scheduled_time = inner.current_time.saturating_add(delay);
        Self::schedule_with_inner(&mut inner, event, scheduled_time);
    }

    /// Schedules an event to execute at the specified absolute time.
    pub fn schedule_event_at(&self, event: Event, time: Duration) {
        let mut inner = self.inner.borrow_mut();
        Self::schedule_with_inner(&mut inner, event, time);
    }

    fn schedule_with_inner(inner: &mut SimInner, event: Event, time: Duration) {
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner
            .event_queue
            .schedule(ScheduledEvent::new(time, event, sequence));
    }

    /// Schedules a shutdown that wakes every sleeping task.
    pub fn shutdown(&self) {
        self.schedule_event(Event::Shutdown, Duration::ZERO);
    }

    /// Creates a weak reference to this simulation world.
    pub fn downgrade(&self) -> WeakSimWorld {
        WeakSimWorld {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns `true` if there are events waiting to be processed.
    pub fn has_pending_events(&self) -> bool {
        !self.inner.borrow().event_queue.is_empty()
    }

    /// Returns the number of events waiting to be processed.
    pub fn pending_event_count(&self) -> usize {
        self.inner.borrow().event_queue.len()
    }

    /// Returns the number of events processed so far.
    pub fn events_processed(&self) -> u64 {
        self.inner.borrow().events_processed
    }

    /// Sleep for the specified duration in simulation time.
    #[instrument(skip(self))]
    pub fn sleep(&self, duration: Duration) -> SleepFuture {
        let task_id = {
            let mut inner = self.inner.borrow_mut();
            let task_id = inner.next_task_id;
            inner.next_task_id += 1;
            task_id
        };
        self.schedule_event(Event::Timer { task_id }, duration);
        SleepFuture::new(self.downgrade(), task_id)
    }

    pub(crate) fn is_task_awake(&self, task_id: u64) -> bool {
        self.inner.borrow().awakened_tasks.contains(&task_id)
    }

    pub(crate) fn register_task_waker(&self, task_id: u64, waker: Waker) {
        self.inner.borrow_mut().task_wakers.insert(task_id, waker);
    }

    fn process_event_with_inner(inner: &mut SimInner, event: Event) {
        inner.events_processed += 1;

        match event {
            Event::Timer { task_id } => {
                inner.awakened_tasks.insert(task_id);
                if let Some(waker) = inner.task_wakers.remove(&task_id) {
                    waker.wake();
                }
            }
            Event::Shutdown => {
                tracing::debug!(
                    sleeping = inner.task_wakers.len(),
                    "shutdown: waking all sleeping tasks"
                );
                for (task_id, waker) in inner.task_wakers.drain() {
                    inner.awakened_tasks.insert(task_id);
                    waker.wake();
                }
            }
        }
    }

    /// Create a time provider for this simulation.
    pub fn time_provider(&self) -> SimTimeProvider {
        SimTimeProvider::new(self.downgrade())
    }

    /// The run's shared seeded random provider.
    pub fn random_provider(&self) -> SimRandomProvider {
        self.inner.borrow().random.clone()
    }

    /// The run's storage fault injector.
    pub fn fault_injector(&self) -> Rc<SimFaultInjector> {
        Rc::clone(&self.inner.borrow().faults)
    }

    /// The run's chaos metrics.
    pub fn metrics(&self) -> ChaosMetrics {
        self.inner.borrow().metrics.clone()
    }

    /// The run's corrupted-bytes tracker.
    pub fn corrupted_bytes(&self) -> CorruptedBytes {
        self.inner.borrow().corrupted_bytes.clone()
    }

    /// The chaos configuration currently applied.
    pub fn chaos_config(&self) -> ChaosConfiguration {
        self.inner.borrow().chaos_config.clone()
    }

    /// Apply a chaos configuration to this run's fault injector.
    ///
    /// Resets the injector first, so disk failure windows start from the
    /// current simulation time.
    pub fn set_chaos_config(&self, config: ChaosConfiguration) {
        self.fault_injector().apply(&config);
        tracing::debug!(
            enabled = config.enabled,
            bit_flip_percentage = config.bit_flip_percentage,
            disk_failure = config.disk_failure.is_some(),
            "chaos configuration applied"
        );
        self.inner.borrow_mut().chaos_config = config;
    }

    /// Build the chaos context for files opened inside this simulation.
    ///
    /// The context carries the fault injector and the corrupted-bytes
    /// tracker, which marks its files as running under simulation.
    pub fn chaos_context(&self) -> ChaosContext<SimTimeProvider, SimRandomProvider> {
        let faults: Rc<dyn StorageFaultConfig> = self.fault_injector();
        ChaosContext::new(self.time_provider(), self.random_provider(), self.metrics())
            .with_faults(faults)
            .with_corrupted_bytes(self.corrupted_bytes())
    }

    /// The in-memory storage backing this simulation.
    pub fn storage_provider(&self) -> MemoryStorageProvider {
        self.inner.borrow().storage.clone()
    }

    /// In-memory storage wrapped with chaos according to the current configuration.
    pub fn chaos_storage_provider(
        &self,
    ) -> ChaosStorageProvider<MemoryStorageProvider, SimTimeProvider, SimRandomProvider> {
        ChaosStorageProvider::new(
            self.storage_provider(),
            self.chaos_context(),
            self.chaos_config().enabled,
        )
    }

    /// Log the chaos metrics of this run.
    pub fn log_chaos_metrics(&self) {
        self.metrics().log(self.now());
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// A weak reference to a simulation world.
#[derive(Debug, Clone)]
pub struct WeakSimWorld {
    pub(crate) inner: Weak<RefCell<SimInner>>,
}

impl WeakSimWorld {
    /// Attempts to upgrade this weak reference to a strong reference.
    pub fn upgrade(&self) -> SimulationResult<SimWorld> {
        self.inner
            .upgrade()
            .map(|inner| SimWorld { inner })
            .ok_or(SimulationError::SimulationShutdown)
    }

    /// Returns the exact simulation time.
    pub fn now(&self) -> SimulationResult<Duration> {
        Ok(self.upgrade()?.now())
    }

    /// Schedules an event to execute after the specified delay.
    pub fn schedule_event(&self, event: Event, delay: Duration) -> SimulationResult<()> {
        self.upgrade()?.schedule_event(event, delay);
        Ok(())
    }

    /// Sleep for the specified duration in simulation time.
    pub fn sleep(&self, duration: Duration) -> SimulationResult<SleepFuture> {
        Ok(self.upgrade()?.sleep(duration))
    }
}
