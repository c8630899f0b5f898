//! # Tick Scheduling
//!
//! One repeating task per online actor, plus the per-actor tick counters
//! that drive the bob and spin animation.
//!
//! ```text
//!   start(actor) ──► TaskScheduler::run_repeating ──► task body
//!                                                       │
//!                      counters[actor] ◄── advance ─────┤
//!                                                       ▼
//!                                             routine(actor, tick)
//! ```
//!
//! The host scheduler owns the timing. [`TickDriver`] is the built-in one.

mod clock;
mod driver;

pub use clock::{TickClock, TickStats};
pub use driver::{DriverHandle, TickDriver};

use std::collections::HashMap;
use std::sync::Arc;

use companion_shared::ActorId;
use parking_lot::Mutex;

use crate::integration::traits::{TaskHandle, TaskScheduler};

// ============================================================================
// TICK COUNTERS
// ============================================================================

/// Per-actor animation tick counters.
///
/// An entry exists exactly while the actor's task is registered. Every
/// entry carries the generation of the task that owns it; advancing never
/// creates an entry and only touches the entry of the same generation, so
/// an invocation still running after its task was stopped or replaced
/// cannot bring the counter back or move the new task's counter.
#[derive(Debug, Default)]
pub struct TickCounters {
    table: Mutex<CounterTable>,
}

#[derive(Debug, Default)]
struct CounterTable {
    next_generation: u64,
    entries: HashMap<ActorId, CounterEntry>,
}

#[derive(Clone, Copy, Debug)]
struct CounterEntry {
    generation: u64,
    tick: u64,
}

impl TickCounters {
    /// Current tick of an actor, if tracked.
    #[must_use]
    pub fn current(&self, actor: ActorId) -> Option<u64> {
        self.table.lock().entries.get(&actor).map(|entry| entry.tick)
    }

    fn current_for(&self, actor: ActorId, generation: u64) -> Option<u64> {
        self.table
            .lock()
            .entries
            .get(&actor)
            .filter(|entry| entry.generation == generation)
            .map(|entry| entry.tick)
    }

    /// Starts the actor's counter at 0 and returns its generation.
    fn reset(&self, actor: ActorId) -> u64 {
        let mut table = self.table.lock();
        table.next_generation = table.next_generation.wrapping_add(1);
        let generation = table.next_generation;
        table.entries.insert(actor, CounterEntry { generation, tick: 0 });
        generation
    }

    fn advance(&self, actor: ActorId, generation: u64) {
        if let Some(entry) = self.table.lock().entries.get_mut(&actor) {
            if entry.generation == generation {
                entry.tick = entry.tick.wrapping_add(1);
            }
        }
    }

    fn remove(&self, actor: ActorId) {
        self.table.lock().entries.remove(&actor);
    }

    fn clear(&self) {
        self.table.lock().entries.clear();
    }
}

/// When a task first runs and how often it repeats, in host ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    /// Ticks before the first run.
    pub initial_delay: u32,
    /// Ticks between runs.
    pub period: u32,
}

/// The per-actor work run on every task invocation.
pub type TickRoutine = Arc<dyn Fn(ActorId, u64) + Send + Sync>;

// ============================================================================
// TICK SCHEDULER
// ============================================================================

/// Registry of per-actor repeating tasks.
pub struct TickScheduler {
    scheduler: Arc<dyn TaskScheduler>,
    tasks: Mutex<HashMap<ActorId, Box<dyn TaskHandle>>>,
    counters: Arc<TickCounters>,
    routine: TickRoutine,
}

impl TickScheduler {
    /// Creates a scheduler that runs `routine(actor, tick)` on every
    /// invocation of an actor's task.
    pub fn new(scheduler: Arc<dyn TaskScheduler>, routine: TickRoutine) -> Self {
        Self {
            scheduler,
            tasks: Mutex::new(HashMap::new()),
            counters: Arc::new(TickCounters::default()),
            routine,
        }
    }

    /// Starts the actor's task, replacing any task already running.
    ///
    /// The tick counter restarts at 0.
    pub fn start(&self, actor: ActorId, cadence: Cadence) {
        let mut tasks = self.tasks.lock();
        self.start_locked(&mut tasks, actor, cadence);
    }

    /// Cancels the actor's task and drops their counter.
    ///
    /// Returns true if a task was running.
    pub fn stop(&self, actor: ActorId) -> bool {
        let removed = self.tasks.lock().remove(&actor);
        self.counters.remove(actor);
        match removed {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every task and starts a fresh one for each actor in `actors`.
    pub fn restart_all(&self, actors: &[ActorId], cadence: Cadence) {
        let mut tasks = self.tasks.lock();
        for (_, handle) in tasks.drain() {
            handle.cancel();
        }
        self.counters.clear();
        for &actor in actors {
            self.start_locked(&mut tasks, actor, cadence);
        }
    }

    /// Cancels every task. Returns how many were running.
    pub fn stop_all(&self) -> usize {
        let mut tasks = self.tasks.lock();
        let count = tasks.len();
        for (_, handle) in tasks.drain() {
            handle.cancel();
        }
        self.counters.clear();
        count
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether the actor has a live task.
    #[must_use]
    pub fn is_running(&self, actor: ActorId) -> bool {
        self.tasks
            .lock()
            .get(&actor)
            .is_some_and(|handle| !handle.is_cancelled())
    }

    /// The actor's current animation tick.
    #[must_use]
    pub fn tick_of(&self, actor: ActorId) -> Option<u64> {
        self.counters.current(actor)
    }

    fn start_locked(
        &self,
        tasks: &mut HashMap<ActorId, Box<dyn TaskHandle>>,
        actor: ActorId,
        cadence: Cadence,
    ) {
        if let Some(previous) = tasks.remove(&actor) {
            previous.cancel();
        }
        let generation = self.counters.reset(actor);

        let counters = Arc::clone(&self.counters);
        let routine = Arc::clone(&self.routine);
        let handle = self.scheduler.run_repeating(
            actor,
            cadence.initial_delay,
            cadence.period,
            Box::new(move || {
                let Some(tick) = counters.current_for(actor, generation) else {
                    return;
                };
                routine(actor, tick);
                counters.advance(actor, generation);
            }),
        );
        tasks.insert(actor, handle);
    }
}
