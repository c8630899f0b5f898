//! # Tick Driver
//!
//! A [`TaskScheduler`] for hosts that do not bring their own. Tests call
//! [`TickDriver::advance`] by hand; servers run it on a paced thread with
//! [`TickDriver::spawn`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use companion_shared::ActorId;
use parking_lot::Mutex;

use super::clock::{TickClock, TickStats};
use crate::integration::traits::{RepeatingTask, TaskHandle, TaskScheduler};

struct Registration {
    actor: ActorId,
    registered_at: u64,
    initial_delay: u64,
    period: u64,
    cancelled: Arc<AtomicBool>,
    task: Mutex<RepeatingTask>,
}

impl Registration {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn is_due(&self, now: u64) -> bool {
        let elapsed = now.saturating_sub(self.registered_at);
        elapsed >= self.initial_delay.max(1)
            && (elapsed - self.initial_delay.max(1)) % self.period == 0
    }
}

struct DriverTaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle for DriverTaskHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Tick-counting scheduler.
#[derive(Default)]
pub struct TickDriver {
    tick: AtomicU64,
    tasks: Mutex<Vec<Arc<Registration>>>,
}

impl TickDriver {
    /// Creates a driver at tick 0 with no tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one tick: every live task that is due is invoked once.
    ///
    /// Returns the number of invocations. Tasks run outside the task-list
    /// lock, so they may register or cancel tasks themselves.
    pub fn advance(&self) -> usize {
        let now = self.tick.fetch_add(1, Ordering::AcqRel) + 1;

        let due: Vec<Arc<Registration>> = {
            let mut tasks = self.tasks.lock();
            tasks.retain(|r| !r.is_cancelled());
            tasks.iter().filter(|r| r.is_due(now)).cloned().collect()
        };

        let mut invoked = 0;
        for registration in due {
            // Cancelled by an earlier task this tick
            if registration.is_cancelled() {
                continue;
            }
            let mut task = registration.task.lock();
            (*task)();
            invoked += 1;
        }
        invoked
    }

    /// Runs `ticks` ticks back to back.
    pub fn advance_by(&self, ticks: u32) {
        for _ in 0..ticks {
            self.advance();
        }
    }

    /// Ticks run so far.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Live (not cancelled) tasks registered for `actor`.
    #[must_use]
    pub fn live_tasks_for(&self, actor: ActorId) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|r| r.actor == actor && !r.is_cancelled())
            .count()
    }

    /// Live tasks across all actors.
    #[must_use]
    pub fn live_tasks(&self) -> usize {
        self.tasks.lock().iter().filter(|r| !r.is_cancelled()).count()
    }

    /// Runs the driver on its own thread at `tick_rate` ticks per second.
    #[must_use]
    pub fn spawn(self: Arc<Self>, tick_rate: u32) -> DriverHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);

        let handle = thread::spawn(move || {
            let mut clock = TickClock::new(tick_rate);
            while !thread_shutdown.load(Ordering::Acquire) {
                while clock.should_tick() {
                    let start = clock.begin_tick();
                    self.advance();
                    clock.end_tick(start);
                }
                clock.wait_for_next_tick();
            }
            *clock.stats()
        });

        tracing::info!("tick driver started at {} Hz", tick_rate);
        DriverHandle {
            shutdown,
            handle: Some(handle),
        }
    }
}

impl TaskScheduler for TickDriver {
    fn run_repeating(
        &self,
        actor: ActorId,
        initial_delay: u32,
        period: u32,
        task: RepeatingTask,
    ) -> Box<dyn TaskHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.tasks.lock().push(Arc::new(Registration {
            actor,
            registered_at: self.current_tick(),
            initial_delay: u64::from(initial_delay),
            period: u64::from(period.max(1)),
            cancelled: Arc::clone(&cancelled),
            task: Mutex::new(task),
        }));
        Box::new(DriverTaskHandle { cancelled })
    }
}

/// Handle to a driver thread. Dropping it stops and joins the thread.
pub struct DriverHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<TickStats>>,
}

impl DriverHandle {
    /// Stops the thread and returns its timing statistics.
    #[must_use]
    pub fn stop(mut self) -> Option<TickStats> {
        self.join()
    }

    fn join(&mut self) -> Option<TickStats> {
        self.shutdown.store(true, Ordering::Release);
        self.handle.take().and_then(|h| h.join().ok())
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        let _ = self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_task(counter: &Arc<AtomicUsize>) -> RepeatingTask {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_every_tick_after_delay() {
        let driver = TickDriver::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let _handle = driver.run_repeating(ActorId(1), 1, 1, counting_task(&runs));

        driver.advance();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        driver.advance_by(4);
        assert_eq!(runs.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_delay_and_period() {
        let driver = TickDriver::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let _handle = driver.run_repeating(ActorId(1), 3, 2, counting_task(&runs));

        driver.advance_by(2);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        driver.advance(); // tick 3
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        driver.advance(); // tick 4
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        driver.advance(); // tick 5
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_stops_invocations() {
        let driver = TickDriver::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = driver.run_repeating(ActorId(1), 1, 1, counting_task(&runs));

        driver.advance();
        handle.cancel();
        assert!(handle.is_cancelled());
        driver.advance_by(3);

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(driver.live_tasks(), 0);
    }

    #[test]
    fn test_cancel_from_inside_a_task_finishes_the_invocation() {
        let driver = Arc::new(TickDriver::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Box<dyn TaskHandle>>>> = Arc::new(Mutex::new(None));

        let task_runs = Arc::clone(&runs);
        let task_slot = Arc::clone(&slot);
        let handle = driver.run_repeating(
            ActorId(1),
            1,
            1,
            Box::new(move || {
                if let Some(handle) = task_slot.lock().as_ref() {
                    handle.cancel();
                }
                task_runs.fetch_add(1, Ordering::SeqCst);
            }),
        );
        *slot.lock() = Some(handle);

        driver.advance_by(3);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tasks_are_independent() {
        let driver = TickDriver::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let handle_a = driver.run_repeating(ActorId(1), 1, 1, counting_task(&a));
        let _handle_b = driver.run_repeating(ActorId(2), 1, 1, counting_task(&b));

        driver.advance();
        handle_a.cancel();
        driver.advance_by(2);

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 3);
        assert_eq!(driver.live_tasks_for(ActorId(2)), 1);
    }

    #[test]
    fn test_spawned_driver_ticks() {
        let driver = Arc::new(TickDriver::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let _task = driver.run_repeating(ActorId(1), 1, 1, counting_task(&runs));

        let handle = Arc::clone(&driver).spawn(200);
        std::thread::sleep(Duration::from_millis(100));
        let stats = handle.stop().unwrap();

        assert!(runs.load(Ordering::SeqCst) > 0);
        assert!(stats.total_ticks > 0);
    }
}
