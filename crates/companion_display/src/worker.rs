//! # Entity Mutation Worker
//!
//! **Single writer for every companion mutation.**
//!
//! Tick tasks never move, relabel or destroy an entity inline. They hand a
//! command to the worker and return immediately:
//!
//! ```text
//!   Task (actor 1) ──┐
//!   Task (actor 2) ──┼──> [bounded channel] ──> [Mutation Worker] ──> EntitySystem
//!   Lifecycle     ───┘                          (single consumer)
//! ```
//!
//! Moves are coalesced: an entity has at most one move outstanding, and a
//! newer pose replaces a pending one. When the channel is full, moves,
//! rotations and labels are dropped (the next tick sends fresh ones), while
//! a destroy is applied directly so no companion can leak.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use companion_shared::{EntityHandle, Vec3, WorldId};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

use crate::integration::traits::EntitySystem;

/// How long the worker thread waits for a command before rechecking shutdown.
const IDLE_POLL: Duration = Duration::from_millis(20);

type PendingMoves = Arc<Mutex<HashMap<EntityHandle, (WorldId, Vec3)>>>;

/// Command on the wire to the worker. Moves carry no pose: the latest one
/// is looked up in the pending map when the command is applied.
#[derive(Debug)]
enum Command {
    Move(EntityHandle),
    Rotate {
        entity: EntityHandle,
        yaw: f32,
        pitch: f32,
    },
    Label {
        entity: EntityHandle,
        text: String,
    },
    Destroy(EntityHandle),
}

/// Producer side, shared by every tick task and the lifecycle handler.
pub struct MutationQueue {
    tx: Sender<Command>,
    pending_moves: PendingMoves,
    entities: Arc<dyn EntitySystem>,
    dropped: AtomicU64,
}

impl MutationQueue {
    /// Creates a queue and the worker that drains it.
    #[must_use]
    pub fn new(entities: Arc<dyn EntitySystem>, capacity: usize) -> (Self, MutationWorker) {
        let (tx, rx) = bounded(capacity.max(1));
        let pending_moves: PendingMoves = Arc::new(Mutex::new(HashMap::new()));

        let worker = MutationWorker {
            rx,
            pending_moves: Arc::clone(&pending_moves),
            entities: Arc::clone(&entities),
        };
        let queue = Self {
            tx,
            pending_moves,
            entities,
            dropped: AtomicU64::new(0),
        };
        (queue, worker)
    }

    /// Queues a move, replacing any move still pending for `entity`.
    pub fn move_to(&self, entity: EntityHandle, world: WorldId, position: Vec3) {
        let mut pending = self.pending_moves.lock();
        if pending.insert(entity, (world, position)).is_some() {
            // Already queued; the worker will pick up this pose.
            return;
        }
        if self.tx.try_send(Command::Move(entity)).is_err() {
            pending.remove(&entity);
            self.note_dropped(entity, "move");
        }
    }

    /// Queues a rotation.
    pub fn rotate(&self, entity: EntityHandle, yaw: f32, pitch: f32) {
        if self.tx.try_send(Command::Rotate { entity, yaw, pitch }).is_err() {
            self.note_dropped(entity, "rotate");
        }
    }

    /// Queues a label change.
    pub fn set_label(&self, entity: EntityHandle, text: String) {
        if self.tx.try_send(Command::Label { entity, text }).is_err() {
            self.note_dropped(entity, "label");
        }
    }

    /// Queues a destroy. Never dropped: destroys directly if the worker
    /// cannot take it.
    pub fn destroy(&self, entity: EntityHandle) {
        match self.tx.try_send(Command::Destroy(entity)) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                tracing::warn!("mutation queue unavailable, destroying {} inline", entity);
                self.entities.destroy(entity);
            }
        }
    }

    /// Commands waiting for the worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Commands dropped because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn note_dropped(&self, entity: EntityHandle, what: &str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("mutation queue full, dropped {} for {}", what, entity);
    }
}

/// Consumer side. Pump it with [`MutationWorker::drain`] from the host's
/// entity thread, or give it its own thread with [`MutationWorker::spawn`].
pub struct MutationWorker {
    rx: Receiver<Command>,
    pending_moves: PendingMoves,
    entities: Arc<dyn EntitySystem>,
}

impl MutationWorker {
    /// Applies every queued command without blocking.
    ///
    /// Returns the number of commands that reached the entity system.
    pub fn drain(&self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.rx.try_recv() {
            if self.apply(command) {
                applied += 1;
            }
        }
        applied
    }

    /// Runs the worker on a dedicated thread until the handle is stopped or
    /// every queue is dropped.
    #[must_use]
    pub fn spawn(self) -> WorkerHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = Arc::clone(&shutdown);

        let handle = thread::spawn(move || {
            while !worker_shutdown.load(Ordering::Acquire) {
                match self.rx.recv_timeout(IDLE_POLL) {
                    Ok(command) => {
                        self.apply(command);
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            // Final drain on shutdown
            self.drain();
        });

        WorkerHandle {
            shutdown,
            handle: Some(handle),
        }
    }

    fn apply(&self, command: Command) -> bool {
        match command {
            Command::Move(entity) => {
                let Some((world, position)) = self.pending_moves.lock().remove(&entity) else {
                    return false;
                };
                if !self.entities.is_alive(entity) {
                    return false;
                }
                self.entities.move_to(entity, world, position);
            }
            Command::Rotate { entity, yaw, pitch } => {
                if !self.entities.is_alive(entity) {
                    return false;
                }
                self.entities.set_rotation(entity, yaw, pitch);
            }
            Command::Label { entity, text } => {
                if !self.entities.is_alive(entity) {
                    return false;
                }
                self.entities.set_label(entity, &text);
            }
            Command::Destroy(entity) => {
                self.pending_moves.lock().remove(&entity);
                self.entities.destroy(entity);
            }
        }
        true
    }
}

/// Handle to a worker thread. Dropping it stops and joins the thread.
pub struct WorkerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Stops the worker after a final drain and waits for it.
    pub fn stop(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.join();
    }
}
