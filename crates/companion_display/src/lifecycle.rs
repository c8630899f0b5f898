//! # Lifecycle Event Handler
//!
//! Join starts the actor's task. Quit stops the task and then tears the
//! companion down. Teleport and world change only tear down; the running task
//! recreates the companion at the new location on its next tick.
//!
//! Every handler is idempotent.

use companion_shared::{ActorId, EventType, LifecycleEvent};

use crate::display::CompanionDisplay;

impl CompanionDisplay {
    /// Dispatches a lifecycle event to its handler.
    pub fn handle(&self, event: &LifecycleEvent) {
        let actor = event.actor();
        match event.event_type() {
            EventType::Join => self.on_join(actor),
            EventType::Quit => self.on_quit(actor),
            EventType::Teleport => self.on_teleport(actor),
            EventType::WorldChange => self.on_world_change(actor),
        }
    }

    /// The actor connected.
    pub fn on_join(&self, actor: ActorId) {
        self.core.ticks.start(actor, self.core.cadence());
        tracing::debug!("{}: joined, companion task started", actor);
    }

    /// The actor disconnected.
    ///
    /// The task stops first: a tick still running afterwards either spawned
    /// before the teardown below, or finds its counter gone and tears its
    /// own spawn down.
    pub fn on_quit(&self, actor: ActorId) {
        let had_task = self.core.ticks.stop(actor);
        let had_companion = self.core.reconciler.teardown(actor);
        tracing::debug!(
            "{}: quit (companion: {}, task: {})",
            actor,
            had_companion,
            had_task
        );
    }

    /// The actor teleported.
    pub fn on_teleport(&self, actor: ActorId) {
        if self.core.reconciler.teardown(actor) {
            tracing::debug!("{}: teleported, companion will respawn", actor);
        }
    }

    /// The actor moved to another world.
    pub fn on_world_change(&self, actor: ActorId) {
        if self.core.reconciler.teardown(actor) {
            tracing::debug!("{}: changed world, companion will respawn", actor);
        }
    }
}
