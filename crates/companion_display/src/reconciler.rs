//! # Entity Reconciler
//!
//! Owns the actor → tracked companion map and decides, every tick, whether
//! an actor's companion is kept, replaced, torn down or spawned.
//!
//! ## States
//!
//! ```text
//!            spawn ok
//!   Absent ───────────► Tracking(entity, pet)
//!     ▲                        │
//!     └────────────────────────┘
//!      invisible / no pet / pet changed / entity dead /
//!      teleport / world change / quit
//! ```
//!
//! Teardown always removes the map entry first and then hands the destroy
//! to the mutation worker, so a half-destroyed entity is never returned and
//! an actor never has two live companions.

use std::collections::HashMap;
use std::sync::Arc;

use companion_shared::{ActorId, EntityHandle, PetId};
use parking_lot::Mutex;

use crate::integration::traits::{ActivePet, ActorView, EntitySystem};
use crate::pose::PoseCalculator;
use crate::stats::DisplayCounters;
use crate::worker::MutationQueue;

/// The live entity standing in for one actor's pet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedCompanion {
    /// Entity handle, owned by the reconciler.
    pub entity: EntityHandle,
    /// Pet the entity represents.
    pub pet: PetId,
}

/// Per-actor companion state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompanionState {
    /// No companion tracked.
    Absent,
    /// A companion is tracked.
    Tracking(TrackedCompanion),
}

impl From<Option<TrackedCompanion>> for CompanionState {
    fn from(tracked: Option<TrackedCompanion>) -> Self {
        tracked.map_or(Self::Absent, Self::Tracking)
    }
}

/// What a reconciliation does to an actor's companion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Nothing tracked and nothing wanted.
    Idle,
    /// Tracked companion is still right.
    Keep,
    /// Nothing tracked, spawn one.
    Spawn,
    /// Tracked companion must go, nothing replaces it.
    Teardown,
    /// Tracked companion is stale (other pet or dead), spawn a fresh one.
    Replace,
}

/// Pure transition function of the companion state machine.
#[must_use]
pub fn decide(
    state: &CompanionState,
    invisible: bool,
    desired: Option<&PetId>,
    alive: bool,
) -> Decision {
    match (state, desired) {
        (CompanionState::Absent, _) if invisible => Decision::Idle,
        (CompanionState::Tracking(_), _) if invisible => Decision::Teardown,
        (CompanionState::Absent, None) => Decision::Idle,
        (CompanionState::Absent, Some(_)) => Decision::Spawn,
        (CompanionState::Tracking(_), None) => Decision::Teardown,
        (CompanionState::Tracking(tracked), Some(pet)) => {
            if &tracked.pet == pet && alive {
                Decision::Keep
            } else {
                Decision::Replace
            }
        }
    }
}

/// Actor → tracked companion map plus the reconciliation policy.
pub struct EntityReconciler {
    tracked: Mutex<HashMap<ActorId, TrackedCompanion>>,
    entities: Arc<dyn EntitySystem>,
    queue: Arc<MutationQueue>,
    counters: Arc<DisplayCounters>,
}

impl EntityReconciler {
    pub(crate) fn new(
        entities: Arc<dyn EntitySystem>,
        queue: Arc<MutationQueue>,
        counters: Arc<DisplayCounters>,
    ) -> Self {
        Self {
            tracked: Mutex::new(HashMap::new()),
            entities,
            queue,
            counters,
        }
    }

    /// Brings an actor's companion in line with their current view and pet.
    ///
    /// Returns the companion to animate this tick, or `None` when the actor
    /// has no companion (no pet, invisible, unresolved world or a rejected
    /// spawn). A rejected spawn leaves no entry, so the next tick retries.
    pub fn reconcile(
        &self,
        actor: ActorId,
        view: &ActorView,
        pet: Option<&ActivePet>,
        pose: &PoseCalculator,
    ) -> Option<EntityHandle> {
        let mut tracked = self.tracked.lock();
        let state = CompanionState::from(tracked.get(&actor).cloned());
        let alive = match &state {
            CompanionState::Tracking(t) => self.entities.is_alive(t.entity),
            CompanionState::Absent => false,
        };

        match decide(&state, view.invisible, pet.map(|p| &p.id), alive) {
            Decision::Idle => None,
            Decision::Keep => match state {
                CompanionState::Tracking(t) => Some(t.entity),
                CompanionState::Absent => None,
            },
            Decision::Teardown => {
                self.teardown_locked(&mut tracked, actor);
                None
            }
            Decision::Replace => {
                self.teardown_locked(&mut tracked, actor);
                pet.and_then(|pet| self.spawn_locked(&mut tracked, actor, view, pet, pose))
            }
            Decision::Spawn => {
                pet.and_then(|pet| self.spawn_locked(&mut tracked, actor, view, pet, pose))
            }
        }
    }

    /// Tears down the actor's companion, if any.
    ///
    /// Returns true if a companion was tracked. Safe to call repeatedly.
    pub fn teardown(&self, actor: ActorId) -> bool {
        self.teardown_locked(&mut self.tracked.lock(), actor)
    }

    /// Destroys every tracked companion immediately, bypassing the worker,
    /// and clears the map. Returns how many were destroyed.
    pub fn destroy_all(&self) -> usize {
        let drained: Vec<_> = self.tracked.lock().drain().collect();
        for (_, companion) in &drained {
            self.entities.destroy(companion.entity);
            DisplayCounters::bump(&self.counters.destroyed);
        }
        drained.len()
    }

    /// Current state of an actor's companion.
    #[must_use]
    pub fn state(&self, actor: ActorId) -> CompanionState {
        self.tracked.lock().get(&actor).cloned().into()
    }

    /// Number of tracked companions.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracked.lock().len()
    }

    fn teardown_locked(
        &self,
        tracked: &mut HashMap<ActorId, TrackedCompanion>,
        actor: ActorId,
    ) -> bool {
        let Some(companion) = tracked.remove(&actor) else {
            return false;
        };
        self.queue.destroy(companion.entity);
        DisplayCounters::bump(&self.counters.destroyed);
        tracing::debug!("{}: companion {} torn down", actor, companion.entity);
        true
    }

    fn spawn_locked(
        &self,
        tracked: &mut HashMap<ActorId, TrackedCompanion>,
        actor: ActorId,
        view: &ActorView,
        pet: &ActivePet,
        pose: &PoseCalculator,
    ) -> Option<EntityHandle> {
        let world = view.world?;
        let spawn_pose = pose.spawn_pose(view.eye_position, view.eye_direction);

        match self.entities.spawn(actor, pet, world, spawn_pose) {
            Ok(entity) => {
                tracked.insert(
                    actor,
                    TrackedCompanion {
                        entity,
                        pet: pet.id.clone(),
                    },
                );
                DisplayCounters::bump(&self.counters.spawned);
                tracing::debug!("{}: spawned {} for pet {}", actor, entity, pet.id);
                Some(entity)
            }
            Err(e) => {
                DisplayCounters::bump(&self.counters.spawn_failures);
                tracing::warn!("{}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::mock::MockEntitySystem;
    use crate::worker::MutationWorker;
    use companion_shared::{Vec3, WorldId};

    struct Fixture {
        entities: Arc<MockEntitySystem>,
        worker: MutationWorker,
        reconciler: EntityReconciler,
        pose: PoseCalculator,
    }

    fn fixture() -> Fixture {
        let entities = Arc::new(MockEntitySystem::new());
        let (queue, worker) = MutationQueue::new(entities.clone(), 64);
        let reconciler = EntityReconciler::new(
            entities.clone(),
            Arc::new(queue),
            Arc::new(DisplayCounters::default()),
        );
        Fixture {
            entities,
            worker,
            reconciler,
            pose: PoseCalculator::default(),
        }
    }

    fn view() -> ActorView {
        ActorView {
            display_name: "Alex".to_string(),
            invisible: false,
            eye_position: Vec3::new(0.0, 65.0, 0.0),
            eye_direction: Vec3::Z,
            world: Some(WorldId(0)),
        }
    }

    fn pet(id: &str) -> ActivePet {
        ActivePet {
            id: PetId::new(id),
            name: id.to_string(),
            texture: String::new(),
            level: 1,
        }
    }

    #[test]
    fn test_decide_table() {
        let falcon = PetId::new("falcon");
        let tiger = PetId::new("tiger");
        let tracking = CompanionState::Tracking(TrackedCompanion {
            entity: EntityHandle(1),
            pet: falcon.clone(),
        });
        let absent = CompanionState::Absent;

        assert_eq!(decide(&absent, false, None, false), Decision::Idle);
        assert_eq!(decide(&absent, true, Some(&falcon), false), Decision::Idle);
        assert_eq!(decide(&absent, false, Some(&falcon), false), Decision::Spawn);
        assert_eq!(decide(&tracking, false, Some(&falcon), true), Decision::Keep);
        assert_eq!(decide(&tracking, false, Some(&falcon), false), Decision::Replace);
        assert_eq!(decide(&tracking, false, Some(&tiger), true), Decision::Replace);
        assert_eq!(decide(&tracking, false, None, true), Decision::Teardown);
        assert_eq!(decide(&tracking, true, Some(&falcon), true), Decision::Teardown);
    }

    #[test]
    fn test_no_pet_means_no_companion() {
        let f = fixture();
        let actor = ActorId(1);

        assert_eq!(f.reconciler.reconcile(actor, &view(), None, &f.pose), None);
        assert_eq!(f.reconciler.state(actor), CompanionState::Absent);
        assert_eq!(f.entities.spawned_total(), 0);
    }

    #[test]
    fn test_spawn_once_then_keep() {
        let f = fixture();
        let actor = ActorId(1);
        let falcon = pet("falcon");

        let first = f.reconciler.reconcile(actor, &view(), Some(&falcon), &f.pose);
        let second = f.reconciler.reconcile(actor, &view(), Some(&falcon), &f.pose);

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(f.entities.spawned_total(), 1);

        // Spawned at the tick-0 pose
        let expected = f.pose.spawn_pose(view().eye_position, view().eye_direction);
        assert_eq!(f.entities.entity(first.unwrap()).unwrap().position, expected.position);
    }

    #[test]
    fn test_pet_change_replaces_companion() {
        let f = fixture();
        let actor = ActorId(1);

        let old = f
            .reconciler
            .reconcile(actor, &view(), Some(&pet("falcon")), &f.pose)
            .unwrap();
        let new = f
            .reconciler
            .reconcile(actor, &view(), Some(&pet("tiger")), &f.pose)
            .unwrap();
        f.worker.drain();

        assert_ne!(old, new);
        assert_eq!(f.entities.destroyed(), vec![old]);
        assert_eq!(f.entities.alive_owned_by(actor), vec![new]);
    }

    #[test]
    fn test_dead_entity_is_recreated() {
        let f = fixture();
        let actor = ActorId(1);
        let falcon = pet("falcon");

        let old = f
            .reconciler
            .reconcile(actor, &view(), Some(&falcon), &f.pose)
            .unwrap();
        f.entities.kill(old);

        let new = f
            .reconciler
            .reconcile(actor, &view(), Some(&falcon), &f.pose)
            .unwrap();
        f.worker.drain();

        assert_ne!(old, new);
        assert_eq!(f.entities.live_count(), 1);
    }

    #[test]
    fn test_invisible_tears_down_and_visible_respawns() {
        let f = fixture();
        let actor = ActorId(1);
        let falcon = pet("falcon");
        let mut hidden = view();
        hidden.invisible = true;

        let before = f
            .reconciler
            .reconcile(actor, &view(), Some(&falcon), &f.pose)
            .unwrap();
        assert_eq!(f.reconciler.reconcile(actor, &hidden, Some(&falcon), &f.pose), None);
        assert_eq!(f.reconciler.state(actor), CompanionState::Absent);

        let after = f
            .reconciler
            .reconcile(actor, &view(), Some(&falcon), &f.pose)
            .unwrap();
        f.worker.drain();

        assert_ne!(before, after);
        assert_eq!(f.entities.alive_owned_by(actor), vec![after]);
    }

    #[test]
    fn test_rejected_spawn_retries_next_time() {
        let f = fixture();
        let actor = ActorId(1);
        let falcon = pet("falcon");

        f.entities.reject_spawns(true);
        assert_eq!(f.reconciler.reconcile(actor, &view(), Some(&falcon), &f.pose), None);
        assert_eq!(f.reconciler.tracked_count(), 0);

        f.entities.reject_spawns(false);
        assert!(f.reconciler.reconcile(actor, &view(), Some(&falcon), &f.pose).is_some());
    }

    #[test]
    fn test_unresolved_world_skips_spawn() {
        let f = fixture();
        let mut lost = view();
        lost.world = None;

        assert_eq!(
            f.reconciler.reconcile(ActorId(1), &lost, Some(&pet("falcon")), &f.pose),
            None
        );
        assert_eq!(f.entities.spawned_total(), 0);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let f = fixture();
        let actor = ActorId(1);

        assert!(!f.reconciler.teardown(actor));
        f.reconciler.reconcile(actor, &view(), Some(&pet("falcon")), &f.pose);
        assert!(f.reconciler.teardown(actor));
        assert!(!f.reconciler.teardown(actor));
        f.worker.drain();

        assert_eq!(f.entities.live_count(), 0);
    }

    #[test]
    fn test_destroy_all_bypasses_worker() {
        let f = fixture();
        for id in 1..=3 {
            f.reconciler
                .reconcile(ActorId(id), &view(), Some(&pet("falcon")), &f.pose);
        }

        assert_eq!(f.reconciler.destroy_all(), 3);
        assert_eq!(f.reconciler.tracked_count(), 0);
        assert_eq!(f.entities.live_count(), 0);
        assert_eq!(f.worker.drain(), 0);
    }
}
