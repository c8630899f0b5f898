//! # Companion Display
//!
//! The engine facade. Owns the reconciler, the per-actor tick scheduler
//! and the mutation queue, and runs the per-tick update routine.
//!
//! ```text
//!  task(actor) ──► tick_actor ──► reconcile ──► label ──► pose ──► queue
//!                                     │                             │
//!                                  spawn (direct)            MutationWorker
//! ```

use std::sync::{Arc, Weak};

use companion_shared::ActorId;
use parking_lot::RwLock;

use crate::config::DisplayConfig;
use crate::error::DisplayResult;
use crate::integration::traits::{
    ActorRegistry, EntitySystem, PetProvider, TaskScheduler, TextFormatter,
};
use crate::label::render_label;
use crate::pose::{rotation_suppressed, PoseCalculator};
use crate::reconciler::{CompanionState, EntityReconciler};
use crate::scheduler::{Cadence, TickScheduler};
use crate::stats::{DisplayCounters, DisplayStats};
use crate::worker::{MutationQueue, MutationWorker};

/// The external systems the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Connected actors.
    pub actors: Arc<dyn ActorRegistry>,
    /// Equipped pets.
    pub pets: Arc<dyn PetProvider>,
    /// Physical entities.
    pub entities: Arc<dyn EntitySystem>,
    /// Label formatting.
    pub formatter: Arc<dyn TextFormatter>,
    /// Repeating task host.
    pub scheduler: Arc<dyn TaskScheduler>,
}

pub(crate) struct DisplayCore {
    pub(crate) actors: Arc<dyn ActorRegistry>,
    pets: Arc<dyn PetProvider>,
    formatter: Arc<dyn TextFormatter>,
    config: RwLock<DisplayConfig>,
    pose: RwLock<PoseCalculator>,
    pub(crate) reconciler: EntityReconciler,
    pub(crate) ticks: TickScheduler,
    queue: Arc<MutationQueue>,
    pub(crate) counters: Arc<DisplayCounters>,
}

impl DisplayCore {
    pub(crate) fn cadence(&self) -> Cadence {
        let config = self.config.read();
        Cadence {
            initial_delay: config.initial_delay,
            period: config.tick_period,
        }
    }

    /// Per-tick update routine for one actor.
    pub(crate) fn tick_actor(&self, actor: ActorId, tick: u64) {
        DisplayCounters::bump(&self.counters.ticks);

        let Some(view) = self.actors.snapshot(actor) else {
            return;
        };
        let pet = self.pets.active_pet(actor);

        let pose = *self.pose.read();
        let Some(entity) = self.reconciler.reconcile(actor, &view, pet.as_ref(), &pose) else {
            return;
        };
        let Some(pet) = pet else {
            return;
        };
        if view.invisible {
            self.reconciler.teardown(actor);
            return;
        }
        // Task stopped while this invocation was running
        if self.ticks.tick_of(actor).is_none() {
            self.reconciler.teardown(actor);
            return;
        }

        let label = {
            let config = self.config.read();
            render_label(&config.label_template, &view.display_name, &pet.name, pet.level)
        };
        self.queue
            .set_label(entity, self.formatter.format(&label, actor));

        let target = pose.compute(view.eye_position, view.eye_direction, tick);
        if let Some(world) = view.world {
            self.queue.move_to(entity, world, target.position);
        }
        if !rotation_suppressed(&pet.texture) {
            self.queue.rotate(entity, target.yaw, target.pitch);
        }
    }
}

/// Per-actor companion engine.
///
/// Construct with [`CompanionDisplay::new`], then run the returned
/// [`MutationWorker`] wherever entity mutations are allowed (its own thread
/// via [`MutationWorker::spawn`], or pumped from the host's main loop).
pub struct CompanionDisplay {
    pub(crate) core: Arc<DisplayCore>,
}

impl CompanionDisplay {
    /// Builds the engine. No tasks run until actors join or
    /// [`CompanionDisplay::update`] is called.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails validation.
    pub fn new(
        config: DisplayConfig,
        collaborators: Collaborators,
    ) -> DisplayResult<(Self, MutationWorker)> {
        config.validate()?;

        let (queue, worker) = MutationQueue::new(
            Arc::clone(&collaborators.entities),
            config.mutation_queue_capacity,
        );
        let queue = Arc::new(queue);
        let counters = Arc::new(DisplayCounters::default());
        let pose = PoseCalculator::new(&config.pose);

        let core = Arc::new_cyclic(|weak: &Weak<DisplayCore>| {
            let weak = weak.clone();
            let routine = Arc::new(move |actor: ActorId, tick: u64| {
                if let Some(core) = weak.upgrade() {
                    core.tick_actor(actor, tick);
                }
            });

            DisplayCore {
                actors: collaborators.actors,
                pets: collaborators.pets,
                formatter: collaborators.formatter,
                config: RwLock::new(config),
                pose: RwLock::new(pose),
                reconciler: EntityReconciler::new(
                    collaborators.entities,
                    Arc::clone(&queue),
                    Arc::clone(&counters),
                ),
                ticks: TickScheduler::new(collaborators.scheduler, routine),
                queue,
                counters,
            }
        });

        Ok((Self { core }, worker))
    }

    /// Bulk resync: replaces every task with a fresh one for each actor
    /// currently online.
    pub fn update(&self) {
        let online = self.core.actors.online_actors();
        self.core.ticks.restart_all(&online, self.core.cadence());
        DisplayCounters::bump(&self.core.counters.restarts);
        tracing::info!("companion tasks restarted for {} actors", online.len());
    }

    /// Applies a new configuration and restarts every task.
    ///
    /// The mutation queue keeps the capacity it was built with.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` and keeps the current configuration if
    /// `config` fails validation.
    pub fn reload(&self, config: DisplayConfig) -> DisplayResult<()> {
        config.validate()?;
        *self.core.pose.write() = PoseCalculator::new(&config.pose);
        *self.core.config.write() = config;
        tracing::info!("companion configuration reloaded");
        self.update();
        Ok(())
    }

    /// Destroys every tracked companion immediately.
    ///
    /// Tasks keep running; call [`CompanionDisplay::stop_all`] first when
    /// the host is going away.
    pub fn shutdown(&self) -> usize {
        let destroyed = self.core.reconciler.destroy_all();
        tracing::info!("companion display shut down, {} companions destroyed", destroyed);
        destroyed
    }

    /// Cancels every per-actor task. Returns how many were running.
    pub fn stop_all(&self) -> usize {
        self.core.ticks.stop_all()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> DisplayStats {
        self.core.counters.snapshot()
    }

    /// Number of tracked companions.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.core.reconciler.tracked_count()
    }

    /// Number of registered per-actor tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.core.ticks.task_count()
    }

    /// Whether the actor has a running task.
    #[must_use]
    pub fn is_running(&self, actor: ActorId) -> bool {
        self.core.ticks.is_running(actor)
    }

    /// State of an actor's companion.
    #[must_use]
    pub fn companion_state(&self, actor: ActorId) -> CompanionState {
        self.core.reconciler.state(actor)
    }

    /// The actor's animation tick, `None` without a task.
    #[must_use]
    pub fn tick_of(&self, actor: ActorId) -> Option<u64> {
        self.core.ticks.tick_of(actor)
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> DisplayConfig {
        self.core.config.read().clone()
    }

    /// Mutations waiting for the worker.
    #[must_use]
    pub fn pending_mutations(&self) -> usize {
        self.core.queue.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::mock::{
        MockActorRegistry, MockEntitySystem, MockPetProvider, PlainTextFormatter,
    };
    use crate::scheduler::TickDriver;
    use companion_shared::Vec3;

    struct Fixture {
        actors: Arc<MockActorRegistry>,
        pets: Arc<MockPetProvider>,
        entities: Arc<MockEntitySystem>,
        driver: Arc<TickDriver>,
        display: CompanionDisplay,
        worker: MutationWorker,
    }

    impl Fixture {
        fn new(config: DisplayConfig) -> Self {
            let actors = Arc::new(MockActorRegistry::new());
            let pets = Arc::new(MockPetProvider::new());
            let entities = Arc::new(MockEntitySystem::new());
            let driver = Arc::new(TickDriver::new());
            let (display, worker) = CompanionDisplay::new(
                config,
                Collaborators {
                    actors: actors.clone(),
                    pets: pets.clone(),
                    entities: entities.clone(),
                    formatter: Arc::new(PlainTextFormatter),
                    scheduler: driver.clone(),
                },
            )
            .unwrap();
            Self {
                actors,
                pets,
                entities,
                driver,
                display,
                worker,
            }
        }

        fn step(&self) {
            self.driver.advance();
            self.worker.drain();
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DisplayConfig {
            tick_period: 0,
            ..DisplayConfig::default()
        };
        let collaborators = Collaborators {
            actors: Arc::new(MockActorRegistry::new()),
            pets: Arc::new(MockPetProvider::new()),
            entities: Arc::new(MockEntitySystem::new()),
            formatter: Arc::new(PlainTextFormatter),
            scheduler: Arc::new(TickDriver::new()),
        };
        assert!(CompanionDisplay::new(config, collaborators).is_err());
    }

    #[test]
    fn test_tick_spawns_labels_and_moves() {
        let f = Fixture::new(DisplayConfig::default());
        f.actors.connect(ActorId(1), "Steve", Vec3::new(0.0, 65.0, 0.0));
        f.pets.equip(ActorId(1), "falcon", "Falcon", "falcon_skin", 3);
        f.display.update();

        f.step();

        let owned = f.entities.alive_owned_by(ActorId(1));
        assert_eq!(owned.len(), 1);
        let entity = f.entities.entity(owned[0]).unwrap();
        assert_eq!(entity.label.as_deref(), Some("Steve's Falcon (Lvl. 3)"));
        assert_eq!(f.display.stats().spawned, 1);
        assert_eq!(f.display.stats().ticks, 1);
    }

    #[test]
    fn test_namespaced_texture_is_not_rotated() {
        let f = Fixture::new(DisplayConfig::default());
        f.actors.connect(ActorId(1), "Steve", Vec3::ZERO);
        f.pets.equip(ActorId(1), "golem", "Golem", "pets:golem", 1);
        f.display.update();

        f.driver.advance_by(10);
        f.worker.drain();

        let owned = f.entities.alive_owned_by(ActorId(1));
        let entity = f.entities.entity(owned[0]).unwrap();
        assert!(entity.yaw.abs() < f32::EPSILON);
    }

    #[test]
    fn test_counter_advances_without_companion() {
        let f = Fixture::new(DisplayConfig::default());
        f.actors.connect(ActorId(1), "Steve", Vec3::ZERO);
        f.display.update();

        f.driver.advance_by(4);

        assert_eq!(f.display.tick_of(ActorId(1)), Some(4));
        assert_eq!(f.display.tracked_count(), 0);
    }

    #[test]
    fn test_reload_swaps_template_and_restarts() {
        let f = Fixture::new(DisplayConfig::default());
        f.actors.connect(ActorId(1), "Steve", Vec3::ZERO);
        f.pets.equip(ActorId(1), "falcon", "Falcon", "falcon_skin", 3);
        f.display.update();
        f.driver.advance_by(3);

        f.display
            .reload(DisplayConfig {
                label_template: "%pet% of %player%".to_string(),
                ..DisplayConfig::default()
            })
            .unwrap();
        assert_eq!(f.display.tick_of(ActorId(1)), Some(0));
        f.step();

        let owned = f.entities.alive_owned_by(ActorId(1));
        let entity = f.entities.entity(owned[0]).unwrap();
        assert_eq!(entity.label.as_deref(), Some("Falcon of Steve"));
        assert_eq!(f.display.stats().restarts, 2);
    }

    #[test]
    fn test_reload_rejects_invalid_and_keeps_config() {
        let f = Fixture::new(DisplayConfig::default());
        let bad = DisplayConfig {
            label_template: String::new(),
            ..DisplayConfig::default()
        };
        assert!(f.display.reload(bad).is_err());
        assert_eq!(f.display.config(), DisplayConfig::default());
        assert_eq!(f.display.stats().restarts, 0);
    }

    #[test]
    fn test_shutdown_destroys_directly() {
        let f = Fixture::new(DisplayConfig::default());
        f.actors.connect(ActorId(1), "Steve", Vec3::ZERO);
        f.pets.equip(ActorId(1), "falcon", "Falcon", "falcon_skin", 3);
        f.display.update();
        f.step();

        assert_eq!(f.display.shutdown(), 1);
        assert_eq!(f.entities.live_count(), 0);
        assert_eq!(f.display.tracked_count(), 0);
    }

    type SpawnHook = Box<dyn Fn() + Send + Sync>;

    /// Mock entity system that runs a hook from inside `spawn`.
    struct HookedEntities {
        inner: MockEntitySystem,
        hook: parking_lot::Mutex<Option<SpawnHook>>,
    }

    impl EntitySystem for HookedEntities {
        fn spawn(
            &self,
            owner: ActorId,
            pet: &crate::integration::traits::ActivePet,
            world: companion_shared::WorldId,
            pose: crate::pose::Pose,
        ) -> DisplayResult<companion_shared::EntityHandle> {
            if let Some(hook) = self.hook.lock().take() {
                hook();
            }
            self.inner.spawn(owner, pet, world, pose)
        }

        fn is_alive(&self, entity: companion_shared::EntityHandle) -> bool {
            self.inner.is_alive(entity)
        }

        fn set_label(&self, entity: companion_shared::EntityHandle, text: &str) {
            self.inner.set_label(entity, text);
        }

        fn move_to(
            &self,
            entity: companion_shared::EntityHandle,
            world: companion_shared::WorldId,
            position: Vec3,
        ) {
            self.inner.move_to(entity, world, position);
        }

        fn set_rotation(&self, entity: companion_shared::EntityHandle, yaw: f32, pitch: f32) {
            self.inner.set_rotation(entity, yaw, pitch);
        }

        fn destroy(&self, entity: companion_shared::EntityHandle) {
            self.inner.destroy(entity);
        }
    }

    #[test]
    fn test_reload_during_spawn_does_not_block() {
        let actors = Arc::new(MockActorRegistry::new());
        let pets = Arc::new(MockPetProvider::new());
        let entities = Arc::new(HookedEntities {
            inner: MockEntitySystem::new(),
            hook: parking_lot::Mutex::new(None),
        });
        let driver = Arc::new(TickDriver::new());
        let (display, worker) = CompanionDisplay::new(
            DisplayConfig::default(),
            Collaborators {
                actors: actors.clone(),
                pets: pets.clone(),
                entities: entities.clone(),
                formatter: Arc::new(PlainTextFormatter),
                scheduler: driver.clone(),
            },
        )
        .unwrap();

        let core = Arc::downgrade(&display.core);
        *entities.hook.lock() = Some(Box::new(move || {
            if let Some(core) = core.upgrade() {
                let reloaded = CompanionDisplay { core }.reload(DisplayConfig {
                    label_template: "%pet%".to_string(),
                    ..DisplayConfig::default()
                });
                assert!(reloaded.is_ok());
            }
        }));

        actors.connect(ActorId(1), "Steve", Vec3::ZERO);
        pets.equip(ActorId(1), "falcon", "Falcon", "falcon_skin", 3);
        display.update();
        driver.advance();
        worker.drain();

        assert_eq!(display.config().label_template, "%pet%");
        assert_eq!(display.tracked_count(), 1);
        assert_eq!(display.stats().restarts, 2);
    }
}
