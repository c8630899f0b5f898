//! # Mock Collaborators
//!
//! In-memory implementations of the integration traits, for tests and
//! benchmarks.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use companion_shared::{ActorId, EntityHandle, PetId, Vec3, WorldId};
use parking_lot::{Mutex, RwLock};

use crate::error::{DisplayError, DisplayResult};
use crate::integration::traits::{
    ActivePet, ActorRegistry, ActorView, EntitySystem, PetProvider, TextFormatter,
};
use crate::pose::Pose;

// ============================================================================
// ACTORS
// ============================================================================

/// Mock session registry.
#[derive(Default)]
pub struct MockActorRegistry {
    actors: RwLock<BTreeMap<ActorId, ActorView>>,
}

impl MockActorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects an actor standing at `eye_position` in world 0, looking +Z.
    pub fn connect(&self, actor: ActorId, display_name: &str, eye_position: Vec3) {
        self.actors.write().insert(
            actor,
            ActorView {
                display_name: display_name.to_string(),
                invisible: false,
                eye_position,
                eye_direction: Vec3::Z,
                world: Some(WorldId(0)),
            },
        );
    }

    /// Disconnects an actor.
    pub fn disconnect(&self, actor: ActorId) {
        self.actors.write().remove(&actor);
    }

    /// Edits a connected actor in place. No-op if not connected.
    pub fn update(&self, actor: ActorId, edit: impl FnOnce(&mut ActorView)) {
        if let Some(view) = self.actors.write().get_mut(&actor) {
            edit(view);
        }
    }

    /// Toggles invisibility.
    pub fn set_invisible(&self, actor: ActorId, invisible: bool) {
        self.update(actor, |view| view.invisible = invisible);
    }

    /// Moves the actor's eye.
    pub fn set_eye(&self, actor: ActorId, position: Vec3, direction: Vec3) {
        self.update(actor, |view| {
            view.eye_position = position;
            view.eye_direction = direction;
        });
    }

    /// Moves the actor to another world (`None` = unresolved).
    pub fn set_world(&self, actor: ActorId, world: Option<WorldId>) {
        self.update(actor, |view| view.world = world);
    }
}

impl ActorRegistry for MockActorRegistry {
    fn online_actors(&self) -> Vec<ActorId> {
        self.actors.read().keys().copied().collect()
    }

    fn snapshot(&self, actor: ActorId) -> Option<ActorView> {
        self.actors.read().get(&actor).cloned()
    }
}

// ============================================================================
// PETS
// ============================================================================

/// Mock pet ownership.
#[derive(Default)]
pub struct MockPetProvider {
    pets: RwLock<HashMap<ActorId, ActivePet>>,
}

impl MockPetProvider {
    /// Creates a provider where nobody owns a pet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Equips `actor` with a pet.
    pub fn equip(&self, actor: ActorId, id: &str, name: &str, texture: &str, level: u32) {
        self.pets.write().insert(
            actor,
            ActivePet {
                id: PetId::new(id),
                name: name.to_string(),
                texture: texture.to_string(),
                level,
            },
        );
    }

    /// Removes the actor's pet.
    pub fn unequip(&self, actor: ActorId) {
        self.pets.write().remove(&actor);
    }
}

impl PetProvider for MockPetProvider {
    fn active_pet(&self, actor: ActorId) -> Option<ActivePet> {
        self.pets.read().get(&actor).cloned()
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// A companion entity living in the mock entity system.
#[derive(Clone, Debug, PartialEq)]
pub struct MockEntity {
    /// Actor it was spawned for.
    pub owner: ActorId,
    /// Pet it shows.
    pub pet: PetId,
    /// Current world.
    pub world: WorldId,
    /// Current position.
    pub position: Vec3,
    /// Current yaw.
    pub yaw: f32,
    /// Current pitch.
    pub pitch: f32,
    /// Current label.
    pub label: Option<String>,
    /// Killed from outside (e.g. by the world) without being destroyed.
    pub dead: bool,
}

#[derive(Default)]
struct MockEntities {
    next_id: u64,
    live: HashMap<EntityHandle, MockEntity>,
    spawned: u64,
    destroyed: Vec<EntityHandle>,
}

/// Mock entity system.
#[derive(Default)]
pub struct MockEntitySystem {
    inner: Mutex<MockEntities>,
    reject_spawns: AtomicBool,
}

impl MockEntitySystem {
    /// Creates an empty entity system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following spawn fail (or succeed again).
    pub fn reject_spawns(&self, reject: bool) {
        self.reject_spawns.store(reject, Ordering::SeqCst);
    }

    /// Kills an entity without destroying it, as the world would.
    pub fn kill(&self, entity: EntityHandle) {
        if let Some(e) = self.inner.lock().live.get_mut(&entity) {
            e.dead = true;
        }
    }

    /// Copy of a live (not yet destroyed) entity.
    #[must_use]
    pub fn entity(&self, entity: EntityHandle) -> Option<MockEntity> {
        self.inner.lock().live.get(&entity).cloned()
    }

    /// Live, not-dead entities owned by `owner`.
    #[must_use]
    pub fn alive_owned_by(&self, owner: ActorId) -> Vec<EntityHandle> {
        let inner = self.inner.lock();
        let mut out: Vec<_> = inner
            .live
            .iter()
            .filter(|(_, e)| e.owner == owner && !e.dead)
            .map(|(h, _)| *h)
            .collect();
        out.sort_by_key(|h| h.0);
        out
    }

    /// Number of entities not yet destroyed (dead ones included).
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Total successful spawns.
    #[must_use]
    pub fn spawned_total(&self) -> u64 {
        self.inner.lock().spawned
    }

    /// Handles destroyed so far, in order.
    #[must_use]
    pub fn destroyed(&self) -> Vec<EntityHandle> {
        self.inner.lock().destroyed.clone()
    }
}

impl EntitySystem for MockEntitySystem {
    fn spawn(
        &self,
        owner: ActorId,
        pet: &ActivePet,
        world: WorldId,
        pose: Pose,
    ) -> DisplayResult<EntityHandle> {
        if self.reject_spawns.load(Ordering::SeqCst) {
            return Err(DisplayError::SpawnRejected {
                actor: owner,
                reason: "spawning disabled".to_string(),
            });
        }

        let mut inner = self.inner.lock();
        inner.next_id += 1;
        inner.spawned += 1;
        let handle = EntityHandle(inner.next_id);
        inner.live.insert(
            handle,
            MockEntity {
                owner,
                pet: pet.id.clone(),
                world,
                position: pose.position,
                yaw: pose.yaw,
                pitch: pose.pitch,
                label: None,
                dead: false,
            },
        );
        Ok(handle)
    }

    fn is_alive(&self, entity: EntityHandle) -> bool {
        self.inner.lock().live.get(&entity).is_some_and(|e| !e.dead)
    }

    fn set_label(&self, entity: EntityHandle, text: &str) {
        if let Some(e) = self.inner.lock().live.get_mut(&entity) {
            e.label = Some(text.to_string());
        }
    }

    fn move_to(&self, entity: EntityHandle, world: WorldId, position: Vec3) {
        if let Some(e) = self.inner.lock().live.get_mut(&entity) {
            e.world = world;
            e.position = position;
        }
    }

    fn set_rotation(&self, entity: EntityHandle, yaw: f32, pitch: f32) {
        if let Some(e) = self.inner.lock().live.get_mut(&entity) {
            e.yaw = yaw;
            e.pitch = pitch;
        }
    }

    fn destroy(&self, entity: EntityHandle) {
        let mut inner = self.inner.lock();
        if inner.live.remove(&entity).is_some() {
            inner.destroyed.push(entity);
        }
    }
}

// ============================================================================
// TEXT
// ============================================================================

/// Formatter that returns its input unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextFormatter;

impl TextFormatter for PlainTextFormatter {
    fn format(&self, text: &str, _actor: ActorId) -> String {
        text.to_string()
    }
}
