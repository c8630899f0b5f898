//! # Integration Traits
//!
//! Traits the host implements to plug the display engine into its world.
//!
//! ```text
//! Engine defines:      Host implements:
//! ┌────────────────┐   ┌────────────────┐
//! │ trait Registry │ ←─│ impl Registry  │
//! └────────────────┘   └────────────────┘
//! ```
//!
//! Every trait is `Send + Sync`; the engine holds them as `Arc<dyn Trait>`
//! and calls them from whichever thread runs an actor's task.

use companion_shared::{ActorId, EntityHandle, PetId, Vec3, WorldId};

use crate::error::DisplayResult;
use crate::pose::Pose;

// ============================================================================
// ACTOR REGISTRY
// ============================================================================

/// What the engine needs to know about a connected actor, read once per tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorView {
    /// Name shown in companion labels.
    pub display_name: String,
    /// Invisible actors never have a companion.
    pub invisible: bool,
    /// Eye position in world coordinates.
    pub eye_position: Vec3,
    /// Direction the actor is looking.
    pub eye_direction: Vec3,
    /// Current world, `None` while it cannot be resolved.
    pub world: Option<WorldId>,
}

/// Session registry: who is connected and where they are.
pub trait ActorRegistry: Send + Sync {
    /// Every currently connected actor.
    fn online_actors(&self) -> Vec<ActorId>;

    /// Current view of an actor, `None` if not connected.
    fn snapshot(&self, actor: ActorId) -> Option<ActorView>;

    /// Returns true if the actor is connected.
    fn is_online(&self, actor: ActorId) -> bool {
        self.snapshot(actor).is_some()
    }
}

// ============================================================================
// PET OWNERSHIP
// ============================================================================

/// The pet an actor currently has equipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivePet {
    /// Logical identity; a change means the companion must be replaced.
    pub id: PetId,
    /// Display name.
    pub name: String,
    /// Texture identifier; namespaced textures are never spun.
    pub texture: String,
    /// The owner's level in this pet.
    pub level: u32,
}

/// Decides which pet, if any, an actor has equipped.
pub trait PetProvider: Send + Sync {
    /// Active pet of `actor`, `None` if no pet is equipped.
    fn active_pet(&self, actor: ActorId) -> Option<ActivePet>;
}

// ============================================================================
// ENTITY SYSTEM
// ============================================================================

/// The host's physical entity system.
///
/// `spawn` and `is_alive` are called from task threads. The mutating calls
/// are only ever issued by the mutation worker (or by `shutdown`), so an
/// implementation that needs a dedicated thread for mutations can run the
/// worker there.
pub trait EntitySystem: Send + Sync {
    /// Spawns a companion entity for `owner` showing `pet`.
    ///
    /// # Errors
    ///
    /// Returns `SpawnRejected` if the entity cannot be created right now.
    fn spawn(
        &self,
        owner: ActorId,
        pet: &ActivePet,
        world: WorldId,
        pose: Pose,
    ) -> DisplayResult<EntityHandle>;

    /// Returns true while the entity exists.
    fn is_alive(&self, entity: EntityHandle) -> bool;

    /// Sets the floating label.
    fn set_label(&self, entity: EntityHandle, text: &str);

    /// Moves the entity; may complete after the call returns.
    fn move_to(&self, entity: EntityHandle, world: WorldId, position: Vec3);

    /// Sets the body rotation in degrees.
    fn set_rotation(&self, entity: EntityHandle, yaw: f32, pitch: f32);

    /// Removes the entity. Destroying a dead entity is a no-op.
    fn destroy(&self, entity: EntityHandle);
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Body of a repeating task.
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;

/// Cancellable handle to a repeating task.
pub trait TaskHandle: Send + Sync {
    /// Stops future invocations. An invocation already running completes.
    fn cancel(&self);

    /// Returns true once cancelled.
    fn is_cancelled(&self) -> bool;
}

/// Host scheduler that runs callbacks at a fixed tick cadence.
pub trait TaskScheduler: Send + Sync {
    /// Runs `task` for `actor` after `initial_delay` ticks, then every
    /// `period` ticks, until the returned handle is cancelled.
    fn run_repeating(
        &self,
        actor: ActorId,
        initial_delay: u32,
        period: u32,
        task: RepeatingTask,
    ) -> Box<dyn TaskHandle>;
}

// ============================================================================
// TEXT
// ============================================================================

/// Host text formatting (colour codes, extra placeholders).
pub trait TextFormatter: Send + Sync {
    /// Formats an already substituted label for `actor`.
    fn format(&self, text: &str, actor: ActorId) -> String;
}
