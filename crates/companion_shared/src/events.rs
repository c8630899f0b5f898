//! Lifecycle events delivered by the host's event bus.
//!
//! The display engine reacts to these; it never produces them.

use crate::ids::{ActorId, WorldId};
use crate::math::Vec3;
use serde::{Deserialize, Serialize};

/// Event type discriminator
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// Actor connected
    Join = 0,
    /// Actor disconnected
    Quit = 1,
    /// Actor teleported
    Teleport = 2,
    /// Actor moved to another world
    WorldChange = 3,
}

/// Actor lifecycle signals
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// Actor connected
    Join {
        /// Affected actor
        actor: ActorId,
    },

    /// Actor disconnected
    Quit {
        /// Affected actor
        actor: ActorId,
    },

    /// Actor teleported inside or across worlds
    Teleport {
        /// Affected actor
        actor: ActorId,
        /// Position before the teleport
        from: Vec3,
        /// Position after the teleport
        to: Vec3,
    },

    /// Actor changed world
    WorldChange {
        /// Affected actor
        actor: ActorId,
        /// World left
        from: WorldId,
        /// World entered
        to: WorldId,
    },
}

impl LifecycleEvent {
    /// Returns the event type
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Join { .. } => EventType::Join,
            Self::Quit { .. } => EventType::Quit,
            Self::Teleport { .. } => EventType::Teleport,
            Self::WorldChange { .. } => EventType::WorldChange,
        }
    }

    /// Returns the actor this event is about
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        match self {
            Self::Join { actor }
            | Self::Quit { actor }
            | Self::Teleport { actor, .. }
            | Self::WorldChange { actor, .. } => *actor,
        }
    }
}
