//! # Companion Shared
//!
//! Common types used by the display engine and by every collaborator that
//! plugs into it (actor registry, pet provider, entity system).
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - threads, channels or locks
//! - any concrete entity system
//!
//! If you need runtime machinery, put it in `companion_display`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod events;
pub mod ids;
pub mod math;

pub use constants::{
    BOB_AMPLITUDE, BOB_FREQUENCY, DEFAULT_INITIAL_DELAY, DEFAULT_TICK_PERIOD,
    MIN_HORIZONTAL_OFFSET, SIDE_ANGLE_DEGREES, SPIN_DEGREES, TEXTURE_NAMESPACE_SEPARATOR,
};
pub use events::{EventType, LifecycleEvent};
pub use ids::{ActorId, EntityHandle, PetId, WorldId};
pub use math::Vec3;
