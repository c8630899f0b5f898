//! # Integration Layer
//!
//! Everything the engine needs from the host, expressed as traits.
//!
//! ## Architecture (Glass Walls Policy)
//!
//! The engine never reaches into the host's entity system, session registry
//! or scheduler. The host implements the traits in [`traits`]; tests and
//! benchmarks use the in-memory versions in [`mock`].

pub mod mock;
pub mod traits;

pub use mock::{MockActorRegistry, MockEntity, MockEntitySystem, MockPetProvider, PlainTextFormatter};
pub use traits::{
    ActivePet, ActorRegistry, ActorView, EntitySystem, PetProvider, RepeatingTask, TaskHandle,
    TaskScheduler, TextFormatter,
};
