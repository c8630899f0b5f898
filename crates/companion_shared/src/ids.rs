//! Identifiers handed between the engine and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Connected actor (player session).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// World (dimension) an actor lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldId(pub u32);

/// Opaque reference to a physical entity spawned by the entity system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle(pub u64);

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Identity of a logical pet.
///
/// Two companions represent the same pet iff their `PetId`s are equal.
/// Cloning is a reference-count bump.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PetId(Arc<str>);

impl PetId {
    /// Creates a pet identity from its key.
    #[must_use]
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Returns the pet key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PetId {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}
