//! Stable identifiers for battle entities.
//!
//! Cross references between entities (turret to target, ship to
//! detected contacts) are held as ids into the world registries, never
//! as references. A lookup that fails means the entity was removed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a ship within one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShipId(pub u32);

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ship#{}", self.0)
    }
}

/// Unique identifier for a projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectileId(pub u64);

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shell#{}", self.0)
    }
}
