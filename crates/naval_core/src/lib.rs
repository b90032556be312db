//! # Naval Core
//!
//! Deterministic simulation kernel for top-down naval battles.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO; configuration arrives as RON strings
//! - No system randomness; every draw comes from a seeded generator
//!
//! This separation enables:
//! - Headless hosts and batch runs
//! - Determinism testing via [`simulation::Simulation::state_hash`]
//! - Renderers that consume read-only [`snapshot`]s
//!
//! ## Crate Structure
//!
//! - [`math`] - Angles, kinematics and segment geometry
//! - [`priority_queue`] - Indexed binary max-heap
//! - [`pathfinding`] - Occupancy grid and A*
//! - [`map_generation`] - Island placement
//! - [`ship`], [`turret`], [`projectile`] - Battle entities
//! - [`world`], [`radio`], [`systems`] - Per-tick behaviour
//! - [`clock`] - Tick dispatcher
//! - [`fleet`] - Fleet composition from funds and doctrines
//! - [`simulation`] - Command interface

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod fleet;
pub mod ids;
pub mod map_generation;
pub mod math;
pub mod pathfinding;
pub mod priority_queue;
pub mod projectile;
pub mod radio;
pub mod rng;
pub mod ship;
pub mod side;
pub mod simulation;
pub mod snapshot;
pub mod systems;
pub mod turret;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SimConfig;
    pub use crate::data::{
        BattleSetup, ShipCatalog, ShipClass, TechKind, TechLevels, TechTable, VictoryCondition,
    };
    pub use crate::error::{Result, SimError};
    pub use crate::fleet::{compose, Doctrine, DoctrineTable, FleetPlan};
    pub use crate::ids::{ProjectileId, ShipId};
    pub use crate::map_generation::{MapConfig, MapReport};
    pub use crate::math::Vec2;
    pub use crate::projectile::{ShellSize, ShellType};
    pub use crate::ship::SpeedOrder;
    pub use crate::side::Side;
    pub use crate::simulation::{Outcome, Simulation};
    pub use crate::snapshot::{BattleSnapshot, ShipSnapshot, ShipStats};
    pub use crate::world::TickEvents;
}
