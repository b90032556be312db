//! Configuration data for battles.
//!
//! Pure data structures deserialized from RON: ship classes, the
//! technology table and the battle setup. Nothing here performs IO;
//! hosts read files and pass the text to the `from_ron_str` constructors.

mod battle;
mod ship_class;
mod tech;

pub use battle::{
    BattleSetup, Difficulty, MapSize, ObstacleBounds, Obstruction, VictoryCondition,
};
pub use ship_class::{
    CritComponents, Geometry, Hull, Naming, Refresh, ShipCatalog, ShipClass, SpeedParams,
    TurretMount,
};
pub use tech::{TechKind, TechLevels, TechTable, MAX_TECH_LEVEL};
