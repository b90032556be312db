//! Test fixtures and helpers.
//!
//! Pre-built ship classes, catalogs and battles for consistent testing.
//! All fixtures use the 20 km sea with a 0.25 border and 500-unit cells,
//! so the playable rectangle spans `[5000, 25000]` on both axes.

use naval_core::data::{
    CritComponents, Geometry, Hull, Naming, Refresh, ShipCatalog, ShipClass, SpeedParams,
    TechLevels, TechTable, TurretMount,
};
use naval_core::fleet::{compose, DoctrineTable};
use naval_core::prelude::*;
use naval_core::turret::TurretSize;

/// Playable extent of fixture seas.
pub const SEA_SIZE: u32 = 20_000;
/// Border ratio of fixture seas.
pub const SEA_EXTENSION: f64 = 0.25;
/// Cell size of fixture seas.
pub const CELL_SIZE: u32 = 500;

/// A ship class with explicit handling and the given turrets at the bow.
#[must_use]
pub fn test_class(
    tag: &str,
    max_speed: f64,
    max_accel: f64,
    turn_rate: f64,
    turrets: &[TurretSize],
) -> ShipClass {
    ShipClass {
        naming: Naming {
            tag: tag.to_string(),
            name: format!("Test {tag}"),
        },
        geometry: Geometry {
            width: 300.0,
            height: 50.0,
        },
        hull: Hull {
            max_hp: 1_000.0,
            armor: 0.0,
            max_shield: 0.0,
            max_speed,
            max_accel,
            turn_rate,
            concealment: 0.0,
            detection_range: 10_000.0,
        },
        weapons: turrets
            .iter()
            .map(|size| TurretMount {
                size: *size,
                offset: Vec2::ZERO,
            })
            .collect(),
        techs: TechLevels::default(),
        refresh: Refresh::default(),
        crit_components: CritComponents::default(),
        speed_params: SpeedParams::default(),
        cost: 100,
    }
}

/// The default catalog plus two test classes:
/// - `scout`: speed 9, accel 0.5, turn 0.13, unarmed
/// - `gunboat`: speed 9, accel 0.5, turn 0.13, one large turret
#[must_use]
pub fn test_catalog() -> ShipCatalog {
    let mut catalog = ShipCatalog::default();
    catalog.classes.push(test_class("scout", 9.0, 0.5, 0.13, &[]));
    catalog
        .classes
        .push(test_class("gunboat", 9.0, 0.5, 0.13, &[TurretSize::Large]));
    catalog
}

/// Open sea using [`test_catalog`] and `config`.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn open_sea_with(config: SimConfig) -> Simulation {
    let map = MapConfig {
        playable_width: SEA_SIZE,
        playable_height: SEA_SIZE,
        extension_ratio: SEA_EXTENSION,
        cell_size: CELL_SIZE,
        max_obstruction: 0.0,
        ..MapConfig::default()
    };
    Simulation::from_parts(config, &map, test_catalog(), TechTable::default())
        .expect("fixture configuration is valid")
}

/// Open sea with default settings and [`test_catalog`].
#[must_use]
pub fn open_sea() -> Simulation {
    open_sea_with(SimConfig::default())
}

/// Seeded island map with default settings and [`test_catalog`].
///
/// # Panics
///
/// Panics if map generation rejects the configuration.
#[must_use]
pub fn island_sea(seed: u64, obstruction: f64) -> Simulation {
    let mut sim = open_sea();
    sim.generate_map(
        MapConfig::default()
            .with_seed(seed)
            .with_max_obstruction(obstruction),
    )
    .expect("fixture map configuration is valid");
    sim
}

/// Spawn at `preferred`, or at the first open-water point stepping
/// `step` along +y from it.
///
/// # Panics
///
/// Panics if no open water is found within 40 steps.
pub fn spawn_near(
    sim: &mut Simulation,
    class: &str,
    side: Side,
    preferred: Vec2,
    step: f64,
) -> ShipId {
    (0..40)
        .map(|i| preferred + Vec2::new(0.0, step * f64::from(i)))
        .find_map(|position| sim.spawn_ship(class, side, position, TechLevels::default()).ok())
        .expect("open water near the preferred spawn point")
}

/// Two ships `distance` apart on the same row, ally west of enemy.
///
/// # Panics
///
/// Panics if either class is unknown or the positions leave the sea.
pub fn duel(ally: &str, enemy: &str, distance: f64) -> (Simulation, ShipId, ShipId) {
    let mut sim = open_sea();
    let a = sim
        .spawn_ship(ally, Side::Ally, Vec2::new(7_500.0, 15_000.0), TechLevels::default())
        .expect("ally spawn");
    let e = sim
        .spawn_ship(
            enemy,
            Side::Enemy,
            Vec2::new(7_500.0 + distance, 15_000.0),
            TechLevels::default(),
        )
        .expect("enemy spawn");
    (sim, a, e)
}

/// A full battle: seeded islands, a balanced fleet per side deployed
/// on opposite edges and ordered across the map. The clock is started.
///
/// # Panics
///
/// Panics if the default doctrine table or catalog cannot compose a fleet.
#[must_use]
pub fn skirmish(seed: u64) -> Simulation {
    let mut sim = island_sea(seed, 0.05);
    let doctrines = DoctrineTable::default();
    let doctrine = doctrines.get("balanced").expect("balanced doctrine");

    let fronts = [(Side::Ally, 6_000.0, 22_000.0), (Side::Enemy, 24_000.0, 8_000.0)];
    for (side, x, goal_x) in fronts {
        let plan = compose(3_000, doctrine, sim.world().catalog(), sim.world().tech_table())
            .expect("fleet plan");
        let mut y = 6_000.0;
        for planned in &plan.ships {
            let id = spawn_near(&mut sim, &planned.class, side, Vec2::new(x, y), 500.0);
            let spawned_y = sim.world().ship(id).map_or(y, |s| s.center().y);
            // Unreachable goals just leave the ship idle
            let _ = sim.set_destination(id, Vec2::new(goal_x, spawned_y));
            y = spawned_y + 1_500.0;
        }
    }

    sim.start();
    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_valid() {
        let catalog = test_catalog();
        assert!(catalog.validate().is_ok());
        assert!(catalog.get("scout").is_ok());
        assert_eq!(catalog.get("gunboat").unwrap().weapons.len(), 1);
    }

    #[test]
    fn test_skirmish_has_both_sides() {
        let sim = skirmish(9);
        let state = sim.query_state();
        assert!(state.side(Side::Ally).count() > 0);
        assert!(state.side(Side::Enemy).count() > 0);
        assert!(sim.is_running());
    }
}
