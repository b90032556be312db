//! Battle simulation: the command interface hosts drive.
//!
//! A [`Simulation`] owns the [`World`] and the [`Clock`] whose
//! subscribers update it. Every tick runs, in order:
//! 1. radio relay
//! 2. ships (replan, radar, target lock, movement)
//! 3. turrets (fire control, volleys)
//! 4. projectiles (flight, removal)
//!
//! # Determinism
//!
//! - All randomness comes from seeded [`crate::rng::SimRng`]s
//! - Ships are processed in ascending id order
//! - The same commands at the same ticks give the same [`Simulation::state_hash`]
//!
//! # Example
//!
//! ```
//! use naval_core::prelude::*;
//!
//! let mut sim = Simulation::new_game(20_000, 20_000, 0.25, 500).unwrap();
//! let ship = sim
//!     .spawn_ship("dd", Side::Ally, Vec2::new(7_500.0, 7_500.0), TechLevels::default())
//!     .unwrap();
//! sim.set_destination(ship, Vec2::new(12_500.0, 7_500.0)).unwrap();
//!
//! sim.start();
//! for _ in 0..100 {
//!     sim.tick();
//! }
//! assert!(sim.query_state().ships[0].center.x > 7_500.0);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::Clock;
use crate::config::SimConfig;
use crate::data::{ShipCatalog, TechLevels, TechTable, VictoryCondition};
use crate::error::{Result, SimError};
use crate::fleet::FleetPlan;
use crate::ids::ShipId;
use crate::map_generation::{MapConfig, MapGenerator, MapReport};
use crate::math::Vec2;
use crate::projectile::ShellType;
use crate::radio::RadioRelay;
use crate::ship::SpeedOrder;
use crate::side::Side;
use crate::snapshot::{BattleSnapshot, ShipStats};
use crate::systems::{ProjectileSystem, ShipSystem, TurretSystem};
use crate::world::{TickEvents, World};

/// Battle result so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Still being fought.
    Ongoing,
    /// One side won.
    Victory(Side),
    /// Nobody won.
    Draw,
}

/// A running battle.
#[derive(Debug)]
pub struct Simulation {
    clock: Clock<World>,
    world: World,
}

impl Simulation {
    /// Start a battle on open sea with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] for a bad area or cell size.
    pub fn new_game(
        playable_width: u32,
        playable_height: u32,
        extension_ratio: f64,
        cell_size: u32,
    ) -> Result<Self> {
        let map = MapConfig {
            playable_width,
            playable_height,
            extension_ratio,
            cell_size,
            max_obstruction: 0.0,
            ..MapConfig::default()
        };
        Self::from_parts(
            SimConfig::default(),
            &map,
            ShipCatalog::default(),
            TechTable::default(),
        )
    }

    /// Start a battle on open sea sized by `map`.
    ///
    /// Islands are placed separately with [`Simulation::generate_map`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] when any configuration is invalid.
    pub fn from_parts(
        config: SimConfig,
        map: &MapConfig,
        catalog: ShipCatalog,
        tech_table: TechTable,
    ) -> Result<Self> {
        config.validate()?;
        catalog.validate()?;
        let grid = map.empty_grid()?;

        let mut clock = Clock::new(config.tick_period());
        clock.subscribe(Box::new(RadioRelay::new(config.radio_rate)));
        clock.subscribe(Box::new(ShipSystem));
        clock.subscribe(Box::new(TurretSystem));
        clock.subscribe(Box::new(ProjectileSystem));

        info!(
            width = map.playable_width,
            height = map.playable_height,
            cell_size = map.cell_size,
            rows = grid.rows(),
            cols = grid.cols(),
            "New game"
        );
        let world = World::new(config, catalog, tech_table, grid, Vec::new());
        Ok(Self { clock, world })
    }

    /// Replace the map with freshly generated islands.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] for an invalid configuration or
    /// once ships have been spawned.
    pub fn generate_map(&mut self, config: MapConfig) -> Result<MapReport> {
        if !self.world.ships().is_empty() {
            return Err(SimError::InvalidInput(
                "map cannot change once ships are spawned".into(),
            ));
        }
        let mut generator = MapGenerator::new(config)?;
        let report = generator.generate();
        let (grid, islands) = generator.into_parts();
        self.world.replace_map(grid, islands)?;
        Ok(report)
    }

    // ---- Ships ----

    /// Spawn a ship. Allies face east, enemies west.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownShipClass`], [`SimError::PointOutsideMap`] or
    /// [`SimError::PositionObstructed`]; nothing is spawned on error.
    pub fn spawn_ship(
        &mut self,
        class: &str,
        side: Side,
        position: Vec2,
        techs: TechLevels,
    ) -> Result<ShipId> {
        let heading = match side {
            Side::Ally => 0.0,
            Side::Enemy => 180.0,
        };
        self.world.add_ship(class, side, position, heading, techs)
    }

    /// Spawn every ship of a plan in a column starting at `anchor`,
    /// `spacing` apart along +y.
    ///
    /// # Errors
    ///
    /// Returns the first spawn error; ships placed before it remain.
    pub fn deploy_fleet(
        &mut self,
        side: Side,
        plan: &FleetPlan,
        anchor: Vec2,
        spacing: f64,
    ) -> Result<Vec<ShipId>> {
        let ids = plan
            .ships
            .iter()
            .enumerate()
            .map(|(i, planned)| {
                let position = anchor + Vec2::new(0.0, spacing * i as f64);
                self.spawn_ship(&planned.class, side, position, planned.techs)
            })
            .collect::<Result<Vec<_>>>()?;
        info!(side = side.display_name(), ships = ids.len(), "Fleet deployed");
        Ok(ids)
    }

    /// Remove a ship, e.g. when a host decides it was destroyed.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ShipNotFound`] for an unknown id.
    pub fn remove_ship(&mut self, id: ShipId) -> Result<()> {
        self.world.remove_ship(id)?;
        info!(ship = %id, "Ship removed");
        Ok(())
    }

    // ---- Clock ----

    /// Start ticking.
    pub fn start(&mut self) {
        self.clock.start();
        info!(tick = self.world.tick(), "Battle started");
    }

    /// Toggle between running and paused.
    pub fn pause(&mut self) {
        if self.clock.is_running() {
            self.clock.stop();
            info!(tick = self.world.tick(), "Battle paused");
        } else {
            self.start();
        }
    }

    /// Check if the clock is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Run one tick. Returns empty events while paused.
    pub fn tick(&mut self) -> TickEvents {
        if !self.clock.is_running() {
            return TickEvents {
                tick: self.world.tick(),
                ..TickEvents::default()
            };
        }
        self.world.begin_tick();
        self.clock.tick(&mut self.world);
        let events = self.world.end_tick();

        #[cfg(debug_assertions)]
        tracing::debug!(tick = events.tick, hash = self.state_hash(), "Tick");

        events
    }

    /// Feed wall-clock time; runs every tick that became due.
    pub fn pump(&mut self, dt: Duration) -> Vec<TickEvents> {
        let mut all = Vec::new();
        self.world.begin_tick();
        self.clock.pump(&mut self.world, dt, |world| {
            all.push(world.end_tick());
            world.begin_tick();
        });
        all
    }

    // ---- Commands ----

    /// Route a ship to `point`.
    ///
    /// # Errors
    ///
    /// - [`SimError::ShipNotFound`] for an unknown ship
    /// - [`SimError::PointOutsideMap`] / [`SimError::PositionObstructed`]
    ///   for a bad point
    /// - [`SimError::NoPath`] when no route exists; the ship keeps no route
    pub fn set_destination(&mut self, ship: ShipId, point: Vec2) -> Result<()> {
        self.world.check_open_water(point)?;
        self.world.ship_mut(ship)?.set_destination(point)
    }

    /// Choose a target for a ship, or return it to automatic selection.
    ///
    /// # Errors
    ///
    /// [`SimError::ShipNotFound`] for an unknown id, [`SimError::InvalidInput`]
    /// when the target is on the same side.
    pub fn select_target(&mut self, ship: ShipId, target: Option<ShipId>) -> Result<()> {
        let side = self.ship_side(ship)?;
        if let Some(target) = target {
            if self.ship_side(target)? == side {
                return Err(SimError::InvalidInput(format!(
                    "{target} is on the same side as {ship}"
                )));
            }
        }
        self.world.ship_mut(ship)?.select_target(target);
        Ok(())
    }

    /// Set or clear a ship's engine order override.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ShipNotFound`] for an unknown id.
    pub fn set_speed_override(&mut self, ship: ShipId, order: Option<SpeedOrder>) -> Result<()> {
        self.world.ship_mut(ship)?.set_speed_override(order);
        Ok(())
    }

    /// Load every turret of a ship with `shell`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ShipNotFound`] for an unknown id.
    pub fn set_shell_type(&mut self, ship: ShipId, shell: ShellType) -> Result<()> {
        for turret in self.world.ship_mut(ship)?.turrets_mut() {
            turret.set_shell_type(shell);
        }
        Ok(())
    }

    fn ship_side(&self, id: ShipId) -> Result<Side> {
        self.world
            .ship(id)
            .map(crate::ship::Ship::side)
            .ok_or(SimError::ShipNotFound(id))
    }

    // ---- Queries ----

    /// The world, read-only.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Ticks completed.
    #[must_use]
    pub const fn elapsed(&self) -> u64 {
        self.world.tick()
    }

    /// Snapshot of every ship and shell.
    #[must_use]
    pub fn query_state(&self) -> BattleSnapshot {
        BattleSnapshot::capture(&self.world, self.clock.is_running())
    }

    /// Detailed stats of one ship.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ShipNotFound`] for an unknown id.
    pub fn ship_stats(&self, id: ShipId) -> Result<ShipStats> {
        self.world
            .ship(id)
            .map(ShipStats::from)
            .ok_or(SimError::ShipNotFound(id))
    }

    /// Battle result under the configured victory condition.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        let ships = self.world.ships();
        let (allies, enemies) = (ships.count_side(Side::Ally), ships.count_side(Side::Enemy));
        match (allies, enemies) {
            (0, 0) => return Outcome::Draw,
            (0, _) => return Outcome::Victory(Side::Enemy),
            (_, 0) => return Outcome::Victory(Side::Ally),
            _ => {}
        }
        match self.world.config().victory {
            VictoryCondition::TimeLimit { ticks } if self.world.tick() >= ticks => {
                match allies.cmp(&enemies) {
                    std::cmp::Ordering::Greater => Outcome::Victory(Side::Ally),
                    std::cmp::Ordering::Less => Outcome::Victory(Side::Enemy),
                    std::cmp::Ordering::Equal => Outcome::Draw,
                }
            }
            _ => Outcome::Ongoing,
        }
    }

    /// Hash of the battle state for determinism checks.
    ///
    /// Two simulations fed the same commands produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.world.tick().hash(&mut hasher);

        let ships = self.world.ships();
        ships.len().hash(&mut hasher);
        for ship in ships.iter_sorted() {
            ship.id().hash(&mut hasher);
            ship.center().x.to_bits().hash(&mut hasher);
            ship.center().y.to_bits().hash(&mut hasher);
            ship.heading().to_bits().hash(&mut hasher);
            ship.speed().to_bits().hash(&mut hasher);
            ship.target().hash(&mut hasher);
            for turret in ship.turrets() {
                turret.azimuth().to_bits().hash(&mut hasher);
                turret.reload_remaining().hash(&mut hasher);
            }
        }

        let projectiles = self.world.projectiles();
        projectiles.len().hash(&mut hasher);
        for shell in projectiles {
            shell.id().hash(&mut hasher);
            shell.position().x.to_bits().hash(&mut hasher);
            shell.position().y.to_bits().hash(&mut hasher);
            shell.speed().to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }
}
