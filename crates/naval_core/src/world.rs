//! The battle world: ship registry, projectiles, islands and spatial queries.
//!
//! The world is the context every tick subscriber runs against. It owns
//! the occupancy grid (read-only once ships exist), the ships (which own
//! their turrets) and the shells in flight. Cross references between
//! entities are [`ShipId`]s resolved through the registry, so a removed
//! ship simply stops resolving.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SimConfig;
use crate::data::{ShipCatalog, TechLevels, TechTable};
use crate::error::{Result, SimError};
use crate::ids::{ProjectileId, ShipId};
use crate::map_generation::Island;
use crate::math::{movement_by, segments_intersect, Vec2};
use crate::pathfinding::{Cell, OccupancyGrid};
use crate::projectile::Projectile;
use crate::rng::{self, SimRng};
use crate::ship::Ship;
use crate::side::Side;

/// Radar range floor: concealment never pushes effective range below this.
pub const MIN_DETECTION_RANGE: f64 = 1_000.0;

/// Default ray-march step for line-of-sight checks, in world units.
pub const DEFAULT_LOS_STEP: f64 = 100.0;

/// A volley fired this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolleyEvent {
    /// Firing ship.
    pub ship: ShipId,
    /// Turret index on that ship.
    pub turret: usize,
    /// Shells spawned.
    pub projectiles: Vec<ProjectileId>,
}

/// A radio broadcast sent this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioBroadcast {
    /// Receiving side.
    pub side: Side,
    /// Union of that side's radar contacts.
    pub contacts: Vec<ShipId>,
}

/// Observable side effects of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick number the events belong to.
    pub tick: u64,
    /// Volleys fired.
    pub volleys: Vec<VolleyEvent>,
    /// Shells removed.
    pub projectiles_spent: Vec<ProjectileId>,
    /// Radio broadcasts.
    pub radio_broadcasts: Vec<RadioBroadcast>,
    /// Ships removed since the previous tick.
    pub ships_removed: Vec<ShipId>,
}

impl TickEvents {
    /// True when nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volleys.is_empty()
            && self.projectiles_spent.is_empty()
            && self.radio_broadcasts.is_empty()
            && self.ships_removed.is_empty()
    }
}

/// Ship storage with deterministic iteration.
///
/// Uses a `HashMap` for lookup, with deterministic iteration via sorted
/// ids whenever ships are processed.
#[derive(Debug, Clone, Default)]
pub struct ShipRegistry {
    ships: HashMap<ShipId, Ship>,
    next_id: u32,
}

impl ShipRegistry {
    /// Create an empty registry. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ships: HashMap::new(),
            next_id: 1,
        }
    }

    /// Reserve the next id.
    pub fn allocate_id(&mut self) -> ShipId {
        let id = ShipId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a ship under its own id.
    pub fn insert(&mut self, ship: Ship) {
        self.ships.insert(ship.id(), ship);
    }

    /// Remove a ship.
    pub fn remove(&mut self, id: ShipId) -> Option<Ship> {
        self.ships.remove(&id)
    }

    /// Get a ship.
    #[must_use]
    pub fn get(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(&id)
    }

    /// Get a ship mutably.
    pub fn get_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.get_mut(&id)
    }

    /// Check whether a ship exists.
    #[must_use]
    pub fn contains(&self, id: ShipId) -> bool {
        self.ships.contains_key(&id)
    }

    /// Number of ships.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ships.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Ids in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<ShipId> {
        let mut ids: Vec<_> = self.ships.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Ships in ascending id order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &Ship> {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.ships.get(&id))
    }

    /// Number of ships on a side.
    #[must_use]
    pub fn count_side(&self, side: Side) -> usize {
        self.ships.values().filter(|s| s.side() == side).count()
    }
}

/// The battle world.
#[derive(Debug, Clone)]
pub struct World {
    config: SimConfig,
    catalog: ShipCatalog,
    tech_table: TechTable,
    pub(crate) grid: OccupancyGrid,
    islands: Vec<Island>,
    pub(crate) ships: ShipRegistry,
    pub(crate) projectiles: Vec<Projectile>,
    next_projectile: u64,
    pub(crate) rng: SimRng,
    tick: u64,
    pub(crate) events: TickEvents,
    removed: Vec<ShipId>,
}

impl World {
    /// Create a world over a grid.
    #[must_use]
    pub fn new(
        config: SimConfig,
        catalog: ShipCatalog,
        tech_table: TechTable,
        grid: OccupancyGrid,
        islands: Vec<Island>,
    ) -> Self {
        let rng = rng::seeded(config.seed);
        Self {
            config,
            catalog,
            tech_table,
            grid,
            islands,
            ships: ShipRegistry::new(),
            projectiles: Vec::new(),
            next_projectile: 1,
            rng,
            tick: 0,
            events: TickEvents::default(),
            removed: Vec::new(),
        }
    }

    /// Simulation settings.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Ship classes.
    #[must_use]
    pub const fn catalog(&self) -> &ShipCatalog {
        &self.catalog
    }

    /// Technology table.
    #[must_use]
    pub const fn tech_table(&self) -> &TechTable {
        &self.tech_table
    }

    /// Occupancy grid.
    #[must_use]
    pub const fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Islands.
    #[must_use]
    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    /// Replace the map. Only allowed while no ship exists, since ships
    /// keep pathfinders built from the grid.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] if ships have been spawned.
    pub fn replace_map(&mut self, grid: OccupancyGrid, islands: Vec<Island>) -> Result<()> {
        if !self.ships.is_empty() {
            return Err(SimError::InvalidInput(
                "map cannot change once ships are spawned".into(),
            ));
        }
        self.grid = grid;
        self.islands = islands;
        Ok(())
    }

    /// Scene size in world units as `(width, height)`.
    #[must_use]
    pub fn scene_size(&self) -> (f64, f64) {
        (self.grid.world_width(), self.grid.world_height())
    }

    /// Playable rectangle as `(top_left, bottom_right)` in world units.
    #[must_use]
    pub fn inner_bounds(&self) -> (Vec2, Vec2) {
        let inner = self.grid.inner();
        (
            self.grid.cell_to_world(inner.row, inner.col),
            self.grid.cell_to_world(inner.row_end(), inner.col_end()),
        )
    }

    /// Ticks completed.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Ship registry.
    #[must_use]
    pub const fn ships(&self) -> &ShipRegistry {
        &self.ships
    }

    /// Look up a ship.
    #[must_use]
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(id)
    }

    /// Look up a ship mutably.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ShipNotFound`] if the id does not resolve.
    pub fn ship_mut(&mut self, id: ShipId) -> Result<&mut Ship> {
        self.ships.get_mut(id).ok_or(SimError::ShipNotFound(id))
    }

    /// Shells in flight, oldest first.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Check that a point is inside the playable area and on open water.
    ///
    /// # Errors
    ///
    /// [`SimError::PointOutsideMap`] or [`SimError::PositionObstructed`].
    pub fn check_open_water(&self, point: Vec2) -> Result<()> {
        if !self.grid.is_point_inside(point) {
            return Err(SimError::PointOutsideMap {
                x: point.x,
                y: point.y,
            });
        }
        if !self.grid.is_point_traversable(point) {
            return Err(SimError::PositionObstructed {
                x: point.x,
                y: point.y,
            });
        }
        Ok(())
    }

    /// Register a new ship.
    ///
    /// # Errors
    ///
    /// - [`SimError::UnknownShipClass`] for an unknown tag
    /// - [`SimError::PointOutsideMap`] / [`SimError::PositionObstructed`]
    ///   for a bad position
    pub fn add_ship(
        &mut self,
        class: &str,
        side: Side,
        center: Vec2,
        heading: f64,
        techs: TechLevels,
    ) -> Result<ShipId> {
        let class = self.catalog.get(class)?;
        self.check_open_water(center)?;

        let id = self.ships.allocate_id();
        let ship = Ship::new(
            id,
            class,
            side,
            center,
            heading,
            techs,
            &self.tech_table,
            &self.config,
            &self.grid,
        );
        debug!(ship = %id, class = class.tag(), side = side.display_name(), "Ship added");
        self.ships.insert(ship);
        Ok(id)
    }

    /// Remove a ship. References to it clear on the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ShipNotFound`] if the id does not resolve.
    pub fn remove_ship(&mut self, id: ShipId) -> Result<Ship> {
        let ship = self.ships.remove(id).ok_or(SimError::ShipNotFound(id))?;
        self.removed.push(id);
        Ok(ship)
    }

    pub(crate) fn spawn_projectile(&mut self, make: impl FnOnce(ProjectileId) -> Projectile) -> ProjectileId {
        let id = ProjectileId(self.next_projectile);
        self.next_projectile += 1;
        self.projectiles.push(make(id));
        id
    }

    /// Remove shells by id in one pass; the hook spent shells go through.
    ///
    /// Survivors keep their flight order. Returns how many were removed.
    pub fn remove_projectiles(&mut self, ids: &[ProjectileId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let spent: BTreeSet<ProjectileId> = ids.iter().copied().collect();
        let before = self.projectiles.len();
        self.projectiles.retain(|p| !spent.contains(&p.id()));
        before - self.projectiles.len()
    }

    /// Whether `observer` sees `target` by radar.
    ///
    /// Effective range shrinks with the target's concealment toward
    /// [`MIN_DETECTION_RANGE`]; with `los_blocks_detection` the straight
    /// line between them must also clear every island.
    #[must_use]
    pub fn can_detect(&self, observer: &Ship, target: &Ship) -> bool {
        let range = observer.detection_range();
        let effective = range - (range - MIN_DETECTION_RANGE) * target.concealment();
        if observer.center().distance(target.center()) > effective {
            return false;
        }
        !self.config.los_blocks_detection || self.has_clear_line(observer.center(), target.center())
    }

    /// Enemy ships `observer` sees by radar, in id order.
    #[must_use]
    pub fn ships_in_detection_range(&self, observer: &Ship) -> Vec<ShipId> {
        self.ships
            .iter_sorted()
            .filter(|other| other.id() != observer.id() && other.side() != observer.side())
            .filter(|other| self.can_detect(observer, other))
            .map(Ship::id)
            .collect()
    }

    /// Coarse line of sight: march from `a` to `b` in `step` increments
    /// and fail on the first sample inside an island cell.
    #[must_use]
    pub fn is_in_line_of_sight(&self, a: Vec2, b: Vec2, step: f64) -> bool {
        let length = a.distance(b);
        let step = if step > 0.0 { step } else { DEFAULT_LOS_STEP };
        let samples = (length / step).ceil() as usize;
        (0..=samples).all(|k| {
            let t = if samples == 0 {
                0.0
            } else {
                k as f64 / samples as f64
            };
            let point = a + (b - a) * t;
            self.cell_at(point) != Some(Cell::Island)
        })
    }

    /// Distance along a ray to the first island, or `None` within `distance`.
    ///
    /// Marching starts `offset` units from `origin`, so a ray cast from a
    /// ship can skip its own hull.
    #[must_use]
    pub fn detection_ray(
        &self,
        origin: Vec2,
        angle: f64,
        distance: f64,
        step: f64,
        offset: f64,
    ) -> Option<f64> {
        let step = if step > 0.0 { step } else { DEFAULT_LOS_STEP };
        let mut travelled = offset.max(0.0);
        while travelled <= distance {
            let point = movement_by(origin, travelled, angle);
            match self.cell_at(point) {
                Some(Cell::Island) => return Some(travelled),
                None => return None,
                Some(_) => {}
            }
            travelled += step;
        }
        None
    }

    /// Exact line of sight against island polygons.
    #[must_use]
    pub fn has_clear_line(&self, a: Vec2, b: Vec2) -> bool {
        self.islands.iter().all(|island| {
            !island.contains_point(a)
                && !island.contains_point(b)
                && island
                    .edges()
                    .all(|(c, d)| !segments_intersect(a, b, c, d))
        })
    }

    fn cell_at(&self, point: Vec2) -> Option<Cell> {
        self.grid
            .world_to_cell(point)
            .and_then(|(row, col)| self.grid.get(row, col))
    }

    /// Start a tick: clear references to removed ships.
    ///
    /// Safe to call again before [`World::end_tick`]; later removals are
    /// appended to the same tick's events.
    pub(crate) fn begin_tick(&mut self) {
        self.events.tick = self.tick;
        if self.removed.is_empty() {
            return;
        }
        self.events.ships_removed.append(&mut self.removed);
        let alive = self.ships.sorted_ids();
        for id in &alive {
            if let Some(ship) = self.ships.get_mut(*id) {
                ship.forget_missing(|other| alive.binary_search(&other).is_ok());
            }
        }
    }

    /// Finish a tick and hand back its events.
    pub(crate) fn end_tick(&mut self) -> TickEvents {
        self.tick += 1;
        std::mem::take(&mut self.events)
    }
}
