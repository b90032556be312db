//! Procedural island placement.
//!
//! Builds the scene grid (playable area plus a `Border` band) and fills
//! the playable part with axis-aligned rectangular islands:
//! - random size within configured cell bounds
//! - top-left inside the playable rectangle, clipped to it
//! - rejected when the rectangle grown by the minimum spacing touches
//!   an existing island
//!
//! Generation stops at the obstruction target or the iteration cap.
//! Hitting the cap is reported in [`MapReport::saturated`], not as an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SimError};
use crate::math::Vec2;
use crate::pathfinding::{Cell, CellRect, OccupancyGrid};
use crate::rng::{self, SimRng};

/// Map configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Playable width in world units.
    pub playable_width: u32,
    /// Playable height in world units.
    pub playable_height: u32,
    /// Border band on each side as a fraction of the playable size.
    pub extension_ratio: f64,
    /// Cell size in world units.
    pub cell_size: u32,
    /// Target share of playable cells covered by islands, in `[0, 1]`.
    pub max_obstruction: f64,
    /// Minimum island width in cells.
    pub obstacle_min_width: usize,
    /// Maximum island width in cells.
    pub obstacle_max_width: usize,
    /// Minimum island height in cells.
    pub obstacle_min_height: usize,
    /// Maximum island height in cells.
    pub obstacle_max_height: usize,
    /// Minimum free cells between two islands.
    pub min_distance: usize,
    /// Placement attempts before giving up.
    pub max_iterations: u32,
    /// Random seed for deterministic generation.
    pub seed: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            playable_width: 20_000,
            playable_height: 20_000,
            extension_ratio: 0.25,
            cell_size: 500,
            max_obstruction: 0.1,
            obstacle_min_width: 2,
            obstacle_max_width: 6,
            obstacle_min_height: 2,
            obstacle_max_height: 6,
            min_distance: 2,
            max_iterations: 500,
            seed: 12345,
        }
    }
}

impl MapConfig {
    /// 20 km square sea.
    #[must_use]
    pub fn small() -> Self {
        Self::default()
    }

    /// 30 km square sea.
    #[must_use]
    pub fn medium() -> Self {
        Self {
            playable_width: 30_000,
            playable_height: 30_000,
            ..Self::default()
        }
    }

    /// 40 km square sea.
    #[must_use]
    pub fn large() -> Self {
        Self {
            playable_width: 40_000,
            playable_height: 40_000,
            obstacle_max_width: 8,
            obstacle_max_height: 8,
            ..Self::default()
        }
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the obstruction target.
    #[must_use]
    pub fn with_max_obstruction(mut self, ratio: f64) -> Self {
        self.max_obstruction = ratio.clamp(0.0, 1.0);
        self
    }

    /// Playable size in cells as `(rows, cols)`.
    #[must_use]
    pub fn playable_cells(&self) -> (usize, usize) {
        let size = self.cell_size.max(1);
        (
            (self.playable_height / size) as usize,
            (self.playable_width / size) as usize,
        )
    }

    /// Border band thickness in cells as `(rows, cols)`.
    #[must_use]
    pub fn border_cells(&self) -> (usize, usize) {
        let size = f64::from(self.cell_size.max(1));
        let band = |extent: u32| (self.extension_ratio * f64::from(extent) / size).ceil() as usize;
        (band(self.playable_height), band(self.playable_width))
    }

    /// Check the configuration for values generation cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SimError::InvalidInput(msg.to_string()));

        if self.cell_size == 0 {
            return invalid("cell_size must be positive");
        }
        if self.playable_width == 0 || self.playable_height == 0 {
            return invalid("playable area must be non-empty");
        }
        if self.playable_width % self.cell_size != 0 || self.playable_height % self.cell_size != 0
        {
            return invalid("playable area must be a multiple of cell_size");
        }
        if !(0.0..=1.0).contains(&self.max_obstruction) {
            return invalid("max_obstruction must lie in [0, 1]");
        }
        if !(self.extension_ratio >= 0.0 && self.extension_ratio.is_finite()) {
            return invalid("extension_ratio must be a non-negative number");
        }
        if self.obstacle_min_width == 0 || self.obstacle_min_height == 0 {
            return invalid("obstacle sizes must be at least one cell");
        }
        if self.obstacle_min_width > self.obstacle_max_width
            || self.obstacle_min_height > self.obstacle_max_height
        {
            return invalid("obstacle minimum size exceeds maximum");
        }
        Ok(())
    }

    /// Build the empty scene grid: free playable cells inside a `Border` band.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] if the configuration is invalid.
    pub fn empty_grid(&self) -> Result<OccupancyGrid> {
        self.validate()?;
        let (rows, cols) = self.playable_cells();
        let (border_rows, border_cols) = self.border_cells();
        Ok(OccupancyGrid::with_border(
            rows,
            cols,
            border_rows,
            border_cols,
            self.cell_size,
        ))
    }
}

/// A placed island.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Island {
    /// Covered cells.
    pub cells: CellRect,
    /// Corners in world units, clockwise from top-left.
    pub polygon: [Vec2; 4],
}

impl Island {
    /// Build an island from its cell rectangle.
    #[must_use]
    pub fn from_cells(cells: CellRect, cell_size: u32) -> Self {
        let size = f64::from(cell_size);
        let left = cells.col as f64 * size;
        let top = cells.row as f64 * size;
        let right = cells.col_end() as f64 * size;
        let bottom = cells.row_end() as f64 * size;
        Self {
            cells,
            polygon: [
                Vec2::new(left, top),
                Vec2::new(right, top),
                Vec2::new(right, bottom),
                Vec2::new(left, bottom),
            ],
        }
    }

    /// Polygon edges as segment endpoints.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        (0..4).map(move |i| (self.polygon[i], self.polygon[(i + 1) % 4]))
    }

    /// Check if a world point lies inside the island (edges included).
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        let [top_left, _, bottom_right, _] = self.polygon;
        point.x >= top_left.x
            && point.x <= bottom_right.x
            && point.y >= top_left.y
            && point.y <= bottom_right.y
    }
}

/// Outcome of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapReport {
    /// Islands in placement order.
    pub islands: Vec<Island>,
    /// Achieved share of playable cells covered by islands.
    pub obstruction_ratio: f64,
    /// Placement attempts used.
    pub iterations: u32,
    /// True when the iteration cap stopped generation short of the target.
    pub saturated: bool,
}

/// Stateful island generator over one scene grid.
#[derive(Debug, Clone)]
pub struct MapGenerator {
    config: MapConfig,
    grid: OccupancyGrid,
    islands: Vec<Island>,
    rng: SimRng,
}

impl MapGenerator {
    /// Create a generator with an empty scene grid.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] if the configuration is invalid.
    pub fn new(config: MapConfig) -> Result<Self> {
        let grid = config.empty_grid()?;
        let rng = rng::seeded(config.seed);
        Ok(Self {
            config,
            grid,
            islands: Vec::new(),
            rng,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Current scene grid.
    #[must_use]
    pub const fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Islands placed so far.
    #[must_use]
    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    /// Drop all islands and reseed, so the next `generate` repeats the first.
    pub fn reset(&mut self) {
        for island in self.islands.drain(..) {
            for (row, col) in island.cells.cells() {
                self.grid.set(row, col, Cell::Free);
            }
        }
        self.rng = rng::seeded(self.config.seed);
    }

    /// Place islands until the obstruction target or the iteration cap.
    pub fn generate(&mut self) -> MapReport {
        let inner = self.grid.inner();
        let map_area = inner.area().max(1) as f64;
        let target = self.config.max_obstruction;
        let mut obstructed: usize = self.islands.iter().map(|i| i.cells.area()).sum();
        let mut ratio = obstructed as f64 / map_area;
        let mut iterations = 0;

        while ratio < target && iterations < self.config.max_iterations {
            iterations += 1;
            let Some(rect) = self.propose(inner) else {
                continue;
            };
            if !self.is_clear(rect) {
                continue;
            }

            for (row, col) in rect.cells() {
                self.grid.set(row, col, Cell::Island);
            }
            self.islands
                .push(Island::from_cells(rect, self.config.cell_size));
            obstructed += rect.area();
            ratio = obstructed as f64 / map_area;
            debug!(?rect, ratio, "Placed island");
        }

        let saturated = target > 0.0 && ratio < target;
        info!(
            islands = self.islands.len(),
            ratio,
            iterations,
            saturated,
            seed = self.config.seed,
            "Map generated"
        );

        MapReport {
            islands: self.islands.clone(),
            obstruction_ratio: ratio,
            iterations,
            saturated,
        }
    }

    /// Consume the generator, keeping the grid and islands.
    #[must_use]
    pub fn into_parts(self) -> (OccupancyGrid, Vec<Island>) {
        (self.grid, self.islands)
    }

    fn propose(&mut self, inner: CellRect) -> Option<CellRect> {
        let cols = rng::uniform_usize(
            &mut self.rng,
            self.config.obstacle_min_width,
            self.config.obstacle_max_width,
        );
        let rows = rng::uniform_usize(
            &mut self.rng,
            self.config.obstacle_min_height,
            self.config.obstacle_max_height,
        );
        let row = rng::uniform_usize(&mut self.rng, inner.row, inner.row_end() - 1);
        let col = rng::uniform_usize(&mut self.rng, inner.col, inner.col_end() - 1);
        CellRect::new(row, col, rows, cols).clip(&inner)
    }

    fn is_clear(&self, rect: CellRect) -> bool {
        let Some(zone) = rect
            .dilate(self.config.min_distance)
            .clip(&self.grid.bounds())
        else {
            return false;
        };
        zone.cells()
            .all(|(row, col)| self.grid.get(row, col) != Some(Cell::Island))
    }
}

/// Generate a scene grid and its islands in one call.
///
/// # Errors
///
/// Returns [`SimError::InvalidInput`] if the configuration is invalid.
pub fn generate_map(config: MapConfig) -> Result<(OccupancyGrid, MapReport)> {
    let mut generator = MapGenerator::new(config)?;
    let report = generator.generate();
    let (grid, _) = generator.into_parts();
    Ok((grid, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MapConfig::default();
        assert_eq!(config.cell_size, 500);
        assert_eq!(config.max_iterations, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scene_extension() {
        let config = MapConfig::default();
        let grid = config.empty_grid().unwrap();
        // 20000 playable + 2 x 5000 border
        assert_eq!(grid.world_width(), 30_000.0);
        assert_eq!(grid.world_height(), 30_000.0);
        assert_eq!(grid.inner(), CellRect::new(10, 10, 40, 40));
        assert!(grid.is_point_inside(Vec2::new(5_000.0, 5_000.0)));
        assert!(!grid.is_point_inside(Vec2::new(4_999.0, 5_000.0)));
        assert!(!grid.is_point_inside(Vec2::new(25_000.0, 10_000.0)));
    }

    #[test]
    fn test_invalid_configs() {
        let mut config = MapConfig::default();
        config.playable_width = 20_100;
        assert!(config.validate().is_err());

        let mut config = MapConfig::default();
        config.obstacle_min_width = 9;
        assert!(config.validate().is_err());

        let mut config = MapConfig::default();
        config.max_obstruction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_obstruction_is_empty() {
        let (grid, report) = generate_map(MapConfig::default().with_max_obstruction(0.0)).unwrap();
        assert!(report.islands.is_empty());
        assert_eq!(report.iterations, 0);
        assert!(!report.saturated);
        assert_eq!(grid.count(Cell::Island), 0);
    }

    #[test]
    fn test_islands_stay_inside_playable_area() {
        let (grid, report) = generate_map(MapConfig::default().with_max_obstruction(0.2)).unwrap();
        assert!(!report.islands.is_empty());
        let inner = grid.inner();
        for island in &report.islands {
            assert_eq!(island.cells.clip(&inner), Some(island.cells));
        }
        assert_eq!(
            grid.count(Cell::Island),
            report.islands.iter().map(|i| i.cells.area()).sum::<usize>()
        );
    }

    #[test]
    fn test_islands_respect_min_distance() {
        let config = MapConfig::default().with_max_obstruction(0.3);
        let spacing = config.min_distance;
        let (_, report) = generate_map(config).unwrap();
        for (i, a) in report.islands.iter().enumerate() {
            for b in &report.islands[i + 1..] {
                assert!(a.cells.dilate(spacing).clip(&b.cells).is_none());
            }
        }
    }

    #[test]
    fn test_ratio_reaches_target_or_saturates() {
        let (_, report) = generate_map(MapConfig::default().with_max_obstruction(0.05)).unwrap();
        assert!(report.obstruction_ratio >= 0.05 || report.saturated);

        // Target unreachable with this spacing: the cap must stop it
        let (_, report) = generate_map(MapConfig::default().with_max_obstruction(0.95)).unwrap();
        assert!(report.saturated);
        assert_eq!(report.iterations, 500);
    }

    #[test]
    fn test_determinism() {
        let config = MapConfig::default().with_seed(42).with_max_obstruction(0.15);
        let (grid_a, report_a) = generate_map(config.clone()).unwrap();
        let (grid_b, report_b) = generate_map(config).unwrap();
        assert_eq!(grid_a, grid_b);
        assert_eq!(report_a, report_b);
    }

    #[test]
    fn test_reset_then_generate_repeats() {
        let mut generator =
            MapGenerator::new(MapConfig::default().with_seed(9).with_max_obstruction(0.15)).unwrap();
        let first = generator.generate();
        let first_cells = generator.grid().cells().to_vec();

        generator.reset();
        assert!(generator.islands().is_empty());
        assert_eq!(generator.grid().count(Cell::Island), 0);

        let second = generator.generate();
        assert_eq!(first, second);
        assert_eq!(first_cells, generator.grid().cells());
    }

    #[test]
    fn test_different_seeds() {
        let (a, _) = generate_map(MapConfig::default().with_seed(1)).unwrap();
        let (b, _) = generate_map(MapConfig::default().with_seed(2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_island_polygon() {
        let island = Island::from_cells(CellRect::new(2, 3, 4, 5), 500);
        assert_eq!(island.polygon[0], Vec2::new(1_500.0, 1_000.0));
        assert_eq!(island.polygon[2], Vec2::new(4_000.0, 3_000.0));
        assert!(island.contains_point(Vec2::new(2_000.0, 2_000.0)));
        assert!(!island.contains_point(Vec2::new(4_001.0, 2_000.0)));
        assert_eq!(island.edges().count(), 4);
    }
}
