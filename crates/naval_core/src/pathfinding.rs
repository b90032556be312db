//! Occupancy grid and A* pathfinding.
//!
//! The grid is a coarse square lattice of side `cell_size` covering the
//! whole scene. Cell `(row, col)` spans world `[col·S, (col+1)·S) ×
//! [row·S, (row+1)·S)`, and a path node's world point is its top-left
//! corner `(col·S, row·S)`.
//!
//! Movement is 8-connected with integer costs: 10 for an orthogonal step
//! and 14 for a diagonal one. The heuristic is the same octile metric
//! measured to the goal, which never overestimates under this movement
//! model, so the first time the goal is popped its cost is optimal.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::Vec2;
use crate::priority_queue::{HeapItem, PriorityQueue};

/// Cost of an orthogonal step.
pub const ORTHOGONAL_COST: u32 = 10;

/// Cost of a diagonal step.
pub const DIAGONAL_COST: u32 = 14;

/// Occupancy of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    /// Open water.
    #[default]
    Free,
    /// Covered by an island.
    Island,
    /// Outer extension band around the playable area.
    Border,
}

impl Cell {
    /// Returns true if ships may enter this cell.
    #[must_use]
    pub const fn is_traversable(self) -> bool {
        matches!(self, Self::Free)
    }
}

/// Axis-aligned rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    /// First row.
    pub row: usize,
    /// First column.
    pub col: usize,
    /// Height in cells.
    pub rows: usize,
    /// Width in cells.
    pub cols: usize,
}

impl CellRect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self {
            row,
            col,
            rows,
            cols,
        }
    }

    /// One past the last row.
    #[must_use]
    pub const fn row_end(&self) -> usize {
        self.row + self.rows
    }

    /// One past the last column.
    #[must_use]
    pub const fn col_end(&self) -> usize {
        self.col + self.cols
    }

    /// Number of cells covered.
    #[must_use]
    pub const fn area(&self) -> usize {
        self.rows * self.cols
    }

    /// Check if a cell lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row && row < self.row_end() && col >= self.col && col < self.col_end()
    }

    /// Intersection with another rectangle, `None` when they do not overlap.
    #[must_use]
    pub fn clip(&self, bounds: &Self) -> Option<Self> {
        let row = self.row.max(bounds.row);
        let col = self.col.max(bounds.col);
        let row_end = self.row_end().min(bounds.row_end());
        let col_end = self.col_end().min(bounds.col_end());
        (row < row_end && col < col_end).then(|| Self::new(row, col, row_end - row, col_end - col))
    }

    /// Grow by `margin` cells on every side, saturating at zero.
    #[must_use]
    pub fn dilate(&self, margin: usize) -> Self {
        let row = self.row.saturating_sub(margin);
        let col = self.col.saturating_sub(margin);
        Self::new(
            row,
            col,
            self.row_end() + margin - row,
            self.col_end() + margin - col,
        )
    }

    /// Iterate over all `(row, col)` pairs in row-major order.
    pub fn cells(self) -> impl Iterator<Item = (usize, usize)> {
        (self.row..self.row_end()).flat_map(move |r| (self.col..self.col_end()).map(move |c| (r, c)))
    }
}

/// Occupancy grid covering the whole scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    /// Grid height in cells.
    rows: usize,
    /// Grid width in cells.
    cols: usize,
    /// Cell side length in world units.
    cell_size: u32,
    /// Cell data stored in row-major order.
    cells: Vec<Cell>,
    /// Cells available to ships (everything outside is `Border`).
    inner: CellRect,
}

impl OccupancyGrid {
    /// Create a grid with every cell free and no border.
    ///
    /// # Panics
    ///
    /// Panics if `rows`, `cols` or `cell_size` is zero.
    #[must_use]
    pub fn new(rows: usize, cols: usize, cell_size: u32) -> Self {
        assert!(rows > 0, "OccupancyGrid rows must be positive");
        assert!(cols > 0, "OccupancyGrid cols must be positive");
        assert!(cell_size > 0, "OccupancyGrid cell_size must be positive");

        Self {
            rows,
            cols,
            cell_size,
            cells: vec![Cell::Free; rows * cols],
            inner: CellRect::new(0, 0, rows, cols),
        }
    }

    /// Create a grid whose playable `inner` rectangle is surrounded by a
    /// band of `Border` cells `border_rows` high and `border_cols` wide.
    #[must_use]
    pub fn with_border(
        inner_rows: usize,
        inner_cols: usize,
        border_rows: usize,
        border_cols: usize,
        cell_size: u32,
    ) -> Self {
        let mut grid = Self::new(
            inner_rows + 2 * border_rows,
            inner_cols + 2 * border_cols,
            cell_size,
        );
        grid.inner = CellRect::new(border_rows, border_cols, inner_rows, inner_cols);
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                if !grid.inner.contains(row, col) {
                    let index = grid.index(row, col);
                    grid.cells[index] = Cell::Border;
                }
            }
        }
        grid
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// The playable rectangle.
    #[must_use]
    pub const fn inner(&self) -> CellRect {
        self.inner
    }

    /// Whole grid as a rectangle.
    #[must_use]
    pub const fn bounds(&self) -> CellRect {
        CellRect::new(0, 0, self.rows, self.cols)
    }

    /// Scene width in world units.
    #[must_use]
    pub fn world_width(&self) -> f64 {
        (self.cols as f64) * f64::from(self.cell_size)
    }

    /// Scene height in world units.
    #[must_use]
    pub fn world_height(&self) -> f64 {
        (self.rows as f64) * f64::from(self.cell_size)
    }

    /// Raw cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Check if coordinates are within grid bounds.
    #[must_use]
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Get the cell at coordinates, `None` if out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.in_bounds(row, col).then(|| self.cells[self.index(row, col)])
    }

    /// Set a cell. Returns `false` if out of bounds.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> bool {
        if self.in_bounds(row, col) {
            let index = self.index(row, col);
            self.cells[index] = cell;
            true
        } else {
            false
        }
    }

    /// Check if a cell exists and ships may enter it.
    #[must_use]
    pub fn is_traversable(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_some_and(Cell::is_traversable)
    }

    /// Count the cells of one kind.
    #[must_use]
    pub fn count(&self, kind: Cell) -> usize {
        self.cells.iter().filter(|c| **c == kind).count()
    }

    /// Map a world point to its cell by integer division by the cell size.
    ///
    /// Returns `None` if the point lies outside the grid.
    #[must_use]
    pub fn world_to_cell(&self, point: Vec2) -> Option<(usize, usize)> {
        if !(point.x.is_finite() && point.y.is_finite()) || point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let size = f64::from(self.cell_size);
        let col = (point.x / size).floor() as usize;
        let row = (point.y / size).floor() as usize;
        self.in_bounds(row, col).then_some((row, col))
    }

    /// World point of a node: the cell's top-left corner.
    #[must_use]
    pub fn cell_to_world(&self, row: usize, col: usize) -> Vec2 {
        let size = f64::from(self.cell_size);
        Vec2::new(col as f64 * size, row as f64 * size)
    }

    /// Center of a cell in world units.
    #[must_use]
    pub fn cell_center(&self, row: usize, col: usize) -> Vec2 {
        let size = f64::from(self.cell_size);
        Vec2::new((col as f64 + 0.5) * size, (row as f64 + 0.5) * size)
    }

    /// Check if a world point lies in a traversable cell.
    #[must_use]
    pub fn is_point_traversable(&self, point: Vec2) -> bool {
        self.world_to_cell(point)
            .is_some_and(|(row, col)| self.is_traversable(row, col))
    }

    /// Check if a world point lies in the playable rectangle.
    #[must_use]
    pub fn is_point_inside(&self, point: Vec2) -> bool {
        self.world_to_cell(point)
            .is_some_and(|(row, col)| self.inner.contains(row, col))
    }
}

/// Octile distance in step-cost units.
#[inline]
#[must_use]
pub fn octile_distance(a: (usize, usize), b: (usize, usize)) -> u32 {
    let dr = a.0.abs_diff(b.0) as u32;
    let dc = a.1.abs_diff(b.1) as u32;
    let diagonal = dr.min(dc);
    let straight = dr.max(dc) - diagonal;
    DIAGONAL_COST * diagonal + ORTHOGONAL_COST * straight
}

/// Direction offsets for 8-directional movement as (row, col) deltas.
const DIRECTIONS: [(isize, isize); 8] = [
    (0, 1),   // East
    (1, 1),   // Southeast
    (1, 0),   // South
    (1, -1),  // Southwest
    (0, -1),  // West
    (-1, -1), // Northwest
    (-1, 0),  // North
    (-1, 1),  // Northeast
];

/// Per-cell search state.
#[derive(Debug, Clone, Copy)]
struct Node {
    row: usize,
    col: usize,
    traversable: bool,
    g: u32,
    h: u32,
    parent: Option<usize>,
    closed: bool,
}

impl Node {
    const fn f(&self) -> u32 {
        self.g + self.h
    }
}

/// Open-set entry. Lower f wins, then lower h.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    node: usize,
    f: u32,
    h: u32,
}

impl HeapItem for OpenEntry {
    fn priority_cmp(&self, other: &Self) -> Ordering {
        other.f.cmp(&self.f).then_with(|| other.h.cmp(&self.h))
    }

    fn heap_key(&self) -> usize {
        self.node
    }
}

/// Statistics of the most recent search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes moved to the closed set.
    pub expanded: usize,
    /// Largest f-cost among expanded nodes.
    pub max_expanded_f: u32,
    /// g-cost of the goal, when it was reached.
    pub cost: Option<u32>,
}

/// Reusable A* pathfinder over a snapshot of an [`OccupancyGrid`].
///
/// Traversability is copied at construction; the grid itself is never
/// mutated by a search. One search at a time: `find_path` takes `&mut self`.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    rows: usize,
    cols: usize,
    cell_size: u32,
    nodes: Vec<Node>,
    open: PriorityQueue<OpenEntry>,
    stats: SearchStats,
}

impl Pathfinder {
    /// Build the node lattice for a grid.
    #[must_use]
    pub fn new(grid: &OccupancyGrid) -> Self {
        let mut nodes = Vec::with_capacity(grid.rows() * grid.cols());
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                nodes.push(Node {
                    row,
                    col,
                    traversable: grid.is_traversable(row, col),
                    g: 0,
                    h: 0,
                    parent: None,
                    closed: false,
                });
            }
        }
        Self {
            rows: grid.rows(),
            cols: grid.cols(),
            cell_size: grid.cell_size(),
            nodes,
            open: PriorityQueue::with_capacity(grid.cols() * 4),
            stats: SearchStats::default(),
        }
    }

    /// Clear costs and closed marks, keeping the node lattice.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.g = 0;
            node.h = 0;
            node.parent = None;
            node.closed = false;
        }
        self.open.clear();
        self.stats = SearchStats::default();
    }

    /// Statistics of the most recent search.
    #[must_use]
    pub const fn last_stats(&self) -> SearchStats {
        self.stats
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    fn world_to_cell(&self, point: Vec2) -> Result<(usize, usize)> {
        let size = f64::from(self.cell_size);
        if !(point.x.is_finite() && point.y.is_finite()) || point.x < 0.0 || point.y < 0.0 {
            return Err(SimError::PointOutsideMap {
                x: point.x,
                y: point.y,
            });
        }
        let col = (point.x / size).floor() as usize;
        let row = (point.y / size).floor() as usize;
        if row < self.rows && col < self.cols {
            Ok((row, col))
        } else {
            Err(SimError::PointOutsideMap {
                x: point.x,
                y: point.y,
            })
        }
    }

    /// Find a path between two world points.
    ///
    /// Returns the node world points (cell top-left corners) from the
    /// start cell to the goal cell inclusive.
    ///
    /// # Errors
    ///
    /// - [`SimError::PointOutsideMap`] if either point is off the grid
    /// - [`SimError::NoPath`] if the goal is untraversable or unreachable
    pub fn find_path(&mut self, start: Vec2, goal: Vec2) -> Result<Vec<Vec2>> {
        let start_cell = self.world_to_cell(start)?;
        let goal_cell = self.world_to_cell(goal)?;
        let size = f64::from(self.cell_size);
        Ok(self
            .find_path_cells(start_cell, goal_cell)?
            .into_iter()
            .map(|(row, col)| Vec2::new(col as f64 * size, row as f64 * size))
            .collect())
    }

    /// Find a path between two cells, both given as `(row, col)`.
    ///
    /// The start cell itself need not be traversable, which lets a ship
    /// pushed onto a bad cell plan its way back out.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoPath`] if the goal is untraversable, out of
    /// bounds, or the open set empties before reaching it.
    pub fn find_path_cells(
        &mut self,
        start: (usize, usize),
        goal: (usize, usize),
    ) -> Result<Vec<(usize, usize)>> {
        self.reset();
        let no_path = SimError::NoPath {
            from: start,
            to: goal,
        };

        if start.0 >= self.rows || start.1 >= self.cols || goal.0 >= self.rows || goal.1 >= self.cols
        {
            return Err(no_path);
        }
        let goal_index = self.index(goal.0, goal.1);
        if !self.nodes[goal_index].traversable {
            return Err(no_path);
        }
        if start == goal {
            self.stats.cost = Some(0);
            return Ok(vec![start]);
        }

        let start_index = self.index(start.0, start.1);
        let start_h = octile_distance(start, goal);
        self.nodes[start_index].h = start_h;
        self.open.add(OpenEntry {
            node: start_index,
            f: start_h,
            h: start_h,
        });

        while let Some(entry) = self.open.try_remove_top() {
            let current = entry.node;
            self.nodes[current].closed = true;
            self.stats.expanded += 1;
            self.stats.max_expanded_f = self.stats.max_expanded_f.max(self.nodes[current].f());

            if current == goal_index {
                self.stats.cost = Some(self.nodes[current].g);
                return Ok(self.retrace(start_index, goal_index));
            }

            self.expand(current, goal);
        }

        Err(no_path)
    }

    fn expand(&mut self, current: usize, goal: (usize, usize)) {
        let (row, col, g) = {
            let node = &self.nodes[current];
            (node.row, node.col, node.g)
        };

        for &(dr, dc) in &DIRECTIONS {
            let Some(nr) = row.checked_add_signed(dr) else {
                continue;
            };
            let Some(nc) = col.checked_add_signed(dc) else {
                continue;
            };
            if nr >= self.rows || nc >= self.cols {
                continue;
            }

            let neighbor = self.index(nr, nc);
            if !self.nodes[neighbor].traversable || self.nodes[neighbor].closed {
                continue;
            }

            let diagonal = dr != 0 && dc != 0;
            // No corner cutting: both orthogonal neighbours must be open water
            if diagonal
                && !(self.nodes[self.index(row, nc)].traversable
                    && self.nodes[self.index(nr, col)].traversable)
            {
                continue;
            }

            let step = if diagonal {
                DIAGONAL_COST
            } else {
                ORTHOGONAL_COST
            };
            let tentative = g + step;
            let queued = self.open.contains(neighbor);

            if !queued || tentative < self.nodes[neighbor].g {
                let h = octile_distance((nr, nc), goal);
                let node = &mut self.nodes[neighbor];
                node.g = tentative;
                node.h = h;
                node.parent = Some(current);
                let entry = OpenEntry {
                    node: neighbor,
                    f: tentative + h,
                    h,
                };
                if queued {
                    self.open.update(entry);
                } else {
                    self.open.add(entry);
                }
            }
        }
    }

    fn retrace(&self, start: usize, goal: usize) -> Vec<(usize, usize)> {
        let mut path = Vec::new();
        let mut current = Some(goal);
        while let Some(index) = current {
            let node = &self.nodes[index];
            path.push((node.row, node.col));
            if index == start {
                break;
            }
            current = node.parent;
        }
        path.reverse();
        path
    }
}
