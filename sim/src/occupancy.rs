//! Dense occupancy grid rasterized from a carved [`CellGrid`].
//!
//! Every logical cell `(c, r)` maps to the fine cell `(2c, 2r)`; the fine
//! cells in between carry walls. The grid adds a `MARGIN`-wide blocked border
//! on every side, so occupancy index = fine coordinate + `MARGIN` and the grid
//! is `(2W + 6) × (2H + 6)`.
//!
//! Only the first standing wall of each cell, checked North → South → East →
//! West, is rasterized. Each rasterized wall is three fine cells long so that
//! diagonal moves cannot slip past its ends.

use crate::error::{MazeError, MazeResult};
use crate::maze::{Cell, CellGrid};
use crate::render_bridge::PlacementSink;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Blocked border thickness, in fine cells.
pub const MARGIN: usize = 3;

/// Occupancy value of a blocked fine cell.
pub const BLOCKED: u8 = 1;

/// Occupancy value of a passable fine cell.
pub const PASSABLE: u8 = 0;

/// Index into an [`OccupancyGrid`] (fine coordinate + `MARGIN`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FinePoint {
    pub column: usize,
    pub row: usize,
}

impl FinePoint {
    pub fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }

    /// Fine (world) coordinates of this grid index.
    pub fn to_world(self) -> (f32, f32) {
        (
            self.column as f32 - MARGIN as f32,
            self.row as f32 - MARGIN as f32,
        )
    }

    /// Fine coordinates as signed integers, as handed to a placement sink.
    pub fn to_fine(self) -> (i32, i32) {
        (
            self.column as i32 - MARGIN as i32,
            self.row as i32 - MARGIN as i32,
        )
    }

    /// Euclidean distance between two grid indices.
    pub fn distance_to(&self, other: &FinePoint) -> f32 {
        let dx = self.column as f32 - other.column as f32;
        let dy = self.row as f32 - other.row as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// The three fine cells of the single wall rasterized for `cell`, if any.
pub fn wall_segment(cell: &Cell) -> Option<[FinePoint; 3]> {
    let cx = 2 * cell.point.column + MARGIN;
    let cy = 2 * cell.point.row + MARGIN;

    let horizontal = |row: usize| {
        [
            FinePoint::new(cx, row),
            FinePoint::new(cx - 1, row),
            FinePoint::new(cx + 1, row),
        ]
    };
    let vertical = |column: usize| {
        [
            FinePoint::new(column, cy),
            FinePoint::new(column, cy - 1),
            FinePoint::new(column, cy + 1),
        ]
    };

    if cell.north_wall {
        Some(horizontal(cy - 1))
    } else if cell.south_wall {
        Some(horizontal(cy + 1))
    } else if cell.east_wall {
        Some(vertical(cx + 1))
    } else if cell.west_wall {
        Some(vertical(cx - 1))
    } else {
        None
    }
}

/// Dense blocked/passable grid used for collision and pathfinding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOccupancyGrid")]
pub struct OccupancyGrid {
    /// Columns (`2 * maze_width + 6`).
    width: usize,
    /// Rows (`2 * maze_height + 6`).
    height: usize,
    /// Row-major occupancy values.
    cells: Vec<u8>,
}

impl OccupancyGrid {
    /// All-passable grid of the given size.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![PASSABLE; width * height],
        }
    }

    /// Grid size (columns, rows) for a maze.
    pub fn dimensions_for(maze: &CellGrid) -> (usize, usize) {
        (2 * maze.width() + 2 * MARGIN, 2 * maze.height() + 2 * MARGIN)
    }

    /// Rasterize a carved maze without placement callbacks.
    #[cfg(not(feature = "parallel"))]
    pub fn from_maze(maze: &CellGrid) -> Self {
        Self::rasterize_with(maze, &mut crate::render_bridge::NullSink)
    }

    /// Rasterize a carved maze, one fine row per rayon task.
    ///
    /// Each row only gathers the wall segments that cross it, so no two tasks
    /// write the same cell.
    #[cfg(feature = "parallel")]
    pub fn from_maze(maze: &CellGrid) -> Self {
        use rayon::prelude::*;

        let (width, height) = Self::dimensions_for(maze);
        let mut grid = Self::empty(width, height);

        grid.cells
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, line)| {
                for (column, value) in line.iter_mut().enumerate() {
                    if in_margin(column, row, width, height) {
                        *value = BLOCKED;
                    }
                }
                // Segments of maze row r span fine rows 2r+2 ..= 2r+4.
                if row < MARGIN - 1 {
                    return;
                }
                let first = if row >= MARGIN + 1 { (row - MARGIN) / 2 } else { 0 };
                let last = ((row - (MARGIN - 1)) / 2).min(maze.height() - 1);
                for maze_row in first..=last {
                    for cell in &maze.cells()[maze_row * maze.width()..(maze_row + 1) * maze.width()] {
                        let Some(segment) = wall_segment(cell) else {
                            continue;
                        };
                        for point in segment.iter().filter(|p| p.row == row) {
                            line[point.column] = BLOCKED;
                        }
                    }
                }
            });

        info!(
            width,
            height,
            blocked = grid.blocked_count(),
            "rasterized occupancy grid (parallel)"
        );
        grid
    }

    /// Rasterize a carved maze, reporting every newly blocked fine cell to `sink`.
    ///
    /// The margin is placed first, then one wall segment per cell in row-major
    /// order. A fine cell that is already blocked is skipped, so each blocked
    /// cell reaches the sink exactly once.
    pub fn rasterize_with<S: PlacementSink + ?Sized>(maze: &CellGrid, sink: &mut S) -> Self {
        let (width, height) = Self::dimensions_for(maze);
        let mut grid = Self::empty(width, height);

        for row in 0..height {
            for column in 0..width {
                if in_margin(column, row, width, height) {
                    grid.place(FinePoint::new(column, row), sink);
                }
            }
        }

        for cell in maze.cells() {
            if let Some(segment) = wall_segment(cell) {
                for point in segment {
                    grid.place(point, sink);
                }
            }
        }

        info!(
            width,
            height,
            blocked = grid.blocked_count(),
            "rasterized occupancy grid"
        );
        grid
    }

    fn place<S: PlacementSink + ?Sized>(&mut self, point: FinePoint, sink: &mut S) {
        if self.block(point) {
            let (column, row) = point.to_fine();
            sink.place_wall_segment(column, row);
        }
    }

    /// Mark a cell blocked. Returns true if it was passable before.
    pub fn block(&mut self, point: FinePoint) -> bool {
        match self.cell_index(point) {
            Some(i) if self.cells[i] != BLOCKED => {
                self.cells[i] = BLOCKED;
                true
            }
            _ => false,
        }
    }

    fn cell_index(&self, point: FinePoint) -> Option<usize> {
        if point.column < self.width && point.row < self.height {
            Some(point.row * self.width + point.column)
        } else {
            None
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw row-major values (1 = blocked, 0 = passable).
    pub fn values(&self) -> &[u8] {
        &self.cells
    }

    /// Occupancy value at a grid index.
    pub fn get(&self, point: FinePoint) -> Option<u8> {
        self.cell_index(point).map(|i| self.cells[i])
    }

    /// Out-of-bounds indices count as blocked.
    pub fn is_blocked(&self, point: FinePoint) -> bool {
        self.get(point).map_or(true, |v| v == BLOCKED)
    }

    pub fn is_passable(&self, point: FinePoint) -> bool {
        !self.is_blocked(point)
    }

    /// Whether an index lies in the border margin.
    pub fn is_margin(&self, point: FinePoint) -> bool {
        in_margin(point.column, point.row, self.width, self.height)
    }

    pub fn blocked_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == BLOCKED).count()
    }

    /// Column indices inside the margin.
    pub fn interior_columns(&self) -> std::ops::Range<usize> {
        MARGIN..self.width.saturating_sub(MARGIN)
    }

    /// Row indices inside the margin.
    pub fn interior_rows(&self) -> std::ops::Range<usize> {
        MARGIN..self.height.saturating_sub(MARGIN)
    }

    /// Grid index of the fine cell nearest to a world position.
    pub fn world_to_grid(&self, x: f32, y: f32) -> Option<FinePoint> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let column = x.round() as i64 + MARGIN as i64;
        let row = y.round() as i64 + MARGIN as i64;
        if column < 0 || row < 0 || column >= self.width as i64 || row >= self.height as i64 {
            return None;
        }
        Some(FinePoint::new(column as usize, row as usize))
    }

    /// Whether the fine cell nearest to a world position is passable.
    pub fn is_world_passable(&self, x: f32, y: f32) -> bool {
        self.world_to_grid(x, y).is_some_and(|p| self.is_passable(p))
    }

    /// Occupancy rendered as `#` (blocked) and `.` (passable), one line per row.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for line in self.cells.chunks(self.width.max(1)) {
            out.extend(line.iter().map(|&v| if v == BLOCKED { '#' } else { '.' }));
            out.push('\n');
        }
        out
    }
}

/// Unchecked wire form of [`OccupancyGrid`].
#[derive(Deserialize)]
struct RawOccupancyGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl TryFrom<RawOccupancyGrid> for OccupancyGrid {
    type Error = MazeError;

    fn try_from(raw: RawOccupancyGrid) -> MazeResult<Self> {
        if raw.width.checked_mul(raw.height) != Some(raw.cells.len()) {
            return Err(MazeError::invalid_config(format!(
                "{} occupancy values for a {}x{} grid",
                raw.cells.len(),
                raw.width,
                raw.height
            )));
        }
        if let Some(value) = raw.cells.iter().find(|&&v| v != BLOCKED && v != PASSABLE) {
            return Err(MazeError::invalid_config(format!("occupancy value {value}")));
        }
        Ok(Self {
            width: raw.width,
            height: raw.height,
            cells: raw.cells,
        })
    }
}

#[inline]
fn in_margin(column: usize, row: usize, width: usize, height: usize) -> bool {
    column < MARGIN || row < MARGIN || column + MARGIN >= width || row + MARGIN >= height
}
