//! Logical maze model and recursive-backtracker carving.
//!
//! A [`CellGrid`] is a Height×Width array of [`Cell`]s, each starting with all
//! four walls present. [`CellGrid::generate`] carves a spanning tree over the
//! cells with a depth-first backtracker driven by an explicit stack, so maze
//! size is not limited by thread stack depth.

use crate::error::{MazeError, MazeResult};
use crate::occupancy::MARGIN;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer (column, row) address of a logical cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub column: usize,
    pub row: usize,
}

impl Point {
    pub fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }
}

/// Carve direction. `Invalid` marks dead-end entries in the carve log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
    Invalid,
}

impl Direction {
    /// The four real directions, in candidate order.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Direction pointing back the way we came.
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Invalid => Direction::Invalid,
        }
    }

    /// (column, row) step. North is towards row 0.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::Invalid => (0, 0),
        }
    }
}

/// One maze unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub north_wall: bool,
    pub east_wall: bool,
    pub south_wall: bool,
    pub west_wall: bool,
    /// Set once when the carver first reaches the cell.
    pub visited: bool,
    /// 1-based order of the first visit; 0 while unvisited.
    pub visit_order: u32,
    /// No unvisited in-bounds neighbor remained at first visit.
    pub dead_end: bool,
    pub point: Point,
}

impl Cell {
    /// Fresh cell with every wall standing.
    pub fn new(point: Point) -> Self {
        Self {
            north_wall: true,
            east_wall: true,
            south_wall: true,
            west_wall: true,
            visited: false,
            visit_order: 0,
            dead_end: false,
            point,
        }
    }

    /// Whether the wall facing `direction` is present.
    pub fn has_wall(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.north_wall,
            Direction::East => self.east_wall,
            Direction::South => self.south_wall,
            Direction::West => self.west_wall,
            Direction::Invalid => false,
        }
    }

    fn clear_wall(&mut self, direction: Direction) {
        match direction {
            Direction::North => self.north_wall = false,
            Direction::East => self.east_wall = false,
            Direction::South => self.south_wall = false,
            Direction::West => self.west_wall = false,
            Direction::Invalid => {}
        }
    }

    /// Number of walls still standing.
    pub fn wall_count(&self) -> usize {
        Direction::CARDINAL
            .iter()
            .filter(|&&d| self.has_wall(d))
            .count()
    }
}

/// A single carve decision: `direction` was opened out of the cell at `point`,
/// or `Invalid` when that cell was a dead end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarveEvent {
    pub point: Point,
    pub direction: Direction,
}

/// Stack frame of the iterative backtracker.
struct CarveFrame {
    point: Point,
    candidates: Vec<Direction>,
}

/// Largest occupancy grid, in fine cells, a maze may rasterize to.
pub const MAX_GRID_CELLS: usize = 1 << 26;

/// Reject empty mazes and mazes whose `(2W + 6) × (2H + 6)` occupancy grid
/// overflows or exceeds [`MAX_GRID_CELLS`].
pub fn check_dimensions(width: usize, height: usize) -> MazeResult<()> {
    if width == 0 || height == 0 {
        return Err(MazeError::invalid_config(format!(
            "maze dimensions must be positive, got {width}x{height}"
        )));
    }
    let fine = |n: usize| n.checked_mul(2).and_then(|d| d.checked_add(2 * MARGIN));
    match fine(width).zip(fine(height)).and_then(|(w, h)| w.checked_mul(h)) {
        Some(cells) if cells <= MAX_GRID_CELLS => Ok(()),
        _ => Err(MazeError::invalid_config(format!(
            "maze {width}x{height} exceeds the {MAX_GRID_CELLS}-cell occupancy limit"
        ))),
    }
}

/// The logical maze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCellGrid")]
pub struct CellGrid {
    width: usize,
    height: usize,
    /// Row-major cells.
    cells: Vec<Cell>,
    start: Point,
    carve_log: Vec<CarveEvent>,
    visit_counter: u32,
}

impl CellGrid {
    /// Allocate a `width`×`height` grid of unvisited, fully walled cells.
    pub fn new(width: usize, height: usize) -> MazeResult<Self> {
        check_dimensions(width, height)?;
        let cells = (0..height)
            .flat_map(|row| (0..width).map(move |column| Cell::new(Point::new(column, row))))
            .collect();
        Ok(Self {
            width,
            height,
            cells,
            start: Point::default(),
            carve_log: Vec::new(),
            visit_counter: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell the last generation started from.
    pub fn start(&self) -> Point {
        self.start
    }

    /// Ordered carve events of the last generation.
    pub fn carve_log(&self) -> &[CarveEvent] {
        &self.carve_log
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn cell_index(&self, point: Point) -> Option<usize> {
        if point.column < self.width && point.row < self.height {
            Some(point.row * self.width + point.column)
        } else {
            None
        }
    }

    /// Get a cell by its point.
    pub fn get_cell(&self, point: Point) -> Option<&Cell> {
        self.cell_index(point).map(|i| &self.cells[i])
    }

    fn get_cell_mut(&mut self, point: Point) -> Option<&mut Cell> {
        self.cell_index(point).map(move |i| &mut self.cells[i])
    }

    /// In-bounds neighbor of `point` towards `direction`.
    pub fn neighbor(&self, point: Point, direction: Direction) -> Option<Point> {
        if direction == Direction::Invalid {
            return None;
        }
        let (dc, dr) = direction.offset();
        let column = point.column.checked_add_signed(dc)?;
        let row = point.row.checked_add_signed(dr)?;
        (column < self.width && row < self.height).then(|| Point::new(column, row))
    }

    fn is_open_neighbor(&self, point: Point, direction: Direction) -> bool {
        self.neighbor(point, direction)
            .and_then(|n| self.get_cell(n))
            .is_some_and(|cell| !cell.visited)
    }

    /// Directions from `point` that lead to an in-bounds, unvisited cell.
    pub fn candidate_directions(&self, point: Point) -> Vec<Direction> {
        Direction::CARDINAL
            .into_iter()
            .filter(|&d| self.is_open_neighbor(point, d))
            .collect()
    }

    /// Whether the passage between `point` and its neighbor towards `direction` is open.
    pub fn is_passage(&self, point: Point, direction: Direction) -> bool {
        self.neighbor(point, direction).is_some()
            && self.get_cell(point).is_some_and(|cell| !cell.has_wall(direction))
    }

    /// Carve a perfect maze, from `start` or from a uniformly random cell.
    ///
    /// Any previous carving is discarded first, so the grid may be regenerated.
    pub fn generate<R: Rng + ?Sized>(&mut self, start: Option<Point>, rng: &mut R) -> MazeResult<()> {
        let start = match start {
            Some(point) => point,
            None => Point::new(rng.gen_range(0..self.width), rng.gen_range(0..self.height)),
        };
        if self.cell_index(start).is_none() {
            return Err(MazeError::StartOutOfBounds {
                column: start.column,
                row: start.row,
                width: self.width,
                height: self.height,
            });
        }

        self.reset();
        self.start = start;
        self.carve_from(start, rng);
        Ok(())
    }

    fn reset(&mut self) {
        for cell in &mut self.cells {
            *cell = Cell::new(cell.point);
        }
        self.carve_log.clear();
        self.visit_counter = 0;
    }

    fn carve_from<R: Rng + ?Sized>(&mut self, start: Point, rng: &mut R) {
        let mut stack = vec![self.visit(start)];

        while let Some(frame) = stack.last_mut() {
            let point = frame.point;
            // Neighbors may have been visited while deeper frames were active.
            frame.candidates.retain(|&d| self.is_open_neighbor(point, d));

            if frame.candidates.is_empty() {
                stack.pop();
                continue;
            }

            let pick = if frame.candidates.len() > 1 {
                rng.gen_range(0..frame.candidates.len())
            } else {
                0
            };
            let direction = frame.candidates.remove(pick);
            let Some(next) = self.neighbor(point, direction) else {
                continue;
            };

            self.remove_wall(point, next, direction);
            self.carve_log.push(CarveEvent { point, direction });
            let child = self.visit(next);
            stack.push(child);
        }
    }

    /// Mark `point` visited and build its frame. Dead ends are logged here.
    fn visit(&mut self, point: Point) -> CarveFrame {
        self.visit_counter += 1;
        let order = self.visit_counter;
        let candidates = self.candidate_directions(point);
        let dead_end = candidates.is_empty();

        if let Some(cell) = self.get_cell_mut(point) {
            cell.visited = true;
            cell.visit_order = order;
            cell.dead_end = dead_end;
        }
        if dead_end {
            self.carve_log.push(CarveEvent {
                point,
                direction: Direction::Invalid,
            });
        }

        CarveFrame { point, candidates }
    }

    /// Clear the shared wall on both sides.
    fn remove_wall(&mut self, from: Point, to: Point, direction: Direction) {
        if let Some(cell) = self.get_cell_mut(from) {
            cell.clear_wall(direction);
        }
        if let Some(cell) = self.get_cell_mut(to) {
            cell.clear_wall(direction.opposite());
        }
    }

    /// Number of carved passages (non-`Invalid` log entries).
    pub fn passage_count(&self) -> usize {
        self.carve_log
            .iter()
            .filter(|e| e.direction != Direction::Invalid)
            .count()
    }

    /// Number of cells flagged as dead ends.
    pub fn dead_end_count(&self) -> usize {
        self.cells.iter().filter(|c| c.dead_end).count()
    }

    /// True once every cell has been visited.
    pub fn is_generated(&self) -> bool {
        self.cells.iter().all(|c| c.visited)
    }
}

/// ASCII rendering, one `+--+` block per cell.
/// Unchecked wire form of [`CellGrid`].
#[derive(Deserialize)]
struct RawCellGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    start: Point,
    carve_log: Vec<CarveEvent>,
    visit_counter: u32,
}

impl TryFrom<RawCellGrid> for CellGrid {
    type Error = MazeError;

    fn try_from(raw: RawCellGrid) -> MazeResult<Self> {
        let RawCellGrid {
            width,
            height,
            cells,
            start,
            carve_log,
            visit_counter,
        } = raw;
        check_dimensions(width, height)?;
        if cells.len() != width * height {
            return Err(MazeError::invalid_config(format!(
                "{} cells for a {width}x{height} maze",
                cells.len()
            )));
        }
        let misplaced = cells
            .iter()
            .enumerate()
            .any(|(i, cell)| cell.point != Point::new(i % width, i / width));
        if misplaced {
            return Err(MazeError::invalid_config("cells are not in row-major order"));
        }
        let in_bounds = |p: Point| p.column < width && p.row < height;
        if !in_bounds(start) {
            return Err(MazeError::StartOutOfBounds {
                column: start.column,
                row: start.row,
                width,
                height,
            });
        }
        if !carve_log.iter().all(|event| in_bounds(event.point)) {
            return Err(MazeError::invalid_config("carve log leaves the grid"));
        }
        Ok(Self {
            width,
            height,
            cells,
            start,
            carve_log,
            visit_counter,
        })
    }
}

impl fmt::Display for CellGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.height {
            let cells = &self.cells[row * self.width..(row + 1) * self.width];
            for cell in cells {
                f.write_str(if cell.north_wall { "+--" } else { "+  " })?;
            }
            f.write_str("+\n")?;
            for cell in cells {
                f.write_str(if cell.west_wall { "|  " } else { "   " })?;
            }
            let east = cells.last().is_some_and(|c| c.east_wall);
            f.write_str(if east { "|\n" } else { " \n" })?;
        }
        for cell in &self.cells[(self.height - 1) * self.width..] {
            f.write_str(if cell.south_wall { "+--" } else { "+  " })?;
        }
        f.write_str("+\n")
    }
}
