//! Pathfinding service boundary and the default grid solver.
//!
//! The chase logic only depends on [`PathfindingService`]: given start and
//! goal occupancy indices it returns a [`PathResult`] matrix in which every
//! path cell carries [`PATH_MARKER`], or `None` when no path exists.
//! [`GridSolver`] is the bundled implementation, A* over a 4-connected
//! [`OccupancyGrid`] using the `pathfinding` crate.

use crate::occupancy::{FinePoint, OccupancyGrid, BLOCKED};
use pathfinding::prelude::astar;
use std::sync::Arc;

/// Value marking path members in a [`PathResult`].
pub const PATH_MARKER: u8 = 100;

/// Grid-shaped search result, same dimensions as the occupancy grid.
///
/// Path cells hold [`PATH_MARKER`]; every other cell keeps its occupancy value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl PathResult {
    /// Copy `grid` and mark every cell of `path`.
    pub fn from_path(grid: &OccupancyGrid, path: &[FinePoint]) -> Self {
        let mut cells = grid.values().to_vec();
        for point in path {
            if point.column < grid.width() && point.row < grid.height() {
                cells[point.row * grid.width() + point.column] = PATH_MARKER;
            }
        }
        Self {
            width: grid.width(),
            height: grid.height(),
            cells,
        }
    }

    /// Wrap a raw row-major matrix produced by an external service.
    ///
    /// Returns `None` if `cells` does not hold `width * height` values.
    pub fn from_values(width: usize, height: usize, cells: Vec<u8>) -> Option<Self> {
        (cells.len() == width * height).then_some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, point: FinePoint) -> Option<u8> {
        if point.column < self.width && point.row < self.height {
            Some(self.cells[point.row * self.width + point.column])
        } else {
            None
        }
    }

    pub fn is_marked(&self, point: FinePoint) -> bool {
        self.get(point) == Some(PATH_MARKER)
    }

    /// All marked cells in row-major scan order.
    pub fn marked_cells(&self) -> impl Iterator<Item = FinePoint> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == PATH_MARKER)
            .map(move |(i, _)| FinePoint::new(i % width, i / width))
    }

    pub fn marked_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == PATH_MARKER).count()
    }
}

/// Opaque path search over the occupancy grid.
///
/// Coordinates are occupancy indices, row first.
pub trait PathfindingService: Send + Sync {
    fn find_path(
        &self,
        start_row: usize,
        start_col: usize,
        goal_row: usize,
        goal_col: usize,
    ) -> Option<PathResult>;
}

impl<T: PathfindingService + ?Sized> PathfindingService for Arc<T> {
    fn find_path(
        &self,
        start_row: usize,
        start_col: usize,
        goal_row: usize,
        goal_col: usize,
    ) -> Option<PathResult> {
        (**self).find_path(start_row, start_col, goal_row, goal_col)
    }
}

/// A* solver over an occupancy grid (4-connected, unit step cost).
#[derive(Debug, Clone)]
pub struct GridSolver {
    grid: Arc<OccupancyGrid>,
}

impl GridSolver {
    pub fn new(grid: Arc<OccupancyGrid>) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    fn successors(&self, point: FinePoint) -> Vec<(FinePoint, u32)> {
        let mut out = Vec::with_capacity(4);
        let FinePoint { column, row } = point;
        if row > 0 {
            out.push(FinePoint::new(column, row - 1));
        }
        out.push(FinePoint::new(column + 1, row));
        out.push(FinePoint::new(column, row + 1));
        if column > 0 {
            out.push(FinePoint::new(column - 1, row));
        }
        out.into_iter()
            .filter(|p| self.grid.get(*p).is_some_and(|v| v != BLOCKED))
            .map(|p| (p, 1))
            .collect()
    }

    /// Shortest 4-connected path, start and goal included.
    pub fn shortest_path(&self, start: FinePoint, goal: FinePoint) -> Option<Vec<FinePoint>> {
        if self.grid.is_blocked(start) || self.grid.is_blocked(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let result = astar(
            &start,
            |node| self.successors(*node),
            |node| manhattan(*node, goal),
            |node| *node == goal,
        );
        result.map(|(path, _cost)| path)
    }
}

impl PathfindingService for GridSolver {
    fn find_path(
        &self,
        start_row: usize,
        start_col: usize,
        goal_row: usize,
        goal_col: usize,
    ) -> Option<PathResult> {
        let start = FinePoint::new(start_col, start_row);
        let goal = FinePoint::new(goal_col, goal_row);
        self.shortest_path(start, goal)
            .map(|path| PathResult::from_path(&self.grid, &path))
    }
}

#[inline]
fn manhattan(a: FinePoint, b: FinePoint) -> u32 {
    (a.column.abs_diff(b.column) + a.row.abs_diff(b.row)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(width: usize, height: usize) -> Arc<OccupancyGrid> {
        Arc::new(OccupancyGrid::empty(width, height))
    }

    #[test]
    fn test_straight_path() {
        let solver = GridSolver::new(open_grid(8, 8));
        let path = solver
            .shortest_path(FinePoint::new(1, 1), FinePoint::new(5, 1))
            .unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], FinePoint::new(1, 1));
        assert_eq!(path[4], FinePoint::new(5, 1));
    }

    #[test]
    fn test_path_result_marks_cells() {
        let solver = GridSolver::new(open_grid(8, 8));
        let result = solver.find_path(1, 1, 4, 4).unwrap();
        assert_eq!(result.width(), 8);
        assert_eq!(result.height(), 8);
        // Manhattan distance 6 → 7 cells including both ends.
        assert_eq!(result.marked_count(), 7);
        assert!(result.is_marked(FinePoint::new(1, 1)));
        assert!(result.is_marked(FinePoint::new(4, 4)));
        assert_eq!(result.marked_cells().count(), 7);
    }

    #[test]
    fn test_detour_around_wall() {
        let mut grid = OccupancyGrid::empty(7, 7);
        for row in 0..6 {
            grid.block(FinePoint::new(3, row));
        }
        let solver = GridSolver::new(Arc::new(grid));
        let result = solver.find_path(0, 0, 0, 6).unwrap();
        // Must go down to row 6 to pass the wall.
        assert!(result.is_marked(FinePoint::new(3, 6)));
        // Blocked cells keep their occupancy value.
        assert_eq!(result.get(FinePoint::new(3, 0)), Some(BLOCKED));
        assert_eq!(result.marked_count(), 6 + 6 + 6 + 1);
    }

    #[test]
    fn test_unreachable_returns_none() {
        let mut grid = OccupancyGrid::empty(5, 5);
        for row in 0..5 {
            grid.block(FinePoint::new(2, row));
        }
        let solver = GridSolver::new(Arc::new(grid));
        assert!(solver.find_path(0, 0, 0, 4).is_none());
    }

    #[test]
    fn test_blocked_endpoints_return_none() {
        let mut grid = OccupancyGrid::empty(5, 5);
        grid.block(FinePoint::new(4, 4));
        let solver = GridSolver::new(Arc::new(grid));
        assert!(solver.find_path(0, 0, 4, 4).is_none());
        assert!(solver.find_path(4, 4, 0, 0).is_none());
        assert!(solver.find_path(0, 0, 9, 9).is_none());
    }

    #[test]
    fn test_same_start_and_goal() {
        let solver = GridSolver::new(open_grid(4, 4));
        let result = solver.find_path(2, 2, 2, 2).unwrap();
        assert_eq!(result.marked_count(), 1);
    }

    #[test]
    fn test_from_values_checks_length() {
        assert!(PathResult::from_values(3, 3, vec![0; 9]).is_some());
        assert!(PathResult::from_values(3, 3, vec![0; 8]).is_none());
    }

    #[test]
    fn test_arc_service_delegates() {
        let service: Arc<dyn PathfindingService> = Arc::new(GridSolver::new(open_grid(4, 4)));
        assert!(service.find_path(0, 0, 3, 3).is_some());
    }
}
