//! Constrained random spawn placement on the occupancy grid.

use crate::components::Position;
use crate::error::{MazeError, MazeResult};
use crate::occupancy::{FinePoint, OccupancyGrid, MARGIN};
use crate::pathfinding::PathfindingService;
use rand::Rng;
use tracing::warn;

/// Samples interior fine cells until one is passable, reachable from the
/// reference origin and far enough from a given position.
pub struct SpawnSelector<'a> {
    grid: &'a OccupancyGrid,
    service: &'a dyn PathfindingService,
    /// Reachability is checked from here (defaults to the centre of maze cell (0, 0)).
    origin: FinePoint,
    max_attempts: u32,
}

impl<'a> SpawnSelector<'a> {
    pub fn new(grid: &'a OccupancyGrid, service: &'a dyn PathfindingService, max_attempts: u32) -> Self {
        Self {
            grid,
            service,
            origin: FinePoint::new(MARGIN, MARGIN),
            max_attempts,
        }
    }

    /// Use a different reachability origin.
    pub fn with_origin(mut self, origin: FinePoint) -> Self {
        self.origin = origin;
        self
    }

    pub fn origin(&self) -> FinePoint {
        self.origin
    }

    /// True when the service finds no path between the two cells.
    pub fn is_unreachable(&self, from: FinePoint, to: FinePoint) -> bool {
        self.service
            .find_path(from.row, from.column, to.row, to.column)
            .is_none()
    }

    /// Whether `spot` satisfies every spawn constraint.
    pub fn is_valid_spot(&self, spot: FinePoint, reference: Position, min_distance: f32) -> bool {
        let (x, y) = spot.to_world();
        self.grid.is_passable(spot)
            && reference.distance_to(&Position::new(x, y)) >= min_distance
            && !self.is_unreachable(self.origin, spot)
    }

    /// Find a spot at least `min_distance` from `reference`.
    ///
    /// Gives up with [`MazeError::SpawnUnavailable`] after `max_attempts` samples.
    pub fn find_spot<R: Rng + ?Sized>(
        &self,
        reference: Position,
        min_distance: f32,
        rng: &mut R,
    ) -> MazeResult<FinePoint> {
        let columns = self.grid.interior_columns();
        let rows = self.grid.interior_rows();

        if !columns.is_empty() && !rows.is_empty() {
            for _ in 0..self.max_attempts {
                let spot = FinePoint::new(
                    rng.gen_range(columns.clone()),
                    rng.gen_range(rows.clone()),
                );
                if self.is_valid_spot(spot, reference, min_distance) {
                    return Ok(spot);
                }
            }
        }

        warn!(
            attempts = self.max_attempts,
            min_distance,
            ?reference,
            "spawn selection exhausted its retry budget"
        );
        Err(MazeError::SpawnUnavailable {
            attempts: self.max_attempts,
            min_distance,
        })
    }
}
