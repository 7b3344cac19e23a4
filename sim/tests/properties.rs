//! Property-based tests for carving, rasterization and pursuit.
//!
//! Run with: cargo test -p maze_chase_sim -- proptest

use maze_chase_sim::{
    move_towards, select_waypoint, CellGrid, Direction, FinePoint, OccupancyGrid, PathResult,
    Point, Position, Waypoint, MARGIN, PATH_MARKER,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashSet, VecDeque};

// =============================================================================
// Helpers
// =============================================================================

fn carve(width: usize, height: usize, seed: u64) -> CellGrid {
    let mut maze = CellGrid::new(width, height).unwrap();
    maze.generate(None, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();
    maze
}

/// Cells reachable from (0, 0) through carved passages.
fn reachable_cells(maze: &CellGrid) -> usize {
    let mut seen = HashSet::from([Point::new(0, 0)]);
    let mut queue = VecDeque::from([Point::new(0, 0)]);
    while let Some(point) = queue.pop_front() {
        for direction in Direction::CARDINAL {
            if !maze.is_passage(point, direction) {
                continue;
            }
            if let Some(next) = maze.neighbor(point, direction) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    seen.len()
}

/// Maze dimensions and a seed.
fn arb_maze() -> impl Strategy<Value = (usize, usize, u64)> {
    (1usize..=24, 1usize..=24, any::<u64>())
}

/// Path result on a 16x16 grid with random marked world cells, plus a position.
fn arb_path_and_position() -> impl Strategy<Value = (PathResult, Position)> {
    let cells = prop::collection::vec((0usize..10, 0usize..10), 0..20);
    let position = (0.0f32..10.0, 0.0f32..10.0);
    (cells, position).prop_map(|(cells, (x, y))| {
        let mut values = vec![0u8; 16 * 16];
        for (cx, cy) in cells {
            values[(cy + MARGIN) * 16 + cx + MARGIN] = PATH_MARKER;
        }
        (
            PathResult::from_values(16, 16, values).unwrap(),
            Position::new(x, y),
        )
    })
}

// =============================================================================
// Carving
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_every_cell_visited_once((width, height, seed) in arb_maze()) {
        let maze = carve(width, height, seed);
        prop_assert!(maze.is_generated());

        let mut orders: Vec<u32> = maze.cells().iter().map(|c| c.visit_order).collect();
        orders.sort_unstable();
        let expected: Vec<u32> = (1..=(width * height) as u32).collect();
        prop_assert_eq!(orders, expected);
    }

    #[test]
    fn proptest_passage_count_is_spanning_tree((width, height, seed) in arb_maze()) {
        let maze = carve(width, height, seed);
        prop_assert_eq!(maze.passage_count(), width * height - 1);
        prop_assert_eq!(reachable_cells(&maze), width * height);
    }

    #[test]
    fn proptest_carved_walls_are_symmetric((width, height, seed) in arb_maze()) {
        let maze = carve(width, height, seed);
        for event in maze.carve_log() {
            if event.direction == Direction::Invalid {
                continue;
            }
            let cell = maze.get_cell(event.point).unwrap();
            prop_assert!(!cell.has_wall(event.direction));

            let neighbor = maze.neighbor(event.point, event.direction).unwrap();
            let other = maze.get_cell(neighbor).unwrap();
            prop_assert!(!other.has_wall(event.direction.opposite()));
        }
    }

    #[test]
    fn proptest_seeded_generation_is_reproducible((width, height, seed) in arb_maze()) {
        prop_assert_eq!(carve(width, height, seed), carve(width, height, seed));
    }
}

// =============================================================================
// Rasterization
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_margin_always_blocked((width, height, seed) in arb_maze()) {
        let grid = OccupancyGrid::from_maze(&carve(width, height, seed));
        prop_assert_eq!(grid.width(), 2 * width + 6);
        prop_assert_eq!(grid.height(), 2 * height + 6);

        for row in 0..grid.height() {
            for column in 0..grid.width() {
                let point = FinePoint::new(column, row);
                if grid.is_margin(point) {
                    prop_assert!(grid.is_blocked(point), "margin cell {:?} passable", point);
                }
            }
        }
    }

    #[test]
    fn proptest_cell_centres_passable((width, height, seed) in arb_maze()) {
        let maze = carve(width, height, seed);
        let grid = OccupancyGrid::from_maze(&maze);
        for cell in maze.cells() {
            let (x, y) = (2 * cell.point.column, 2 * cell.point.row);
            prop_assert!(grid.is_world_passable(x as f32, y as f32));
        }
    }
}

// =============================================================================
// Pursuit
// =============================================================================

proptest! {
    #[test]
    fn proptest_waypoint_is_nearest_beyond_threshold(
        (path, position) in arb_path_and_position(),
        min_distance in 0.0f32..3.0,
    ) {
        let brute_force = path
            .marked_cells()
            .map(|cell| cell.to_world())
            .map(|(x, y)| (x, y, position.distance_to(&Position::new(x, y))))
            .filter(|(_, _, d)| *d >= min_distance)
            .map(|(_, _, d)| d)
            .fold(None, |best: Option<f32>, d| Some(best.map_or(d, |b| b.min(d))));

        match (select_waypoint(&path, position, min_distance), brute_force) {
            (Some(waypoint), Some(best)) => {
                let d = position.distance_to(&waypoint.position());
                prop_assert!(d >= min_distance);
                prop_assert_eq!(d, best);
            }
            (None, None) => {}
            (got, want) => prop_assert!(false, "selected {:?}, expected distance {:?}", got, want),
        }
    }

    #[test]
    fn proptest_move_law_never_overshoots(
        (px, py) in (-50.0f32..50.0, -50.0f32..50.0),
        (wx, wy) in (-50.0f32..50.0, -50.0f32..50.0),
        speed in 0.1f32..10.0,
        dt in 0.001f32..0.5,
    ) {
        let start = Position::new(px, py);
        let waypoint = Waypoint::new(wx, wy);
        let step = speed * dt;
        let before = start.distance_to(&waypoint.position());

        let moved = move_towards(start, waypoint, step);
        let travelled = start.distance_to(&moved);
        let after = moved.distance_to(&waypoint.position());

        prop_assert!(travelled <= step + 1e-3);
        prop_assert!(after <= before + 1e-3);
        let expected = (before - step).max(0.0);
        prop_assert!((after - expected).abs() < 1e-3, "after {} expected {}", after, expected);
    }
}
