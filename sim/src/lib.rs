//! Maze Chase - Simulation Core
//!
//! Carves a perfect maze with a recursive backtracker, rasterizes it into a
//! double-resolution occupancy grid and runs a pursuer that periodically
//! replans a path to the player and walks towards the next step.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod clock;
pub mod components;
pub mod config;
pub mod error;
pub mod follower;
pub mod maze;
pub mod occupancy;
pub mod pathfinding;
pub mod planner;
pub mod render_bridge;
pub mod spawn;
pub mod systems;
pub mod world;

pub use api::MazeWorld;
pub use clock::{Cadence, Clock, ManualClock, SystemClock};
pub use components::*;
pub use config::MazeConfig;
pub use error::{MazeError, MazeResult};
pub use follower::{move_towards, select_waypoint, ChaseState, PathFollower, ReplanOutcome, Waypoint};
pub use maze::{CarveEvent, Cell, CellGrid, Direction, Point};
pub use occupancy::{FinePoint, OccupancyGrid, MARGIN};
pub use pathfinding::{GridSolver, PathResult, PathfindingService, PATH_MARKER};
pub use planner::{BackgroundPlanner, PlanResponse, SharedWaypoint};
pub use render_bridge::{PlacementSink, RecordingSink};
pub use spawn::SpawnSelector;
pub use systems::*;
pub use world::{EntitySnapshot, MazeLayout, Snapshot};
