//! ECS systems for the maze chase simulation.
//!
//! One fixed update runs three systems in a chain:
//!
//! 1. `replan_cadence_system` - polls the [`crate::clock::Cadence`] with the
//!    simulated time
//! 2. `replan_system` - when the cadence fired, every pursuer queries the
//!    pathfinding service for a route to the player and picks a waypoint
//! 3. `movement_system` - every pursuer walks towards its waypoint
//!
//! Replanning is infrequent and movement runs every frame, so the pursuer
//! moves smoothly between path queries.

pub mod chase;
pub mod movement;

pub use chase::*;
pub use movement::*;
