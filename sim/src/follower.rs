//! Pursuit agent: waypoint selection from path results and continuous movement.
//!
//! A [`PathFollower`] is `Idle` until its first successful replan gives it a
//! waypoint, then `Tracking` for good. Replans that fail (no path, or no path
//! cell far enough away) keep the previous waypoint. Movement runs every frame
//! and walks straight towards the waypoint at constant speed without
//! overshooting it.

use crate::components::Position;
use crate::occupancy::OccupancyGrid;
use crate::pathfinding::{PathResult, PathfindingService};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Position the agent is currently heading to, in fine coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
}

impl Waypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Pursuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChaseState {
    /// No waypoint yet; the agent stays put.
    Idle,
    /// Moving towards a waypoint.
    Tracking,
}

impl ChaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChaseState::Idle => "Idle",
            ChaseState::Tracking => "Tracking",
        }
    }
}

/// Result of one replanning attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplanOutcome {
    /// The service found no path (or an endpoint was off the grid).
    NoPath,
    /// A path exists but every path cell is closer than the minimum distance.
    NoCandidate,
    /// A new waypoint was selected.
    Updated(Waypoint),
}

impl ReplanOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, ReplanOutcome::Updated(_))
    }
}

/// Pick the marked path cell nearest to `position` among those at least
/// `min_distance` away. Ties go to the first cell in row-major order.
pub fn select_waypoint(path: &PathResult, position: Position, min_distance: f32) -> Option<Waypoint> {
    path.marked_cells()
        .map(|cell| {
            let (x, y) = cell.to_world();
            let candidate = Position::new(x, y);
            (candidate, position.distance_to(&candidate))
        })
        .filter(|(_, dist)| *dist >= min_distance)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(candidate, _)| Waypoint::new(candidate.x, candidate.y))
}

/// Step from `position` towards `target` by at most `max_step`, never past it.
pub fn move_towards(position: Position, target: Waypoint, max_step: f32) -> Position {
    if max_step <= 0.0 {
        return position;
    }
    let dx = target.x - position.x;
    let dy = target.y - position.y;
    let dist = (dx * dx + dy * dy).sqrt();

    if dist <= max_step || dist < f32::EPSILON {
        target.position()
    } else {
        Position::new(
            position.x + dx / dist * max_step,
            position.y + dy / dist * max_step,
        )
    }
}

/// Pursuit state of one chasing agent.
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathFollower {
    /// Fine units per second.
    speed: f32,
    /// Waypoint filter threshold.
    min_waypoint_distance: f32,
    waypoint: Option<Waypoint>,
}

impl PathFollower {
    pub fn new(speed: f32, min_waypoint_distance: f32) -> Self {
        Self {
            speed,
            min_waypoint_distance,
            waypoint: None,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn min_waypoint_distance(&self) -> f32 {
        self.min_waypoint_distance
    }

    pub fn waypoint(&self) -> Option<Waypoint> {
        self.waypoint
    }

    /// Replace the waypoint, e.g. with one produced on another thread.
    pub fn set_waypoint(&mut self, waypoint: Option<Waypoint>) {
        self.waypoint = waypoint;
    }

    pub fn state(&self) -> ChaseState {
        if self.waypoint.is_some() {
            ChaseState::Tracking
        } else {
            ChaseState::Idle
        }
    }

    /// Query `service` for a path from `position` to `target` and adopt the
    /// nearest eligible path cell as waypoint.
    pub fn replan(
        &mut self,
        position: Position,
        target: Position,
        grid: &OccupancyGrid,
        service: &dyn PathfindingService,
    ) -> ReplanOutcome {
        let (Some(start), Some(goal)) = (
            grid.world_to_grid(position.x, position.y),
            grid.world_to_grid(target.x, target.y),
        ) else {
            debug!(?position, ?target, "no path: endpoint outside occupancy grid");
            return ReplanOutcome::NoPath;
        };

        match service.find_path(start.row, start.column, goal.row, goal.column) {
            Some(path) => self.apply_path(position, &path),
            None => {
                debug!(?start, ?goal, "no path");
                ReplanOutcome::NoPath
            }
        }
    }

    /// Select a waypoint from an already computed path result.
    pub fn apply_path(&mut self, position: Position, path: &PathResult) -> ReplanOutcome {
        match select_waypoint(path, position, self.min_waypoint_distance) {
            Some(waypoint) => {
                debug!(?waypoint, "waypoint updated");
                self.waypoint = Some(waypoint);
                ReplanOutcome::Updated(waypoint)
            }
            None => {
                debug!(?position, "no path cell beyond minimum distance");
                ReplanOutcome::NoCandidate
            }
        }
    }

    /// Position after moving for `dt` seconds. Idle agents do not move.
    pub fn advance(&self, position: Position, dt: f32) -> Position {
        match self.waypoint {
            Some(waypoint) => move_towards(position, waypoint, self.speed * dt),
            None => position,
        }
    }
}
