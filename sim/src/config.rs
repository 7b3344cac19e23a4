//! Configuration for maze generation, spawning and pursuit.

use crate::error::{MazeError, MazeResult};
use crate::maze::check_dimensions;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// All tunables for a maze world.
///
/// Missing JSON fields fall back to the defaults below.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeConfig {
    /// Maze width in logical cells.
    pub maze_width: usize,
    /// Maze height in logical cells.
    pub maze_height: usize,
    /// Pursuer speed in fine units per second.
    pub agent_speed: f32,
    /// Seconds of simulated time between replans.
    pub replan_interval: f32,
    /// Path cells closer than this to the pursuer are never chosen as waypoint.
    pub min_waypoint_distance: f32,
    /// Fixed timestep in seconds (e.g., 1/60 for 60 Hz).
    pub fixed_timestep: f32,
    /// Seed for carving and spawn selection. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Retry budget for each spawn selection.
    pub spawn_max_attempts: u32,
    /// Minimum distance between the player and the pursuer at spawn.
    pub enemy_spawn_distance: f32,
    /// Minimum distance between the player and the item at spawn.
    pub item_spawn_distance: f32,
    /// Collision probe radius used when moving the player.
    pub player_radius: f32,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            maze_width: 64,
            maze_height: 64,
            agent_speed: 1.0,
            replan_interval: 0.3,
            min_waypoint_distance: 0.9,
            fixed_timestep: 1.0 / 60.0, // 60 Hz
            seed: None,
            spawn_max_attempts: 10_000,
            enemy_spawn_distance: 10.0,
            item_spawn_distance: 10.0,
            player_radius: 0.3,
        }
    }
}

impl MazeConfig {
    /// Square maze with default tunables.
    pub fn with_size(size: usize) -> Self {
        Self {
            maze_width: size,
            maze_height: size,
            ..Default::default()
        }
    }

    /// Builder-style seed setter.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject configurations that would make generation or pursuit meaningless.
    pub fn validate(&self) -> MazeResult<()> {
        check_dimensions(self.maze_width, self.maze_height)?;
        check_positive("agent_speed", self.agent_speed)?;
        check_positive("replan_interval", self.replan_interval)?;
        check_positive("fixed_timestep", self.fixed_timestep)?;
        check_non_negative("min_waypoint_distance", self.min_waypoint_distance)?;
        check_non_negative("enemy_spawn_distance", self.enemy_spawn_distance)?;
        check_non_negative("item_spawn_distance", self.item_spawn_distance)?;
        check_non_negative("player_radius", self.player_radius)?;
        if self.player_radius >= 1.0 {
            return Err(MazeError::invalid_config(format!(
                "player_radius must be below one fine cell, got {}",
                self.player_radius
            )));
        }
        if self.spawn_max_attempts == 0 {
            return Err(MazeError::invalid_config("spawn_max_attempts must be positive"));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(data: &str) -> MazeResult<Self> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> MazeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn check_positive(name: &str, value: f32) -> MazeResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MazeError::invalid_config(format!("{name} must be positive, got {value}")))
    }
}

fn check_non_negative(name: &str, value: f32) -> MazeResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MazeError::invalid_config(format!("{name} must be non-negative, got {value}")))
    }
}
