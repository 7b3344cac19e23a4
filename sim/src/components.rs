//! ECS Components for the maze chase simulation.
//!
//! Components are pure data containers attached to entities.
//! The chase logic lives in [`crate::follower`] and the systems that drive it.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position in fine maze coordinates (x = column, y = row).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f32, f32)> for Position {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Stable identifier for a spawned entity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// What an entity is, for snapshots and placement.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// The pursued entity.
    Player,
    /// The chasing agent.
    Pursuer,
    /// A static pickup.
    Item,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Player => "Player",
            EntityKind::Pursuer => "Pursuer",
            EntityKind::Item => "Item",
        }
    }
}

/// Marker for the pursued entity.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// Marker for chasing agents.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Pursuer;

/// Marker for pickups.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Item;
