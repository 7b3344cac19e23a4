//! Snapshot types.
//!
//! `Snapshot` is a serializable view of the entities at one tick;
//! `MazeLayout` is the static maze, sent once per generated world.

use crate::components::*;
use crate::follower::PathFollower;
use crate::maze::{CellGrid, Point};
use crate::systems::ReplanStats;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Wall bits used in [`MazeLayout::walls`].
pub const WALL_NORTH: u8 = 1;
pub const WALL_EAST: u8 = 2;
pub const WALL_SOUTH: u8 = 4;
pub const WALL_WEST: u8 = 8;

/// Snapshot of a single entity's state for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: u32,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    /// "Idle" or "Tracking"; entities without a follower are "Idle".
    pub state: String,
    pub waypoint: Option<(f32, f32)>,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub maze_width: usize,
    pub maze_height: usize,
    /// All entities, ordered by id.
    pub entities: Vec<EntitySnapshot>,
    pub replans: u64,
    pub failed_replans: u64,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32, maze: &CellGrid) -> Self {
        let mut entities = Vec::new();

        let mut query = world.query::<(&EntityId, &EntityKind, &Position, Option<&PathFollower>)>();
        for (id, kind, pos, follower) in query.iter(world) {
            let (state, waypoint) = match follower {
                Some(f) => (f.state().as_str(), f.waypoint().map(|w| (w.x, w.y))),
                None => ("Idle", None),
            };
            entities.push(EntitySnapshot {
                id: id.0,
                kind: kind.as_str().to_string(),
                x: pos.x,
                y: pos.y,
                state: state.to_string(),
                waypoint,
            });
        }
        entities.sort_by_key(|e| e.id);

        let stats = world
            .get_resource::<ReplanStats>()
            .copied()
            .unwrap_or_default();

        Self {
            tick,
            time,
            maze_width: maze.width(),
            maze_height: maze.height(),
            entities,
            replans: stats.replans,
            failed_replans: stats.failed,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// First entity of the given kind.
    pub fn entity(&self, kind: EntityKind) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| e.kind == kind.as_str())
    }
}

/// Static description of a carved maze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeLayout {
    pub width: usize,
    pub height: usize,
    pub start: Point,
    pub seed: Option<u64>,
    /// Row-major wall bitmasks, one per cell (see `WALL_*`).
    pub walls: Vec<u8>,
}

impl MazeLayout {
    pub fn from_grid(maze: &CellGrid, seed: Option<u64>) -> Self {
        let walls = maze
            .cells()
            .iter()
            .map(|cell| {
                let mut bits = 0;
                if cell.north_wall {
                    bits |= WALL_NORTH;
                }
                if cell.east_wall {
                    bits |= WALL_EAST;
                }
                if cell.south_wall {
                    bits |= WALL_SOUTH;
                }
                if cell.west_wall {
                    bits |= WALL_WEST;
                }
                bits
            })
            .collect();

        Self {
            width: maze.width(),
            height: maze.height(),
            start: maze.start(),
            seed,
            walls,
        }
    }

    /// Wall bits of cell `(column, row)`.
    pub fn walls_at(&self, column: usize, row: usize) -> Option<u8> {
        if column < self.width && row < self.height {
            self.walls.get(row * self.width + column).copied()
        } else {
            None
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::follower::Waypoint;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_snapshot_from_world() {
        let maze = CellGrid::new(3, 2).unwrap();
        let mut world = World::new();
        world.insert_resource(ReplanStats { replans: 4, failed: 1 });

        let mut follower = PathFollower::new(1.0, 0.9);
        follower.set_waypoint(Some(Waypoint::new(2.0, 0.0)));
        world.spawn((EntityId(1), EntityKind::Pursuer, Position::new(1.0, 0.0), Pursuer, follower));
        world.spawn((EntityId(0), EntityKind::Player, Position::new(4.0, 2.0), Player));

        let snapshot = Snapshot::from_world(&mut world, 7, 0.5, &maze);
        assert_eq!(snapshot.tick, 7);
        assert_eq!(snapshot.maze_width, 3);
        assert_eq!(snapshot.maze_height, 2);
        assert_eq!(snapshot.replans, 4);
        assert_eq!(snapshot.failed_replans, 1);
        assert_eq!(snapshot.entities.len(), 2);
        assert_eq!(snapshot.entities[0].kind, "Player");
        assert_eq!(snapshot.entities[0].state, "Idle");

        let pursuer = snapshot.entity(EntityKind::Pursuer).unwrap();
        assert_eq!(pursuer.state, "Tracking");
        assert_eq!(pursuer.waypoint, Some((2.0, 0.0)));
    }

    #[test]
    fn test_layout_bitmasks() {
        let mut maze = CellGrid::new(4, 4).unwrap();
        maze.generate(Some(Point::new(0, 0)), &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        let layout = MazeLayout::from_grid(&maze, Some(3));

        assert_eq!(layout.walls.len(), 16);
        assert_eq!(layout.start, Point::new(0, 0));
        // Outer boundary walls are never carved.
        assert_ne!(layout.walls_at(0, 0).unwrap() & WALL_NORTH, 0);
        assert_ne!(layout.walls_at(0, 0).unwrap() & WALL_WEST, 0);
        assert_ne!(layout.walls_at(3, 3).unwrap() & WALL_SOUTH, 0);
        assert_ne!(layout.walls_at(3, 3).unwrap() & WALL_EAST, 0);
        assert_eq!(layout.walls_at(4, 0), None);

        let json = layout.to_json().unwrap();
        let restored: MazeLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, layout);
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snapshot = Snapshot {
            tick: 42,
            time: 0.7,
            maze_width: 8,
            maze_height: 8,
            entities: vec![EntitySnapshot {
                id: 1,
                kind: "Pursuer".to_string(),
                x: 2.5,
                y: 4.0,
                state: "Tracking".to_string(),
                waypoint: Some((3.0, 4.0)),
            }],
            replans: 3,
            failed_replans: 0,
        };

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"Tracking\""));
        let restored: Snapshot = serde_json::from_str(&snapshot.to_json_pretty().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
        assert!(serde_json::from_str::<Snapshot>("{\"tick\": }").is_err());
    }
}
