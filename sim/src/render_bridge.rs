//! Rendering Bridge
//!
//! Hands simulation state to a presentation layer. There are two shapes:
//!
//! - **Callbacks**: a [`PlacementSink`] receives one call per newly blocked
//!   occupancy cell during rasterization and one call per entity from
//!   `MazeWorld::place_all`.
//! - **Flat buffers**: contiguous `f32` arrays with a fixed stride, suited to
//!   FFI hosts that want to avoid per-item calls.
//!
//! # Wall Buffer Layout
//!
//! ```text
//! [0]                      wall_count
//! [1 + i * WALL_STRIDE]    column (fine coordinates, margin removed)
//! [2 + i * WALL_STRIDE]    row
//! ```
//!
//! # Entity Buffer Layout
//!
//! ```text
//! [0] entity_count
//! For each entity i (offset = 1 + i * ENTITY_STRIDE):
//!   [+0] id
//!   [+1] kind_id       (see KIND_* constants)
//!   [+2] x
//!   [+3] y
//!   [+4] has_waypoint  (1.0 / 0.0)
//!   [+5] waypoint_x    (0.0 without waypoint)
//!   [+6] waypoint_y
//!   [+7] state_id      (see STATE_* constants)
//! ```
//!
//! Both buffers are deterministic: the same input always yields the same
//! output, in the input's order.

use crate::components::EntityKind;
use crate::occupancy::{FinePoint, OccupancyGrid};
use crate::world::Snapshot;

// ============================================================================
// PLACEMENT CALLBACKS
// ============================================================================

/// Receiver for placement events, coordinates in fine world units.
pub trait PlacementSink {
    /// A wall occupies the fine cell at `(column, row)`. Margin cells use
    /// negative coordinates.
    fn place_wall_segment(&mut self, column: i32, row: i32);

    /// An entity stands at `(x, y)`.
    fn place_entity(&mut self, kind: EntityKind, x: f32, y: f32);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PlacementSink for NullSink {
    fn place_wall_segment(&mut self, _column: i32, _row: i32) {}

    fn place_entity(&mut self, _kind: EntityKind, _x: f32, _y: f32) {}
}

/// Stores every event, in call order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingSink {
    pub walls: Vec<(i32, i32)>,
    pub entities: Vec<(EntityKind, f32, f32)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.walls.clear();
        self.entities.clear();
    }
}

impl PlacementSink for RecordingSink {
    fn place_wall_segment(&mut self, column: i32, row: i32) {
        self.walls.push((column, row));
    }

    fn place_entity(&mut self, kind: EntityKind, x: f32, y: f32) {
        self.entities.push((kind, x, y));
    }
}

// ============================================================================
// CONSTANTS - FLAT BUFFER CONTRACT
// ============================================================================

/// Number of f32 values in each buffer header (the item count).
pub const HEADER_SIZE: usize = 1;

/// Values per wall cell: column, row.
pub const WALL_STRIDE: usize = 2;

/// Values per entity.
pub const ENTITY_STRIDE: usize = 8;

pub const KIND_PLAYER: f32 = 0.0;
pub const KIND_PURSUER: f32 = 1.0;
pub const KIND_ITEM: f32 = 2.0;

pub const STATE_IDLE: f32 = 0.0;
pub const STATE_TRACKING: f32 = 1.0;

pub const FIELD_ID: usize = 0;
pub const FIELD_KIND: usize = 1;
pub const FIELD_X: usize = 2;
pub const FIELD_Y: usize = 3;
pub const FIELD_HAS_WAYPOINT: usize = 4;
pub const FIELD_WAYPOINT_X: usize = 5;
pub const FIELD_WAYPOINT_Y: usize = 6;
pub const FIELD_STATE: usize = 7;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Kind name to numeric ID. Unknown names map to [`KIND_ITEM`].
#[inline]
pub fn kind_to_id(kind: &str) -> f32 {
    match kind {
        "Player" => KIND_PLAYER,
        "Pursuer" => KIND_PURSUER,
        _ => KIND_ITEM,
    }
}

/// State name to numeric ID. Anything but "Tracking" is idle.
#[inline]
pub fn state_to_id(state: &str) -> f32 {
    if state == "Tracking" {
        STATE_TRACKING
    } else {
        STATE_IDLE
    }
}

#[inline]
pub const fn entity_offset(index: usize) -> usize {
    HEADER_SIZE + index * ENTITY_STRIDE
}

#[inline]
pub const fn wall_offset(index: usize) -> usize {
    HEADER_SIZE + index * WALL_STRIDE
}

/// Item count stored in a buffer header, `None` for an empty buffer.
#[inline]
pub fn parse_count(buffer: &[f32]) -> Option<usize> {
    buffer.first().map(|&count| count as usize)
}

// ============================================================================
// SERIALIZATION
// ============================================================================

/// Every blocked cell of `grid` in row-major order, margin included.
pub fn walls_to_flatbuffer(grid: &OccupancyGrid) -> Vec<f32> {
    let mut cells = Vec::with_capacity(grid.blocked_count() * WALL_STRIDE);
    for row in 0..grid.height() {
        for column in 0..grid.width() {
            let point = FinePoint::new(column, row);
            if grid.is_blocked(point) {
                let (x, y) = point.to_fine();
                cells.push(x as f32);
                cells.push(y as f32);
            }
        }
    }

    let mut buffer = Vec::with_capacity(HEADER_SIZE + cells.len());
    buffer.push((cells.len() / WALL_STRIDE) as f32);
    buffer.extend(cells);
    buffer
}

/// Entities of a snapshot as a fixed-stride buffer.
pub fn snapshot_to_flatbuffer(snapshot: &Snapshot) -> Vec<f32> {
    let count = snapshot.entities.len();
    let size = entity_offset(count);
    let mut buffer = Vec::with_capacity(size);
    buffer.push(count as f32);

    for entity in &snapshot.entities {
        let (has_waypoint, wx, wy) = match entity.waypoint {
            Some((x, y)) => (1.0, x, y),
            None => (0.0, 0.0, 0.0),
        };
        buffer.push(entity.id as f32);
        buffer.push(kind_to_id(&entity.kind));
        buffer.push(entity.x);
        buffer.push(entity.y);
        buffer.push(has_waypoint);
        buffer.push(wx);
        buffer.push(wy);
        buffer.push(state_to_id(&entity.state));
    }

    debug_assert_eq!(buffer.len(), size, "Buffer size mismatch");
    buffer
}
