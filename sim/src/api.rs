//! Public API for the simulation.
//!
//! [`MazeWorld`] is the main interface for a game host (or any other
//! client). It carves the maze, rasterizes it, places the player, the pursuer
//! and an item, then steps the chase forward.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 60 Hz). When
//! `step(dt)` is called, the simulation accumulates time and runs fixed
//! updates as needed, so replans happen at the same simulated instants
//! regardless of frame rate.

use crate::clock::{Cadence, Clock};
use crate::components::*;
use crate::config::MazeConfig;
use crate::error::MazeResult;
use crate::follower::{ChaseState, PathFollower, ReplanOutcome, Waypoint};
use crate::maze::CellGrid;
use crate::occupancy::{FinePoint, OccupancyGrid};
use crate::pathfinding::{GridSolver, PathfindingService};
use crate::planner::{BackgroundPlanner, PlanResponse};
use crate::render_bridge::PlacementSink;
use crate::spawn::SpawnSelector;
use crate::systems::*;
use crate::world::{MazeLayout, Snapshot};
use bevy_ecs::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// The main simulation world container.
///
/// Holds the ECS world and schedule together with the static maze data,
/// providing a clean API for:
/// - Generating a maze and spawning its entities
/// - Stepping the simulation forward
/// - Moving the player
/// - Extracting state snapshots and the maze layout
pub struct MazeWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
    config: MazeConfig,
    maze: CellGrid,
    occupancy: Arc<OccupancyGrid>,
    pathfinder: Arc<dyn PathfindingService>,
    /// Drives carving and every spawn decision.
    rng: ChaCha8Rng,
    /// Clock reading at the previous `advance_with_clock` call.
    last_clock: Option<f32>,
}

impl MazeWorld {
    /// Generate a maze world using the built-in A* solver.
    pub fn new(config: MazeConfig) -> MazeResult<Self> {
        Self::with_pathfinder(config, |grid| Arc::new(GridSolver::new(grid)))
    }

    /// Generate a maze world with a custom pathfinding service built from the
    /// rasterized occupancy grid.
    pub fn with_pathfinder<F>(config: MazeConfig, pathfinder: F) -> MazeResult<Self>
    where
        F: FnOnce(Arc<OccupancyGrid>) -> Arc<dyn PathfindingService>,
    {
        config.validate()?;

        let mut rng = config
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);

        let mut maze = CellGrid::new(config.maze_width, config.maze_height)?;
        maze.generate(None, &mut rng)?;
        info!(
            width = maze.width(),
            height = maze.height(),
            seed = ?config.seed,
            start = ?maze.start(),
            dead_ends = maze.dead_end_count(),
            "generated maze"
        );

        let occupancy = Arc::new(OccupancyGrid::from_maze(&maze));
        let pathfinder = pathfinder(occupancy.clone());

        let mut world = World::new();

        // Core resources
        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(SimTime(0.0));
        world.insert_resource(SimTick(0));
        world.insert_resource(Cadence::new(config.replan_interval));
        world.insert_resource(ReplanStats::default());
        world.insert_resource(OccupancyResource(occupancy.clone()));
        world.insert_resource(Pathfinder(pathfinder.clone()));
        world.insert_resource(config.clone());

        let mut schedule = Schedule::default();
        schedule.add_systems((replan_cadence_system, replan_system, movement_system).chain());

        let mut sim = Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
            config,
            maze,
            occupancy,
            pathfinder,
            rng,
            last_clock: None,
        };
        sim.spawn_entities()?;
        Ok(sim)
    }

    /// Place the player anywhere reachable, then the pursuer and the item far
    /// enough from the player.
    fn spawn_entities(&mut self) -> MazeResult<()> {
        let selector = SpawnSelector::new(
            &self.occupancy,
            self.pathfinder.as_ref(),
            self.config.spawn_max_attempts,
        );

        let player = spot_position(selector.find_spot(Position::default(), 0.0, &mut self.rng)?);
        let pursuer = spot_position(selector.find_spot(
            player,
            self.config.enemy_spawn_distance,
            &mut self.rng,
        )?);
        let item = spot_position(selector.find_spot(
            player,
            self.config.item_spawn_distance,
            &mut self.rng,
        )?);
        debug!(?player, ?pursuer, ?item, "spawned entities");

        self.world.spawn((EntityId(0), EntityKind::Player, player, Player));
        self.world.spawn((
            EntityId(1),
            EntityKind::Pursuer,
            pursuer,
            Pursuer,
            PathFollower::new(self.config.agent_speed, self.config.min_waypoint_distance),
        ));
        self.world.spawn((EntityId(2), EntityKind::Item, item, Item));
        Ok(())
    }

    /// Step the simulation forward by `dt` seconds.
    ///
    /// Uses fixed timestep internally - accumulates time and runs fixed updates
    /// as needed. Returns the number of fixed updates run.
    pub fn step(&mut self, dt: f32) -> u32 {
        let fixed_dt = self.config.fixed_timestep;

        // Accumulate time
        self.time_accumulator += dt.max(0.0);

        // Run fixed updates
        let mut updates = 0;
        while self.time_accumulator >= fixed_dt {
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
            updates += 1;
        }
        updates
    }

    /// Run a single fixed timestep update.
    fn fixed_update(&mut self, dt: f32) {
        if let Some(mut dt_res) = self.world.get_resource_mut::<DeltaTime>() {
            dt_res.0 = dt;
        }
        // Systems see the time at the start of this tick.
        if let Some(mut time_res) = self.world.get_resource_mut::<SimTime>() {
            time_res.0 = self.time;
        }
        if let Some(mut tick_res) = self.world.get_resource_mut::<SimTick>() {
            tick_res.increment();
        }

        self.schedule.run(&mut self.world);

        self.tick += 1;
        self.time += dt;
    }

    /// Step by the time `clock` has advanced since the previous call (since
    /// the clock's origin on the first call).
    pub fn advance_with_clock<C: Clock + ?Sized>(&mut self, clock: &C) -> u32 {
        let now = clock.now();
        let elapsed = now - self.last_clock.unwrap_or(0.0);
        self.last_clock = Some(now);
        self.step(elapsed)
    }

    /// Move the player by `(dx, dy)`, sliding along walls.
    ///
    /// The full move is tried first, then each axis alone. Returns false if
    /// the player could not move at all.
    pub fn move_player(&mut self, dx: f32, dy: f32) -> bool {
        let Some(from) = self.player_position() else {
            return false;
        };
        let candidates = [
            Position::new(from.x + dx, from.y + dy),
            Position::new(from.x + dx, from.y),
            Position::new(from.x, from.y + dy),
        ];
        let target = candidates
            .into_iter()
            .find(|p| *p != from && self.is_clear(*p));
        match target {
            Some(to) => self.write_player_position(to),
            None => false,
        }
    }

    /// Teleport the player. Rejected if the destination is blocked.
    pub fn set_player_position(&mut self, x: f32, y: f32) -> bool {
        let to = Position::new(x, y);
        self.is_clear(to) && self.write_player_position(to)
    }

    fn write_player_position(&mut self, to: Position) -> bool {
        let mut query = self.world.query_filtered::<&mut Position, With<Player>>();
        match query.get_single_mut(&mut self.world) {
            Ok(mut pos) => {
                *pos = to;
                true
            }
            Err(_) => false,
        }
    }

    /// Whether a disc of `player_radius` around `pos` touches only passable cells.
    fn is_clear(&self, pos: Position) -> bool {
        let r = self.config.player_radius;
        [(0.0, 0.0), (-r, -r), (r, -r), (-r, r), (r, r)]
            .iter()
            .all(|(ox, oy)| self.occupancy.is_world_passable(pos.x + ox, pos.y + oy))
    }

    fn position_of<M: Component>(&mut self) -> Option<Position> {
        let mut query = self.world.query_filtered::<&Position, With<M>>();
        query.get_single(&self.world).ok().copied()
    }

    fn follower(&mut self) -> Option<PathFollower> {
        let mut query = self.world.query::<&PathFollower>();
        query.get_single(&self.world).ok().cloned()
    }

    pub fn player_position(&mut self) -> Option<Position> {
        self.position_of::<Player>()
    }

    pub fn pursuer_position(&mut self) -> Option<Position> {
        self.position_of::<Pursuer>()
    }

    pub fn item_position(&mut self) -> Option<Position> {
        self.position_of::<Item>()
    }

    pub fn pursuer_state(&mut self) -> Option<ChaseState> {
        self.follower().map(|f| f.state())
    }

    pub fn pursuer_waypoint(&mut self) -> Option<Waypoint> {
        self.follower().and_then(|f| f.waypoint())
    }

    /// A worker thread answering path queries against this world's grid.
    pub fn background_planner(&self) -> BackgroundPlanner {
        BackgroundPlanner::spawn(self.pathfinder.clone())
    }

    /// Occupancy indices of the pursuer and the player, for a planner request.
    pub fn chase_endpoints(&mut self) -> Option<(FinePoint, FinePoint)> {
        let pursuer = self.pursuer_position()?;
        let player = self.player_position()?;
        Some((
            self.occupancy.world_to_grid(pursuer.x, pursuer.y)?,
            self.occupancy.world_to_grid(player.x, player.y)?,
        ))
    }

    /// Feed a background planner result to the pursuer.
    pub fn apply_plan(&mut self, response: &PlanResponse) -> ReplanOutcome {
        let mut query = self
            .world
            .query_filtered::<(&Position, &mut PathFollower), With<Pursuer>>();
        let outcome = match query.get_single_mut(&mut self.world) {
            Ok((pos, mut follower)) => match &response.path {
                Some(path) => follower.apply_path(*pos, path),
                None => ReplanOutcome::NoPath,
            },
            Err(_) => ReplanOutcome::NoPath,
        };

        if let Some(mut stats) = self.world.get_resource_mut::<ReplanStats>() {
            stats.replans += 1;
            if !outcome.is_updated() {
                stats.failed += 1;
            }
        }
        outcome
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time, &self.maze)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Static maze description.
    pub fn layout(&self) -> MazeLayout {
        MazeLayout::from_grid(&self.maze, self.config.seed)
    }

    /// Replay every wall placement, then every entity placement, to `sink`.
    pub fn place_all<S: PlacementSink + ?Sized>(&mut self, sink: &mut S) {
        OccupancyGrid::rasterize_with(&self.maze, sink);

        let mut query = self.world.query::<(&EntityId, &EntityKind, &Position)>();
        let mut entities: Vec<(EntityId, EntityKind, Position)> = query
            .iter(&self.world)
            .map(|(id, kind, pos)| (*id, *kind, *pos))
            .collect();
        entities.sort_by_key(|(id, _, _)| id.0);
        for (_, kind, pos) in entities {
            sink.place_entity(kind, pos.x, pos.y);
        }
    }

    pub fn cell_grid(&self) -> &CellGrid {
        &self.maze
    }

    pub fn occupancy(&self) -> &OccupancyGrid {
        &self.occupancy
    }

    pub fn pathfinder(&self) -> Arc<dyn PathfindingService> {
        self.pathfinder.clone()
    }

    pub fn config(&self) -> &MazeConfig {
        &self.config
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn replan_stats(&self) -> ReplanStats {
        self.world
            .get_resource::<ReplanStats>()
            .copied()
            .unwrap_or_default()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

fn spot_position(spot: FinePoint) -> Position {
    Position::from(spot.to_world())
}
