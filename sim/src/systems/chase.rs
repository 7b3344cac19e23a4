//! Replanning systems - periodic path queries from each pursuer to the player.

use crate::clock::Cadence;
use crate::components::{Player, Position};
use crate::follower::{PathFollower, ReplanOutcome};
use crate::occupancy::OccupancyGrid;
use crate::pathfinding::PathfindingService;
use crate::systems::movement::SimTime;
use bevy_ecs::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// The occupancy grid the pathfinder searches.
#[derive(Resource, Clone)]
pub struct OccupancyResource(pub Arc<OccupancyGrid>);

/// Pathfinding service used for replans.
#[derive(Resource, Clone)]
pub struct Pathfinder(pub Arc<dyn PathfindingService>);

/// Running replan counters.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplanStats {
    /// Replans attempted.
    pub replans: u64,
    /// Replans that left the waypoint unchanged.
    pub failed: u64,
}

/// Polls the replan cadence against the simulated clock.
pub fn replan_cadence_system(time: Res<SimTime>, mut cadence: ResMut<Cadence>) {
    cadence.poll(time.0);
}

/// On a due cadence, every pursuer replans towards the player.
pub fn replan_system(
    cadence: Res<Cadence>,
    grid: Res<OccupancyResource>,
    pathfinder: Res<Pathfinder>,
    mut stats: ResMut<ReplanStats>,
    players: Query<&Position, With<Player>>,
    mut pursuers: Query<(&Position, &mut PathFollower), Without<Player>>,
) {
    if !cadence.is_due() {
        return;
    }
    let Ok(target) = players.get_single() else {
        debug!("replan skipped: no single player entity");
        return;
    };

    for (position, mut follower) in pursuers.iter_mut() {
        let outcome = follower.replan(*position, *target, &grid.0, pathfinder.0.as_ref());
        stats.replans += 1;
        if !matches!(outcome, ReplanOutcome::Updated(_)) {
            stats.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::follower::{ChaseState, Waypoint};
    use crate::pathfinding::{GridSolver, PathResult};
    use crate::systems::movement::{movement_system, DeltaTime};

    struct NoPath;

    impl PathfindingService for NoPath {
        fn find_path(&self, _: usize, _: usize, _: usize, _: usize) -> Option<PathResult> {
            None
        }
    }

    fn chase_world(service: Arc<dyn PathfindingService>, grid: Arc<OccupancyGrid>) -> World {
        let mut world = World::new();
        world.insert_resource(SimTime(0.0));
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(Cadence::new(0.3));
        world.insert_resource(OccupancyResource(grid));
        world.insert_resource(Pathfinder(service));
        world.insert_resource(ReplanStats::default());
        world.spawn((Position::new(6.0, 0.0), Player));
        world.spawn((Position::new(0.0, 0.0), PathFollower::new(1.0, 0.9)));
        world
    }

    fn schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems((replan_cadence_system, replan_system, movement_system).chain());
        schedule
    }

    fn follower(world: &mut World) -> PathFollower {
        let mut query = world.query::<&PathFollower>();
        query.single(world).clone()
    }

    #[test]
    fn test_first_tick_replans() {
        let grid = Arc::new(OccupancyGrid::empty(12, 12));
        let solver: Arc<dyn PathfindingService> = Arc::new(GridSolver::new(grid.clone()));
        let mut world = chase_world(solver, grid);

        schedule().run(&mut world);

        let f = follower(&mut world);
        assert_eq!(f.state(), ChaseState::Tracking);
        assert_eq!(f.waypoint(), Some(Waypoint::new(1.0, 0.0)));
        assert_eq!(*world.resource::<ReplanStats>(), ReplanStats { replans: 1, failed: 0 });
    }

    #[test]
    fn test_replans_only_on_cadence() {
        let grid = Arc::new(OccupancyGrid::empty(12, 12));
        let solver: Arc<dyn PathfindingService> = Arc::new(GridSolver::new(grid.clone()));
        let mut world = chase_world(solver, grid);
        let mut schedule = schedule();

        // t = 0.0, 0.1, 0.2, 0.3, 0.4
        for step in 0..5 {
            world.resource_mut::<SimTime>().0 = step as f32 * 0.1;
            schedule.run(&mut world);
        }
        assert_eq!(world.resource::<ReplanStats>().replans, 2);
    }

    #[test]
    fn test_no_path_counts_as_failed() {
        let grid = Arc::new(OccupancyGrid::empty(12, 12));
        let mut world = chase_world(Arc::new(NoPath), grid);

        schedule().run(&mut world);

        assert_eq!(follower(&mut world).state(), ChaseState::Idle);
        assert_eq!(*world.resource::<ReplanStats>(), ReplanStats { replans: 1, failed: 1 });
        let mut query = world.query_filtered::<&Position, With<PathFollower>>();
        assert_eq!(*query.single(&world), Position::new(0.0, 0.0));
    }

    #[test]
    fn test_missing_player_skips_replan() {
        let grid = Arc::new(OccupancyGrid::empty(12, 12));
        let solver: Arc<dyn PathfindingService> = Arc::new(GridSolver::new(grid.clone()));
        let mut world = chase_world(solver, grid);
        let player = world
            .query_filtered::<Entity, With<Player>>()
            .single(&world);
        world.despawn(player);

        schedule().run(&mut world);

        assert_eq!(world.resource::<ReplanStats>().replans, 0);
    }
}
