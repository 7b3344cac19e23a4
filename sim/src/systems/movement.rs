//! Movement system - walks pursuers towards their waypoints.

use crate::components::Position;
use crate::follower::PathFollower;
use bevy_ecs::prelude::*;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// Simulated seconds elapsed before the current tick.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct SimTime(pub f32);

/// Fixed updates run so far.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Moves each pursuer `speed * dt` towards its waypoint, clamped so it never
/// overshoots. Idle pursuers stay put.
pub fn movement_system(dt: Res<DeltaTime>, mut query: Query<(&mut Position, &PathFollower)>) {
    let delta = dt.0;
    for (mut pos, follower) in query.iter_mut() {
        let next = follower.advance(*pos, delta);
        if next != *pos {
            *pos = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::follower::Waypoint;
    use approx::assert_relative_eq;

    fn run_once(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(world);
    }

    #[test]
    fn test_movement_towards_waypoint() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.5));

        let mut follower = PathFollower::new(2.0, 0.9);
        follower.set_waypoint(Some(Waypoint::new(0.0, 4.0)));
        world.spawn((Position::new(0.0, 0.0), follower));

        run_once(&mut world);

        let mut query = world.query::<&Position>();
        let pos = query.single(&world);
        assert_relative_eq!(pos.x, 0.0);
        assert_relative_eq!(pos.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_idle_follower_stays() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        world.spawn((Position::new(2.0, 2.0), PathFollower::new(5.0, 0.9)));

        run_once(&mut world);

        let mut query = world.query::<&Position>();
        assert_eq!(*query.single(&world), Position::new(2.0, 2.0));
    }

    #[test]
    fn test_entities_without_follower_untouched() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        world.spawn(Position::new(7.0, 1.0));

        run_once(&mut world);

        let mut query = world.query::<&Position>();
        assert_eq!(*query.single(&world), Position::new(7.0, 1.0));
    }

    #[test]
    fn test_tick_wraps() {
        let mut tick = SimTick(u64::MAX);
        tick.increment();
        assert_eq!(tick.0, 0);
    }
}
