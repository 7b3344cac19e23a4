//! Maze chase demonstration.
//!
//! Run with: cargo run --example chase_demo

use maze_chase_sim::{EntityKind, MazeConfig, MazeWorld};

fn main() {
    println!("=== Maze Chase - Simulation Demo ===\n");

    let config = MazeConfig {
        enemy_spawn_distance: 12.0,
        ..MazeConfig::with_size(12).seeded(2024)
    };
    let mut sim = match MazeWorld::new(config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("could not build maze world: {err}");
            return;
        }
    };

    println!("{}", sim.cell_grid());

    println!("Initial state:");
    print_snapshot(&mut sim);

    // Run for 10 seconds of simulated time at 60 frames per second.
    println!("\nRunning simulation for 600 frames...\n");
    for frame in 0..600 {
        sim.step(1.0 / 60.0);

        if (frame + 1) % 60 == 0 {
            println!("--- Tick {} (t={:.1}s) ---", sim.current_tick(), sim.current_time());
            print_snapshot(&mut sim);
        }
    }

    let stats = sim.replan_stats();
    println!(
        "\n{} replans, {} left the waypoint unchanged",
        stats.replans, stats.failed
    );

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("snapshot serialization failed: {err}"),
    }
}

fn print_snapshot(sim: &mut MazeWorld) {
    let snapshot = sim.snapshot();
    let player = snapshot.entity(EntityKind::Player);

    for entity in &snapshot.entities {
        let gap = player
            .map(|p| ((p.x - entity.x).powi(2) + (p.y - entity.y).powi(2)).sqrt())
            .unwrap_or(0.0);
        println!(
            "  {:<8} pos=({:>5.1}, {:>5.1}) [{}] dist_to_player={:.1}",
            entity.kind, entity.x, entity.y, entity.state, gap
        );
    }
}
