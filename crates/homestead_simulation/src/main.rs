//! Headless симуляция фермы
//!
//! Грузит species из assets/species, расставляет демо-ферму и гоняет
//! фиксированные тики. Печатает сводку по поведению и событиям.

use std::collections::BTreeMap;
use std::path::Path;

use bevy::prelude::*;
use homestead_simulation::ai::{AnimalCommand, AnimalOrder, BehaviorChanged, FoodEaten};
use homestead_simulation::components::{DigSpot, Food, Player};
use homestead_simulation::data::{load_species_dir, spawn_species};
use homestead_simulation::steering::{BoxObstacle, FlatWorld, LayerMask};
use homestead_simulation::{
    advance_fixed, create_headless_app, log_error, log_info, EntityDied, GameClock, ItemProduced, PhysicsWorld,
    SimulationPlugin,
};

const TICKS: usize = 3600;
const DT: f32 = 1.0 / 60.0;

fn main() {
    let seed = 42;
    println!("Starting homestead headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin);

    let species_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/species");
    match load_species_dir(&species_dir) {
        Ok(registry) => {
            app.insert_resource(registry);
        }
        Err(e) => {
            log_error(&format!("Species load failed: {}", e));
            return;
        }
    }

    // Игровые часы быстрее: 1 игровой час в секунду
    app.insert_resource(GameClock {
        game_hours_per_second: 1.0,
        ..Default::default()
    });
    app.insert_resource(PhysicsWorld::new(
        FlatWorld::default()
            .with_obstacle(BoxObstacle::new(Vec3::new(4.0, 1.0, 0.0), Vec3::new(0.5, 1.0, 3.0)).with_layer(LayerMask::OBSTACLE))
            .with_obstacle(BoxObstacle::new(Vec3::new(-6.0, 1.0, 5.0), Vec3::new(2.0, 1.0, 0.5)).with_layer(LayerMask::OBSTACLE)),
    ));

    let world = app.world_mut();
    let player = world.spawn((Player, Transform::from_xyz(0.0, 0.0, 0.0))).id();
    world.spawn((Food::new("grass", 5), Transform::from_xyz(3.0, 0.0, -6.0)));
    world.spawn((Food::new("grain", 3), Transform::from_xyz(-2.0, 0.0, -3.0)));
    world.spawn((DigSpot::new("old_bone"), Transform::from_xyz(2.0, 0.0, 3.0)));

    let mut spawned = Vec::new();
    for (id, position) in [
        ("cow", Vec3::new(5.0, 0.0, -5.0)),
        ("calf", Vec3::new(6.0, 0.0, -3.0)),
        ("chicken", Vec3::new(-1.0, 0.0, -2.0)),
        ("chicken", Vec3::new(-3.0, 0.0, -1.0)),
        ("crow", Vec3::new(-8.0, 0.0, -8.0)),
        ("dog", Vec3::new(1.0, 0.0, 1.0)),
        ("wolf", Vec3::new(20.0, 0.0, 20.0)),
    ] {
        match spawn_species(world, id, position) {
            Ok(entity) => spawned.push((id, entity)),
            Err(e) => log_error(&format!("Spawn '{}' failed: {}", id, e)),
        }
    }

    if let Some((_, dog)) = spawned.iter().find(|(id, _)| *id == "dog") {
        world.send_event(AnimalCommand::new(*dog, AnimalOrder::Tame(player)));
    }
    log_info(&format!("Spawned {} animals", spawned.len()));

    let mut transitions: BTreeMap<String, usize> = BTreeMap::new();
    let mut changed_cursor = app.world().resource::<Events<BehaviorChanged>>().get_cursor();
    let mut eaten_cursor = app.world().resource::<Events<FoodEaten>>().get_cursor();
    let mut produced_cursor = app.world().resource::<Events<ItemProduced>>().get_cursor();
    let mut died_cursor = app.world().resource::<Events<EntityDied>>().get_cursor();
    let (mut eaten, mut produced, mut died) = (0, 0, 0);

    for tick in 0..TICKS {
        advance_fixed(&mut app, DT);

        let world = app.world();
        for change in changed_cursor.read(world.resource::<Events<BehaviorChanged>>()) {
            *transitions.entry(format!("{:?} {} → {}", change.kind, change.from, change.to)).or_default() += 1;
        }
        eaten += eaten_cursor.read(world.resource::<Events<FoodEaten>>()).count();
        produced += produced_cursor.read(world.resource::<Events<ItemProduced>>()).count();
        died += died_cursor.read(world.resource::<Events<EntityDied>>()).count();

        if tick % 600 == 0 {
            let clock = world.resource::<GameClock>();
            println!(
                "Tick {}: {} entities, day {} {:.1}h",
                tick,
                world.entities().len(),
                clock.day,
                clock.day_time
            );
        }
    }

    println!("Transitions:");
    for (transition, count) in &transitions {
        println!("  {:<36} {}", transition, count);
    }
    println!("Food eaten: {}, items produced: {}, deaths: {}", eaten, produced, died);
    println!("Simulation complete!");
}
