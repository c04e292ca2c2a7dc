//! Transition log через MemoryLogger
//!
//! Logger глобальный на процесс, поэтому тест живет в отдельном binary.

use bevy::prelude::*;
use homestead_simulation::ai::WildState;
use homestead_simulation::components::Player;
use homestead_simulation::data::{spawn_species, SpeciesDefinition};
use homestead_simulation::logger::MemoryLogger;
use homestead_simulation::*;

const DT: f32 = 1.0 / 60.0;

const DEER: &str = r#"(
    id: "deer",
    name: "Deer",
    groups: ["deer"],
    wild: Some((
        behavior: Escape,
        wander: (mode: None),
        detect: (range: 6.0, angle: 360.0, range_360: 1.0),
        run_speed: 6.0,
    )),
)"#;

#[test]
fn test_state_transitions_are_logged() {
    let memory = MemoryLogger::new();
    set_logger(Box::new(memory.clone()));
    set_log_level(LogLevel::Debug);

    let mut app = create_headless_app(11);
    app.add_plugins(SimulationPlugin);
    let mut registry = SpeciesRegistry::default();
    registry
        .insert(SpeciesDefinition::from_ron(DEER, "deer.ron").expect("valid deer"))
        .expect("insert deer");
    app.insert_resource(registry);

    app.world_mut().spawn((Player, Transform::from_xyz(0.0, 0.0, 3.0)));
    let deer = spawn_species(app.world_mut(), "deer", Vec3::ZERO).expect("deer spawned");

    for _ in 0..120 {
        advance_fixed(&mut app, DT);
        if app.world().get::<Brain<WildState>>(deer).is_some_and(|b| b.state() == WildState::Escape) {
            break;
        }
    }
    // Переход логируется в следующем emit, даем ему тик
    advance_fixed(&mut app, DT);

    let lines = memory.lines();
    let prefix = format!("Wild {:?}: ", deer);
    let transitions: Vec<&String> = lines.iter().filter(|line| line.contains(&prefix)).collect();
    assert!(!transitions.is_empty(), "no transition lines in {:?}", lines);
    assert!(transitions.iter().all(|line| line.starts_with("[DEBUG] [")));
    assert!(transitions[0].contains("Wander → "), "first transition {:?}", transitions[0]);
    assert!(
        transitions.iter().any(|line| line.ends_with("→ Escape")),
        "deer escape not logged: {:?}",
        transitions
    );

    // Ниже порога строки отбрасываются
    set_log_level(LogLevel::Warning);
    let before = memory.lines().len();
    homestead_simulation::log("dropped");
    log_warning("kept");
    let after = memory.lines();
    assert_eq!(after.len(), before + 1);
    assert!(after[before].starts_with("[WARNING]") && after[before].ends_with("kept"));
}
