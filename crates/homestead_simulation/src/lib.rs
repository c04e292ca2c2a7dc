//! Homestead Simulation Core
//!
//! Headless ECS-симуляция фермы на Bevy 0.16: передвижение животных,
//! боевой цикл, поведение (дикие, скот, птицы, питомцы), рост по игровому времени.
//!
//! Физика, навигация и сохранения приходят снаружи через collaborator
//! traits/resources (`PhysicsWorld`, `NavMesh`, `SaveStore`).
//!
//! Один тик = один проход FixedUpdate:
//! Clock → Snapshot → Commands → Behavior → Combat → Locomotion → Growth

use std::time::Duration;

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod combat;
pub mod components;
pub mod data;
pub mod growth;
pub mod locomotion;
pub mod logger;
pub mod persistence;
pub mod registry;
pub mod scheduler;
pub mod steering;

// Re-export базовых типов для удобства
pub use ai::{AIPlugin, AnimalCommand, AnimalOrder, BehaviorChanged, Brain};
pub use combat::{CombatPlugin, CombatState, CombatStats, CombatTarget, DamageDealt, Dead, Destructible, EntityDied};
pub use components::*;
pub use data::{SpeciesPlugin, SpeciesRegistry};
pub use growth::{GameClock, GrowthPlugin, GrowthTimer, ItemProduced, TimeType};
pub use locomotion::{Locomotion, LocomotionConfig, LocomotionPlugin};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, log_with_level, set_log_level, set_logger,
    set_logger_if_needed, LogLevel, LogPrinter,
};
pub use persistence::{SaveError, SaveStore};
pub use registry::WorldSnapshot;
pub use scheduler::Scheduler;
pub use steering::{FlatWorld, NavMesh, PathRequests, PhysicsWorld};

/// Фазы тика (FixedUpdate), строго по порядку
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    /// Игровые часы + отложенные действия
    Clock,
    /// Пересборка WorldSnapshot
    Snapshot,
    /// Внешние команды животным
    Commands,
    /// State machines
    Behavior,
    Combat,
    Locomotion,
    /// Растения, печи, рост скота
    Growth,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<DeterministicRng>() {
            // Детерминистичный RNG (seed по умолчанию)
            app.insert_resource(DeterministicRng::new(42));
        }

        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .init_resource::<PhysicsWorld>()
            .init_resource::<NavMesh>()
            .init_resource::<PathRequests>()
            .init_resource::<WorldSnapshot>()
            .init_resource::<GameClock>()
            .init_resource::<SaveStore>()
            .init_resource::<Scheduler>()
            .configure_sets(
                FixedUpdate,
                (
                    SimSet::Clock,
                    SimSet::Snapshot,
                    SimSet::Commands,
                    SimSet::Behavior,
                    SimSet::Combat,
                    SimSet::Locomotion,
                    SimSet::Growth,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                scheduler::run_scheduled_actions
                    .after(growth::advance_game_clock)
                    .in_set(SimSet::Clock),
            )
            .add_systems(FixedUpdate, registry::rebuild_world_snapshot.in_set(SimSet::Snapshot))
            // Подсистемы
            .add_plugins((GrowthPlugin, AIPlugin, CombatPlugin, LocomotionPlugin, SpeciesPlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}

/// Один детерминированный тик: Time<Fixed> += dt, прогон FixedUpdate
pub fn advance_fixed(app: &mut App, dt: f32) {
    let world = app.world_mut();
    world.resource_mut::<Time<Fixed>>().advance_by(Duration::from_secs_f32(dt));
    world.run_schedule(FixedUpdate);
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Debug формат: простейшая стабильная сериализация
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
