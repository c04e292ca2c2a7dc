//! Animal AI
//!
//! Один engine (`machine`): `Brain<S>` + `TransitionTable<S, C>`.
//! Species (wild, livestock, bird, pet) задают состояния, context и
//! entry/tick действия; `detection` даёт threat/food сканы.

use bevy::prelude::*;

pub mod bird;
pub mod common;
pub mod detection;
pub mod events;
pub mod livestock;
pub mod machine;
pub mod pet;
pub mod wild;

pub use bird::{BirdConfig, BirdState};
pub use common::{WanderConfig, WanderMode};
pub use detection::{DetectionCone, ScanFilter};
pub use events::{AnimalCommand, AnimalOrder, BehaviorChanged, FoodEaten, GrowRequested, ItemDug};
pub use livestock::{LivestockConfig, LivestockState};
pub use machine::{BehaviorState, Brain, Phase, TransitionTable};
pub use pet::{PetConfig, PetOwner, PetState};
pub use wild::{AnimalBehavior, WildConfig, WildState};

use crate::SimSet;

/// Порядок в FixedUpdate:
/// - SimSet::Commands: KillIn → scheduler
/// - SimSet::Behavior: смерть → Dead, таймеры нового скота, species машины,
///   затем BehaviorChanged по накопленным переходам
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AnimalCommand>()
            .add_event::<BehaviorChanged>()
            .add_event::<FoodEaten>()
            .add_event::<GrowRequested>()
            .add_event::<ItemDug>()
            .register_type::<WildConfig>()
            .register_type::<LivestockConfig>()
            .register_type::<BirdConfig>()
            .register_type::<PetConfig>()
            .register_type::<PetOwner>();

        app.add_systems(FixedUpdate, common::schedule_kill_orders.in_set(SimSet::Commands));

        app.add_systems(
            FixedUpdate,
            (
                common::kill_brains_on_death::<WildState>,
                common::kill_brains_on_death::<LivestockState>,
                common::kill_brains_on_death::<BirdState>,
                common::kill_brains_on_death::<PetState>,
                bird::ground_dead_birds,
                livestock::start_livestock_timers,
                wild::wild_behavior,
                livestock::livestock_behavior,
                bird::bird_behavior,
                pet::pet_behavior,
                common::emit_behavior_changes::<WildState>,
                common::emit_behavior_changes::<LivestockState>,
                common::emit_behavior_changes::<BirdState>,
                common::emit_behavior_changes::<PetState>,
            )
                .chain()
                .in_set(SimSet::Behavior),
        );
    }
}
