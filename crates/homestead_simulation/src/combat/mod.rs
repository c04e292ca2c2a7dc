//! Combat module
//!
//! - cycle: Idle → Windup → Strike таймеры (чистая логика)
//! - systems: цикл → locomotion + AttackStarted/HitRequest
//! - projectile: дальние атаки
//! - damage: Health, DamageDealt/EntityDied, смерть

use bevy::prelude::*;

pub mod cycle;
pub mod damage;
pub mod projectile;
pub mod systems;


pub use cycle::{
    AttackPhase, CombatMotion, CombatSignal, CombatState, CombatStats, CombatTarget, CombatTick, ProjectileStats,
    TargetView,
};
pub use damage::{AttackStarted, DamageDealt, Dead, Destructible, EntityDied, HitRequest};
pub use projectile::Projectile;

use crate::SimSet;

/// Порядок в FixedUpdate (SimSet::Combat):
/// 1. tick_combat_cycles: таймеры, seek/hold, удары
/// 2. move_projectiles: полёт + попадания
/// 3. apply_damage: HitRequest → Health
/// 4. handle_deaths: Dead маркер, despawn трупа по таймеру
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AttackStarted>()
            .add_event::<HitRequest>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .register_type::<CombatStats>()
            .register_type::<Destructible>();

        app.add_systems(
            FixedUpdate,
            (
                systems::tick_combat_cycles,
                projectile::move_projectiles,
                damage::apply_damage,
                damage::handle_deaths,
            )
                .chain()
                .in_set(SimSet::Combat),
        );
    }
}
