//! Общие куски поведения: wander, смерть, уведомления, отложенный kill

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::events::{AnimalCommand, AnimalOrder, BehaviorChanged};
use super::machine::{BehaviorState, Brain};
use crate::combat::EntityDied;
use crate::locomotion::Locomotion;
use crate::scheduler::{ScheduledAction, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum WanderMode {
    /// Стоит на месте
    None,
    /// Вокруг точки спавна
    #[default]
    WanderNear,
    /// От текущей позиции (уходит куда угодно)
    WanderFar,
}

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderConfig {
    pub mode: WanderMode,
    pub range: f32,
    /// Секунды между новыми точками
    pub interval: f32,
    pub speed: f32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            mode: WanderMode::WanderNear,
            range: 10.0,
            interval: 10.0,
            speed: 2.0,
        }
    }
}

pub fn random_point_around(center: Vec3, range: f32, rng: &mut impl Rng) -> Vec3 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = rng.gen_range(0.0..=range.max(0.0));
    center + Vec3::new(angle.sin() * distance, 0.0, angle.cos() * distance)
}

/// Wander тик: новая точка раз в interval (с разбросом ±1s), stuck → стоп
pub fn tick_wander<S: BehaviorState>(
    brain: &mut Brain<S>,
    loco: &mut Locomotion,
    config: &WanderConfig,
    position: Vec3,
    rng: &mut impl Rng,
) {
    if loco.is_stuck {
        loco.stop();
    }

    if config.mode == WanderMode::None || brain.state_timer() <= config.interval {
        return;
    }

    let center = match config.mode {
        WanderMode::WanderFar => position,
        _ => brain.home(),
    };
    let target = random_point_around(center, config.range, rng);
    loco.set_speed(config.speed);
    loco.move_to(target);
    brain.set_state_timer(rng.gen_range(-1.0..1.0));
}

/// Внешняя смерть → Dead (поглощающее)
pub fn kill_brains_on_death<S: BehaviorState>(
    mut death_events: EventReader<EntityDied>,
    mut brains: Query<&mut Brain<S>>,
) {
    for event in death_events.read() {
        if let Ok(mut brain) = brains.get_mut(event.entity) {
            brain.kill();
        }
    }
}

pub fn emit_behavior_changes<S: BehaviorState>(
    mut brains: Query<(Entity, &mut Brain<S>)>,
    mut changed_events: EventWriter<BehaviorChanged>,
) {
    for (entity, mut brain) in brains.iter_mut() {
        if !brain.has_pending_transition() {
            continue;
        }
        if let Some((from, to)) = brain.take_transition() {
            crate::log(&format!("🧠 {:?} {:?}: {} → {}", S::KIND, entity, from.name(), to.name()));
            changed_events.write(BehaviorChanged {
                entity,
                kind: S::KIND,
                from: from.name(),
                to: to.name(),
            });
        }
    }
}

/// KillIn(delay) → scheduler
pub fn schedule_kill_orders(mut commands: EventReader<AnimalCommand>, mut scheduler: ResMut<Scheduler>) {
    for command in commands.read() {
        if let AnimalOrder::KillIn(delay) = command.order {
            scheduler.schedule_in(delay, ScheduledAction::Kill(command.entity));
        }
    }
}

/// Команды для entity из общего потока (порядок отправки сохраняется)
pub fn orders_for(commands: &[AnimalCommand], entity: Entity) -> impl Iterator<Item = AnimalOrder> + '_ {
    commands
        .iter()
        .filter(move |command| command.entity == entity)
        .map(|command| command.order)
}
