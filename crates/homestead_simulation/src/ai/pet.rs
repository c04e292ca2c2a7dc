//! Питомцы: Idle (нет хозяина) / Follow (хозяин) → Attack | Dig, Pet (гладят)
//!
//! Пока питомец следует за хозяином, slow scan ищет враждебных диких
//! животных и места для копания в `detect` конусе.

use bevy::prelude::*;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::common::{orders_for, tick_wander, WanderConfig};
use super::detection::{find_nearest, DetectionCone};
use super::events::{AnimalCommand, AnimalOrder};
use super::machine::{advance, BehaviorState, Brain, Phase, TransitionTable};
use crate::combat::{CombatState, CombatStats, Dead};
use crate::components::{Actor, BehaviorKind};
use crate::locomotion::Locomotion;
use crate::registry::WorldSnapshot;
use crate::scheduler::{ScheduledAction, Scheduler};
use crate::steering::math::flat_distance;
use crate::DeterministicRng;

/// Сколько накопленного stuck_time терпит Dig
const DIG_STUCK_LIMIT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PetState {
    Idle,
    Follow,
    Attack,
    Dig,
    Pet,
    MoveTo,
    Dead,
}

impl BehaviorState for PetState {
    const DEAD: Self = PetState::Dead;
    const KIND: BehaviorKind = BehaviorKind::Pet;

    fn name(&self) -> &'static str {
        match self {
            PetState::Idle => "Idle",
            PetState::Follow => "Follow",
            PetState::Attack => "Attack",
            PetState::Dig => "Dig",
            PetState::Pet => "Pet",
            PetState::MoveTo => "MoveTo",
            PetState::Dead => "Dead",
        }
    }
}

/// Хозяин питомца (None: дикий/отпущенный)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct PetOwner {
    pub master: Option<Entity>,
}

#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct PetConfig {
    pub wander: WanderConfig,
    /// Дальше этого от хозяина: догоняем
    pub follow_range: f32,
    pub follow_speed: f32,
    pub detect: DetectionCone,
    pub attack_duration: f32,
    pub dig_range: f32,
    pub dig_duration: f32,
    /// Общий лимит на Dig (дойти + копать)
    pub dig_timeout: f32,
    pub pet_duration: f32,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            wander: WanderConfig::default(),
            follow_range: 3.0,
            follow_speed: 5.0,
            detect: DetectionCone {
                range: 8.0,
                angle: 360.0,
                range_360: 1.0,
            },
            attack_duration: 10.0,
            dig_range: 1.0,
            dig_duration: 3.0,
            dig_timeout: 15.0,
            pet_duration: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PetContext {
    pub state_timer: f32,
    pub stuck_time: f32,
    pub force_action: bool,
    pub has_master: bool,
    pub can_attack: bool,
    pub enemy_found: bool,
    pub dig_found: bool,
    pub target_alive: bool,
    pub combat_engaged: bool,
    pub reached: bool,
    pub attack_duration: f32,
    pub dig_timeout: f32,
    pub pet_duration: f32,
}

static PET_TABLE: Lazy<TransitionTable<PetState, PetContext>> = Lazy::new(|| {
    use PetState::*;
    TransitionTable::<PetState, PetContext>::new()
        .on(Idle, Phase::Fast, |c| c.has_master, Follow)
        .on(Follow, Phase::Fast, |c| !c.has_master, Idle)
        .on(Follow, Phase::Slow, |c| c.enemy_found && c.can_attack, Attack)
        .on(Follow, Phase::Slow, |c| c.dig_found, Dig)
        .on(Attack, Phase::Fast, |c| !c.target_alive || !c.combat_engaged, Follow)
        .on(Attack, Phase::Fast, |c| !c.force_action && c.state_timer > c.attack_duration, Follow)
        .on(Dig, Phase::Fast, |c| !c.target_alive, Follow)
        .on(
            Dig,
            Phase::Fast,
            |c| c.state_timer > c.dig_timeout || c.stuck_time > DIG_STUCK_LIMIT,
            Follow,
        )
        .on(Pet, Phase::Fast, |c| c.state_timer > c.pet_duration, Follow)
        .on(MoveTo, Phase::Fast, |c| c.reached, Follow)
});

pub fn pet_transitions() -> &'static TransitionTable<PetState, PetContext> {
    &PET_TABLE
}

/// Враги хозяина: живые агрессивные дикие, не из своей группы
pub fn nearest_enemy(
    snapshot: &WorldSnapshot,
    pet: Entity,
    groups: &[String],
    origin: Vec3,
    facing: Vec3,
    cone: &DetectionCone,
) -> Option<(Entity, f32)> {
    let candidates = snapshot
        .actors
        .iter()
        .filter(|actor| actor.entity != pet && actor.alive && actor.hostile && !actor.shares_group(groups))
        .map(|actor| (actor.entity, actor.position));
    find_nearest(origin, facing, cone, candidates)
}

pub fn nearest_dig_spot(snapshot: &WorldSnapshot, origin: Vec3, facing: Vec3, cone: &DetectionCone) -> Option<Entity> {
    let candidates = snapshot.dig_spots.iter().map(|spot| (spot.entity, spot.position));
    find_nearest(origin, facing, cone, candidates).map(|(spot, _)| spot)
}

struct PetBody<'a> {
    entity: Entity,
    position: Vec3,
    config: &'a PetConfig,
    owner: &'a mut PetOwner,
    loco: &'a mut Locomotion,
    combat: Option<&'a mut CombatState>,
    can_attack: bool,
}

impl PetBody<'_> {
    fn master_position(&self, snapshot: &WorldSnapshot) -> Option<Vec3> {
        self.owner
            .master
            .filter(|&master| snapshot.is_alive(master))
            .and_then(|master| snapshot.position_of(master))
    }

    fn stop_attack(&mut self) {
        if let Some(combat) = self.combat.as_deref_mut() {
            combat.stop_attack();
        }
    }
}

fn enter_state(state: PetState, brain: &mut Brain<PetState>, body: &mut PetBody, snapshot: &WorldSnapshot) {
    let target_position = brain.target().and_then(|t| snapshot.position_of(t));
    match state {
        PetState::Idle => {
            brain.set_target(None);
            brain.clear_force();
            body.stop_attack();
            body.loco.stop();
            body.loco.target_entity = None;
            body.loco.set_speed(body.config.wander.speed);
        }
        PetState::Follow => {
            brain.set_target(None);
            brain.clear_force();
            body.stop_attack();
            body.loco.stop();
            body.loco.target_entity = body.owner.master;
            body.loco.set_speed(body.config.follow_speed);
        }
        PetState::Attack => {
            body.loco.set_speed(body.config.follow_speed);
            body.loco.target_entity = brain.target();
            let combat_target = brain.target().and_then(|t| snapshot.actor(t)).map(|a| a.combat_target());
            if let (Some(combat), Some(combat_target)) = (body.combat.as_deref_mut(), combat_target) {
                combat.attack(combat_target);
            }
        }
        PetState::Dig => {
            body.loco.target_entity = brain.target();
            if let Some(spot) = target_position {
                body.loco.move_to_within(spot, Some(body.config.dig_range));
            }
        }
        PetState::Pet => {
            body.stop_attack();
            body.loco.stop();
            if let Some(petter) = target_position {
                body.loco.face_toward(body.position, petter);
            }
        }
        PetState::MoveTo | PetState::Dead => {}
    }
}

fn apply_order(order: AnimalOrder, brain: &mut Brain<PetState>, body: &mut PetBody, snapshot: &WorldSnapshot) {
    match order {
        AnimalOrder::Tame(master) => {
            body.owner.master = Some(master);
            crate::log_info(&format!("🐕 {:?} tamed by {:?}", body.entity, master));
            if brain.command(PetState::Follow, false) {
                enter_state(PetState::Follow, brain, body, snapshot);
            }
        }
        AnimalOrder::Untame => {
            body.owner.master = None;
            crate::log_info(&format!("🐕 {:?} untamed", body.entity));
            if brain.command(PetState::Idle, false) {
                enter_state(PetState::Idle, brain, body, snapshot);
            }
        }
        AnimalOrder::PetBy(petter) => {
            if brain.command(PetState::Pet, false) {
                brain.set_target(Some(petter));
                enter_state(PetState::Pet, brain, body, snapshot);
            }
        }
        AnimalOrder::Attack(target) if body.can_attack => {
            if brain.command(PetState::Attack, true) {
                brain.set_target(Some(target));
                enter_state(PetState::Attack, brain, body, snapshot);
            }
        }
        AnimalOrder::MoveTo(point) => {
            if brain.command(PetState::MoveTo, true) {
                body.stop_attack();
                body.loco.move_to(point);
            }
        }
        AnimalOrder::Stop => {
            let rest = if body.owner.master.is_some() { PetState::Follow } else { PetState::Idle };
            if brain.command(rest, false) {
                enter_state(rest, brain, body, snapshot);
            }
        }
        _ => {}
    }
}

fn tick_state(
    brain: &mut Brain<PetState>,
    body: &mut PetBody,
    snapshot: &WorldSnapshot,
    scheduler: &mut Scheduler,
    rng: &mut impl Rng,
) {
    match brain.state() {
        PetState::Idle => tick_wander(brain, body.loco, &body.config.wander, body.position, rng),
        PetState::Follow => {
            // Догоняем только когда хозяин ушёл дальше follow_range
            if let Some(master) = body.master_position(snapshot) {
                let distance = flat_distance(body.position, master);
                if distance > body.config.follow_range {
                    body.loco.retarget(master, Some(body.config.follow_range * 0.5));
                } else if body.loco.has_reached_target() {
                    body.loco.face_toward(body.position, master);
                }
            }
        }
        PetState::Dig => {
            let Some(spot) = brain.target() else {
                return;
            };
            let Some(spot_position) = snapshot.position_of(spot) else {
                return;
            };
            let action = ScheduledAction::FinishDig {
                digger: body.entity,
                spot,
            };
            if flat_distance(body.position, spot_position) <= body.config.dig_range && !scheduler.is_scheduled(&action) {
                body.loco.stop();
                body.loco.face_toward(body.position, spot_position);
                scheduler.schedule_in(body.config.dig_duration, action);
                crate::log(&format!("🐕 {:?} digging {:?}", body.entity, spot));
            }
        }
        PetState::Attack | PetState::Pet | PetState::MoveTo | PetState::Dead => {}
    }
}

pub fn pet_behavior(
    mut pets: Query<
        (
            Entity,
            &Transform,
            &PetConfig,
            &Actor,
            &mut PetOwner,
            &mut Brain<PetState>,
            &mut Locomotion,
            Option<&mut CombatState>,
            Option<&CombatStats>,
        ),
        Without<Dead>,
    >,
    snapshot: Res<WorldSnapshot>,
    mut scheduler: ResMut<Scheduler>,
    mut command_events: EventReader<AnimalCommand>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.delta_secs();
    let orders: Vec<AnimalCommand> = command_events.read().copied().collect();
    let rng = &mut rng.rng;

    for (entity, transform, config, actor, mut owner, mut brain, mut loco, mut combat, stats) in pets.iter_mut() {
        if brain.is_dead() {
            continue;
        }
        let can_attack = combat.is_some() && stats.is_some_and(|s| s.attack_enabled);
        let mut body = PetBody {
            entity,
            position: transform.translation,
            config,
            owner: &mut owner,
            loco: &mut loco,
            combat: combat.as_deref_mut(),
            can_attack,
        };

        for order in orders_for(&orders, entity) {
            apply_order(order, &mut brain, &mut body, &snapshot);
        }

        brain.tick(dt, body.loco.is_stuck);
        let slow = brain.poll_slow_update(dt, rng);
        tick_state(&mut brain, &mut body, &snapshot, &mut scheduler, rng);

        let (enemy, dig_spot) = if slow && brain.is(PetState::Follow) {
            let enemy = nearest_enemy(
                &snapshot,
                entity,
                &actor.groups,
                body.position,
                body.loco.facing,
                &config.detect,
            );
            let spot = nearest_dig_spot(&snapshot, body.position, body.loco.facing, &config.detect);
            (enemy.map(|(e, _)| e), spot)
        } else {
            (None, None)
        };

        let target_alive = brain.target().is_some_and(|t| match brain.state() {
            PetState::Dig => snapshot.dig_spot(t).is_some(),
            _ => snapshot.is_alive(t),
        });
        let context = PetContext {
            state_timer: brain.state_timer(),
            stuck_time: brain.stuck_time(),
            force_action: brain.force_action(),
            has_master: body.master_position(&snapshot).is_some(),
            can_attack,
            enemy_found: enemy.is_some(),
            dig_found: dig_spot.is_some(),
            target_alive,
            combat_engaged: body.combat.as_deref().is_some_and(|c| !c.target.is_none()),
            reached: body.loco.has_reached_target(),
            attack_duration: config.attack_duration,
            dig_timeout: config.dig_timeout,
            pet_duration: config.pet_duration,
        };

        if let Some(next) = advance(&mut *brain, pet_transitions(), &context, slow) {
            match next {
                PetState::Attack => brain.set_target(enemy),
                PetState::Dig => brain.set_target(dig_spot),
                _ => {}
            }
            enter_state(next, &mut brain, &mut body, &snapshot);
        }
    }
}
