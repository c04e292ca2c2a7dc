//! Дикие животные: Wander → Alerted → Escape | Attack
//!
//! Реакция зависит от `AnimalBehavior`:
//! - Escape: убегает при виде угрозы
//! - PassiveEscape: убегает только когда ударили
//! - PassiveDefense: атакует только когда ударили
//! - Aggressive / VeryAggressive: атакует при виде (VeryAggressive не бросает видимую цель)

use bevy::prelude::*;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::common::{orders_for, tick_wander, WanderConfig};
use super::detection::{nearest_actor, DetectionCone, ScanFilter};
use super::events::{AnimalCommand, AnimalOrder};
use super::machine::{advance, BehaviorState, Brain, Phase, TransitionTable};
use crate::combat::{CombatState, CombatStats, DamageDealt, Dead};
use crate::components::{Actor, BehaviorKind};
use crate::locomotion::Locomotion;
use crate::registry::WorldSnapshot;
use crate::DeterministicRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildState {
    Wander,
    Alerted,
    Escape,
    Attack,
    MoveTo,
    Dead,
}

impl BehaviorState for WildState {
    const DEAD: Self = WildState::Dead;
    const KIND: BehaviorKind = BehaviorKind::Wild;

    fn name(&self) -> &'static str {
        match self {
            WildState::Wander => "Wander",
            WildState::Alerted => "Alerted",
            WildState::Escape => "Escape",
            WildState::Attack => "Attack",
            WildState::MoveTo => "MoveTo",
            WildState::Dead => "Dead",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum AnimalBehavior {
    None,
    #[default]
    Escape,
    PassiveEscape,
    PassiveDefense,
    Aggressive,
    VeryAggressive,
}

impl AnimalBehavior {
    pub fn reacts_on_sight(self) -> bool {
        self.escapes_on_sight() || self.attacks_on_sight()
    }

    pub fn escapes_on_sight(self) -> bool {
        self == AnimalBehavior::Escape
    }

    pub fn attacks_on_sight(self) -> bool {
        matches!(self, AnimalBehavior::Aggressive | AnimalBehavior::VeryAggressive)
    }

    /// Кого ищет скан: хищник с атакой охотится на любого чужого,
    /// остальные реагируют только на тех, кто может ударить
    pub fn sight_filter(self, can_attack: bool) -> ScanFilter {
        if self.attacks_on_sight() && can_attack {
            ScanFilter::Prey
        } else {
            ScanFilter::Threat
        }
    }

    pub fn escapes_when_hit(self) -> bool {
        matches!(self, AnimalBehavior::Escape | AnimalBehavior::PassiveEscape)
    }

    pub fn defends_when_hit(self) -> bool {
        matches!(
            self,
            AnimalBehavior::PassiveDefense | AnimalBehavior::Aggressive | AnimalBehavior::VeryAggressive
        )
    }
}

#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct WildConfig {
    pub behavior: AnimalBehavior,
    pub wander: WanderConfig,
    pub run_speed: f32,
    pub detect: DetectionCone,
    pub reaction_time: f32,
    /// Через сколько Attack/Escape сдаются (без force_action)
    pub action_duration: f32,
    pub escape_distance: f32,
}

impl Default for WildConfig {
    fn default() -> Self {
        Self {
            behavior: AnimalBehavior::Escape,
            wander: WanderConfig::default(),
            run_speed: 5.0,
            detect: DetectionCone::default(),
            reaction_time: 0.5,
            action_duration: 10.0,
            escape_distance: 8.0,
        }
    }
}

/// Всё, что видят guard'ы в этом тике
#[derive(Debug, Clone, PartialEq)]
pub struct WildContext {
    pub behavior: AnimalBehavior,
    pub state_timer: f32,
    pub force_action: bool,
    pub reaction_time: f32,
    pub action_duration: f32,
    pub detect_range: f32,
    pub can_attack: bool,
    /// Slow scan нашёл угрозу
    pub sighted: bool,
    pub target_alive: bool,
    pub target_distance: f32,
    pub combat_engaged: bool,
    pub reached: bool,
}

impl WildContext {
    fn reacted(&self) -> bool {
        self.state_timer > self.reaction_time
    }

    fn target_visible(&self) -> bool {
        self.target_alive && self.target_distance < self.detect_range
    }

    fn flees(&self) -> bool {
        self.behavior.escapes_on_sight() || (self.behavior.attacks_on_sight() && !self.can_attack)
    }

    fn action_expired(&self) -> bool {
        !self.force_action && self.state_timer > self.action_duration
    }
}

static WILD_TABLE: Lazy<TransitionTable<WildState, WildContext>> = Lazy::new(|| {
    use WildState::*;
    TransitionTable::<WildState, WildContext>::new()
        .on(Wander, Phase::Slow, |c| c.sighted && c.behavior.reacts_on_sight(), Alerted)
        .on(Alerted, Phase::Fast, |c| !c.target_visible(), Wander)
        .on(Alerted, Phase::Fast, |c| c.reacted() && c.flees(), Escape)
        .on(Alerted, Phase::Fast, |c| c.reacted() && c.behavior.attacks_on_sight() && c.can_attack, Attack)
        .on(Escape, Phase::Fast, |c| !c.target_alive, Wander)
        .on(Escape, Phase::Fast, |c| c.action_expired() && c.target_distance > c.detect_range, Wander)
        .on(Attack, Phase::Fast, |c| !c.target_alive || !c.combat_engaged, Wander)
        .on(
            Attack,
            Phase::Fast,
            |c| c.action_expired() && !(c.behavior == AnimalBehavior::VeryAggressive && c.target_visible()),
            Wander,
        )
        .on(MoveTo, Phase::Fast, |c| c.reached, Wander)
});

pub fn wild_transitions() -> &'static TransitionTable<WildState, WildContext> {
    &WILD_TABLE
}

/// Мутируемые части одного животного на время тика
struct WildBody<'a> {
    entity: Entity,
    position: Vec3,
    config: &'a WildConfig,
    groups: &'a [String],
    loco: &'a mut Locomotion,
    combat: Option<&'a mut CombatState>,
    can_attack: bool,
}

fn enter_state(state: WildState, brain: &mut Brain<WildState>, body: &mut WildBody, snapshot: &WorldSnapshot) {
    let target = brain.target();
    let target_position = target.and_then(|t| snapshot.position_of(t));

    match state {
        WildState::Wander => {
            brain.set_target(None);
            brain.clear_force();
            body.loco.stop();
            body.loco.target_entity = None;
            body.loco.set_speed(body.config.wander.speed);
            if let Some(combat) = body.combat.as_deref_mut() {
                combat.stop_attack();
            }
        }
        WildState::Alerted => {
            body.loco.stop();
            if let Some(threat) = target_position {
                body.loco.face_toward(body.position, threat);
            }
        }
        WildState::Escape => {
            body.loco.set_speed(body.config.run_speed);
            body.loco.target_entity = target;
            if let Some(threat) = target_position {
                body.loco.escape_from(body.position, threat, body.config.escape_distance);
            }
        }
        WildState::Attack => {
            body.loco.set_speed(body.config.run_speed);
            body.loco.target_entity = target;
            let combat_target = target.and_then(|t| snapshot.actor(t)).map(|a| a.combat_target());
            if let (Some(combat), Some(combat_target)) = (body.combat.as_deref_mut(), combat_target) {
                combat.attack(combat_target);
            }
        }
        WildState::MoveTo => {
            body.loco.set_speed(body.config.run_speed);
        }
        WildState::Dead => {}
    }
}

fn apply_order(order: AnimalOrder, brain: &mut Brain<WildState>, body: &mut WildBody, snapshot: &WorldSnapshot) {
    match order {
        AnimalOrder::Attack(target) if body.can_attack => {
            if brain.command(WildState::Attack, true) {
                brain.set_target(Some(target));
                enter_state(WildState::Attack, brain, body, snapshot);
            }
        }
        AnimalOrder::Escape(threat) => {
            if brain.command(WildState::Escape, true) {
                brain.set_target(Some(threat));
                enter_state(WildState::Escape, brain, body, snapshot);
            }
        }
        AnimalOrder::MoveTo(point) => {
            if brain.command(WildState::MoveTo, true) {
                if let Some(combat) = body.combat.as_deref_mut() {
                    combat.stop_attack();
                }
                enter_state(WildState::MoveTo, brain, body, snapshot);
                body.loco.move_to(point);
            }
        }
        AnimalOrder::Stop => {
            if brain.command(WildState::Wander, false) {
                enter_state(WildState::Wander, brain, body, snapshot);
            }
        }
        _ => {}
    }
}

/// Ударили: PassiveDefense/Aggressive отвечают, Escape/PassiveEscape убегают
fn react_to_damage(attacker: Entity, brain: &mut Brain<WildState>, body: &mut WildBody, snapshot: &WorldSnapshot) {
    if !matches!(brain.state(), WildState::Wander | WildState::Alerted) || !snapshot.is_alive(attacker) {
        return;
    }

    let behavior = body.config.behavior;
    let next = if behavior.defends_when_hit() && body.can_attack {
        WildState::Attack
    } else if behavior.escapes_when_hit() || behavior.defends_when_hit() {
        WildState::Escape
    } else {
        return;
    };

    if brain.change_state(next) {
        brain.set_target(Some(attacker));
        enter_state(next, brain, body, snapshot);
    }
}

fn tick_state(
    brain: &mut Brain<WildState>,
    body: &mut WildBody,
    snapshot: &WorldSnapshot,
    slow: bool,
    rng: &mut impl Rng,
) {
    let target_position = brain.target().and_then(|t| snapshot.position_of(t));

    match brain.state() {
        WildState::Wander => tick_wander(brain, body.loco, &body.config.wander, body.position, rng),
        WildState::Alerted => {
            if let Some(threat) = target_position {
                body.loco.face_toward(body.position, threat);
            }
        }
        WildState::Escape => {
            // Добежали, а угроза всё ещё рядом: бежим дальше
            if slow && !body.loco.is_moving {
                if let Some(threat) = target_position {
                    body.loco.escape_from(body.position, threat, body.config.escape_distance);
                }
            }
        }
        WildState::Attack => {
            let attacking = body.combat.as_deref().is_some_and(|c| c.is_attacking());
            if slow && body.loco.is_stuck && !attacking && brain.state_timer() > 1.0 {
                // Застряли по дороге: ближайшая другая угроза
                let found = nearest_actor(
                    snapshot,
                    body.config.behavior.sight_filter(body.can_attack),
                    body.entity,
                    body.groups,
                    body.position,
                    body.loco.facing,
                    &body.config.detect,
                );
                if let Some((threat, _)) = found {
                    if Some(threat) != brain.target() {
                        brain.set_target(Some(threat));
                        enter_state(WildState::Attack, brain, body, snapshot);
                    }
                }
            }
        }
        WildState::MoveTo | WildState::Dead => {}
    }
}

fn build_context(brain: &Brain<WildState>, body: &WildBody, snapshot: &WorldSnapshot, sighted: bool) -> WildContext {
    let target = brain.target().and_then(|t| snapshot.actor(t));
    WildContext {
        behavior: body.config.behavior,
        state_timer: brain.state_timer(),
        force_action: brain.force_action(),
        reaction_time: body.config.reaction_time,
        action_duration: body.config.action_duration,
        detect_range: body.config.detect.range,
        can_attack: body.can_attack,
        sighted,
        target_alive: target.is_some_and(|t| t.alive),
        target_distance: target.map_or(f32::INFINITY, |t| t.position.distance(body.position)),
        combat_engaged: body.combat.as_deref().is_some_and(|c| !c.target.is_none()),
        reached: body.loco.has_reached_target(),
    }
}

pub fn wild_behavior(
    mut animals: Query<
        (
            Entity,
            &Transform,
            &WildConfig,
            &Actor,
            &mut Brain<WildState>,
            &mut Locomotion,
            Option<&mut CombatState>,
            Option<&CombatStats>,
        ),
        Without<Dead>,
    >,
    snapshot: Res<WorldSnapshot>,
    mut command_events: EventReader<AnimalCommand>,
    mut damage_events: EventReader<DamageDealt>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.delta_secs();
    let orders: Vec<AnimalCommand> = command_events.read().copied().collect();
    let hits: Vec<(Entity, Entity)> = damage_events
        .read()
        .filter(|hit| !hit.target_died)
        .map(|hit| (hit.target, hit.attacker))
        .collect();
    let rng = &mut rng.rng;

    for (entity, transform, config, actor, mut brain, mut loco, mut combat, stats) in animals.iter_mut() {
        if brain.is_dead() {
            continue;
        }

        let can_attack = combat.is_some() && stats.is_some_and(|s| s.attack_enabled);
        let mut body = WildBody {
            entity,
            position: transform.translation,
            config,
            groups: &actor.groups,
            loco: &mut loco,
            combat: combat.as_deref_mut(),
            can_attack,
        };

        for order in orders_for(&orders, entity) {
            apply_order(order, &mut brain, &mut body, &snapshot);
        }
        for &(_, attacker) in hits.iter().filter(|(target, _)| *target == entity) {
            react_to_damage(attacker, &mut brain, &mut body, &snapshot);
        }

        brain.tick(dt, body.loco.is_stuck);
        let slow = brain.poll_slow_update(dt, rng);
        tick_state(&mut brain, &mut body, &snapshot, slow, rng);

        let sighted = if slow && brain.is(WildState::Wander) {
            nearest_actor(
                &snapshot,
                config.behavior.sight_filter(can_attack),
                entity,
                &actor.groups,
                body.position,
                body.loco.facing,
                &config.detect,
            )
        } else {
            None
        };

        let context = build_context(&brain, &body, &snapshot, sighted.is_some());
        if let Some(next) = advance(&mut *brain, wild_transitions(), &context, slow) {
            if next == WildState::Alerted {
                brain.set_target(sighted.map(|(threat, _)| threat));
            }
            enter_state(next, &mut brain, &mut body, &snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(behavior: AnimalBehavior) -> WildContext {
        WildContext {
            behavior,
            state_timer: 0.0,
            force_action: false,
            reaction_time: 0.5,
            action_duration: 10.0,
            detect_range: 5.0,
            can_attack: true,
            sighted: false,
            target_alive: true,
            target_distance: 4.0,
            combat_engaged: true,
            reached: false,
        }
    }

    fn step(brain: &mut Brain<WildState>, ctx: &WildContext, slow: bool) -> Option<WildState> {
        advance(brain, wild_transitions(), ctx, slow)
    }

    #[test]
    fn test_aggressive_alert_then_attack() {
        let mut brain = Brain::new(WildState::Wander, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::Aggressive);
        ctx.sighted = true;
        assert_eq!(step(&mut brain, &ctx, false), None);
        assert_eq!(step(&mut brain, &ctx, true), Some(WildState::Alerted));

        brain.tick(0.5, false);
        ctx.state_timer = brain.state_timer();
        assert_eq!(step(&mut brain, &ctx, false), None, "reaction_time is strict");

        brain.tick(1.0 / 60.0, false);
        ctx.state_timer = brain.state_timer();
        assert_eq!(step(&mut brain, &ctx, false), Some(WildState::Attack));
    }

    #[test]
    fn test_passive_behaviors_ignore_sightings() {
        for behavior in [AnimalBehavior::None, AnimalBehavior::PassiveEscape, AnimalBehavior::PassiveDefense] {
            let mut brain = Brain::new(WildState::Wander, Vec3::ZERO);
            let mut ctx = context(behavior);
            ctx.sighted = true;
            assert_eq!(step(&mut brain, &ctx, true), None, "{:?}", behavior);
        }
    }

    #[test]
    fn test_escape_behavior_flees_after_reaction() {
        let mut brain = Brain::new(WildState::Alerted, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::Escape);
        ctx.state_timer = 0.6;
        assert_eq!(step(&mut brain, &ctx, false), Some(WildState::Escape));
    }

    #[test]
    fn test_aggressive_without_attack_flees() {
        let mut brain = Brain::new(WildState::Alerted, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::Aggressive);
        ctx.can_attack = false;
        ctx.state_timer = 0.6;
        assert_eq!(step(&mut brain, &ctx, false), Some(WildState::Escape));
    }

    #[test]
    fn test_alert_drops_when_threat_leaves() {
        let mut brain = Brain::new(WildState::Alerted, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::Aggressive);
        ctx.target_distance = 6.0;
        assert_eq!(step(&mut brain, &ctx, false), Some(WildState::Wander));
    }

    #[test]
    fn test_attack_gives_up_after_action_duration() {
        let mut brain = Brain::new(WildState::Attack, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::Aggressive);
        ctx.state_timer = 10.5;
        assert_eq!(step(&mut brain, &ctx, false), Some(WildState::Wander));
    }

    #[test]
    fn test_very_aggressive_keeps_visible_target() {
        let mut brain = Brain::new(WildState::Attack, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::VeryAggressive);
        ctx.state_timer = 30.0;
        assert_eq!(step(&mut brain, &ctx, false), None);

        ctx.target_distance = 8.0;
        assert_eq!(step(&mut brain, &ctx, false), Some(WildState::Wander));
    }

    #[test]
    fn test_forced_actions_do_not_time_out() {
        let mut brain = Brain::new(WildState::Attack, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::Aggressive);
        ctx.force_action = true;
        ctx.state_timer = 100.0;
        assert_eq!(step(&mut brain, &ctx, false), None);

        let mut brain = Brain::new(WildState::Escape, Vec3::ZERO);
        ctx.target_distance = 50.0;
        assert_eq!(step(&mut brain, &ctx, false), None);
    }

    #[test]
    fn test_escape_continues_while_threat_in_range() {
        let mut brain = Brain::new(WildState::Escape, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::Escape);
        ctx.state_timer = 12.0;
        ctx.target_distance = 4.0;
        assert_eq!(step(&mut brain, &ctx, false), None);

        ctx.target_distance = 6.0;
        assert_eq!(step(&mut brain, &ctx, false), Some(WildState::Wander));
    }

    #[test]
    fn test_dead_target_ends_attack() {
        let mut brain = Brain::new(WildState::Attack, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::VeryAggressive);
        ctx.target_alive = false;
        assert_eq!(step(&mut brain, &ctx, false), Some(WildState::Wander));
    }

    #[test]
    fn test_move_to_ends_on_arrival() {
        let mut brain = Brain::new(WildState::MoveTo, Vec3::ZERO);
        let mut ctx = context(AnimalBehavior::Escape);
        assert_eq!(step(&mut brain, &ctx, false), None);
        ctx.reached = true;
        assert_eq!(step(&mut brain, &ctx, false), Some(WildState::Wander));
    }

    #[test]
    fn test_behavior_flags() {
        assert!(AnimalBehavior::Escape.escapes_on_sight());
        assert!(AnimalBehavior::PassiveEscape.escapes_when_hit());
        assert!(!AnimalBehavior::PassiveEscape.reacts_on_sight());
        assert!(AnimalBehavior::PassiveDefense.defends_when_hit());
        assert!(AnimalBehavior::VeryAggressive.attacks_on_sight());
        assert!(!AnimalBehavior::None.defends_when_hit());
    }

    #[test]
    fn test_sight_filter_follows_behavior() {
        assert_eq!(AnimalBehavior::Aggressive.sight_filter(true), ScanFilter::Prey);
        assert_eq!(AnimalBehavior::VeryAggressive.sight_filter(true), ScanFilter::Prey);
        // Без атаки хищник только убегает от бойцов
        assert_eq!(AnimalBehavior::Aggressive.sight_filter(false), ScanFilter::Threat);
        assert_eq!(AnimalBehavior::Escape.sight_filter(true), ScanFilter::Threat);
    }
}
