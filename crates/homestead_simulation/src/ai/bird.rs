//! Птицы: Sit ⇄ Fly, Alerted (угроза) → Fly, посадка через FlyDown
//!
//! В воздухе (Fly/FlyDown) коллайдеры выключены и гравитации нет.
//! Посадка только в найденную точку земли; не нашли: летаем до следующего slow тика.

use bevy::prelude::*;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::common::{orders_for, random_point_around};
use super::detection::{nearest_actor, DetectionCone, ScanFilter};
use super::events::{AnimalCommand, AnimalOrder};
use super::machine::{advance, BehaviorState, Brain, Phase, TransitionTable};
use crate::combat::Dead;
use crate::components::{Actor, BehaviorKind, Colliders};
use crate::locomotion::{Locomotion, LocomotionConfig};
use crate::registry::WorldSnapshot;
use crate::steering::PhysicsWorld;
use crate::DeterministicRng;

/// Сколько накопленного stuck_time терпит посадка
const LANDING_STUCK_LIMIT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BirdState {
    Sit,
    Fly,
    FlyDown,
    Alerted,
    Dead,
}

impl BehaviorState for BirdState {
    const DEAD: Self = BirdState::Dead;
    const KIND: BehaviorKind = BehaviorKind::Bird;

    fn name(&self) -> &'static str {
        match self {
            BirdState::Sit => "Sit",
            BirdState::Fly => "Fly",
            BirdState::FlyDown => "FlyDown",
            BirdState::Alerted => "Alerted",
            BirdState::Dead => "Dead",
        }
    }
}

impl BirdState {
    pub fn is_airborne(self) -> bool {
        matches!(self, BirdState::Fly | BirdState::FlyDown)
    }
}

#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct BirdConfig {
    pub sit_duration: f32,
    pub fly_duration: f32,
    pub fly_speed: f32,
    /// Высота полёта над точкой спавна
    pub fly_height: f32,
    /// Радиус полёта и поиска посадки вокруг спавна
    pub wander_range: f32,
    pub detect: DetectionCone,
    pub reaction_time: f32,
    /// Длина луча вниз при поиске земли
    pub landing_probe: f32,
}

impl Default for BirdConfig {
    fn default() -> Self {
        Self {
            sit_duration: 20.0,
            fly_duration: 10.0,
            fly_speed: 6.0,
            fly_height: 5.0,
            wander_range: 10.0,
            detect: DetectionCone {
                range: 6.0,
                angle: 360.0,
                range_360: 2.0,
            },
            reaction_time: 0.5,
            landing_probe: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BirdContext {
    pub state_timer: f32,
    pub stuck_time: f32,
    pub sit_duration: f32,
    pub fly_duration: f32,
    pub reaction_time: f32,
    pub sighted: bool,
    pub threat_visible: bool,
    pub landing_found: bool,
    pub reached: bool,
}

static BIRD_TABLE: Lazy<TransitionTable<BirdState, BirdContext>> = Lazy::new(|| {
    use BirdState::*;
    TransitionTable::<BirdState, BirdContext>::new()
        .on(Sit, Phase::Fast, |c| c.state_timer > c.sit_duration, Fly)
        .on(Sit, Phase::Slow, |c| c.sighted, Alerted)
        .on(Alerted, Phase::Fast, |c| c.state_timer > c.reaction_time, Fly)
        .on(Alerted, Phase::Fast, |c| !c.threat_visible, Sit)
        .on(Fly, Phase::Slow, |c| c.state_timer > c.fly_duration && c.landing_found, FlyDown)
        .on(FlyDown, Phase::Fast, |c| c.reached, Sit)
        .on(FlyDown, Phase::Fast, |c| c.stuck_time > LANDING_STUCK_LIMIT, Fly)
});

pub fn bird_transitions() -> &'static TransitionTable<BirdState, BirdContext> {
    &BIRD_TABLE
}

struct BirdBody<'a> {
    position: Vec3,
    config: &'a BirdConfig,
    loco: &'a mut Locomotion,
    colliders: Option<&'a mut Colliders>,
}

impl BirdBody<'_> {
    fn set_airborne(&mut self, airborne: bool) {
        self.loco.flying = airborne;
        if let Some(colliders) = self.colliders.as_deref_mut() {
            colliders.enabled = !airborne;
        }
    }

    fn fly_somewhere(&mut self, home: Vec3, rng: &mut impl Rng) {
        let mut point = random_point_around(home, self.config.wander_range, rng);
        point.y = home.y + self.config.fly_height;
        self.loco.set_speed(self.config.fly_speed);
        self.loco.move_to(point);
    }
}

fn enter_state(
    state: BirdState,
    brain: &mut Brain<BirdState>,
    body: &mut BirdBody,
    snapshot: &WorldSnapshot,
    landing: Option<Vec3>,
    rng: &mut impl Rng,
) {
    match state {
        BirdState::Sit => {
            brain.set_target(None);
            brain.clear_force();
            body.loco.stop();
            body.set_airborne(false);
        }
        BirdState::Alerted => {
            body.loco.stop();
            if let Some(threat) = brain.target().and_then(|t| snapshot.position_of(t)) {
                body.loco.face_toward(body.position, threat);
            }
        }
        BirdState::Fly => {
            body.set_airborne(true);
            body.fly_somewhere(brain.home(), rng);
        }
        BirdState::FlyDown => {
            body.set_airborne(true);
            if let Some(spot) = landing {
                body.loco.move_to(spot);
            }
        }
        BirdState::Dead => {}
    }
}

fn build_context(brain: &Brain<BirdState>, body: &BirdBody, snapshot: &WorldSnapshot, sighted: bool, landing: bool) -> BirdContext {
    let threat_visible = brain
        .target()
        .and_then(|t| snapshot.actor(t))
        .is_some_and(|threat| threat.alive && threat.position.distance(body.position) < body.config.detect.range);

    BirdContext {
        state_timer: brain.state_timer(),
        stuck_time: brain.stuck_time(),
        sit_duration: body.config.sit_duration,
        fly_duration: body.config.fly_duration,
        reaction_time: body.config.reaction_time,
        sighted,
        threat_visible,
        landing_found: landing,
        reached: body.loco.has_reached_target(),
    }
}

pub fn bird_behavior(
    mut birds: Query<
        (
            Entity,
            &Transform,
            &BirdConfig,
            &LocomotionConfig,
            &Actor,
            &mut Brain<BirdState>,
            &mut Locomotion,
            Option<&mut Colliders>,
        ),
        Without<Dead>,
    >,
    snapshot: Res<WorldSnapshot>,
    physics: Res<PhysicsWorld>,
    mut command_events: EventReader<AnimalCommand>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.delta_secs();
    let orders: Vec<AnimalCommand> = command_events.read().copied().collect();
    let rng = &mut rng.rng;
    let query = physics.query();

    for (entity, transform, config, loco_config, actor, mut brain, mut loco, mut colliders) in birds.iter_mut() {
        if brain.is_dead() {
            continue;
        }
        let mut body = BirdBody {
            position: transform.translation,
            config,
            loco: &mut loco,
            colliders: colliders.as_deref_mut(),
        };

        for order in orders_for(&orders, entity) {
            match order {
                AnimalOrder::Stop => {
                    if brain.command(BirdState::Sit, false) {
                        enter_state(BirdState::Sit, &mut brain, &mut body, &snapshot, None, rng);
                    }
                }
                AnimalOrder::Escape(_) => {
                    if brain.command(BirdState::Fly, true) {
                        enter_state(BirdState::Fly, &mut brain, &mut body, &snapshot, None, rng);
                    }
                }
                _ => {}
            }
        }

        brain.tick(dt, body.loco.is_stuck);
        let slow = brain.poll_slow_update(dt, rng);

        let mut sighted = None;
        let mut landing = None;
        match brain.state() {
            BirdState::Sit if slow => {
                sighted = nearest_actor(
                    &snapshot,
                    ScanFilter::Threat,
                    entity,
                    &actor.groups,
                    body.position,
                    body.loco.facing,
                    &config.detect,
                );
            }
            BirdState::Fly => {
                if body.loco.has_reached_target() || !body.loco.is_moving {
                    body.fly_somewhere(brain.home(), rng);
                }
                if slow && brain.state_timer() > config.fly_duration {
                    let spot = random_point_around(brain.home(), config.wander_range, rng);
                    let origin = Vec3::new(spot.x, brain.home().y + config.landing_probe * 0.5, spot.z);
                    landing = query.find_ground_position(origin, config.landing_probe, loco_config.ground_layer);
                    if landing.is_none() {
                        crate::log(&format!("🐦 {:?}: no landing spot, retry next cycle", entity));
                    }
                }
            }
            _ => {}
        }

        let context = build_context(&brain, &body, &snapshot, sighted.is_some(), landing.is_some());
        if let Some(next) = advance(&mut *brain, bird_transitions(), &context, slow) {
            if next == BirdState::Alerted {
                brain.set_target(sighted.map(|(threat, _)| threat));
            }
            enter_state(next, &mut brain, &mut body, &snapshot, landing, rng);
        }
    }
}

/// Мёртвая птица падает и снова сталкивается
pub fn ground_dead_birds(mut birds: Query<(&mut Locomotion, Option<&mut Colliders>), (With<Brain<BirdState>>, Added<Dead>)>) {
    for (mut loco, colliders) in birds.iter_mut() {
        loco.flying = false;
        if let Some(mut colliders) = colliders {
            colliders.enabled = true;
        }
    }
}
