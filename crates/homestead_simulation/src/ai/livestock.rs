//! Скот: Wander → FindFood → Eat → Wander
//!
//! Голод, рост и производство считаются по `GrowthTimer` (checkpoint в SaveStore,
//! переживает перезагрузку). Счётчик съеденного лежит там же под `{uid}_eat_count`.

use bevy::prelude::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::common::{orders_for, tick_wander, WanderConfig};
use super::detection::{find_nearest, DetectionCone};
use super::events::{AnimalCommand, AnimalOrder, FoodEaten, GrowRequested};
use super::machine::{advance, BehaviorState, Brain, Phase, TransitionTable};
use crate::combat::Dead;
use crate::components::{BehaviorKind, Food, UniqueId};
use crate::growth::{GameClock, GrowthTimer, ItemProduced, TimeType};
use crate::locomotion::Locomotion;
use crate::persistence::SaveStore;
use crate::registry::WorldSnapshot;
use crate::steering::math::flat_distance;
use crate::DeterministicRng;

pub const LAST_EAT_TAG: &str = "last_eat";
pub const EAT_COUNT_TAG: &str = "eat_count";
pub const GROW_TAG: &str = "grow_time";
pub const PRODUCE_TAG: &str = "product_time";
pub const PRODUCT_COUNT_TAG: &str = "product";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LivestockState {
    Wander,
    FindFood,
    Eat,
    MoveTo,
    Dead,
}

impl BehaviorState for LivestockState {
    const DEAD: Self = LivestockState::Dead;
    const KIND: BehaviorKind = BehaviorKind::Livestock;

    fn name(&self) -> &'static str {
        match self {
            LivestockState::Wander => "Wander",
            LivestockState::FindFood => "FindFood",
            LivestockState::Eat => "Eat",
            LivestockState::MoveTo => "MoveTo",
            LivestockState::Dead => "Dead",
        }
    }
}

#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct LivestockConfig {
    pub wander: WanderConfig,
    /// Пустая строка: ест любую еду
    pub food_group: String,
    pub detect: DetectionCone,
    pub eat_range: f32,
    pub eat_duration: f32,
    pub find_food_timeout: f32,
    /// Накопленный stuck_time, после которого FindFood сдаётся
    pub stuck_give_up: f32,

    pub time_type: TimeType,
    pub eat_interval: f32,

    /// Species id взрослой особи
    pub grow_to: Option<String>,
    pub grow_eat_count: i32,
    pub grow_duration: f32,

    pub produce_item: Option<String>,
    pub produce_eat_count: i32,
    pub produce_duration: f32,
    pub produce_max: i32,
}

impl Default for LivestockConfig {
    fn default() -> Self {
        Self {
            wander: WanderConfig::default(),
            food_group: String::new(),
            detect: DetectionCone {
                range: 10.0,
                angle: 360.0,
                range_360: 1.0,
            },
            eat_range: 1.0,
            eat_duration: 2.0,
            find_food_timeout: 10.0,
            stuck_give_up: 2.0,
            time_type: TimeType::GameHours,
            eat_interval: 12.0,
            grow_to: None,
            grow_eat_count: 4,
            grow_duration: 48.0,
            produce_item: None,
            produce_eat_count: 1,
            produce_duration: 24.0,
            produce_max: 1,
        }
    }
}

impl LivestockConfig {
    pub fn hunger_timer(&self) -> GrowthTimer {
        GrowthTimer::new(LAST_EAT_TAG, self.time_type, self.eat_interval)
    }

    pub fn grow_timer(&self) -> GrowthTimer {
        GrowthTimer::new(GROW_TAG, self.time_type, self.grow_duration)
    }

    pub fn produce_timer(&self) -> GrowthTimer {
        GrowthTimer::new(PRODUCE_TAG, self.time_type, self.produce_duration)
    }

    pub fn eats(&self, group: &str) -> bool {
        self.food_group.is_empty() || self.food_group == group
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LivestockContext {
    pub state_timer: f32,
    pub stuck_time: f32,
    pub hungry: bool,
    pub food_in_sight: bool,
    pub food_alive: bool,
    pub within_eat_range: bool,
    pub reached: bool,
    pub eat_duration: f32,
    pub find_food_timeout: f32,
    pub stuck_give_up: f32,
}

static LIVESTOCK_TABLE: Lazy<TransitionTable<LivestockState, LivestockContext>> = Lazy::new(|| {
    use LivestockState::*;
    TransitionTable::<LivestockState, LivestockContext>::new()
        .on(Wander, Phase::Slow, |c| c.hungry && c.food_in_sight, FindFood)
        .on(FindFood, Phase::Fast, |c| !c.food_alive, Wander)
        .on(FindFood, Phase::Fast, |c| c.within_eat_range, Eat)
        .on(
            FindFood,
            Phase::Fast,
            |c| c.state_timer > c.find_food_timeout || c.stuck_time > c.stuck_give_up,
            Wander,
        )
        .on(Eat, Phase::Fast, |c| c.state_timer > c.eat_duration, Wander)
        .on(Eat, Phase::Fast, |c| !c.food_alive, Wander)
        .on(MoveTo, Phase::Fast, |c| c.reached, Wander)
});

pub fn livestock_transitions() -> &'static TransitionTable<LivestockState, LivestockContext> {
    &LIVESTOCK_TABLE
}

/// Ближайшая подходящая еда в конусе
pub fn nearest_food(snapshot: &WorldSnapshot, config: &LivestockConfig, position: Vec3, facing: Vec3) -> Option<Entity> {
    let candidates = snapshot
        .foods
        .iter()
        .filter(|food| config.eats(&food.group))
        .map(|food| (food.entity, food.position));
    find_nearest(position, facing, &config.detect, candidates).map(|(food, _)| food)
}

/// FinishEat: +1 к счётчику, голод с нуля. Возвращает новый eat_count.
pub fn finish_eat(store: &mut SaveStore, clock: &GameClock, config: &LivestockConfig, unique_id: &UniqueId) -> i32 {
    let count_key = unique_id.key(EAT_COUNT_TAG);
    let eat_count = store.get_custom_int(&count_key) + 1;
    store.set_custom_int(count_key, eat_count);
    config.hunger_timer().reset(store, clock, unique_id.as_str());
    eat_count
}

/// Готов вырасти: наелся и прошло grow_duration
pub fn ready_to_grow(store: &SaveStore, clock: &GameClock, config: &LivestockConfig, unique_id: &UniqueId) -> bool {
    config.grow_to.is_some()
        && store.get_custom_int(&unique_id.key(EAT_COUNT_TAG)) >= config.grow_eat_count
        && config.grow_timer().has_elapsed(store, clock, unique_id.as_str())
}

/// Один продукт, если наелся, прошло produce_duration и есть место.
/// Возвращает (item_id, накопленное количество).
pub fn try_produce(
    store: &mut SaveStore,
    clock: &GameClock,
    config: &LivestockConfig,
    unique_id: &UniqueId,
) -> Option<(String, i32)> {
    let item_id = config.produce_item.clone()?;
    let count_key = unique_id.key(EAT_COUNT_TAG);
    let product_key = unique_id.key(PRODUCT_COUNT_TAG);
    let eat_count = store.get_custom_int(&count_key);
    let products = store.get_custom_int(&product_key);

    if eat_count < config.produce_eat_count
        || products >= config.produce_max
        || !config.produce_timer().has_elapsed(store, clock, unique_id.as_str())
    {
        return None;
    }

    store.set_custom_int(product_key, products + 1);
    store.set_custom_int(count_key, eat_count - config.produce_eat_count);
    config.produce_timer().reset(store, clock, unique_id.as_str());
    Some((item_id, products + 1))
}

fn enter_state(
    state: LivestockState,
    brain: &mut Brain<LivestockState>,
    loco: &mut Locomotion,
    config: &LivestockConfig,
    position: Vec3,
    snapshot: &WorldSnapshot,
) {
    let food_position = brain.target().and_then(|food| snapshot.position_of(food));
    match state {
        LivestockState::Wander => {
            brain.set_target(None);
            brain.clear_force();
            loco.stop();
            loco.target_entity = None;
            loco.set_speed(config.wander.speed);
        }
        LivestockState::FindFood => {
            loco.target_entity = brain.target();
            if let Some(food) = food_position {
                loco.move_to_within(food, Some(config.eat_range));
            }
        }
        LivestockState::Eat => {
            loco.stop();
            if let Some(food) = food_position {
                loco.face_toward(position, food);
            }
        }
        LivestockState::MoveTo | LivestockState::Dead => {}
    }
}

fn apply_order(
    order: AnimalOrder,
    brain: &mut Brain<LivestockState>,
    loco: &mut Locomotion,
    config: &LivestockConfig,
    position: Vec3,
    snapshot: &WorldSnapshot,
) {
    match order {
        AnimalOrder::MoveTo(point) => {
            if brain.command(LivestockState::MoveTo, true) {
                loco.move_to(point);
            }
        }
        AnimalOrder::Stop => {
            if brain.command(LivestockState::Wander, false) {
                enter_state(LivestockState::Wander, brain, loco, config, position, snapshot);
            }
        }
        _ => {}
    }
}

/// Новый скот: проставить checkpoint'ы таймеров (сохранённые не трогаем)
pub fn start_livestock_timers(
    animals: Query<(&UniqueId, &LivestockConfig), Added<LivestockConfig>>,
    mut store: ResMut<SaveStore>,
    clock: Res<GameClock>,
) {
    for (unique_id, config) in animals.iter() {
        config.hunger_timer().ensure_started(&mut store, &clock, unique_id.as_str());
        if config.grow_to.is_some() {
            config.grow_timer().ensure_started(&mut store, &clock, unique_id.as_str());
        }
        if config.produce_item.is_some() {
            config.produce_timer().ensure_started(&mut store, &clock, unique_id.as_str());
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn livestock_behavior(
    mut commands: Commands,
    mut animals: Query<
        (
            Entity,
            &Transform,
            &LivestockConfig,
            &UniqueId,
            &mut Brain<LivestockState>,
            &mut Locomotion,
        ),
        Without<Dead>,
    >,
    mut foods: Query<&mut Food>,
    snapshot: Res<WorldSnapshot>,
    mut store: ResMut<SaveStore>,
    clock: Res<GameClock>,
    mut command_events: EventReader<AnimalCommand>,
    mut eaten_events: EventWriter<FoodEaten>,
    mut grow_events: EventWriter<GrowRequested>,
    mut produced_events: EventWriter<ItemProduced>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.delta_secs();
    let orders: Vec<AnimalCommand> = command_events.read().copied().collect();
    let rng = &mut rng.rng;

    for (entity, transform, config, unique_id, mut brain, mut loco) in animals.iter_mut() {
        if brain.is_dead() {
            continue;
        }
        let position = transform.translation;

        for order in orders_for(&orders, entity) {
            apply_order(order, &mut brain, &mut loco, config, position, &snapshot);
        }

        brain.tick(dt, loco.is_stuck);
        let slow = brain.poll_slow_update(dt, rng);

        match brain.state() {
            LivestockState::Wander => {
                tick_wander(&mut *brain, &mut *loco, &config.wander, position, rng);

                if slow && ready_to_grow(&store, &clock, config, unique_id) {
                    if let Some(species_id) = config.grow_to.clone() {
                        crate::log_info(&format!("🐄 {:?} grows into '{}'", entity, species_id));
                        grow_events.write(GrowRequested {
                            entity,
                            species_id,
                            position,
                            rotation: transform.rotation,
                        });
                        store.remove_all_for(unique_id.as_str());
                        commands.entity(entity).despawn();
                        continue;
                    }
                }

                if slow {
                    if let Some((item_id, count)) = try_produce(&mut store, &clock, config, unique_id) {
                        crate::log(&format!("🥚 {:?} produced {} ({})", entity, item_id, count));
                        produced_events.write(ItemProduced {
                            source: entity,
                            item_id,
                            count,
                        });
                    }
                }
            }
            LivestockState::Eat if brain.state_timer() > config.eat_duration => {
                let food = brain.target();
                let consumed = food.and_then(|food| foods.get_mut(food).ok()).is_some_and(|mut stock| {
                    if stock.quantity == 0 {
                        return false;
                    }
                    stock.quantity -= 1;
                    true
                });

                if let (true, Some(food)) = (consumed, food) {
                    let eat_count = finish_eat(&mut store, &clock, config, unique_id);
                    crate::log(&format!("🌾 {:?} ate {:?} (eat_count {})", entity, food, eat_count));
                    eaten_events.write(FoodEaten {
                        eater: entity,
                        food,
                        eat_count,
                    });
                    if foods.get(food).is_ok_and(|stock| stock.quantity == 0) {
                        commands.entity(food).despawn();
                    }
                }
            }
            _ => {}
        }

        let sighted_food = if slow && brain.is(LivestockState::Wander) {
            nearest_food(&snapshot, config, position, loco.facing)
        } else {
            None
        };
        let hungry = slow && brain.is(LivestockState::Wander) && config.hunger_timer().has_elapsed(&store, &clock, unique_id.as_str());

        let food = brain.target().and_then(|food| snapshot.food(food));
        let context = LivestockContext {
            state_timer: brain.state_timer(),
            stuck_time: brain.stuck_time(),
            hungry,
            food_in_sight: sighted_food.is_some(),
            food_alive: food.is_some(),
            within_eat_range: food.is_some_and(|food| flat_distance(position, food.position) <= config.eat_range),
            reached: loco.has_reached_target(),
            eat_duration: config.eat_duration,
            find_food_timeout: config.find_food_timeout,
            stuck_give_up: config.stuck_give_up,
        };

        if let Some(next) = advance(&mut *brain, livestock_transitions(), &context, slow) {
            if next == LivestockState::FindFood {
                brain.set_target(sighted_food);
            }
            enter_state(next, &mut brain, &mut loco, config, position, &snapshot);
        }
    }
}
