//! Всё, что растёт и производит по игровому времени: растения, источники
//! предметов (улей, колодец), печи. Состояние в SaveStore под uid.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::clock::GameClock;
use super::timer::{GrowthTimer, TimeType};
use crate::components::UniqueId;
use crate::persistence::SaveStore;

pub const PLANT_STAGE_TAG: &str = "growth_stage";
pub const PLANT_GROW_TAG: &str = "grow_time";
pub const PLANT_FRUIT_TAG: &str = "fruit_time";
pub const PLANT_FRUIT_COUNT_TAG: &str = "fruit";
pub const PROVIDER_TAG: &str = "provider_time";
pub const PROVIDER_COUNT_TAG: &str = "provider";
pub const FURNACE_TAG: &str = "furnace_time";
pub const FURNACE_ITEM_TAG: &str = "furnace_item";

/// Новый предмет готов к сбору; `count` = сколько всего накопилось
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ItemProduced {
    pub source: Entity,
    pub item_id: String,
    pub count: i32,
}

#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct Plant {
    /// Количество стадий (последняя = взрослое растение)
    pub stages: i32,
    pub time_type: TimeType,
    /// Время на одну стадию
    pub grow_duration: f32,
    pub fruit_item: Option<String>,
    pub fruit_duration: f32,
    pub fruit_max: i32,
    /// Текущая стадия (зеркало SaveStore)
    pub stage: i32,
}

impl Default for Plant {
    fn default() -> Self {
        Self {
            stages: 3,
            time_type: TimeType::GameDays,
            grow_duration: 1.0,
            fruit_item: None,
            fruit_duration: 1.0,
            fruit_max: 3,
            stage: 0,
        }
    }
}

impl Plant {
    pub fn grow_timer(&self) -> GrowthTimer {
        GrowthTimer::new(PLANT_GROW_TAG, self.time_type, self.grow_duration)
    }

    pub fn fruit_timer(&self) -> GrowthTimer {
        GrowthTimer::new(PLANT_FRUIT_TAG, self.time_type, self.fruit_duration)
    }

    pub fn is_fully_grown(&self) -> bool {
        self.stage >= self.stages - 1
    }
}

#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct ItemProvider {
    pub item_id: String,
    pub time_type: TimeType,
    pub interval: f32,
    pub max: i32,
}

impl Default for ItemProvider {
    fn default() -> Self {
        Self {
            item_id: String::new(),
            time_type: TimeType::GameHours,
            interval: 24.0,
            max: 1,
        }
    }
}

impl ItemProvider {
    pub fn timer(&self) -> GrowthTimer {
        GrowthTimer::new(PROVIDER_TAG, self.time_type, self.interval)
    }
}

/// Печь: загруженный предмет превращается в `output` через `duration`
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct Furnace {
    pub time_type: TimeType,
    pub duration: f32,
}

impl Default for Furnace {
    fn default() -> Self {
        Self {
            time_type: TimeType::GameHours,
            duration: 2.0,
        }
    }
}

impl Furnace {
    pub fn timer(&self) -> GrowthTimer {
        GrowthTimer::new(FURNACE_TAG, self.time_type, self.duration)
    }

    pub fn is_busy(store: &SaveStore, unique_id: &UniqueId) -> bool {
        store.has_custom_string(&unique_id.key(FURNACE_ITEM_TAG))
    }

    /// Загрузить печь. false: уже занята.
    pub fn load(&self, store: &mut SaveStore, clock: &GameClock, unique_id: &UniqueId, output: &str) -> bool {
        if Self::is_busy(store, unique_id) {
            return false;
        }
        store.set_custom_string(unique_id.key(FURNACE_ITEM_TAG), output);
        self.timer().reset(store, clock, unique_id.as_str());
        true
    }

    /// Готовый предмет, если время вышло (печь освобождается)
    pub fn finish(&self, store: &mut SaveStore, clock: &GameClock, unique_id: &UniqueId) -> Option<String> {
        let key = unique_id.key(FURNACE_ITEM_TAG);
        let output = store.get_custom_string(&key)?.to_string();
        if !self.timer().has_elapsed(store, clock, unique_id.as_str()) {
            return None;
        }
        store.remove_custom_string(&key);
        Some(output)
    }
}

/// Забрать накопленное (fruit, provider, livestock product): счётчик в 0
pub fn take_collected(store: &mut SaveStore, unique_id: &UniqueId, tag: &str) -> i32 {
    let key = unique_id.key(tag);
    let count = store.get_custom_int(&key);
    store.set_custom_int(key, 0);
    count
}

/// +1 к счётчику, если ниже max. Возвращает новое значение.
fn accumulate(store: &mut SaveStore, key: String, max: i32) -> Option<i32> {
    let count = store.get_custom_int(&key);
    if count >= max {
        return None;
    }
    store.set_custom_int(key, count + 1);
    Some(count + 1)
}

pub fn grow_plants(
    mut plants: Query<(Entity, &UniqueId, &mut Plant)>,
    mut store: ResMut<SaveStore>,
    clock: Res<GameClock>,
    mut produced_events: EventWriter<ItemProduced>,
) {
    for (entity, unique_id, mut plant) in plants.iter_mut() {
        let uid = unique_id.as_str();
        plant.grow_timer().ensure_started(&mut store, &clock, uid);
        plant.stage = store.get_custom_int(&unique_id.key(PLANT_STAGE_TAG));

        if !plant.is_fully_grown() {
            if plant.grow_timer().has_elapsed(&store, &clock, uid) {
                plant.stage += 1;
                store.set_custom_int(unique_id.key(PLANT_STAGE_TAG), plant.stage);
                plant.grow_timer().reset(&mut store, &clock, uid);
                if plant.is_fully_grown() {
                    plant.fruit_timer().reset(&mut store, &clock, uid);
                }
                crate::log(&format!("🌱 {:?} ({}) stage {}", entity, uid, plant.stage));
            }
            continue;
        }

        let Some(item_id) = plant.fruit_item.clone() else {
            continue;
        };
        plant.fruit_timer().ensure_started(&mut store, &clock, uid);
        if !plant.fruit_timer().has_elapsed(&store, &clock, uid) {
            continue;
        }
        plant.fruit_timer().reset(&mut store, &clock, uid);
        if let Some(count) = accumulate(&mut store, unique_id.key(PLANT_FRUIT_COUNT_TAG), plant.fruit_max) {
            produced_events.write(ItemProduced {
                source: entity,
                item_id,
                count,
            });
        }
    }
}

pub fn tick_item_providers(
    providers: Query<(Entity, &UniqueId, &ItemProvider)>,
    mut store: ResMut<SaveStore>,
    clock: Res<GameClock>,
    mut produced_events: EventWriter<ItemProduced>,
) {
    for (entity, unique_id, provider) in providers.iter() {
        let uid = unique_id.as_str();
        let timer = provider.timer();
        timer.ensure_started(&mut store, &clock, uid);
        if !timer.has_elapsed(&store, &clock, uid) {
            continue;
        }
        timer.reset(&mut store, &clock, uid);
        if let Some(count) = accumulate(&mut store, unique_id.key(PROVIDER_COUNT_TAG), provider.max) {
            produced_events.write(ItemProduced {
                source: entity,
                item_id: provider.item_id.clone(),
                count,
            });
        }
    }
}

pub fn tick_furnaces(
    furnaces: Query<(Entity, &UniqueId, &Furnace)>,
    mut store: ResMut<SaveStore>,
    clock: Res<GameClock>,
    mut produced_events: EventWriter<ItemProduced>,
) {
    for (entity, unique_id, furnace) in furnaces.iter() {
        if let Some(item_id) = furnace.finish(&mut store, &clock, unique_id) {
            crate::log_info(&format!("🔥 {:?} finished {}", entity, item_id));
            produced_events.write(ItemProduced {
                source: entity,
                item_id,
                count: 1,
            });
        }
    }
}
