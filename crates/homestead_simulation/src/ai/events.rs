//! AI events: внешние команды животным + уведомления о поведении

use bevy::prelude::*;

use crate::components::BehaviorKind;

/// Команда от игрока/скрипта
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimalOrder {
    Attack(Entity),
    Escape(Entity),
    MoveTo(Vec3),
    Stop,
    /// Питомец: привязать к хозяину
    Tame(Entity),
    Untame,
    /// Питомца гладит игрок
    PetBy(Entity),
    /// Смерть через `delay` секунд
    KillIn(f32),
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AnimalCommand {
    pub entity: Entity,
    pub order: AnimalOrder,
}

impl AnimalCommand {
    pub fn new(entity: Entity, order: AnimalOrder) -> Self {
        Self { entity, order }
    }
}

/// Смена состояния (анимации, звуки, отладка)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct BehaviorChanged {
    pub entity: Entity,
    pub kind: BehaviorKind,
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct FoodEaten {
    pub eater: Entity,
    pub food: Entity,
    pub eat_count: i32,
}

/// Livestock вырос: заменить entity на `species_id`
#[derive(Event, Debug, Clone, PartialEq)]
pub struct GrowRequested {
    pub entity: Entity,
    pub species_id: String,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct ItemDug {
    pub digger: Entity,
    pub spot: Entity,
    pub item_id: String,
}
