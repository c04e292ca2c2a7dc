//! Объекты мира, с которыми взаимодействуют животные: еда, места для копания

use bevy::prelude::*;

/// Еда на земле (корм, упавшие фрукты)
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform)]
pub struct Food {
    /// Какая группа животных это ест
    pub group: String,
    pub quantity: u32,
}

impl Food {
    pub fn new(group: impl Into<String>, quantity: u32) -> Self {
        Self {
            group: group.into(),
            quantity,
        }
    }
}

/// Закопанный предмет, который питомец может выкопать
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Transform)]
pub struct DigSpot {
    pub item_id: String,
}

impl DigSpot {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self { item_id: item_id.into() }
    }
}
