//! Базовые компоненты акторов: Actor, Health, Player, UniqueId

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::persistence::custom_key;

/// Какой state machine управляет актором
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum BehaviorKind {
    Wild,
    Livestock,
    Bird,
    Pet,
    PlayerControlled,
}

/// Актор (животное, питомец, игрок): всё, что видят threat/food scans
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(Health, Transform)]
pub struct Actor {
    pub behavior: BehaviorKind,
    /// Group tags: свои не атакуют/не пугают своих
    pub groups: Vec<String>,
}

impl Actor {
    pub fn new(behavior: BehaviorKind) -> Self {
        Self {
            behavior,
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn shares_group(&self, other: &[String]) -> bool {
        self.groups.iter().any(|g| other.contains(g))
    }
}

/// Здоровье
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }

    pub fn heal(&mut self, amount: u32) {
        self.current = self.current.saturating_add(amount).min(self.max);
    }
}

/// Player character (цель без hit_range)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(Health, Transform)]
pub struct Player;

/// Stable string identity, префикс ключей в `SaveStore`
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
#[reflect(Component)]
pub struct UniqueId(pub String);

impl UniqueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn key(&self, tag: &str) -> String {
        custom_key(&self.0, tag)
    }
}

/// Colliders entity (птицы выключают их в полёте)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Colliders {
    pub enabled: bool,
}

impl Default for Colliders {
    fn default() -> Self {
        Self { enabled: true }
    }
}
