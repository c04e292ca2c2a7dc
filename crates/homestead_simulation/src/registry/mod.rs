//! WorldSnapshot: read-only registry живых entity на текущий тик
//!
//! Пересобирается в начале тика (SimSet::Snapshot). Все cross-entity
//! запросы (threat scan, ближайшая еда, позиция цели) идут через него,
//! поэтому behavior systems не держат чужие компоненты на запись.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::ai::wild::WildConfig;
use crate::combat::{CombatStats, CombatTarget, Dead, Destructible, TargetView};
use crate::components::{Actor, BehaviorKind, Colliders, DigSpot, Food, Health, Player};
use crate::steering::math::forward;

#[derive(Debug, Clone, PartialEq)]
pub struct ActorView {
    pub entity: Entity,
    pub position: Vec3,
    pub facing: Vec3,
    pub behavior: Option<BehaviorKind>,
    pub is_player: bool,
    pub groups: Vec<String>,
    pub alive: bool,
    /// `None` у игрока
    pub hit_range: Option<f32>,
    pub can_attack: bool,
    /// Атакует при виде (Aggressive / VeryAggressive)
    pub hostile: bool,
    pub collidable: bool,
}

impl ActorView {
    pub fn shares_group(&self, groups: &[String]) -> bool {
        self.groups.iter().any(|g| groups.contains(g))
    }

    pub fn combat_target(&self) -> CombatTarget {
        if self.is_player {
            CombatTarget::Player(self.entity)
        } else {
            CombatTarget::Destructible(self.entity)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoodView {
    pub entity: Entity,
    pub position: Vec3,
    pub group: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DigSpotView {
    pub entity: Entity,
    pub position: Vec3,
}

#[derive(Resource, Debug, Default)]
pub struct WorldSnapshot {
    pub actors: Vec<ActorView>,
    pub foods: Vec<FoodView>,
    pub dig_spots: Vec<DigSpotView>,
    index: HashMap<Entity, usize>,
}

impl WorldSnapshot {
    pub fn push_actor(&mut self, view: ActorView) {
        self.index.insert(view.entity, self.actors.len());
        self.actors.push(view);
    }

    pub fn clear(&mut self) {
        self.actors.clear();
        self.foods.clear();
        self.dig_spots.clear();
        self.index.clear();
    }

    pub fn actor(&self, entity: Entity) -> Option<&ActorView> {
        self.index.get(&entity).map(|&i| &self.actors[i])
    }

    pub fn position_of(&self, entity: Entity) -> Option<Vec3> {
        if let Some(actor) = self.actor(entity) {
            return Some(actor.position);
        }
        self.foods
            .iter()
            .find(|food| food.entity == entity)
            .map(|food| food.position)
            .or_else(|| {
                self.dig_spots
                    .iter()
                    .find(|spot| spot.entity == entity)
                    .map(|spot| spot.position)
            })
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.actor(entity).is_some_and(|actor| actor.alive)
    }

    pub fn target_view(&self, entity: Entity) -> Option<TargetView> {
        self.actor(entity).map(|actor| TargetView {
            position: actor.position,
            hit_range: actor.hit_range,
            alive: actor.alive,
        })
    }

    pub fn food(&self, entity: Entity) -> Option<&FoodView> {
        self.foods.iter().find(|food| food.entity == entity)
    }

    pub fn dig_spot(&self, entity: Entity) -> Option<&DigSpotView> {
        self.dig_spots.iter().find(|spot| spot.entity == entity)
    }

    pub fn players(&self) -> impl Iterator<Item = &ActorView> {
        self.actors.iter().filter(|actor| actor.is_player)
    }
}

type ActorQueryData = (
    Entity,
    &'static Transform,
    Option<&'static Actor>,
    Has<Player>,
    Option<&'static Health>,
    Option<&'static Destructible>,
    Option<&'static CombatStats>,
    Option<&'static WildConfig>,
    Option<&'static Colliders>,
    Has<Dead>,
);

pub fn rebuild_world_snapshot(
    mut snapshot: ResMut<WorldSnapshot>,
    actors: Query<ActorQueryData, Or<(With<Actor>, With<Player>, With<Destructible>)>>,
    foods: Query<(Entity, &Transform, &Food)>,
    dig_spots: Query<(Entity, &Transform, &DigSpot)>,
) {
    snapshot.clear();

    for (entity, transform, actor, is_player, health, destructible, combat, wild, colliders, dead) in actors.iter() {
        snapshot.push_actor(ActorView {
            entity,
            position: transform.translation,
            facing: forward(transform.rotation),
            behavior: actor.map(|a| a.behavior),
            is_player,
            groups: actor.map(|a| a.groups.clone()).unwrap_or_default(),
            alive: !dead && health.is_none_or(|h| h.is_alive()),
            hit_range: if is_player { None } else { Some(destructible.map_or(0.0, |d| d.hit_range)) },
            can_attack: is_player || combat.is_some_and(|c| c.attack_enabled),
            hostile: wild.is_some_and(|w| w.behavior.attacks_on_sight()),
            collidable: colliders.is_none_or(|c| c.enabled),
        });
    }

    for (entity, transform, food) in foods.iter() {
        if food.quantity > 0 {
            snapshot.foods.push(FoodView {
                entity,
                position: transform.translation,
                group: food.group.clone(),
            });
        }
    }

    for (entity, transform, _) in dig_spots.iter() {
        snapshot.dig_spots.push(DigSpotView {
            entity,
            position: transform.translation,
        });
    }
}
