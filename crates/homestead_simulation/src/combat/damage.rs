//! Damage + смерть
//!
//! HitRequest (melee удар / попадание снаряда) → Health → DamageDealt / EntityDied.
//! Смерть: Dead маркер, остановка движения/атаки, труп убирается по таймеру.

use bevy::prelude::*;

use super::cycle::CombatState;
use crate::components::{Health, Player};
use crate::locomotion::Locomotion;
use crate::scheduler::{ScheduledAction, Scheduler};

/// Entity с HP, которую можно атаковать
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
#[require(Health)]
pub struct Destructible {
    /// Добавляется к attack_range атакующего
    pub hit_range: f32,
    /// Сколько труп лежит до despawn (секунды)
    pub corpse_duration: f32,
}

impl Default for Destructible {
    fn default() -> Self {
        Self {
            hit_range: 0.5,
            corpse_duration: 10.0,
        }
    }
}

/// Маркер: entity мертва. Locomotion/combat/AI её пропускают.
#[derive(Component, Debug, Clone, Copy)]
pub struct Dead;

/// Начало замаха (анимация)
#[derive(Event, Debug, Clone)]
pub struct AttackStarted {
    pub attacker: Entity,
    pub target: Option<Entity>,
}

/// Запрос урона: melee strike или попадание снаряда
#[derive(Event, Debug, Clone)]
pub struct HitRequest {
    pub attacker: Entity,
    pub target: Entity,
    pub damage: u32,
}

/// Урон нанесен
#[derive(Event, Debug, Clone)]
pub struct DamageDealt {
    pub attacker: Entity,
    pub target: Entity,
    pub damage: u32,
    pub target_died: bool,
}

/// Entity умерла (health дошёл до 0 или прямой kill)
#[derive(Event, Debug, Clone)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

pub fn apply_damage(
    mut hit_events: EventReader<HitRequest>,
    mut damage_dealt_events: EventWriter<DamageDealt>,
    mut entity_died_events: EventWriter<EntityDied>,
    mut targets: Query<&mut Health, Without<Dead>>,
) {
    for hit in hit_events.read() {
        let Ok(mut health) = targets.get_mut(hit.target) else {
            crate::log(&format!("⚠️ HitRequest: target {:?} has no Health (or already dead)", hit.target));
            continue;
        };

        let was_alive = health.is_alive();
        health.take_damage(hit.damage);
        let died = was_alive && !health.is_alive();

        damage_dealt_events.write(DamageDealt {
            attacker: hit.attacker,
            target: hit.target,
            damage: hit.damage,
            target_died: died,
        });

        if died {
            entity_died_events.write(EntityDied {
                entity: hit.target,
                killer: Some(hit.attacker),
            });
            crate::log_info(&format!("💀 Entity {:?} killed by {:?}", hit.target, hit.attacker));
        }
    }
}

/// Остановка мертвых + despawn трупа через scheduler
pub fn handle_deaths(
    mut commands: Commands,
    mut death_events: EventReader<EntityDied>,
    mut bodies: Query<(Option<&mut Locomotion>, Option<&mut CombatState>, Option<&Destructible>, Has<Player>)>,
    mut scheduler: ResMut<Scheduler>,
) {
    for event in death_events.read() {
        if let Ok((locomotion, combat, destructible, is_player)) = bodies.get_mut(event.entity) {
            if let Some(mut locomotion) = locomotion {
                locomotion.stop();
                locomotion.target_entity = None;
            }
            if let Some(mut combat) = combat {
                combat.stop_attack();
            }
            // Игрока не убираем: respawn делает внешний слой
            if let (Some(destructible), false) = (destructible, is_player) {
                scheduler.schedule_in(destructible.corpse_duration, ScheduledAction::Despawn(event.entity));
            }
        }

        if let Ok(mut entity_commands) = commands.get_entity(event.entity) {
            entity_commands.insert(Dead);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn damage_app() -> App {
        let mut app = App::new();
        app.add_event::<HitRequest>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .add_systems(Update, apply_damage);
        app
    }

    #[test]
    fn test_hit_request_reduces_health() {
        let mut app = damage_app();
        let attacker = app.world_mut().spawn_empty().id();
        let target = app.world_mut().spawn(Health::new(30)).id();

        app.world_mut().send_event(HitRequest { attacker, target, damage: 10 });
        app.update();

        assert_eq!(app.world().get::<Health>(target).map(|h| h.current), Some(20));
        let dealt: Vec<_> = app.world_mut().resource_mut::<Events<DamageDealt>>().drain().collect();
        assert_eq!(dealt.len(), 1);
        assert!(!dealt[0].target_died);
    }

    #[test]
    fn test_lethal_hit_emits_single_death() {
        let mut app = damage_app();
        let attacker = app.world_mut().spawn_empty().id();
        let target = app.world_mut().spawn(Health::new(10)).id();

        app.world_mut().send_event(HitRequest { attacker, target, damage: 15 });
        app.world_mut().send_event(HitRequest { attacker, target, damage: 15 });
        app.update();

        let died: Vec<_> = app.world_mut().resource_mut::<Events<EntityDied>>().drain().collect();
        assert_eq!(died.len(), 1);
        assert_eq!(died[0].entity, target);
        assert_eq!(died[0].killer, Some(attacker));
    }
}
