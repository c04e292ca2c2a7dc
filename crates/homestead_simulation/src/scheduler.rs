//! Отложенные действия (kill через N секунд, despawn трупа, конец копания)
//!
//! Записи = (время пробуждения, действие). Обрабатываются в начале тика
//! в порядке пробуждения; одинаковое время → порядок постановки.

use bevy::prelude::*;

use crate::ai::events::ItemDug;
use crate::combat::{Dead, EntityDied};
use crate::components::{DigSpot, Health};

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledAction {
    Kill(Entity),
    Despawn(Entity),
    FinishDig { digger: Entity, spot: Entity },
}

#[derive(Debug, Clone, PartialEq)]
struct ScheduledEntry {
    wake_at: f64,
    sequence: u64,
    action: ScheduledAction,
}

#[derive(Resource, Debug, Default)]
pub struct Scheduler {
    now: f64,
    next_sequence: u64,
    entries: Vec<ScheduledEntry>,
}

impl Scheduler {
    pub fn schedule_in(&mut self, delay: f32, action: ScheduledAction) {
        let entry = ScheduledEntry {
            wake_at: self.now + delay.max(0.0) as f64,
            sequence: self.next_sequence,
            action,
        };
        self.next_sequence += 1;
        self.entries.push(entry);
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    pub fn is_scheduled(&self, action: &ScheduledAction) -> bool {
        self.entries.iter().any(|entry| &entry.action == action)
    }

    /// Сдвигает время и забирает всё, что проснулось
    pub fn advance(&mut self, dt: f32) -> Vec<ScheduledAction> {
        self.now += dt as f64;
        let now = self.now;

        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.entries).into_iter().partition(|entry| entry.wake_at <= now);
        self.entries = pending;

        due.sort_by(|a, b| a.wake_at.total_cmp(&b.wake_at).then(a.sequence.cmp(&b.sequence)));
        due.into_iter().map(|entry| entry.action).collect()
    }
}

pub fn run_scheduled_actions(
    mut commands: Commands,
    mut scheduler: ResMut<Scheduler>,
    time: Res<Time<Fixed>>,
    mut healths: Query<&mut Health, Without<Dead>>,
    spots: Query<&DigSpot>,
    mut died_events: EventWriter<EntityDied>,
    mut dug_events: EventWriter<ItemDug>,
) {
    for action in scheduler.advance(time.delta_secs()) {
        match action {
            ScheduledAction::Kill(entity) => {
                if let Ok(mut health) = healths.get_mut(entity) {
                    if health.is_alive() {
                        health.current = 0;
                        died_events.write(EntityDied { entity, killer: None });
                    }
                }
            }
            ScheduledAction::Despawn(entity) => {
                if let Ok(mut entity_commands) = commands.get_entity(entity) {
                    entity_commands.despawn();
                }
            }
            ScheduledAction::FinishDig { digger, spot } => {
                // Место могли уже раскопать
                let Ok(dig_spot) = spots.get(spot) else {
                    continue;
                };
                dug_events.write(ItemDug {
                    digger,
                    spot,
                    item_id: dig_spot.item_id.clone(),
                });
                commands.entity(spot).despawn();
                crate::log_info(&format!("🦴 {:?} dug up {}", digger, dig_spot.item_id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_wake_in_time_order() {
        let mut scheduler = Scheduler::default();
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        scheduler.schedule_in(1.0, ScheduledAction::Despawn(a));
        scheduler.schedule_in(0.5, ScheduledAction::Kill(b));

        assert!(scheduler.advance(0.4).is_empty());
        assert_eq!(scheduler.advance(0.2), vec![ScheduledAction::Kill(b)]);
        assert_eq!(scheduler.advance(0.5), vec![ScheduledAction::Despawn(a)]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_same_wake_time_keeps_insertion_order() {
        let mut scheduler = Scheduler::default();
        for i in 0..3 {
            scheduler.schedule_in(1.0, ScheduledAction::Despawn(Entity::from_raw(i)));
        }
        let due = scheduler.advance(1.0);
        assert_eq!(
            due,
            (0..3).map(|i| ScheduledAction::Despawn(Entity::from_raw(i))).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_delay_is_relative_to_current_time() {
        let mut scheduler = Scheduler::default();
        scheduler.advance(10.0);
        scheduler.schedule_in(2.0, ScheduledAction::Kill(Entity::from_raw(5)));
        assert!(scheduler.advance(1.9).is_empty());
        assert_eq!(scheduler.advance(0.2).len(), 1);
    }
}
