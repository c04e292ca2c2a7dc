//! Combat cycle system: tick → locomotion motion + attack/hit events

use bevy::prelude::*;

use super::cycle::{CombatMotion, CombatSignal, CombatState, CombatStats};
use super::damage::{AttackStarted, Dead, HitRequest};
use super::projectile::spawn_projectile;
use crate::locomotion::Locomotion;
use crate::registry::WorldSnapshot;

/// Откуда вылетает снаряд (над ногами стрелка)
const MUZZLE_HEIGHT: f32 = 1.0;

/// Применяет решение цикла к locomotion
pub fn apply_combat_motion(loco: &mut Locomotion, motion: CombatMotion, position: Vec3, target: Option<Entity>) {
    match motion {
        CombatMotion::Seek { target: point, reach } => {
            loco.target_entity = target;
            loco.retarget(point, Some(reach));
        }
        CombatMotion::Hold { face } => {
            if loco.is_moving {
                loco.stop();
            }
            loco.face_toward(position, face);
        }
        CombatMotion::Stop => {
            loco.stop();
            loco.target_entity = None;
        }
    }
}

pub fn tick_combat_cycles(
    mut commands: Commands,
    mut fighters: Query<
        (Entity, &Transform, &CombatStats, &mut CombatState, Option<&mut Locomotion>),
        Without<Dead>,
    >,
    snapshot: Res<WorldSnapshot>,
    time: Res<Time<Fixed>>,
    mut started_events: EventWriter<AttackStarted>,
    mut hit_events: EventWriter<HitRequest>,
) {
    let dt = time.delta_secs();

    for (entity, transform, stats, mut state, locomotion) in fighters.iter_mut() {
        let target = state.target.entity();
        let view = target.and_then(|target| snapshot.target_view(target));
        let position = transform.translation;

        let tick = state.tick(stats, position, view, dt);

        if let (Some(mut loco), Some(motion)) = (locomotion, tick.motion) {
            apply_combat_motion(&mut loco, motion, position, target);
        }

        for signal in tick.signals {
            match signal {
                CombatSignal::AttackStarted => {
                    started_events.write(AttackStarted { attacker: entity, target });
                }
                CombatSignal::Hit { aim } => match (&stats.projectile, target) {
                    (Some(projectile), _) => {
                        spawn_projectile(
                            &mut commands,
                            entity,
                            position + Vec3::Y * MUZZLE_HEIGHT,
                            aim,
                            stats.attack_damage,
                            projectile,
                        );
                    }
                    (None, Some(target)) => {
                        hit_events.write(HitRequest {
                            attacker: entity,
                            target,
                            damage: stats.attack_damage,
                        });
                    }
                    (None, None) => {}
                },
                CombatSignal::TargetLost => {
                    crate::log(&format!("⚔️ {:?}: attack target lost", entity));
                }
            }
        }
    }
}
