//! Снаряды дальних атак
//!
//! Летят по прямой, попадание проверяется по snapshot'у актеров в конце шага.

use bevy::prelude::*;

use super::cycle::ProjectileStats;
use super::damage::HitRequest;
use crate::registry::WorldSnapshot;
use crate::steering::math::flat_distance;

/// Hit radius цели без Destructible (игрок)
pub const DEFAULT_BODY_RADIUS: f32 = 0.5;
/// Высота тела актора для вертикальной проверки
pub const BODY_HEIGHT: f32 = 2.0;

#[derive(Component, Debug, Clone)]
pub struct Projectile {
    pub shooter: Entity,
    pub damage: u32,
    pub velocity: Vec3,
    pub lifetime: f32,
    pub radius: f32,
}

pub fn spawn_projectile(
    commands: &mut Commands,
    shooter: Entity,
    origin: Vec3,
    aim: Vec3,
    damage: u32,
    stats: &ProjectileStats,
) -> Entity {
    let direction = (aim - origin).normalize_or(Vec3::NEG_Z);
    commands
        .spawn((
            Transform::from_translation(origin),
            Projectile {
                shooter,
                damage,
                velocity: direction * stats.speed,
                lifetime: stats.lifetime,
                radius: stats.radius,
            },
        ))
        .id()
}

pub fn move_projectiles(
    mut commands: Commands,
    mut projectiles: Query<(Entity, &mut Transform, &mut Projectile)>,
    snapshot: Res<WorldSnapshot>,
    mut hits: EventWriter<HitRequest>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.delta_secs();

    for (entity, mut transform, mut projectile) in projectiles.iter_mut() {
        transform.translation += projectile.velocity * dt;
        projectile.lifetime -= dt;
        let position = transform.translation;

        let victim = snapshot.actors.iter().find(|actor| {
            actor.entity != projectile.shooter
                && actor.alive
                && actor.collidable
                && position.y >= actor.position.y - DEFAULT_BODY_RADIUS
                && position.y <= actor.position.y + BODY_HEIGHT
                && flat_distance(position, actor.position)
                    <= projectile.radius + actor.hit_range.unwrap_or(DEFAULT_BODY_RADIUS)
        });

        if let Some(victim) = victim {
            hits.write(HitRequest {
                attacker: projectile.shooter,
                target: victim.entity,
                damage: projectile.damage,
            });
            commands.entity(entity).despawn();
        } else if projectile.lifetime <= 0.0 {
            commands.entity(entity).despawn();
        }
    }
}
