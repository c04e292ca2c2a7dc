//! Locomotion systems (FixedUpdate, SimSet::Locomotion)

use bevy::prelude::*;

use super::avoidance::{probe_directions, update_avoidance, ProbeHits};
use super::components::{DirectMove, Locomotion, LocomotionConfig};
use super::navigation::{apply_path_result, update_navigation};
use super::steer::{sense_ground, steer, turn};
use crate::combat::Dead;
use crate::components::Colliders;
use crate::registry::WorldSnapshot;
use crate::steering::math::{flat, signed_angle_y};
use crate::steering::query::BODY_PROBE_HEIGHT;
use crate::steering::{LayerMask, NavMesh, PathRequests, PhysicsWorld};

/// Ручной ввод → direct move (каждый тик)
pub fn apply_direct_move_input(mut movers: Query<(&DirectMove, &mut Locomotion), Without<Dead>>) {
    for (input, mut loco) in movers.iter_mut() {
        loco.direct(input.input);
    }
}

pub fn update_path_following(
    mut movers: Query<(Entity, &Transform, &LocomotionConfig, &mut Locomotion), Without<Dead>>,
    mut requests: ResMut<PathRequests>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.delta_secs();
    for (entity, transform, config, mut loco) in movers.iter_mut() {
        if let Some(request) = update_navigation(&mut loco, config, entity, transform.translation, dt) {
            requests.push(request);
        }
    }
}

/// Лучи вперёд раз в `refresh_interval`, bias avoid_angle
pub fn update_obstacle_avoidance(
    mut movers: Query<(&Transform, &LocomotionConfig, &mut Locomotion), Without<Dead>>,
    physics: Res<PhysicsWorld>,
    snapshot: Res<WorldSnapshot>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.delta_secs();
    let query = physics.query();

    for (transform, config, mut loco) in movers.iter_mut() {
        if !config.avoid_obstacles || config.use_navmesh || loco.direct_move {
            continue;
        }

        loco.avoid_timer += dt;
        if loco.avoid_timer < config.avoidance.refresh_interval {
            continue;
        }
        let elapsed = std::mem::take(&mut loco.avoid_timer);

        let position = transform.translation;
        let origin = position + Vec3::Y * BODY_PROBE_HEIGHT;
        let exclude = loco.target_entity;
        let probe = |direction: Vec3| {
            query
                .raycast_excluding(origin, direction, config.avoidance.probe_distance, config.obstacle_layer, exclude)
                .map(|hit| hit.distance)
        };

        let [center, positive, negative] = probe_directions(loco.facing, config.avoidance.probe_angle);
        let hits = ProbeHits {
            center: probe(center),
            positive: probe(positive),
            negative: probe(negative),
        };

        let bearing = exclude
            .and_then(|target| snapshot.position_of(target))
            .map(|target| signed_angle_y(loco.facing, flat(target - position)));

        update_avoidance(&mut loco, &config.avoidance, &hits, bearing, elapsed);
    }
}

/// Steering → move_body → ground snap → stuck → rotation
pub fn integrate_locomotion(
    mut movers: Query<(&LocomotionConfig, &mut Locomotion, &mut Transform, Option<&Colliders>), Without<Dead>>,
    physics: Res<PhysicsWorld>,
    time: Res<Time<Fixed>>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    let query = physics.query();

    for (config, mut loco, mut transform, colliders) in movers.iter_mut() {
        let position = transform.translation;
        let ground = sense_ground(query, config, position, 0.0);
        let velocity = steer(&mut loco, config, position, &ground, dt);

        let solid = colliders.is_none_or(|c| c.enabled);
        let mask = if solid { config.obstacle_layer } else { LayerMask::NONE };
        let mut next = query.move_body(position, velocity * dt, config.body_radius, mask);

        if !loco.is_flying(config) {
            let after = sense_ground(query, config, next, position.y - next.y);
            if let Some(height) = after.height {
                if velocity.y <= 0.0 || next.y < height {
                    next.y = height;
                }
            }
            loco.grounded = after.grounded;
        }

        transform.translation = next;
        loco.record_displacement(config, next - position, dt);
        transform.rotation = turn(transform.rotation, loco.facing, config.rotate_speed, dt);
    }
}

/// Ответы navmesh в конце тика (видны владельцу со следующего тика)
pub fn resolve_path_requests(
    mut requests: ResMut<PathRequests>,
    navmesh: Res<NavMesh>,
    mut movers: Query<&mut Locomotion>,
) {
    for request in requests.drain() {
        let result = navmesh.0.calculate_path(request.from, request.to, request.area_mask);
        if result.is_none() {
            crate::log(&format!("🧭 No route for {:?} → {:?}", request.entity, request.to));
        }
        if let Ok(mut loco) = movers.get_mut(request.entity) {
            apply_path_result(&mut loco, result);
        }
    }
}
