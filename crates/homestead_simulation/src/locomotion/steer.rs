//! Velocity step: target seek → avoidance → slope gating → gravity → smoothing
//!
//! Чистые функции без App, physics приходит готовым `GroundSense`.

use bevy::prelude::*;

use super::components::{Locomotion, LocomotionConfig};
use crate::steering::math::{flat, flat_distance, rotate_towards, rotate_y, yaw_rotation};
use crate::steering::SteeringQuery;

/// Лучи к земле стартуют на этой высоте над ногами
pub const GROUND_PROBE_HEIGHT: f32 = 0.5;
/// Ближе этого к цели avoidance не отклоняет курс
pub const AVOID_MIN_DISTANCE: f32 = 1.0;
/// Коэффициент сглаживания velocity (1/s)
pub const VELOCITY_SMOOTHING: f32 = 10.0;
/// dot(forward, normal) ниже этого = подъём
pub const CLIMB_DOT: f32 = -0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSense {
    pub grounded: bool,
    pub normal: Vec3,
    pub height: Option<f32>,
}

impl GroundSense {
    pub fn airborne() -> Self {
        Self {
            grounded: false,
            normal: Vec3::Y,
            height: None,
        }
    }

    pub fn flat(height: f32) -> Self {
        Self {
            grounded: true,
            normal: Vec3::Y,
            height: Some(height),
        }
    }
}

/// Луч вниз по ground+floor слоям. `drop` = насколько упали за этот шаг
/// (луч стартует от прежней высоты, чтобы не проскочить землю).
pub fn sense_ground(query: &dyn SteeringQuery, config: &LocomotionConfig, position: Vec3, drop: f32) -> GroundSense {
    let mask = config.ground_layer.union(config.floor_layer);
    let lift = GROUND_PROBE_HEIGHT + drop.max(0.0);
    let origin = position + Vec3::Y * lift;

    match query.raycast_layer(origin, Vec3::NEG_Y, lift + config.ground_detect_dist, mask) {
        Some(hit) => GroundSense {
            grounded: true,
            normal: hit.normal,
            height: Some(hit.point.y),
        },
        None => GroundSense::airborne(),
    }
}

/// Один тик steering. Обновляет state и возвращает новую velocity.
pub fn steer(
    loco: &mut Locomotion,
    config: &LocomotionConfig,
    position: Vec3,
    ground: &GroundSense,
    dt: f32,
) -> Vec3 {
    loco.grounded = ground.grounded;
    loco.ground_normal = ground.normal;

    if loco.is_moving && !loco.direct_move && loco.is_within_reach(position, config) {
        loco.is_moving = false;
        loco.reached = true;
        loco.follow_path = false;
    }

    let speed = loco.speed(config);
    let mut desired = Vec3::ZERO;

    if loco.is_moving {
        if loco.direct_move {
            desired = loco.direct_input * speed;
        } else {
            let remaining = flat_distance(position, loco.move_target);

            if !loco.follow_path {
                loco.avoid_target = loco.move_target;
                if config.avoid_obstacles && !config.use_navmesh && remaining > AVOID_MIN_DISTANCE {
                    let to_target = loco.move_target - position;
                    loco.avoid_target = position + rotate_y(to_target, loco.avoid_angle);
                }
            }

            let heading = flat(loco.avoid_target - position).normalize_or_zero();
            desired = heading * remaining.min(1.0) * speed;
        }
    }

    // Slope gating
    if ground.grounded && flat(desired).length_squared() > 0.0 {
        let climbing = loco.facing.dot(ground.normal) < CLIMB_DOT;
        let slope = ground.normal.angle_between(Vec3::Y).to_degrees();
        if climbing && slope > config.slope_angle_max {
            desired.x = 0.0;
            desired.z = 0.0;
        }
    }

    if loco.is_flying(config) {
        if loco.is_moving && !loco.direct_move {
            desired.y = (loco.move_target.y - position.y).clamp(-1.0, 1.0) * speed;
        }
    } else if !ground.grounded {
        desired.y -= config.fall_speed;
    } else {
        if loco.velocity.y < 0.0 {
            loco.velocity.y = 0.0;
        }
        desired -= ground.normal * desired.dot(ground.normal);
    }

    loco.velocity = loco.velocity.lerp(desired, (VELOCITY_SMOOTHING * dt).min(1.0));

    if loco.is_moving {
        let horizontal = flat(loco.velocity);
        if horizontal.length_squared() > 1e-4 {
            loco.facing = horizontal.normalize();
        }
    }

    loco.velocity
}

/// Поворот к facing с ограничением rotate_speed (°/s)
pub fn turn(rotation: Quat, facing: Vec3, rotate_speed: f32, dt: f32) -> Quat {
    rotate_towards(rotation, yaw_rotation(facing), rotate_speed.to_radians() * dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn config() -> LocomotionConfig {
        LocomotionConfig {
            avoid_obstacles: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_seek_accelerates_toward_target() {
        let cfg = config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(10.0, 0.0, 0.0));

        let mut velocity = Vec3::ZERO;
        for _ in 0..60 {
            velocity = steer(&mut loco, &cfg, Vec3::ZERO, &GroundSense::flat(0.0), DT);
        }
        assert!(velocity.x > cfg.move_speed * 0.95, "velocity {:?}", velocity);
        assert!(velocity.z.abs() < 1e-3);
        assert!((loco.facing - Vec3::X).length() < 1e-3);
    }

    #[test]
    fn test_velocity_is_smoothed_not_snapped() {
        let cfg = config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(10.0, 0.0, 0.0));

        let first = steer(&mut loco, &cfg, Vec3::ZERO, &GroundSense::flat(0.0), DT);
        let expected = cfg.move_speed * VELOCITY_SMOOTHING * DT;
        assert!((first.x - expected).abs() < 1e-4);
    }

    #[test]
    fn test_speed_capped_by_remaining_distance() {
        let cfg = config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(0.5, 0.0, 0.0));
        // dt = 0.1 → lerp t = 1, desired сразу
        let velocity = steer(&mut loco, &cfg, Vec3::ZERO, &GroundSense::flat(0.0), 0.1);
        assert!((velocity.x - 0.5 * cfg.move_speed).abs() < 1e-4);
    }

    #[test]
    fn test_arrival_within_tolerance() {
        let cfg = config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(0.25, 0.0, 0.0));
        steer(&mut loco, &cfg, Vec3::ZERO, &GroundSense::flat(0.0), DT);
        assert!(!loco.is_moving);
        assert!(loco.has_reached_target());

        // Явная tolerance
        loco.move_to_within(Vec3::new(2.0, 0.0, 0.0), Some(2.5));
        steer(&mut loco, &cfg, Vec3::ZERO, &GroundSense::flat(0.0), DT);
        assert!(loco.has_reached_target());
    }

    #[test]
    fn test_steep_climb_is_blocked() {
        let cfg = config();
        // Склон 60°, поднимается в сторону -X
        let normal = Vec3::new(60f32.to_radians().sin(), 60f32.to_radians().cos(), 0.0);
        let ground = GroundSense { grounded: true, normal, height: Some(0.0) };

        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_X);
        loco.move_to(Vec3::new(-10.0, 0.0, 0.0));
        let velocity = steer(&mut loco, &cfg, Vec3::ZERO, &ground, 0.1);
        assert!(flat(velocity).length() < 1e-4, "velocity {:?}", velocity);

        // Вниз по тому же склону можно
        let mut down = Locomotion::new(Vec3::ZERO, Vec3::X);
        down.move_to(Vec3::new(10.0, 0.0, 0.0));
        let velocity = steer(&mut down, &cfg, Vec3::ZERO, &ground, 0.1);
        assert!(flat(velocity).length() > 0.1);
    }

    #[test]
    fn test_airborne_falls_and_flyer_does_not() {
        let cfg = config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        let velocity = steer(&mut loco, &cfg, Vec3::Y * 5.0, &GroundSense::airborne(), 0.1);
        assert!((velocity.y + cfg.fall_speed).abs() < 1e-4);

        let mut bird = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        bird.flying = true;
        let velocity = steer(&mut bird, &cfg, Vec3::Y * 5.0, &GroundSense::airborne(), 0.1);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn test_grounded_clears_downward_velocity() {
        let cfg = config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.velocity = Vec3::new(0.0, -5.0, 0.0);
        let velocity = steer(&mut loco, &cfg, Vec3::ZERO, &GroundSense::flat(0.0), DT);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn test_avoid_angle_rotates_heading() {
        let cfg = LocomotionConfig::default();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.avoid_angle = 90.0;
        loco.move_to(Vec3::new(0.0, 0.0, -10.0));
        let velocity = steer(&mut loco, &cfg, Vec3::ZERO, &GroundSense::flat(0.0), 0.1);

        // -Z повернули на +90° вокруг Y → -X
        let heading = flat(velocity).normalize();
        assert!((heading - Vec3::NEG_X).length() < 1e-3, "heading {:?}", heading);
        assert!((loco.avoid_target - Vec3::new(-10.0, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_no_avoidance_near_target() {
        let cfg = LocomotionConfig::default();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.avoid_angle = 90.0;
        loco.move_to(Vec3::new(0.0, 0.0, -0.8));
        steer(&mut loco, &cfg, Vec3::ZERO, &GroundSense::flat(0.0), 0.1);
        assert_eq!(loco.avoid_target, loco.move_target);
    }

    #[test]
    fn test_turn_is_capped_by_rotate_speed() {
        let start = yaw_rotation(Vec3::NEG_Z);
        let rotated = turn(start, Vec3::X, 90.0, 0.5);
        assert!((start.angle_between(rotated).to_degrees() - 45.0).abs() < 0.01);
    }
}
