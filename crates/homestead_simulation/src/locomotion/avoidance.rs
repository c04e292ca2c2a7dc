//! Obstacle avoidance bias (вызывается реже, чем steering)
//!
//! Три луча вперёд (центр, ±probe_angle). avoid_side выбирает свободную
//! сторону, avoid_angle плавно тянется к ±max_deflection или обратно к 0.

use bevy::prelude::*;

use super::components::{AvoidanceTuning, Locomotion};
use crate::steering::math::{move_towards, rotate_y};

/// Дистанции до препятствий по трём лучам (`None` = чисто)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeHits {
    pub center: Option<f32>,
    pub positive: Option<f32>,
    pub negative: Option<f32>,
}

impl ProbeHits {
    pub fn is_clear(&self) -> bool {
        self.center.is_none() && self.positive.is_none() && self.negative.is_none()
    }

    pub fn nearest(&self) -> Option<f32> {
        [self.center, self.positive, self.negative]
            .into_iter()
            .flatten()
            .reduce(f32::min)
    }
}

/// [center, +angle, -angle]
pub fn probe_directions(facing: Vec3, probe_angle: f32) -> [Vec3; 3] {
    [facing, rotate_y(facing, probe_angle), rotate_y(facing, -probe_angle)]
}

fn bearing_side(bearing: f32) -> f32 {
    if bearing < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Какую сторону выбрать (-1/0/1)
fn choose_side(loco: &Locomotion, hits: &ProbeHits, target_bearing: Option<f32>) -> f32 {
    if hits.is_clear() {
        return 0.0;
    }

    match (hits.positive.is_some(), hits.negative.is_some()) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        // Заблокирован только центр: держим прежнюю сторону, иначе к цели
        (false, false) => {
            if loco.avoid_side != 0.0 {
                loco.avoid_side
            } else {
                match target_bearing {
                    Some(bearing) if loco.escaping => -bearing_side(bearing),
                    Some(bearing) => bearing_side(bearing),
                    None => 1.0,
                }
            }
        }
        // Обе стороны заняты: от цели (при бегстве к её стороне)
        (true, true) => match target_bearing {
            Some(bearing) if loco.escaping => bearing_side(bearing),
            Some(bearing) => -bearing_side(bearing),
            None if loco.avoid_side != 0.0 => loco.avoid_side,
            None => 1.0,
        },
    }
}

/// `target_bearing`: signed угол (°) от facing к текущей цели
pub fn update_avoidance(
    loco: &mut Locomotion,
    tuning: &AvoidanceTuning,
    hits: &ProbeHits,
    target_bearing: Option<f32>,
    dt: f32,
) {
    let side = choose_side(loco, hits, target_bearing);
    loco.avoid_side = side;

    let closeness = match hits.nearest() {
        Some(distance) if tuning.probe_distance > 0.0 => (distance / tuning.probe_distance).clamp(0.0, 1.0),
        _ => 1.0,
    };
    let rate = tuning.near_rate + (tuning.far_rate - tuning.near_rate) * closeness;
    loco.avoid_angle = move_towards(loco.avoid_angle, tuning.max_deflection * side, rate * dt);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> AvoidanceTuning {
        AvoidanceTuning::default()
    }

    #[test]
    fn test_clear_path_relaxes_to_zero() {
        let mut loco = Locomotion::default();
        loco.avoid_angle = 30.0;
        update_avoidance(&mut loco, &tuning(), &ProbeHits::default(), None, 0.1);
        // Чисто → far rate 50°/s
        assert!((loco.avoid_angle - 25.0).abs() < 1e-4);
        assert_eq!(loco.avoid_side, 0.0);
    }

    #[test]
    fn test_blocked_side_steers_to_other_side() {
        let mut loco = Locomotion::default();
        let hits = ProbeHits { positive: Some(1.0), ..Default::default() };
        update_avoidance(&mut loco, &tuning(), &hits, None, 0.1);
        assert_eq!(loco.avoid_side, -1.0);
        assert!(loco.avoid_angle < 0.0);

        let mut loco = Locomotion::default();
        let hits = ProbeHits { negative: Some(1.0), ..Default::default() };
        update_avoidance(&mut loco, &tuning(), &hits, None, 0.1);
        assert_eq!(loco.avoid_side, 1.0);
        assert!(loco.avoid_angle > 0.0);
    }

    #[test]
    fn test_near_obstacle_turns_faster() {
        let mut near = Locomotion::default();
        let mut far = Locomotion::default();
        update_avoidance(&mut near, &tuning(), &ProbeHits { negative: Some(0.0), ..Default::default() }, None, 0.1);
        update_avoidance(&mut far, &tuning(), &ProbeHits { negative: Some(2.0), ..Default::default() }, None, 0.1);
        assert!((near.avoid_angle - 20.0).abs() < 1e-4);
        assert!((far.avoid_angle - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_both_sides_blocked_biases_away_from_target() {
        let hits = ProbeHits { center: Some(1.0), positive: Some(1.0), negative: Some(1.0) };

        let mut hunter = Locomotion::default();
        update_avoidance(&mut hunter, &tuning(), &hits, Some(30.0), 0.1);
        assert_eq!(hunter.avoid_side, -1.0);

        let mut runner = Locomotion::default();
        runner.escaping = true;
        update_avoidance(&mut runner, &tuning(), &hits, Some(30.0), 0.1);
        assert_eq!(runner.avoid_side, 1.0);
    }

    #[test]
    fn test_deflection_is_capped() {
        let mut loco = Locomotion::default();
        let hits = ProbeHits { negative: Some(0.0), ..Default::default() };
        for _ in 0..100 {
            update_avoidance(&mut loco, &tuning(), &hits, None, 0.1);
        }
        assert_eq!(loco.avoid_angle, 90.0);
    }

    #[test]
    fn test_probe_directions() {
        let [center, positive, negative] = probe_directions(Vec3::NEG_Z, 45.0);
        assert_eq!(center, Vec3::NEG_Z);
        assert!((positive - Vec3::new(-1.0, 0.0, -1.0).normalize()).length() < 1e-4);
        assert!((negative - Vec3::new(1.0, 0.0, -1.0).normalize()).length() < 1e-4);
    }
}
