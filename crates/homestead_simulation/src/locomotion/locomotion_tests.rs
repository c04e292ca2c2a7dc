//! Tests для Locomotion state (stop, stuck detection, escape)

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::super::components::{Locomotion, LocomotionConfig, STUCK_TIME};

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_stop_is_idempotent() {
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(5.0, 0.0, 0.0));
        loco.velocity = Vec3::new(3.0, 0.0, 0.0);

        loco.stop();
        let once = loco.clone();
        loco.stop();

        assert_eq!(loco, once);
        assert_eq!(loco.velocity, Vec3::ZERO);
        assert!(!loco.is_moving);
    }

    #[test]
    fn test_stuck_timer_grows_while_blocked() {
        let cfg = LocomotionConfig::default();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(5.0, 0.0, 0.0));

        let mut previous = loco.stuck_timer;
        let mut became_stuck_at = None;
        for tick in 1..=60 {
            loco.record_displacement(&cfg, Vec3::ZERO, DT);
            assert!(loco.stuck_timer > previous, "tick {}", tick);
            previous = loco.stuck_timer;

            // is_stuck ровно когда stuck_timer > 0.5
            assert_eq!(loco.is_stuck, loco.stuck_timer > STUCK_TIME);
            if loco.is_stuck && became_stuck_at.is_none() {
                became_stuck_at = Some(tick);
            }
        }
        // 0.5s при 60Hz: 31-й тик первый строго больше
        let tick = became_stuck_at.expect("blocked entity must become stuck");
        assert!((30..=32).contains(&tick), "stuck at tick {}", tick);
    }

    #[test]
    fn test_moving_freely_is_never_stuck() {
        let cfg = LocomotionConfig::default();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(50.0, 0.0, 0.0));

        let step = Vec3::X * cfg.move_speed * DT;
        for _ in 0..120 {
            loco.record_displacement(&cfg, step, DT);
        }
        assert!(!loco.is_stuck);
    }

    #[test]
    fn test_stuck_timer_decays_when_free() {
        let cfg = LocomotionConfig::default();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(5.0, 0.0, 0.0));
        loco.stuck_timer = 0.3;
        loco.move_average = Vec3::X;

        loco.record_displacement(&cfg, Vec3::X, DT);
        assert!(loco.stuck_timer < 0.3);

        loco.stuck_timer = 0.0;
        loco.record_displacement(&cfg, Vec3::X, DT);
        assert_eq!(loco.stuck_timer, 0.0);
    }

    #[test]
    fn test_idle_entity_is_not_stuck() {
        let cfg = LocomotionConfig::default();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        for _ in 0..120 {
            loco.record_displacement(&cfg, Vec3::ZERO, DT);
        }
        assert!(!loco.is_stuck);
        assert_eq!(loco.stuck_timer, 0.0);
    }

    #[test]
    fn test_escape_runs_directly_away() {
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.escape_from(Vec3::ZERO, Vec3::new(0.0, 0.0, 3.0), 10.0);
        assert!(loco.escaping);
        assert!(loco.is_moving);
        assert!((loco.move_target - Vec3::new(0.0, 0.0, -10.0)).length() < 1e-4);
    }

    #[test]
    fn test_direct_move_clamps_input() {
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.direct(Vec3::new(3.0, 5.0, 4.0));
        assert!(loco.direct_move);
        assert!((loco.direct_input.length() - 1.0).abs() < 1e-5);
        assert_eq!(loco.direct_input.y, 0.0);

        loco.direct(Vec3::ZERO);
        assert!(!loco.is_moving);
    }
}
