//! Navmesh path following: перезапрос пути + продвижение по waypoints
//!
//! Паттерн: запрос ставится в очередь, результат применяется в конце тика.
//! Пока ответ не пришёл, едем по старому пути (или без пути).

use bevy::prelude::*;

use super::components::{Locomotion, LocomotionConfig, PATH_REFRESH_INTERVAL};
use crate::steering::math::{flat, flat_distance};
use crate::steering::PathRequest;

/// cos(~45.6°): расхождение направления на цель и на конец пути
pub const PATH_DIVERGENCE_DOT: f32 = 0.7;

fn path_diverged(loco: &Locomotion, position: Vec3) -> bool {
    let Some(end) = loco.path.last() else {
        return false;
    };
    let to_target = flat(loco.move_target - position).normalize_or_zero();
    let to_end = flat(*end - position).normalize_or_zero();
    if to_target == Vec3::ZERO || to_end == Vec3::ZERO {
        return false;
    }
    to_target.dot(to_end) < PATH_DIVERGENCE_DOT
}

/// Продвигает waypoint и решает, нужен ли новый путь
pub fn update_navigation(
    loco: &mut Locomotion,
    config: &LocomotionConfig,
    entity: Entity,
    position: Vec3,
    dt: f32,
) -> Option<PathRequest> {
    loco.path_timer += dt;

    if !config.use_navmesh || loco.direct_move || !loco.is_moving {
        return None;
    }

    if loco.follow_path {
        let waypoint_reach = 2.0 * config.moving_threshold;
        while loco.path_index < loco.path.len()
            && flat_distance(position, loco.path[loco.path_index]) < waypoint_reach
        {
            loco.path_index += 1;
        }

        match loco.path.get(loco.path_index) {
            Some(waypoint) => loco.avoid_target = *waypoint,
            None => {
                loco.follow_path = false;
                loco.avoid_target = loco.move_target;
            }
        }
    }

    let refresh = loco.path_timer >= PATH_REFRESH_INTERVAL || path_diverged(loco, position);
    if !refresh || loco.path_pending {
        return None;
    }

    loco.path_pending = true;
    loco.path_timer = 0.0;
    Some(PathRequest {
        entity,
        from: position,
        to: loco.move_target,
        area_mask: config.nav_area_mask,
    })
}

/// Ответ navmesh service. `None` (маршрута нет) → прямой steering.
pub fn apply_path_result(loco: &mut Locomotion, result: Option<Vec<Vec3>>) {
    loco.path_pending = false;

    if !loco.is_moving || loco.direct_move {
        return;
    }

    match result {
        Some(path) if !path.is_empty() => {
            loco.path = path;
            loco.path_index = 0;
            loco.follow_path = true;
        }
        _ => {
            loco.path.clear();
            loco.path_index = 0;
            loco.follow_path = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn navmesh_config() -> LocomotionConfig {
        LocomotionConfig {
            use_navmesh: true,
            ..Default::default()
        }
    }

    fn entity() -> Entity {
        Entity::from_raw(1)
    }

    #[test]
    fn test_new_move_requests_path_immediately() {
        let cfg = navmesh_config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(10.0, 0.0, 0.0));

        let request = update_navigation(&mut loco, &cfg, entity(), Vec3::ZERO, 1.0 / 60.0)
            .expect("first request");
        assert_eq!(request.to, Vec3::new(10.0, 0.0, 0.0));
        assert!(loco.path_pending);

        // Пока ответа нет, повторно не спрашиваем
        assert!(update_navigation(&mut loco, &cfg, entity(), Vec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn test_no_requests_without_navmesh_or_in_direct_mode() {
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(10.0, 0.0, 0.0));
        assert!(update_navigation(&mut loco, &LocomotionConfig::default(), entity(), Vec3::ZERO, 1.0).is_none());

        loco.direct(Vec3::X);
        assert!(update_navigation(&mut loco, &navmesh_config(), entity(), Vec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn test_waypoints_advance_within_reach() {
        let cfg = navmesh_config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(10.0, 0.0, 10.0));
        let _ = update_navigation(&mut loco, &cfg, entity(), Vec3::ZERO, 0.0);
        apply_path_result(
            &mut loco,
            Some(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 10.0)]),
        );
        assert!(loco.follow_path);

        // Первый waypoint = текущая позиция → сразу следующий
        let _ = update_navigation(&mut loco, &cfg, entity(), Vec3::ZERO, 0.0);
        assert_eq!(loco.path_index, 1);
        assert_eq!(loco.avoid_target, Vec3::new(10.0, 0.0, 0.0));

        // Высота не учитывается
        let _ = update_navigation(&mut loco, &cfg, entity(), Vec3::new(9.9, 3.0, 0.1), 0.0);
        assert_eq!(loco.path_index, 2);
        assert_eq!(loco.avoid_target, Vec3::new(10.0, 0.0, 10.0));
    }

    #[test]
    fn test_refresh_after_interval_and_on_divergence() {
        let cfg = navmesh_config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(10.0, 0.0, 0.0));
        let _ = update_navigation(&mut loco, &cfg, entity(), Vec3::ZERO, 0.0);
        apply_path_result(&mut loco, Some(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]));

        assert!(update_navigation(&mut loco, &cfg, entity(), Vec3::ZERO, 0.2).is_none());
        assert!(update_navigation(&mut loco, &cfg, entity(), Vec3::ZERO, 0.3).is_some());
        apply_path_result(&mut loco, Some(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]));

        // Цель сдвинулась на 90°: перезапрос без ожидания таймера
        loco.move_target = Vec3::new(0.0, 0.0, 10.0);
        assert!(update_navigation(&mut loco, &cfg, entity(), Vec3::ZERO, 0.0).is_some());
    }

    #[test]
    fn test_failed_path_falls_back_to_direct_steering() {
        let cfg = navmesh_config();
        let mut loco = Locomotion::new(Vec3::ZERO, Vec3::NEG_Z);
        loco.move_to(Vec3::new(10.0, 0.0, 0.0));
        let _ = update_navigation(&mut loco, &cfg, entity(), Vec3::ZERO, 0.0);
        apply_path_result(&mut loco, None);

        assert!(!loco.follow_path);
        assert!(!loco.path_pending);
        assert!(loco.is_moving);
    }
}
