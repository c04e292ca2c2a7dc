//! Locomotion components: LocomotionConfig (per-species tuning) + Locomotion (runtime state)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::steering::math::{flat, flat_distance};
use crate::steering::LayerMask;

/// Steering bias: лучи вперёд + скорость отклонения
///
/// Константы эмпирические, поэтому вынесены в данные species.
#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceTuning {
    /// Угол боковых лучей от forward (градусы)
    pub probe_angle: f32,
    pub probe_distance: f32,
    /// Максимальное отклонение avoid_angle (градусы)
    pub max_deflection: f32,
    /// °/s когда препятствие вплотную
    pub near_rate: f32,
    /// °/s когда препятствие на краю probe_distance
    pub far_rate: f32,
    /// Как часто стреляем лучами (секунды)
    pub refresh_interval: f32,
}

impl Default for AvoidanceTuning {
    fn default() -> Self {
        Self {
            probe_angle: 45.0,
            probe_distance: 2.0,
            max_deflection: 90.0,
            near_rate: 200.0,
            far_rate: 50.0,
            refresh_interval: 0.2,
        }
    }
}

#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct LocomotionConfig {
    pub move_speed: f32,
    /// Градусы в секунду
    pub rotate_speed: f32,
    /// Tolerance прибытия = 2 × moving_threshold
    pub moving_threshold: f32,
    /// 0 = летающее существо (гравитации нет)
    pub fall_speed: f32,
    /// Градусы; круче не забираемся
    pub slope_angle_max: f32,
    pub ground_detect_dist: f32,
    pub body_radius: f32,
    pub use_navmesh: bool,
    pub nav_area_mask: u32,
    pub avoid_obstacles: bool,
    pub avoidance: AvoidanceTuning,
    pub ground_layer: LayerMask,
    pub obstacle_layer: LayerMask,
    pub floor_layer: LayerMask,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            rotate_speed: 250.0,
            moving_threshold: 0.15,
            fall_speed: 20.0,
            slope_angle_max: 45.0,
            ground_detect_dist: 0.1,
            body_radius: 0.4,
            use_navmesh: false,
            nav_area_mask: u32::MAX,
            avoid_obstacles: true,
            avoidance: AvoidanceTuning::default(),
            ground_layer: LayerMask::GROUND,
            obstacle_layer: LayerMask::OBSTACLE,
            floor_layer: LayerMask::FLOOR,
        }
    }
}

impl LocomotionConfig {
    pub fn reach_tolerance(&self) -> f32 {
        2.0 * self.moving_threshold
    }
}

/// Runtime состояние движения
///
/// Инварианты:
/// - `avoid_target` пересчитывается из `move_target` каждый тик
/// - `is_stuck` ⇔ `is_moving && stuck_timer > 0.5`
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Locomotion {
    pub move_target: Vec3,
    pub avoid_target: Vec3,
    /// Явная tolerance прибытия (иначе 2 × moving_threshold)
    pub reach_distance: Option<f32>,
    pub is_moving: bool,
    /// Последний move_to завершился прибытием
    pub reached: bool,

    pub path: Vec<Vec3>,
    pub path_index: usize,
    pub follow_path: bool,
    pub path_pending: bool,
    pub path_timer: f32,

    pub is_stuck: bool,
    pub stuck_timer: f32,
    pub move_average: Vec3,

    /// Ручное управление: без pathing/avoidance
    pub direct_move: bool,
    pub direct_input: Vec3,

    pub avoid_angle: f32,
    pub avoid_side: f32,
    pub avoid_timer: f32,
    /// Текущая цель: не считается препятствием для avoidance лучей
    pub target_entity: Option<Entity>,
    pub escaping: bool,

    pub velocity: Vec3,
    pub facing: Vec3,
    pub grounded: bool,
    pub ground_normal: Vec3,
    pub flying: bool,
    pub speed_override: Option<f32>,
}

impl Default for Locomotion {
    fn default() -> Self {
        Self {
            move_target: Vec3::ZERO,
            avoid_target: Vec3::ZERO,
            reach_distance: None,
            is_moving: false,
            reached: false,
            path: Vec::new(),
            path_index: 0,
            follow_path: false,
            path_pending: false,
            path_timer: 0.0,
            is_stuck: false,
            stuck_timer: 0.0,
            move_average: Vec3::ZERO,
            direct_move: false,
            direct_input: Vec3::ZERO,
            avoid_angle: 0.0,
            avoid_side: 0.0,
            avoid_timer: 0.0,
            target_entity: None,
            escaping: false,
            velocity: Vec3::ZERO,
            facing: Vec3::NEG_Z,
            grounded: false,
            ground_normal: Vec3::Y,
            flying: false,
            speed_override: None,
        }
    }
}

/// Период перезапроса пути
pub const PATH_REFRESH_INTERVAL: f32 = 0.5;
pub const STUCK_TIME: f32 = 0.5;

impl Locomotion {
    pub fn new(position: Vec3, facing: Vec3) -> Self {
        let facing = flat(facing).normalize_or(Vec3::NEG_Z);
        Self {
            move_target: position,
            avoid_target: position,
            facing,
            ..Default::default()
        }
    }

    pub fn move_to(&mut self, target: Vec3) {
        self.move_to_within(target, None);
    }

    pub fn move_to_within(&mut self, target: Vec3, reach: Option<f32>) {
        self.move_target = target;
        self.avoid_target = target;
        self.reach_distance = reach;
        self.is_moving = true;
        self.reached = false;
        self.direct_move = false;
        self.escaping = false;
        // Новая цель → путь запрашиваем сразу
        self.path_timer = PATH_REFRESH_INTERVAL;
    }

    /// Сдвиг цели без сброса пути (преследование движущейся цели)
    pub fn retarget(&mut self, target: Vec3, reach: Option<f32>) {
        if !self.is_moving || self.direct_move {
            self.move_to_within(target, reach);
            return;
        }
        self.move_target = target;
        self.reach_distance = reach;
    }

    /// Бежать от `threat` на `distance` по прямой
    pub fn escape_from(&mut self, position: Vec3, threat: Vec3, distance: f32) {
        let away = flat(position - threat).normalize_or(-self.facing);
        self.move_to(position + away * distance);
        self.escaping = true;
    }

    pub fn direct(&mut self, input: Vec3) {
        let input = flat(input).clamp_length_max(1.0);
        self.direct_move = true;
        self.direct_input = input;
        self.is_moving = input.length_squared() > 1e-4;
        self.reached = false;
        self.follow_path = false;
    }

    /// Остановка. Повторный вызов ничего не меняет.
    pub fn stop(&mut self) {
        self.is_moving = false;
        self.direct_move = false;
        self.direct_input = Vec3::ZERO;
        self.velocity = Vec3::ZERO;
        self.path.clear();
        self.path_index = 0;
        self.follow_path = false;
        self.is_stuck = false;
        self.stuck_timer = 0.0;
        self.move_average = Vec3::ZERO;
        self.escaping = false;
        self.reach_distance = None;
    }

    pub fn face_toward(&mut self, position: Vec3, target: Vec3) {
        let dir = flat(target - position);
        if dir.length_squared() > 1e-4 {
            self.facing = dir.normalize();
        }
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed_override = Some(speed);
    }

    pub fn speed(&self, config: &LocomotionConfig) -> f32 {
        self.speed_override.unwrap_or(config.move_speed)
    }

    pub fn is_flying(&self, config: &LocomotionConfig) -> bool {
        self.flying || config.fall_speed < 0.01
    }

    pub fn reach_tolerance(&self, config: &LocomotionConfig) -> f32 {
        self.reach_distance.unwrap_or_else(|| config.reach_tolerance())
    }

    pub fn is_within_reach(&self, position: Vec3, config: &LocomotionConfig) -> bool {
        flat_distance(position, self.move_target) < self.reach_tolerance(config)
    }

    pub fn has_reached_target(&self) -> bool {
        self.reached
    }

    /// Сглаженное смещение за тик; stuck растёт пока оно меньше speed·dt·0.25
    pub fn record_displacement(&mut self, config: &LocomotionConfig, displacement: Vec3, dt: f32) {
        self.move_average = self.move_average.lerp(flat(displacement), (2.0 * dt).min(1.0));

        let threshold = self.speed(config) * dt * 0.25;
        if self.is_moving && self.move_average.length() < threshold {
            self.stuck_timer += dt;
        } else {
            self.stuck_timer = (self.stuck_timer - dt).max(0.0);
        }
        self.is_stuck = self.is_moving && self.stuck_timer > STUCK_TIME;
    }
}

/// Ручной ввод (игрок, mount): каждый тик уходит в `Locomotion::direct`
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct DirectMove {
    pub input: Vec3,
}
