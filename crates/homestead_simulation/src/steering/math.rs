//! Плоская (XZ) геометрия для steering
//!
//! Forward в Bevy = -Z, yaw вокруг +Y. Все углы наружу в градусах.

use bevy::prelude::*;

/// Проекция на горизонтальную плоскость
pub fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    flat(b - a).length()
}

/// Rotation, у которой forward (-Z) смотрит вдоль `facing` (XZ)
pub fn yaw_rotation(facing: Vec3) -> Quat {
    Quat::from_rotation_y(f32::atan2(-facing.x, -facing.z))
}

pub fn forward(rotation: Quat) -> Vec3 {
    rotation * Vec3::NEG_Z
}

/// Поворот `from` к `to` не больше чем на `max_radians`
pub fn rotate_towards(from: Quat, to: Quat, max_radians: f32) -> Quat {
    let angle = from.angle_between(to);
    if angle <= max_radians || angle < 1e-6 {
        return to;
    }
    from.slerp(to, max_radians / angle)
}

pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Heading вектора вокруг +Y (0° = +Z), совпадает со знаком `Quat::from_rotation_y`
fn heading(v: Vec3) -> f32 {
    f32::atan2(v.x, v.z)
}

/// Signed угол (градусы, -180..=180) от `from` к `to` вокруг +Y
pub fn signed_angle_y(from: Vec3, to: Vec3) -> f32 {
    let mut delta = (heading(to) - heading(from)).to_degrees();
    while delta > 180.0 {
        delta -= 360.0;
    }
    while delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Поворот горизонтального вектора вокруг +Y на `degrees`
pub fn rotate_y(v: Vec3, degrees: f32) -> Vec3 {
    Quat::from_rotation_y(degrees.to_radians()) * v
}
