//! Headless physics backend: плоская земля + AABB препятствия
//!
//! Используется в headless режиме и тестах вместо настоящего physics engine.

use bevy::prelude::*;

use super::query::{LayerMask, RayHit, SteeringQuery};

#[derive(Debug, Clone, PartialEq)]
pub struct BoxObstacle {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub layer: LayerMask,
    pub owner: Option<Entity>,
}

impl BoxObstacle {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
            layer: LayerMask::OBSTACLE,
            owner: None,
        }
    }

    pub fn with_layer(mut self, layer: LayerMask) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_owner(mut self, owner: Entity) -> Self {
        self.owner = Some(owner);
        self
    }

    fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }
}

#[derive(Debug, Clone)]
pub struct FlatWorld {
    pub ground_height: f32,
    pub ground_layer: LayerMask,
    pub obstacles: Vec<BoxObstacle>,
}

impl Default for FlatWorld {
    fn default() -> Self {
        Self {
            ground_height: 0.0,
            ground_layer: LayerMask::GROUND,
            obstacles: Vec::new(),
        }
    }
}

impl FlatWorld {
    pub fn with_obstacle(mut self, obstacle: BoxObstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }
}

/// Slab test. Возвращает (t входа, нормаль грани входа).
fn ray_aabb(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_min = 0.0f32;
    let mut t_max = f32::INFINITY;
    let mut normal = -direction;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min[axis] - o) * inv;
        let mut t2 = (max[axis] - o) * inv;
        let mut sign = -1.0;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
            sign = 1.0;
        }
        if t1 > t_min {
            t_min = t1;
            normal = Vec3::ZERO;
            normal[axis] = sign;
        }
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    Some((t_min, normal))
}

impl SteeringQuery for FlatWorld {
    fn raycast_all(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Vec<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return Vec::new();
        }

        let mut hits = Vec::new();

        if mask.intersects(self.ground_layer) && direction.y < -1e-6 {
            let t = (self.ground_height - origin.y) / direction.y;
            if (0.0..=max_distance).contains(&t) {
                hits.push(RayHit {
                    distance: t,
                    point: origin + direction * t,
                    normal: Vec3::Y,
                    collider: None,
                });
            }
        }

        for obstacle in self.obstacles.iter().filter(|o| mask.intersects(o.layer)) {
            if let Some((t, normal)) = ray_aabb(origin, direction, obstacle.min(), obstacle.max()) {
                if t <= max_distance {
                    hits.push(RayHit {
                        distance: t,
                        point: origin + direction * t,
                        normal,
                        collider: obstacle.owner,
                    });
                }
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<Entity> {
        self.obstacles
            .iter()
            .filter(|o| mask.intersects(o.layer))
            .filter(|o| center.clamp(o.min(), o.max()).distance(center) <= radius)
            .filter_map(|o| o.owner)
            .collect()
    }

    fn overlap_box(&self, center: Vec3, half_extents: Vec3, mask: LayerMask) -> Vec<Entity> {
        let min = center - half_extents;
        let max = center + half_extents;
        self.obstacles
            .iter()
            .filter(|o| mask.intersects(o.layer))
            .filter(|o| {
                let (omin, omax) = (o.min(), o.max());
                min.x <= omax.x && max.x >= omin.x
                    && min.y <= omax.y && max.y >= omin.y
                    && min.z <= omax.z && max.z >= omin.z
            })
            .filter_map(|o| o.owner)
            .collect()
    }
}
