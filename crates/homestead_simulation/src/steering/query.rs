//! Physics queries, нужные steering'у
//!
//! Физический backend: внешний collaborator. Симуляция видит его только
//! через `SteeringQuery` (resource `PhysicsWorld`).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::flat_world::FlatWorld;

/// Высота, с которой body probes стреляют вперёд (чтобы не цеплять землю)
pub const BODY_PROBE_HEIGHT: f32 = 0.5;

/// Битовая маска physics layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);
    pub const GROUND: Self = Self(1);
    pub const OBSTACLE: Self = Self(1 << 1);
    /// Полы построек (walkable, но не terrain)
    pub const FLOOR: Self = Self(1 << 2);
    pub const ACTOR: Self = Self(1 << 3);

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub collider: Option<Entity>,
}

pub trait SteeringQuery: Send + Sync {
    /// Все попадания луча, отсортированные по distance
    fn raycast_all(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Vec<RayHit>;

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<Entity>;

    fn overlap_box(&self, center: Vec3, half_extents: Vec3, mask: LayerMask) -> Vec<Entity>;

    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        self.raycast_layer(origin, direction, max_distance, LayerMask::ALL)
    }

    fn raycast_layer(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        self.raycast_all(origin, direction, max_distance, mask).into_iter().next()
    }

    /// Первое попадание, не принадлежащее `exclude` (текущая цель не считается препятствием)
    fn raycast_excluding(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        exclude: Option<Entity>,
    ) -> Option<RayHit> {
        self.raycast_all(origin, direction, max_distance, mask)
            .into_iter()
            .find(|hit| exclude.is_none() || hit.collider != exclude)
    }

    /// Точка земли под `origin` (луч вниз)
    fn find_ground_position(&self, origin: Vec3, max_distance: f32, mask: LayerMask) -> Option<Vec3> {
        self.raycast_layer(origin, Vec3::NEG_Y, max_distance, mask)
            .map(|hit| hit.point)
    }

    /// Сдвиг body радиуса `radius` на `delta` с остановкой перед препятствиями.
    /// Вертикальная часть применяется без проверок (землю держит ground sensing).
    fn move_body(&self, origin: Vec3, delta: Vec3, radius: f32, mask: LayerMask) -> Vec3 {
        let horizontal = Vec3::new(delta.x, 0.0, delta.z);
        let length = horizontal.length();
        let moved = origin + Vec3::new(0.0, delta.y, 0.0);
        if length < f32::EPSILON || mask == LayerMask::NONE {
            return moved + horizontal;
        }

        let direction = horizontal / length;
        let probe = origin + Vec3::Y * BODY_PROBE_HEIGHT;
        let allowed = match self.raycast_layer(probe, direction, length + radius, mask) {
            Some(hit) => (hit.distance - radius).clamp(0.0, length),
            None => length,
        };
        moved + direction * allowed
    }
}

/// Активный physics backend
#[derive(Resource)]
pub struct PhysicsWorld(pub Box<dyn SteeringQuery>);

impl PhysicsWorld {
    pub fn new(query: impl SteeringQuery + 'static) -> Self {
        Self(Box::new(query))
    }

    pub fn query(&self) -> &dyn SteeringQuery {
        self.0.as_ref()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(FlatWorld::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask_ops() {
        let walkable = LayerMask::GROUND.union(LayerMask::FLOOR);
        assert!(walkable.intersects(LayerMask::FLOOR));
        assert!(!walkable.intersects(LayerMask::OBSTACLE));
        assert!(LayerMask::ALL.intersects(LayerMask::ACTOR));
        assert!(!LayerMask::NONE.intersects(LayerMask::ALL));
    }
}
