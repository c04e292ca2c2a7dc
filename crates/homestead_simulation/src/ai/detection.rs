//! Threat / food detection: range + bearing gate, nearest wins
//!
//! Кандидат виден, если `distance < range` и (bearing < angle/2
//! или `distance <= range_360`, "личное пространство" без угла).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::registry::{ActorView, WorldSnapshot};
use crate::steering::math::flat;

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionCone {
    pub range: f32,
    /// Полный угол конуса (градусы)
    pub angle: f32,
    pub range_360: f32,
}

impl Default for DetectionCone {
    fn default() -> Self {
        Self {
            range: 5.0,
            angle: 360.0,
            range_360: 1.0,
        }
    }
}

impl DetectionCone {
    pub fn detects(&self, origin: Vec3, facing: Vec3, point: Vec3) -> bool {
        let distance = origin.distance(point);
        if distance >= self.range {
            return false;
        }
        if distance <= self.range_360 || self.angle >= 360.0 {
            return true;
        }

        let to_point = flat(point - origin);
        let facing = flat(facing);
        if to_point.length_squared() < 1e-8 || facing.length_squared() < 1e-8 {
            return true;
        }
        facing.angle_between(to_point).to_degrees() < self.angle * 0.5
    }
}

/// Ближайший видимый кандидат. При равной дистанции выигрывает первый найденный.
pub fn find_nearest<I>(origin: Vec3, facing: Vec3, cone: &DetectionCone, candidates: I) -> Option<(Entity, f32)>
where
    I: IntoIterator<Item = (Entity, Vec3)>,
{
    let mut nearest: Option<(Entity, f32)> = None;
    for (entity, position) in candidates {
        if !cone.detects(origin, facing, position) {
            continue;
        }
        let distance = origin.distance(position);
        if nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((entity, distance));
        }
    }
    nearest
}

/// Какие акторы интересны при скане
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFilter {
    /// От кого убегать: сам способен атаковать (игрок всегда)
    Threat,
    /// На кого нападать: любой живой чужой с включенным коллайдером
    Prey,
}

impl ScanFilter {
    pub fn accepts(self, observer: Entity, groups: &[String], candidate: &ActorView) -> bool {
        let stranger = candidate.entity != observer && candidate.alive && !candidate.shares_group(groups);
        match self {
            ScanFilter::Threat => stranger && candidate.can_attack,
            ScanFilter::Prey => stranger && candidate.collidable,
        }
    }
}

/// Ближайший подходящий актор в конусе
pub fn nearest_actor(
    snapshot: &WorldSnapshot,
    filter: ScanFilter,
    observer: Entity,
    groups: &[String],
    origin: Vec3,
    facing: Vec3,
    cone: &DetectionCone,
) -> Option<(Entity, f32)> {
    let candidates = snapshot
        .actors
        .iter()
        .filter(|actor| filter.accepts(observer, groups, actor))
        .map(|actor| (actor.entity, actor.position));
    find_nearest(origin, facing, cone, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cone() -> DetectionCone {
        DetectionCone { range: 5.0, angle: 90.0, range_360: 1.0 }
    }

    #[test]
    fn test_exactly_at_range_360_is_always_detected() {
        // Прямо за спиной, на границе 360-зоны
        assert!(cone().detects(Vec3::ZERO, Vec3::NEG_Z, Vec3::new(0.0, 0.0, 1.0)));
        assert!(cone().detects(Vec3::ZERO, Vec3::NEG_Z, Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_beyond_range_is_never_detected() {
        assert!(!cone().detects(Vec3::ZERO, Vec3::NEG_Z, Vec3::new(0.0, 0.0, -5.0)));
        assert!(!cone().detects(Vec3::ZERO, Vec3::NEG_Z, Vec3::new(0.0, 0.0, -7.0)));
        let wide = DetectionCone { range: 5.0, angle: 360.0, range_360: 1.0 };
        assert!(!wide.detects(Vec3::ZERO, Vec3::NEG_Z, Vec3::new(6.0, 0.0, 0.0)));
    }

    #[test]
    fn test_outside_bearing_is_not_detected() {
        // 90° конус: ±45° от forward
        assert!(cone().detects(Vec3::ZERO, Vec3::NEG_Z, Vec3::new(1.0, 0.0, -3.0)));
        assert!(!cone().detects(Vec3::ZERO, Vec3::NEG_Z, Vec3::new(3.0, 0.0, -1.0)));
        assert!(!cone().detects(Vec3::ZERO, Vec3::NEG_Z, Vec3::new(0.0, 0.0, 3.0)));
    }

    #[test]
    fn test_nearest_ties_keep_first_found() {
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let c = Entity::from_raw(3);
        let candidates = vec![
            (a, Vec3::new(0.0, 0.0, -3.0)),
            (b, Vec3::new(0.0, 0.0, -2.0)),
            (c, Vec3::new(2.0, 0.0, 0.0)),
        ];
        let wide = DetectionCone { range: 5.0, angle: 360.0, range_360: 1.0 };
        assert_eq!(find_nearest(Vec3::ZERO, Vec3::NEG_Z, &wide, candidates), Some((b, 2.0)));

        let tied = vec![(c, Vec3::new(2.0, 0.0, 0.0)), (b, Vec3::new(0.0, 0.0, -2.0))];
        assert_eq!(find_nearest(Vec3::ZERO, Vec3::NEG_Z, &wide, tied).map(|(e, _)| e), Some(c));
    }

    fn actor(entity: u32, can_attack: bool, groups: &[&str]) -> ActorView {
        ActorView {
            entity: Entity::from_raw(entity),
            position: Vec3::new(0.0, 0.0, -2.0),
            facing: Vec3::NEG_Z,
            behavior: None,
            is_player: false,
            groups: groups.iter().map(|g| g.to_string()).collect(),
            alive: true,
            hit_range: Some(0.5),
            can_attack,
            hostile: false,
            collidable: true,
        }
    }

    #[test]
    fn test_threat_scan_needs_a_fighter() {
        let wolves = vec!["wolves".to_string()];
        let observer = Entity::from_raw(99);
        let cow = actor(1, false, &["cows"]);
        let bear = actor(2, true, &["bears"]);
        let packmate = actor(3, true, &["wolves"]);

        assert!(!ScanFilter::Threat.accepts(observer, &wolves, &cow));
        assert!(ScanFilter::Threat.accepts(observer, &wolves, &bear));
        assert!(!ScanFilter::Threat.accepts(observer, &wolves, &packmate));
    }

    #[test]
    fn test_prey_scan_takes_any_living_stranger() {
        let wolves = vec!["wolves".to_string()];
        let observer = Entity::from_raw(99);
        let cow = actor(1, false, &["cows"]);
        assert!(ScanFilter::Prey.accepts(observer, &wolves, &cow));
        assert!(!ScanFilter::Prey.accepts(observer, &wolves, &actor(3, false, &["wolves"])));
        assert!(!ScanFilter::Prey.accepts(Entity::from_raw(1), &wolves, &cow), "never itself");

        let dead = ActorView { alive: false, ..cow.clone() };
        assert!(!ScanFilter::Prey.accepts(observer, &wolves, &dead));
        let airborne = ActorView { collidable: false, ..cow };
        assert!(!ScanFilter::Prey.accepts(observer, &wolves, &airborne));
    }

    #[test]
    fn test_nearest_actor_applies_filter() {
        let mut snapshot = WorldSnapshot::default();
        let mut cow = actor(1, false, &["cows"]);
        cow.position = Vec3::new(0.0, 0.0, -1.5);
        snapshot.push_actor(cow);
        snapshot.push_actor(actor(2, true, &["bears"]));

        let wolves = vec!["wolves".to_string()];
        let cone = DetectionCone { range: 5.0, angle: 360.0, range_360: 1.0 };
        let observer = Entity::from_raw(99);
        let prey = nearest_actor(&snapshot, ScanFilter::Prey, observer, &wolves, Vec3::ZERO, Vec3::NEG_Z, &cone);
        let threat = nearest_actor(&snapshot, ScanFilter::Threat, observer, &wolves, Vec3::ZERO, Vec3::NEG_Z, &cone);
        assert_eq!(prey.map(|(e, _)| e), Some(Entity::from_raw(1)));
        assert_eq!(threat.map(|(e, _)| e), Some(Entity::from_raw(2)));
    }

    #[test]
    fn test_nothing_visible() {
        let far = vec![(Entity::from_raw(1), Vec3::new(0.0, 0.0, -9.0))];
        assert!(find_nearest(Vec3::ZERO, Vec3::NEG_Z, &cone(), far).is_none());
    }
}
