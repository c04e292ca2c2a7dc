//! Path requests к navmesh service
//!
//! Locomotion ставит запрос в `PathRequests`, ответ приходит в конце тика
//! (`resolve_path_requests`), поэтому владелец видит путь только на следующем тике.

use bevy::prelude::*;

pub trait NavPathService: Send + Sync {
    /// Corner points от `from` до `to`, `None` если маршрута нет
    fn calculate_path(&self, from: Vec3, to: Vec3, area_mask: u32) -> Option<Vec<Vec3>>;
}

/// Default service: прямая линия (открытая местность)
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLinePaths;

impl NavPathService for StraightLinePaths {
    fn calculate_path(&self, from: Vec3, to: Vec3, _area_mask: u32) -> Option<Vec<Vec3>> {
        Some(vec![from, to])
    }
}

#[derive(Resource)]
pub struct NavMesh(pub Box<dyn NavPathService>);

impl NavMesh {
    pub fn new(service: impl NavPathService + 'static) -> Self {
        Self(Box::new(service))
    }
}

impl Default for NavMesh {
    fn default() -> Self {
        Self::new(StraightLinePaths)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathRequest {
    pub entity: Entity,
    pub from: Vec3,
    pub to: Vec3,
    pub area_mask: u32,
}

#[derive(Resource, Default, Debug)]
pub struct PathRequests {
    pending: Vec<PathRequest>,
}

impl PathRequests {
    pub fn push(&mut self, request: PathRequest) {
        self.pending.push(request);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> Vec<PathRequest> {
        std::mem::take(&mut self.pending)
    }
}
