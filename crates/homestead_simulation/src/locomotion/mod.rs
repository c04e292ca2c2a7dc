//! Locomotion: per-entity movement integrator
//!
//! Target seek, obstacle avoidance, navmesh waypoints, slope-aware
//! vertical motion, stuck detection. Physics видим только через
//! `PhysicsWorld` / `NavMesh`.

use bevy::prelude::*;

pub mod avoidance;
pub mod components;
pub mod navigation;
pub mod steer;
pub mod systems;

#[cfg(test)]
mod locomotion_tests;

pub use components::{AvoidanceTuning, DirectMove, Locomotion, LocomotionConfig};
pub use steer::GroundSense;
pub use systems::*;

use crate::SimSet;

pub struct LocomotionPlugin;

impl Plugin for LocomotionPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<LocomotionConfig>()
            .register_type::<DirectMove>()
            .add_systems(
                FixedUpdate,
                (
                    apply_direct_move_input,
                    update_path_following,
                    update_obstacle_avoidance,
                    integrate_locomotion,
                    // Последним: ответы видны со следующего тика
                    resolve_path_requests,
                )
                    .chain()
                    .in_set(SimSet::Locomotion),
            );
    }
}
