//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - actor: Actor, Health, Player, UniqueId, Colliders
//! - world: объекты мира (Food, DigSpot)
//!
//! Locomotion/combat/AI компоненты живут в своих модулях.

pub mod actor;
pub mod world;

pub use actor::*;
pub use world::*;
