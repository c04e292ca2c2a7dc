//! Steering collaborators: physics queries, navmesh paths, XZ math

pub mod flat_world;
pub mod math;
pub mod navmesh;
pub mod query;

pub use flat_world::{BoxObstacle, FlatWorld};
pub use navmesh::{NavMesh, NavPathService, PathRequest, PathRequests, StraightLinePaths};
pub use query::{LayerMask, PhysicsWorld, RayHit, SteeringQuery};
