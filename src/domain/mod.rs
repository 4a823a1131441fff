// Domain layer: player, world and session types plus spawn rules.

pub mod player;
pub mod session;
pub mod spawn;
pub mod world;

pub use player::{Color, Player, PlayerId, Quaternion, Vector3, VehicleType};
pub use session::{SessionLifecycle, SessionState};
pub use world::{World, WorldObject};
