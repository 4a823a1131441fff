// Use cases layer: player registry and join/update workflows.

pub mod join;
pub mod registry;

pub use join::{TransformUpdate, apply_transform, join_player, other_players};
pub use registry::PlayerRegistry;
