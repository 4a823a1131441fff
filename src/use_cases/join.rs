// Join and transform-update rules applied against the player registry.

use super::registry::PlayerRegistry;
use crate::domain::spawn::spawn_player;
use crate::domain::{Player, Quaternion, Vector3};

/// Client-reported transform, trusted as received.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformUpdate {
    pub position: Vector3,
    pub rotation: Quaternion,
}

/// Generates a player for `session_id` and inserts it into the registry.
///
/// Returns `None` when the session already has a player, in which case the
/// registry is left untouched.
pub async fn join_player(registry: &PlayerRegistry, session_id: &str) -> Option<Player> {
    if registry.contains(session_id).await {
        return None;
    }

    // ThreadRng is not Send; keep it out of scope before the next await.
    let player = {
        let mut rng = rand::rng();
        spawn_player(session_id, &mut rng)
    };

    if registry.add_if_absent(player.clone()).await {
        Some(player)
    } else {
        None
    }
}

/// Every player except `exclude_id`, in no particular order.
pub async fn other_players(registry: &PlayerRegistry, exclude_id: &str) -> Vec<Player> {
    registry
        .get_all()
        .await
        .into_iter()
        .filter(|player| player.id != exclude_id)
        .collect()
}

/// Applies an update for `player_id`. Returns false if the player is gone.
pub async fn apply_transform(
    registry: &PlayerRegistry,
    player_id: &str,
    update: TransformUpdate,
) -> bool {
    registry
        .update_position(player_id, update.position, update.rotation)
        .await
}
