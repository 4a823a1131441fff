// Concurrent player registry keyed by player id.

use crate::domain::{Player, PlayerId, Quaternion, Vector3};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Thread-safe map of joined players.
///
/// Every method takes the lock for exactly one read or write and releases it
/// before returning, so callers never hold it across socket I/O or fanout.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: RwLock<HashMap<PlayerId, Player>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the player stored under `player.id`.
    pub async fn add(&self, player: Player) {
        let mut players = self.players.write().await;
        players.insert(player.id.clone(), player);
    }

    /// Inserts the player unless the id is already taken. Returns true on insert.
    pub async fn add_if_absent(&self, player: Player) -> bool {
        let mut players = self.players.write().await;
        if players.contains_key(&player.id) {
            return false;
        }
        players.insert(player.id.clone(), player);
        true
    }

    /// Removes and returns the player stored under `id`.
    pub async fn remove(&self, id: &str) -> Option<Player> {
        let mut players = self.players.write().await;
        players.remove(id)
    }

    /// Removes the player owned by `session_id`, if that session ever joined.
    pub async fn remove_for_session(&self, session_id: &str) -> Option<Player> {
        let mut players = self.players.write().await;
        let id = players
            .values()
            .find(|player| player.session_id == session_id)?
            .id
            .clone();
        players.remove(&id)
    }

    /// Clone of the player stored under `id`.
    pub async fn get(&self, id: &str) -> Option<Player> {
        let players = self.players.read().await;
        players.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        let players = self.players.read().await;
        players.contains_key(id)
    }

    /// Copy of every registered player, safe to iterate while the map changes.
    pub async fn get_all(&self) -> Vec<Player> {
        let players = self.players.read().await;
        players.values().cloned().collect()
    }

    /// Number of joined players.
    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }

    /// Replaces position and rotation together. Returns false when the id is
    /// not registered (for example an update that raced a disconnect).
    pub async fn update_position(&self, id: &str, position: Vector3, rotation: Quaternion) -> bool {
        let mut players = self.players.write().await;
        match players.get_mut(id) {
            Some(player) => {
                player.position = position;
                player.rotation = rotation;
                true
            }
            None => false,
        }
    }
}
