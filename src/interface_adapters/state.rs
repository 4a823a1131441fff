use crate::domain::World;
use crate::interface_adapters::hub::HubHandle;
use crate::interface_adapters::protocol::{ServerMessage, WorldStateDto};
use crate::use_cases::PlayerRegistry;
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;

/// Shared state handed to every connection task.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Control task that owns the active session set.
    pub hub: HubHandle,
    /// Joined players, shared with the hub for cleanup.
    pub registry: Arc<PlayerRegistry>,
    /// WorldState frame serialized once at startup; clones share the bytes.
    pub world_state: Utf8Bytes,
    /// Capacity of each session's outbound queue.
    pub outbound_queue_capacity: usize,
}

impl AppState {
    pub fn new(
        hub: HubHandle,
        registry: Arc<PlayerRegistry>,
        world: &World,
        outbound_queue_capacity: usize,
    ) -> Result<Self, serde_json::Error> {
        let world_state =
            ServerMessage::WorldState(WorldStateDto::from_objects(world.objects())).encode()?;
        Ok(Self {
            hub,
            registry,
            world_state,
            outbound_queue_capacity,
        })
    }
}
