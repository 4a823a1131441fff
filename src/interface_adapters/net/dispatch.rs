// Dispatch of decoded client messages: join handshake, transform updates, leave.

use super::NetError;
use crate::interface_adapters::protocol::{
    ClientMessage, JoinResponseDto, PlayerListDto, PlayerUpdateBroadcastDto,
    PlayerUpdateRequestDto, ServerMessage, SpawnPlayerDto,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{TransformUpdate, apply_transform, join_player, other_players};
use tracing::info;

/// What a dispatched message did, so the session can update its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Joined,
    /// Join from a session that already has a player.
    DuplicateJoin,
    Updated,
    /// Update for a player that is no longer registered.
    UpdateIgnored,
    Leave,
}

pub async fn dispatch(
    state: &AppState,
    session_id: &str,
    message: ClientMessage,
) -> Result<Dispatched, NetError> {
    match message {
        ClientMessage::Join => handle_join(state, session_id).await,
        ClientMessage::PlayerUpdate(req) => handle_player_update(state, session_id, req).await,
        ClientMessage::Leave => Ok(Dispatched::Leave),
    }
}

/// Creates the player, then replies JoinResponse -> WorldState -> PlayerList
/// to the joiner and announces the spawn to everyone else.
///
/// The player is in the registry before any reply is queued, and all replies
/// go through the hub queue, so the joiner sees them in this order.
pub async fn handle_join(state: &AppState, session_id: &str) -> Result<Dispatched, NetError> {
    let Some(player) = join_player(&state.registry, session_id).await else {
        return Ok(Dispatched::DuplicateJoin);
    };
    info!(
        username = %player.username,
        vehicle_type = %player.vehicle_type,
        "player joined"
    );

    let join = ServerMessage::JoinResponse(JoinResponseDto::from(&player)).encode()?;
    state.hub.send_to(session_id, join).await?;

    state
        .hub
        .send_to(session_id, state.world_state.clone())
        .await?;

    let others = other_players(&state.registry, session_id).await;
    let list = ServerMessage::PlayerList(PlayerListDto::from_players(&others)).encode()?;
    state.hub.send_to(session_id, list).await?;

    let spawn = ServerMessage::SpawnPlayer(SpawnPlayerDto {
        player: (&player).into(),
    })
    .encode()?;
    state.hub.broadcast_except(spawn, session_id).await?;

    Ok(Dispatched::Joined)
}

/// Stores the sender's transform and relays it to every other session.
pub async fn handle_player_update(
    state: &AppState,
    session_id: &str,
    req: PlayerUpdateRequestDto,
) -> Result<Dispatched, NetError> {
    let update = TransformUpdate::from(req);
    if !apply_transform(&state.registry, session_id, update).await {
        return Ok(Dispatched::UpdateIgnored);
    }

    let msg = ServerMessage::PlayerUpdate(PlayerUpdateBroadcastDto::new(session_id, update));
    state.hub.broadcast_except(msg.encode()?, session_id).await?;
    Ok(Dispatched::Updated)
}
