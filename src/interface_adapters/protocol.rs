// Wire protocol DTOs and conversions for relay messages.
// Every frame is a JSON envelope `{ "type": <int>, "payload": <object|null> }`.

use crate::domain::{Color, Player, Quaternion, Vector3, WorldObject};
use crate::use_cases::TransformUpdate;
use axum::extract::ws::Utf8Bytes;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Envelope discriminants. Join/Leave/PlayerUpdate flow client to server;
/// the rest are server to client only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MessageType {
    Unknown = 0,
    Join = 1,
    Leave = 2,
    PlayerUpdate = 3,
    SpawnPlayer = 4,
    RemovePlayer = 5,
    PlayerList = 6,
    WorldState = 7,
}

impl MessageType {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for MessageType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::Unknown),
            1 => Ok(MessageType::Join),
            2 => Ok(MessageType::Leave),
            3 => Ok(MessageType::PlayerUpdate),
            4 => Ok(MessageType::SpawnPlayer),
            5 => Ok(MessageType::RemovePlayer),
            6 => Ok(MessageType::PlayerList),
            7 => Ok(MessageType::WorldState),
            other => Err(other),
        }
    }
}

/// Reasons an inbound frame is dropped. None of them close the connection.
#[derive(Debug)]
pub enum DecodeError {
    /// Not a JSON envelope at all.
    Json(serde_json::Error),
    UnknownType(i32),
    /// A known discriminant that clients are not allowed to send.
    UnexpectedType(MessageType),
    MissingPayload(MessageType),
    InvalidPayload {
        message_type: MessageType,
        source: serde_json::Error,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Json(e) => write!(f, "malformed envelope: {e}"),
            DecodeError::UnknownType(t) => write!(f, "unknown message type {t}"),
            DecodeError::UnexpectedType(t) => write!(f, "unexpected client message type {t:?}"),
            DecodeError::MissingPayload(t) => write!(f, "missing payload for {t:?}"),
            DecodeError::InvalidPayload {
                message_type,
                source,
            } => write!(f, "invalid payload for {message_type:?}: {source}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Json(e) => Some(e),
            DecodeError::InvalidPayload { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Messages the client sends to the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Join,
    Leave,
    PlayerUpdate(PlayerUpdateRequestDto),
}

#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    message_type: i32,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

/// Parses the outer envelope, then re-reads the payload for the discriminant.
pub fn decode_client_message(bytes: &[u8]) -> Result<ClientMessage, DecodeError> {
    let envelope: InboundEnvelope = serde_json::from_slice(bytes).map_err(DecodeError::Json)?;
    let message_type =
        MessageType::try_from(envelope.message_type).map_err(DecodeError::UnknownType)?;

    match message_type {
        // Join and Leave carry nothing; any payload sent along is ignored.
        MessageType::Join => Ok(ClientMessage::Join),
        MessageType::Leave => Ok(ClientMessage::Leave),
        MessageType::PlayerUpdate => {
            let payload = envelope
                .payload
                .ok_or(DecodeError::MissingPayload(message_type))?;
            serde_json::from_value::<PlayerUpdateRequestDto>(payload)
                .map(ClientMessage::PlayerUpdate)
                .map_err(|source| DecodeError::InvalidPayload {
                    message_type,
                    source,
                })
        }
        MessageType::Unknown => Err(DecodeError::UnknownType(envelope.message_type)),
        MessageType::SpawnPlayer
        | MessageType::RemovePlayer
        | MessageType::PlayerList
        | MessageType::WorldState => Err(DecodeError::UnexpectedType(message_type)),
    }
}

/// Messages the relay sends to clients.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    JoinResponse(JoinResponseDto),
    PlayerUpdate(PlayerUpdateBroadcastDto),
    SpawnPlayer(SpawnPlayerDto),
    RemovePlayer(RemovePlayerDto),
    PlayerList(PlayerListDto),
    WorldState(WorldStateDto),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            // Join responses reuse the Join discriminant.
            ServerMessage::JoinResponse(_) => MessageType::Join,
            ServerMessage::PlayerUpdate(_) => MessageType::PlayerUpdate,
            ServerMessage::SpawnPlayer(_) => MessageType::SpawnPlayer,
            ServerMessage::RemovePlayer(_) => MessageType::RemovePlayer,
            ServerMessage::PlayerList(_) => MessageType::PlayerList,
            ServerMessage::WorldState(_) => MessageType::WorldState,
        }
    }

    /// Serializes once into shareable bytes for the outbound queues.
    pub fn encode(&self) -> Result<Utf8Bytes, serde_json::Error> {
        serde_json::to_string(self).map(Utf8Bytes::from)
    }
}

impl Serialize for ServerMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_struct("Envelope", 2)?;
        envelope.serialize_field("type", &self.message_type().as_i32())?;
        match self {
            ServerMessage::JoinResponse(p) => envelope.serialize_field("payload", p)?,
            ServerMessage::PlayerUpdate(p) => envelope.serialize_field("payload", p)?,
            ServerMessage::SpawnPlayer(p) => envelope.serialize_field("payload", p)?,
            ServerMessage::RemovePlayer(p) => envelope.serialize_field("payload", p)?,
            ServerMessage::PlayerList(p) => envelope.serialize_field("payload", p)?,
            ServerMessage::WorldState(p) => envelope.serialize_field("payload", p)?,
        }
        envelope.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3Dto {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vector3> for Vector3Dto {
    fn from(v: Vector3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vector3Dto> for Vector3 {
    fn from(v: Vector3Dto) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuaternionDto {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl From<Quaternion> for QuaternionDto {
    fn from(q: Quaternion) -> Self {
        Self {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        }
    }
}

impl From<QuaternionDto> for Quaternion {
    fn from(q: QuaternionDto) -> Self {
        Quaternion::new(q.x, q.y, q.z, q.w)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorDto {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl From<Color> for ColorDto {
    fn from(c: Color) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
        }
    }
}

/// Transform report sent by a client for its own vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PlayerUpdateRequestDto {
    pub position: Vector3Dto,
    pub rotation: QuaternionDto,
}

impl From<PlayerUpdateRequestDto> for TransformUpdate {
    fn from(req: PlayerUpdateRequestDto) -> Self {
        Self {
            position: req.position.into(),
            rotation: req.rotation.into(),
        }
    }
}

/// Reply to a Join carrying the generated identity.
#[derive(Debug, Clone, Serialize)]
pub struct JoinResponseDto {
    pub player_id: String,
    pub username: String,
    pub color: ColorDto,
    pub spawn_position: Vector3Dto,
    pub vehicle_type: String,
}

impl From<&Player> for JoinResponseDto {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id.clone(),
            username: player.username.clone(),
            color: player.color.into(),
            spawn_position: player.position.into(),
            vehicle_type: player.vehicle_type.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerUpdateBroadcastDto {
    pub player_id: String,
    pub position: Vector3Dto,
    pub rotation: QuaternionDto,
}

impl PlayerUpdateBroadcastDto {
    pub fn new(player_id: &str, update: TransformUpdate) -> Self {
        Self {
            player_id: player_id.to_string(),
            position: update.position.into(),
            rotation: update.rotation.into(),
        }
    }
}

/// Full player state used by spawn notifications and player lists.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStateDto {
    pub id: String,
    pub username: String,
    pub color: ColorDto,
    pub position: Vector3Dto,
    pub rotation: QuaternionDto,
    pub vehicle_type: String,
}

impl From<&Player> for PlayerStateDto {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            username: player.username.clone(),
            color: player.color.into(),
            position: player.position.into(),
            rotation: player.rotation.into(),
            vehicle_type: player.vehicle_type.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnPlayerDto {
    pub player: PlayerStateDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovePlayerDto {
    pub player_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerListDto {
    pub players: Vec<PlayerStateDto>,
}

impl PlayerListDto {
    pub fn from_players(players: &[Player]) -> Self {
        Self {
            players: players.iter().map(PlayerStateDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GameObjectDto {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Vector3Dto,
    pub rotation: QuaternionDto,
    pub scale: Vector3Dto,
}

impl From<&WorldObject> for GameObjectDto {
    fn from(object: &WorldObject) -> Self {
        Self {
            id: object.id.clone(),
            kind: object.kind.clone(),
            position: object.position.into(),
            rotation: object.rotation.into(),
            scale: object.scale.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldStateDto {
    pub objects: Vec<GameObjectDto>,
}

impl WorldStateDto {
    pub fn from_objects(objects: &[WorldObject]) -> Self {
        Self {
            objects: objects.iter().map(GameObjectDto::from).collect(),
        }
    }
}

const LENGTH_PREFIX: usize = 4;

/// Payload longer than a 4-byte length prefix can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTooLarge(pub usize);

impl fmt::Display for FrameTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame of {} bytes exceeds the {} byte limit", self.0, u32::MAX)
    }
}

impl std::error::Error for FrameTooLarge {}

fn length_header(len: usize) -> Result<[u8; LENGTH_PREFIX], FrameTooLarge> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| FrameTooLarge(len))
}

/// Prefixes `payload` with its length as a 4-byte big-endian integer, for
/// transports that deliver a byte stream instead of discrete messages.
pub fn encode_length_prefixed(payload: &[u8]) -> Result<Vec<u8>, FrameTooLarge> {
    let header = length_header(payload.len())?;
    let mut framed = Vec::with_capacity(LENGTH_PREFIX + payload.len());
    framed.extend_from_slice(&header);
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Splits one length-prefixed frame off the front of `buf`, returning the
/// frame and the remaining bytes. `None` means more bytes are needed.
pub fn decode_length_prefixed(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let header: [u8; LENGTH_PREFIX] = buf.get(..LENGTH_PREFIX)?.try_into().ok()?;
    let len = u32::from_be_bytes(header) as usize;
    let end = LENGTH_PREFIX.checked_add(len)?;
    let frame = buf.get(LENGTH_PREFIX..end)?;
    Some((frame, &buf[end..]))
}
