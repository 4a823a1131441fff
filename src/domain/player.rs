// Domain-level player state shared by the registry and the join flow.

use std::fmt;

pub type PlayerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Vehicle models the client knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleType {
    ToyCar,
    Bus,
    GoKart,
    Bulldozer,
    Crane,
    Truck,
}

impl VehicleType {
    pub const ALL: [VehicleType; 6] = [
        VehicleType::ToyCar,
        VehicleType::Bus,
        VehicleType::GoKart,
        VehicleType::Bulldozer,
        VehicleType::Crane,
        VehicleType::Truck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::ToyCar => "ToyCar",
            VehicleType::Bus => "Bus",
            VehicleType::GoKart => "GoKart",
            VehicleType::Bulldozer => "Bulldozer",
            VehicleType::Crane => "Crane",
            VehicleType::Truck => "Truck",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A joined driver. Position and rotation are client-authoritative and are
/// replaced together on every accepted update.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Application-level id sent to clients.
    pub id: PlayerId,
    /// Transport session that owns this player; the same string as `id` today.
    pub session_id: String,
    /// Generated display name, `{adjective}{noun}{nnn}`.
    pub username: String,
    pub color: Color,
    pub vehicle_type: VehicleType,
    pub position: Vector3,
    pub rotation: Quaternion,
}
