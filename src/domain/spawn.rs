// Randomized identity and spawn generation for newly joined players.

use super::player::{Color, Player, Quaternion, Vector3, VehicleType};
use rand::Rng;

pub const ADJECTIVES: [&str; 15] = [
    "Fast",
    "Quick",
    "Speedy",
    "Turbo",
    "Racing",
    "Cool",
    "Super",
    "Mega",
    "Ultra",
    "Epic",
    "Wild",
    "Crazy",
    "Swift",
    "Rapid",
    "Lightning",
];

pub const NOUNS: [&str; 15] = [
    "Racer",
    "Driver",
    "Pilot",
    "Rider",
    "Cruiser",
    "Drifter",
    "Speedster",
    "Chaser",
    "Runner",
    "Zoomer",
    "Warrior",
    "Champion",
    "Master",
    "Hero",
    "Legend",
];

pub const COLOR_MIN: f32 = 0.3;
pub const COLOR_MAX: f32 = 1.0;
/// Spawn square half-extent on X/Z around the origin.
pub const SPAWN_HALF_EXTENT: f32 = 5.0;
/// Vehicles spawn slightly above the ground plane.
pub const SPAWN_HEIGHT: f32 = 1.2;

/// Adjective + noun + zero-padded three digit suffix, e.g. `TurboDrifter007`.
pub fn generate_username<R: Rng>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let number: u16 = rng.random_range(0..1000);
    format!("{adjective}{noun}{number:03}")
}

pub fn generate_color<R: Rng>(rng: &mut R) -> Color {
    Color {
        r: rng.random_range(COLOR_MIN..=COLOR_MAX),
        g: rng.random_range(COLOR_MIN..=COLOR_MAX),
        b: rng.random_range(COLOR_MIN..=COLOR_MAX),
    }
}

pub fn generate_spawn_position<R: Rng>(rng: &mut R) -> Vector3 {
    Vector3 {
        x: rng.random_range(-SPAWN_HALF_EXTENT..=SPAWN_HALF_EXTENT),
        y: SPAWN_HEIGHT,
        z: rng.random_range(-SPAWN_HALF_EXTENT..=SPAWN_HALF_EXTENT),
    }
}

pub fn generate_vehicle_type<R: Rng>(rng: &mut R) -> VehicleType {
    VehicleType::ALL[rng.random_range(0..VehicleType::ALL.len())]
}

/// Builds a fresh player for `session_id`. The generation order (name,
/// color, position, vehicle) is fixed so seeded runs stay reproducible.
pub fn spawn_player<R: Rng>(session_id: &str, rng: &mut R) -> Player {
    let username = generate_username(rng);
    let color = generate_color(rng);
    let position = generate_spawn_position(rng);
    let vehicle_type = generate_vehicle_type(rng);

    Player {
        id: session_id.to_string(),
        session_id: session_id.to_string(),
        username,
        color,
        vehicle_type,
        position,
        rotation: Quaternion::IDENTITY,
    }
}
