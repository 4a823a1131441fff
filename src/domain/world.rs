// Static world layout handed to every player on join. Never mutated at runtime.

use super::player::{Quaternion, Vector3};

#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    pub id: String,
    /// "ground" or "obstacle"; serialized as `type`.
    pub kind: String,
    pub position: Vector3,
    pub rotation: Quaternion,
    pub scale: Vector3,
}

/// Read-only set of world objects, fixed when the relay starts.
#[derive(Debug, Clone)]
pub struct World {
    objects: Vec<WorldObject>,
}

impl World {
    /// One ground plane plus four obstacles at the corners of the arena.
    pub fn default_layout() -> Self {
        let mut objects = vec![WorldObject {
            id: "ground".to_string(),
            kind: "ground".to_string(),
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::IDENTITY,
            scale: Vector3::new(50.0, 1.0, 50.0),
        }];

        let obstacles = [
            ("obstacle1", Vector3::new(10.0, 1.0, 10.0)),
            ("obstacle2", Vector3::new(-10.0, 1.0, 10.0)),
            ("obstacle3", Vector3::new(10.0, 1.0, -10.0)),
            ("obstacle4", Vector3::new(-10.0, 1.0, -10.0)),
        ];
        objects.extend(obstacles.into_iter().map(|(id, position)| WorldObject {
            id: id.to_string(),
            kind: "obstacle".to_string(),
            position,
            rotation: Quaternion::IDENTITY,
            scale: Vector3::new(2.0, 2.0, 2.0),
        }));

        Self { objects }
    }

    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }
}

impl Default for World {
    fn default() -> Self {
        Self::default_layout()
    }
}
