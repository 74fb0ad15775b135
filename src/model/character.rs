use glam::{Mat4, Quat, Vec3};

use crate::config::MovementTuning;

/// World placement of the controlled character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterTransform {
    pub position: Vec3,
    /// Rotation around +Y in radians, as currently rendered.
    pub facing: f32,
}

impl CharacterTransform {
    pub fn new(position: Vec3, facing: f32) -> Self {
        Self { position, facing }
    }

    pub fn from_tuning(tuning: &MovementTuning) -> Self {
        Self::new(tuning.start_position(), tuning.start_facing)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(Quat::from_rotation_y(self.facing), self.position)
    }
}

impl Default for CharacterTransform {
    fn default() -> Self {
        Self::from_tuning(&MovementTuning::default())
    }
}
