//! Runtime configuration.
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! yields the stock walking demo.

use std::f32::consts::PI;

use glam::Vec3;
use serde::Deserialize;

use crate::controller::input::KeyBindings;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StrollConfig {
    pub model: ModelConfig,
    pub movement: MovementTuning,
    pub camera: CameraConfig,
    pub keys: KeyBindings,
}

impl StrollConfig {
    pub fn from_toml(src: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(src)
    }
}

/// Which model to load and how to place it under the character transform.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
    /// Name of the walk cycle clip, matched case-insensitively.
    pub walk_clip: String,
    pub scale: f32,
    /// Rest rotation of the model around Y, applied beneath the facing angle.
    pub yaw: f32,
    /// Offset from the character transform to the model origin.
    pub offset: [f32; 3],
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/character.glb".to_string(),
            walk_clip: "walk".to_string(),
            scale: 1.0,
            yaw: PI,
            offset: [0.0, -1.0, 0.0],
        }
    }
}

/// How the facing angle and camera target approach their goals.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Smoothing {
    /// Fixed blend per rendered frame, independent of elapsed time.
    PerFrame { factor: f32 },
    /// Exponential approach with blend `1 - exp(-rate * dt)`.
    TimeScaled { rate: f32 },
}

impl Smoothing {
    pub fn blend(&self, dt: f32) -> f32 {
        match *self {
            Smoothing::PerFrame { factor } => factor,
            Smoothing::TimeScaled { rate } => 1.0 - (-rate * dt).exp(),
        }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::PerFrame { factor: 0.1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovementTuning {
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub walk_rate: f32,
    pub sprint_rate: f32,
    pub turn_smoothing: Smoothing,
    pub camera_smoothing: Smoothing,
    /// Height of the camera focus above the character position.
    pub camera_height: f32,
    pub start_position: [f32; 3],
    pub start_facing: f32,
}

impl MovementTuning {
    pub fn start_position(&self) -> Vec3 {
        Vec3::from_array(self.start_position)
    }
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            walk_speed: 2.5,
            sprint_speed: 5.0,
            walk_rate: 1.0,
            sprint_rate: 1.5,
            turn_smoothing: Smoothing::default(),
            camera_smoothing: Smoothing::default(),
            camera_height: 1.0,
            start_position: [0.0, 1.0, 0.0],
            start_facing: PI,
        }
    }
}

/// Orbit camera placement and limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_deg: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    /// Share of the carried drag and zoom applied per frame; 0 disables inertia.
    pub damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 8.0],
            target: [0.0, 1.0, 0.0],
            fov_deg: 45.0,
            min_distance: 3.0,
            max_distance: 15.0,
            min_polar: 0.0,
            max_polar: PI * 0.75,
            rotate_speed: 0.005,
            zoom_speed: 0.001,
            damping: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = StrollConfig::from_toml("").unwrap();
        assert_eq!(cfg.movement.walk_speed, 2.5);
        assert_eq!(cfg.movement.sprint_speed, 5.0);
        assert_eq!(cfg.movement.turn_smoothing, Smoothing::PerFrame { factor: 0.1 });
        assert_eq!(cfg.model.walk_clip, "walk");
        assert_eq!(cfg.keys.forward, "w");
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let cfg = StrollConfig::from_toml(
            r#"
            [model]
            path = "assets/robot.glb"

            [movement]
            sprint_speed = 8.0
            turn_smoothing = { mode = "time_scaled", rate = 6.0 }

            [keys]
            forward = "ArrowUp"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.model.path, "assets/robot.glb");
        assert_eq!(cfg.model.walk_clip, "walk");
        assert_eq!(cfg.movement.sprint_speed, 8.0);
        assert_eq!(cfg.movement.walk_speed, 2.5);
        assert_eq!(cfg.movement.turn_smoothing, Smoothing::TimeScaled { rate: 6.0 });
        assert_eq!(cfg.keys.forward, "ArrowUp");
        assert_eq!(cfg.keys.backward, "s");
    }

    #[test]
    fn per_frame_blend_ignores_delta() {
        let s = Smoothing::PerFrame { factor: 0.1 };
        assert_eq!(s.blend(1.0 / 60.0), 0.1);
        assert_eq!(s.blend(1.0 / 144.0), 0.1);
    }

    #[test]
    fn time_scaled_blend_grows_with_delta() {
        let s = Smoothing::TimeScaled { rate: 6.0 };
        assert!(s.blend(1.0 / 144.0) < s.blend(1.0 / 30.0));
        assert_eq!(s.blend(0.0), 0.0);
    }
}
