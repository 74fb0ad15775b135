use std::f32::consts::PI;

use glam::Vec3;

use crate::assets::LoadedModel;
use crate::config::MovementTuning;
use crate::controller::input::MovementInput;
use crate::error::AssetError;
use crate::model::animation::{AnimationPlayer, ClipPlayer};
use crate::model::character::CharacterTransform;
use crate::model::scene_graph::{Pose, SceneGraph};

/// Anything exposing a mutable look-at point the character can pull along.
pub trait CameraTarget {
    fn target_mut(&mut self) -> &mut Vec3;
}

impl CameraTarget for Vec3 {
    fn target_mut(&mut self) -> &mut Vec3 {
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerMode {
    Normal,
    /// Assets failed to resolve; the fallback cube is shown and nothing moves.
    Degraded { reason: String },
}

/// Sum of the unit contributions of the held direction keys (x right, z back).
pub fn planar_direction(input: &MovementInput) -> Vec3 {
    let mut v = Vec3::ZERO;
    if input.forward {
        v.z -= 1.0;
    }
    if input.backward {
        v.z += 1.0;
    }
    if input.left {
        v.x -= 1.0;
    }
    if input.right {
        v.x += 1.0;
    }
    v
}

/// Facing that looks along `dir`, measured from the model's backward rest orientation.
pub fn facing_for(dir: Vec3) -> f32 {
    PI - dir.x.atan2(dir.z)
}

/// Turns held keys into motion, facing, animation playback and camera follow.
pub struct CharacterController {
    tuning: MovementTuning,
    desired_facing: f32,
    mode: ControllerMode,
}

impl CharacterController {
    pub fn new(tuning: MovementTuning) -> Self {
        Self {
            desired_facing: tuning.start_facing,
            tuning,
            mode: ControllerMode::Normal,
        }
    }

    pub fn degraded(tuning: MovementTuning, reason: impl Into<String>) -> Self {
        Self {
            mode: ControllerMode::Degraded { reason: reason.into() },
            ..Self::new(tuning)
        }
    }

    pub fn mode(&self) -> &ControllerMode {
        &self.mode
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.mode, ControllerMode::Degraded { .. })
    }

    pub fn desired_facing(&self) -> f32 {
        self.desired_facing
    }

    pub fn tuning(&self) -> &MovementTuning {
        &self.tuning
    }

    /// Advance one rendered frame.
    pub fn update(
        &mut self,
        input: &MovementInput,
        delta: f32,
        transform: &mut CharacterTransform,
        animation: &mut dyn AnimationPlayer,
        camera: Option<&mut dyn CameraTarget>,
    ) {
        if self.is_degraded() {
            return;
        }
        let t = &self.tuning;

        if input.is_moving() {
            animation.set_paused(false);
            animation.set_rate(if input.sprint { t.sprint_rate } else { t.walk_rate });
        } else {
            animation.set_paused(true);
        }

        let dir = planar_direction(input);
        if dir.length_squared() > 0.0 {
            let speed = if input.sprint { t.sprint_speed } else { t.walk_speed };
            transform.position += dir.normalize() * speed * delta;
            self.desired_facing = facing_for(dir);
        }

        // Eased every frame, toward the last direction travelled
        let turn = t.turn_smoothing.blend(delta);
        transform.facing += turn * (self.desired_facing - transform.facing);

        if let Some(camera) = camera {
            let goal = transform.position + Vec3::Y * t.camera_height;
            let follow = t.camera_smoothing.blend(delta);
            let target = camera.target_mut();
            *target = target.lerp(goal, follow);
        }
    }
}

/// Model data bound to a mounted character
pub struct MountedModel {
    pub scene: SceneGraph,
    pub player: ClipPlayer,
    pub pose: Pose,
    /// `None` for a static model; the controller still moves it.
    pub walk_clip: Option<String>,
}

/// Everything the frame loop owns for the one character on stage.
pub struct CharacterRig {
    pub controller: CharacterController,
    pub transform: CharacterTransform,
    /// `None` exactly when the controller is degraded.
    pub model: Option<MountedModel>,
}

impl CharacterRig {
    /// Mount the character from the asset provider's outcome.
    ///
    /// Any resolution failure yields a degraded rig; there is no way back
    /// to normal without mounting again.
    pub fn mount(outcome: Result<LoadedModel, AssetError>, tuning: &MovementTuning, walk_clip: &str) -> Self {
        let transform = CharacterTransform::from_tuning(tuning);
        match outcome.and_then(|model| bind_model(model, walk_clip)) {
            Ok(model) => Self {
                controller: CharacterController::new(tuning.clone()),
                transform,
                model: Some(model),
            },
            Err(e) => {
                tracing::error!(error = %e, "character assets failed to resolve, showing fallback");
                Self {
                    controller: CharacterController::degraded(tuning.clone(), e.to_string()),
                    transform,
                    model: None,
                }
            }
        }
    }

    /// Run the controller and advance the walk cycle for one frame.
    pub fn update(&mut self, input: &MovementInput, delta: f32, camera: Option<&mut dyn CameraTarget>) {
        let Some(model) = self.model.as_mut() else { return };
        self.controller
            .update(input, delta, &mut self.transform, &mut model.player, camera);
        model.player.advance(delta);
        model.pose = model.scene.rest_pose();
        model.player.sample_into(&mut model.pose);
    }
}

fn bind_model(model: LoadedModel, walk_clip: &str) -> Result<MountedModel, AssetError> {
    if model.scene.nodes.is_empty() || model.scene.roots.is_empty() {
        return Err(AssetError::MissingScene);
    }

    let mut player = ClipPlayer::new(model.clips);
    let name = if player.clip_names().is_empty() {
        tracing::warn!("model has no animation clips, mounting it static");
        None
    } else {
        let name = player.resolve_walk_clip(walk_clip)?;
        player.play(&name)?;
        player.set_rate(1.0);
        tracing::info!(clip = %name, available = ?player.clip_names(), "walk clip bound");
        Some(name)
    };

    let pose = model.scene.rest_pose();
    Ok(MountedModel { scene: model.scene, player, pose, walk_clip: name })
}
