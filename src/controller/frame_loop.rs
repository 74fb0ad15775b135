use glam::{Mat4, Quat, Vec2, Vec3};

use crate::assets::{AssetProvider, LoadProgress};
use crate::config::{ModelConfig, StrollConfig};
use crate::controller::camera_controller::OrbitControls;
use crate::controller::character_controller::{CharacterRig, ControllerMode};
use crate::controller::input::InputTracker;
use crate::model::Camera;
use crate::utils::{self, Mesh};

pub const FALLBACK_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

/// What the overlay should say this frame
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayStatus {
    Loading(LoadProgress),
    Ready,
    Degraded(String),
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            eye: camera.eye.extend(1.0).to_array(),
        }
    }
}

/// Ambient plus a key and a fill directional light.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    /// xyz toward the light, w intensity
    pub key: [f32; 4],
    pub fill: [f32; 4],
    pub ambient: f32,
    pub _pad: [f32; 3],
}

impl Default for LightingUniform {
    fn default() -> Self {
        let key = Vec3::new(5.0, 5.0, 5.0).normalize();
        let fill = Vec3::new(-5.0, 5.0, -5.0).normalize();
        Self {
            key: key.extend(0.8).to_array(),
            fill: fill.extend(0.2).to_array(),
            ambient: 0.5,
            _pad: [0.0; 3],
        }
    }
}

/// Per-frame state shared by the web and native drivers.
pub struct FrameLoopContext {
    pub config: StrollConfig,
    pub input: InputTracker,
    pub orbit: OrbitControls,
    pub camera: Camera,
    provider: Box<dyn AssetProvider>,
    rig: Option<CharacterRig>,
    progress: LoadProgress,
}

impl FrameLoopContext {
    /// Kick off the model load and set up the camera rig.
    pub fn new(
        config: StrollConfig,
        input: InputTracker,
        mut provider: Box<dyn AssetProvider>,
        width: u32,
        height: u32,
    ) -> Self {
        provider.load(&config.model.path);
        let progress = provider.progress();
        Self {
            orbit: OrbitControls::new(&config.camera),
            camera: Camera::new(&config.camera, width, height),
            config,
            input,
            provider,
            rig: None,
            progress,
        }
    }

    pub fn rig(&self) -> Option<&CharacterRig> {
        self.rig.as_ref()
    }

    pub fn status(&self) -> OverlayStatus {
        match &self.rig {
            None => OverlayStatus::Loading(self.progress),
            Some(rig) => match rig.controller.mode() {
                ControllerMode::Normal => OverlayStatus::Ready,
                ControllerMode::Degraded { reason } => OverlayStatus::Degraded(reason.clone()),
            },
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    /// Advance one frame. `dt` is in seconds and gets clamped for hitches.
    pub fn update(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, 0.1);

        if self.rig.is_none() {
            match self.provider.take_resolved() {
                Some(outcome) => {
                    let rig = CharacterRig::mount(outcome, &self.config.movement, &self.config.model.walk_clip);
                    tracing::info!(degraded = rig.controller.is_degraded(), "character mounted");
                    self.rig = Some(rig);
                }
                None => self.progress = self.provider.progress(),
            }
        }

        let movement = self.input.movement();
        if let Some(rig) = self.rig.as_mut() {
            rig.update(&movement, dt, Some(&mut self.orbit));
        }

        let (look, zoom) = {
            let mut state = self.input.state().borrow_mut();
            let (dx, dy) = state.consume_look();
            (Vec2::new(dx, dy), state.consume_zoom())
        };
        self.orbit.apply_input(look, zoom);
        self.orbit.sync_camera(&mut self.camera);
    }

    /// Triangles for the character this frame: the posed model, the fallback
    /// cube when degraded, nothing while loading.
    pub fn character_mesh(&self) -> Mesh {
        let Some(rig) = &self.rig else { return Mesh::empty() };
        match &rig.model {
            Some(model) => {
                let world = rig.transform.matrix() * model_placement(&self.config.model);
                model.scene.posed_mesh(&model.pose, world)
            }
            None => utils::create_cube_mesh(rig.transform.position, 1.0, FALLBACK_COLOR),
        }
    }
}

/// Model origin relative to the character transform.
pub fn model_placement(model: &ModelConfig) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        Vec3::splat(model.scale),
        Quat::from_rotation_y(model.yaw),
        Vec3::from_array(model.offset),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::gltf_loader::tests::walking_triangle_glb;
    use crate::assets::{parse_glb, StaticProvider};
    use crate::controller::input::{InputEvent, KeyBindings};
    use crate::error::AssetError;

    fn context(provider: StaticProvider) -> FrameLoopContext {
        let config = StrollConfig::default();
        let input = InputTracker::new(KeyBindings::default());
        FrameLoopContext::new(config, input, Box::new(provider), 800, 600)
    }

    #[test]
    fn loading_shows_no_character_then_mounts() {
        let model = parse_glb(&walking_triangle_glb(true)).unwrap();
        let mut ctx = context(StaticProvider::new(Ok(model)));
        assert!(matches!(ctx.status(), OverlayStatus::Loading(p) if p.active));
        assert!(ctx.character_mesh().is_empty());

        ctx.update(1.0 / 60.0);
        assert_eq!(ctx.status(), OverlayStatus::Ready);
        assert_eq!(ctx.character_mesh().vertices.len(), 3);
    }

    #[test]
    fn failed_load_shows_red_cube() {
        let mut ctx = context(StaticProvider::new(Err(AssetError::MissingScene)));
        ctx.update(1.0 / 60.0);
        assert!(matches!(ctx.status(), OverlayStatus::Degraded(_)));
        let mesh = ctx.character_mesh();
        assert_eq!(mesh.vertices.len(), 24);
        assert!(mesh.vertices.iter().all(|v| v.color == FALLBACK_COLOR));
    }

    #[test]
    fn held_key_moves_character_and_camera_target() {
        let model = parse_glb(&walking_triangle_glb(true)).unwrap();
        let mut ctx = context(StaticProvider::new(Ok(model)));
        ctx.input.handle(&InputEvent::KeyDown("d".into()));
        for _ in 0..30 {
            ctx.update(1.0 / 60.0);
        }
        let rig = ctx.rig().unwrap();
        assert!(rig.transform.position.x > 1.0);
        assert!(ctx.orbit.target().x > 0.0);
        assert_eq!(ctx.camera.target, ctx.orbit.target());
    }

    #[test]
    fn long_hitches_are_clamped() {
        let model = parse_glb(&walking_triangle_glb(true)).unwrap();
        let mut ctx = context(StaticProvider::new(Ok(model)));
        ctx.update(0.0);
        ctx.input.handle(&InputEvent::KeyDown("w".into()));
        ctx.update(5.0);
        let z = ctx.rig().unwrap().transform.position.z;
        assert!((z + 0.25).abs() < 1e-5, "moved to z = {z}");
    }

    #[test]
    fn default_lighting_matches_stage() {
        let light = LightingUniform::default();
        assert_eq!(light.key[3], 0.8);
        assert_eq!(light.fill[3], 0.2);
        assert_eq!(light.ambient, 0.5);
    }
}
