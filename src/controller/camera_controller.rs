use glam::{Vec2, Vec3};

use crate::config::CameraConfig;
use crate::controller::character_controller::CameraTarget;
use crate::model::Camera;

/// Keeps the polar angle off the poles so `look_at` stays well defined.
const POLE_EPSILON: f32 = 1e-6;

/// Orbit camera around a movable target: drag rotates, wheel zooms, no pan.
///
/// Like an orbit rig in a scene editor, moving the target does not drag the
/// eye along; the eye stays put and re-aims, subject to the distance and
/// polar limits. With damping on, drag and zoom are carried over and spent a
/// fixed share per frame, so the camera coasts after the pointer stops.
pub struct OrbitControls {
    target: Vec3,
    eye: Vec3,
    min_distance: f32,
    max_distance: f32,
    min_polar: f32,
    max_polar: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    damping: f32,
    /// Carried azimuth and polar change, radians.
    pending_angles: Vec2,
    /// Carried zoom as a log scale factor.
    pending_zoom: f32,
}

/// Eye offset from the target in spherical form, polar measured from +Y.
#[derive(Debug, Clone, Copy)]
struct Spherical {
    radius: f32,
    polar: f32,
    azimuth: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self { radius, polar: 0.0, azimuth: 0.0 };
        }
        Self {
            radius,
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            azimuth: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let s = self.polar.sin() * self.radius;
        Vec3::new(s * self.azimuth.sin(), self.polar.cos() * self.radius, s * self.azimuth.cos())
    }
}

impl OrbitControls {
    pub fn new(config: &CameraConfig) -> Self {
        let mut controls = Self {
            target: Vec3::from_array(config.target),
            eye: Vec3::from_array(config.position),
            min_distance: config.min_distance,
            max_distance: config.max_distance.max(config.min_distance),
            min_polar: config.min_polar.max(POLE_EPSILON),
            max_polar: config.max_polar.min(std::f32::consts::PI - POLE_EPSILON),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            damping: config.damping.clamp(0.0, 1.0),
            pending_angles: Vec2::ZERO,
            pending_zoom: 0.0,
        };
        controls.apply_input(Vec2::ZERO, 0.0);
        controls
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn distance(&self) -> f32 {
        self.eye.distance(self.target)
    }

    /// Polar angle of the eye around the target, 0 is straight above.
    pub fn polar(&self) -> f32 {
        Spherical::from_offset(self.eye - self.target).polar
    }

    /// Fold a frame's pointer drag (pixels) and wheel delta into the eye position.
    ///
    /// Call once per frame, with zero input on idle frames so carried motion
    /// keeps decaying.
    pub fn apply_input(&mut self, look: Vec2, zoom: f32) {
        self.pending_angles -= look * self.rotate_speed;
        self.pending_zoom += (1.0 + zoom * self.zoom_speed).max(0.1).ln();

        let share = if self.damping > 0.0 { self.damping } else { 1.0 };
        let angles = self.pending_angles * share;
        let zoom_ln = self.pending_zoom * share;
        self.pending_angles -= angles;
        self.pending_zoom -= zoom_ln;

        let mut s = Spherical::from_offset(self.eye - self.target);
        s.azimuth += angles.x;
        s.polar = (s.polar + angles.y).clamp(self.min_polar, self.max_polar);
        s.radius = (s.radius * zoom_ln.exp()).clamp(self.min_distance, self.max_distance);
        self.eye = self.target + s.to_offset();
    }

    pub fn sync_camera(&self, camera: &mut Camera) {
        camera.eye = self.eye;
        camera.target = self.target;
    }
}

impl CameraTarget for OrbitControls {
    fn target_mut(&mut self) -> &mut Vec3 {
        &mut self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn controls() -> OrbitControls {
        OrbitControls::new(&CameraConfig { damping: 0.0, ..CameraConfig::default() })
    }

    fn damped() -> OrbitControls {
        OrbitControls::new(&CameraConfig::default())
    }

    #[test]
    fn starts_at_configured_placement() {
        let c = controls();
        assert!(c.eye().distance(Vec3::new(0.0, 2.0, 8.0)) < 1e-4);
        assert_eq!(c.target(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut c = controls();
        c.apply_input(Vec2::ZERO, 1.0e6);
        assert!((c.distance() - 15.0).abs() < 1e-3);
        c.apply_input(Vec2::ZERO, -1.0e6);
        assert!((c.distance() - 3.0).abs() < 1e-3);
    }

    #[test]
    fn cannot_look_from_below_the_limit() {
        let mut c = controls();
        c.apply_input(Vec2::new(0.0, -1.0e5), 0.0);
        assert!((c.polar() - PI * 0.75).abs() < 1e-3);
        c.apply_input(Vec2::new(0.0, 1.0e5), 0.0);
        assert!(c.polar() < 1e-3);
    }

    #[test]
    fn horizontal_drag_orbits_at_constant_distance() {
        let mut c = controls();
        let d = c.distance();
        c.apply_input(Vec2::new(200.0, 0.0), 0.0);
        assert!((c.distance() - d).abs() < 1e-4);
        assert!(c.eye().x.abs() > 0.5);
    }

    #[test]
    fn far_target_pulls_eye_within_max_distance() {
        let mut c = controls();
        *c.target_mut() = Vec3::new(0.0, 1.0, -40.0);
        c.apply_input(Vec2::ZERO, 0.0);
        assert!(c.distance() <= 15.0 + 1e-3);
    }

    #[test]
    fn damped_drag_coasts_to_the_full_angle() {
        let mut instant = controls();
        instant.apply_input(Vec2::new(100.0, 0.0), 0.0);
        let goal = instant.eye();

        let mut c = damped();
        c.apply_input(Vec2::new(100.0, 0.0), 0.0);
        let first = c.eye().distance(goal);
        assert!(first > 0.1, "damped drag should not land at once");

        c.apply_input(Vec2::ZERO, 0.0);
        assert!(c.eye().distance(goal) < first, "keeps moving after the drag");

        for _ in 0..400 {
            c.apply_input(Vec2::ZERO, 0.0);
        }
        assert!(c.eye().distance(goal) < 1e-3, "eye {} vs {goal}", c.eye());
    }

    #[test]
    fn damped_zoom_settles_on_the_same_distance() {
        let mut instant = controls();
        instant.apply_input(Vec2::ZERO, 200.0);

        let mut c = damped();
        c.apply_input(Vec2::ZERO, 200.0);
        assert!(c.distance() < instant.distance());
        for _ in 0..400 {
            c.apply_input(Vec2::ZERO, 0.0);
        }
        assert!((c.distance() - instant.distance()).abs() < 1e-3);
    }
}
