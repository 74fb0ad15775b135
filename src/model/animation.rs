//! Keyframed node animation and clip playback

use glam::{Quat, Vec3};

use crate::error::AssetError;
use crate::model::scene_graph::Pose;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Stored as the spline's key values only; sampled linearly.
    CubicSpline,
}

#[derive(Debug, Clone)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub node: usize,
    pub times: Vec<f32>,
    pub values: ChannelValues,
    pub interpolation: Interpolation,
}

/// Locate the keyframe pair around `time`: (prev, next, blend).
/// Clamps before the first and after the last key.
fn keyframe_span(times: &[f32], time: f32) -> Option<(usize, usize, f32)> {
    let last = times.len().checked_sub(1)?;
    let next = times.partition_point(|&t| t <= time);
    if next == 0 {
        return Some((0, 0, 0.0));
    }
    if next > last {
        return Some((last, last, 0.0));
    }
    let prev = next - 1;
    let span = times[next] - times[prev];
    let t = if span > 0.0 { (time - times[prev]) / span } else { 0.0 };
    Some((prev, next, t))
}

impl Channel {
    /// Sample this channel at `time` and write the result into `pose`.
    pub fn apply(&self, time: f32, pose: &mut Pose) {
        let Some(local) = pose.locals.get_mut(self.node) else { return };
        let Some((a, b, t)) = keyframe_span(&self.times, time) else { return };
        let t = if self.interpolation == Interpolation::Step { 0.0 } else { t };

        match &self.values {
            ChannelValues::Translation(v) => {
                if let (Some(va), Some(vb)) = (v.get(a), v.get(b)) {
                    local.translation = va.lerp(*vb, t);
                }
            }
            ChannelValues::Scale(v) => {
                if let (Some(va), Some(vb)) = (v.get(a), v.get(b)) {
                    local.scale = va.lerp(*vb, t);
                }
            }
            ChannelValues::Rotation(v) => {
                if let (Some(qa), Some(qb)) = (v.get(a), v.get(b)) {
                    local.rotation = qa.slerp(*qb, t).normalize();
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0f32, f32::max);
        Self { name: name.into(), duration, channels }
    }

    pub fn sample_into(&self, time: f32, pose: &mut Pose) {
        for channel in &self.channels {
            channel.apply(time, pose);
        }
    }
}

/// Playback controls the character controller drives.
pub trait AnimationPlayer {
    fn clip_names(&self) -> Vec<&str>;
    fn play(&mut self, clip: &str) -> Result<(), AssetError>;
    fn set_paused(&mut self, paused: bool);
    fn set_rate(&mut self, rate: f32);
}

/// Plays one clip at a time, looping, with pause and rate control.
#[derive(Debug, Clone)]
pub struct ClipPlayer {
    clips: Vec<AnimationClip>,
    current: Option<usize>,
    time: f32,
    rate: f32,
    paused: bool,
}

impl ClipPlayer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            current: None,
            time: 0.0,
            rate: 1.0,
            paused: true,
        }
    }

    /// Case-insensitive lookup: exact name first, then substring.
    pub fn find_clip(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.clips
            .iter()
            .position(|c| c.name.to_lowercase() == wanted)
            .or_else(|| {
                self.clips
                    .iter()
                    .position(|c| c.name.to_lowercase().contains(&wanted))
            })
    }

    /// Resolve the walk cycle by name, falling back to the first clip.
    pub fn resolve_walk_clip(&self, preferred: &str) -> Result<String, AssetError> {
        if let Some(idx) = self.find_clip(preferred) {
            return Ok(self.clips[idx].name.clone());
        }
        match self.clips.first() {
            Some(first) => {
                tracing::warn!(
                    wanted = preferred,
                    using = %first.name,
                    "walk clip not found by name, falling back to first clip"
                );
                Ok(first.name.clone())
            }
            None => Err(AssetError::MissingClips),
        }
    }

    pub fn current_clip(&self) -> Option<&AnimationClip> {
        self.current.and_then(|i| self.clips.get(i))
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Move the playhead by `dt * rate`, wrapping at the clip end.
    pub fn advance(&mut self, dt: f32) {
        if self.paused {
            return;
        }
        let Some(duration) = self.current_clip().map(|c| c.duration) else { return };
        if duration <= 0.0 {
            return;
        }
        self.time = (self.time + dt * self.rate).rem_euclid(duration);
    }

    pub fn sample_into(&self, pose: &mut Pose) {
        if let Some(clip) = self.current_clip() {
            clip.sample_into(self.time, pose);
        }
    }
}

impl AnimationPlayer for ClipPlayer {
    fn clip_names(&self) -> Vec<&str> {
        self.clips.iter().map(|c| c.name.as_str()).collect()
    }

    fn play(&mut self, clip: &str) -> Result<(), AssetError> {
        let idx = self
            .clips
            .iter()
            .position(|c| c.name == clip)
            .ok_or_else(|| AssetError::ClipNotFound(clip.to_string()))?;
        self.current = Some(idx);
        self.time = 0.0;
        self.paused = false;
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }
}
