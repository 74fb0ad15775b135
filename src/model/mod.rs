// MODEL: Character state, scene graph, and animation data
pub mod animation;
pub mod camera;
pub mod character;
pub mod scene_graph;

pub use animation::{AnimationClip, AnimationPlayer, ClipPlayer};
pub use camera::Camera;
pub use character::CharacterTransform;
pub use scene_graph::{Pose, SceneGraph};
