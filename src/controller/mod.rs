// CONTROLLER: Input, character logic, and the per-frame update
pub mod input;
pub mod camera_controller;
pub mod character_controller;
pub mod frame_loop;

pub use input::{InputEvent, InputState, InputTracker, KeyBindings, MovementInput};
pub use camera_controller::OrbitControls;
pub use character_controller::{CameraTarget, CharacterController, CharacterRig, ControllerMode};
pub use frame_loop::{CameraUniform, FrameLoopContext, LightingUniform, OverlayStatus};
