/// Platform-agnostic input handling
use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),

    // Orbit camera
    PointerDown,
    PointerUp,
    PointerMove { dx: f32, dy: f32 },
    Wheel { delta_y: f32 },

    FocusLost,
    VisibilityChanged { visible: bool },
}

/// The held-key record the character controller reads every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
}

impl MovementInput {
    /// Sprint on its own is not movement.
    pub fn is_moving(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Sprint,
}

/// Unified input state shared between event handlers and the frame loop
#[derive(Debug, Default)]
pub struct InputState {
    pub movement: MovementInput,
    pub dragging: bool,
    pub look_delta: (f32, f32),
    pub zoom_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_action(&mut self, action: Action, held: bool) {
        let m = &mut self.movement;
        match action {
            Action::Forward => m.forward = held,
            Action::Backward => m.backward = held,
            Action::Left => m.left = held,
            Action::Right => m.right = held,
            Action::Sprint => m.sprint = held,
        }
    }

    pub fn clear_keys(&mut self) {
        self.movement = MovementInput::default();
        self.dragging = false;
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.look_delta)
    }

    pub fn consume_zoom(&mut self) -> f32 {
        std::mem::take(&mut self.zoom_delta)
    }
}

/// Key mapping configuration, compared case-insensitively against `KeyboardEvent.key`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub sprint: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            sprint: "shift".to_string(),
        }
    }
}

impl KeyBindings {
    pub fn action_for(&self, key: &str) -> Option<Action> {
        [
            (&self.forward, Action::Forward),
            (&self.backward, Action::Backward),
            (&self.left, Action::Left),
            (&self.right, Action::Right),
            (&self.sprint, Action::Sprint),
        ]
        .into_iter()
        .find(|(bound, _)| key.eq_ignore_ascii_case(bound))
        .map(|(_, action)| action)
    }
}

/// Input service: owns the shared [`InputState`] and applies events to it.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct InputTracker {
    state: Rc<RefCell<InputState>>,
    bindings: KeyBindings,
}

impl InputTracker {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            state: Rc::new(RefCell::new(InputState::new())),
            bindings,
        }
    }

    pub fn state(&self) -> &Rc<RefCell<InputState>> {
        &self.state
    }

    pub fn movement(&self) -> MovementInput {
        self.state.borrow().movement
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Apply one event. Returns true when the event was bound to an action.
    pub fn handle(&self, event: &InputEvent) -> bool {
        let mut state = self.state.borrow_mut();
        match event {
            InputEvent::KeyDown(key) | InputEvent::KeyUp(key) => {
                let held = matches!(event, InputEvent::KeyDown(_));
                if let Some(action) = self.bindings.action_for(key) {
                    state.set_action(action, held);
                    return true;
                }
            }
            InputEvent::PointerDown => state.dragging = true,
            InputEvent::PointerUp => state.dragging = false,
            InputEvent::PointerMove { dx, dy } => {
                if state.dragging {
                    state.look_delta.0 += dx;
                    state.look_delta.1 += dy;
                }
            }
            InputEvent::Wheel { delta_y } => state.zoom_delta += delta_y,
            InputEvent::FocusLost | InputEvent::VisibilityChanged { .. } => state.clear_keys(),
        }
        false
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};
    use web_sys::{Event, EventTarget, KeyboardEvent, MouseEvent, WheelEvent};

    type Listener = (EventTarget, &'static str, Closure<dyn FnMut(Event)>);

    /// Browser listeners feeding an [`InputTracker`].
    ///
    /// Registered on `attach`, removed again when dropped.
    pub struct KeyboardListeners {
        listeners: Vec<Listener>,
    }

    impl KeyboardListeners {
        pub fn attach(
            tracker: &InputTracker,
            window: &web_sys::Window,
            document: &web_sys::Document,
            canvas: &web_sys::HtmlCanvasElement,
        ) -> Result<Self, JsValue> {
            let mut this = Self { listeners: Vec::new() };
            let win: &EventTarget = window.as_ref();
            let doc: &EventTarget = document.as_ref();
            let cvs: &EventTarget = canvas.as_ref();

            this.listen(win, "keydown", tracker, |e| {
                let e = e.dyn_ref::<KeyboardEvent>()?;
                Some(InputEvent::KeyDown(e.key()))
            })?;
            this.listen(win, "keyup", tracker, |e| {
                let e = e.dyn_ref::<KeyboardEvent>()?;
                Some(InputEvent::KeyUp(e.key()))
            })?;
            this.listen(win, "blur", tracker, |_| Some(InputEvent::FocusLost))?;
            {
                let doc_vis = document.clone();
                this.listen(doc, "visibilitychange", tracker, move |_| {
                    Some(InputEvent::VisibilityChanged { visible: !doc_vis.hidden() })
                })?;
            }
            this.listen(cvs, "mousedown", tracker, |e| {
                e.dyn_ref::<MouseEvent>().filter(|m| m.button() == 0)?;
                Some(InputEvent::PointerDown)
            })?;
            this.listen(win, "mouseup", tracker, |_| Some(InputEvent::PointerUp))?;
            this.listen(win, "mousemove", tracker, |e| {
                let m = e.dyn_ref::<MouseEvent>()?;
                Some(InputEvent::PointerMove {
                    dx: m.movement_x() as f32,
                    dy: m.movement_y() as f32,
                })
            })?;
            this.listen(cvs, "wheel", tracker, |e| {
                let w = e.dyn_ref::<WheelEvent>()?;
                e.prevent_default();
                Some(InputEvent::Wheel { delta_y: w.delta_y() as f32 })
            })?;

            tracing::debug!(count = this.listeners.len(), "input listeners attached");
            Ok(this)
        }

        fn listen(
            &mut self,
            target: &EventTarget,
            kind: &'static str,
            tracker: &InputTracker,
            translate: impl Fn(&Event) -> Option<InputEvent> + 'static,
        ) -> Result<(), JsValue> {
            let tracker = tracker.clone();
            let closure = Closure::wrap(Box::new(move |e: Event| {
                if let Some(event) = translate(&e) {
                    if tracker.handle(&event) {
                        e.prevent_default();
                    }
                }
            }) as Box<dyn FnMut(Event)>);
            target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
            self.listeners.push((target.clone(), kind, closure));
            Ok(())
        }
    }

    impl Drop for KeyboardListeners {
        fn drop(&mut self) {
            for (target, kind, closure) in self.listeners.drain(..) {
                let _ = target.remove_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            }
            tracing::debug!("input listeners removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> InputTracker {
        InputTracker::new(KeyBindings::default())
    }

    #[test]
    fn starts_with_nothing_held() {
        assert_eq!(tracker().movement(), MovementInput::default());
    }

    #[test]
    fn key_down_and_up_toggle_flags() {
        let t = tracker();
        t.handle(&InputEvent::KeyDown("w".into()));
        t.handle(&InputEvent::KeyDown("d".into()));
        let m = t.movement();
        assert!(m.forward && m.right);
        assert!(!m.backward && !m.left && !m.sprint);

        t.handle(&InputEvent::KeyUp("w".into()));
        let m = t.movement();
        assert!(!m.forward && m.right);
    }

    #[test]
    fn keys_match_case_insensitively() {
        let t = tracker();
        t.handle(&InputEvent::KeyDown("W".into()));
        t.handle(&InputEvent::KeyDown("Shift".into()));
        let m = t.movement();
        assert!(m.forward && m.sprint);

        t.handle(&InputEvent::KeyUp("w".into()));
        t.handle(&InputEvent::KeyUp("SHIFT".into()));
        assert_eq!(t.movement(), MovementInput::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let t = tracker();
        assert!(!t.handle(&InputEvent::KeyDown("q".into())));
        assert!(!t.handle(&InputEvent::KeyDown("ArrowUp".into())));
        assert_eq!(t.movement(), MovementInput::default());
    }

    #[test]
    fn repeated_key_down_is_idempotent() {
        let t = tracker();
        for _ in 0..5 {
            t.handle(&InputEvent::KeyDown("a".into()));
        }
        assert!(t.movement().left);
        t.handle(&InputEvent::KeyUp("a".into()));
        assert!(!t.movement().left);
    }

    #[test]
    fn focus_loss_releases_everything() {
        let t = tracker();
        t.handle(&InputEvent::KeyDown("w".into()));
        t.handle(&InputEvent::KeyDown("shift".into()));
        t.handle(&InputEvent::FocusLost);
        assert_eq!(t.movement(), MovementInput::default());
    }

    #[test]
    fn sprint_alone_is_not_moving() {
        let m = MovementInput { sprint: true, ..Default::default() };
        assert!(!m.is_moving());
    }

    #[test]
    fn pointer_moves_only_count_while_dragging() {
        let t = tracker();
        t.handle(&InputEvent::PointerMove { dx: 4.0, dy: 2.0 });
        assert_eq!(t.state().borrow_mut().consume_look(), (0.0, 0.0));

        t.handle(&InputEvent::PointerDown);
        t.handle(&InputEvent::PointerMove { dx: 4.0, dy: 2.0 });
        t.handle(&InputEvent::PointerMove { dx: 1.0, dy: -1.0 });
        assert_eq!(t.state().borrow_mut().consume_look(), (5.0, 1.0));
        assert_eq!(t.state().borrow_mut().consume_look(), (0.0, 0.0));
    }

    #[test]
    fn custom_bindings_replace_defaults() {
        let t = InputTracker::new(KeyBindings {
            forward: "ArrowUp".into(),
            ..KeyBindings::default()
        });
        t.handle(&InputEvent::KeyDown("w".into()));
        assert!(!t.movement().forward);
        t.handle(&InputEvent::KeyDown("arrowup".into()));
        assert!(t.movement().forward);
    }
}
