pub mod assets;
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
pub use web::start;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use web_sys::{Document, HtmlCanvasElement, Window};

    use crate::assets::FetchProvider;
    use crate::config::StrollConfig;
    use crate::controller::frame_loop::{CameraUniform, FrameLoopContext, LightingUniform};
    use crate::controller::input::wasm::KeyboardListeners;
    use crate::controller::input::InputTracker;
    use crate::view::{GpuContext, RenderState};
    use crate::{logging, ui};

    #[wasm_bindgen(start)]
    pub async fn start() -> Result<(), JsValue> {
        logging::init(None);
        let (window, document, canvas) = init_canvas()?;
        setup_app(&window, &document, &canvas).await
    }

    /// Main application setup for WASM
    async fn setup_app(window: &Window, document: &Document, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
        let (width, height) = canvas_size(window, canvas);
        let gpu = GpuContext::new(canvas, width, height)
            .await
            .map_err(|e| js_error(format!("GPU init failed: {e}")))?;

        let mut config = StrollConfig::default();
        if let Some(model) = model_query_param(window) {
            tracing::info!(%model, "model overridden by query string");
            config.model.path = model;
        }

        let input = InputTracker::new(config.keys.clone());
        let listeners = KeyboardListeners::attach(&input, window, document, canvas)?;

        let mut frame_ctx = FrameLoopContext::new(config, input, Box::new(FetchProvider::new()), width, height);
        let mut render_state = RenderState::new(gpu.device.as_ref(), gpu.format, gpu.config.alpha_mode, width, height);
        let lighting = LightingUniform::default();
        let egui_ctx = egui::Context::default();

        let mut last_time = window.performance().map(|p| p.now()).unwrap_or(0.0);
        let f = RcCellCallback::new(window.clone(), {
            let window = window.clone();
            let canvas = canvas.clone();

            move || {
                // listeners live exactly as long as the frame loop
                let _ = &listeners;

                let now = window.performance().map(|p| p.now()).unwrap_or(last_time);
                let dt = ((now - last_time) / 1000.0) as f32;
                last_time = now;

                let (w, h) = canvas_size(&window, &canvas);
                if render_state.resize(gpu.device.as_ref(), &gpu.surface, w, h) {
                    frame_ctx.resize(w, h);
                }

                frame_ctx.update(dt);
                render_state
                    .character
                    .write(gpu.device.as_ref(), gpu.queue.as_ref(), &frame_ctx.character_mesh());
                render_state.write_uniforms(gpu.queue.as_ref(), &CameraUniform::from_camera(&frame_ctx.camera), &lighting);

                let dpr = window.device_pixel_ratio() as f32;
                let mut raw_input = egui::RawInput::default();
                raw_input.time = Some(now / 1000.0);
                raw_input.screen_rect = Some(egui::Rect::from_min_size(
                    egui::Pos2::ZERO,
                    egui::vec2(w as f32 / dpr, h as f32 / dpr),
                ));
                egui_ctx.set_pixels_per_point(dpr);
                let mut output = ui::build_ui(&egui_ctx, raw_input, &frame_ctx.status(), frame_ctx.input.bindings());
                render_state.egui_primitives = Some(egui_ctx.tessellate(std::mem::take(&mut output.shapes), dpr));
                render_state.egui_full_output = Some(output);
                render_state.egui_dpr = dpr;

                if let Err(e) = render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface) {
                    tracing::warn!(error = %e, "frame dropped");
                }
            }
        });
        f.start()
    }

    fn model_query_param(window: &Window) -> Option<String> {
        let search = window.location().search().ok()?;
        let params = web_sys::UrlSearchParams::new_with_str(&search).ok()?;
        params.get("model").filter(|m| !m.is_empty())
    }

    /// Canvas backing size in device pixels, tracking the CSS size of the page.
    fn canvas_size(window: &Window, canvas: &HtmlCanvasElement) -> (u32, u32) {
        let dpr = window.device_pixel_ratio();
        let css_w = window.inner_width().ok().and_then(|w| w.as_f64()).unwrap_or(800.0);
        let css_h = window.inner_height().ok().and_then(|h| h.as_f64()).unwrap_or(600.0);
        let (w, h) = (((css_w * dpr) as u32).max(1), ((css_h * dpr) as u32).max(1));
        if canvas.width() != w || canvas.height() != h {
            canvas.set_width(w);
            canvas.set_height(h);
        }
        (w, h)
    }

    fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
        let window = web_sys::window().ok_or(js_error("no global `window`"))?;
        let document = window.document().ok_or(js_error("no document on window"))?;
        let body = document.body().ok_or(js_error("no body on document"))?;
        let canvas_el = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error("failed to create canvas"))?;
        canvas_el.style().set_property("width", "100vw")?;
        canvas_el.style().set_property("height", "100vh")?;
        canvas_el.style().set_property("display", "block")?;
        body.style().set_property("margin", "0")?;
        body.style().set_property("background", "#f0f0f0")?;
        body.append_child(&canvas_el)?;
        Ok((window, document, canvas_el))
    }

    fn js_error<E: Into<String>>(msg: E) -> JsValue {
        JsValue::from_str(&msg.into())
    }

    struct RcCellCallback {
        inner: Rc<RefCell<Box<dyn FnMut()>>>,
        window: Window,
    }

    impl RcCellCallback {
        fn new(window: Window, f: impl FnMut() + 'static) -> Self {
            Self {
                inner: Rc::new(RefCell::new(Box::new(f))),
                window,
            }
        }

        fn start(self) -> Result<(), JsValue> {
            let inner = self.inner.clone();
            let window = self.window.clone();

            let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
            let callback_clone = callback.clone();

            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                inner.borrow_mut().as_mut()();

                // Recursively schedule next frame
                if let Some(cb) = callback_clone.borrow().as_ref() {
                    if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        tracing::error!(error = ?e, "requestAnimationFrame failed, frame loop stopped");
                    }
                }
            }) as Box<dyn FnMut()>));

            if let Some(cb) = callback.borrow().as_ref() {
                self.window.request_animation_frame(cb.as_ref().unchecked_ref())?;
            }

            // Leak the closure to keep it alive
            std::mem::forget(callback);
            Ok(())
        }
    }
}
