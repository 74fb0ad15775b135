use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::Window,
};

use stroll::assets::FileProvider;
use stroll::config::StrollConfig;
use stroll::controller::{CameraUniform, FrameLoopContext, InputEvent, InputTracker, LightingUniform};
use stroll::view::{GpuContext, RenderState};
use stroll::{logging, ui};

/// Walk a glTF character around a studio stage.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Model to load (overrides `model.path` from the config)
    #[arg(long)]
    model: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `stroll=debug` (defaults to RUST_LOG, then info)
    #[arg(long)]
    log: Option<String>,
}

struct App {
    gpu: GpuContext,
    window: Arc<Window>,
    render_state: RenderState,
    frame_ctx: FrameLoopContext,
    lighting: LightingUniform,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    // Frame timing
    last_frame_time: std::time::Instant,
}

impl App {
    async fn new(window: Arc<Window>, config: StrollConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let gpu = GpuContext::new_native(window.clone(), size.width, size.height)
            .await
            .context("GPU init failed")?;

        let render_state = RenderState::new(
            gpu.device.as_ref(),
            gpu.format,
            gpu.config.alpha_mode,
            gpu.config.width,
            gpu.config.height,
        );

        let input = InputTracker::new(config.keys.clone());
        let frame_ctx = FrameLoopContext::new(
            config,
            input,
            Box::new(FileProvider::new()),
            gpu.config.width,
            gpu.config.height,
        );

        // Initialize egui
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(egui_ctx.clone(), egui::ViewportId::ROOT, &window, None, None, None);

        Ok(Self {
            gpu,
            window,
            render_state,
            frame_ctx,
            lighting: LightingUniform::default(),
            egui_state,
            egui_ctx,
            last_frame_time: std::time::Instant::now(),
        })
    }

    /// Feed a window event to egui and the input tracker. Returns true if consumed.
    fn input(&mut self, event: &WindowEvent) -> bool {
        let _ = self.egui_state.on_window_event(self.window.as_ref(), event);

        let translated = match event {
            WindowEvent::KeyboardInput { event: KeyEvent { state, logical_key, .. }, .. } => {
                key_name(logical_key).map(|key| match state {
                    ElementState::Pressed => InputEvent::KeyDown(key),
                    ElementState::Released => InputEvent::KeyUp(key),
                })
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => Some(match state {
                ElementState::Pressed => InputEvent::PointerDown,
                ElementState::Released => InputEvent::PointerUp,
            }),
            WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::Wheel { delta_y: wheel_delta_y(delta) }),
            WindowEvent::Focused(false) => Some(InputEvent::FocusLost),
            WindowEvent::Occluded(occluded) => Some(InputEvent::VisibilityChanged { visible: !occluded }),
            _ => None,
        };

        match translated {
            Some(e) => {
                self.frame_ctx.input.handle(&e);
                true
            }
            None => false,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.render_state
                .resize(&self.gpu.device, &self.gpu.surface, new_size.width, new_size.height);
            self.frame_ctx.resize(new_size.width, new_size.height);
        }
    }

    fn update(&mut self, dt: f32) {
        self.frame_ctx.update(dt);
        self.render_state
            .character
            .write(&self.gpu.device, &self.gpu.queue, &self.frame_ctx.character_mesh());
        self.render_state.write_uniforms(
            &self.gpu.queue,
            &CameraUniform::from_camera(&self.frame_ctx.camera),
            &self.lighting,
        );

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut output = ui::build_ui(
            &self.egui_ctx,
            raw_input,
            &self.frame_ctx.status(),
            self.frame_ctx.input.bindings(),
        );
        self.egui_state
            .handle_platform_output(&self.window, std::mem::take(&mut output.platform_output));

        let dpr = self.window.scale_factor() as f32;
        self.render_state.egui_primitives = Some(self.egui_ctx.tessellate(std::mem::take(&mut output.shapes), dpr));
        self.render_state.egui_full_output = Some(output);
        self.render_state.egui_dpr = dpr;
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.render_state.draw_frame(&self.gpu.device, &self.gpu.queue, &self.gpu.surface)
    }
}

/// Key names as the browser reports them, so bindings are shared across platforms.
fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Character(c) => Some(c.to_string()),
        Key::Named(NamedKey::Shift) => Some("shift".to_string()),
        Key::Named(NamedKey::Space) => Some(" ".to_string()),
        _ => None,
    }
}

/// Browser convention: positive `deltaY` scrolls down, which zooms out.
fn wheel_delta_y(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * 100.0,
        MouseScrollDelta::PixelDelta(p) => -p.y as f32,
    }
}

fn load_config(args: &Args) -> anyhow::Result<StrollConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            StrollConfig::from_toml(&src).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => StrollConfig::default(),
    };
    if let Some(model) = &args.model {
        config.model.path = model.to_string_lossy().into_owned();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.log.as_deref());

    let config = load_config(&args)?;
    tracing::info!(model = %config.model.path, walk_clip = %config.model.walk_clip, "starting");

    let event_loop = EventLoop::new().context("creating event loop")?;
    let window_attributes = Window::default_attributes()
        .with_title("stroll")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    #[allow(deprecated)]
    let window = Arc::new(event_loop.create_window(window_attributes).context("creating window")?);

    let mut app = pollster::block_on(App::new(window.clone(), config))?;

    #[allow(deprecated)]
    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                if !app.input(event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::Resized(physical_size) => {
                            app.resize(*physical_size);
                        }
                        WindowEvent::RedrawRequested => {
                            let now = std::time::Instant::now();
                            let dt = (now - app.last_frame_time).as_secs_f32();
                            app.last_frame_time = now;
                            app.update(dt);
                            match app.render() {
                                Ok(_) => {}
                                Err(wgpu::SurfaceError::OutOfMemory) => {
                                    tracing::error!("GPU out of memory, exiting");
                                    elwt.exit();
                                }
                                Err(e) => tracing::warn!(error = %e, "frame dropped"),
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::DeviceEvent { event: DeviceEvent::MouseMotion { delta }, .. } => {
                app.frame_ctx.input.handle(&InputEvent::PointerMove { dx: delta.0 as f32, dy: delta.1 as f32 });
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_and_letters_map_to_browser_names() {
        assert_eq!(key_name(&Key::Named(NamedKey::Shift)).as_deref(), Some("shift"));
        assert_eq!(key_name(&Key::Character("W".into())).as_deref(), Some("W"));
        assert_eq!(key_name(&Key::Named(NamedKey::Escape)), None);
    }

    #[test]
    fn model_flag_overrides_config() {
        let args = Args::parse_from(["stroll", "--model", "assets/robot.glb"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.model.path, "assets/robot.glb");
        assert_eq!(config.model.walk_clip, "walk");
    }
}
