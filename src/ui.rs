use egui::Context;

use crate::controller::frame_loop::OverlayStatus;
use crate::controller::input::KeyBindings;

/// Build the overlay for this frame and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, status: &OverlayStatus, keys: &KeyBindings) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| match status {
        OverlayStatus::Loading(progress) => draw_loading_screen(ctx, progress.percent),
        OverlayStatus::Ready => draw_controls_hint(ctx, keys),
        OverlayStatus::Degraded(reason) => {
            draw_controls_hint(ctx, keys);
            draw_failure(ctx, reason);
        }
    })
}

pub fn loading_label(percent: f32) -> String {
    // half rounds up
    format!("Loading... {}%", percent.clamp(0.0, 100.0).round() as u32)
}

fn draw_loading_screen(ctx: &Context, percent: f32) {
    let screen = ctx.available_rect();
    ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("loading_dim")))
        .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(128));

    egui::Area::new(egui::Id::new("loading"))
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add(
                    egui::ProgressBar::new(percent / 100.0)
                        .desired_width(200.0)
                        .desired_height(10.0),
                );
                ui.add_space(6.0);
                ui.label(egui::RichText::new(loading_label(percent)).color(egui::Color32::WHITE));
            });
        });
}

fn draw_controls_hint(ctx: &Context, keys: &KeyBindings) {
    egui::Area::new(egui::Id::new("controls_hint"))
        .anchor(egui::Align2::LEFT_BOTTOM, [8.0, -8.0])
        .show(ctx, |ui| {
            let text = format!(
                "{}{}{}{} - Walk   {} - Sprint   Drag - Orbit   Wheel - Zoom",
                keys.forward.to_uppercase(),
                keys.left.to_uppercase(),
                keys.backward.to_uppercase(),
                keys.right.to_uppercase(),
                capitalize(&keys.sprint),
            );
            ui.label(egui::RichText::new(text).small().color(egui::Color32::DARK_GRAY));
        });
}

fn draw_failure(ctx: &Context, reason: &str) {
    egui::Area::new(egui::Id::new("failure"))
        .anchor(egui::Align2::CENTER_TOP, [0.0, 12.0])
        .show(ctx, |ui| {
            egui::Frame::NONE
                .fill(egui::Color32::from_rgb(120, 20, 20))
                .inner_margin(6.0)
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(format!("Character failed to load: {reason}"))
                            .color(egui::Color32::WHITE),
                    );
                });
        });
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LoadProgress;

    #[test]
    fn loading_label_rounds_percent() {
        assert_eq!(loading_label(0.0), "Loading... 0%");
        assert_eq!(loading_label(42.6), "Loading... 43%");
        assert_eq!(loading_label(42.5), "Loading... 43%");
        assert_eq!(loading_label(0.5), "Loading... 1%");
        assert_eq!(loading_label(140.0), "Loading... 100%");
    }

    #[test]
    fn overlay_builds_for_every_status() {
        let ctx = Context::default();
        let keys = KeyBindings::default();
        for status in [
            OverlayStatus::Loading(LoadProgress { percent: 30.0, active: true }),
            OverlayStatus::Ready,
            OverlayStatus::Degraded("model has no scene graph".into()),
        ] {
            // first pass only sizes new areas
            let _ = build_ui(&ctx, egui::RawInput::default(), &status, &keys);
            let output = build_ui(&ctx, egui::RawInput::default(), &status, &keys);
            assert!(!output.shapes.is_empty(), "{status:?}");
        }
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("shift"), "Shift");
        assert_eq!(capitalize(""), "");
    }
}
