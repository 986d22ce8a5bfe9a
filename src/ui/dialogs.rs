use crate::app::ConsoleApp;
use crate::ui::theme;
use crew_timeline::session::NoticeLevel;
use egui::{Context, RichText, Window};
use egui_phosphor::regular as icons;

pub fn show_about_dialog(app: &mut ConsoleApp, ctx: &Context) {
    let mut open = app.show_about;
    Window::new(format!("{}  Crew Timeline", icons::AIRPLANE_TILT))
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .default_width(300.0)
        .anchor(egui::Align2::CENTER_TOP, [0.0, 80.0])
        .show(ctx, |ui| {
            ui.label(
                RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                    .monospace()
                    .color(theme::TEXT_SECONDARY),
            );
            ui.separator();
            ui.label("Concurrent crew activity timelines with rule-based styling.");
            ui.label(
                RichText::new("Search: optional <n>/ or /r /t /rot prefix, then code value pairs.")
                    .small()
                    .color(theme::TEXT_DIM),
            );
        });
    app.show_about = open && !ctx.input(|i| i.key_pressed(egui::Key::Escape));
}

/// Recent notices, newest first.
pub fn show_notices_window(app: &mut ConsoleApp, ctx: &Context) {
    let mut open = app.show_notices;
    let mut clear = false;
    Window::new(format!("{}  Notices", icons::BELL))
        .open(&mut open)
        .resizable(true)
        .default_size([420.0, 260.0])
        .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -32.0])
        .show(ctx, |ui| {
            if app.notice_history.is_empty() {
                ui.label(RichText::new("Nothing to report.").color(theme::TEXT_DIM));
                return;
            }
            egui::ScrollArea::vertical()
                .max_height(220.0)
                .show(ui, |ui| {
                    for notice in app.notice_history.iter().rev() {
                        let (icon, color) = match notice.level {
                            NoticeLevel::Info => (icons::INFO, theme::TEXT_SECONDARY),
                            NoticeLevel::Warning => (icons::WARNING, theme::TEXT_WARNING),
                            NoticeLevel::Error => (icons::WARNING_OCTAGON, theme::TEXT_ERROR),
                        };
                        ui.horizontal_wrapped(|ui| {
                            ui.label(RichText::new(format!("{icon} {}", notice.title)).strong().color(color));
                            ui.label(&notice.message);
                        });
                        ui.separator();
                    }
                });
            if ui.button("Clear").clicked() {
                clear = true;
            }
        });
    if clear {
        app.notice_history.clear();
    }
    app.show_notices = open;
}
