use egui::{Color32, LayerId, Order, Pos2, Rect, RichText, Rounding, Stroke, Ui, Vec2};
use egui_phosphor::regular as icons;

use crate::app::{ConsoleApp, PanelAction};
use crate::ui::{theme, timeline_canvas};
use crew_timeline::model::{LoadState, TimelineEntry};
use crew_timeline::session::DragState;

/// Stack every open timeline vertically, sized by its height ratio.
pub fn show_timelines(app: &ConsoleApp, ui: &mut Ui) -> Vec<PanelAction> {
    let mut actions = Vec::new();
    let entries = app.session.timelines.snapshot();
    if entries.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label(
                RichText::new("No timelines open. Type a query above or use Timelines → New.")
                    .color(theme::TEXT_DIM),
            );
        });
        return actions;
    }

    let total_height = ui.available_height();
    let minimized = entries.iter().filter(|e| e.minimized).count() as f32;
    let open_ratio: f32 = entries
        .iter()
        .filter(|e| !e.minimized)
        .map(|e| e.height_ratio)
        .sum();
    let free = (total_height - minimized * theme::MINIMIZED_HEIGHT).max(0.0);

    for (index, entry) in entries.iter().enumerate() {
        let height = if entry.minimized {
            theme::MINIMIZED_HEIGHT
        } else if open_ratio > 0.0 {
            free * entry.height_ratio / open_ratio
        } else {
            free
        };
        let width = ui.available_width();
        ui.allocate_ui(Vec2::new(width, height), |ui| {
            ui.set_min_size(Vec2::new(width, height));
            egui::Frame::default()
                .stroke(Stroke::new(1.0, theme::BORDER_SUBTLE))
                .show(ui, |ui| {
                    show_panel_header(app, index, entry, ui, &mut actions);
                    if entry.minimized {
                        return;
                    }
                    if let Some(viewport) = app.viewports.get(&entry.id) {
                        timeline_canvas::show_timeline_canvas(
                            &app.session,
                            entry,
                            viewport,
                            ui,
                            &mut actions,
                        );
                    }
                });
        });
    }

    let drag = app.session.drag.snapshot();
    if drag.active {
        paint_drag_ghost(ui.ctx(), &drag);
    }
    actions
}

fn show_panel_header(
    app: &ConsoleApp,
    index: usize,
    entry: &TimelineEntry,
    ui: &mut Ui,
    actions: &mut Vec<PanelAction>,
) {
    ui.horizontal(|ui| {
        ui.set_height(theme::PANEL_HEADER_HEIGHT);

        let caret = if entry.minimized {
            icons::CARET_RIGHT
        } else {
            icons::CARET_DOWN
        };
        if ui
            .small_button(caret)
            .on_hover_text(if entry.minimized { "Restore" } else { "Minimize" })
            .clicked()
        {
            actions.push(PanelAction::ToggleMinimize(entry.id));
        }

        ui.label(
            RichText::new(format!("{}/ {}", index + 1, entry.kind.label()))
                .strong()
                .color(theme::TEXT_PRIMARY),
        );
        let query = if entry.filters.is_empty() {
            "no query".to_string()
        } else {
            entry.filters.summary()
        };
        ui.label(RichText::new(query).font(theme::font_sub()).color(theme::TEXT_SECONDARY));

        match &entry.state {
            LoadState::Loading => {
                ui.add(
                    egui::ProgressBar::new(f32::from(entry.progress) / 100.0)
                        .desired_width(120.0)
                        .show_percentage(),
                );
            }
            LoadState::Error(message) => {
                ui.label(
                    RichText::new(format!("{} {message}", icons::WARNING))
                        .color(theme::TEXT_ERROR),
                );
            }
            LoadState::Ready => {
                ui.label(
                    RichText::new(format!(
                        "{} crew · {} activities",
                        entry.persons().len(),
                        entry.flights.len()
                    ))
                    .font(theme::font_sub())
                    .color(theme::TEXT_DIM),
                );
            }
            LoadState::Idle => {}
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.small_button(icons::X).on_hover_text("Close").clicked() {
                actions.push(PanelAction::Close(entry.id));
            }
            if ui
                .add_enabled(
                    !entry.state.is_loading(),
                    egui::Button::new(icons::ARROW_CLOCKWISE).small(),
                )
                .on_hover_text("Redraw and fit")
                .clicked()
            {
                actions.push(PanelAction::Redraw(entry.id));
            }
            if ui
                .small_button(icons::ARROWS_OUT_LINE_HORIZONTAL)
                .on_hover_text("Reset zoom")
                .clicked()
            {
                actions.push(PanelAction::ResetZoom(entry.id));
            }
            if ui.small_button(icons::MAGNIFYING_GLASS_PLUS).clicked() {
                actions.push(PanelAction::ZoomIn(entry.id));
            }
            if let Some(zoom) = app.session.zoom.zoom_value(entry.id) {
                ui.label(
                    RichText::new(format!("{zoom:.1} px/h"))
                        .font(theme::font_small())
                        .color(theme::TEXT_DIM),
                );
            }
            if ui.small_button(icons::MAGNIFYING_GLASS_MINUS).clicked() {
                actions.push(PanelAction::ZoomOut(entry.id));
            }
        });
    });
}

/// Floating label that follows the row being dragged.
fn paint_drag_ghost(ctx: &egui::Context, drag: &DragState) {
    let Some(pointer) = ctx.pointer_latest_pos() else {
        return;
    };
    let painter = ctx.layer_painter(LayerId::new(Order::Tooltip, egui::Id::new("row-drag-ghost")));
    let label = drag.group_key.clone().unwrap_or_default();
    let rect = Rect::from_min_size(
        Pos2::new(pointer.x + 12.0, drag.visual_y),
        Vec2::new(theme::SIDEBAR_WIDTH, theme::ROW_HEIGHT),
    );
    painter.rect(
        rect,
        Rounding::same(4.0),
        Color32::from_rgba_premultiplied(40, 60, 100, 200),
        Stroke::new(1.0, theme::BORDER_ACCENT),
    );
    painter.text(
        Pos2::new(rect.left() + 6.0, rect.center().y),
        egui::Align2::LEFT_CENTER,
        format!("{label}  ({} activities)", drag.records.len()),
        theme::font_bar(),
        theme::TEXT_PRIMARY,
    );
}
