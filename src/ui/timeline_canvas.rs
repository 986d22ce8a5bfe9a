use std::sync::Arc;

use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use egui::{Align2, Color32, Painter, Pos2, Rect, Rounding, Sense, Stroke, Ui, Vec2};

use crate::app::PanelAction;
use crate::ui::theme;
use crew_timeline::model::{ActivityRecord, RowKey, RowType, TimelineEntry, TimelineViewport};
use crew_timeline::rules::{Invalidate, RowCanvas, RowRegion, RuleEngine};
use crew_timeline::session::SharedViewport;
use crew_timeline::Session;

const ROW_HEIGHT: f32 = theme::ROW_HEIGHT;
const ROW_PADDING: f32 = theme::ROW_GAP;
const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;
const SIDEBAR_WIDTH: f32 = theme::SIDEBAR_WIDTH;

/// Row rules paint through this, in coordinates relative to the canvas origin.
struct PainterCanvas<'a> {
    painter: &'a Painter,
    origin: Pos2,
}

impl RowCanvas for PainterCanvas<'_> {
    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        self.painter
            .rect_filled(rect.translate(self.origin.to_vec2()), 0.0, color);
    }

    fn label(&mut self, pos: Pos2, text: &str, color: Color32) {
        self.painter.text(
            pos + self.origin.to_vec2(),
            Align2::LEFT_CENTER,
            text,
            theme::font_small(),
            color,
        );
    }
}

/// Render one timeline's rows and bars.
pub fn show_timeline_canvas(
    session: &Session,
    entry: &TimelineEntry,
    viewport: &SharedViewport,
    ui: &mut Ui,
    actions: &mut Vec<PanelAction>,
) {
    let available = ui.available_size();
    let chart_width = available.x.max(SIDEBAR_WIDTH + 50.0);
    viewport.lock().set_width(chart_width - SIDEBAR_WIDTH);

    // Zoom with ctrl+scroll or pinch, pan with horizontal scroll
    if ui.rect_contains_pointer(ui.max_rect()) {
        let (zoom_delta, scroll_x) = ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta.x));
        if let Some(handle) = session.zoom.get(entry.id) {
            if zoom_delta > 1.0 {
                handle.zoom_in();
            } else if zoom_delta < 1.0 {
                handle.zoom_out();
            }
        }
        if scroll_x != 0.0 {
            let mut vp = viewport.lock();
            let hours = -(scroll_x / vp.pixels_per_hour) as f64;
            vp.scroll_hours(hours);
        }
    }

    let vp = viewport.lock().clone();
    let rows = entry.rows();
    let chart_height = HEADER_HEIGHT + rows.len() as f32 * (ROW_HEIGHT + ROW_PADDING) + 20.0;

    let repaint_ctx = ui.ctx().clone();
    let invalidate: Invalidate = Arc::new(move || repaint_ctx.request_repaint());
    let mut engine = session.rule_engine(entry, Some(vp.visible_range()), Some(invalidate));

    egui::ScrollArea::vertical()
        .id_salt(("timeline-scroll", entry.id.to_string()))
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(
                Vec2::new(chart_width, chart_height.max(ui.available_height())),
                Sense::click_and_drag(),
            );
            let origin = response.rect.min;
            let chart_left = origin.x + SIDEBAR_WIDTH;

            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);
            draw_timeline_header(&painter, origin, chart_left, &vp, response.rect.height());

            for (i, row) in rows.iter().enumerate() {
                let y = row_top(origin, i);
                draw_row(
                    session,
                    entry,
                    row,
                    i,
                    y,
                    &painter,
                    origin,
                    chart_width,
                    &mut engine,
                    ui,
                    actions,
                );

                let records = entry.person_records(&row.person_id, row.row_type);
                let bars = painter.with_clip_rect(Rect::from_min_max(
                    Pos2::new(chart_left, y),
                    Pos2::new(response.rect.right(), y + ROW_HEIGHT),
                ));
                for rec in records {
                    draw_activity(
                        session, &engine, rec, row, y, chart_left, &vp, &bars, ui, actions,
                    );
                }
            }

            draw_now_line(&painter, origin, chart_left, &vp, response.rect.height());

            // Background drag pans the time axis
            if response.dragged() && !session.drag.is_active() {
                let dx = response.drag_delta().x;
                let mut shared = viewport.lock();
                let hours = -(dx / shared.pixels_per_hour) as f64;
                shared.scroll_hours(hours);
            }

            handle_row_drop(session, entry, &rows, &painter, origin, &response, ui, actions);
        });
}

fn row_top(origin: Pos2, index: usize) -> f32 {
    origin.y + HEADER_HEIGHT + index as f32 * (ROW_HEIGHT + ROW_PADDING)
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    session: &Session,
    entry: &TimelineEntry,
    row: &RowKey,
    index: usize,
    y: f32,
    painter: &Painter,
    origin: Pos2,
    chart_width: f32,
    engine: &mut RuleEngine,
    ui: &mut Ui,
    actions: &mut Vec<PanelAction>,
) {
    let row_rect = Rect::from_min_size(
        Pos2::new(origin.x, y),
        Vec2::new(chart_width, ROW_HEIGHT + ROW_PADDING),
    );
    if index % 2 == 0 {
        painter.rect_filled(row_rect, 0.0, theme::BG_ROW_ALT);
    }
    let sidebar_rect = Rect::from_min_size(
        Pos2::new(origin.x, y),
        Vec2::new(SIDEBAR_WIDTH, ROW_HEIGHT),
    );
    painter.rect_filled(sidebar_rect, 0.0, theme::BG_SIDEBAR);

    if row.row_type == RowType::Actual {
        let region = RowRegion {
            base_y: y - origin.y,
            row_height: ROW_HEIGHT,
            canvas_width: chart_width,
            sidebar_width: SIDEBAR_WIDTH,
        };
        let mut canvas = PainterCanvas { painter, origin };
        engine.apply_row_rules(&row.person_id, &mut canvas, region);
    }

    let name = entry
        .flights
        .iter()
        .find(|r| r.person_id == row.person_id)
        .map(ActivityRecord::full_name)
        .unwrap_or_default();
    let title = match row.row_type {
        RowType::Actual => format!("{}  {name}", row.person_id),
        RowType::Publish => format!("{}  {}", row.person_id, row.row_type.label()),
    };
    let title_color = match row.row_type {
        RowType::Actual => theme::TEXT_PRIMARY,
        RowType::Publish => theme::TEXT_SECONDARY,
    };
    painter
        .with_clip_rect(sidebar_rect)
        .text(
            Pos2::new(origin.x + 6.0, y + 8.0),
            Align2::LEFT_CENTER,
            title,
            theme::font_bar(),
            title_color,
        );

    if row.row_type == RowType::Actual {
        if let Some(metrics) = session.metrics.get(&row.person_id) {
            painter.text(
                Pos2::new(origin.x + 6.0, y + ROW_HEIGHT - 6.0),
                Align2::LEFT_CENTER,
                format!(
                    "worked {}  ·  off {}/{}",
                    metrics.worked_days, metrics.used_off_days, metrics.entitlement
                ),
                theme::font_small(),
                theme::TEXT_DIM,
            );
        }
    }

    painter.line_segment(
        [
            Pos2::new(origin.x, y + ROW_HEIGHT + ROW_PADDING),
            Pos2::new(origin.x + chart_width, y + ROW_HEIGHT + ROW_PADDING),
        ],
        Stroke::new(0.5, theme::BORDER_SUBTLE),
    );

    // Sidebar: context menu and drag handle
    let response = ui.interact(
        sidebar_rect,
        ui.make_persistent_id(("row-sidebar", entry.id.to_string(), &row.person_id, row.row_type.label())),
        Sense::click_and_drag(),
    );
    if response.hovered() && !session.drag.is_active() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
    }
    if row.row_type == RowType::Actual {
        let has_publish = entry.has_row(&row.person_id, RowType::Publish);
        response.context_menu(|ui| {
            if ui
                .add_enabled(!has_publish, egui::Button::new("Show published row"))
                .clicked()
            {
                actions.push(PanelAction::ShowPublished {
                    timeline: entry.id,
                    person_id: row.person_id.clone(),
                });
                ui.close_menu();
            }
        });
    }
    if response.drag_started() {
        let pointer_y = response.interact_pointer_pos().map(|p| p.y).unwrap_or(y);
        let records: Vec<ActivityRecord> = entry
            .flights
            .iter()
            .filter(|r| r.person_id == row.person_id)
            .cloned()
            .collect();
        session
            .drag
            .begin(entry.id, row.person_id.clone(), records, y, pointer_y - y);
    }
    if response.dragged() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        if let Some(pointer) = response.interact_pointer_pos() {
            let offset = session.drag.snapshot().pointer_offset_y;
            session.drag.update_visual_y(pointer.y - offset);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_activity(
    session: &Session,
    engine: &RuleEngine,
    rec: &ActivityRecord,
    row: &RowKey,
    y: f32,
    chart_left: f32,
    vp: &TimelineViewport,
    painter: &Painter,
    ui: &mut Ui,
    actions: &mut Vec<PanelAction>,
) {
    let (Some(dep), Some(arr)) = (rec.departure_ms(), rec.arrival_ms().or(rec.departure_ms())) else {
        return;
    };
    let x_start = chart_left + vp.time_to_x(dep as f64);
    let x_end = chart_left + vp.time_to_x(arr as f64);
    let clip = painter.clip_rect();
    if x_end < clip.left() && rec.rest.is_none() {
        return;
    }

    let inset = theme::BAR_INSET;
    if let Some(rest) = &rec.rest {
        let rx0 = chart_left + vp.time_to_x(rest.start.timestamp_millis() as f64);
        let rx1 = chart_left + vp.time_to_x(rest.end.timestamp_millis() as f64);
        let fill = if rest.duration_hours < session.settings.rest.min_rest_hours {
            theme::REST_SHORT_FILL
        } else {
            theme::REST_FILL
        };
        let rest_rect = Rect::from_min_max(
            Pos2::new(rx0, y + ROW_HEIGHT * 0.6),
            Pos2::new(rx1.max(rx0 + 1.0), y + ROW_HEIGHT - inset),
        );
        painter.rect_filled(rest_rect, Rounding::same(2.0), fill);
    }
    if x_start > clip.right() || x_end < clip.left() {
        return;
    }

    let style = engine.final_style(rec);
    let fill = style.fill.unwrap_or_else(|| theme::default_fill(rec.is_flight()));
    let bar_width = (x_end - x_start).max(3.0);
    let bar_rect = Rect::from_min_size(
        Pos2::new(x_start, y + inset),
        Vec2::new(bar_width, ROW_HEIGHT * 0.6 - inset),
    );
    let rounding = Rounding::same(theme::BAR_ROUNDING);
    painter.rect_filled(bar_rect, rounding, fill);
    if row.row_type == RowType::Publish {
        painter.rect_filled(bar_rect, rounding, theme::PUBLISH_TINT);
    }
    if let Some(stroke) = style.stroke {
        painter.rect_stroke(bar_rect, rounding, Stroke::new(1.5, stroke));
    }

    if bar_width > 24.0 {
        let label = if rec.is_flight() && !rec.flight_no.is_empty() {
            rec.flight_no.clone()
        } else {
            rec.activity_code.clone()
        };
        let font = style.font.clone().unwrap_or_else(theme::font_bar);
        let galley = painter.layout_no_wrap(label, font, theme::TEXT_ON_BAR);
        let clipped = painter.with_clip_rect(bar_rect.intersect(clip));
        let text_y = bar_rect.top() + (bar_rect.height() - galley.size().y) / 2.0;
        clipped.galley(Pos2::new(bar_rect.left() + 4.0, text_y), galley, Color32::TRANSPARENT);
    }

    let response = ui.interact(
        bar_rect.intersect(clip),
        ui.make_persistent_id(("activity", &rec.data_id, &rec.person_id, dep, row.row_type.label())),
        Sense::click(),
    );
    if response.hovered() {
        egui::show_tooltip_at_pointer(
            ui.ctx(),
            ui.layer_id(),
            egui::Id::new(("activity-tip", &rec.data_id, &rec.person_id, dep)),
            |ui| {
                ui.strong(format!("{} {}", rec.activity_code, rec.flight_no));
                if !rec.departure_port.is_empty() || !rec.arrival_port.is_empty() {
                    ui.label(format!("{} → {}", rec.departure_port, rec.arrival_port));
                }
                ui.label(format!(
                    "{} → {}",
                    format_time(rec.departure_time),
                    format_time(rec.arrival_time)
                ));
                if !rec.plane_tail_name.is_empty() {
                    ui.label(format!("{} {}", rec.plane_cms_type, rec.plane_tail_name));
                }
                if let Some(rest) = &rec.rest {
                    ui.label(format!("Rest after: {:.2} h", rest.duration_hours));
                }
            },
        );
    }
    if rec.is_flight() && !rec.flight_id.is_empty() {
        response.context_menu(|ui| {
            if ui.button("Show crew in new timeline").clicked() {
                actions.push(PanelAction::ShowCrew {
                    flight_id: rec.flight_id.clone(),
                });
                ui.close_menu();
            }
        });
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_row_drop(
    session: &Session,
    entry: &TimelineEntry,
    rows: &[RowKey],
    painter: &Painter,
    origin: Pos2,
    response: &egui::Response,
    ui: &Ui,
    actions: &mut Vec<PanelAction>,
) {
    if !session.drag.is_active() {
        return;
    }
    let Some(pointer) = ui.input(|i| i.pointer.latest_pos()) else {
        return;
    };
    if !response.rect.contains(pointer) {
        return;
    }

    let slot = ((pointer.y - origin.y - HEADER_HEIGHT) / (ROW_HEIGHT + ROW_PADDING)).floor();
    let before = (slot >= 0.0)
        .then(|| rows.get(slot as usize))
        .flatten()
        .map(|row| row.person_id.clone());
    let marker_index = before
        .as_ref()
        .and_then(|p| rows.iter().position(|r| &r.person_id == p))
        .unwrap_or(rows.len());
    let marker_y = row_top(origin, marker_index) - ROW_PADDING / 2.0;
    painter.line_segment(
        [
            Pos2::new(origin.x, marker_y),
            Pos2::new(response.rect.right(), marker_y),
        ],
        Stroke::new(2.0, theme::BORDER_ACCENT),
    );

    if ui.input(|i| i.pointer.any_released()) {
        actions.push(PanelAction::DropRow {
            target: entry.id,
            before_person: before,
        });
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%d/%m %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Spacing of header ticks for a zoom level.
fn tick_step(pixels_per_hour: f32) -> Duration {
    if pixels_per_hour >= 40.0 {
        Duration::hours(1)
    } else if pixels_per_hour >= 12.0 {
        Duration::hours(3)
    } else if pixels_per_hour >= 4.0 {
        Duration::hours(12)
    } else if pixels_per_hour >= 1.0 {
        Duration::days(1)
    } else {
        Duration::days(7)
    }
}

fn draw_timeline_header(
    painter: &Painter,
    origin: Pos2,
    chart_left: f32,
    vp: &TimelineViewport,
    height: f32,
) {
    let width = vp.width + SIDEBAR_WIDTH;
    painter.rect_filled(
        Rect::from_min_size(origin, Vec2::new(width, HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );
    painter.line_segment(
        [
            Pos2::new(origin.x, origin.y + HEADER_HEIGHT),
            Pos2::new(origin.x + width, origin.y + HEADER_HEIGHT),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let range = vp.visible_range();
    let (Some(start), Some(end)) = (range.start_time(), range.end_time()) else {
        return;
    };
    let step = tick_step(vp.pixels_per_hour);
    let Ok(mut tick) = start.duration_trunc(step) else {
        return;
    };
    let grid = painter.with_clip_rect(Rect::from_min_max(
        Pos2::new(chart_left, origin.y),
        Pos2::new(origin.x + width, origin.y + height),
    ));
    while tick <= end {
        let x = chart_left + vp.time_to_x(tick.timestamp_millis() as f64);
        let midnight = tick.hour() == 0 && tick.minute() == 0;
        grid.line_segment(
            [
                Pos2::new(x, origin.y + HEADER_HEIGHT),
                Pos2::new(x, origin.y + height),
            ],
            Stroke::new(if midnight { 1.0 } else { 0.5 }, theme::GRID_LINE),
        );
        if midnight {
            grid.text(
                Pos2::new(x + 3.0, origin.y + 10.0),
                Align2::LEFT_CENTER,
                tick.format("%a %d %b").to_string(),
                theme::font_header(),
                theme::TEXT_PRIMARY,
            );
        }
        if step < Duration::days(1) {
            grid.text(
                Pos2::new(x + 3.0, origin.y + 26.0),
                Align2::LEFT_CENTER,
                tick.format("%H:%M").to_string(),
                theme::font_sub(),
                theme::TEXT_SECONDARY,
            );
        }
        tick += step;
    }
}

fn draw_now_line(
    painter: &Painter,
    origin: Pos2,
    chart_left: f32,
    vp: &TimelineViewport,
    height: f32,
) {
    let x = chart_left + vp.time_to_x(Utc::now().timestamp_millis() as f64);
    if x < chart_left || x > chart_left + vp.width {
        return;
    }
    painter.line_segment(
        [
            Pos2::new(x, origin.y + HEADER_HEIGHT),
            Pos2::new(x, origin.y + height),
        ],
        Stroke::new(1.5, theme::NOW_LINE),
    );

    let badge_w = 34.0;
    let badge_rect = Rect::from_min_size(
        Pos2::new(x - badge_w / 2.0, origin.y + HEADER_HEIGHT - 1.0),
        Vec2::new(badge_w, 14.0),
    );
    painter.rect_filled(badge_rect, Rounding::same(3.0), theme::NOW_LINE);
    painter.text(
        badge_rect.center(),
        Align2::CENTER_CENTER,
        "Now",
        theme::font_small(),
        Color32::WHITE,
    );
}
