use egui::style::WidgetVisuals;
use egui::{Color32, FontId, Rounding, Stroke, Visuals};

// ── Palette ──────────────────────────────────────────────────────────────────

pub const BG_DARK: Color32 = Color32::from_rgb(17, 21, 28);
pub const BG_PANEL: Color32 = Color32::from_rgb(23, 28, 37);
pub const BG_HEADER: Color32 = Color32::from_rgb(29, 36, 47);
pub const BG_SIDEBAR: Color32 = Color32::from_rgb(21, 26, 34);
pub const BG_ROW_ALT: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 5);
pub const BG_DROP_TARGET: Color32 = Color32::from_rgba_premultiplied(38, 166, 154, 45);
const BG_INPUT: Color32 = Color32::from_rgb(13, 16, 22);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(43, 51, 64);
pub const BORDER_ACCENT: Color32 = Color32::from_rgb(38, 166, 154);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(224, 230, 238);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(146, 158, 176);
pub const TEXT_DIM: Color32 = Color32::from_rgb(94, 104, 121);
pub const TEXT_ON_BAR: Color32 = Color32::from_rgb(250, 252, 255);
pub const TEXT_ERROR: Color32 = Color32::from_rgb(240, 110, 110);
pub const TEXT_WARNING: Color32 = Color32::from_rgb(240, 190, 90);

pub const ACCENT: Color32 = Color32::from_rgb(38, 166, 154);
pub const NOW_LINE: Color32 = Color32::from_rgb(240, 75, 75);
pub const GRID_LINE: Color32 = Color32::from_rgb(36, 43, 55);

/// Flights with no rule styling.
pub const FLIGHT_DEFAULT: Color32 = Color32::from_rgb(66, 133, 244);
/// Ground duties, standby, off days and the like.
pub const DUTY_DEFAULT: Color32 = Color32::from_rgb(110, 116, 138);
/// Published rows are drawn fainter than actual ones.
pub const PUBLISH_TINT: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 90);
pub const REST_FILL: Color32 = Color32::from_rgba_premultiplied(52, 168, 83, 40);
pub const REST_SHORT_FILL: Color32 = Color32::from_rgba_premultiplied(229, 57, 53, 55);

// ── Sizes ────────────────────────────────────────────────────────────────────

pub const ROW_HEIGHT: f32 = 26.0;
pub const ROW_GAP: f32 = 2.0;
pub const HEADER_HEIGHT: f32 = 36.0;
pub const SIDEBAR_WIDTH: f32 = 190.0;
pub const PANEL_HEADER_HEIGHT: f32 = 28.0;
pub const MINIMIZED_HEIGHT: f32 = 30.0;
pub const BAR_ROUNDING: f32 = 4.0;
pub const BAR_INSET: f32 = 3.0;

// ── Fonts ────────────────────────────────────────────────────────────────────

pub fn font_header() -> FontId {
    FontId::proportional(12.5)
}

pub fn font_sub() -> FontId {
    FontId::proportional(11.0)
}

pub fn font_bar() -> FontId {
    FontId::monospace(10.5)
}

pub fn font_small() -> FontId {
    FontId::proportional(9.0)
}

/// Bar color when no rule supplied a fill.
pub fn default_fill(is_flight: bool) -> Color32 {
    if is_flight {
        FLIGHT_DEFAULT
    } else {
        DUTY_DEFAULT
    }
}

// ── Visuals ──────────────────────────────────────────────────────────────────

fn restyle(widget: &mut WidgetVisuals, fill: Color32, border: Color32, text: Stroke) {
    widget.bg_fill = fill;
    widget.weak_bg_fill = fill;
    widget.bg_stroke = Stroke::new(1.0, border);
    widget.fg_stroke = text;
    widget.rounding = Rounding::same(3.0);
}

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_HEADER;
    visuals.faint_bg_color = BG_SIDEBAR;
    visuals.extreme_bg_color = BG_INPUT;
    visuals.hyperlink_color = ACCENT;

    let w = &mut visuals.widgets;
    restyle(&mut w.noninteractive, BG_PANEL, BORDER_SUBTLE, Stroke::new(1.0, TEXT_SECONDARY));
    restyle(&mut w.inactive, BG_HEADER, BORDER_SUBTLE, Stroke::new(1.0, TEXT_PRIMARY));
    restyle(&mut w.hovered, Color32::from_rgb(38, 47, 61), ACCENT, Stroke::new(1.0, TEXT_PRIMARY));
    restyle(&mut w.active, Color32::from_rgb(45, 56, 72), ACCENT, Stroke::new(1.5, TEXT_ON_BAR));

    visuals.selection.bg_fill = BG_DROP_TARGET;
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);
    visuals.window_rounding = Rounding::same(6.0);
    visuals.window_stroke = Stroke::new(1.0, BORDER_ACCENT.gamma_multiply(0.4));
    ctx.set_visuals(visuals);

    ctx.style_mut(|style| {
        style.spacing.item_spacing = egui::vec2(6.0, 4.0);
        style.spacing.button_padding = egui::vec2(7.0, 3.0);
        style.spacing.menu_margin = egui::Margin::same(6.0);
    });
}
