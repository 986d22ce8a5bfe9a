use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use egui::{Color32, FontId, Pos2, Rect};
use log::warn;
use thiserror::Error;

use super::context::RuleContext;
use crate::model::ActivityRecord;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule {rule} failed: {message}")]
    Failed { rule: String, message: String },
    #[error("missing context: {0}")]
    MissingContext(&'static str),
}

/// Partial style of one flight bar. `None` leaves the renderer's default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightStyle {
    pub fill: Option<Color32>,
    pub stroke: Option<Color32>,
    pub font: Option<FontId>,
}

impl FlightStyle {
    pub fn fill(color: Color32) -> Self {
        Self {
            fill: Some(color),
            ..Default::default()
        }
    }

    /// Lay `other` over `self`; keys set in `other` win.
    pub fn merge(&mut self, other: FlightStyle) {
        if other.fill.is_some() {
            self.fill = other.fill;
        }
        if other.stroke.is_some() {
            self.stroke = other.stroke;
        }
        if other.font.is_some() {
            self.font = other.font;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fill.is_none() && self.stroke.is_none() && self.font.is_none()
    }
}

/// Where a row sits on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowRegion {
    pub base_y: f32,
    pub row_height: f32,
    pub canvas_width: f32,
    /// Width of the label column at the left edge.
    pub sidebar_width: f32,
}

impl RowRegion {
    pub fn sidebar_rect(&self) -> Rect {
        Rect::from_min_max(
            Pos2::new(0.0, self.base_y),
            Pos2::new(self.sidebar_width, self.base_y + self.row_height),
        )
    }

    pub fn full_rect(&self) -> Rect {
        Rect::from_min_max(
            Pos2::new(0.0, self.base_y),
            Pos2::new(self.canvas_width, self.base_y + self.row_height),
        )
    }
}

/// Drawing surface row rules paint into. Coordinates are canvas-local.
pub trait RowCanvas {
    fn fill_rect(&mut self, rect: Rect, color: Color32);
    fn label(&mut self, pos: Pos2, text: &str, color: Color32);
}

pub trait FlightRule: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn matches(&self, flight: &ActivityRecord, ctx: &RuleContext) -> Result<bool, RuleError>;
    fn apply(&self, flight: &ActivityRecord, ctx: &RuleContext) -> Result<FlightStyle, RuleError>;
}

pub trait RowRule: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn matches(&self, group_key: &str, ctx: &RuleContext) -> Result<bool, RuleError>;
    fn apply(
        &self,
        group_key: &str,
        ctx: &RuleContext,
        canvas: &mut dyn RowCanvas,
        region: RowRegion,
    ) -> Result<(), RuleError>;
}

#[derive(Clone)]
pub enum Rule {
    Flight(Arc<dyn FlightRule>),
    Row(Arc<dyn RowRule>),
}

impl Rule {
    pub fn id(&self) -> &str {
        match self {
            Rule::Flight(r) => r.id(),
            Rule::Row(r) => r.id(),
        }
    }
}

/// Rules in registration order.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn register_flight(&mut self, rule: impl FlightRule + 'static) -> &mut Self {
        self.register(Rule::Flight(Arc::new(rule)))
    }

    pub fn register_row(&mut self, rule: impl RowRule + 'static) -> &mut Self {
        self.register(Rule::Row(Arc::new(rule)))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn flight_rules(&self) -> impl Iterator<Item = &Arc<dyn FlightRule>> {
        self.rules.iter().filter_map(|r| match r {
            Rule::Flight(f) => Some(f),
            Rule::Row(_) => None,
        })
    }

    pub fn row_rules(&self) -> impl Iterator<Item = &Arc<dyn RowRule>> {
        self.rules.iter().filter_map(|r| match r {
            Rule::Row(r) => Some(r),
            Rule::Flight(_) => None,
        })
    }
}

/// Run `f`, turning an error or a panic into `None`.
fn contained<T>(rule: &str, stage: &str, f: impl FnOnce() -> Result<T, RuleError>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            warn!("rule {rule} {stage}: {err}");
            None
        }
        Err(_) => {
            warn!("rule {rule} panicked during {stage}");
            None
        }
    }
}

/// Evaluates a registry against one context.
pub struct RuleEngine {
    context: RuleContext,
    registry: Arc<RuleRegistry>,
}

impl RuleEngine {
    pub fn new(context: RuleContext, registry: Arc<RuleRegistry>) -> Self {
        Self { context, registry }
    }

    pub fn context(&self) -> &RuleContext {
        &self.context
    }

    /// Merged style of every matching flight rule, later rules winning.
    pub fn final_style(&self, flight: &ActivityRecord) -> FlightStyle {
        let mut style = FlightStyle::default();
        for rule in self.registry.flight_rules() {
            let ctx = &self.context;
            let matched =
                contained(rule.id(), "condition", || rule.matches(flight, ctx)).unwrap_or(false);
            if !matched {
                continue;
            }
            if let Some(partial) = contained(rule.id(), "apply", || rule.apply(flight, ctx)) {
                style.merge(partial);
            }
        }
        style
    }

    /// Run every matching row rule for one row.
    pub fn apply_row_rules(&mut self, group_key: &str, canvas: &mut dyn RowCanvas, region: RowRegion) {
        self.context.group_key = group_key.to_string();
        let registry = Arc::clone(&self.registry);
        for rule in registry.row_rules() {
            let ctx = &self.context;
            let matched =
                contained(rule.id(), "condition", || rule.matches(group_key, ctx)).unwrap_or(false);
            if matched {
                contained(rule.id(), "apply", || {
                    rule.apply(group_key, ctx, &mut *canvas, region)
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Paint {
        id: &'static str,
        style: FlightStyle,
    }

    impl FlightRule for Paint {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            self.id
        }
        fn matches(&self, _: &ActivityRecord, _: &RuleContext) -> Result<bool, RuleError> {
            Ok(true)
        }
        fn apply(&self, _: &ActivityRecord, _: &RuleContext) -> Result<FlightStyle, RuleError> {
            Ok(self.style.clone())
        }
    }

    struct Broken;

    impl FlightRule for Broken {
        fn id(&self) -> &str {
            "broken"
        }
        fn name(&self) -> &str {
            "broken"
        }
        fn matches(&self, _: &ActivityRecord, _: &RuleContext) -> Result<bool, RuleError> {
            panic!("condition blew up")
        }
        fn apply(&self, _: &ActivityRecord, _: &RuleContext) -> Result<FlightStyle, RuleError> {
            Ok(FlightStyle::fill(Color32::BLACK))
        }
    }

    struct Failing;

    impl FlightRule for Failing {
        fn id(&self) -> &str {
            "failing"
        }
        fn name(&self) -> &str {
            "failing"
        }
        fn matches(&self, _: &ActivityRecord, _: &RuleContext) -> Result<bool, RuleError> {
            Err(RuleError::MissingContext("visible_range"))
        }
        fn apply(&self, _: &ActivityRecord, _: &RuleContext) -> Result<FlightStyle, RuleError> {
            Ok(FlightStyle::fill(Color32::BLACK))
        }
    }

    #[test]
    fn later_rule_wins_overlapping_keys() {
        let mut registry = RuleRegistry::new();
        registry
            .register_flight(Paint {
                id: "first",
                style: FlightStyle {
                    fill: Some(Color32::RED),
                    stroke: Some(Color32::WHITE),
                    font: None,
                },
            })
            .register_flight(Paint {
                id: "second",
                style: FlightStyle::fill(Color32::BLUE),
            });
        let engine = RuleEngine::new(RuleContext::default(), Arc::new(registry));
        let style = engine.final_style(&ActivityRecord::default());
        assert_eq!(style.fill, Some(Color32::BLUE));
        assert_eq!(style.stroke, Some(Color32::WHITE));
    }

    #[test]
    fn faulty_rules_count_as_no_match() {
        let mut registry = RuleRegistry::new();
        registry
            .register_flight(Paint {
                id: "ok",
                style: FlightStyle::fill(Color32::GREEN),
            })
            .register_flight(Broken)
            .register_flight(Failing);
        let engine = RuleEngine::new(RuleContext::default(), Arc::new(registry));
        assert_eq!(
            engine.final_style(&ActivityRecord::default()).fill,
            Some(Color32::GREEN)
        );
    }
}
