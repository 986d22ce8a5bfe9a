use std::collections::HashMap;
use std::sync::Arc;

use egui::Color32;
use parking_lot::RwLock;

use super::context::RuleContext;
use super::engine::{RowCanvas, RowRegion, RowRule, RuleError};
use crate::calc::{compute_row_metrics, RowMetrics};

/// Latest metrics per group key, written by [`OffDayEntitlementRule`].
#[derive(Debug, Clone, Default)]
pub struct MetricsTable(Arc<RwLock<HashMap<String, RowMetrics>>>);

impl MetricsTable {
    pub fn get(&self, group_key: &str) -> Option<RowMetrics> {
        self.0.read().get(group_key).cloned()
    }

    pub fn insert(&self, metrics: RowMetrics) {
        self.0.write().insert(metrics.group_key.clone(), metrics);
    }

    pub fn clear(&self) {
        self.0.write().clear();
    }
}

/// Worked days, used off days and entitlement over the visible range.
pub struct OffDayEntitlementRule {
    metrics: MetricsTable,
}

impl OffDayEntitlementRule {
    pub fn new(metrics: MetricsTable) -> Self {
        Self { metrics }
    }
}

impl RowRule for OffDayEntitlementRule {
    fn id(&self) -> &str {
        "off-day-entitlement"
    }

    fn name(&self) -> &str {
        "Entitlement [used off days]"
    }

    fn matches(&self, _group_key: &str, ctx: &RuleContext) -> Result<bool, RuleError> {
        Ok(ctx
            .visible_range
            .is_some_and(|r| r.start != 0.0 && r.end != 0.0))
    }

    fn apply(
        &self,
        group_key: &str,
        ctx: &RuleContext,
        _canvas: &mut dyn RowCanvas,
        _region: RowRegion,
    ) -> Result<(), RuleError> {
        let range = ctx
            .visible_range
            .ok_or(RuleError::MissingContext("visible_range"))?;
        let metrics = compute_row_metrics(
            group_key,
            ctx.items_for(group_key),
            range,
            &ctx.off_day_table,
            &ctx.day_classes,
        );
        self.metrics.insert(metrics);
        Ok(())
    }
}

pub const LONG_DUTY_FILL: Color32 = Color32::from_rgba_premultiplied(23, 0, 0, 23);

/// Marks the sidebar of rows whose total flight time exceeds a threshold.
pub struct LongDutyRule {
    threshold_hours: f64,
}

impl LongDutyRule {
    pub fn new(threshold_hours: f64) -> Self {
        Self { threshold_hours }
    }
}

impl RowRule for LongDutyRule {
    fn id(&self) -> &str {
        "highlight-long-duty"
    }

    fn name(&self) -> &str {
        "Total FLT time above threshold"
    }

    fn matches(&self, group_key: &str, ctx: &RuleContext) -> Result<bool, RuleError> {
        Ok(ctx
            .total_flight_minutes
            .get(group_key)
            .is_some_and(|minutes| *minutes > self.threshold_hours * 60.0))
    }

    fn apply(
        &self,
        _group_key: &str,
        _ctx: &RuleContext,
        canvas: &mut dyn RowCanvas,
        region: RowRegion,
    ) -> Result<(), RuleError> {
        canvas.fill_rect(region.sidebar_rect(), LONG_DUTY_FILL);
        Ok(())
    }
}
