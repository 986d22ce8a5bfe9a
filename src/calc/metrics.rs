//! Per-person worked-day and off-day metrics over a reporting range.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ActivityRecord, DayClasses, OffDayRow, TimeRange};

const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RowMetrics {
    pub group_key: String,
    pub worked_days: u32,
    pub used_off_days: u32,
    pub entitlement: u32,
    pub raw_distribution: Option<String>,
}

/// Calendar days of `range`, inclusive of the day the range ends on.
fn range_days(range: TimeRange) -> Option<Vec<NaiveDate>> {
    let start = DateTime::<Utc>::from_timestamp_millis(range.start.floor() as i64)?.date_naive();
    let total = ((range.end - range.start) / MS_PER_DAY).trunc();
    if total < 0.0 {
        return Some(Vec::new());
    }
    Some(
        (0..=total as u64)
            .filter_map(|i| start.checked_add_days(Days::new(i)))
            .collect(),
    )
}

/// Activity codes per calendar day. A record touches each day from its departure to its arrival.
pub fn day_codes(items: &[ActivityRecord], range: TimeRange) -> BTreeMap<NaiveDate, BTreeSet<String>> {
    let mut days: BTreeMap<NaiveDate, BTreeSet<String>> = range_days(range)
        .unwrap_or_default()
        .into_iter()
        .map(|d| (d, BTreeSet::new()))
        .collect();

    for item in items {
        let Some(dep) = item.departure_time else {
            continue;
        };
        let first = dep.date_naive();
        let last = item.arrival_time.map_or(first, |a| a.date_naive()).max(first);
        let mut day = first;
        while day <= last {
            if let Some(codes) = days.get_mut(&day) {
                codes.insert(item.activity_code.clone());
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }
    days
}

/// Highest-threshold row not exceeding `worked_days`.
pub fn match_entitlement(table: &[OffDayRow], worked_days: u32) -> Option<&OffDayRow> {
    let mut sorted: Vec<&OffDayRow> = table.iter().collect();
    sorted.sort_by(|a, b| b.work_days.cmp(&a.work_days));
    sorted.into_iter().find(|row| worked_days >= row.work_days)
}

pub fn compute_row_metrics(
    group_key: &str,
    items: &[ActivityRecord],
    range: TimeRange,
    table: &[OffDayRow],
    classes: &DayClasses,
) -> RowMetrics {
    let mut worked_days = 0;
    let mut used_off_days = 0;
    for codes in day_codes(items, range).values() {
        let off = codes.is_empty() || codes.iter().any(|c| classes.is_off_day(c));
        let worked = !codes.is_empty() && codes.iter().all(|c| !classes.is_non_working(c));
        if off {
            used_off_days += 1;
        }
        if worked {
            worked_days += 1;
        }
    }

    let matched = match_entitlement(table, worked_days);
    RowMetrics {
        group_key: group_key.to_string(),
        worked_days,
        used_off_days,
        entitlement: matched.map_or(0, |row| row.off_day_entitlement),
        raw_distribution: matched.map(|row| row.distribution.clone()),
    }
}
