use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::activity::{ActivityRecord, RowType};
use super::filter::FilterSet;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Smallest and largest zoom, in pixels per hour.
pub const MIN_PIXELS_PER_HOUR: f32 = 0.05;
pub const MAX_PIXELS_PER_HOUR: f32 = 600.0;

/// A half-open window `[start, end)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start.floor() as i64)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.end.ceil() as i64)
    }
}

/// Opaque identifier of one timeline view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimelineId(Uuid);

impl TimelineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimelineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.simple().to_string();
        write!(f, "timeline-{}", &s[..8])
    }
}

/// What a timeline is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    #[default]
    Roster,
    Trip,
    Rotation,
}

impl TimelineKind {
    pub fn label(self) -> &'static str {
        match self {
            TimelineKind::Roster => "Roster",
            TimelineKind::Trip => "Trip",
            TimelineKind::Rotation => "Rotation",
        }
    }
}

/// Fetch lifecycle of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Error(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Key of one rendered row: a person and one of their row types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub person_id: String,
    pub row_type: RowType,
}

/// One independent timeline view.
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub id: TimelineId,
    pub flights: Vec<ActivityRecord>,
    pub state: LoadState,
    /// Advisory progress in percent, 0..=100.
    pub progress: u8,
    pub filters: FilterSet,
    pub kind: TimelineKind,
    pub height_ratio: f32,
    pub minimized: bool,
    /// Row types currently shown per person.
    pub visible_row_types: BTreeMap<String, Vec<RowType>>,
    /// Bumped on every new query; stale fetch results carry an older value.
    pub generation: u64,
}

impl TimelineEntry {
    pub fn new(kind: TimelineKind) -> Self {
        Self::with_id(TimelineId::new(), kind)
    }

    pub fn with_id(id: TimelineId, kind: TimelineKind) -> Self {
        Self {
            id,
            flights: Vec::new(),
            state: LoadState::Idle,
            progress: 0,
            filters: FilterSet::default(),
            kind,
            height_ratio: 0.5,
            minimized: false,
            visible_row_types: BTreeMap::new(),
            generation: 0,
        }
    }

    /// Persons in order of first appearance.
    pub fn persons(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for rec in &self.flights {
            if !seen.iter().any(|p| *p == rec.person_id) {
                seen.push(rec.person_id.clone());
            }
        }
        seen
    }

    /// Rendered rows, one per person and visible row type (Actual before Publish).
    pub fn rows(&self) -> Vec<RowKey> {
        let mut rows = Vec::new();
        for person_id in self.persons() {
            let visible = self.visible_row_types.get(&person_id);
            for row_type in RowType::ALL {
                if visible.is_some_and(|v| v.contains(&row_type)) {
                    rows.push(RowKey {
                        person_id: person_id.clone(),
                        row_type,
                    });
                }
            }
        }
        rows
    }

    pub fn person_records(&self, person_id: &str, row_type: RowType) -> Vec<&ActivityRecord> {
        self.flights
            .iter()
            .filter(|r| r.person_id == person_id && r.row_type == row_type)
            .collect()
    }

    pub fn has_row(&self, person_id: &str, row_type: RowType) -> bool {
        self.flights
            .iter()
            .any(|r| r.person_id == person_id && r.row_type == row_type)
    }

    /// Items per person, in flight order.
    pub fn grouped_items(&self) -> BTreeMap<String, Vec<ActivityRecord>> {
        let mut grouped: BTreeMap<String, Vec<ActivityRecord>> = BTreeMap::new();
        for rec in &self.flights {
            grouped.entry(rec.person_id.clone()).or_default().push(rec.clone());
        }
        grouped
    }
}

/// Row types present per person, in order of first appearance.
pub fn group_row_types(flights: &[ActivityRecord]) -> BTreeMap<String, Vec<RowType>> {
    let mut grouped: BTreeMap<String, Vec<RowType>> = BTreeMap::new();
    for rec in flights {
        let types = grouped.entry(rec.person_id.clone()).or_default();
        if !types.contains(&rec.row_type) {
            types.push(rec.row_type);
        }
    }
    grouped
}

/// Share the vertical space equally among the non-minimized timelines.
pub fn rebalance_heights(timelines: &mut [TimelineEntry]) {
    let active = timelines.iter().filter(|t| !t.minimized).count();
    let equal = if active > 0 { 1.0 / active as f32 } else { 0.0 };
    for t in timelines.iter_mut().filter(|t| !t.minimized) {
        t.height_ratio = equal;
    }
}

/// Visible window of one timeline canvas. Doubles as that timeline's zoom controller.
#[derive(Debug, Clone)]
pub struct TimelineViewport {
    /// Leftmost visible instant, epoch milliseconds.
    pub start_ms: f64,
    /// Zoom level.
    pub pixels_per_hour: f32,
    /// Width of the drawable area from the last layout pass.
    pub width: f32,
    home_start_ms: f64,
    default_pixels_per_hour: f32,
}

impl TimelineViewport {
    pub fn new(start_ms: f64, pixels_per_hour: f32) -> Self {
        let pixels_per_hour = pixels_per_hour.clamp(MIN_PIXELS_PER_HOUR, MAX_PIXELS_PER_HOUR);
        Self {
            start_ms,
            pixels_per_hour,
            width: 800.0,
            home_start_ms: start_ms,
            default_pixels_per_hour: pixels_per_hour,
        }
    }

    /// Convert an instant to an x-pixel offset from the viewport start.
    pub fn time_to_x(&self, ms: f64) -> f32 {
        ((ms - self.start_ms) / MS_PER_HOUR) as f32 * self.pixels_per_hour
    }

    /// Convert an x-pixel offset back to an instant.
    pub fn x_to_time(&self, x: f32) -> f64 {
        self.start_ms + (x / self.pixels_per_hour) as f64 * MS_PER_HOUR
    }

    pub fn visible_range(&self) -> TimeRange {
        TimeRange::new(self.start_ms, self.x_to_time(self.width))
    }

    pub fn set_width(&mut self, width: f32) {
        if width > 1.0 {
            self.width = width;
        }
    }

    pub fn set_zoom(&mut self, pixels_per_hour: f32) {
        let center = self.x_to_time(self.width / 2.0);
        self.pixels_per_hour = pixels_per_hour.clamp(MIN_PIXELS_PER_HOUR, MAX_PIXELS_PER_HOUR);
        self.start_ms = center - (self.width / 2.0 / self.pixels_per_hour) as f64 * MS_PER_HOUR;
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.pixels_per_hour * 1.2);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.pixels_per_hour / 1.2);
    }

    pub fn reset(&mut self) {
        self.start_ms = self.home_start_ms;
        self.pixels_per_hour = self.default_pixels_per_hour;
    }

    /// Make `range` fill the current width.
    pub fn fit(&mut self, range: TimeRange) {
        let hours = range.span() / MS_PER_HOUR;
        if hours <= 0.0 {
            self.start_ms = range.start;
            return;
        }
        self.pixels_per_hour =
            (self.width / hours as f32).clamp(MIN_PIXELS_PER_HOUR, MAX_PIXELS_PER_HOUR);
        self.start_ms = range.start;
    }

    /// Pan the viewport by a number of hours.
    pub fn scroll_hours(&mut self, hours: f64) {
        self.start_ms += hours * MS_PER_HOUR;
    }
}
