use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::model::{
    ActivityRecord, AircraftCrewNeed, AssignedCrew, DayClasses, OffDayRow, ReferenceTables,
    TimeRange, TimelineEntry, TimelineKind,
};

/// Callback a rule may use to request a repaint.
pub type Invalidate = Arc<dyn Fn() + Send + Sync>;

/// Everything a rule may read during one evaluation pass.
#[derive(Clone, Default)]
pub struct RuleContext {
    pub kind: TimelineKind,
    /// Row currently being evaluated. Set by the engine for row rules.
    pub group_key: String,
    pub grouped_items: BTreeMap<String, Vec<ActivityRecord>>,
    pub visible_range: Option<TimeRange>,
    /// Flight id to the crew assigned on it.
    pub assigned_crew: HashMap<String, Vec<AssignedCrew>>,
    pub crew_need: Vec<AircraftCrewNeed>,
    pub off_day_table: Vec<OffDayRow>,
    pub day_classes: DayClasses,
    /// Summed FLT block time per person, in minutes.
    pub total_flight_minutes: HashMap<String, f64>,
    pub invalidate: Option<Invalidate>,
}

impl RuleContext {
    /// Snapshot of one timeline for a render pass.
    pub fn for_timeline(
        entry: &TimelineEntry,
        visible_range: Option<TimeRange>,
        tables: &ReferenceTables,
        day_classes: &DayClasses,
    ) -> Self {
        let grouped_items = entry.grouped_items();
        let total_flight_minutes = grouped_items
            .iter()
            .map(|(person, items)| {
                let minutes = items
                    .iter()
                    .filter(|r| r.is_flight())
                    .filter_map(ActivityRecord::duration_hours)
                    .sum::<f64>()
                    * 60.0;
                (person.clone(), minutes)
            })
            .collect();

        let mut assigned_crew: HashMap<String, Vec<AssignedCrew>> = HashMap::new();
        for rec in entry.flights.iter().filter(|r| r.is_flight() && !r.flight_id.is_empty()) {
            let crew = assigned_crew.entry(rec.flight_id.clone()).or_default();
            if !crew.iter().any(|c| c.person_id == rec.person_id) {
                crew.push(AssignedCrew {
                    person_id: rec.person_id.clone(),
                    role: rec.flight_position.clone(),
                });
            }
        }

        Self {
            kind: entry.kind,
            group_key: String::new(),
            grouped_items,
            visible_range,
            assigned_crew,
            crew_need: tables.crew_need.clone(),
            off_day_table: tables.off_day_table.clone(),
            day_classes: day_classes.clone(),
            total_flight_minutes,
            invalidate: None,
        }
    }

    pub fn with_invalidate(mut self, invalidate: Invalidate) -> Self {
        self.invalidate = Some(invalidate);
        self
    }

    pub fn items_for(&self, group_key: &str) -> &[ActivityRecord] {
        self.grouped_items
            .get(group_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn request_repaint(&self) {
        if let Some(invalidate) = &self.invalidate {
            invalidate();
        }
    }
}

impl fmt::Debug for RuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContext")
            .field("kind", &self.kind)
            .field("group_key", &self.group_key)
            .field("persons", &self.grouped_items.len())
            .field("visible_range", &self.visible_range)
            .field("invalidate", &self.invalidate.is_some())
            .finish()
    }
}
