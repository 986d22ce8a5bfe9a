use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity code of an operated flight leg.
pub const FLIGHT_CODE: &str = "FLT";

/// Which variant of a person's schedule a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RowType {
    /// What was actually flown.
    #[default]
    Actual,
    /// The originally published schedule.
    Publish,
}

impl RowType {
    pub const ALL: [RowType; 2] = [RowType::Actual, RowType::Publish];

    pub fn label(self) -> &'static str {
        match self {
            RowType::Actual => "Actual",
            RowType::Publish => "Publish",
        }
    }
}

/// Mandatory rest derived from the last flight leg of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Rest length in hours, rounded to two decimals.
    pub duration_hours: f64,
}

/// One duty or flight record of a crew member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ActivityRecord {
    pub data_id: String,
    pub person_id: String,
    pub name: String,
    pub surname: String,
    pub activity_code: String,
    pub departure_port: String,
    pub arrival_port: String,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub trip_id: String,
    pub group_code: String,
    pub flight_position: String,
    pub flight_no: String,
    pub flight_id: String,
    pub plane_cms_type: String,
    pub plane_tail_name: String,
    pub class: String,
    pub agreement_type: String,
    pub base_filo: String,
    #[serde(rename = "type")]
    pub row_type: RowType,
    pub rest: Option<RestWindow>,
}

impl ActivityRecord {
    pub fn is_flight(&self) -> bool {
        self.activity_code == FLIGHT_CODE
    }

    pub fn departure_ms(&self) -> Option<i64> {
        self.departure_time.map(|t| t.timestamp_millis())
    }

    pub fn arrival_ms(&self) -> Option<i64> {
        self.arrival_time.map(|t| t.timestamp_millis())
    }

    /// Block time in hours, when both ends are known.
    pub fn duration_hours(&self) -> Option<f64> {
        match (self.departure_time, self.arrival_time) {
            (Some(dep), Some(arr)) => Some((arr - dep).num_milliseconds() as f64 / 3_600_000.0),
            _ => None,
        }
    }

    pub fn full_name(&self) -> String {
        match (self.name.is_empty(), self.surname.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.name.clone(),
            (true, false) => self.surname.clone(),
            (false, false) => format!("{} {}", self.name, self.surname),
        }
    }

    /// Copy of this record re-tagged as another row type.
    pub fn with_row_type(mut self, row_type: RowType) -> Self {
        self.row_type = row_type;
        self
    }
}
