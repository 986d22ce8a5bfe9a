//! Backend wire shapes and their mapping onto the domain model.
//!
//! Database-backed endpoints emit nullable columns either as plain values,
//! as `null`, or as `{"Valid": bool, "String": ..}` / `{"Valid": bool, "Int64": ..}`
//! objects. Numeric columns exported from spreadsheets may use a decimal comma.
//! Everything is normalised to `Option` here so the rest of the crate never
//! sees those shapes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::{
    ActivityCodeInfo, ActivityRecord, AircraftCrewNeed, CrewAdequacy, OffDayRow,
    ReferenceTables, RestWindow, RowType,
};

fn unwrap_tagged<'a>(value: &'a Value, payload: &[&str]) -> Option<&'a Value> {
    match value {
        Value::Null => None,
        Value::Object(map) if map.contains_key("Valid") => {
            if map.get("Valid").and_then(Value::as_bool) != Some(true) {
                return None;
            }
            payload.iter().find_map(|key| map.get(*key))
        }
        other => Some(other),
    }
}

pub fn string_value(value: &Value) -> Option<String> {
    match unwrap_tagged(value, &["String"])? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numbers, or numeric strings with either decimal separator.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match unwrap_tagged(value, &["Int64", "Float64"])? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replacen(',', ".", 1).trim().parse().ok(),
        _ => None,
    }
}

pub fn int_value(value: &Value) -> Option<i64> {
    match unwrap_tagged(value, &["Int64"])? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => numeric_value(&Value::String(s.clone())).map(|f| f.round() as i64),
        _ => None,
    }
}

/// RFC 3339 text or epoch milliseconds.
pub fn time_value(value: &Value) -> Option<DateTime<Utc>> {
    match unwrap_tagged(value, &["Time", "String", "Int64"])? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// A nullable text column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullableString(pub Option<String>);

impl<'de> Deserialize<'de> for NullableString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(string_value(&value)))
    }
}

impl NullableString {
    pub fn into_string(self) -> String {
        self.0.unwrap_or_default()
    }
}

/// A nullable integer column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullableInt(pub Option<i64>);

impl<'de> Deserialize<'de> for NullableInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(int_value(&value)))
    }
}

impl NullableInt {
    pub fn count(self) -> u32 {
        self.0.map_or(0, |v| v.clamp(0, u32::MAX as i64) as u32)
    }
}

/// A nullable timestamp column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullableTime(pub Option<DateTime<Utc>>);

impl<'de> Deserialize<'de> for NullableTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(time_value(&value)))
    }
}

/// A nullable decimal column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NullableNumber(pub Option<f64>);

impl<'de> Deserialize<'de> for NullableNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(numeric_value(&value)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireActivity {
    pub data_id: NullableString,
    pub person_id: NullableString,
    pub name: NullableString,
    pub surname: NullableString,
    pub activity_code: NullableString,
    pub departure_port: NullableString,
    pub arrival_port: NullableString,
    pub departure_time: NullableTime,
    pub arrival_time: NullableTime,
    pub trip_id: NullableString,
    pub group_code: NullableString,
    pub flight_position: NullableString,
    pub flight_no: NullableString,
    pub flight_id: NullableString,
    pub plane_cms_type: NullableString,
    pub plane_tail_name: NullableString,
    pub class: NullableString,
    pub agreement_type: NullableString,
    pub base_filo: NullableString,
    #[serde(rename = "type")]
    pub row_type: NullableString,
    pub rest_start: NullableTime,
    pub rest_end: NullableTime,
    pub rest_duration: NullableNumber,
}

impl WireActivity {
    /// Domain record. `default_row_type` applies when the row carries no `type`.
    pub fn into_record(self, default_row_type: RowType) -> ActivityRecord {
        let row_type = match self.row_type.0.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("publish") => RowType::Publish,
            Some("actual") => RowType::Actual,
            _ => default_row_type,
        };
        let rest = match (self.rest_start.0, self.rest_end.0) {
            (Some(start), Some(end)) if end > start => Some(RestWindow {
                start,
                end,
                duration_hours: self
                    .rest_duration
                    .0
                    .unwrap_or_else(|| (end - start).num_minutes() as f64 / 60.0),
            }),
            _ => None,
        };
        ActivityRecord {
            data_id: self.data_id.into_string(),
            person_id: self.person_id.into_string(),
            name: self.name.into_string(),
            surname: self.surname.into_string(),
            activity_code: self.activity_code.into_string(),
            departure_port: self.departure_port.into_string(),
            arrival_port: self.arrival_port.into_string(),
            departure_time: self.departure_time.0,
            arrival_time: self.arrival_time.0,
            trip_id: self.trip_id.into_string(),
            group_code: self.group_code.into_string(),
            flight_position: self.flight_position.into_string(),
            flight_no: self.flight_no.into_string(),
            flight_id: self.flight_id.into_string(),
            plane_cms_type: self.plane_cms_type.into_string(),
            plane_tail_name: self.plane_tail_name.into_string(),
            class: self.class.into_string(),
            agreement_type: self.agreement_type.into_string(),
            base_filo: self.base_filo.into_string(),
            row_type,
            rest,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireActivityCode {
    pub unique_id: NullableInt,
    pub activity_code: NullableString,
    pub activity_group_code: NullableString,
    pub activity_code_explanation: NullableString,
}

impl From<WireActivityCode> for ActivityCodeInfo {
    fn from(w: WireActivityCode) -> Self {
        Self {
            unique_id: w.unique_id.0.unwrap_or_default(),
            activity_code: w.activity_code.into_string(),
            activity_group_code: w.activity_group_code.into_string(),
            activity_code_explanation: w.activity_code_explanation.into_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireOffDayRow {
    pub unique_id: NullableInt,
    pub work_days: NullableInt,
    pub off_day_entitlement: NullableInt,
    pub distribution: NullableString,
}

impl From<WireOffDayRow> for OffDayRow {
    fn from(w: WireOffDayRow) -> Self {
        Self {
            unique_id: w.unique_id.0.unwrap_or_default(),
            work_days: w.work_days.count(),
            off_day_entitlement: w.off_day_entitlement.count(),
            distribution: w.distribution.into_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireCrewNeed {
    pub unique_id: NullableInt,
    pub actype: NullableString,
    pub c_count: NullableInt,
    pub p_count: NullableInt,
    pub j_count: NullableInt,
    pub ef_count: NullableInt,
    pub a_count: NullableInt,
    pub s_count: NullableInt,
    pub l_count: NullableInt,
    pub ec_count: NullableInt,
    pub t_count: NullableInt,
}

impl From<WireCrewNeed> for AircraftCrewNeed {
    fn from(w: WireCrewNeed) -> Self {
        Self {
            unique_id: w.unique_id.0.unwrap_or_default(),
            actype: w.actype.into_string(),
            c_count: w.c_count.count(),
            p_count: w.p_count.count(),
            j_count: w.j_count.count(),
            ef_count: w.ef_count.count(),
            a_count: w.a_count.count(),
            s_count: w.s_count.count(),
            l_count: w.l_count.count(),
            ec_count: w.ec_count.count(),
            t_count: w.t_count.count(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireReference {
    pub activity_codes: Vec<WireActivityCode>,
    pub off_day_table: Vec<WireOffDayRow>,
    pub aircraft_crew_need: Vec<WireCrewNeed>,
    pub crew_status: HashMap<String, CrewAdequacy>,
}

impl From<WireReference> for ReferenceTables {
    fn from(w: WireReference) -> Self {
        Self {
            activity_codes: w.activity_codes.into_iter().map(Into::into).collect(),
            off_day_table: w.off_day_table.into_iter().map(Into::into).collect(),
            crew_need: w.aircraft_crew_need.into_iter().map(Into::into).collect(),
            crew_adequacy: w.crew_status,
        }
    }
}
