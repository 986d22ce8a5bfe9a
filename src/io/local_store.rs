use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};
use parking_lot::RwLock;

use super::file::{load_dataset, Dataset, DatasetError};
use super::source::{
    ActivityPage, ActivitySource, FetchError, FetchResult, FlightCrew, ReferenceSource,
};
use crate::model::{ActivityRecord, FilterSet, ReferenceTables};

const NO_PUBLISH_RECORD: &str = "No Publish record found for the specified person.";

fn field_value<'a>(rec: &'a ActivityRecord, field: &str) -> Option<&'a str> {
    Some(match field {
        "person_id" => &rec.person_id,
        "surname" => &rec.surname,
        "activity_code" => &rec.activity_code,
        "class" => &rec.class,
        "departure_port" => &rec.departure_port,
        "arrival_port" => &rec.arrival_port,
        "trip_id" => &rec.trip_id,
        "plane_tail_name" => &rec.plane_tail_name,
        "plane_cms_type" => &rec.plane_cms_type,
        "group_code" => &rec.group_code,
        "flight_position" => &rec.flight_position,
        "flight_no" => &rec.flight_no,
        "agreement_type" => &rec.agreement_type,
        "flight_id" => &rec.flight_id,
        _ => return None,
    })
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Inclusive departure-day window of a `date` filter. `None` for malformed values.
fn date_window(value: &str) -> Option<(NaiveDate, NaiveDate)> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [day] => parse_day(day).map(|d| (d, d)),
        [from, to] => Some((parse_day(from)?, parse_day(to)?)),
        _ => None,
    }
}

fn by_person_then_departure(a: &ActivityRecord, b: &ActivityRecord) -> Ordering {
    a.person_id
        .cmp(&b.person_id)
        .then_with(|| a.departure_time.cmp(&b.departure_time))
}

/// Filter `records` the way the crew backend does.
pub fn query_records(records: &[ActivityRecord], filters: &FilterSet) -> FetchResult<Vec<ActivityRecord>> {
    if filters.is_empty() {
        return Ok(Vec::new());
    }

    let mut equal: Vec<(&str, &str)> = Vec::new();
    let mut window = None;
    for (field, value) in filters.iter() {
        if value.is_empty() {
            continue;
        }
        if field == "date" {
            window = date_window(value);
            if window.is_none() {
                warn!("Ignoring malformed date filter '{value}'");
            }
            continue;
        }
        if field_value(&ActivityRecord::default(), field).is_none() {
            return Err(FetchError::Server {
                status: 400,
                message: format!("unknown filter field '{field}'"),
            });
        }
        equal.push((field, value));
    }

    let mut out: Vec<ActivityRecord> = records
        .iter()
        .filter(|rec| {
            equal.iter().all(|(field, value)| match field_value(rec, field) {
                Some(actual) if *field == "surname" => actual.eq_ignore_ascii_case(value),
                Some(actual) => actual == *value,
                None => false,
            })
        })
        .filter(|rec| match window {
            None => true,
            Some((from, to)) => rec
                .departure_time
                .map(|t| t.date_naive())
                .is_some_and(|day| from <= day && day <= to),
        })
        .cloned()
        .collect();
    out.sort_by(by_person_then_departure);
    Ok(out)
}

/// In-memory activity and reference store backed by a local dataset file.
#[derive(Default)]
pub struct LocalActivityStore {
    data: RwLock<Dataset>,
}

impl LocalActivityStore {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
        }
    }

    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let store = Self::default();
        store.reload(path)?;
        Ok(store)
    }

    /// Replace the served dataset with the contents of `path`.
    pub fn reload(&self, path: &Path) -> Result<(), DatasetError> {
        let dataset = load_dataset(path)?;
        info!(
            "Loaded dataset {}: {} actual, {} published records",
            path.display(),
            dataset.actual.len(),
            dataset.publish.len()
        );
        *self.data.write() = dataset;
        Ok(())
    }

    pub fn record_count(&self) -> usize {
        let data = self.data.read();
        data.actual.len() + data.publish.len()
    }
}

#[async_trait]
impl ActivitySource for LocalActivityStore {
    async fn query_activities(&self, filters: &FilterSet) -> FetchResult<ActivityPage> {
        let records = query_records(&self.data.read().actual, filters)?;
        Ok(ActivityPage {
            total: records.len(),
            records,
        })
    }

    async fn query_by_flight_id(&self, flight_id: &str) -> FetchResult<FlightCrew> {
        let data = self.data.read();
        let mut person_ids: Vec<String> = data
            .actual
            .iter()
            .filter(|r| r.flight_id == flight_id)
            .map(|r| r.person_id.clone())
            .collect();
        person_ids.sort();
        person_ids.dedup();

        let mut by_person: HashMap<String, Vec<ActivityRecord>> = HashMap::new();
        for rec in data.actual.iter().filter(|r| person_ids.contains(&r.person_id)) {
            by_person.entry(rec.person_id.clone()).or_default().push(rec.clone());
        }
        for records in by_person.values_mut() {
            records.sort_by(by_person_then_departure);
        }
        Ok(FlightCrew {
            person_ids,
            by_person,
        })
    }

    async fn query_published(&self, person_id: &str) -> FetchResult<Vec<ActivityRecord>> {
        let mut records: Vec<ActivityRecord> = self
            .data
            .read()
            .publish
            .iter()
            .filter(|r| r.person_id == person_id)
            .cloned()
            .collect();
        if records.is_empty() {
            return Err(FetchError::NotFound(NO_PUBLISH_RECORD.to_string()));
        }
        records.sort_by(by_person_then_departure);
        Ok(records)
    }
}

#[async_trait]
impl ReferenceSource for LocalActivityStore {
    async fn load_reference(&self) -> FetchResult<ReferenceTables> {
        Ok(self.data.read().reference.clone())
    }
}
