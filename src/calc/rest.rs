//! Mandatory rest after the last flight leg of a trip.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::model::{ActivityRecord, RestWindow};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestPolicy {
    pub min_rest_hours: f64,
    pub post_flight_buffer_minutes: i64,
}

impl Default for RestPolicy {
    fn default() -> Self {
        Self {
            min_rest_hours: 10.0,
            post_flight_buffer_minutes: 0,
        }
    }
}

/// Rest window following `flight`, regardless of its position in the trip.
///
/// `None` without both timestamps or when the window falls outside the representable range.
pub fn rest_window(flight: &ActivityRecord, policy: &RestPolicy) -> Option<RestWindow> {
    let departure = flight.departure_time?;
    let arrival = flight.arrival_time?;
    let flight_hours = (arrival - departure).num_milliseconds() as f64 / 3_600_000.0;

    let duty_end =
        arrival.checked_add_signed(Duration::try_minutes(policy.post_flight_buffer_minutes)?)?;
    let min_rest = policy.min_rest_hours.max(flight_hours);
    let rest_end = duty_end
        .checked_add_signed(Duration::try_milliseconds((min_rest * 3_600_000.0).round() as i64)?)?;

    Some(RestWindow {
        start: duty_end,
        end: rest_end,
        duration_hours: (min_rest * 100.0).round() / 100.0,
    })
}

fn departure_key(rec: &ActivityRecord) -> i64 {
    rec.departure_ms().unwrap_or(i64::MIN)
}

/// Index of the chronologically last flight leg among `trip`.
fn last_flight_index(trip: &[&ActivityRecord]) -> Option<usize> {
    let mut order: Vec<usize> = (0..trip.len()).collect();
    order.sort_by_key(|&i| departure_key(trip[i]));
    order.into_iter().rev().find(|&i| trip[i].is_flight())
}

/// Attach rest windows to the last flight of every trip.
///
/// Records without a trip id and every non-last record pass through unchanged.
/// Output order matches input order.
pub fn annotate_rest(records: Vec<ActivityRecord>, policy: &RestPolicy) -> Vec<ActivityRecord> {
    let mut trips: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, rec) in records.iter().enumerate() {
        if !rec.trip_id.is_empty() {
            trips.entry(rec.trip_id.as_str()).or_default().push(i);
        }
    }

    let mut annotate: Vec<usize> = Vec::new();
    for members in trips.values() {
        let trip: Vec<&ActivityRecord> = members.iter().map(|&i| &records[i]).collect();
        if let Some(last) = last_flight_index(&trip) {
            annotate.push(members[last]);
        }
    }

    let mut records = records;
    for i in annotate {
        if let Some(window) = rest_window(&records[i], policy) {
            records[i].rest = Some(window);
        }
    }
    records
}

/// Rest window for `flight` if it is the last flight leg among its trip siblings.
pub fn rest_for_flight(
    flight: &ActivityRecord,
    all: &[ActivityRecord],
    policy: &RestPolicy,
) -> Option<RestWindow> {
    if flight.trip_id.is_empty() {
        return None;
    }
    let trip: Vec<&ActivityRecord> = all.iter().filter(|r| r.trip_id == flight.trip_id).collect();
    let last = trip[last_flight_index(&trip)?];
    if last.data_id != flight.data_id {
        return None;
    }
    rest_window(flight, policy)
}
