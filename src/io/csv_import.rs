use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;

use super::file::DatasetError;
use crate::model::{ActivityRecord, RowType};

/// Try parsing a timestamp with several common formats. Naive times are UTC.
fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%d/%m/%Y %H:%M",
    ] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }
    None
}

/// Detect delimiter by checking the first line for common separators.
fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();

    if semicolons >= commas && semicolons >= tabs {
        b';'
    } else if tabs >= commas {
        b'\t'
    } else {
        b','
    }
}

/// Normalize a header string to a canonical column key.
fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase().replace([' ', '-', '_'], "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    DataId,
    PersonId,
    Name,
    Surname,
    ActivityCode,
    DeparturePort,
    ArrivalPort,
    DepartureTime,
    ArrivalTime,
    TripId,
    GroupCode,
    FlightPosition,
    FlightNo,
    FlightId,
    PlaneCmsType,
    PlaneTailName,
    Class,
    AgreementType,
    BaseFilo,
    RowType,
}

fn header_to_col(normalized: &str) -> Option<Column> {
    Some(match normalized {
        "dataid" | "id" | "uniqueid" => Column::DataId,
        "personid" | "crewid" | "person" | "employeeid" => Column::PersonId,
        "name" | "firstname" | "personname" => Column::Name,
        "surname" | "lastname" | "personsurname" => Column::Surname,
        "activitycode" | "activity" | "code" => Column::ActivityCode,
        "departureport" | "dep" | "depport" | "from" => Column::DeparturePort,
        "arrivalport" | "arr" | "arrport" | "to" => Column::ArrivalPort,
        "departuretime" | "deptime" | "departure" | "start" | "std" => Column::DepartureTime,
        "arrivaltime" | "arrtime" | "arrival" | "end" | "sta" => Column::ArrivalTime,
        "tripid" | "trip" | "pairing" => Column::TripId,
        "groupcode" | "group" => Column::GroupCode,
        "flightposition" | "position" | "rank" => Column::FlightPosition,
        "flightno" | "flightnumber" | "flight" => Column::FlightNo,
        "flightid" | "ucusid" => Column::FlightId,
        "planecmstype" | "actype" | "aircrafttype" => Column::PlaneCmsType,
        "planetailname" | "tail" | "registration" => Column::PlaneTailName,
        "class" => Column::Class,
        "agreementtype" | "agreement" => Column::AgreementType,
        "basefilo" | "fleet" => Column::BaseFilo,
        "type" | "rowtype" | "schedule" => Column::RowType,
        _ => return None,
    })
}

fn assign(rec: &mut ActivityRecord, col: Column, value: &str) -> Result<(), String> {
    let text = value.to_string();
    match col {
        Column::DataId => rec.data_id = text,
        Column::PersonId => rec.person_id = text,
        Column::Name => rec.name = text,
        Column::Surname => rec.surname = text,
        Column::ActivityCode => rec.activity_code = text,
        Column::DeparturePort => rec.departure_port = text,
        Column::ArrivalPort => rec.arrival_port = text,
        Column::TripId => rec.trip_id = text,
        Column::GroupCode => rec.group_code = text,
        Column::FlightPosition => rec.flight_position = text,
        Column::FlightNo => rec.flight_no = text,
        Column::FlightId => rec.flight_id = text,
        Column::PlaneCmsType => rec.plane_cms_type = text,
        Column::PlaneTailName => rec.plane_tail_name = text,
        Column::Class => rec.class = text,
        Column::AgreementType => rec.agreement_type = text,
        Column::BaseFilo => rec.base_filo = text,
        Column::DepartureTime | Column::ArrivalTime => {
            if value.is_empty() {
                return Ok(());
            }
            let time = parse_time(value).ok_or_else(|| format!("invalid time '{value}'"))?;
            if col == Column::DepartureTime {
                rec.departure_time = Some(time);
            } else {
                rec.arrival_time = Some(time);
            }
        }
        Column::RowType => {
            rec.row_type = match value.to_lowercase().as_str() {
                "publish" | "published" | "p" => RowType::Publish,
                _ => RowType::Actual,
            }
        }
    }
    Ok(())
}

/// Import activity records from CSV text.
///
/// Auto-detects delimiter (comma, semicolon, tab) and matches column headers
/// flexibly ("Person ID", "person_id", "Crew Id", ...).
/// Returns `(records, skipped_count)` on success.
pub fn parse_activity_csv(content: &str) -> Result<(Vec<ActivityRecord>, usize), DatasetError> {
    let first_line = content.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let col_map: Vec<Option<Column>> = headers
        .iter()
        .map(|h| header_to_col(&normalize_header(h)))
        .collect();

    for required in [Column::PersonId, Column::ActivityCode, Column::DepartureTime] {
        if !col_map.contains(&Some(required)) {
            let found: Vec<&str> = headers.iter().collect();
            return Err(DatasetError::MissingColumns(format!(
                "need person id, activity code and departure time; found {found:?}"
            )));
        }
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping CSV row {}: {}", i + 2, e);
                skipped += 1;
                continue;
            }
        };

        let mut rec = ActivityRecord::default();
        let mut bad = None;
        for (field, col) in row.iter().zip(col_map.iter()) {
            if let Some(col) = col {
                if let Err(e) = assign(&mut rec, *col, field) {
                    bad = Some(e);
                    break;
                }
            }
        }

        if let Some(reason) = bad {
            warn!("Skipping CSV row {}: {}", i + 2, reason);
            skipped += 1;
            continue;
        }
        if rec.person_id.is_empty() || rec.departure_time.is_none() {
            skipped += 1;
            continue;
        }
        if rec.data_id.is_empty() {
            rec.data_id = format!("csv-{}", i + 2);
        }
        records.push(rec);
    }

    if records.is_empty() && skipped > 0 {
        return Err(DatasetError::Empty(format!(
            "no valid activities found in CSV ({skipped} rows skipped)"
        )));
    }
    if records.is_empty() {
        return Err(DatasetError::Empty(
            "CSV file is empty or has no data rows".to_string(),
        ));
    }

    Ok((records, skipped))
}

pub fn import_activity_csv(path: &Path) -> Result<(Vec<ActivityRecord>, usize), DatasetError> {
    let content = std::fs::read_to_string(path)?;
    parse_activity_csv(&content)
}
