use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::timeline::TimelineKind;

/// Short command codes and the record fields they filter on.
pub const FIELD_CODES: [(&str, &str); 15] = [
    ("c", "person_id"),
    ("s", "surname"),
    ("a", "activity_code"),
    ("cl", "class"),
    ("dp", "departure_port"),
    ("ap", "arrival_port"),
    ("d", "date"),
    ("t", "trip_id"),
    ("pt", "plane_tail_name"),
    ("pc", "plane_cms_type"),
    ("gc", "group_code"),
    ("fp", "flight_position"),
    ("fn", "flight_no"),
    ("at", "agreement_type"),
    ("fi", "flight_id"),
];

pub fn field_for_code(code: &str) -> Option<&'static str> {
    FIELD_CODES
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, field)| *field)
}

/// Active query of a timeline: field name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeMap<String, String>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `other` laid over `self`; same-named keys take `other`'s value.
    pub fn merged_with(&self, other: &FilterSet) -> FilterSet {
        let mut merged = self.0.clone();
        for (k, v) in &other.0 {
            merged.insert(k.clone(), v.clone());
        }
        FilterSet(merged)
    }

    /// One-line `code value` rendering for the panel header.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(|(field, value)| {
                let code = FIELD_CODES
                    .iter()
                    .find(|(_, f)| f == field)
                    .map(|(c, _)| *c)
                    .unwrap_or(field.as_str());
                format!("{code} {value}")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromIterator<(String, String)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        FilterSet(iter.into_iter().collect())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Timeline {0} does not exist")]
    NoSuchTimeline(usize),
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// Where a search command is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// No prefix: the default roster timeline.
    Default,
    /// `<n>/`, 1-based.
    Index(usize),
    /// `/t`, `/r`, `/rot`: open a new timeline of that kind.
    NewTimeline(TimelineKind),
}

/// A search command split into its route and filter part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub route: Route,
    pub filters: FilterSet,
}

/// Split the routing prefix off `text`. Returns the route and the remainder.
pub fn parse_route(text: &str) -> Result<(Route, &str), CommandError> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && text.as_bytes().get(digits) == Some(&b'/') {
        let index = text[..digits]
            .parse::<usize>()
            .map_err(|_| CommandError::NoSuchTimeline(usize::MAX))?;
        return Ok((Route::Index(index), &text[digits + 1..]));
    }

    if let Some(rest) = text.strip_prefix('/') {
        let letters = rest.bytes().take_while(u8::is_ascii_lowercase).count();
        if letters > 0 {
            let prefix = &text[..letters + 1];
            let kind = match prefix {
                "/t" => TimelineKind::Trip,
                "/r" => TimelineKind::Roster,
                "/rot" => TimelineKind::Rotation,
                _ => return Err(CommandError::UnknownPrefix(prefix.to_string())),
            };
            return Ok((Route::NewTimeline(kind), rest[letters..].trim_start()));
        }
    }

    Ok((Route::Default, text))
}

fn contains_iso_date(token: &str) -> bool {
    token.as_bytes().windows(10).any(|w| {
        w.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
    })
}

/// Parse `code value` pairs. Unknown codes are skipped; `d` takes two dates when both follow.
pub fn parse_filters(text: &str) -> FilterSet {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut filters = FilterSet::new();
    let mut i = 0;
    while i < tokens.len() {
        let Some(field) = field_for_code(tokens[i]) else {
            i += 1;
            continue;
        };
        if field == "date"
            && i + 2 < tokens.len()
            && contains_iso_date(tokens[i + 1])
            && contains_iso_date(tokens[i + 2])
        {
            filters.insert(field, format!("{} {}", tokens[i + 1], tokens[i + 2]));
            i += 3;
        } else if i + 1 < tokens.len() {
            filters.insert(field, tokens[i + 1]);
            i += 2;
        } else {
            i += 1;
        }
    }
    filters
}

/// Parse a whole non-empty search command.
///
/// A bare routing prefix (`/t`, `2/`) is valid and carries no filters. Text
/// that yields no filters is rejected.
pub fn parse_command(text: &str) -> Result<Command, CommandError> {
    let trimmed = text.trim();
    let (route, rest) = parse_route(trimmed)?;
    let filters = parse_filters(rest);
    let bare_prefix = route != Route::Default && rest.trim().is_empty();
    if filters.is_empty() && !bare_prefix {
        return Err(CommandError::InvalidCommand(trimmed.to_string()));
    }
    Ok(Command { route, filters })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_takes_two_values_only_when_both_are_dates() {
        let f = parse_filters("d 2024-01-01 2024-01-31 a FLT");
        assert_eq!(f.get("date"), Some("2024-01-01 2024-01-31"));
        assert_eq!(f.get("activity_code"), Some("FLT"));

        let f = parse_filters("d 2024-01-01 a FLT");
        assert_eq!(f.get("date"), Some("2024-01-01"));
        assert_eq!(f.get("activity_code"), Some("FLT"));
    }

    #[test]
    fn unknown_codes_are_skipped_one_token_at_a_time() {
        let f = parse_filters("zz c 109403 q");
        assert_eq!(f.get("person_id"), Some("109403"));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn trailing_code_without_value_is_dropped() {
        assert!(parse_filters("c").is_empty());
    }

    #[test]
    fn routes() {
        assert_eq!(
            parse_route("1/c 109403").unwrap(),
            (Route::Index(1), "c 109403")
        );
        assert_eq!(
            parse_route("/rot t TRIP-07").unwrap(),
            (Route::NewTimeline(TimelineKind::Rotation), "t TRIP-07")
        );
        assert_eq!(
            parse_route("/r c 1").unwrap().0,
            Route::NewTimeline(TimelineKind::Roster)
        );
        assert_eq!(
            parse_route("/x c 1"),
            Err(CommandError::UnknownPrefix("/x".into()))
        );
        assert_eq!(parse_route("c 1").unwrap(), (Route::Default, "c 1"));
    }

    #[test]
    fn command_without_filters_is_invalid() {
        assert_eq!(
            parse_command("1/ zz"),
            Err(CommandError::InvalidCommand("1/ zz".into()))
        );
        assert_eq!(
            parse_command("zz"),
            Err(CommandError::InvalidCommand("zz".into()))
        );
    }

    #[test]
    fn bare_prefix_is_a_command_without_filters() {
        let cmd = parse_command("/t").unwrap();
        assert_eq!(cmd.route, Route::NewTimeline(TimelineKind::Trip));
        assert!(cmd.filters.is_empty());

        let cmd = parse_command(" 2/ ").unwrap();
        assert_eq!(cmd.route, Route::Index(2));
        assert!(cmd.filters.is_empty());
    }

    #[test]
    fn merge_prefers_new_values() {
        let old = FilterSet::new().with("person_id", "1").with("class", "Y");
        let new = FilterSet::new().with("person_id", "2");
        let merged = old.merged_with(&new);
        assert_eq!(merged.get("person_id"), Some("2"));
        assert_eq!(merged.get("class"), Some("Y"));
    }
}
