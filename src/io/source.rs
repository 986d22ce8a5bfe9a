//! Collaborators the session fetches activity and reference data through.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ActivityRecord, FilterSet, ReferenceTables};

pub type FetchResult<T> = Result<T, FetchError>;

/// Failure of a fetch. The display text is shown to the user as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{0}")]
    NotFound(String),
    #[error("Session expired, please sign in again")]
    SessionExpired,
    #[error("Connection failed: {0}")]
    Transport(String),
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }

    /// Map an HTTP-style status to the matching variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => FetchError::SessionExpired,
            404 => FetchError::NotFound(message),
            _ => FetchError::Server { status, message },
        }
    }
}

/// One page of a filtered activity query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityPage {
    pub records: Vec<ActivityRecord>,
    pub total: usize,
}

/// Everyone who worked a flight, with their full activity sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightCrew {
    /// Person ids in display order.
    pub person_ids: Vec<String>,
    pub by_person: HashMap<String, Vec<ActivityRecord>>,
}

impl FlightCrew {
    /// All records, person by person in `person_ids` order.
    pub fn flatten(self) -> Vec<ActivityRecord> {
        let FlightCrew {
            person_ids,
            mut by_person,
        } = self;
        person_ids
            .iter()
            .filter_map(|id| by_person.remove(id))
            .flatten()
            .collect()
    }
}

#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn query_activities(&self, filters: &FilterSet) -> FetchResult<ActivityPage>;

    async fn query_by_flight_id(&self, flight_id: &str) -> FetchResult<FlightCrew>;

    /// Published schedule of one person. `NotFound` when none exists.
    async fn query_published(&self, person_id: &str) -> FetchResult<Vec<ActivityRecord>>;
}

#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn load_reference(&self) -> FetchResult<ReferenceTables>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_become_session_expired() {
        assert_eq!(FetchError::from_status(401, "x"), FetchError::SessionExpired);
        assert_eq!(FetchError::from_status(403, "x"), FetchError::SessionExpired);
        assert!(FetchError::from_status(404, "gone").is_not_found());
        assert_eq!(
            FetchError::from_status(500, "boom").to_string(),
            "Server error (500): boom"
        );
    }

    #[test]
    fn flatten_follows_person_order() {
        let rec = |p: &str| ActivityRecord {
            person_id: p.into(),
            ..Default::default()
        };
        let crew = FlightCrew {
            person_ids: vec!["B".into(), "A".into(), "missing".into()],
            by_person: HashMap::from([
                ("A".to_string(), vec![rec("A")]),
                ("B".to_string(), vec![rec("B"), rec("B")]),
            ]),
        };
        let people: Vec<_> = crew.flatten().into_iter().map(|r| r.person_id).collect();
        assert_eq!(people, vec!["B", "B", "A"]);
    }
}
