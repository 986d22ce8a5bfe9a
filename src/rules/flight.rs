use std::collections::HashMap;
use std::sync::Arc;

use egui::Color32;
use parking_lot::RwLock;

use super::context::RuleContext;
use super::engine::{FlightRule, FlightStyle, RuleError};
use crate::model::{ActivityRecord, CrewAdequacy};

pub const EXACT_CREW_FILL: Color32 = Color32::from_rgb(0x98, 0xc8, 0x98);
pub const OVER_CREW_FILL: Color32 = Color32::from_rgb(0x61, 0x98, 0x61);
pub const UNDER_CREW_FILL: Color32 = Color32::from_rgb(0xcc, 0xfe, 0xcc);

/// Lookup key of a flight leg in the crew-adequacy map.
pub fn flight_key(flight: &ActivityRecord) -> Option<String> {
    if flight.departure_port.is_empty() || flight.flight_no.is_empty() {
        return None;
    }
    let departure = flight.departure_ms()?;
    let number = flight.flight_no.trim().trim_start_matches('0');
    Some(format!("{}_{}_{}", flight.departure_port, number, departure))
}

pub fn adequacy_style(status: CrewAdequacy) -> FlightStyle {
    FlightStyle::fill(match status {
        CrewAdequacy::Exact => EXACT_CREW_FILL,
        CrewAdequacy::Over => OVER_CREW_FILL,
        CrewAdequacy::Under => UNDER_CREW_FILL,
    })
}

/// Shared, replaceable crew-adequacy classification.
#[derive(Debug, Clone, Default)]
pub struct CrewStatusMap(Arc<RwLock<HashMap<String, CrewAdequacy>>>);

impl CrewStatusMap {
    pub fn replace(&self, statuses: HashMap<String, CrewAdequacy>) {
        *self.0.write() = statuses;
    }

    pub fn get(&self, key: &str) -> Option<CrewAdequacy> {
        self.0.read().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Colours flight legs by their precomputed staffing.
pub struct CrewAdequacyRule {
    statuses: CrewStatusMap,
}

impl CrewAdequacyRule {
    pub fn new(statuses: CrewStatusMap) -> Self {
        Self { statuses }
    }
}

impl FlightRule for CrewAdequacyRule {
    fn id(&self) -> &str {
        "flt-crew-match-bulk"
    }

    fn name(&self) -> &str {
        "Flight crew need (bulk)"
    }

    fn matches(&self, flight: &ActivityRecord, _ctx: &RuleContext) -> Result<bool, RuleError> {
        Ok(flight.is_flight())
    }

    fn apply(&self, flight: &ActivityRecord, _ctx: &RuleContext) -> Result<FlightStyle, RuleError> {
        Ok(flight_key(flight)
            .and_then(|key| self.statuses.get(&key))
            .map(adequacy_style)
            .unwrap_or_default())
    }
}
