use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata of one activity code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ActivityCodeInfo {
    pub unique_id: i64,
    pub activity_code: String,
    pub activity_group_code: String,
    pub activity_code_explanation: String,
}

/// One row of the off-day entitlement table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OffDayRow {
    pub unique_id: i64,
    /// Worked-day threshold.
    pub work_days: u32,
    pub off_day_entitlement: u32,
    pub distribution: String,
}

/// Cabin and cockpit crew needed per aircraft type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AircraftCrewNeed {
    pub unique_id: i64,
    pub actype: String,
    pub c_count: u32,
    pub p_count: u32,
    pub j_count: u32,
    pub ef_count: u32,
    pub a_count: u32,
    pub s_count: u32,
    pub l_count: u32,
    pub ec_count: u32,
    pub t_count: u32,
}

impl AircraftCrewNeed {
    pub fn total(&self) -> u32 {
        self.c_count
            + self.p_count
            + self.j_count
            + self.ef_count
            + self.a_count
            + self.s_count
            + self.l_count
            + self.ec_count
            + self.t_count
    }
}

/// Staffing of a flight relative to its aircraft's crew need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrewAdequacy {
    Under,
    Over,
    Exact,
}

/// Crew member assigned to a flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssignedCrew {
    pub person_id: String,
    pub role: String,
}

/// Read-only reference snapshot. Empty until loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceTables {
    pub activity_codes: Vec<ActivityCodeInfo>,
    pub off_day_table: Vec<OffDayRow>,
    pub crew_need: Vec<AircraftCrewNeed>,
    /// `"{dep_port}_{flight_no}_{dep_ms}"` to staffing classification.
    pub crew_adequacy: HashMap<String, CrewAdequacy>,
}

impl ReferenceTables {
    pub fn is_empty(&self) -> bool {
        self.activity_codes.is_empty()
            && self.off_day_table.is_empty()
            && self.crew_need.is_empty()
            && self.crew_adequacy.is_empty()
    }

    pub fn activity_code(&self, code: &str) -> Option<&ActivityCodeInfo> {
        self.activity_codes.iter().find(|c| c.activity_code == code)
    }

    pub fn crew_need_for(&self, actype: &str) -> Option<&AircraftCrewNeed> {
        self.crew_need.iter().find(|n| n.actype == actype)
    }
}

const NON_WORKING_CODES: [&str; 8] = ["IHI", "IMZ", "III", "UHK", "IHK", "UDM", "IUS", "IPR"];
const EXTRA_OFF_DAY_CODES: [&str; 12] = [
    "IAC", "IAV", "IBB", "IBC", "IBG", "IBE", "IBI", "IBM", "IBU", "IBV", "IBY", "IOZ",
];

/// Activity-code classes used to classify calendar days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayClasses {
    /// A day with any of these was not worked.
    pub non_working: Vec<String>,
    /// A day with any of these counts as a used off day.
    pub off_day: Vec<String>,
}

impl Default for DayClasses {
    fn default() -> Self {
        let non_working: Vec<String> = NON_WORKING_CODES.iter().map(|c| c.to_string()).collect();
        let off_day = non_working
            .iter()
            .cloned()
            .chain(EXTRA_OFF_DAY_CODES.iter().map(|c| c.to_string()))
            .collect();
        Self {
            non_working,
            off_day,
        }
    }
}

impl DayClasses {
    pub fn is_non_working(&self, code: &str) -> bool {
        self.non_working.iter().any(|c| c == code)
    }

    pub fn is_off_day(&self, code: &str) -> bool {
        self.off_day.iter().any(|c| c == code)
    }
}
