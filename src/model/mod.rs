pub mod activity;
pub mod filter;
pub mod reference;
pub mod timeline;

pub use activity::{ActivityRecord, RestWindow, RowType, FLIGHT_CODE};
pub use filter::{Command, CommandError, FilterSet, Route};
pub use reference::{
    ActivityCodeInfo, AircraftCrewNeed, AssignedCrew, CrewAdequacy, DayClasses, OffDayRow,
    ReferenceTables,
};
pub use timeline::{
    LoadState, RowKey, TimeRange, TimelineEntry, TimelineId, TimelineKind, TimelineViewport,
};
