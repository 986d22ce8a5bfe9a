//! Crew activity timelines: orchestration of concurrent timeline views,
//! scheduling derivations and the styling rule engine behind the
//! operations console.

pub mod calc;
pub mod io;
pub mod model;
pub mod rules;
pub mod session;

pub use io::{ActivitySource, ConsoleSettings, FetchError, LocalActivityStore, ReferenceSource};
pub use model::{ActivityRecord, FilterSet, RowType, TimelineEntry, TimelineId, TimelineKind};
pub use session::{Session, TimelineOrchestrator};
