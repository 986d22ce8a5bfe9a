pub mod csv_import;
pub mod file;
pub mod local_store;
pub mod reference;
pub mod settings;
pub mod source;
pub mod wire;

pub use file::{load_dataset, Dataset, DatasetError};
pub use local_store::LocalActivityStore;
pub use reference::ReferenceData;
pub use settings::{ConsoleSettings, SettingsError};
pub use source::{
    ActivityPage, ActivitySource, FetchError, FetchResult, FlightCrew, ReferenceSource,
};
