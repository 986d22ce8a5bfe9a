pub mod metrics;
pub mod rest;
pub mod time_range;

pub use metrics::{compute_row_metrics, RowMetrics};
pub use rest::{annotate_rest, rest_for_flight, rest_window, RestPolicy};
pub use time_range::{dense_range, padded_range, FitMode};
