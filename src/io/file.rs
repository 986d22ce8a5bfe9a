use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::csv_import::import_activity_csv;
use super::wire::{WireActivity, WireReference};
use crate::model::{ActivityRecord, ReferenceTables, RowType};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV is missing required columns: {0}")]
    MissingColumns(String),
    #[error("{0}")]
    Empty(String),
}

/// Everything the local store serves.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub actual: Vec<ActivityRecord>,
    pub publish: Vec<ActivityRecord>,
    pub reference: ReferenceTables,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireDataset {
    actual: Vec<WireActivity>,
    publish: Vec<WireActivity>,
    reference: WireReference,
}

/// Parse a dataset JSON document.
pub fn parse_dataset(json: &str) -> Result<Dataset, DatasetError> {
    let wire: WireDataset = serde_json::from_str(json)?;
    Ok(Dataset {
        actual: wire
            .actual
            .into_iter()
            .map(|w| w.into_record(RowType::Actual))
            .collect(),
        publish: wire
            .publish
            .into_iter()
            .map(|w| w.into_record(RowType::Publish))
            .collect(),
        reference: wire.reference.into(),
    })
}

/// Load a dataset from a `.json` document or an activity `.csv` export.
pub fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let (records, _skipped) = import_activity_csv(path)?;
        let (publish, actual) = records
            .into_iter()
            .partition(|r| r.row_type == RowType::Publish);
        return Ok(Dataset {
            actual,
            publish,
            reference: ReferenceTables::default(),
        });
    }

    let json = std::fs::read_to_string(path)?;
    parse_dataset(&json)
}
