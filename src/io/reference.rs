use std::sync::Arc;

use log::{info, warn};
use tokio::sync::OnceCell;

use super::source::{FetchResult, ReferenceSource};
use crate::model::ReferenceTables;
use crate::rules::CrewStatusMap;

/// Process-wide reference tables, loaded once on demand.
pub struct ReferenceData {
    source: Arc<dyn ReferenceSource>,
    tables: OnceCell<Arc<ReferenceTables>>,
    crew_status: Option<CrewStatusMap>,
}

impl ReferenceData {
    pub fn new(source: Arc<dyn ReferenceSource>) -> Self {
        Self {
            source,
            tables: OnceCell::new(),
            crew_status: None,
        }
    }

    /// Push the crew-adequacy table into `statuses` once loaded.
    pub fn with_crew_status(mut self, statuses: CrewStatusMap) -> Self {
        self.crew_status = Some(statuses);
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.tables.initialized()
    }

    /// Load the tables unless already loaded.
    ///
    /// Concurrent callers wait on the same load. A failed load leaves the
    /// service empty and the next call tries again.
    pub async fn ensure_loaded(&self) -> FetchResult<Arc<ReferenceTables>> {
        let tables = self
            .tables
            .get_or_try_init(|| async {
                info!("Loading reference data");
                match self.source.load_reference().await {
                    Ok(tables) => {
                        info!(
                            "Reference data loaded: {} activity codes, {} off-day rows, {} aircraft types, {} crew statuses",
                            tables.activity_codes.len(),
                            tables.off_day_table.len(),
                            tables.crew_need.len(),
                            tables.crew_adequacy.len()
                        );
                        if let Some(statuses) = &self.crew_status {
                            statuses.replace(tables.crew_adequacy.clone());
                        }
                        Ok(Arc::new(tables))
                    }
                    Err(err) => {
                        warn!("Reference data load failed: {err}");
                        Err(err)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(tables))
    }

    /// Current tables; empty until a load has succeeded.
    pub fn tables(&self) -> Arc<ReferenceTables> {
        self.tables.get().cloned().unwrap_or_default()
    }
}
