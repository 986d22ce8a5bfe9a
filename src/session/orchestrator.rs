//! Lifecycle of the open timelines and their fetches.
//!
//! Every fetch captures its entry's `generation` when it starts. Results are
//! written back only while that generation is still current, so a superseded
//! query can never overwrite the newer one's data. Locks are never held
//! across an `.await`.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::RwLock;

use super::drag::DragCoordinator;
use super::notices::NoticeBoard;
use super::progress::{ProgressPolicy, ProgressTicker};
use super::zoom::ZoomRegistry;
use crate::calc::{annotate_rest, FitMode, RestPolicy};
use crate::io::{ActivitySource, FetchError};
use crate::model::filter::parse_command;
use crate::model::timeline::{group_row_types, rebalance_heights};
use crate::model::{
    ActivityRecord, CommandError, FilterSet, LoadState, Route, RowType, TimeRange, TimelineEntry,
    TimelineId, TimelineKind,
};

/// Knobs the orchestrator reads from the console settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrchestratorConfig {
    pub rest: RestPolicy,
    pub progress: ProgressPolicy,
    pub fit_mode: FitMode,
}

/// Result of [`TimelineOrchestrator::insert_publish_row_below`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishRowOutcome {
    /// The given number of published records were spliced in.
    Inserted(usize),
    AlreadyPresent,
    TimelineMissing,
    NoActualRow,
    NotPublished,
    Failed(String),
}

#[derive(Clone)]
pub struct TimelineOrchestrator {
    timelines: Arc<RwLock<Vec<TimelineEntry>>>,
    source: Arc<dyn ActivitySource>,
    zoom: ZoomRegistry,
    drag: DragCoordinator,
    notices: NoticeBoard,
    config: OrchestratorConfig,
}

impl TimelineOrchestrator {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        zoom: ZoomRegistry,
        drag: DragCoordinator,
        notices: NoticeBoard,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            timelines: Arc::new(RwLock::new(Vec::new())),
            source,
            zoom,
            drag,
            notices,
            config,
        }
    }

    pub fn config(&self) -> OrchestratorConfig {
        self.config
    }

    // ── Read access ─────────────────────────────────────────────

    /// Run `f` against the current timelines without cloning them.
    pub fn with_timelines<R>(&self, f: impl FnOnce(&[TimelineEntry]) -> R) -> R {
        f(&self.timelines.read())
    }

    pub fn snapshot(&self) -> Vec<TimelineEntry> {
        self.timelines.read().clone()
    }

    pub fn timeline(&self, id: TimelineId) -> Option<TimelineEntry> {
        self.timelines.read().iter().find(|t| t.id == id).cloned()
    }

    pub fn ids(&self) -> Vec<TimelineId> {
        self.timelines.read().iter().map(|t| t.id).collect()
    }

    pub fn len(&self) -> usize {
        self.timelines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn any_loading(&self) -> bool {
        self.timelines.read().iter().any(|t| t.state.is_loading())
    }

    // ── Structural operations ───────────────────────────────────

    pub fn add_new_empty_timeline(&self, kind: TimelineKind) -> TimelineId {
        let entry = TimelineEntry::new(kind);
        let id = entry.id;
        let mut timelines = self.timelines.write();
        timelines.push(entry);
        rebalance_heights(&mut timelines);
        info!("Opened {} timeline {id}", kind.label());
        id
    }

    pub fn remove_timeline(&self, id: TimelineId) -> bool {
        let removed = {
            let mut timelines = self.timelines.write();
            let before = timelines.len();
            timelines.retain(|t| t.id != id);
            rebalance_heights(&mut timelines);
            timelines.len() != before
        };
        if removed {
            self.zoom.unregister(id);
            info!("Closed timeline {id}");
        } else {
            warn!("remove_timeline: no timeline {id}");
        }
        removed
    }

    /// Flip the minimized flag; minimized entries sort after the others.
    pub fn toggle_minimize(&self, id: TimelineId) {
        let mut timelines = self.timelines.write();
        let Some(entry) = timelines.iter_mut().find(|t| t.id == id) else {
            warn!("toggle_minimize: no timeline {id}");
            return;
        };
        entry.minimized = !entry.minimized;
        timelines.sort_by_key(|t| t.minimized);
        rebalance_heights(&mut timelines);
    }

    pub fn reset_all_timelines(&self) {
        let ids: Vec<TimelineId> = self.timelines.write().drain(..).map(|t| t.id).collect();
        for id in ids {
            self.zoom.unregister(id);
        }
    }

    /// Replace a timeline's records without fetching.
    pub fn set_timeline_flights(&self, id: TimelineId, records: Vec<ActivityRecord>) {
        let mut timelines = self.timelines.write();
        let Some(entry) = timelines.iter_mut().find(|t| t.id == id) else {
            warn!("set_timeline_flights: no timeline {id}");
            return;
        };
        entry.visible_row_types = group_row_types(&records);
        entry.flights = records;
        entry.generation += 1;
    }

    // ── Fetch lifecycle ─────────────────────────────────────────

    /// Start a new query on `id`, creating the entry if needed. Returns the new generation.
    fn begin_query(&self, id: TimelineId, filters: &FilterSet, kind: TimelineKind) -> u64 {
        let mut timelines = self.timelines.write();
        let index = match timelines.iter().position(|t| t.id == id) {
            Some(index) => index,
            None => {
                timelines.push(TimelineEntry::with_id(id, kind));
                rebalance_heights(&mut timelines);
                timelines.len() - 1
            }
        };
        let entry = &mut timelines[index];
        entry.filters = filters.clone();
        entry.kind = kind;
        entry.state = LoadState::Loading;
        entry.progress = 0;
        entry.generation += 1;
        entry.generation
    }

    fn start_ticker(&self, id: TimelineId, generation: u64) -> ProgressTicker {
        let timelines = Arc::clone(&self.timelines);
        ProgressTicker::start(self.config.progress, move |policy| {
            let mut timelines = timelines.write();
            match timelines.iter_mut().find(|t| t.id == id) {
                Some(entry) if entry.generation == generation && entry.state.is_loading() => {
                    entry.progress = policy.advance(entry.progress);
                    true
                }
                _ => false,
            }
        })
    }

    /// Store fetched records if `generation` is still current. Returns the fit range to apply.
    fn settle_success(
        &self,
        id: TimelineId,
        generation: u64,
        records: Vec<ActivityRecord>,
    ) -> Option<Option<TimeRange>> {
        let records = annotate_rest(records, &self.config.rest);
        let range = if records.is_empty() {
            None
        } else {
            self.config.fit_mode.range(&records)
        };

        let mut timelines = self.timelines.write();
        match timelines.iter_mut().find(|t| t.id == id) {
            Some(entry) if entry.generation == generation => {
                entry.visible_row_types = group_row_types(&records);
                debug!("{id}: {} records loaded", records.len());
                entry.flights = records;
                entry.state = LoadState::Ready;
                entry.progress = 100;
                Some(range)
            }
            _ => {
                debug!("{id}: discarding stale result of generation {generation}");
                None
            }
        }
    }

    fn settle_failure(&self, id: TimelineId, generation: u64, err: &FetchError) {
        let mut timelines = self.timelines.write();
        match timelines.iter_mut().find(|t| t.id == id) {
            Some(entry) if entry.generation == generation => {
                warn!("{id}: fetch failed: {err}");
                entry.flights.clear();
                entry.visible_row_types.clear();
                entry.state = LoadState::Error(err.to_string());
                entry.progress = 0;
            }
            _ => debug!("{id}: discarding stale failure of generation {generation}: {err}"),
        }
    }

    fn apply_fit(&self, id: TimelineId, range: Option<TimeRange>) {
        let Some(handle) = self.zoom.get(id) else {
            debug!("{id}: no zoom controller registered");
            return;
        };
        match range {
            Some(range) => handle.fit_to_range(range),
            None => handle.reset_zoom(),
        }
    }

    /// Replace the query of `id` and fetch its records.
    pub async fn update_timeline(
        &self,
        id: TimelineId,
        filters: FilterSet,
        kind: TimelineKind,
        fit_to_data: bool,
    ) {
        let generation = self.begin_query(id, &filters, kind);

        if filters.is_empty() {
            {
                let mut timelines = self.timelines.write();
                if let Some(entry) = timelines.iter_mut().find(|t| t.id == id) {
                    entry.flights.clear();
                    entry.visible_row_types.clear();
                    entry.state = LoadState::Ready;
                    entry.progress = 100;
                }
            }
            if fit_to_data {
                self.apply_fit(id, None);
            }
            return;
        }

        let ticker = self.start_ticker(id, generation);
        let result = self.source.query_activities(&filters).await;
        drop(ticker);

        match result {
            Ok(page) => {
                if let Some(range) = self.settle_success(id, generation, page.records) {
                    if fit_to_data {
                        self.apply_fit(id, range);
                    }
                }
            }
            Err(err) => self.settle_failure(id, generation, &err),
        }
    }

    /// Re-run a timeline's current query and fit to the result.
    pub async fn redraw_timeline(&self, id: TimelineId) {
        let Some((filters, kind)) = self
            .timelines
            .read()
            .iter()
            .find(|t| t.id == id)
            .map(|t| (t.filters.clone(), t.kind))
        else {
            warn!("redraw_timeline: no timeline {id}");
            return;
        };
        self.update_timeline(id, filters, kind, true).await;
    }

    /// Route a search-bar command to its timeline and run it.
    ///
    /// Input errors are returned before any state changes.
    pub async fn handle_global_search(&self, text: &str) -> Result<(), CommandError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            let targets: Vec<(TimelineId, TimelineKind)> = self
                .timelines
                .read()
                .iter()
                .map(|t| (t.id, t.kind))
                .collect();
            for (id, kind) in targets {
                self.update_timeline(id, FilterSet::new(), kind, true).await;
            }
            return Ok(());
        }

        let command = parse_command(trimmed)?;
        let (id, kind, existing) = match command.route {
            Route::Index(n) => {
                let timelines = self.timelines.read();
                let entry = n
                    .checked_sub(1)
                    .and_then(|i| timelines.get(i))
                    .ok_or(CommandError::NoSuchTimeline(n))?;
                (entry.id, entry.kind, entry.filters.clone())
            }
            Route::NewTimeline(kind) => (self.add_new_empty_timeline(kind), kind, FilterSet::new()),
            Route::Default => {
                let roster = self
                    .timelines
                    .read()
                    .iter()
                    .find(|t| t.kind == TimelineKind::Roster)
                    .map(|t| (t.id, t.filters.clone()));
                match roster {
                    Some((id, filters)) => (id, TimelineKind::Roster, filters),
                    None => (
                        self.add_new_empty_timeline(TimelineKind::Roster),
                        TimelineKind::Roster,
                        FilterSet::new(),
                    ),
                }
            }
        };

        let filters = existing.merged_with(&command.filters);
        self.update_timeline(id, filters, kind, true).await;
        Ok(())
    }

    /// Open a roster timeline with everyone who worked `flight_id`.
    pub async fn show_flight_crew_in_new_timeline(&self, flight_id: &str) -> TimelineId {
        let mut entry = TimelineEntry::new(TimelineKind::Roster);
        entry.state = LoadState::Loading;
        entry.progress = 5;
        entry.generation = 1;
        let id = entry.id;
        {
            let mut timelines = self.timelines.write();
            timelines.push(entry);
            rebalance_heights(&mut timelines);
        }
        info!("Loading crew of flight {flight_id} into {id}");

        let ticker = self.start_ticker(id, 1);
        let result = self.source.query_by_flight_id(flight_id).await;
        drop(ticker);

        match result {
            Ok(crew) => {
                if let Some(range) = self.settle_success(id, 1, crew.flatten()) {
                    self.apply_fit(id, range);
                }
            }
            Err(err) => self.settle_failure(id, 1, &err),
        }
        id
    }

    /// Splice `person_id`'s published schedule in under their actual row.
    pub async fn insert_publish_row_below(
        &self,
        person_id: &str,
        timeline_id: TimelineId,
    ) -> PublishRowOutcome {
        if let Some(outcome) = self.publish_precheck(person_id, timeline_id) {
            return outcome;
        }

        let published = match self.source.query_published(person_id).await {
            Ok(records) => records,
            Err(err) if err.is_not_found() => {
                info!("No published schedule for {person_id}");
                self.notices.warning(
                    "No published record",
                    format!("No published schedule was found for {person_id}."),
                );
                return PublishRowOutcome::NotPublished;
            }
            Err(err) => {
                warn!("Published schedule of {person_id} failed: {err}");
                self.notices.error(
                    "API error",
                    format!("Failed to load the published schedule: {err}"),
                );
                return PublishRowOutcome::Failed(err.to_string());
            }
        };

        let records = annotate_rest(
            published
                .into_iter()
                .map(|r| r.with_row_type(RowType::Publish))
                .collect(),
            &self.config.rest,
        );

        let mut timelines = self.timelines.write();
        let Some(entry) = timelines.iter_mut().find(|t| t.id == timeline_id) else {
            warn!("insert_publish_row_below: timeline {timeline_id} closed during fetch");
            return PublishRowOutcome::TimelineMissing;
        };
        if entry.has_row(person_id, RowType::Publish) {
            return PublishRowOutcome::AlreadyPresent;
        }
        let Some(last_actual) = entry
            .flights
            .iter()
            .rposition(|r| r.person_id == person_id && r.row_type == RowType::Actual)
        else {
            warn!("insert_publish_row_below: no actual row for {person_id}");
            return PublishRowOutcome::NoActualRow;
        };

        let count = records.len();
        entry
            .flights
            .splice(last_actual + 1..last_actual + 1, records);
        let visible = entry
            .visible_row_types
            .entry(person_id.to_string())
            .or_default();
        for row_type in [RowType::Actual, RowType::Publish] {
            if !visible.contains(&row_type) {
                visible.push(row_type);
            }
        }
        info!("{timeline_id}: published row of {person_id} inserted ({count} records)");
        PublishRowOutcome::Inserted(count)
    }

    fn publish_precheck(&self, person_id: &str, timeline_id: TimelineId) -> Option<PublishRowOutcome> {
        let timelines = self.timelines.read();
        let Some(entry) = timelines.iter().find(|t| t.id == timeline_id) else {
            warn!("insert_publish_row_below: no timeline {timeline_id}");
            return Some(PublishRowOutcome::TimelineMissing);
        };
        if entry.has_row(person_id, RowType::Publish) {
            debug!("{timeline_id}: published row of {person_id} already present");
            return Some(PublishRowOutcome::AlreadyPresent);
        }
        if !entry.has_row(person_id, RowType::Actual) {
            warn!("insert_publish_row_below: no actual row for {person_id}");
            return Some(PublishRowOutcome::NoActualRow);
        }
        None
    }

    // ── Row relocation ──────────────────────────────────────────

    /// Drop the dragged row into `target`, before `before_person`'s records or at the end.
    ///
    /// Returns `false` when no drag was active or the target is gone. The drag slot
    /// is cleared either way.
    pub fn drop_dragged_row(&self, target: TimelineId, before_person: Option<&str>) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        let (Some(source), Some(person)) = (drag.source, drag.group_key) else {
            return false;
        };
        if before_person == Some(person.as_str()) {
            return false;
        }

        let mut timelines = self.timelines.write();
        if !timelines.iter().any(|t| t.id == target) {
            warn!("drop_dragged_row: no timeline {target}");
            return false;
        }

        let mut visible = None;
        if let Some(src) = timelines.iter_mut().find(|t| t.id == source) {
            src.flights.retain(|r| r.person_id != person);
            visible = src.visible_row_types.remove(&person);
        }

        let Some(dst) = timelines.iter_mut().find(|t| t.id == target) else {
            return false;
        };
        // A row already shown in the target is replaced by the dragged one.
        dst.flights.retain(|r| r.person_id != person);
        let at = before_person
            .and_then(|p| dst.flights.iter().position(|r| r.person_id == p))
            .unwrap_or(dst.flights.len());
        let visible = visible.unwrap_or_else(|| {
            group_row_types(&drag.records)
                .remove(&person)
                .unwrap_or_default()
        });
        dst.flights.splice(at..at, drag.records);
        dst.visible_row_types.insert(person.clone(), visible);
        info!("Moved row {person} from {source} to {target}");
        true
    }
}
