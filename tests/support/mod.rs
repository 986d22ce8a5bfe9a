#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crew_timeline::io::{ActivityPage, ActivitySource, FetchError, FetchResult, FlightCrew};
use crew_timeline::model::{ActivityRecord, FilterSet, TimeRange};
use crew_timeline::session::{
    DragCoordinator, NoticeBoard, OrchestratorConfig, TimelineOrchestrator, ZoomController,
    ZoomRegistry,
};

/// 2024-03-01T00:00:00Z
pub fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

pub fn at_hour(hours: i64) -> DateTime<Utc> {
    base() + chrono::Duration::hours(hours)
}

pub fn flight(person: &str, trip: &str, dep_hour: i64, arr_hour: i64) -> ActivityRecord {
    ActivityRecord {
        data_id: format!("{person}-{dep_hour}"),
        person_id: person.to_string(),
        surname: format!("Surname{person}"),
        name: "Test".into(),
        activity_code: "FLT".into(),
        departure_port: "IST".into(),
        arrival_port: "ESB".into(),
        departure_time: Some(at_hour(dep_hour)),
        arrival_time: Some(at_hour(arr_hour)),
        trip_id: trip.to_string(),
        flight_no: format!("TK{dep_hour}"),
        flight_id: format!("F{dep_hour}"),
        ..Default::default()
    }
}

pub fn page(records: Vec<ActivityRecord>) -> ActivityPage {
    ActivityPage {
        total: records.len(),
        records,
    }
}

enum Scripted<T> {
    Ready(FetchResult<T>),
    Gated(oneshot::Receiver<FetchResult<T>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> FetchResult<T> {
        match self {
            Scripted::Ready(result) => result,
            Scripted::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Transport("gate dropped".into()))),
        }
    }
}

/// Fetch collaborator answering from queued scripts and counting calls.
#[derive(Default)]
pub struct ScriptedSource {
    activities: Mutex<VecDeque<Scripted<ActivityPage>>>,
    published: Mutex<HashMap<String, FetchResult<Vec<ActivityRecord>>>>,
    crews: Mutex<HashMap<String, FlightCrew>>,
    pub activity_calls: AtomicUsize,
    pub published_calls: AtomicUsize,
    pub crew_calls: AtomicUsize,
    pub seen_filters: Mutex<Vec<FilterSet>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_page(&self, records: Vec<ActivityRecord>) {
        self.activities
            .lock()
            .push_back(Scripted::Ready(Ok(page(records))));
    }

    pub fn push_error(&self, err: FetchError) {
        self.activities.lock().push_back(Scripted::Ready(Err(err)));
    }

    /// Queue a response that resolves only when the returned sender fires.
    pub fn push_gate(&self) -> oneshot::Sender<FetchResult<ActivityPage>> {
        let (tx, rx) = oneshot::channel();
        self.activities.lock().push_back(Scripted::Gated(rx));
        tx
    }

    pub fn set_published(&self, person: &str, result: FetchResult<Vec<ActivityRecord>>) {
        self.published.lock().insert(person.to_string(), result);
    }

    pub fn set_crew(&self, flight_id: &str, crew: FlightCrew) {
        self.crews.lock().insert(flight_id.to_string(), crew);
    }

    pub fn activity_calls(&self) -> usize {
        self.activity_calls.load(Ordering::SeqCst)
    }

    pub fn published_calls(&self) -> usize {
        self.published_calls.load(Ordering::SeqCst)
    }

    pub fn last_filters(&self) -> Option<FilterSet> {
        self.seen_filters.lock().last().cloned()
    }
}

#[async_trait]
impl ActivitySource for ScriptedSource {
    async fn query_activities(&self, filters: &FilterSet) -> FetchResult<ActivityPage> {
        self.activity_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_filters.lock().push(filters.clone());
        let next = self.activities.lock().pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Ok(ActivityPage::default()),
        }
    }

    async fn query_by_flight_id(&self, flight_id: &str) -> FetchResult<FlightCrew> {
        self.crew_calls.fetch_add(1, Ordering::SeqCst);
        self.crews
            .lock()
            .get(flight_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("no crew for {flight_id}")))
    }

    async fn query_published(&self, person_id: &str) -> FetchResult<Vec<ActivityRecord>> {
        self.published_calls.fetch_add(1, Ordering::SeqCst);
        self.published
            .lock()
            .get(person_id)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::NotFound("no published schedule".into())))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoomCall {
    In,
    Out,
    Set(f32),
    Reset,
    Fit(TimeRange),
}

/// Zoom controller that records every call it receives.
#[derive(Clone)]
pub struct RecordingZoom {
    pub calls: Arc<Mutex<Vec<ZoomCall>>>,
    zoom: f32,
}

impl RecordingZoom {
    pub fn new(zoom: f32) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            zoom,
        }
    }

    pub fn calls(&self) -> Vec<ZoomCall> {
        self.calls.lock().clone()
    }
}

impl ZoomController for RecordingZoom {
    fn zoom_in(&mut self) {
        self.zoom *= 2.0;
        self.calls.lock().push(ZoomCall::In);
    }

    fn zoom_out(&mut self) {
        self.zoom /= 2.0;
        self.calls.lock().push(ZoomCall::Out);
    }

    fn set_zoom(&mut self, value: f32) {
        self.zoom = value;
        self.calls.lock().push(ZoomCall::Set(value));
    }

    fn reset_zoom(&mut self) {
        self.calls.lock().push(ZoomCall::Reset);
    }

    fn fit_to_range(&mut self, range: TimeRange) {
        self.calls.lock().push(ZoomCall::Fit(range));
    }

    fn zoom(&self) -> f32 {
        self.zoom
    }
}

/// Orchestrator over `source` plus the session pieces it was built with.
pub struct Harness {
    pub orchestrator: TimelineOrchestrator,
    pub zoom: ZoomRegistry,
    pub drag: DragCoordinator,
    pub notices: NoticeBoard,
}

pub fn harness(source: Arc<ScriptedSource>) -> Harness {
    harness_with(source, OrchestratorConfig::default())
}

pub fn harness_with(source: Arc<ScriptedSource>, config: OrchestratorConfig) -> Harness {
    let zoom = ZoomRegistry::new();
    let drag = DragCoordinator::new();
    let notices = NoticeBoard::new();
    let orchestrator =
        TimelineOrchestrator::new(source, zoom.clone(), drag.clone(), notices.clone(), config);
    Harness {
        orchestrator,
        zoom,
        drag,
        notices,
    }
}

/// Yield until `cond` holds, failing after a bounded number of polls.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
