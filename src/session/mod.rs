//! Explicit session state shared by the console and the core.

pub mod drag;
pub mod notices;
pub mod orchestrator;
pub mod progress;
pub mod zoom;

use std::sync::Arc;

pub use drag::{DragCoordinator, DragState};
pub use notices::{Notice, NoticeBoard, NoticeLevel};
pub use orchestrator::{OrchestratorConfig, PublishRowOutcome, TimelineOrchestrator};
pub use progress::{ProgressPolicy, ProgressTicker};
pub use zoom::{SharedViewport, ZoomController, ZoomHandle, ZoomRegistry};

use crate::io::{ActivitySource, ConsoleSettings, ReferenceData, ReferenceSource};
use crate::model::{TimeRange, TimelineEntry};
use crate::rules::{
    default_registry, CrewStatusMap, Invalidate, MetricsTable, RuleContext, RuleEngine,
    RuleRegistry,
};

/// Everything one console window works against.
#[derive(Clone)]
pub struct Session {
    pub settings: ConsoleSettings,
    pub timelines: TimelineOrchestrator,
    pub zoom: ZoomRegistry,
    pub drag: DragCoordinator,
    pub notices: NoticeBoard,
    pub reference: Arc<ReferenceData>,
    pub metrics: MetricsTable,
    rules: Arc<RuleRegistry>,
}

impl Session {
    pub fn new(
        settings: ConsoleSettings,
        activities: Arc<dyn ActivitySource>,
        reference: Arc<dyn ReferenceSource>,
    ) -> Self {
        let zoom = ZoomRegistry::new();
        let drag = DragCoordinator::new();
        let notices = NoticeBoard::new();
        let crew_status = CrewStatusMap::default();
        let metrics = MetricsTable::default();

        let config = OrchestratorConfig {
            rest: settings.rest,
            progress: settings.progress,
            fit_mode: settings.fit_mode,
        };
        let timelines = TimelineOrchestrator::new(
            activities,
            zoom.clone(),
            drag.clone(),
            notices.clone(),
            config,
        );
        let reference = Arc::new(ReferenceData::new(reference).with_crew_status(crew_status.clone()));
        let rules = Arc::new(default_registry(
            crew_status,
            metrics.clone(),
            settings.long_duty_hours,
        ));

        Self {
            settings,
            timelines,
            zoom,
            drag,
            notices,
            reference,
            metrics,
            rules,
        }
    }

    pub fn rules(&self) -> Arc<RuleRegistry> {
        Arc::clone(&self.rules)
    }

    /// Rule engine for one render pass over `entry`.
    pub fn rule_engine(
        &self,
        entry: &TimelineEntry,
        visible_range: Option<TimeRange>,
        invalidate: Option<Invalidate>,
    ) -> RuleEngine {
        let tables = self.reference.tables();
        let mut context =
            RuleContext::for_timeline(entry, visible_range, &tables, &self.settings.day_classes);
        if let Some(invalidate) = invalidate {
            context = context.with_invalidate(invalidate);
        }
        RuleEngine::new(context, self.rules())
    }
}
