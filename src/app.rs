use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;

use crew_timeline::model::{TimelineId, TimelineKind, TimelineViewport};
use crew_timeline::session::{Notice, NoticeLevel, PublishRowOutcome, SharedViewport};
use crew_timeline::{ConsoleSettings, LocalActivityStore, Session};

use crate::ui;

const MS_PER_HOUR: f64 = 3_600_000.0;
const NOTICE_HISTORY: usize = 50;

/// Something a timeline panel asked for during the frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    ToggleMinimize(TimelineId),
    Close(TimelineId),
    Redraw(TimelineId),
    ZoomIn(TimelineId),
    ZoomOut(TimelineId),
    ResetZoom(TimelineId),
    ShowPublished { timeline: TimelineId, person_id: String },
    ShowCrew { flight_id: String },
    DropRow { target: TimelineId, before_person: Option<String> },
}

/// Main application state.
pub struct ConsoleApp {
    pub session: Session,
    pub store: Arc<LocalActivityStore>,
    runtime: tokio::runtime::Handle,
    settings_path: PathBuf,

    /// Viewport of each open timeline, also registered as its zoom controller.
    pub viewports: HashMap<TimelineId, SharedViewport>,

    pub command_text: String,
    pub status_message: String,
    pub notice_history: Vec<Notice>,

    // Dialog state
    pub show_about: bool,
    pub show_notices: bool,
}

impl ConsoleApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: tokio::runtime::Handle,
        store: Arc<LocalActivityStore>,
        settings: ConsoleSettings,
        settings_path: PathBuf,
    ) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        ui::theme::apply_theme(&cc.egui_ctx);

        let session = Session::new(settings, store.clone(), store.clone());
        let status_message = format!("{} records available", store.record_count());

        let app = Self {
            session,
            store,
            runtime,
            settings_path,
            viewports: HashMap::new(),
            command_text: String::new(),
            status_message,
            notice_history: Vec::new(),
            show_about: false,
            show_notices: false,
        };
        app.session.timelines.add_new_empty_timeline(TimelineKind::Roster);
        app.load_reference(&cc.egui_ctx);
        app
    }

    /// Run `fut` on the runtime and repaint when it finishes.
    fn spawn<F>(&self, ctx: &egui::Context, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            fut.await;
            ctx.request_repaint();
        });
    }

    fn load_reference(&self, ctx: &egui::Context) {
        let reference = Arc::clone(&self.session.reference);
        let notices = self.session.notices.clone();
        self.spawn(ctx, async move {
            if let Err(e) = reference.ensure_loaded().await {
                notices.error("Reference data", format!("Failed to load reference tables: {e}"));
            }
        });
    }

    // --- Commands ---

    pub fn submit_command(&mut self, ctx: &egui::Context) {
        let text = self.command_text.trim().to_string();
        let timelines = self.session.timelines.clone();
        let notices = self.session.notices.clone();
        self.status_message = if text.is_empty() {
            "Clearing all timelines".to_string()
        } else {
            format!("Searching: {text}")
        };
        self.spawn(ctx, async move {
            if let Err(e) = timelines.handle_global_search(&text).await {
                notices.warning("Invalid command", e.to_string());
            }
        });
    }

    pub fn new_timeline(&mut self, kind: TimelineKind) {
        let id = self.session.timelines.add_new_empty_timeline(kind);
        self.status_message = format!("Opened {} timeline {id}", kind.label());
    }

    pub fn open_dataset(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Crew dataset", &["json", "csv", "txt"])
            .pick_file()
        else {
            return;
        };

        match self.store.reload(&path) {
            Ok(()) => {
                // Reference tables are cached per session, so start a fresh one.
                let mut settings = self.session.settings.clone();
                settings.dataset_path = Some(path.clone());
                for id in self.viewports.keys() {
                    self.session.zoom.unregister(*id);
                }
                self.viewports.clear();
                self.session = Session::new(settings, self.store.clone(), self.store.clone());
                self.session.timelines.add_new_empty_timeline(TimelineKind::Roster);
                self.load_reference(ctx);
                self.save_settings();
                self.status_message = format!(
                    "Opened {} ({} records)",
                    path.display(),
                    self.store.record_count()
                );
            }
            Err(e) => {
                warn!("Failed to open dataset {}: {e}", path.display());
                self.session
                    .notices
                    .error("Open dataset", format!("{}: {e}", path.display()));
            }
        }
    }

    pub fn save_settings(&mut self) {
        match self.session.settings.save_to(&self.settings_path) {
            Ok(()) => info!("Saved settings to {}", self.settings_path.display()),
            Err(e) => {
                warn!("{e}");
                self.status_message = e.to_string();
            }
        }
    }

    pub fn open_settings_folder(&mut self) {
        let dir = ConsoleSettings::config_dir();
        if let Err(e) = std::fs::create_dir_all(&dir).and_then(|()| open::that(&dir)) {
            self.status_message = format!("Cannot open {}: {e}", dir.display());
        }
    }

    pub fn zoom_all(&self, op: ZoomAll) {
        self.session.zoom.for_each(|handle| match op {
            ZoomAll::In => handle.zoom_in(),
            ZoomAll::Out => handle.zoom_out(),
            ZoomAll::Reset => handle.reset_zoom(),
        });
    }

    // --- Panel actions ---

    fn handle_action(&mut self, ctx: &egui::Context, action: PanelAction) {
        let timelines = self.session.timelines.clone();
        match action {
            PanelAction::ToggleMinimize(id) => timelines.toggle_minimize(id),
            PanelAction::Close(id) => {
                if timelines.remove_timeline(id) {
                    self.viewports.remove(&id);
                    self.status_message = format!("Closed {id}");
                }
            }
            PanelAction::Redraw(id) => {
                self.spawn(ctx, async move { timelines.redraw_timeline(id).await });
            }
            PanelAction::ZoomIn(id) => self.with_zoom(id, |h| h.zoom_in()),
            PanelAction::ZoomOut(id) => self.with_zoom(id, |h| h.zoom_out()),
            PanelAction::ResetZoom(id) => self.with_zoom(id, |h| h.reset_zoom()),
            PanelAction::ShowPublished {
                timeline,
                person_id,
            } => {
                let notices = self.session.notices.clone();
                self.spawn(ctx, async move {
                    let outcome = timelines.insert_publish_row_below(&person_id, timeline).await;
                    if let PublishRowOutcome::Inserted(count) = outcome {
                        notices.info(
                            "Published row",
                            format!("{count} published activities shown for {person_id}."),
                        );
                    }
                });
            }
            PanelAction::ShowCrew { flight_id } => {
                self.status_message = format!("Loading crew of flight {flight_id}");
                self.spawn(ctx, async move {
                    timelines.show_flight_crew_in_new_timeline(&flight_id).await;
                });
            }
            PanelAction::DropRow {
                target,
                before_person,
            } => {
                if timelines.drop_dragged_row(target, before_person.as_deref()) {
                    self.status_message = "Row moved".to_string();
                }
            }
        }
    }

    fn with_zoom(&self, id: TimelineId, op: impl FnOnce(&crew_timeline::session::ZoomHandle)) {
        if let Some(handle) = self.session.zoom.get(id) {
            op(&handle);
        }
    }

    /// Give every timeline a viewport and drop viewports of closed ones.
    fn sync_viewports(&mut self) {
        let initial_zoom = self.session.settings.initial_zoom;
        let fit_mode = self.session.settings.fit_mode;
        let entries = self.session.timelines.snapshot();

        self.viewports
            .retain(|id, _| entries.iter().any(|entry| entry.id == *id));

        for entry in &entries {
            if self.viewports.contains_key(&entry.id) {
                continue;
            }
            let now = chrono::Utc::now().timestamp_millis() as f64;
            let viewport: SharedViewport = Arc::new(Mutex::new(TimelineViewport::new(
                now - 12.0 * MS_PER_HOUR,
                initial_zoom,
            )));
            let handle =
                self.session
                    .zoom
                    .register(entry.id, Box::new(viewport.clone()), initial_zoom);
            // Data that arrived before the canvas existed still gets fitted.
            if let Some(range) = fit_mode.range(&entry.flights) {
                handle.fit_to_range(range);
            }
            self.viewports.insert(entry.id, viewport);
        }
    }

    fn collect_notices(&mut self) {
        let fresh = self.session.notices.drain();
        if fresh.is_empty() {
            return;
        }
        if let Some(last) = fresh.last() {
            self.status_message = format!("{}: {}", last.title, last.message);
        }
        if fresh.iter().any(|n| n.level != NoticeLevel::Info) {
            self.show_notices = true;
        }
        self.notice_history.extend(fresh);
        let overflow = self.notice_history.len().saturating_sub(NOTICE_HISTORY);
        self.notice_history.drain(..overflow);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ZoomAll {
    In,
    Out,
    Reset,
}

impl eframe::App for ConsoleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_viewports();
        self.collect_notices();

        // Top panel: menu and command line
        egui::TopBottomPanel::top("command_bar").show(ctx, |ui| {
            ui::command_bar::show_command_bar(self, ui);
        });

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(22.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_sub())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let reference = if self.session.reference.is_loaded() {
                            "Reference loaded"
                        } else {
                            "Reference pending"
                        };
                        ui.label(
                            egui::RichText::new(format!(
                                "Timelines: {} · {reference}",
                                self.session.timelines.len()
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });

        // Central panel: stacked timelines
        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        let actions = egui::CentralPanel::default()
            .frame(chart_frame)
            .show(ctx, |ui| ui::timeline_panel::show_timelines(self, ui))
            .inner;
        for action in actions {
            self.handle_action(ctx, action);
        }
        // A row released outside every timeline is dropped nowhere.
        if self.session.drag.is_active() && !ctx.input(|i| i.pointer.any_down()) {
            self.session.drag.reset();
        }

        // Dialogs
        if self.show_about {
            ui::dialogs::show_about_dialog(self, ctx);
        }
        if self.show_notices {
            ui::dialogs::show_notices_window(self, ctx);
        }

        if self.session.timelines.any_loading() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
