#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod ui;

use std::sync::Arc;

use log::{info, warn};

use crew_timeline::{ConsoleSettings, LocalActivityStore};

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings_path = ConsoleSettings::default_path();
    let settings = ConsoleSettings::load_from(&settings_path);

    let store = match &settings.dataset_path {
        Some(path) => LocalActivityStore::open(path).unwrap_or_else(|e| {
            warn!("Cannot open dataset {}: {e}", path.display());
            LocalActivityStore::default()
        }),
        None => LocalActivityStore::default(),
    };
    let store = Arc::new(store);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("crew-timeline-io")
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };
    info!("Crew Timeline {} starting", env!("CARGO_PKG_VERSION"));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 400.0])
            .with_title("Crew Timeline"),
        ..Default::default()
    };

    let handle = runtime.handle().clone();
    eframe::run_native(
        "Crew Timeline",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::ConsoleApp::new(
                cc,
                handle,
                store,
                settings,
                settings_path,
            )))
        }),
    )
}
