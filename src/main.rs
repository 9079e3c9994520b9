mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::SstViewerApp;
use config::AppConfig;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        log::error!("Invalid configuration, using defaults: {e:#}");
        AppConfig::default().with_env_overrides()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "SST Anomaly Viewer",
        options,
        Box::new(|_cc| {
            let mut state = AppState::from_config(config)?;
            // Coverage and the first field are fetched before the first frame.
            state.initialize();
            Ok(Box::new(SstViewerApp::new(state)))
        }),
    )
}
