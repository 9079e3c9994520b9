use eframe::egui;

use crate::state::AppState;
use crate::ui::map::{self, MapView};
use crate::ui::panels;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SstViewerApp {
    pub state: AppState,
    map_view: MapView,
}

impl SstViewerApp {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            map_view: MapView::default(),
        }
    }
}

impl eframe::App for SstViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: date, region, colour scale ----
        egui::SidePanel::left("options_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: map ----
        egui::CentralPanel::default().show(ctx, |ui| {
            map::anomaly_map(ui, &self.state, &mut self.map_view);
        });
    }
}
