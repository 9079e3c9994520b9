use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::DatePickerButton;

use crate::state::{AppState, RegionChoice};

// ---------------------------------------------------------------------------
// Left side panel – view options
// ---------------------------------------------------------------------------

/// Render the left options panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("View options");
    ui.separator();

    // ---- Date ----
    ui.strong("Date");
    let mut date = state.date;
    let picker = ui.add(DatePickerButton::new(&mut date).id_salt("sst_date"));
    if picker.changed() {
        state.set_date(date);
    }
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("◀ Day").clicked() {
            if let Some(prev) = state.date.pred_opt() {
                state.set_date(prev);
            }
        }
        if ui.small_button("Day ▶").clicked() {
            if let Some(next) = state.date.succ_opt() {
                state.set_date(next);
            }
        }
    });
    if let Some(cov) = &state.coverage {
        ui.label(
            RichText::new(format!(
                "Available: {} – {}",
                cov.min().date_naive(),
                cov.max().date_naive()
            ))
            .small(),
        );
    }
    ui.separator();

    // ---- Region ----
    ui.strong("Region");
    let current = state.region;
    let selected_text = match current {
        RegionChoice::Preset(i) => state
            .regions()
            .get(i)
            .map(|r| r.name.clone())
            .unwrap_or_default(),
        RegionChoice::Custom => "Custom".to_string(),
    };
    let names: Vec<String> = state.regions().iter().map(|r| r.name.clone()).collect();
    let mut choice = current;
    egui::ComboBox::from_id_salt("region")
        .selected_text(selected_text)
        .show_ui(ui, |ui: &mut Ui| {
            for (i, name) in names.iter().enumerate() {
                ui.selectable_value(&mut choice, RegionChoice::Preset(i), name);
            }
            ui.selectable_value(&mut choice, RegionChoice::Custom, "Custom");
        });
    if choice != current {
        state.set_region(choice);
    }

    if state.region == RegionChoice::Custom {
        custom_box_editor(ui, state);
    } else if let Some(b) = state.selected_bbox() {
        ui.label(RichText::new(b.to_string()).small());
    }
    ui.separator();

    // ---- Colour scale ----
    ui.strong("Colour scale");
    let mut limit = state.color_map.limit();
    let slider = ui.add(egui::Slider::new(&mut limit, 0.5..=10.0).text("± °C"));
    if slider.changed() {
        state.set_color_limit(limit);
    }
}

/// Four drag values for the custom box, applied with a button so each drag
/// step does not trigger a download.
fn custom_box_editor(ui: &mut Ui, state: &mut AppState) {
    let draft = &mut state.custom_draft;
    egui::Grid::new("custom_bbox").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("Lat min");
        ui.add(egui::DragValue::new(&mut draft.lat_min).range(-90.0..=90.0).speed(0.5));
        ui.end_row();
        ui.label("Lat max");
        ui.add(egui::DragValue::new(&mut draft.lat_max).range(-90.0..=90.0).speed(0.5));
        ui.end_row();
        ui.label("Lon min");
        ui.add(egui::DragValue::new(&mut draft.lon_min).range(-180.0..=180.0).speed(0.5));
        ui.end_row();
        ui.label("Lon max");
        ui.add(egui::DragValue::new(&mut draft.lon_max).range(-180.0..=180.0).speed(0.5));
        ui.end_row();
    });
    if state.custom_draft.crosses_antimeridian() {
        ui.label(RichText::new("Crosses the dateline").small().italics());
    }
    let edited = state.custom_draft != state.custom_bbox;
    if ui.add_enabled(edited, egui::Button::new("Apply")).clicked() {
        state.set_custom_bbox(state.custom_draft);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
            ui.separator();
            for (label, ext) in [("Export CSV…", "csv"), ("Export Parquet…", "parquet"), ("Export PNG…", "png")] {
                if ui.add_enabled(state.field.is_some(), egui::Button::new(label)).clicked() {
                    save_file_dialog(state, ext);
                    ui.close_menu();
                }
            }
        });

        ui.separator();

        if let Some(field) = &state.field {
            let (rows, cols) = field.shape();
            ui.label(format!("{}  {rows}×{cols}", field.time.format("%Y-%m-%d %H:%M UTC")));
            if let Some(stats) = field.stats() {
                ui.separator();
                ui.label(format!(
                    "min {:+.2}  mean {:+.2}  max {:+.2} °C",
                    stats.min, stats.mean, stats.max
                ));
            }
            let (hits, misses) = state.cache_counters();
            ui.separator();
            ui.label(
                RichText::new(format!(
                    "cache {} fields, {hits}/{} hits",
                    state.cached_fields(),
                    hits + misses
                ))
                .weak(),
            );
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn save_file_dialog(state: &mut AppState, ext: &str) {
    let default_name = format!("sst_anomaly_{}.{ext}", state.date);
    let file = rfd::FileDialog::new()
        .set_title("Export anomaly field")
        .add_filter(ext.to_ascii_uppercase(), &[ext])
        .set_file_name(default_name)
        .save_file();

    if let Some(path) = file {
        state.export_to(&path);
    }
}
