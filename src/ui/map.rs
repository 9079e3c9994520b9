use eframe::egui::{
    self, Align2, Color32, ColorImage, FontId, Rect, Sense, TextureHandle, TextureOptions, Ui, Vec2,
};
use egui_plot::{GridMark, Plot, PlotImage, PlotPoint};

use crate::color::DivergingColorMap;
use crate::data::export::rasterize;
use crate::data::model::GriddedField;
use crate::state::AppState;

/// Spacing assumed for a single-cell axis, in degrees (OISST grid step).
const DEFAULT_CELL_DEG: f64 = 0.25;

// ---------------------------------------------------------------------------
// Map texture cache
// ---------------------------------------------------------------------------

/// GPU texture of the current field, rebuilt when the state revision moves.
#[derive(Default)]
pub struct MapView {
    texture: Option<(u64, TextureHandle)>,
}

impl MapView {
    fn texture(&mut self, ctx: &egui::Context, state: &AppState, field: &GriddedField) -> TextureHandle {
        if let Some((rev, tex)) = &self.texture {
            if *rev == state.revision {
                return tex.clone();
            }
        }
        let (w, h, pixels) = rasterize(field, &state.color_map);
        let image = ColorImage::from_rgba_unmultiplied([w, h], &pixels);
        let tex = ctx.load_texture("sst_field", image, TextureOptions::NEAREST);
        log::debug!("Rebuilt map texture {w}x{h} (revision {})", state.revision);
        self.texture = Some((state.revision, tex.clone()));
        tex
    }
}

// ---------------------------------------------------------------------------
// Anomaly map (central panel)
// ---------------------------------------------------------------------------

/// Render the anomaly map with its colour bar in the central panel.
pub fn anomaly_map(ui: &mut Ui, state: &AppState, view: &mut MapView) {
    let field = match &state.field {
        Some(f) if !f.is_empty() => f,
        Some(_) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("No grid cells in the selected region");
            });
            return;
        }
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("No field loaded yet  (File → Reload)");
            });
            return;
        }
    };

    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(format!(
            "Daily SST anomaly: {} ({})",
            field.time.format("%Y-%m-%d"),
            state.region_name()
        ));
    });

    let texture = view.texture(ui.ctx(), state, field);
    let lon = field.unwrapped_longitudes();
    let (lon_lo, lon_hi) = axis_extent(&lon);
    let (lat_lo, lat_hi) = axis_extent(&field.lat);
    let center = PlotPoint::new((lon_lo + lon_hi) / 2.0, (lat_lo + lat_hi) / 2.0);
    let size = Vec2::new((lon_hi - lon_lo) as f32, (lat_hi - lat_lo) as f32);

    let colorbar_height = 48.0;
    let plot_height = (ui.available_height() - colorbar_height - 24.0).max(120.0);

    let response = Plot::new("sst_map")
        .height(plot_height)
        .data_aspect(1.0)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .x_axis_formatter(|mark: GridMark, _range| format_lon(mark.value))
        .y_axis_formatter(|mark: GridMark, _range| format_lat(mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.image(PlotImage::new(texture.id(), center, size));
            plot_ui.pointer_coordinate()
        });

    let hover = response
        .inner
        .and_then(|p| cell_at(field, &lon, p.x, p.y).map(|v| (p, v)));
    ui.horizontal(|ui: &mut Ui| match hover {
        Some((p, v)) if v.is_finite() => {
            ui.label(format!("{}, {}: {v:+.2} °C", format_lat(p.y), format_lon(p.x)));
        }
        Some((p, _)) => {
            ui.label(format!("{}, {}: no data", format_lat(p.y), format_lon(p.x)));
        }
        None => {
            ui.label(" ");
        }
    });

    colorbar(ui, &state.color_map, colorbar_height);
}

/// Cell-edge extent of an axis, in ascending order. The cell size is the
/// median spacing, so a single irregular gap does not skew it.
fn axis_extent(axis: &[f64]) -> (f64, f64) {
    let mut steps: Vec<f64> = axis
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|s| *s > 0.0)
        .collect();
    steps.sort_by(f64::total_cmp);
    let step = steps.get(steps.len() / 2).copied().unwrap_or(DEFAULT_CELL_DEG);
    let lo = axis.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = axis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lo - step / 2.0, hi + step / 2.0)
}

/// Value of the cell nearest to a plot position, if it lies on the field.
fn cell_at(field: &GriddedField, lon: &[f64], x: f64, y: f64) -> Option<f32> {
    let (lon_lo, lon_hi) = axis_extent(lon);
    let (lat_lo, lat_hi) = axis_extent(&field.lat);
    if x < lon_lo || x > lon_hi || y < lat_lo || y > lat_hi {
        return None;
    }
    let nearest = |axis: &[f64], v: f64| {
        axis.iter()
            .enumerate()
            .min_by(|a, b| (a.1 - v).abs().total_cmp(&(b.1 - v).abs()))
            .map(|(i, _)| i)
    };
    let col = nearest(lon, x)?;
    let row = nearest(&field.lat, y)?;
    Some(field.value(row, col))
}

fn format_lon(value: f64) -> String {
    let wrapped = (value + 180.0).rem_euclid(360.0) - 180.0;
    match wrapped {
        w if w > 0.0 => format!("{w:.0}°E"),
        w if w < 0.0 => format!("{:.0}°W", -w),
        _ => "0°".to_string(),
    }
}

fn format_lat(value: f64) -> String {
    match value {
        v if v > 0.0 => format!("{v:.0}°N"),
        v if v < 0.0 => format!("{:.0}°S", -v),
        _ => "0°".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Colour bar
// ---------------------------------------------------------------------------

fn colorbar(ui: &mut Ui, color_map: &DivergingColorMap, height: f32) {
    let width = (ui.available_width() * 0.8).max(100.0);
    let (rect, _) = ui.allocate_exact_size(Vec2::new(ui.available_width(), height), Sense::hover());
    let bar = Rect::from_min_size(
        egui::pos2(rect.center().x - width / 2.0, rect.top()),
        Vec2::new(width, 14.0),
    );
    let painter = ui.painter_at(rect);

    let segments = 128;
    let limit = color_map.limit();
    for i in 0..segments {
        let t0 = i as f32 / segments as f32;
        let t1 = (i + 1) as f32 / segments as f32;
        let value = -limit + 2.0 * limit * (t0 + t1) / 2.0;
        let seg = Rect::from_min_max(
            egui::pos2(bar.left() + t0 * width, bar.top()),
            egui::pos2(bar.left() + t1 * width, bar.bottom()),
        );
        painter.rect_filled(seg, 0.0, color_map.color32(value));
    }

    let text_color = ui.visuals().text_color();
    for tick in color_map.ticks(5) {
        let x = bar.left() + color_map.normalize(tick) * width;
        painter.line_segment(
            [egui::pos2(x, bar.bottom()), egui::pos2(x, bar.bottom() + 3.0)],
            (1.0, text_color),
        );
        painter.text(
            egui::pos2(x, bar.bottom() + 4.0),
            Align2::CENTER_TOP,
            format!("{tick:+.1}"),
            FontId::proportional(11.0),
            text_color,
        );
    }
    painter.text(
        egui::pos2(bar.center().x, bar.bottom() + 18.0),
        Align2::CENTER_TOP,
        "SST anomaly (°C, 1971–2000 baseline)",
        FontId::proportional(12.0),
        Color32::from_gray(160),
    );
}
