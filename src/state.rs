use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::color::DivergingColorMap;
use crate::config::{AppConfig, RegionPreset};
use crate::data::cache::{FieldCache, FieldKey};
use crate::data::dataset::DatasetSource;
use crate::data::export::export_file;
use crate::data::loader::{list_available_times, load_anomaly};
use crate::data::model::{BoundingBox, GriddedField, TimeCoverage};
use crate::data::remote::RemoteSource;

// ---------------------------------------------------------------------------
// Region selection
// ---------------------------------------------------------------------------

/// Which region the map shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionChoice {
    /// Index into the configured presets.
    Preset(usize),
    Custom,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,

    source: Box<dyn DatasetSource>,

    /// Time steps offered by the dataset (None until first fetched).
    pub coverage: Option<TimeCoverage>,

    /// Requested calendar date, always inside `coverage` once known.
    pub date: NaiveDate,

    pub region: RegionChoice,

    /// Box used when `region` is `Custom`.
    pub custom_bbox: BoundingBox,

    /// Unapplied edits to `custom_bbox` from the side panel.
    pub custom_draft: BoundingBox,

    /// Active colour map.
    pub color_map: DivergingColorMap,

    cache: FieldCache,

    /// Field currently on screen.
    pub field: Option<GriddedField>,

    /// Bumped whenever `field` or `color_map` change so the map texture is
    /// rebuilt.
    pub revision: u64,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// State backed by the remote dataset named in `config`.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let source = RemoteSource::new(config.dataset_url.clone(), config.request_timeout())
            .context("building HTTP client")?;
        log::info!("Using dataset {}", source.url());
        Ok(Self::new(config, Box::new(source)))
    }

    pub fn new(config: AppConfig, source: Box<dyn DatasetSource>) -> Self {
        let color_map = DivergingColorMap::new(config.color_limit);
        let cache = FieldCache::new(config.cache_capacity);
        let custom_bbox = config
            .regions
            .iter()
            .find_map(|r| r.bbox)
            .unwrap_or(BoundingBox::new(-30.0, 30.0, 150.0, -150.0));
        Self {
            date: config.default_date,
            config,
            source,
            coverage: None,
            region: RegionChoice::Preset(0),
            custom_bbox,
            custom_draft: custom_bbox,
            color_map,
            cache,
            field: None,
            revision: 0,
            status_message: None,
        }
    }

    /// Fetch the time coverage and the first field.
    pub fn initialize(&mut self) {
        if self.ensure_coverage() {
            self.refresh();
        }
    }

    /// Load the coverage if it is not known yet. Returns whether it is
    /// available afterwards.
    fn ensure_coverage(&mut self) -> bool {
        if self.coverage.is_some() {
            return true;
        }
        match list_available_times(self.source.as_ref()) {
            Ok(coverage) => {
                let clamped = coverage.clamp_date(self.date);
                if clamped != self.date {
                    log::info!("Date {} outside coverage, using {}", self.date, clamped);
                }
                self.date = clamped;
                self.coverage = Some(coverage);
                true
            }
            Err(e) => {
                log::error!("Failed to list available times: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                false
            }
        }
    }

    /// The bounding box for the current region choice.
    pub fn selected_bbox(&self) -> Option<BoundingBox> {
        match self.region {
            RegionChoice::Preset(i) => self.config.regions.get(i).and_then(|r| r.bbox),
            RegionChoice::Custom => Some(self.custom_bbox),
        }
    }

    pub fn region_name(&self) -> String {
        match self.region {
            RegionChoice::Preset(i) => self
                .config
                .regions
                .get(i)
                .map(|r| r.name.clone())
                .unwrap_or_default(),
            RegionChoice::Custom => format!("Custom: {}", self.custom_bbox),
        }
    }

    pub fn regions(&self) -> &[RegionPreset] {
        &self.config.regions
    }

    /// Load (or fetch from cache) the field for the current date and region.
    pub fn refresh(&mut self) {
        if !self.ensure_coverage() {
            return;
        }
        let bbox = self.selected_bbox();
        let key = FieldKey::new(self.date, bbox.as_ref());
        let source = self.source.as_ref();
        let date = self.date;
        let result = self
            .cache
            .get_or_load(key, || load_anomaly(source, date, bbox.as_ref()))
            .cloned();

        match result {
            Ok(field) => {
                if field.is_empty() {
                    self.status_message = Some("Selected region contains no grid cells".into());
                } else {
                    self.status_message = None;
                }
                self.field = Some(field);
                self.revision += 1;
            }
            Err(e) => {
                log::error!("Failed to load field for {date}: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                // The previous field belongs to another date or region.
                self.field = None;
                self.revision += 1;
            }
        }
    }

    /// Change the date (clamped into coverage) and reload if it moved.
    pub fn set_date(&mut self, date: NaiveDate) {
        let date = match &self.coverage {
            Some(c) => c.clamp_date(date),
            None => date,
        };
        if date != self.date || self.field.is_none() {
            self.date = date;
            self.refresh();
        }
    }

    pub fn set_region(&mut self, region: RegionChoice) {
        if region != self.region {
            self.region = region;
            self.refresh();
        }
    }

    pub fn set_custom_bbox(&mut self, bbox: BoundingBox) {
        self.custom_bbox = bbox;
        self.custom_draft = bbox;
        if self.region == RegionChoice::Custom {
            self.refresh();
        }
    }

    pub fn set_color_limit(&mut self, limit: f32) {
        self.color_map = DivergingColorMap::new(limit);
        self.revision += 1;
    }

    /// Drop cached fields and coverage, then fetch again.
    pub fn reload(&mut self) {
        self.cache.clear();
        self.coverage = None;
        self.status_message = None;
        self.refresh();
    }

    pub fn export_to(&mut self, path: &Path) {
        let Some(field) = &self.field else {
            self.status_message = Some("Nothing to export yet".into());
            return;
        };
        match export_file(path, field, &self.color_map) {
            Ok(()) => self.status_message = Some(format!("Saved {}", path.display())),
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// `(hits, misses)` of the field cache, shown in the top bar.
    pub fn cache_counters(&self) -> (u64, u64) {
        self.cache.counters()
    }

    pub fn cached_fields(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::data::dataset::testing::{MemoryDataset, MemorySource};

    fn noon(month: u32, day: u32) -> f64 {
        Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0)
            .unwrap()
            .timestamp() as f64
    }

    fn state_with(times: Vec<f64>) -> AppState {
        AppState::new(AppConfig::default(), Box::new(MemorySource::new(dataset(times))))
    }

    fn dataset(times: Vec<f64>) -> MemoryDataset {
        let n = times.len();
        MemoryDataset::default()
            .with_coordinate("time", times)
            .with_coordinate("lat", vec![0.0, 10.0])
            .with_coordinate("lon", vec![-175.0, 0.0, 175.0])
            .with_variable(
                "anom",
                &[("time", n), ("lat", 2), ("lon", 3)],
                (0..n * 6).map(|v| v as f32).collect(),
            )
    }

    #[test]
    fn default_date_is_clamped_into_coverage() {
        let mut state = state_with(vec![noon(9, 1), noon(9, 2)]);
        state.initialize();
        assert_eq!(state.date, NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
        assert!(state.field.is_some());
        assert_eq!(state.status_message, None);
    }

    #[test]
    fn region_change_reloads_with_its_box() {
        let mut state = state_with(vec![noon(8, 15)]);
        state.initialize();
        assert_eq!(state.field.as_ref().unwrap().lon.len(), 3);

        state.custom_bbox = BoundingBox::new(0.0, 0.0, 170.0, -170.0);
        state.set_region(RegionChoice::Custom);
        let field = state.field.as_ref().unwrap();
        assert_eq!(field.lon, vec![175.0, -175.0]);
        assert_eq!(field.lat, vec![0.0]);
    }

    #[test]
    fn repeated_selection_hits_the_cache() {
        let mut state = state_with(vec![noon(8, 15), noon(8, 16)]);
        state.initialize();
        let day = NaiveDate::from_ymd_opt(2024, 8, 16).unwrap();
        state.set_date(day);
        state.set_date(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap());
        state.set_date(day);
        assert_eq!(state.cache_counters(), (2, 2));
    }

    #[test]
    fn dates_past_coverage_are_clamped() {
        let mut state = state_with(vec![noon(8, 15), noon(8, 16)]);
        state.initialize();
        state.set_date(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(state.date, NaiveDate::from_ymd_opt(2024, 8, 16).unwrap());
    }

    #[test]
    fn missing_variable_is_reported_not_fatal() {
        let ds = MemoryDataset::default().with_coordinate("time", vec![noon(8, 15)]);
        let mut state = AppState::new(AppConfig::default(), Box::new(MemorySource::new(ds)));
        state.initialize();
        assert!(state.field.is_none());
        assert!(state
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("anom")));
    }

    #[test]
    fn failed_load_clears_the_previous_field() {
        // Coverage and the first field succeed, everything after fails.
        let source = MemorySource::new(dataset(vec![noon(8, 15)])).failing_after(2);
        let mut state = AppState::new(AppConfig::default(), Box::new(source));
        state.initialize();
        assert!(state.field.is_some());
        let before = state.revision;

        state.set_region(RegionChoice::Preset(3));
        assert!(state.field.is_none());
        assert!(state.revision > before);
        assert!(state
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("offline")));
    }

    #[test]
    fn color_limit_change_bumps_revision() {
        let mut state = state_with(vec![noon(8, 15)]);
        let before = state.revision;
        state.set_color_limit(2.0);
        assert_eq!(state.color_map.limit(), 2.0);
        assert!(state.revision > before);
    }
}
