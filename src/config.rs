use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::model::BoundingBox;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV: &str = "SST_VIEWER_CONFIG";
/// Environment variable overriding the dataset URL.
pub const DATASET_URL_ENV: &str = "SST_DATASET_URL";
/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sst-viewer.json";

/// OISST v2.1 daily anomalies on NOAA AOML's ERDDAP.
pub const DEFAULT_DATASET_URL: &str =
    "https://erddap.aoml.noaa.gov/hdb/erddap/griddap/SST_OI_DAILY_1981_PRESENT_T";

// ---------------------------------------------------------------------------
// Region presets
// ---------------------------------------------------------------------------

/// A named map region. `bbox: None` means the whole globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPreset {
    pub name: String,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
}

impl RegionPreset {
    fn new(name: &str, bbox: Option<BoundingBox>) -> Self {
        Self {
            name: name.to_string(),
            bbox,
        }
    }
}

pub fn default_regions() -> Vec<RegionPreset> {
    vec![
        RegionPreset::new("Global", None),
        RegionPreset::new(
            "East Asia (incl. Korea)",
            Some(BoundingBox::new(15.0, 55.0, 105.0, 150.0)),
        ),
        RegionPreset::new("Korean seas", Some(BoundingBox::new(30.0, 45.0, 120.0, 135.0))),
        RegionPreset::new(
            "North Pacific (dateline)",
            Some(BoundingBox::new(10.0, 60.0, 140.0, -120.0)),
        ),
        RegionPreset::new("Niño 3.4", Some(BoundingBox::new(-5.0, 5.0, -170.0, -120.0))),
        RegionPreset::new("North Atlantic", Some(BoundingBox::new(0.0, 65.0, -80.0, 0.0))),
    ]
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dataset_url: String,
    pub request_timeout_secs: u64,
    /// Number of (date, region) fields kept in memory.
    pub cache_capacity: usize,
    /// Colour scale spans `[-color_limit, +color_limit]` °C.
    pub color_limit: f32,
    pub default_date: NaiveDate,
    pub regions: Vec<RegionPreset>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            request_timeout_secs: 120,
            cache_capacity: 16,
            color_limit: 5.0,
            default_date: NaiveDate::from_ymd_opt(2024, 8, 15).unwrap_or(NaiveDate::MIN),
            regions: default_regions(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from the environment.
    ///
    /// `SST_VIEWER_CONFIG` names a file that must exist; otherwise
    /// `sst-viewer.json` is read if present, else defaults are used.
    /// `SST_DATASET_URL` overrides the dataset URL in every case.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                log::debug!("No configuration file, using defaults");
                Self::default()
            }
        };
        Ok(config.with_env_overrides())
    }

    /// Apply `SST_DATASET_URL`, if set. Also used when the file is unusable
    /// and defaults are taken instead.
    pub fn with_env_overrides(self) -> Self {
        self.with_dataset_url(std::env::var(DATASET_URL_ENV).ok())
    }

    fn with_dataset_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            log::info!("Dataset URL overridden by {DATASET_URL_ENV}");
            self.dataset_url = url;
        }
        self
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config.sanitized())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn sanitized(mut self) -> Self {
        if self.regions.is_empty() {
            self.regions = default_regions();
        }
        if !(self.color_limit.is_finite() && self.color_limit > 0.0) {
            log::warn!("Ignoring invalid color_limit {}", self.color_limit);
            self.color_limit = Self::default().color_limit;
        }
        if self.request_timeout_secs == 0 {
            log::warn!("Ignoring zero request_timeout_secs");
            self.request_timeout_secs = Self::default().request_timeout_secs;
        }
        self
    }
}
