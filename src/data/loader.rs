use anyhow::{Context, Result};
use chrono::NaiveDate;

use super::dataset::{Dataset, DatasetSource};
use super::model::{BoundingBox, GriddedField, TimeCoverage};
use super::select::select;
use super::standardize::{standardize, TIME_AXIS};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Open the dataset once and return the time steps it covers.
pub fn list_available_times(source: &dyn DatasetSource) -> Result<TimeCoverage> {
    let dataset = source.open().context("opening dataset")?;
    let coverage = read_coverage(dataset.as_ref());
    dataset.close();
    let coverage = coverage?;
    log::info!(
        "Dataset covers {} .. {} ({} steps)",
        coverage.min().date_naive(),
        coverage.max().date_naive(),
        coverage.len()
    );
    Ok(coverage)
}

/// Load the anomaly field for `date`, optionally cut to `bbox`.
///
/// The date is matched at 00:00 UTC against the dataset's time axis, clamped
/// into its coverage.
pub fn load_anomaly(
    source: &dyn DatasetSource,
    date: NaiveDate,
    bbox: Option<&BoundingBox>,
) -> Result<GriddedField> {
    let dataset = source.open().context("opening dataset")?;
    let target = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let field = standardize(dataset.as_ref(), target);
    dataset.close();
    let field = field.with_context(|| format!("reading anomaly field for {date}"))?;

    let selected = select(&field, bbox);
    if let Some(b) = bbox {
        log::info!(
            "Loaded {} ({}) -> {}x{} cells",
            field.time,
            b,
            selected.lat.len(),
            selected.lon.len()
        );
    } else {
        log::info!(
            "Loaded {} (global) -> {}x{} cells",
            field.time,
            selected.lat.len(),
            selected.lon.len()
        );
    }
    Ok(selected)
}

fn read_coverage(dataset: &dyn Dataset) -> Result<TimeCoverage> {
    let seconds = dataset.coordinate(TIME_AXIS).context("reading time axis")?;
    Ok(TimeCoverage::from_epoch_seconds(&seconds)?)
}
