use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::{DataError, DataResult};

// ---------------------------------------------------------------------------
// BoundingBox – user-selected region
// ---------------------------------------------------------------------------

/// A latitude/longitude box in degrees.
///
/// `lon_min > lon_max` means the box crosses the antimeridian. Nothing else is
/// validated: latitude bounds may come in either order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    /// Whether the longitude range wraps through ±180°.
    pub fn crosses_antimeridian(&self) -> bool {
        self.lon_min > self.lon_max
    }

    /// Latitude bounds as an ordered `(low, high)` pair.
    pub fn lat_bounds(&self) -> (f64, f64) {
        if self.lat_min <= self.lat_max {
            (self.lat_min, self.lat_max)
        } else {
            (self.lat_max, self.lat_min)
        }
    }

    /// Bit pattern of the four bounds, usable as a hash key.
    pub fn key_bits(&self) -> [u64; 4] {
        [
            self.lat_min.to_bits(),
            self.lat_max.to_bits(),
            self.lon_min.to_bits(),
            self.lon_max.to_bits(),
        ]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lat {}..{}, lon {}..{}",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )
    }
}

// ---------------------------------------------------------------------------
// TimeCoverage – available time steps of a dataset
// ---------------------------------------------------------------------------

/// The timestamps a dataset provides, in dataset order.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeCoverage {
    times: Vec<DateTime<Utc>>,
    min: DateTime<Utc>,
    max: DateTime<Utc>,
}

impl TimeCoverage {
    pub fn new(times: Vec<DateTime<Utc>>) -> DataResult<Self> {
        let min = times.iter().min().copied().ok_or(DataError::EmptyTimeAxis)?;
        let max = times.iter().max().copied().ok_or(DataError::EmptyTimeAxis)?;
        Ok(Self { times, min, max })
    }

    /// Build from a coordinate expressed in seconds since 1970-01-01T00:00Z.
    pub fn from_epoch_seconds(seconds: &[f64]) -> DataResult<Self> {
        let times = seconds
            .iter()
            .map(|&s| epoch_seconds_to_datetime(s))
            .collect::<DataResult<Vec<_>>>()?;
        Self::new(times)
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn min(&self) -> DateTime<Utc> {
        self.min
    }

    pub fn max(&self) -> DateTime<Utc> {
        self.max
    }

    /// Pull `target` into `[min, max]`.
    pub fn clamp(&self, target: DateTime<Utc>) -> DateTime<Utc> {
        target.clamp(self.min, self.max)
    }

    /// Calendar-date version of [`TimeCoverage::clamp`], used by the date picker.
    pub fn clamp_date(&self, date: NaiveDate) -> NaiveDate {
        date.clamp(self.min.date_naive(), self.max.date_naive())
    }

    /// Index of the timestamp closest to `target`.
    ///
    /// When two timestamps are equally close the later one wins, so a request
    /// for midnight picks that day's noon sample rather than the previous
    /// day's.
    pub fn nearest_index(&self, target: DateTime<Utc>) -> usize {
        let mut best = 0;
        let mut best_distance = i64::MAX;
        for (i, t) in self.times.iter().enumerate() {
            let distance = (target - *t).num_milliseconds().abs();
            let closer = distance < best_distance;
            let tie_later = distance == best_distance && *t > self.times[best];
            if closer || tie_later {
                best = i;
                best_distance = distance;
            }
        }
        best
    }
}

pub fn epoch_seconds_to_datetime(seconds: f64) -> DataResult<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(DataError::Protocol(format!("invalid timestamp {seconds}")));
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
        .ok_or_else(|| DataError::Protocol(format!("timestamp {seconds} out of range")))
}

// ---------------------------------------------------------------------------
// GriddedField – a 2-D (lat, lon) slice
// ---------------------------------------------------------------------------

/// A single time slice of a gridded variable, row-major over `(lat, lon)`.
///
/// Missing cells (land, sea ice) are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    pub variable: String,
    pub time: DateTime<Utc>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub values: Vec<f32>,
}

/// Summary statistics over the finite cells of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub valid: usize,
}

impl GriddedField {
    pub fn new(
        variable: impl Into<String>,
        time: DateTime<Utc>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        values: Vec<f32>,
    ) -> DataResult<Self> {
        let expected = lat.len() * lon.len();
        if values.len() != expected {
            return Err(DataError::ShapeMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            variable: variable.into(),
            time,
            lat,
            lon,
            values,
        })
    }

    /// `(rows, cols)` = `(lat.len(), lon.len())`.
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.lon.len() + col]
    }

    /// Keep only the given latitude rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let ncols = self.lon.len();
        let mut values = Vec::with_capacity(rows.len() * ncols);
        for &r in rows {
            values.extend_from_slice(&self.values[r * ncols..(r + 1) * ncols]);
        }
        Self {
            variable: self.variable.clone(),
            time: self.time,
            lat: rows.iter().map(|&r| self.lat[r]).collect(),
            lon: self.lon.clone(),
            values,
        }
    }

    /// Keep only the given longitude columns, in the given order.
    pub fn take_columns(&self, cols: &[usize]) -> Self {
        let ncols = self.lon.len();
        let mut values = Vec::with_capacity(self.lat.len() * cols.len());
        for r in 0..self.lat.len() {
            let row = &self.values[r * ncols..(r + 1) * ncols];
            values.extend(cols.iter().map(|&c| row[c]));
        }
        Self {
            variable: self.variable.clone(),
            time: self.time,
            lat: self.lat.clone(),
            lon: cols.iter().map(|&c| self.lon[c]).collect(),
            values,
        }
    }

    /// Min / max / mean over finite values, `None` if there are none.
    pub fn stats(&self) -> Option<FieldStats> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut valid = 0usize;
        for &v in self.values.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            valid += 1;
        }
        (valid > 0).then(|| FieldStats {
            min,
            max,
            mean: sum / valid as f64,
            valid,
        })
    }

    /// Longitudes made monotone for drawing: after an antimeridian split the
    /// western segment follows the eastern one, so it is shifted by +360°.
    pub fn unwrapped_longitudes(&self) -> Vec<f64> {
        let mut offset = 0.0;
        let mut prev: Option<f64> = None;
        self.lon
            .iter()
            .map(|&lon| {
                if let Some(p) = prev {
                    if lon + offset < p {
                        offset += 360.0;
                    }
                }
                let shifted = lon + offset;
                prev = Some(shifted);
                shifted
            })
            .collect()
    }
}
