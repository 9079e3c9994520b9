use std::ops::Range;

use chrono::{DateTime, Utc};

use super::dataset::{Dataset, Dimension};
use super::error::{DataError, DataResult};
use super::model::{GriddedField, TimeCoverage};

/// Name of the SST anomaly variable.
pub const ANOMALY_VARIABLE: &str = "anom";

/// Name of the time axis.
pub const TIME_AXIS: &str = "time";

/// Depth/level axis names, checked in this order.
pub const DEPTH_AXES: [&str; 3] = ["zlev", "depth", "lev"];

/// Map a source axis name to its canonical short form.
pub fn canonical_axis_name(name: &str) -> &str {
    match name {
        "latitude" => "lat",
        "longitude" => "lon",
        other => other,
    }
}

/// What to do with each axis of the anomaly variable.
enum AxisRole {
    /// Fixed at one index and dropped.
    Fixed(usize),
    Lat,
    Lon,
}

/// Extract a 2-D `(lat, lon)` anomaly field for the time step nearest to
/// `target`.
///
/// The target is clamped into the dataset's time coverage before matching, so
/// requests outside the covered range resolve to the first or last step.
pub fn standardize(dataset: &dyn Dataset, target: DateTime<Utc>) -> DataResult<GriddedField> {
    let dims = dataset.dimensions(ANOMALY_VARIABLE)?;

    let depth_axis = DEPTH_AXES
        .iter()
        .find(|candidate| dims.iter().any(|d| d.name == **candidate))
        .copied();

    if !dims.iter().any(|d| d.name == TIME_AXIS) {
        return Err(DataError::MissingCoordinate(TIME_AXIS.to_string()));
    }
    let coverage = TimeCoverage::from_epoch_seconds(&dataset.coordinate(TIME_AXIS)?)?;
    let clamped = coverage.clamp(target);
    let time_index = coverage.nearest_index(clamped);
    let time = coverage.times()[time_index];
    if clamped != target {
        log::debug!("Requested {target} outside coverage, clamped to {clamped}");
    }

    let mut roles = Vec::with_capacity(dims.len());
    let mut lat_source = None;
    let mut lon_source = None;
    for dim in &dims {
        let role = if dim.name == TIME_AXIS {
            AxisRole::Fixed(time_index)
        } else if Some(dim.name.as_str()) == depth_axis {
            AxisRole::Fixed(0)
        } else {
            match canonical_axis_name(&dim.name) {
                "lat" => {
                    lat_source = Some(dim);
                    AxisRole::Lat
                }
                "lon" => {
                    lon_source = Some(dim);
                    AxisRole::Lon
                }
                _ if dim.len == 1 => AxisRole::Fixed(0),
                _ => {
                    return Err(DataError::UnexpectedDimension {
                        variable: ANOMALY_VARIABLE.to_string(),
                        dimension: dim.name.clone(),
                        len: dim.len,
                    })
                }
            }
        };
        roles.push(role);
    }
    let lat_dim = lat_source.ok_or_else(|| DataError::MissingCoordinate("lat".into()))?;
    let lon_dim = lon_source.ok_or_else(|| DataError::MissingCoordinate("lon".into()))?;

    let lat = read_axis(dataset, lat_dim)?;
    let lon = read_axis(dataset, lon_dim)?;

    let slab: Vec<Range<usize>> = roles
        .iter()
        .zip(&dims)
        .map(|(role, dim)| match role {
            AxisRole::Fixed(i) => *i..*i + 1,
            AxisRole::Lat | AxisRole::Lon => 0..dim.len,
        })
        .collect();
    let mut values = dataset.read(ANOMALY_VARIABLE, &slab)?;

    let lon_first = roles
        .iter()
        .find_map(|r| match r {
            AxisRole::Lat => Some(false),
            AxisRole::Lon => Some(true),
            AxisRole::Fixed(_) => None,
        })
        .unwrap_or(false);
    if lon_first {
        values = transpose(&values, lon.len(), lat.len());
    }

    log::debug!(
        "Standardized '{}' at {} ({} x {})",
        ANOMALY_VARIABLE,
        time,
        lat.len(),
        lon.len()
    );
    let field = GriddedField::new(ANOMALY_VARIABLE, time, lat, lon, values)?;
    Ok(normalize_longitudes(field))
}

fn read_axis(dataset: &dyn Dataset, dim: &Dimension) -> DataResult<Vec<f64>> {
    let values = dataset.coordinate(&dim.name)?;
    if values.len() != dim.len {
        return Err(DataError::ShapeMismatch {
            expected: dim.len,
            actual: values.len(),
        });
    }
    Ok(values)
}

/// Swap a row-major `rows x cols` block into `cols x rows`.
fn transpose(values: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(values.len());
    for c in 0..cols {
        out.extend((0..rows).map(|r| values[r * cols + c]));
    }
    out
}

/// Wrap longitudes above 180° into [-180, 180] and reorder columns so the
/// axis stays ascending. A 180° column is dropped when -180° is also present,
/// since both are the same meridian. Fields already in this form are returned
/// as is.
pub fn normalize_longitudes(field: GriddedField) -> GriddedField {
    let wrapped: Vec<f64> = field
        .lon
        .iter()
        .map(|&l| if l > 180.0 { l - 360.0 } else { l })
        .collect();
    let mut order: Vec<usize> = (0..wrapped.len()).collect();
    order.sort_by(|&a, &b| wrapped[a].total_cmp(&wrapped[b]));
    if wrapped.contains(&-180.0) {
        order.retain(|&i| wrapped[i] != 180.0);
    }
    if order.iter().copied().eq(0..field.lon.len()) && wrapped == field.lon {
        return field;
    }
    if order.len() < wrapped.len() {
        log::debug!("Dropped duplicate 180° longitude column");
    }

    let mut out = field.take_columns(&order);
    out.lon = order.iter().map(|&i| wrapped[i]).collect();
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::data::dataset::testing::MemoryDataset;

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn epoch(t: DateTime<Utc>) -> f64 {
        t.timestamp() as f64
    }

    /// Three days of a 2x3 grid with a depth axis; day `d` holds `d*10 + cell`.
    fn oisst_like(lat_name: &str, lon_name: &str, depth: &str) -> MemoryDataset {
        let mut data = Vec::new();
        for d in 0..3 {
            data.extend((0..6).map(|c| (d * 10 + c) as f32));
        }
        MemoryDataset::default()
            .with_coordinate("time", vec![epoch(noon(1)), epoch(noon(2)), epoch(noon(3))])
            .with_coordinate(depth, vec![0.0])
            .with_coordinate(lat_name, vec![-10.0, 10.0])
            .with_coordinate(lon_name, vec![-170.0, 0.0, 170.0])
            .with_variable(
                "anom",
                &[("time", 3), (depth, 1), (lat_name, 2), (lon_name, 3)],
                data,
            )
    }

    #[test]
    fn selects_nearest_time_slice() {
        let ds = oisst_like("lat", "lon", "zlev");
        let field = standardize(&ds, noon(2) + chrono::Duration::hours(5)).unwrap();
        assert_eq!(field.time, noon(2));
        assert_eq!(field.values, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
    }

    #[test]
    fn out_of_range_times_clamp_to_coverage() {
        let ds = oisst_like("lat", "lon", "zlev");
        let first = standardize(&ds, noon(1)).unwrap();
        let early = standardize(&ds, Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(early, first);

        let last = standardize(&ds, noon(3)).unwrap();
        let late = standardize(&ds, Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(late, last);
    }

    #[test]
    fn long_and_short_names_give_identical_fields() {
        let short = standardize(&oisst_like("lat", "lon", "zlev"), noon(1)).unwrap();
        let long = standardize(&oisst_like("latitude", "longitude", "zlev"), noon(1)).unwrap();
        assert_eq!(short, long);
        assert_eq!(short.lat, vec![-10.0, 10.0]);
    }

    #[test]
    fn every_depth_convention_collapses_to_surface() {
        for depth in DEPTH_AXES {
            let field = standardize(&oisst_like("lat", "lon", depth), noon(3)).unwrap();
            assert_eq!(field.shape(), (2, 3), "depth axis {depth}");
        }
    }

    #[test]
    fn depth_axis_uses_first_level() {
        let ds = MemoryDataset::default()
            .with_coordinate("time", vec![epoch(noon(1))])
            .with_coordinate("lat", vec![0.0])
            .with_coordinate("lon", vec![0.0])
            .with_variable(
                "anom",
                &[("time", 1), ("depth", 2), ("lat", 1), ("lon", 1)],
                vec![1.5, -7.0],
            );
        assert_eq!(standardize(&ds, noon(1)).unwrap().values, vec![1.5]);
    }

    #[test]
    fn lon_lat_storage_is_transposed() {
        let ds = MemoryDataset::default()
            .with_coordinate("time", vec![epoch(noon(1))])
            .with_coordinate("lat", vec![-5.0, 5.0])
            .with_coordinate("lon", vec![10.0, 20.0, 30.0])
            // Stored (lon, lat): lon index major.
            .with_variable(
                "anom",
                &[("time", 1), ("lon", 3), ("lat", 2)],
                vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0],
            );
        let field = standardize(&ds, noon(1)).unwrap();
        assert_eq!(field.values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn zero_to_360_longitudes_are_wrapped() {
        let ds = MemoryDataset::default()
            .with_coordinate("time", vec![epoch(noon(1))])
            .with_coordinate("latitude", vec![0.0])
            .with_coordinate("longitude", vec![0.0, 90.0, 180.0, 270.0])
            .with_variable(
                "anom",
                &[("time", 1), ("zlev", 1), ("latitude", 1), ("longitude", 4)],
                vec![1.0, 2.0, 3.0, 4.0],
            )
            .with_coordinate("zlev", vec![0.0]);
        let field = standardize(&ds, noon(1)).unwrap();
        assert_eq!(field.lon, vec![-90.0, 0.0, 90.0, 180.0]);
        assert_eq!(field.values, vec![4.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn duplicate_dateline_column_is_dropped() {
        let ds = MemoryDataset::default()
            .with_coordinate("time", vec![epoch(noon(1))])
            .with_coordinate("lat", vec![0.0])
            .with_coordinate("lon", vec![-180.0, 0.0, 180.0])
            .with_variable(
                "anom",
                &[("time", 1), ("lat", 1), ("lon", 3)],
                vec![1.0, 2.0, 1.0],
            );
        let field = standardize(&ds, noon(1)).unwrap();
        assert_eq!(field.lon, vec![-180.0, 0.0]);
        assert_eq!(field.values, vec![1.0, 2.0]);
        assert_eq!(field.unwrapped_longitudes(), vec![-180.0, 0.0]);
    }

    #[test]
    fn missing_anomaly_variable_is_a_lookup_error() {
        let ds = MemoryDataset::default().with_coordinate("time", vec![0.0]);
        assert!(matches!(
            standardize(&ds, noon(1)),
            Err(DataError::MissingVariable(v)) if v == "anom"
        ));
    }

    #[test]
    fn missing_coordinates_are_lookup_errors() {
        let no_time = MemoryDataset::default()
            .with_coordinate("lat", vec![0.0])
            .with_coordinate("lon", vec![0.0])
            .with_variable("anom", &[("lat", 1), ("lon", 1)], vec![0.0]);
        assert!(matches!(
            standardize(&no_time, noon(1)),
            Err(DataError::MissingCoordinate(c)) if c == "time"
        ));

        let no_lon = MemoryDataset::default()
            .with_coordinate("time", vec![epoch(noon(1))])
            .with_coordinate("lat", vec![0.0])
            .with_variable("anom", &[("time", 1), ("lat", 1)], vec![0.0]);
        assert!(matches!(
            standardize(&no_lon, noon(1)),
            Err(DataError::MissingCoordinate(c)) if c == "lon"
        ));
    }

    #[test]
    fn unknown_wide_axis_is_rejected() {
        let ds = MemoryDataset::default()
            .with_coordinate("time", vec![epoch(noon(1))])
            .with_coordinate("lat", vec![0.0])
            .with_coordinate("lon", vec![0.0])
            .with_variable(
                "anom",
                &[("time", 1), ("member", 2), ("lat", 1), ("lon", 1)],
                vec![0.0, 1.0],
            );
        assert!(matches!(
            standardize(&ds, noon(1)),
            Err(DataError::UnexpectedDimension { .. })
        ));
    }

    #[test]
    fn canonical_names_pass_through() {
        assert_eq!(canonical_axis_name("lat"), "lat");
        assert_eq!(canonical_axis_name("lon"), "lon");
        assert_eq!(canonical_axis_name("latitude"), "lat");
        assert_eq!(canonical_axis_name("longitude"), "lon");
    }
}
