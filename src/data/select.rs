use super::model::{BoundingBox, GriddedField};

// ---------------------------------------------------------------------------
// Bounding-box selection
// ---------------------------------------------------------------------------

/// Cut `field` down to `bbox`. `None` returns the field unchanged.
///
/// * Latitude keeps every row within the box bounds, whichever order they are
///   given in, so ascending and descending grids behave the same.
/// * Longitude keeps `[lon_min, lon_max]`. When `lon_min > lon_max` the box
///   crosses the antimeridian and the result is `[lon_min, 180]` followed by
///   `[-180, lon_max]`, left in that order.
///
/// An empty intersection yields an empty field rather than an error.
pub fn select(field: &GriddedField, bbox: Option<&BoundingBox>) -> GriddedField {
    let Some(bbox) = bbox else {
        return field.clone();
    };

    let (lat_lo, lat_hi) = bbox.lat_bounds();
    let rows = indices_within(&field.lat, lat_lo, lat_hi);
    let field = field.take_rows(&rows);

    let cols = if bbox.crosses_antimeridian() {
        let mut east = indices_within(&field.lon, bbox.lon_min, 180.0);
        let west = indices_within(&field.lon, -180.0, bbox.lon_max);
        log::debug!(
            "Antimeridian split: {} eastern + {} western columns",
            east.len(),
            west.len()
        );
        east.extend(west);
        east
    } else {
        indices_within(&field.lon, bbox.lon_min, bbox.lon_max)
    };
    field.take_columns(&cols)
}

/// Positions of `axis` values inside the inclusive range `[lo, hi]`, in axis
/// order.
fn indices_within(axis: &[f64], lo: f64, hi: f64) -> Vec<usize> {
    axis.iter()
        .enumerate()
        .filter(|(_, &v)| v >= lo && v <= hi)
        .map(|(i, _)| i)
        .collect()
}
