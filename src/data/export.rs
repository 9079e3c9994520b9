use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float32Array, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::GriddedField;
use crate::color::DivergingColorMap;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Write `field` to `path`. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – long format `lat,lon,<variable>`, missing cells left empty
/// * `.parquet` – same columns, the value column nullable
/// * `.png`     – one pixel per cell, north up, coloured with `color_map`
pub fn export_file(path: &Path, field: &GriddedField, color_map: &DivergingColorMap) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => export_csv(path, field),
        "parquet" | "pq" => export_parquet(path, field),
        "png" => export_png(path, field, color_map),
        other => bail!("Unsupported export extension: .{other}"),
    }?;
    log::info!(
        "Exported {}x{} field to {}",
        field.lat.len(),
        field.lon.len(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn export_csv(path: &Path, field: &GriddedField) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer
        .write_record(["lat", "lon", field.variable.as_str()])
        .context("writing CSV header")?;

    for (r, lat) in field.lat.iter().enumerate() {
        for (c, lon) in field.lon.iter().enumerate() {
            let v = field.value(r, c);
            let cell = if v.is_nan() { String::new() } else { v.to_string() };
            writer
                .write_record([lat.to_string(), lon.to_string(), cell])
                .with_context(|| format!("writing CSV row ({lat}, {lon})"))?;
        }
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn export_parquet(path: &Path, field: &GriddedField) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("lat", DataType::Float64, false),
        Field::new("lon", DataType::Float64, false),
        Field::new(&field.variable, DataType::Float32, true),
    ]));

    let (rows, cols) = field.shape();
    let lat: Float64Array = (0..rows * cols).map(|i| field.lat[i / cols]).collect::<Vec<_>>().into();
    let lon: Float64Array = (0..rows * cols).map(|i| field.lon[i % cols]).collect::<Vec<_>>().into();
    let values: Float32Array = field
        .values
        .iter()
        .map(|v| (!v.is_nan()).then_some(*v))
        .collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(lat) as ArrayRef,
            Arc::new(lon) as ArrayRef,
            Arc::new(values) as ArrayRef,
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("opening parquet writer")?;
    writer.write(&batch).context("writing parquet record batch")?;
    writer.close().context("finalizing parquet file")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// PNG
// ---------------------------------------------------------------------------

/// Rasterize `field` into RGBA rows, north first.
pub fn rasterize(field: &GriddedField, color_map: &DivergingColorMap) -> (usize, usize, Vec<u8>) {
    let (rows, cols) = field.shape();
    let north_first = rows < 2 || field.lat[0] > field.lat[rows - 1];
    let mut pixels = Vec::with_capacity(rows * cols * 4);
    for i in 0..rows {
        let r = if north_first { i } else { rows - 1 - i };
        for c in 0..cols {
            pixels.extend_from_slice(&color_map.rgba(field.value(r, c)));
        }
    }
    (cols, rows, pixels)
}

fn export_png(path: &Path, field: &GriddedField, color_map: &DivergingColorMap) -> Result<()> {
    if field.is_empty() {
        bail!("Cannot export an empty field as an image");
    }
    let (width, height, pixels) = rasterize(field, color_map);
    let image = image::RgbaImage::from_raw(width as u32, height as u32, pixels)
        .context("building image buffer")?;
    image.save(path).context("writing PNG file")?;
    Ok(())
}
