/// Data layer: remote access, normalization, selection and export.
///
/// Architecture:
/// ```text
///   ERDDAP / OPeNDAP server
///        │  <url>.dds, <url>.csv?…   (falls back to <url>.nc)
///        ▼
///   ┌──────────┐
///   │  remote   │  RemoteDataset: lazy handle implementing `Dataset`
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ standardize  │  anom, surface level, clamped nearest time, lat/lon
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  select   │  bounding box, antimeridian split → GriddedField
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  LRU of (date, bbox) → GriddedField
///   └──────────┘
/// ```

pub mod cache;
pub mod dataset;
pub mod dds;
pub mod error;
pub mod export;
pub mod loader;
pub mod model;
pub mod remote;
pub mod select;
pub mod standardize;
