use std::ops::Range;
use std::time::Duration;

use chrono::DateTime;
use reqwest::blocking::Client;

use super::dataset::{Dataset, DatasetSource, Dimension};
use super::dds::Dds;
use super::error::{DataError, DataResult};

// ---------------------------------------------------------------------------
// Opening: ordered fallback over candidate URLs
// ---------------------------------------------------------------------------

/// URLs to try, in order, when opening `url`.
///
/// Some servers only answer on the `.nc`-suffixed form of a dataset URL.
pub fn candidate_urls(url: &str) -> Vec<String> {
    let base = url.trim_end_matches('/');
    vec![base.to_string(), format!("{base}.nc")]
}

/// Try each candidate in turn and return the first that opens.
///
/// Every failure is logged; if all fail the error lists each attempt.
pub fn open_first<T, F>(url: &str, candidates: &[String], mut attempt: F) -> DataResult<T>
where
    F: FnMut(&str) -> DataResult<T>,
{
    let mut failures = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match attempt(candidate) {
            Ok(opened) => {
                log::debug!("Opened dataset via {candidate}");
                return Ok(opened);
            }
            Err(e) => {
                log::warn!("Opening {candidate} failed: {e}");
                failures.push(format!("{candidate}: {e}"));
            }
        }
    }
    Err(DataError::Open {
        url: url.to_string(),
        attempts: failures,
    })
}

// ---------------------------------------------------------------------------
// RemoteDataset – ERDDAP griddap / OPeNDAP handle
// ---------------------------------------------------------------------------

/// A dataset served over HTTP.
///
/// Opening only fetches the `.dds` structure document; coordinates and data are
/// requested on demand as `.csv` subsets.
pub struct RemoteDataset {
    client: Client,
    base_url: String,
    dds: Dds,
}

impl RemoteDataset {
    /// Open `url`, falling back to `url.nc` if the plain form fails.
    pub fn open(client: &Client, url: &str) -> DataResult<Self> {
        open_first(url, &candidate_urls(url), |candidate| {
            Self::connect(client, candidate)
        })
    }

    fn connect(client: &Client, base_url: &str) -> DataResult<Self> {
        let text = get_text(client, &format!("{base_url}.dds"))?;
        let dds = Dds::parse(&text)?;
        log::info!(
            "Connected to {} ({}, {} variables)",
            base_url,
            dds.name,
            dds.variables.len()
        );
        Ok(Self {
            client: client.clone(),
            base_url: base_url.to_string(),
            dds,
        })
    }
}

impl Dataset for RemoteDataset {
    fn dimensions(&self, variable: &str) -> DataResult<Vec<Dimension>> {
        self.dds
            .dimensions(variable)
            .map(<[Dimension]>::to_vec)
            .ok_or_else(|| DataError::MissingVariable(variable.to_string()))
    }

    fn coordinate(&self, name: &str) -> DataResult<Vec<f64>> {
        if self.dds.dimensions(name).is_none() {
            return Err(DataError::MissingCoordinate(name.to_string()));
        }
        let url = format!("{}.csv?{}", self.base_url, name);
        let body = get_text(&self.client, &url)?;
        parse_csv_column(&body)
    }

    fn read(&self, variable: &str, slab: &[Range<usize>]) -> DataResult<Vec<f32>> {
        let dims = self.dimensions(variable)?;
        if dims.len() != slab.len() {
            return Err(DataError::Protocol(format!(
                "'{variable}' has {} dimensions but {} ranges were given",
                dims.len(),
                slab.len()
            )));
        }
        let expected: usize = slab.iter().map(|r| r.len()).product();
        if expected == 0 {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}.csv?{}{}",
            self.base_url,
            variable,
            hyperslab_query(slab)
        );
        log::debug!("Reading {expected} values: {url}");
        let body = get_text(&self.client, &url)?;
        let values = parse_csv_values(&body)?;
        if values.len() != expected {
            return Err(DataError::ShapeMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(values)
    }

    fn close(self: Box<Self>) {
        log::debug!("Closed {}", self.base_url);
    }
}

// ---------------------------------------------------------------------------
// RemoteSource – opens a fresh handle per request
// ---------------------------------------------------------------------------

pub struct RemoteSource {
    client: Client,
    url: String,
}

impl RemoteSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> DataResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DatasetSource for RemoteSource {
    fn open(&self) -> DataResult<Box<dyn Dataset>> {
        Ok(Box::new(RemoteDataset::open(&self.client, &self.url)?))
    }
}

// ---------------------------------------------------------------------------
// HTTP / CSV helpers
// ---------------------------------------------------------------------------

fn get_text(client: &Client, url: &str) -> DataResult<String> {
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(DataError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text()?)
}

/// `[a:1:b]` per range, brackets percent-encoded. Stops are inclusive.
fn hyperslab_query(slab: &[Range<usize>]) -> String {
    slab.iter()
        .map(|r| format!("%5B{}:1:{}%5D", r.start, r.end - 1))
        .collect()
}

/// Records of a griddap CSV response, with the units row skipped.
fn csv_records(body: &str) -> DataResult<Vec<csv::StringRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(body.as_bytes());
    reader.headers()?;
    let mut records = reader.records();
    // Second line carries the units of each column.
    records.next().transpose()?;
    Ok(records.collect::<Result<Vec<_>, _>>()?)
}

/// Values of a single-column response (a coordinate axis).
///
/// Timestamps are converted to epoch seconds.
pub fn parse_csv_column(body: &str) -> DataResult<Vec<f64>> {
    csv_records(body)?
        .iter()
        .map(|record| {
            let cell = record
                .get(0)
                .ok_or_else(|| DataError::Protocol("empty CSV row".into()))?;
            parse_coordinate_cell(cell)
        })
        .collect()
}

fn parse_coordinate_cell(cell: &str) -> DataResult<f64> {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<f64>() {
        return Ok(v);
    }
    let t = DateTime::parse_from_rfc3339(cell)
        .map_err(|_| DataError::Protocol(format!("cannot parse coordinate value '{cell}'")))?;
    Ok(t.timestamp() as f64 + t.timestamp_subsec_nanos() as f64 * 1e-9)
}

/// Data values of a hyperslab response: the last column of every row.
pub fn parse_csv_values(body: &str) -> DataResult<Vec<f32>> {
    csv_records(body)?
        .iter()
        .map(|record| {
            let cell = record
                .iter()
                .last()
                .ok_or_else(|| DataError::Protocol("empty CSV row".into()))?
                .trim();
            if cell.is_empty() {
                return Ok(f32::NAN);
            }
            cell.parse::<f32>()
                .map_err(|_| DataError::Protocol(format!("cannot parse data value '{cell}'")))
        })
        .collect()
}
