use std::collections::BTreeMap;

use super::dataset::Dimension;
use super::error::{DataError, DataResult};

// ---------------------------------------------------------------------------
// DAP2 Dataset Descriptor Structure
// ---------------------------------------------------------------------------

/// Parsed `.dds` document: every array variable and its dimensions.
///
/// Example input (as served by ERDDAP griddap):
///
/// ```text
/// Dataset {
///   Float64 time[time = 2];
///   Float32 latitude[latitude = 720];
///   GRID {
///     ARRAY:
///       Float32 anom[time = 2][zlev = 1][latitude = 720][longitude = 1440];
///     MAPS:
///       Float64 time[time = 2];
///   } anom;
/// } SST_OI_DAILY_1981_PRESENT_T;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dds {
    pub name: String,
    pub variables: BTreeMap<String, Vec<Dimension>>,
}

/// Kind of block currently open inside the dataset.
#[derive(Clone, Copy, PartialEq)]
enum Block {
    /// `GRID { ARRAY: ... MAPS: ... }`; `maps` is set once `MAPS:` is seen.
    Grid { maps: bool },
    /// `Structure`, `Sequence` or any other nested constructor.
    Other,
}

impl Dds {
    pub fn parse(text: &str) -> DataResult<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let header = lines
            .next()
            .ok_or_else(|| DataError::Protocol("empty DDS document".into()))?;
        if !header.to_ascii_lowercase().starts_with("dataset") || !header.ends_with('{') {
            return Err(DataError::Protocol(format!(
                "DDS must start with 'Dataset {{', got '{header}'"
            )));
        }

        let mut dds = Dds::default();
        // Blocks opened below the dataset level; empty means top level.
        let mut stack: Vec<Block> = Vec::new();
        let mut closed = false;

        for line in lines {
            let lower = line.to_ascii_lowercase();
            if line.ends_with('{') {
                stack.push(if lower.starts_with("grid") {
                    Block::Grid { maps: false }
                } else {
                    Block::Other
                });
            } else if let Some(rest) = line.strip_prefix('}') {
                if stack.pop().is_none() {
                    dds.name = rest.trim().trim_end_matches(';').trim().to_string();
                    closed = true;
                    break;
                }
            } else if let Some(Block::Grid { maps }) = stack.last_mut() {
                if lower.starts_with("array:") {
                    *maps = false;
                } else if lower.starts_with("maps:") {
                    *maps = true;
                } else if !*maps {
                    if let Some((name, dims)) = parse_declaration(line)? {
                        dds.variables.insert(name, dims);
                    }
                }
            } else if stack.is_empty() {
                if let Some((name, dims)) = parse_declaration(line)? {
                    dds.variables.insert(name, dims);
                }
            }
        }

        if !closed {
            return Err(DataError::Protocol("DDS document is not terminated".into()));
        }
        Ok(dds)
    }

    pub fn dimensions(&self, variable: &str) -> Option<&[Dimension]> {
        self.variables.get(variable).map(Vec::as_slice)
    }
}

/// Parse `Float32 anom[time = 2][zlev = 1];` into a name and its dimensions.
///
/// Lines that are not array declarations (scalars, nested structures) yield
/// `None`.
fn parse_declaration(line: &str) -> DataResult<Option<(String, Vec<Dimension>)>> {
    let Some(decl) = line.strip_suffix(';') else {
        return Ok(None);
    };
    let Some((_type_name, rest)) = decl.split_once(char::is_whitespace) else {
        return Ok(None);
    };
    let rest = rest.trim();
    let Some(open) = rest.find('[') else {
        return Ok(None);
    };
    let name = rest[..open].trim().to_string();

    let mut dims = Vec::new();
    for (i, part) in rest[open..].split('[').skip(1).enumerate() {
        let inner = part
            .trim()
            .strip_suffix(']')
            .ok_or_else(|| DataError::Protocol(format!("unbalanced brackets in '{line}'")))?;
        let (dim_name, len) = match inner.split_once('=') {
            Some((n, l)) => (n.trim().to_string(), l.trim()),
            None => (format!("{name}_dim{i}"), inner.trim()),
        };
        let len = len
            .parse::<usize>()
            .map_err(|_| DataError::Protocol(format!("bad dimension length '{len}' in '{line}'")))?;
        dims.push(Dimension::new(dim_name, len));
    }
    Ok(Some((name, dims)))
}
