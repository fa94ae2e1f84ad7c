//! Manifest loading
//!
//! Decodes an auction manifest CSV into [`ManifestRow`]s.
//!
//! Global invariants enforced:
//! - Column lookup is by header name, never by position
//! - A malformed SKU never aborts a load; the row is kept with `sku: None`
//! - Cells are trimmed; bytes that are not UTF-8 never abort a load
//! - Missing required columns are reported all at once

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Errors raised while decoding a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest is missing required column(s): {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("failed to open manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode manifest: {0}")]
    Csv(#[from] csv::Error),
}

/// Header names used to locate manifest columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub title: String,
    pub sku: String,
    pub manufacturer: String,
    /// Optional column; absence is not an error
    pub auction_id: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            title: "Title".to_string(),
            sku: "BBY SKU".to_string(),
            manufacturer: "MFG Name".to_string(),
            auction_id: "Auction ID".to_string(),
        }
    }
}

/// One line of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub title: String,
    /// `None` when the cell was empty or not numeric
    pub sku: Option<i64>,
    pub manufacturer: String,
    pub auction_id: Option<String>,
}

/// Row counts gathered while loading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub total_rows: usize,
    pub skipped_rows: usize,
}

impl LoadStats {
    pub fn valid_rows(&self) -> usize {
        self.total_rows - self.skipped_rows
    }
}

/// A decoded manifest
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub rows: Vec<ManifestRow>,
    pub stats: LoadStats,
}

impl Manifest {
    /// First non-empty auction id found in the rows
    pub fn auction_id(&self) -> Option<&str> {
        self.rows.iter().find_map(|r| r.auction_id.as_deref())
    }
}

/// Parse a SKU cell into an integer.
///
/// Integer text parses directly. Decimal text (as produced by spreadsheet
/// exports, e.g. `100001.0`) is truncated toward zero. Empty, `NaN`,
/// infinite, out-of-range and non-numeric cells yield `None`.
pub fn parse_sku(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }

    let f: f64 = s.parse().ok()?;
    if !f.is_finite() {
        return None;
    }
    let truncated = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

/// Resolved column positions for one header row
struct ColumnIndex {
    title: usize,
    sku: usize,
    manufacturer: usize,
    auction_id: Option<usize>,
}

impl ColumnIndex {
    fn locate(headers: &csv::ByteRecord, columns: &ColumnMap) -> Result<Self, ManifestError> {
        let decoded: Vec<String> = headers.iter().map(lossy).collect();
        let names: Vec<&str> = decoded
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let find = |wanted: &str| names.iter().position(|h| *h == wanted);

        let title = find(columns.title.as_str());
        let sku = find(columns.sku.as_str());
        let manufacturer = find(columns.manufacturer.as_str());

        let missing: Vec<String> = [
            (&columns.title, title),
            (&columns.sku, sku),
            (&columns.manufacturer, manufacturer),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.clone())
        .collect();

        match (title, sku, manufacturer) {
            (Some(title), Some(sku), Some(manufacturer)) => Ok(ColumnIndex {
                title,
                sku,
                manufacturer,
                auction_id: find(columns.auction_id.as_str()),
            }),
            _ => Err(ManifestError::MissingColumns { columns: missing }),
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Trimmed text of a cell; invalid UTF-8 is replaced, not rejected
fn cell(record: &csv::ByteRecord, idx: usize) -> String {
    record
        .get(idx)
        .map(|b| lossy(b).trim().to_string())
        .unwrap_or_default()
}

/// A SKU cell that is not valid UTF-8 is unusable
fn sku_cell(record: &csv::ByteRecord, idx: usize) -> Option<&str> {
    record.get(idx).and_then(|b| std::str::from_utf8(b).ok())
}

/// Decode a manifest from CSV text
pub fn read_manifest<R: Read>(reader: R, columns: &ColumnMap) -> Result<Manifest, ManifestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let index = ColumnIndex::locate(csv_reader.byte_headers()?, columns)?;
    let mut manifest = Manifest::default();

    for (line, result) in csv_reader.byte_records().enumerate() {
        let record = result?;
        let raw_sku = sku_cell(&record, index.sku);
        let sku = raw_sku.and_then(parse_sku);

        manifest.stats.total_rows += 1;
        if sku.is_none() {
            manifest.stats.skipped_rows += 1;
            tracing::debug!(line = line + 2, sku = ?raw_sku, "row has no usable SKU");
        }

        let auction_id = index
            .auction_id
            .map(|idx| cell(&record, idx))
            .filter(|s| !s.is_empty());

        manifest.rows.push(ManifestRow {
            title: cell(&record, index.title),
            sku,
            manufacturer: cell(&record, index.manufacturer),
            auction_id,
        });
    }

    tracing::debug!(
        total = manifest.stats.total_rows,
        skipped = manifest.stats.skipped_rows,
        "manifest decoded"
    );
    Ok(manifest)
}

/// Open and decode a manifest CSV file
pub fn load_manifest(path: &Path, columns: &ColumnMap) -> Result<Manifest, ManifestError> {
    let file = std::fs::File::open(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_manifest(std::io::BufReader::new(file), columns)
}
