//! lotlist core library - auction manifest aggregation and reporting

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Aggregation, ranking and rendering perform no I/O
// - No global mutable state
// - Deterministic ordering: quantity descending, ties by first occurrence
// - Identical input yields byte-for-byte identical output

pub mod aggregate;
pub mod config;
pub mod convert;
pub mod fetch;
pub mod html;
pub mod links;
pub mod manifest;
pub mod report;
pub mod sink;

pub use aggregate::{aggregate, ItemCounts, ItemKey};
pub use config::ResolvedConfig;
pub use html::{render_html, Layout, RenderOptions};
pub use manifest::{ColumnMap, Manifest, ManifestError, ManifestRow};
pub use report::{rank, render_json, render_text, AggregatedItem, Report};

use std::path::Path;

/// Aggregate and rank manifest rows
pub fn build_report(rows: &[ManifestRow]) -> Report {
    let report = rank(aggregate(rows));
    tracing::debug!(
        items = report.items.len(),
        total = report.total_quantity,
        "report built"
    );
    report
}

/// Load a manifest CSV and build its report
pub fn report_from_file(
    path: &Path,
    columns: &ColumnMap,
) -> Result<(Manifest, Report), ManifestError> {
    let manifest = manifest::load_manifest(path, columns)?;
    if manifest.stats.skipped_rows > 0 {
        tracing::info!(
            skipped = manifest.stats.skipped_rows,
            total = manifest.stats.total_rows,
            "rows without a usable SKU were left out"
        );
    }
    let report = build_report(&manifest.rows);
    Ok((manifest, report))
}
