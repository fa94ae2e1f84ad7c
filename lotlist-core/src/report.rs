//! Ranking and plain-text/JSON output
//!
//! Global invariants enforced:
//! - Items are ordered by quantity descending
//! - Equal quantities keep first-occurrence order
//! - `total_quantity` is the sum of item quantities
//! - Byte-for-byte identical output across runs

use crate::aggregate::{ItemCounts, ItemKey};
use crate::links::SkuLinks;
use serde::{Deserialize, Serialize};

/// One distinct item and how many lots carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedItem {
    #[serde(flatten)]
    pub key: ItemKey,
    pub quantity: usize,
}

/// Ranked items plus the grand total
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub items: Vec<AggregatedItem>,
    pub total_quantity: usize,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Sort a tally into a report, quantity descending
pub fn rank(counts: ItemCounts) -> Report {
    let mut items: Vec<AggregatedItem> = counts
        .into_entries()
        .into_iter()
        .map(|(key, quantity)| AggregatedItem { key, quantity })
        .collect();

    // sort_by is stable: ties stay in first-occurrence order
    items.sort_by(|a, b| b.quantity.cmp(&a.quantity));

    let total_quantity = items.iter().map(|i| i.quantity).sum();
    Report {
        items,
        total_quantity,
    }
}

/// Render a report as a fixed-width text table
pub fn render_text(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<6} {:<10} {:<20} {}\n",
        "QTY", "SKU", "MANUFACTURER", "TITLE"
    ));

    for item in &report.items {
        output.push_str(&format!(
            "{:<6} {:<10} {:<20} {}\n",
            item.quantity,
            item.key.sku,
            truncate_or_pad(&item.key.manufacturer, 20),
            item.key.title,
        ));
    }

    output.push_str(&format!("{:<6} TOTAL\n", report.total_quantity));
    output
}

#[derive(Serialize)]
struct JsonItem<'a> {
    title: &'a str,
    sku: i64,
    manufacturer: &'a str,
    quantity: usize,
    product_link: String,
    image_url: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    total_quantity: usize,
    items: Vec<JsonItem<'a>>,
}

/// Render a report as JSON, including derived links
pub fn render_json(report: &Report, links: &SkuLinks) -> String {
    let doc = JsonReport {
        total_quantity: report.total_quantity,
        items: report
            .items
            .iter()
            .map(|item| JsonItem {
                title: &item.key.title,
                sku: item.key.sku,
                manufacturer: &item.key.manufacturer,
                quantity: item.quantity,
                product_link: links.product_link(item.key.sku),
                image_url: links.image_url(item.key.sku),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc).unwrap_or_else(|_| "{}".to_string())
}

/// Truncate or pad string to a fixed character width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(entries: &[(&str, i64, usize)]) -> ItemCounts {
        let mut counts = ItemCounts::new();
        for &(title, sku, n) in entries {
            for _ in 0..n {
                counts.increment(ItemKey::new(title, sku, "mfg"));
            }
        }
        counts
    }

    #[test]
    fn test_rank_descending() {
        let report = rank(counts(&[("a", 1, 1), ("b", 2, 5), ("c", 3, 3)]));
        let qty: Vec<usize> = report.items.iter().map(|i| i.quantity).collect();
        assert_eq!(qty, vec![5, 3, 1]);
        assert_eq!(report.total_quantity, 9);
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let report = rank(counts(&[
            ("first", 1, 2),
            ("big", 9, 4),
            ("second", 2, 2),
            ("third", 3, 2),
        ]));
        let titles: Vec<&str> = report.items.iter().map(|i| i.key.title.as_str()).collect();
        assert_eq!(titles, vec!["big", "first", "second", "third"]);
    }

    #[test]
    fn test_rank_adjacent_pairs_non_increasing() {
        let entries: Vec<(String, i64, usize)> = (0..30)
            .map(|i| (format!("t{}", i), i as i64, (i * 7 % 11) + 1))
            .collect();
        let borrowed: Vec<(&str, i64, usize)> =
            entries.iter().map(|(t, s, n)| (t.as_str(), *s, *n)).collect();
        let report = rank(counts(&borrowed));

        for pair in report.items.windows(2) {
            assert!(pair[0].quantity >= pair[1].quantity);
        }
    }

    #[test]
    fn test_rank_empty() {
        let report = rank(ItemCounts::new());
        assert!(report.is_empty());
        assert_eq!(report.total_quantity, 0);
    }

    #[test]
    fn test_render_text() {
        let report = rank(counts(&[("Widget", 100001, 2), ("Gadget", 55, 1)]));
        let text = render_text(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2      100001"));
        assert!(lines[1].ends_with("Widget"));
        assert!(lines[3].starts_with("3      TOTAL"));
    }

    #[test]
    fn test_render_json_includes_links() {
        let report = rank(counts(&[("Widget", 100001, 2)]));
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&report, &SkuLinks::default())).unwrap();

        assert_eq!(json["total_quantity"], 2);
        assert_eq!(json["items"][0]["title"], "Widget");
        assert_eq!(json["items"][0]["quantity"], 2);
        assert_eq!(
            json["items"][0]["product_link"],
            "https://www.bestbuy.ca/en-ca/product/100001"
        );
        assert_eq!(
            json["items"][0]["image_url"],
            "https://multimedia.bbycastatic.ca/multimedia/products/500x500/100/10000/100001.jpg"
        );
    }

    #[test]
    fn test_truncate_or_pad_is_char_aware() {
        assert_eq!(truncate_or_pad("abc", 5), "abc  ");
        assert_eq!(truncate_or_pad("ééééééé", 5), "éé...");
    }
}
