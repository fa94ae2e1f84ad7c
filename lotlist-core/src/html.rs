//! HTML report generation
//!
//! Generates a self-contained HTML item list with embedded CSS.
//! Rendering is pure: identical input yields identical output.

use crate::links::SkuLinks;
use crate::report::{AggregatedItem, Report};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HEADING: &str = "Items List";
pub const DEFAULT_IMAGE_WIDTH: u32 = 100;

/// A table column in the item list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Manufacturer,
    Item,
    Image,
    Quantity,
}

impl Column {
    fn header(self) -> &'static str {
        match self {
            Column::Manufacturer => "Manufacturer",
            Column::Item => "Item",
            Column::Image => "Image",
            Column::Quantity => "Quantity",
        }
    }
}

/// Column order of the item table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Manufacturer, Item, Image, Quantity
    #[default]
    Classic,
    /// Item, Manufacturer, Quantity, Image
    Compact,
}

impl Layout {
    pub fn columns(self) -> &'static [Column] {
        match self {
            Layout::Classic => &[
                Column::Manufacturer,
                Column::Item,
                Column::Image,
                Column::Quantity,
            ],
            Layout::Compact => &[
                Column::Item,
                Column::Manufacturer,
                Column::Quantity,
                Column::Image,
            ],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Classic => "classic",
            Layout::Compact => "compact",
        }
    }
}

/// Presentation settings for [`render_html`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub layout: Layout,
    pub heading: String,
    pub links: SkuLinks,
    pub image_width: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            layout: Layout::default(),
            heading: DEFAULT_HEADING.to_string(),
            links: SkuLinks::default(),
            image_width: DEFAULT_IMAGE_WIDTH,
        }
    }
}

/// Render a report as a complete HTML document
pub fn render_html(report: &Report, options: &RenderOptions) -> String {
    let heading = html_escape(&options.heading);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{heading}</title>
    <style>{css}</style>
</head>
<body>
    <h1>{heading}</h1>
    <table>
        <thead>
            {header_row}
        </thead>
        <tbody>
            {rows}
            {totals_row}
        </tbody>
    </table>
</body>
</html>
"#,
        heading = heading,
        css = inline_css(),
        header_row = render_header_row(options.layout),
        rows = render_item_rows(&report.items, options),
        totals_row = render_totals_row(report.total_quantity, options.layout),
    )
}

/// Inline CSS styles
fn inline_css() -> &'static str {
    r#"
table {
    width: 100%;
    border-collapse: collapse;
}

table, th, td {
    border: 1px solid black;
}

th, td {
    padding: 10px;
    text-align: left;
}

.total-row td {
    font-weight: bold;
}
"#
}

fn render_header_row(layout: Layout) -> String {
    let cells: String = layout
        .columns()
        .iter()
        .map(|c| format!("<th>{}</th>", c.header()))
        .collect();
    format!("<tr>{}</tr>", cells)
}

fn render_item_rows(items: &[AggregatedItem], options: &RenderOptions) -> String {
    items
        .iter()
        .map(|item| render_item_row(item, options))
        .collect::<Vec<_>>()
        .join("\n            ")
}

fn render_item_row(item: &AggregatedItem, options: &RenderOptions) -> String {
    let title = html_escape(&item.key.title);
    let cells: String = options
        .layout
        .columns()
        .iter()
        .map(|column| match column {
            Column::Manufacturer => format!("<td>{}</td>", html_escape(&item.key.manufacturer)),
            Column::Item => format!("<td>{}</td>", title),
            Column::Image => format!(
                r#"<td><a href="{link}" target="_blank"><img src="{image}" alt="Image for {title}" width="{width}"></a></td>"#,
                link = html_escape(&options.links.product_link(item.key.sku)),
                image = html_escape(&options.links.image_url(item.key.sku)),
                title = title,
                width = options.image_width,
            ),
            Column::Quantity => format!("<td>{}</td>", item.quantity),
        })
        .collect();

    format!(
        r#"<tr class="item-row" data-sku="{sku}">{cells}</tr>"#,
        sku = item.key.sku,
        cells = cells,
    )
}

/// Totals row: label spans the columns left of Quantity, blanks fill the rest
fn render_totals_row(total: usize, layout: Layout) -> String {
    let columns = layout.columns();
    let qty_pos = columns
        .iter()
        .position(|c| *c == Column::Quantity)
        .unwrap_or(columns.len() - 1);
    let trailing = columns.len() - qty_pos - 1;

    let label = if qty_pos > 0 {
        format!(
            r#"<td colspan="{}"><strong>Total Quantity</strong></td>"#,
            qty_pos
        )
    } else {
        String::new()
    };

    format!(
        r#"<tr class="total-row">{label}<td><strong>{total}</strong></td>{blanks}</tr>"#,
        label = label,
        total = total,
        blanks = "<td></td>".repeat(trailing),
    )
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
