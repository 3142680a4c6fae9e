//! HTML rendering
//!
//! Sections render to fragments that can be embedded into an existing page,
//! or to a standalone page carrying the stylesheet for the level classes.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::{Block, Row, Section, Table};
use crate::error::{ReportError, Result};

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn class_attr(classes: &[String]) -> String {
    if classes.is_empty() {
        String::new()
    } else {
        format!(r#" class="{}""#, escape(&classes.join(" ")))
    }
}

pub fn render_table(table: &Table) -> String {
    let mut html = String::new();
    let total_width: u32 = table.columns.iter().map(|c| u32::from(c.width)).sum();

    let _ = writeln!(
        html,
        r#"<table id="{}"{}>"#,
        escape(&table.id),
        class_attr(&table.classes)
    );

    html.push_str("  <colgroup>\n");
    for column in &table.columns {
        let percent = if total_width == 0 {
            0
        } else {
            u32::from(column.width) * 100 / total_width
        };
        let _ = writeln!(html, r#"    <col style="width: {percent}%">"#);
    }
    html.push_str("  </colgroup>\n");

    html.push_str("  <thead>\n    <tr>");
    for column in &table.columns {
        let _ = write!(html, "<th>{}</th>", escape(&column.title));
    }
    html.push_str("</tr>\n  </thead>\n");

    html.push_str("  <tbody>\n");
    for row in &table.rows {
        html.push_str(&render_row(row));
    }
    html.push_str("  </tbody>\n</table>\n");

    html
}

fn render_row(row: &Row) -> String {
    let mut html = format!("    <tr{}>", class_attr(&row.classes));

    for (index, cell) in row.cells.iter().enumerate() {
        let class = cell
            .class
            .as_ref()
            .map(|c| format!(r#" class="{}""#, escape(c)))
            .unwrap_or_default();
        let indent = if index == 0 && row.depth > 0 {
            format!(r#" style="padding-left: {}em""#, row.depth)
        } else {
            String::new()
        };
        let _ = write!(html, "<td{class}{indent}>{}</td>", escape(&cell.text));
    }

    html.push_str("</tr>\n");
    html
}

/// Section as an embeddable fragment
pub fn render_section(section: &Section) -> String {
    let mut html = format!(
        "<div class=\"report-section\" id=\"{}\">\n",
        escape(&section.id)
    );

    for block in &section.blocks {
        match block {
            Block::Rubric(text) => {
                let _ = writeln!(html, r#"<p class="rubric">{}</p>"#, escape(text));
            }
            Block::Table(table) => html.push_str(&render_table(table)),
            Block::Paragraph(text) => {
                let _ = writeln!(html, "<p>{}</p>", escape(text));
            }
            Block::Error { category, message } => {
                let _ = writeln!(
                    html,
                    r#"<div class="report-error report-error-{}"><p class="report-error-title">Report could not be built</p><p>{}</p></div>"#,
                    category.label(),
                    escape(message)
                );
            }
        }
    }

    html.push_str("</div>\n");
    html
}

/// Standalone page for one section
pub fn render_page(section: &Section) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
{style}
    </style>
</head>
<body>
    <h1>{title}</h1>
{content}</body>
</html>
"##,
        title = escape(&section.title),
        style = STYLESHEET,
        content = render_section(section),
    )
}

pub fn write_page(section: &Section, output_path: &Path) -> Result<()> {
    fs::write(output_path, render_page(section)).map_err(|e| ReportError::io(output_path, e))
}

const STYLESHEET: &str = r#"        * { box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #0f0f1a;
            color: #eee;
            padding: 20px 30px;
        }
        h1 { color: #00d4ff; font-size: 24px; margin-bottom: 15px; }
        .rubric { color: #888; font-weight: bold; margin: 15px 0 5px; }
        table { border-collapse: collapse; width: 100%; margin-bottom: 20px; }
        th {
            background: #16213e;
            color: #aaa;
            font-size: 12px;
            text-align: left;
            padding: 8px;
            border-bottom: 1px solid #2d2d44;
        }
        td { padding: 6px 8px; border-bottom: 1px solid #2d2d44; font-size: 13px; }
        tr.report-codecov-summary td, tr.report-doccov-summary td, tr.report-unittest-summary td {
            font-weight: bold;
            border-top: 2px solid #2d2d44;
        }
        .report-cov-below30 { background: rgba(239, 83, 80, 0.45); }
        .report-cov-below50 { background: rgba(255, 152, 0, 0.40); }
        .report-cov-below80 { background: rgba(255, 215, 0, 0.30); }
        .report-cov-below90 { background: rgba(139, 195, 74, 0.30); }
        .report-cov-below100 { background: rgba(38, 166, 154, 0.35); }
        .report-cov-error { background: rgba(156, 39, 176, 0.45); }
        .report-error {
            background: #1a1a2e;
            border-left: 4px solid #ef5350;
            padding: 10px 15px;
        }
        .report-error-title { color: #ef5350; font-weight: bold; }"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use tempfile::TempDir;

    fn table() -> Table {
        let mut table = Table::new("src", "report-codecov-table")
            .column("Module", 300)
            .column("Coverage in %", 100);
        table.push(Row::new(&["report-codecov-package"]).cell("📦pkg").cell("70.0%"));
        table.push(
            Row::new(&["report-codecov-module", "report-cov-below30"])
                .with_depth(1)
                .cell("<main>")
                .styled_cell("10.0%", "report-cov-below30"),
        );
        table
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_render_table() {
        let html = render_table(&table());

        assert!(html.starts_with(r#"<table id="src" class="report-codecov-table">"#));
        assert!(html.contains(r#"<col style="width: 75%">"#));
        assert!(html.contains("<th>Coverage in %</th>"));
        assert!(html.contains(r#"<tr class="report-codecov-module report-cov-below30">"#));
        assert!(html.contains(r#"<td style="padding-left: 1em">&lt;main&gt;</td>"#));
        assert!(html.contains(r#"<td class="report-cov-below30">10.0%</td>"#));
    }

    #[test]
    fn test_error_placeholder() {
        let mut section = Section::new("src", "Code coverage");
        section.push(Block::Error {
            category: ErrorCategory::ReportFile,
            message: "JSON coverage report file 'x' not found".to_string(),
        });

        let html = render_section(&section);
        assert!(html.contains("report-error-report-file"));
        assert!(html.contains("not found"));
    }

    #[test]
    fn test_write_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");

        let mut section = Section::new("src", "Coverage & friends");
        section.push(Block::Table(table()));
        write_page(&section, &path).unwrap();

        let html = fs::read_to_string(&path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Coverage &amp; friends</title>"));
        assert!(html.contains(".report-cov-error"));
    }
}
