//! Terminal rendering with aligned columns and level colors

use colored::{Color, ColoredString, Colorize};

use super::{Block, Row, Section, Table};

/// Color of a row, derived from its level or status class
fn row_color(row: &Row) -> Option<Color> {
    row.classes.iter().find_map(|class| class_color(class))
}

fn class_color(class: &str) -> Option<Color> {
    match class {
        "report-cov-below30" | "failed" | "errored" => Some(Color::Red),
        "report-cov-below50" => Some(Color::BrightRed),
        "report-cov-below80" | "skipped" => Some(Color::Yellow),
        "report-cov-below90" => Some(Color::BrightGreen),
        "report-cov-below100" | "passed" => Some(Color::Green),
        "report-cov-error" | "unknown" => Some(Color::Magenta),
        _ => None,
    }
}

fn is_summary(row: &Row) -> bool {
    row.classes.iter().any(|c| c.ends_with("-summary"))
}

fn width_of(text: &str) -> usize {
    text.chars().count()
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(width_of(text)));
    if right_align {
        format!("{fill}{text}")
    } else {
        format!("{text}{fill}")
    }
}

/// Indented text of a row's first cell
fn first_cell_text(row: &Row) -> String {
    let text = row.cells.first().map(|c| c.text.as_str()).unwrap_or_default();
    format!("{}{}", "  ".repeat(row.depth), text)
}

pub fn render_table(table: &Table) -> String {
    let mut widths: Vec<usize> = table.columns.iter().map(|c| width_of(&c.title)).collect();
    for row in &table.rows {
        for (index, cell) in row.cells.iter().enumerate() {
            let text_width = if index == 0 {
                width_of(&first_cell_text(row))
            } else {
                width_of(&cell.text)
            };
            match widths.get_mut(index) {
                Some(width) => *width = (*width).max(text_width),
                None => widths.push(text_width),
            }
        }
    }

    let mut out = String::new();

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .enumerate()
        .map(|(index, (column, width))| pad(&column.title, *width, index > 0))
        .collect();
    out.push_str(&header.join("  ").bold().to_string());
    out.push('\n');

    let rule_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&"─".repeat(rule_width).dimmed().to_string());
    out.push('\n');

    for row in &table.rows {
        let color = row_color(row);
        let summary = is_summary(row);

        let cells: Vec<String> = row
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let text = if index == 0 {
                    first_cell_text(row)
                } else {
                    cell.text.clone()
                };
                let width = widths.get(index).copied().unwrap_or_default();
                let padded = pad(&text, width, index > 0);

                let cell_color = cell.class.as_deref().and_then(class_color).or(color);
                let mut styled: ColoredString = match cell_color {
                    Some(color) => padded.color(color),
                    None => padded.normal(),
                };
                if summary {
                    styled = styled.bold();
                }
                styled.to_string()
            })
            .collect();

        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }

    out
}

pub fn render_section(section: &Section) -> String {
    let mut out = format!("{}\n\n", section.title.cyan().bold());

    for block in &section.blocks {
        match block {
            Block::Rubric(text) => {
                out.push_str(&format!("{}\n", text.bold()));
            }
            Block::Table(table) => {
                out.push_str(&render_table(table));
                out.push('\n');
            }
            Block::Paragraph(text) => {
                out.push_str(&format!("{text}\n"));
            }
            Block::Error { category, message } => {
                out.push_str(&format!(
                    "{} {} {}\n",
                    "✗".red(),
                    format!("[{}]", category.label()).dimmed(),
                    message.red()
                ));
            }
        }
    }

    out
}

pub fn print_section(section: &Section) {
    print!("{}", render_section(section));
}
