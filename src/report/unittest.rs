//! Unit test summary table

use std::time::Duration;

use super::{Block, Row, Section, Table};
use crate::config::UnittestReport;
use crate::error::Result;
use crate::unittest::{Analyzer, TestCounts, Testcase, Testsuite, TestsuiteSummary};

const TABLE_CLASS: &str = "report-unittest-table";
const ROW_CLASS: &str = "report-unittest-table-row";

/// Read, convert and aggregate a JUnit report
pub fn load(report: &UnittestReport) -> Result<TestsuiteSummary> {
    let mut summary = Analyzer::open(&report.xml_report)?.convert()?;
    summary.aggregate();
    Ok(summary)
}

/// `HH:MM:SS.sss`, rounded to milliseconds
pub fn format_duration(duration: Duration) -> String {
    let milliseconds = (duration.as_micros() + 500) / 1000;
    let seconds = milliseconds / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    format!(
        "{:02}:{:02}:{:02}.{:03}",
        hours,
        minutes % 60,
        seconds % 60,
        milliseconds % 1000
    )
}

/// Expects an aggregated summary
pub fn summary_table(id: &str, summary: &TestsuiteSummary, show_assertions: bool) -> Table {
    let mut table = Table::new(id, TABLE_CLASS)
        .column("Testsuite / Testcase", 500)
        .column("Testcases", 100)
        .column("Skipped", 100)
        .column("Errored", 100)
        .column("Failed", 100)
        .column("Passed", 100);
    if show_assertions {
        table = table.column("Assertions", 100);
    }
    table = table.column("Runtime (HH:MM:SS.sss)", 100);

    for testsuite in summary.testsuites() {
        render_testsuite(&mut table, testsuite, 0, show_assertions);
    }

    let overall = counts_row(
        Row::new(&[ROW_CLASS, "report-unittest-summary", summary.state().label()]),
        format!("Overall ({})", summary.name),
        &summary.counts(),
        summary.time(),
        show_assertions,
    );
    table.push(overall);

    table
}

fn render_testsuite(table: &mut Table, testsuite: &Testsuite, depth: usize, show_assertions: bool) {
    let state = testsuite.state();
    table.push(counts_row(
        Row::new(&[ROW_CLASS, "report-testsuite", state.label()]).with_depth(depth),
        format!("{}{}", state.symbol(), testsuite.name),
        &testsuite.counts(),
        testsuite.time(),
        show_assertions,
    ));

    for child in testsuite.testsuites() {
        render_testsuite(table, child, depth + 1, show_assertions);
    }

    for testcase in testsuite.testcases() {
        table.push(testcase_row(testcase, depth + 1, show_assertions));
    }
}

fn counts_row(row: Row, label: String, counts: &TestCounts, time: Duration, show_assertions: bool) -> Row {
    let mut row = row
        .cell(label)
        .cell(counts.tests.to_string())
        .cell(counts.skipped.to_string())
        .cell(counts.errored.to_string())
        .cell(counts.failed.to_string())
        .cell(counts.passed.to_string());
    if show_assertions {
        row = row.cell(counts.assertions.to_string());
    }
    row.cell(format_duration(time))
}

fn testcase_row(testcase: &Testcase, depth: usize, show_assertions: bool) -> Row {
    let mut row = Row::new(&[ROW_CLASS, "report-testcase", testcase.state.label()])
        .with_depth(depth)
        .cell(format!("{}{}", testcase.state.symbol(), testcase.name))
        .cell("")
        .cell("")
        .cell("")
        .cell("")
        .cell("");
    if show_assertions {
        row = row.cell(testcase.assertions.map(|a| a.to_string()).unwrap_or_default());
    }
    row.cell(testcase.time.map(format_duration).unwrap_or_default())
}

/// Messages of every unsuccessful testcase, in table order
pub fn failure_messages(summary: &TestsuiteSummary) -> Vec<String> {
    fn collect(testsuite: &Testsuite, messages: &mut Vec<String>) {
        for child in testsuite.testsuites() {
            collect(child, messages);
        }
        for testcase in testsuite.testcases() {
            if let Some(message) = &testcase.message {
                messages.push(format!("{}.{}: {message}", testsuite.qualified_name, testcase.name));
            }
        }
    }

    let mut messages = Vec::new();
    for testsuite in summary.testsuites() {
        collect(testsuite, &mut messages);
    }
    messages
}

pub fn section(report: &UnittestReport, no_assertions: bool) -> Result<Section> {
    let summary = load(report)?;

    let mut section = Section::new(&report.id, &format!("Unit test results of {}", summary.name));
    if let Some(timestamp) = summary.timestamp {
        section.push(Block::Paragraph(format!(
            "Run at {}",
            timestamp.format("%Y-%m-%d %H:%M:%S")
        )));
    }
    section.push(Block::Table(summary_table(&report.id, &summary, !no_assertions)));

    let messages = failure_messages(&summary);
    if !messages.is_empty() {
        section.push(Block::Rubric("Messages".to_string()));
        for message in messages {
            section.push(Block::Paragraph(message));
        }
    }

    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const REPORT: &str = r#"<testsuites name="pytest" time="2.5">
    <testsuite name="pytest">
        <testcase classname="tests.Parser" name="test_ok" time="1.2346" assertions="2"/>
        <testcase classname="tests.Parser" name="test_bad" time="0.5">
            <failure message="expected 3"/>
        </testcase>
        <testcase classname="tests.Lexer" name="test_skip"><skipped/></testcase>
    </testsuite>
</testsuites>"#;

    fn summary() -> TestsuiteSummary {
        let mut summary = Analyzer::from_xml(Path::new("junit.xml"), REPORT).convert().unwrap();
        summary.aggregate();
        summary
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00.000");
        assert_eq!(format_duration(Duration::from_micros(1_234_500)), "00:00:01.235");
        assert_eq!(format_duration(Duration::from_micros(999_600)), "00:00:01.000");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 61)), "03:01:01.000");
    }

    #[test]
    fn test_table_rows() {
        let table = summary_table("unit", &summary(), true);

        assert_eq!(table.columns.len(), 8);
        let labels: Vec<&str> = table.rows.iter().map(|r| r.cells[0].text.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "❌tests",
                "✅Lexer",
                "❌test_skip",
                "❌Parser",
                "❌test_bad",
                "✅test_ok",
                "Overall (pytest)",
            ]
        );

        let parser = &table.rows[3];
        assert_eq!(parser.cells[1].text, "2");
        assert_eq!(parser.cells[4].text, "1");
        assert_eq!(parser.cells[6].text, "2");
        assert!(parser.has_class("failed"));

        let test_ok = &table.rows[5];
        assert_eq!(test_ok.cells[6].text, "2");
        assert_eq!(test_ok.cells[7].text, "00:00:01.235");

        let overall = table.rows.last().unwrap();
        assert_eq!(overall.cells[1].text, "3");
        assert_eq!(overall.cells[7].text, "00:00:02.500");
    }

    #[test]
    fn test_without_assertions() {
        let table = summary_table("unit", &summary(), false);

        assert_eq!(table.columns.len(), 7);
        assert!(!table.column_titles().contains(&"Assertions"));
        assert!(table.rows.iter().all(|r| r.cells.len() == 7));
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(failure_messages(&summary()), vec!["tests.Parser.test_bad: expected 3"]);
    }
}
