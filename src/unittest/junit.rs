//! JUnit XML report converter

use chrono::{DateTime, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::{Testcase, TestcaseState, TestsuiteSummary};
use crate::error::{read_report, ReportError, Result};

/// Name of the summary root when the root element has no `name` attribute
pub const DEFAULT_ROOT_NAME: &str = "root";

/// Converts a JUnit XML document into a [`TestsuiteSummary`]
#[derive(Debug)]
pub struct Analyzer {
    report_file: PathBuf,
    content: String,
}

/// Testcase whose closing tag hasn't been read yet
struct PendingTestcase {
    testcase: Testcase,
    /// Element nesting below the testcase element
    depth: usize,
    /// Inside a failure/error/skipped element
    capture_text: bool,
}

impl Analyzer {
    pub fn open(report_file: &Path) -> Result<Self> {
        let content = read_report("JUnit unittest", report_file)?;
        Ok(Self::from_xml(report_file, content))
    }

    pub fn from_xml(report_file: &Path, content: impl Into<String>) -> Self {
        Self {
            report_file: report_file.to_path_buf(),
            content: content.into(),
        }
    }

    pub fn report_file(&self) -> &Path {
        &self.report_file
    }

    fn xml_error(&self, source: quick_xml::Error) -> ReportError {
        ReportError::Xml {
            path: self.report_file.clone(),
            source,
        }
    }

    /// Build the testsuite tree. Call [`TestsuiteSummary::aggregate`] on the
    /// result before reading counts.
    pub fn convert(&self) -> Result<TestsuiteSummary> {
        let mut reader = Reader::from_str(&self.content);
        reader.trim_text(true);
        let mut buf = Vec::new();

        // Root element
        let (mut summary, mut suite_names) = loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let summary = self.parse_root(e)?;
                    let suite_names = root_suite_name(e).into_iter().collect::<Vec<_>>();
                    break (summary, suite_names);
                }
                Ok(Event::Empty(ref e)) => {
                    // Self-closing root: no testcases at all
                    return self.parse_root(e);
                }
                Ok(Event::Eof) => {
                    return Err(ReportError::unsupported(&self.report_file, "no root element"));
                }
                Err(e) => return Err(self.xml_error(e)),
                _ => {}
            }
            buf.clear();
        };
        buf.clear();

        let mut pending: Option<PendingTestcase> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    if let Some(case) = pending.as_mut() {
                        if case.depth == 0 {
                            case.capture_text = self.apply_result_element(&mut case.testcase, e)?;
                        }
                        case.depth += 1;
                    } else {
                        match e.name().as_ref() {
                            b"testsuite" => {
                                suite_names.push(attribute(e, b"name").unwrap_or_default());
                            }
                            b"testcase" => {
                                pending = Some(PendingTestcase {
                                    testcase: parse_testcase(e),
                                    depth: 0,
                                    capture_text: false,
                                });
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if let Some(case) = pending.as_mut() {
                        if case.depth == 0 {
                            self.apply_result_element(&mut case.testcase, e)?;
                        }
                    } else if e.name().as_ref() == b"testcase" {
                        // Self-closing testcase = passed test
                        insert_testcase(&mut summary, &suite_names, parse_testcase(e));
                    }
                }
                Ok(Event::End(ref e)) => {
                    if let Some(case) = pending.as_mut() {
                        if case.depth > 0 {
                            case.depth -= 1;
                            if case.depth == 0 {
                                case.capture_text = false;
                            }
                        } else if let Some(case) = pending.take() {
                            insert_testcase(&mut summary, &suite_names, case.testcase);
                        }
                    } else if e.name().as_ref() == b"testsuite" {
                        suite_names.pop();
                    }
                }
                Ok(Event::Text(ref e)) => {
                    if let Some(case) = pending.as_mut() {
                        if case.capture_text && case.testcase.message.is_none() {
                            let text = e.unescape().map_err(|err| self.xml_error(err))?;
                            let text = text.trim();
                            if !text.is_empty() {
                                case.testcase.message = Some(text.to_string());
                            }
                        }
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if let Some(case) = pending.as_mut() {
                        if case.capture_text && case.testcase.message.is_none() {
                            let text = String::from_utf8_lossy(e).trim().to_string();
                            if !text.is_empty() {
                                case.testcase.message = Some(text);
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(self.xml_error(e)),
                _ => {}
            }
            buf.clear();
        }

        info!(
            report = %self.report_file.display(),
            root = %summary.name,
            testsuites = summary.testsuites().count(),
            "Read JUnit report"
        );

        Ok(summary)
    }

    fn parse_root(&self, e: &BytesStart) -> Result<TestsuiteSummary> {
        match e.name().as_ref() {
            b"testsuites" | b"testsuite" => {}
            other => {
                return Err(ReportError::unsupported(
                    &self.report_file,
                    format!(
                        "root element '{}' is neither 'testsuites' nor 'testsuite'",
                        String::from_utf8_lossy(other)
                    ),
                ));
            }
        }

        let name = attribute(e, b"name").unwrap_or_else(|| DEFAULT_ROOT_NAME.to_string());
        let mut summary = TestsuiteSummary::new(&name);
        summary.reported_time = attribute(e, b"time").and_then(|t| parse_seconds(&t));
        summary.timestamp = attribute(e, b"timestamp").and_then(|t| parse_timestamp(&t));

        Ok(summary)
    }

    /// Apply a direct child element of a testcase.
    ///
    /// Returns whether the element set the testcase state, so its text is the message.
    fn apply_result_element(&self, testcase: &mut Testcase, e: &BytesStart) -> Result<bool> {
        let state = match e.name().as_ref() {
            b"skipped" => TestcaseState::Skipped,
            b"failure" => TestcaseState::Failed,
            b"error" => TestcaseState::Errored,
            b"system-out" | b"system-err" | b"properties" => return Ok(false),
            other => {
                return Err(ReportError::UnknownElement {
                    path: self.report_file.clone(),
                    element: String::from_utf8_lossy(other).to_string(),
                });
            }
        };

        if state.result_rank() <= testcase.state.result_rank() {
            return Ok(false);
        }

        testcase.state = state;
        testcase.message = attribute(e, b"message");
        Ok(true)
    }
}

fn root_suite_name(e: &BytesStart) -> Option<String> {
    if e.name().as_ref() == b"testsuite" {
        Some(attribute(e, b"name").unwrap_or_default())
    } else {
        None
    }
}

fn parse_testcase(e: &BytesStart) -> Testcase {
    let name = attribute(e, b"name").unwrap_or_default();
    let classname = attribute(e, b"classname").unwrap_or_default();

    let mut testcase = Testcase::new(&name, &classname);
    testcase.time = attribute(e, b"time").and_then(|t| parse_seconds(&t));
    testcase.assertions = attribute(e, b"assertions").and_then(|a| a.trim().parse().ok());
    testcase
}

/// Place a finished testcase below the testsuites named by its classname
fn insert_testcase(summary: &mut TestsuiteSummary, suite_names: &[String], mut testcase: Testcase) {
    if testcase.state == TestcaseState::Unknown {
        testcase.state = TestcaseState::Passed;
    }

    let classname = if testcase.classname.is_empty() {
        suite_names
            .iter()
            .rev()
            .find(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| summary.name.clone())
    } else {
        testcase.classname.clone()
    };

    let segments: Vec<&str> = classname.split('.').filter(|s| !s.is_empty()).collect();
    let fallback = [DEFAULT_ROOT_NAME];
    let segments: &[&str] = if segments.is_empty() { &fallback } else { &segments };

    if let Some(testsuite) = summary.testsuite_path_mut(segments) {
        testsuite.add_testcase(testcase);
    }
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.to_string(),
            Err(_) => String::from_utf8_lossy(&a.value).to_string(),
        })
}

fn parse_seconds(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|t| Duration::try_from_secs_f64(t).ok())
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(xml: &str) -> Result<TestsuiteSummary> {
        Analyzer::from_xml(Path::new("junit.xml"), xml).convert()
    }

    #[test]
    fn test_nested_testsuite() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="A">
    <testsuite name="B">
        <testcase classname="B" name="t1"/>
    </testsuite>
</testsuite>"#;

        let mut summary = convert(xml).unwrap();
        summary.aggregate();

        assert_eq!(summary.name, "A");
        let b = summary.testsuite("B").unwrap();
        assert_eq!(b.testcase("t1").unwrap().state, TestcaseState::Passed);

        for counts in [b.counts(), summary.counts()] {
            assert_eq!(counts.tests, 1);
            assert_eq!(counts.passed, 1);
            assert_eq!(counts.skipped, 0);
            assert_eq!(counts.errored, 0);
            assert_eq!(counts.failed, 0);
        }
    }

    #[test]
    fn test_result_elements() {
        let xml = r#"<testsuites name="pytest" time="1.5" timestamp="2024-03-01T10:15:30.123456">
    <testsuite name="pytest" tests="4">
        <testcase classname="tests.unit.Parser" name="test_pass" time="0.100" assertions="3"/>
        <testcase classname="tests.unit.Parser" name="test_fail" time="0.200">
            <failure message="assertion failed" type="AssertionError">Expected true but got false</failure>
            <system-out>captured</system-out>
        </testcase>
        <testcase classname="tests.unit.Lexer" name="test_skip" time="0.001">
            <skipped message="not on this platform"/>
        </testcase>
        <testcase classname="tests.integration" name="test_error" time="0.050">
            <error type="RuntimeError"><![CDATA[boom]]></error>
        </testcase>
    </testsuite>
</testsuites>"#;

        let mut summary = convert(xml).unwrap();
        summary.aggregate();

        assert_eq!(summary.name, "pytest");
        assert_eq!(summary.reported_time, Some(Duration::from_millis(1500)));
        assert!(summary.timestamp.is_some());

        let tests = summary.testsuite("tests").unwrap();
        let unit = tests.testsuite("unit").unwrap();
        let parser = unit.testsuite("Parser").unwrap();

        let failed = parser.testcase("test_fail").unwrap();
        assert_eq!(failed.state, TestcaseState::Failed);
        assert_eq!(failed.message.as_deref(), Some("assertion failed"));
        assert_eq!(parser.testcase("test_pass").unwrap().assertions, Some(3));

        let skipped = unit.testsuite("Lexer").unwrap().testcase("test_skip").unwrap();
        assert_eq!(skipped.state, TestcaseState::Skipped);

        let errored = tests.testsuite("integration").unwrap().testcase("test_error").unwrap();
        assert_eq!(errored.state, TestcaseState::Errored);
        assert_eq!(errored.message.as_deref(), Some("boom"));

        assert_eq!(summary.tests(), 4);
        assert_eq!(summary.passed(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.errored(), 1);
        assert_eq!(summary.state(), TestcaseState::Errored);
        assert_eq!(unit.state(), TestcaseState::Failed);
    }

    #[test]
    fn test_unknown_element_fails() {
        let xml = r#"<testsuite name="s">
    <testcase classname="c" name="t"><flaky/></testcase>
</testsuite>"#;

        let err = convert(xml).unwrap_err();
        match err {
            ReportError::UnknownElement { element, .. } => assert_eq!(element, "flaky"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unsupported_root() {
        let err = convert("<coverage line-rate=\"0.5\"/>").unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat { .. }));

        let err = convert("").unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_empty_classname_uses_enclosing_suite() {
        let xml = r#"<testsuites><testsuite name="smoke"><testcase name="t"/></testsuite></testsuites>"#;

        let mut summary = convert(xml).unwrap();
        summary.aggregate();

        assert_eq!(summary.name, DEFAULT_ROOT_NAME);
        assert!(summary.testsuite("smoke").unwrap().testcase("t").is_some());
    }

    #[test]
    fn test_empty_root() {
        let mut summary = convert(r#"<testsuites name="empty"/>"#).unwrap();
        summary.aggregate();

        assert_eq!(summary.tests(), 0);
        assert_eq!(summary.state(), TestcaseState::Passed);
    }

    #[test]
    fn test_error_wins_over_skipped() {
        let xml = r#"<testsuite name="s">
    <testcase classname="c" name="t"><skipped/><error message="setup failed"/></testcase>
</testsuite>"#;

        let summary = convert(xml).unwrap();
        let testcase = summary.testsuite("c").unwrap().testcase("t").unwrap();
        assert_eq!(testcase.state, TestcaseState::Errored);
        assert_eq!(testcase.message.as_deref(), Some("setup failed"));
    }

    #[test]
    fn test_all_skipped_suite_counts_as_passed() {
        let xml = r#"<testsuite name="s">
    <testcase classname="c" name="t1"><skipped/></testcase>
    <testcase classname="c" name="t2"><skipped message="later"/></testcase>
</testsuite>"#;

        let mut summary = convert(xml).unwrap();
        summary.aggregate();

        let suite = summary.testsuite("c").unwrap();
        assert_eq!(suite.skipped(), 2);
        assert_eq!(suite.state(), TestcaseState::Passed);
        assert_eq!(summary.state(), TestcaseState::Passed);
    }

    #[test]
    fn test_lower_ranked_result_keeps_message() {
        let xml = r#"<testsuite name="s">
    <testcase classname="c" name="t"><error/><failure>assertion text</failure></testcase>
</testsuite>"#;

        let summary = convert(xml).unwrap();
        let testcase = summary.testsuite("c").unwrap().testcase("t").unwrap();
        assert_eq!(testcase.state, TestcaseState::Errored);
        assert_eq!(testcase.message, None);
    }

    #[test]
    fn test_out_of_range_times_are_ignored() {
        let xml = r#"<testsuite name="s" time="1e20">
    <testcase classname="c" name="t" time="1e20"/>
    <testcase classname="c" name="u" time="-1"/>
    <testcase classname="c" name="v" time="NaN"/>
</testsuite>"#;

        let summary = convert(xml).unwrap();
        assert_eq!(summary.reported_time, None);

        let suite = summary.testsuite("c").unwrap();
        for name in ["t", "u", "v"] {
            assert_eq!(suite.testcase(name).unwrap().time, None);
        }
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds(" 0.25 "), Some(Duration::from_millis(250)));
        assert_eq!(parse_seconds("inf"), None);
        assert_eq!(parse_seconds("abc"), None);
    }
}
