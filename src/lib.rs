//! docreports - quality reports as documentation tables
//!
//! A library for turning machine-produced reports into documentation with:
//! - Code coverage trees from coverage.py JSON reports
//! - Documentation coverage trees from docstr-coverage results
//! - Testsuite trees from JUnit XML reports
//! - Dependency tables from `pyproject.toml`
//! - Coverage levels mapping ratios to display styles
//! - HTML and terminal rendering

pub mod config;
pub mod coverage;
pub mod dependency;
pub mod doc_coverage;
pub mod error;
pub mod levels;
pub mod report;
pub mod threshold;
pub mod unittest;

pub use config::Config;
pub use error::{ErrorCategory, ReportError, Result};
pub use levels::{CoverageLevels, LevelStyle, INCONSISTENT, NOT_COMPUTED};
pub use report::{BuildOptions, LegendPosition, LegendStyle, Section};
pub use threshold::{validate_threshold, ThresholdResult};
pub use unittest::{TestcaseState, TestsuiteSummary};
