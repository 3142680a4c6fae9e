//! Report rendering
//!
//! Provides:
//! - Neutral document blocks (rubric, table, paragraph, error placeholder)
//! - Table builders for every report family
//! - HTML and terminal renderers
//! - Batch building of every configured report

pub mod code_coverage;
pub mod dependency;
pub mod doc_coverage;
pub mod html;
mod table;
pub mod terminal;
pub mod unittest;

pub use table::{Cell, Column, Row, Table};

use tracing::error;

use crate::config::Config;
use crate::error::{ErrorCategory, ReportError};
use crate::threshold::ThresholdResult;

/// One element of a rendered report
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Rubric(String),
    Table(Table),
    Paragraph(String),
    /// Stands in for a report that couldn't be built
    Error {
        category: ErrorCategory,
        message: String,
    },
}

/// A titled sequence of blocks, the unit written to one output file
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Placeholder section for a failed report
    pub fn error(id: &str, title: &str, err: &ReportError) -> Self {
        let mut section = Self::new(id, title);
        section.push(Block::Error {
            category: err.category(),
            message: err.to_string(),
        });
        section
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            _ => None,
        })
    }

    pub fn is_error(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, Block::Error { .. }))
    }
}

/// Where a coverage table shows its legend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LegendPosition {
    None,
    Top,
    #[default]
    Bottom,
    Both,
}

impl LegendPosition {
    pub fn top(&self) -> bool {
        matches!(self, LegendPosition::Top | LegendPosition::Both)
    }

    pub fn bottom(&self) -> bool {
        matches!(self, LegendPosition::Bottom | LegendPosition::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LegendStyle {
    #[default]
    Horizontal,
    Vertical,
}

/// Coverage ratio as a percentage with one decimal; sentinels read "n/a"
pub fn format_percent(ratio: f64) -> String {
    if ratio.is_nan() || ratio < 0.0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", ratio * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    CodeCoverage,
    DocCoverage,
    DocCoverageLegend,
    Unittest,
    Dependency,
}

impl ReportKind {
    /// Output file name prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            ReportKind::CodeCoverage => "code-coverage",
            ReportKind::DocCoverage => "doc-coverage",
            ReportKind::DocCoverageLegend => "doc-coverage-legend",
            ReportKind::Unittest => "unittest",
            ReportKind::Dependency => "dependencies",
        }
    }
}

/// Rendering options applied to every report of a batch
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub legend: LegendPosition,
    pub legend_style: LegendStyle,
    pub no_assertions: bool,
}

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub kind: ReportKind,
    pub id: String,
    pub section: Section,
    /// `fail_below` check for coverage reports that could be built
    pub threshold: Option<ThresholdResult>,
}

impl RenderedReport {
    pub fn file_name(&self) -> String {
        format!("{}-{}.html", self.kind.prefix(), self.id)
    }
}

/// Build every configured report.
///
/// A report that fails is logged and replaced by an error placeholder; the
/// remaining reports are still built.
pub fn build_all(config: &Config, options: &BuildOptions) -> Vec<RenderedReport> {
    let mut reports = Vec::new();

    for (id, package) in &config.code_coverage {
        let (section, threshold) = match code_coverage::section(package, options.legend) {
            Ok((section, threshold)) => (section, Some(threshold)),
            Err(e) => (placeholder(ReportKind::CodeCoverage, id, &e), None),
        };
        reports.push(RenderedReport {
            kind: ReportKind::CodeCoverage,
            id: id.clone(),
            section,
            threshold,
        });
    }

    for (id, package) in &config.doc_coverage {
        let (section, threshold) = match doc_coverage::section(package) {
            Ok((section, threshold)) => (section, Some(threshold)),
            Err(e) => (placeholder(ReportKind::DocCoverage, id, &e), None),
        };
        reports.push(RenderedReport {
            kind: ReportKind::DocCoverage,
            id: id.clone(),
            section,
            threshold,
        });

        reports.push(RenderedReport {
            kind: ReportKind::DocCoverageLegend,
            id: id.clone(),
            section: doc_coverage::legend_section(package, options.legend_style),
            threshold: None,
        });
    }

    for (id, report) in &config.unittests {
        let section = unittest::section(report, options.no_assertions)
            .unwrap_or_else(|e| placeholder(ReportKind::Unittest, id, &e));
        reports.push(RenderedReport {
            kind: ReportKind::Unittest,
            id: id.clone(),
            section,
            threshold: None,
        });
    }

    for (id, package) in &config.dependencies {
        let section = dependency::section(package)
            .unwrap_or_else(|e| placeholder(ReportKind::Dependency, id, &e));
        reports.push(RenderedReport {
            kind: ReportKind::Dependency,
            id: id.clone(),
            section,
            threshold: None,
        });
    }

    reports
}

fn placeholder(kind: ReportKind, id: &str, err: &ReportError) -> Section {
    error!(
        report = kind.prefix(),
        id = id,
        category = err.category().label(),
        "{err}"
    );
    Section::error(id, &format!("{} '{id}'", kind.prefix()), err)
}
