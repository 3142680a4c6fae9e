//! Code coverage table

use super::{format_percent, Block, LegendPosition, Row, Section, Table};
use crate::config::CodeCoveragePackage;
use crate::coverage::{Analyzer, CoverageCounters, PackageCoverage};
use crate::error::Result;
use crate::levels::CoverageLevels;
use crate::threshold::{validate_threshold, ThresholdResult};

const TABLE_CLASS: &str = "report-codecov-table";
const ROW_CLASS: &str = "report-codecov-table-row";
const LEGEND_CLASS: &str = "report-codecov-legend";

pub const PACKAGE_SYMBOL: &str = "📦";

const COLUMNS: [(&str, u16); 10] = [
    ("Module", 500),
    ("Total Statements", 100),
    ("Excluded Statements", 100),
    ("Covered Statements", 100),
    ("Missing Statements", 100),
    ("Total Branches", 100),
    ("Covered Branches", 100),
    ("Partial Branches", 100),
    ("Missing Branches", 100),
    ("Coverage in %", 100),
];

/// Read and convert the package's coverage report
pub fn load(package: &CodeCoveragePackage) -> Result<PackageCoverage> {
    Analyzer::open(&package.name, &package.json_report)?.convert()
}

/// Package rows show aggregated values, module rows their own.
pub fn coverage_table(id: &str, root: &PackageCoverage, levels: &CoverageLevels) -> Table {
    let mut table = COLUMNS
        .iter()
        .fold(Table::new(id, TABLE_CLASS), |table, (title, width)| {
            table.column(title, *width)
        });

    render_package(&mut table, root, levels, 0);

    let summary = counter_row(
        Row::new(&[ROW_CLASS, "report-codecov-summary"]),
        format!("Overall ({} files):", root.file_count()),
        &root.aggregated(),
        root.aggregated_coverage(),
        levels,
    );
    table.push(summary);

    table
}

fn render_package(table: &mut Table, package: &PackageCoverage, levels: &CoverageLevels, depth: usize) {
    table.push(counter_row(
        Row::new(&[ROW_CLASS, "report-codecov-package"]).with_depth(depth),
        format!("{PACKAGE_SYMBOL}{}", package.name),
        &package.aggregated(),
        package.aggregated_coverage(),
        levels,
    ));

    for child in package.packages() {
        render_package(table, child, levels, depth + 1);
    }

    for module in package.modules() {
        table.push(counter_row(
            Row::new(&[ROW_CLASS, "report-codecov-module"]).with_depth(depth + 1),
            module.name.clone(),
            &module.counters,
            module.coverage,
            levels,
        ));
    }
}

fn counter_row(
    row: Row,
    label: String,
    counters: &CoverageCounters,
    coverage: f64,
    levels: &CoverageLevels,
) -> Row {
    row.with_class(levels.class_for(coverage))
        .cell(label)
        .cell(counters.total_statements.to_string())
        .cell(counters.excluded_statements.to_string())
        .cell(counters.covered_statements.to_string())
        .cell(counters.missing_statements.to_string())
        .cell(counters.total_branches.to_string())
        .cell(counters.covered_branches.to_string())
        .cell(counters.partial_branches.to_string())
        .cell(counters.missing_branches.to_string())
        .cell(format_percent(coverage))
}

/// Two-column legend: upper bound and level description
pub fn legend_table(id: &str, levels: &CoverageLevels) -> Table {
    let mut table = Table::new(id, LEGEND_CLASS)
        .column("%", 300)
        .column("Coverage Level", 300);

    for entry in levels.legend() {
        table.push(
            Row::new(&["report-codecov-legend-row", entry.class])
                .cell(format!("≤{}%", entry.bound))
                .cell(entry.description),
        );
    }

    table
}

/// Coverage table with legend, plus the `fail_below` check of the package
pub fn section(package: &CodeCoveragePackage, legend: LegendPosition) -> Result<(Section, ThresholdResult)> {
    let root = load(package)?;

    let mut section = Section::new(&package.id, &format!("Code coverage of {}", package.name));
    if legend.top() {
        section.push(Block::Rubric("Legend".to_string()));
        section.push(Block::Table(legend_table(&format!("{}-legend-top", package.id), &package.levels)));
    }

    section.push(Block::Table(coverage_table(&package.id, &root, &package.levels)));

    if legend.bottom() {
        section.push(Block::Rubric("Legend".to_string()));
        section.push(Block::Table(legend_table(&format!("{}-legend-bottom", package.id), &package.levels)));
    }

    let threshold = validate_threshold(root.aggregated_coverage(), package.fail_below);
    Ok((section, threshold))
}
