//! Documentation coverage table and legend

use super::code_coverage::PACKAGE_SYMBOL;
use super::{format_percent, Block, LegendStyle, Row, Section, Table};
use crate::config::DocCoveragePackage;
use crate::doc_coverage::{Analyzer, DocCounters, PackageCoverage};
use crate::error::Result;
use crate::levels::CoverageLevels;
use crate::threshold::{validate_threshold, ThresholdResult};

const TABLE_CLASS: &str = "report-doccov-table";
const ROW_CLASS: &str = "report-doccov-table-row";
const LEGEND_CLASS: &str = "report-doccov-legend";
const LEGEND_ROW_CLASS: &str = "report-doccov-legend-row";

/// Read, convert and aggregate the package's docstr-coverage report
pub fn load(package: &DocCoveragePackage) -> Result<PackageCoverage> {
    let analyzer = Analyzer::open(&package.name, package.directory.as_deref(), &package.json_report)?;
    let mut root = analyzer.convert()?;
    root.aggregate();
    Ok(root)
}

/// Expects an aggregated tree
pub fn coverage_table(id: &str, root: &PackageCoverage, levels: &CoverageLevels) -> Table {
    let mut table = Table::new(id, TABLE_CLASS)
        .column("Filename", 500)
        .column("Total", 100)
        .column("Covered", 100)
        .column("Missing", 100)
        .column("Coverage in %", 100);

    render_package(&mut table, root, levels, 0);

    table.push(counter_row(
        Row::new(&[ROW_CLASS, "report-doccov-summary"]),
        format!("Overall ({} files):", root.file_count()),
        &root.aggregated(),
        root.aggregated_coverage(),
        levels,
    ));

    table
}

fn render_package(table: &mut Table, package: &PackageCoverage, levels: &CoverageLevels, depth: usize) {
    table.push(counter_row(
        Row::new(&[ROW_CLASS, "report-doccov-package"]).with_depth(depth),
        format!("{PACKAGE_SYMBOL}{}", package.name),
        &package.counters,
        package.coverage,
        levels,
    ));

    for child in package.packages() {
        render_package(table, child, levels, depth + 1);
    }

    for module in package.modules() {
        table.push(counter_row(
            Row::new(&[ROW_CLASS, "report-doccov-module"]).with_depth(depth + 1),
            module.name.clone(),
            &module.counters,
            module.coverage,
            levels,
        ));
    }
}

fn counter_row(row: Row, label: String, counters: &DocCounters, coverage: f64, levels: &CoverageLevels) -> Row {
    row.with_class(levels.class_for(coverage))
        .cell(label)
        .cell(counters.expected.to_string())
        .cell(counters.covered.to_string())
        .cell(counters.uncovered.to_string())
        .cell(format_percent(coverage))
}

/// Legend as one header row of bounds and one row of descriptions
pub fn horizontal_legend(id: &str, levels: &CoverageLevels) -> Table {
    let legend = levels.legend();

    let mut table = legend
        .iter()
        .fold(
            Table::new(id, LEGEND_CLASS).column("Documentation Coverage:", 300),
            |table, entry| table.column(&format!("≤{} %", entry.bound), 200),
        );

    let row = legend.iter().fold(
        Row::new(&[LEGEND_ROW_CLASS]).cell("Coverage Level:"),
        |row, entry| row.styled_cell(entry.description, entry.class),
    );
    table.push(row);

    table
}

/// Legend with one row per level
pub fn vertical_legend(id: &str, levels: &CoverageLevels) -> Table {
    let mut table = Table::new(id, LEGEND_CLASS)
        .column("Documentation Coverage", 300)
        .column("Coverage Level", 300);

    for entry in levels.legend() {
        table.push(
            Row::new(&[LEGEND_ROW_CLASS, entry.class])
                .cell(format!("≤{} %", entry.bound))
                .cell(entry.description),
        );
    }

    table
}

pub fn section(package: &DocCoveragePackage) -> Result<(Section, ThresholdResult)> {
    let root = load(package)?;

    let mut section = Section::new(&package.id, &format!("Documentation coverage of {}", package.name));
    section.push(Block::Table(coverage_table(&package.id, &root, &package.levels)));

    let threshold = validate_threshold(root.aggregated_coverage(), package.fail_below);
    Ok((section, threshold))
}

/// Legend only depends on configuration, so it can't fail
pub fn legend_section(package: &DocCoveragePackage, style: LegendStyle) -> Section {
    let id = format!("{}-legend", package.id);
    let table = match style {
        LegendStyle::Horizontal => horizontal_legend(&id, &package.levels),
        LegendStyle::Vertical => vertical_legend(&id, &package.levels),
    };

    let mut section = Section::new(&id, &format!("Documentation coverage levels of {}", package.name));
    section.push(Block::Table(table));
    section
}
