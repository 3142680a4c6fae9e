//! Dependency table

use super::{Block, Row, Section, Table};
use crate::config::DependencyPackage;
use crate::dependency::{DependencyScanner, Distribution};
use crate::error::Result;

const TABLE_CLASS: &str = "report-dependency-table";
const ROW_CLASS: &str = "report-dependency-table-row";

/// The distribution itself, then one indented row per direct requirement
pub fn dependency_table(id: &str, distribution: &Distribution) -> Table {
    let mut table = Table::new(id, TABLE_CLASS)
        .column("Package", 500)
        .column("Version", 100)
        .column("License", 100);

    table.push(distribution_row(Row::new(&[ROW_CLASS, "report-distribution"]), distribution));

    for dependency in &distribution.dependencies {
        table.push(distribution_row(
            Row::new(&[ROW_CLASS, "report-dependency"]).with_depth(1),
            dependency,
        ));
    }

    table
}

fn distribution_row(row: Row, distribution: &Distribution) -> Row {
    row.cell(distribution.name.clone())
        .cell(distribution.version_text())
        .cell(distribution.license_names())
}

pub fn section(package: &DependencyPackage) -> Result<Section> {
    let scanner = DependencyScanner::open(&package.manifest)?;
    let distribution = scanner.distribution();

    let mut section = Section::new(&package.id, &format!("Dependencies of {}", distribution.name));
    section.push(Block::Table(dependency_table(&package.id, distribution)));
    Ok(section)
}
