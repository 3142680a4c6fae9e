//! Documentation coverage data model
//!
//! Unlike the code coverage tree, aggregates here are computed once by an
//! explicit [`PackageCoverage::aggregate`] pass and stored on each node.

use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ReportError, Result};
use crate::levels::{INCONSISTENT, NOT_COMPUTED};

/// Counters of documentable items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocCounters {
    pub total: u64,
    pub excluded: u64,
    pub ignored: u64,
    pub expected: u64,
    pub covered: u64,
    pub uncovered: u64,
}

impl DocCounters {
    /// `covered / expected`, 1.0 when nothing is expected
    pub fn coverage(&self) -> f64 {
        if self.expected == 0 {
            return 1.0;
        }
        self.covered as f64 / self.expected as f64
    }

    pub fn is_consistent(&self) -> bool {
        self.covered <= self.expected && self.uncovered == self.expected - self.covered
    }
}

impl AddAssign for DocCounters {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.excluded += other.excluded;
        self.ignored += other.ignored;
        self.expected += other.expected;
        self.covered += other.covered;
        self.uncovered += other.uncovered;
    }
}

#[derive(Debug, Clone)]
pub struct ModuleCoverage {
    pub name: String,
    pub qualified_name: String,
    pub file: PathBuf,
    pub counters: DocCounters,
    pub coverage: f64,
}

impl ModuleCoverage {
    fn new(name: &str, qualified_name: String, file: &Path) -> Self {
        Self {
            name: name.to_string(),
            qualified_name,
            file: file.to_path_buf(),
            counters: DocCounters::default(),
            coverage: NOT_COMPUTED,
        }
    }

    /// Derive `uncovered` and the coverage ratio from the expected and covered counts
    pub fn calculate_coverage(&mut self) {
        self.counters.uncovered = self.counters.expected.saturating_sub(self.counters.covered);
        self.coverage = self.counters.coverage();
    }
}

#[derive(Debug, Clone)]
pub struct PackageCoverage {
    pub name: String,
    pub qualified_name: String,
    pub file: PathBuf,
    pub counters: DocCounters,
    pub coverage: f64,
    packages: BTreeMap<String, PackageCoverage>,
    modules: BTreeMap<String, ModuleCoverage>,
    aggregated: DocCounters,
    aggregated_coverage: f64,
    file_count: usize,
}

impl PackageCoverage {
    pub fn new(name: &str, file: &Path) -> Self {
        Self::with_qualified_name(name, name.to_string(), file)
    }

    fn with_qualified_name(name: &str, qualified_name: String, file: &Path) -> Self {
        Self {
            name: name.to_string(),
            qualified_name,
            file: file.to_path_buf(),
            counters: DocCounters::default(),
            coverage: NOT_COMPUTED,
            packages: BTreeMap::new(),
            modules: BTreeMap::new(),
            aggregated: DocCounters::default(),
            aggregated_coverage: NOT_COMPUTED,
            file_count: 1,
        }
    }

    pub fn get_or_insert_package(&mut self, name: &str, file: &Path) -> Result<&mut PackageCoverage> {
        if self.modules.contains_key(name) {
            return Err(ReportError::DuplicateNode {
                parent: self.qualified_name.clone(),
                name: name.to_string(),
            });
        }

        let qualified_name = format!("{}.{}", self.qualified_name, name);
        Ok(self.packages.entry(name.to_string()).or_insert_with(|| {
            debug!(package = %qualified_name, "Creating package documentation node");
            PackageCoverage::with_qualified_name(name, qualified_name, file)
        }))
    }

    pub fn get_or_insert_module(&mut self, name: &str, file: &Path) -> Result<&mut ModuleCoverage> {
        if self.packages.contains_key(name) {
            return Err(ReportError::DuplicateNode {
                parent: self.qualified_name.clone(),
                name: name.to_string(),
            });
        }

        let qualified_name = format!("{}.{}", self.qualified_name, name);
        Ok(self.modules.entry(name.to_string()).or_insert_with(|| {
            debug!(module = %qualified_name, "Creating module documentation node");
            ModuleCoverage::new(name, qualified_name, file)
        }))
    }

    pub fn package(&self, name: &str) -> Option<&PackageCoverage> {
        self.packages.get(name)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleCoverage> {
        self.modules.get(name)
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageCoverage> {
        self.packages.values()
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleCoverage> {
        self.modules.values()
    }

    /// Derive own and descendants' coverage ratios from their counters
    pub fn calculate_coverage(&mut self) {
        for module in self.modules.values_mut() {
            module.calculate_coverage();
        }
        for package in self.packages.values_mut() {
            package.calculate_coverage();
        }

        self.counters.uncovered = self.counters.expected.saturating_sub(self.counters.covered);
        self.coverage = self.counters.coverage();
    }

    /// Sum the counters of the whole subtree into this node's aggregates.
    ///
    /// Children are aggregated first. The result only depends on the
    /// subtree's own counters, so repeated calls yield the same values.
    pub fn aggregate(&mut self) {
        let mut aggregated = self.counters;
        let mut file_count = 1 + self.modules.len();

        for package in self.packages.values_mut() {
            package.aggregate();
            aggregated += package.aggregated;
            file_count += package.file_count;
        }

        for module in self.modules.values() {
            aggregated += module.counters;
        }

        self.aggregated = aggregated;
        self.file_count = file_count;
        self.aggregated_coverage = if aggregated.is_consistent() {
            aggregated.coverage()
        } else {
            warn!(
                package = %self.qualified_name,
                expected = aggregated.expected,
                covered = aggregated.covered,
                uncovered = aggregated.uncovered,
                "Uncovered count doesn't match expected minus covered"
            );
            INCONSISTENT
        };
    }

    /// Aggregated counters as of the last [`aggregate`](Self::aggregate) call
    pub fn aggregated(&self) -> DocCounters {
        self.aggregated
    }

    pub fn aggregated_total(&self) -> u64 {
        self.aggregated.total
    }

    pub fn aggregated_excluded(&self) -> u64 {
        self.aggregated.excluded
    }

    pub fn aggregated_ignored(&self) -> u64 {
        self.aggregated.ignored
    }

    pub fn aggregated_expected(&self) -> u64 {
        self.aggregated.expected
    }

    pub fn aggregated_covered(&self) -> u64 {
        self.aggregated.covered
    }

    pub fn aggregated_uncovered(&self) -> u64 {
        self.aggregated.uncovered
    }

    /// Aggregated coverage ratio, [`NOT_COMPUTED`] before the first aggregation
    pub fn aggregated_coverage(&self) -> f64 {
        self.aggregated_coverage
    }

    /// Files in the subtree as of the last aggregation
    pub fn file_count(&self) -> usize {
        self.file_count
    }
}
