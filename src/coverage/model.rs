//! Code coverage data model
//!
//! A tree of packages and modules carrying statement and branch counters.
//! Aggregates over a package are recomputed from the subtree on every call.
//!
//! The statement total counts every statement of a file, excluded ones
//! included, so covered, missing and excluded statements add up to it.

use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ReportError, Result};
use crate::levels::{INCONSISTENT, NOT_COMPUTED};

/// Raw statement and branch counters of one node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageCounters {
    pub total_statements: u64,
    pub excluded_statements: u64,
    pub covered_statements: u64,
    pub missing_statements: u64,
    pub total_branches: u64,
    pub covered_branches: u64,
    pub partial_branches: u64,
    pub missing_branches: u64,
}

impl CoverageCounters {
    /// `covered / total`, 0 when there are no statements
    pub fn statement_coverage(&self) -> f64 {
        if self.total_statements == 0 {
            return 0.0;
        }
        self.covered_statements as f64 / self.total_statements as f64
    }

    /// `(covered + partial) / total`, 0 when there are no branches
    pub fn branch_coverage(&self) -> f64 {
        if self.total_branches == 0 {
            return 0.0;
        }
        (self.covered_branches + self.partial_branches) as f64 / self.total_branches as f64
    }

    /// Statements that are expected to run: the total without excluded ones
    pub fn expected_statements(&self) -> u64 {
        self.total_statements.saturating_sub(self.excluded_statements)
    }

    /// Expected statements and branches combined. Nothing to cover counts as fully covered.
    pub fn combined_coverage(&self) -> f64 {
        let expected = self.expected_statements() + self.total_branches;
        if expected == 0 {
            return 1.0;
        }
        (self.covered_statements + self.covered_branches) as f64 / expected as f64
    }

    /// Covered, missing and excluded statements must add up to the total
    pub fn is_consistent(&self) -> bool {
        self.covered_statements + self.missing_statements + self.excluded_statements
            == self.total_statements
    }
}

impl AddAssign for CoverageCounters {
    fn add_assign(&mut self, other: Self) {
        self.total_statements += other.total_statements;
        self.excluded_statements += other.excluded_statements;
        self.covered_statements += other.covered_statements;
        self.missing_statements += other.missing_statements;
        self.total_branches += other.total_branches;
        self.covered_branches += other.covered_branches;
        self.partial_branches += other.partial_branches;
        self.missing_branches += other.missing_branches;
    }
}

/// Coverage of a single source file
#[derive(Debug, Clone)]
pub struct ModuleCoverage {
    pub name: String,
    /// Dotted path from the root package, e.g. `pkg.sub.mod`
    pub qualified_name: String,
    pub file: PathBuf,
    pub counters: CoverageCounters,
    /// Coverage ratio as reported by the coverage tool
    pub coverage: f64,
}

impl ModuleCoverage {
    fn new(name: &str, qualified_name: String, file: &Path) -> Self {
        Self {
            name: name.to_string(),
            qualified_name,
            file: file.to_path_buf(),
            counters: CoverageCounters::default(),
            coverage: NOT_COMPUTED,
        }
    }

    pub fn statement_coverage(&self) -> f64 {
        self.counters.statement_coverage()
    }

    pub fn branch_coverage(&self) -> f64 {
        self.counters.branch_coverage()
    }
}

/// Coverage of a package: its own `__init__` counters plus child packages and modules
#[derive(Debug, Clone)]
pub struct PackageCoverage {
    pub name: String,
    pub qualified_name: String,
    pub file: PathBuf,
    pub counters: CoverageCounters,
    pub coverage: f64,
    packages: BTreeMap<String, PackageCoverage>,
    modules: BTreeMap<String, ModuleCoverage>,
}

impl PackageCoverage {
    /// Create a root package
    pub fn new(name: &str, file: &Path) -> Self {
        Self::with_qualified_name(name, name.to_string(), file)
    }

    fn with_qualified_name(name: &str, qualified_name: String, file: &Path) -> Self {
        Self {
            name: name.to_string(),
            qualified_name,
            file: file.to_path_buf(),
            counters: CoverageCounters::default(),
            coverage: NOT_COMPUTED,
            packages: BTreeMap::new(),
            modules: BTreeMap::new(),
        }
    }

    fn child_name(&self, name: &str) -> String {
        format!("{}.{}", self.qualified_name, name)
    }

    /// Return the child package `name`, creating it if needed.
    ///
    /// Fails if a module of the same name already exists in this package.
    pub fn get_or_insert_package(&mut self, name: &str, file: &Path) -> Result<&mut PackageCoverage> {
        if self.modules.contains_key(name) {
            return Err(ReportError::DuplicateNode {
                parent: self.qualified_name.clone(),
                name: name.to_string(),
            });
        }

        let qualified_name = self.child_name(name);
        Ok(self.packages.entry(name.to_string()).or_insert_with(|| {
            debug!(package = %qualified_name, "Creating package coverage node");
            PackageCoverage::with_qualified_name(name, qualified_name, file)
        }))
    }

    /// Return the child module `name`, creating it if needed.
    ///
    /// Fails if a package of the same name already exists in this package.
    pub fn get_or_insert_module(&mut self, name: &str, file: &Path) -> Result<&mut ModuleCoverage> {
        if self.packages.contains_key(name) {
            return Err(ReportError::DuplicateNode {
                parent: self.qualified_name.clone(),
                name: name.to_string(),
            });
        }

        let qualified_name = self.child_name(name);
        Ok(self.modules.entry(name.to_string()).or_insert_with(|| {
            debug!(module = %qualified_name, "Creating module coverage node");
            ModuleCoverage::new(name, qualified_name, file)
        }))
    }

    pub fn package(&self, name: &str) -> Option<&PackageCoverage> {
        self.packages.get(name)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleCoverage> {
        self.modules.get(name)
    }

    /// Child packages, sorted by name
    pub fn packages(&self) -> impl Iterator<Item = &PackageCoverage> {
        self.packages.values()
    }

    /// Child modules, sorted by name
    pub fn modules(&self) -> impl Iterator<Item = &ModuleCoverage> {
        self.modules.values()
    }

    pub fn statement_coverage(&self) -> f64 {
        self.counters.statement_coverage()
    }

    pub fn branch_coverage(&self) -> f64 {
        self.counters.branch_coverage()
    }

    /// Own counters plus the aggregates of all child packages and the
    /// counters of all child modules.
    pub fn aggregated(&self) -> CoverageCounters {
        let mut sum = self.counters;

        for package in self.packages.values() {
            sum += package.aggregated();
        }

        for module in self.modules.values() {
            sum += module.counters;
        }

        sum
    }

    pub fn aggregated_total_statements(&self) -> u64 {
        self.aggregated().total_statements
    }

    pub fn aggregated_excluded_statements(&self) -> u64 {
        self.aggregated().excluded_statements
    }

    pub fn aggregated_covered_statements(&self) -> u64 {
        self.aggregated().covered_statements
    }

    pub fn aggregated_missing_statements(&self) -> u64 {
        self.aggregated().missing_statements
    }

    pub fn aggregated_total_branches(&self) -> u64 {
        self.aggregated().total_branches
    }

    pub fn aggregated_covered_branches(&self) -> u64 {
        self.aggregated().covered_branches
    }

    pub fn aggregated_partial_branches(&self) -> u64 {
        self.aggregated().partial_branches
    }

    pub fn aggregated_missing_branches(&self) -> u64 {
        self.aggregated().missing_branches
    }

    pub fn aggregated_statement_coverage(&self) -> f64 {
        self.aggregated().statement_coverage()
    }

    pub fn aggregated_branch_coverage(&self) -> f64 {
        self.aggregated().branch_coverage()
    }

    /// Combined coverage of the whole subtree.
    ///
    /// Returns [`INCONSISTENT`] when covered, missing and excluded statements
    /// don't add up to the total; an empty subtree is fully covered.
    pub fn aggregated_coverage(&self) -> f64 {
        let aggregated = self.aggregated();
        if !aggregated.is_consistent() {
            tracing::warn!(
                package = %self.qualified_name,
                total = aggregated.total_statements,
                covered = aggregated.covered_statements,
                missing = aggregated.missing_statements,
                excluded = aggregated.excluded_statements,
                "Inconsistent statement counters"
            );
            return INCONSISTENT;
        }

        aggregated.combined_coverage()
    }

    /// Number of modules in the subtree
    pub fn total_module_count(&self) -> usize {
        self.modules.len()
            + self
                .packages
                .values()
                .map(|p| p.total_module_count())
                .sum::<usize>()
    }

    /// Number of packages in the subtree, including this one
    pub fn total_package_count(&self) -> usize {
        1 + self
            .packages
            .values()
            .map(|p| p.total_package_count())
            .sum::<usize>()
    }

    /// Source files in the subtree: every module plus one `__init__` per package
    pub fn file_count(&self) -> usize {
        self.total_module_count() + self.total_package_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(total: u64, covered: u64, missing: u64, excluded: u64) -> CoverageCounters {
        CoverageCounters {
            total_statements: total,
            excluded_statements: excluded,
            covered_statements: covered,
            missing_statements: missing,
            ..Default::default()
        }
    }

    fn sample_tree() -> PackageCoverage {
        let mut root = PackageCoverage::new("pkg", Path::new("pkg/__init__.py"));
        root.counters = counters(2, 2, 0, 0);

        let sub = root
            .get_or_insert_package("sub", Path::new("pkg/sub/__init__.py"))
            .unwrap();
        sub.counters = counters(5, 1, 3, 1);
        sub.get_or_insert_module("a", Path::new("pkg/sub/a.py"))
            .unwrap()
            .counters = counters(10, 7, 3, 0);

        root.get_or_insert_module("b", Path::new("pkg/b.py"))
            .unwrap()
            .counters = counters(22, 20, 0, 2);

        root
    }

    #[test]
    fn test_aggregation_sums_subtree() {
        let root = sample_tree();

        assert_eq!(root.aggregated_total_statements(), 39);
        assert_eq!(root.aggregated_covered_statements(), 30);
        assert_eq!(root.aggregated_missing_statements(), 6);
        assert_eq!(root.aggregated_excluded_statements(), 3);

        let sub = root.package("sub").unwrap();
        assert_eq!(sub.aggregated_total_statements(), 15);
        assert_eq!(sub.aggregated_covered_statements(), 8);
    }

    #[test]
    fn test_aggregated_counters_stay_within_total() {
        fn check(package: &PackageCoverage) {
            let a = package.aggregated();
            assert!(a.covered_statements <= a.total_statements);
            assert!(
                a.missing_statements + a.covered_statements + a.excluded_statements
                    <= a.total_statements
            );
            for child in package.packages() {
                check(child);
            }
        }

        check(&sample_tree());
    }

    #[test]
    fn test_aggregation_is_recomputed() {
        let mut root = sample_tree();
        assert_eq!(root.aggregated_total_statements(), 39);

        root.get_or_insert_module("c", Path::new("pkg/c.py"))
            .unwrap()
            .counters = counters(4, 4, 0, 0);
        assert_eq!(root.aggregated_total_statements(), 43);
    }

    #[test]
    fn test_empty_package_is_fully_covered() {
        let root = PackageCoverage::new("empty", Path::new("__init__.py"));

        assert_eq!(root.aggregated_coverage(), 1.0);
        assert_eq!(root.statement_coverage(), 0.0);
        assert_eq!(root.branch_coverage(), 0.0);
    }

    #[test]
    fn test_inconsistent_counters_yield_sentinel() {
        let mut root = PackageCoverage::new("pkg", Path::new("__init__.py"));
        root.get_or_insert_module("m", Path::new("m.py"))
            .unwrap()
            .counters = counters(10, 8, 8, 0);

        assert_eq!(root.aggregated_coverage(), INCONSISTENT);
    }

    #[test]
    fn test_excluded_statements_are_not_expected() {
        let c = counters(12, 7, 3, 2);
        assert!(c.is_consistent());
        assert_eq!(c.expected_statements(), 10);
        assert!((c.combined_coverage() - 0.7).abs() < 1e-9);

        // Excluded statements outside the total don't add up
        assert!(!counters(10, 7, 3, 2).is_consistent());
    }

    #[test]
    fn test_branch_coverage_counts_partial() {
        let c = CoverageCounters {
            total_branches: 4,
            covered_branches: 3,
            partial_branches: 1,
            ..Default::default()
        };
        assert_eq!(c.branch_coverage(), 1.0);
    }

    #[test]
    fn test_name_unique_across_kinds() {
        let mut root = PackageCoverage::new("pkg", Path::new("__init__.py"));
        root.get_or_insert_module("x", Path::new("x.py")).unwrap();

        let err = root
            .get_or_insert_package("x", Path::new("x/__init__.py"))
            .unwrap_err();
        assert!(matches!(err, ReportError::DuplicateNode { .. }));

        // Re-inserting the same kind reuses the node
        root.get_or_insert_module("x", Path::new("x.py")).unwrap().counters.total_statements = 5;
        assert_eq!(root.module("x").unwrap().counters.total_statements, 5);
        assert_eq!(root.total_module_count(), 1);
    }

    #[test]
    fn test_counts() {
        let root = sample_tree();

        assert_eq!(root.total_module_count(), 2);
        assert_eq!(root.total_package_count(), 2);
        assert_eq!(root.file_count(), 4);
        assert_eq!(root.package("sub").unwrap().module("a").unwrap().qualified_name, "pkg.sub.a");
    }
}
