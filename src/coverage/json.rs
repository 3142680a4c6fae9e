//! coverage.py JSON report converter

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{split_module_path, CoverageCounters, PackageCoverage};
use crate::error::{read_report, ReportError, Result};

/// JSON format versions written by coverage.py that can be read
pub const SUPPORTED_FORMATS: &[u32] = &[2, 3];

#[derive(Debug, Clone, Deserialize)]
pub struct CoverageReport {
    #[serde(default)]
    pub meta: Option<ReportMeta>,
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportMeta {
    #[serde(default)]
    pub format: Option<u32>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub branch_coverage: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileRecord {
    pub summary: FileSummary,
}

/// Per-file summary record. Branch fields are absent without branch coverage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSummary {
    #[serde(default)]
    pub num_statements: u64,
    #[serde(default)]
    pub excluded_lines: u64,
    #[serde(default)]
    pub covered_lines: u64,
    #[serde(default)]
    pub missing_lines: u64,
    #[serde(default)]
    pub num_branches: u64,
    #[serde(default)]
    pub covered_branches: u64,
    #[serde(default)]
    pub num_partial_branches: u64,
    #[serde(default)]
    pub missing_branches: u64,
    #[serde(default)]
    pub percent_covered: Option<f64>,
}

impl FileSummary {
    /// Counters of the file. `num_statements` leaves excluded lines out, the
    /// statement total counts them.
    pub fn counters(&self) -> CoverageCounters {
        CoverageCounters {
            total_statements: self.num_statements + self.excluded_lines,
            excluded_statements: self.excluded_lines,
            covered_statements: self.covered_lines,
            missing_statements: self.missing_lines,
            total_branches: self.num_branches,
            covered_branches: self.covered_branches,
            partial_branches: self.num_partial_branches,
            missing_branches: self.missing_branches,
        }
    }

    /// Reported coverage as a ratio, computed from the counters if absent
    pub fn coverage(&self) -> f64 {
        match self.percent_covered {
            Some(percent) => percent / 100.0,
            None => self.counters().combined_coverage(),
        }
    }
}

/// Converts a coverage.py JSON report into a [`PackageCoverage`] tree
#[derive(Debug)]
pub struct Analyzer {
    package_name: String,
    report_file: PathBuf,
    report: CoverageReport,
}

impl Analyzer {
    /// Read and check a JSON coverage report
    pub fn open(package_name: &str, report_file: &Path) -> Result<Self> {
        let content = read_report("JSON coverage", report_file)?;
        Self::from_json(package_name, report_file, &content)
    }

    /// Parse report content; `report_file` is only used in messages
    pub fn from_json(package_name: &str, report_file: &Path, content: &str) -> Result<Self> {
        let report: CoverageReport =
            serde_json::from_str(content).map_err(|source| ReportError::Json {
                path: report_file.to_path_buf(),
                source,
            })?;

        let format = report
            .meta
            .as_ref()
            .and_then(|meta| meta.format)
            .ok_or_else(|| ReportError::unsupported(report_file, "missing 'meta.format' field"))?;

        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(ReportError::unsupported(
                report_file,
                format!("file format {format} is not supported"),
            ));
        }

        info!(
            report = %report_file.display(),
            format,
            files = report.files.len(),
            "Read JSON coverage report"
        );

        Ok(Self {
            package_name: package_name.to_string(),
            report_file: report_file.to_path_buf(),
            report,
        })
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn report_file(&self) -> &Path {
        &self.report_file
    }

    pub fn report(&self) -> &CoverageReport {
        &self.report
    }

    /// Build the package tree. Counters are copied verbatim from each file record.
    pub fn convert(&self) -> Result<PackageCoverage> {
        let mut root = PackageCoverage::new(&self.package_name, Path::new("__init__.py"));

        for (key, record) in &self.report.files {
            let module_file = PathBuf::from(key);
            let Some(module_path) = split_module_path(key, true) else {
                debug!(file = %key, "Skipping entry without a file name");
                continue;
            };

            let mut current = &mut root;
            for package_name in &module_path.packages {
                current = current.get_or_insert_package(package_name, &module_file)?;
            }

            let summary = &record.summary;
            match module_path.module {
                Some(module_name) => {
                    let module = current.get_or_insert_module(&module_name, &module_file)?;
                    module.counters = summary.counters();
                    module.coverage = summary.coverage();
                }
                None => {
                    current.file = module_file;
                    current.counters = summary.counters();
                    current.coverage = summary.coverage();
                }
            }
        }

        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::NOT_COMPUTED;
    use std::io::Write;

    fn report(files: &str) -> String {
        format!(
            r#"{{"meta": {{"format": 2, "version": "7.4.0", "branch_coverage": true}},
                 "files": {{{files}}},
                 "totals": {{}}}}"#
        )
    }

    const MOD_ENTRY: &str = r#""pkg/sub/mod.py": {"executed_lines": [1, 2], "summary": {
        "covered_lines": 7, "num_statements": 10, "percent_covered": 78.57142857,
        "missing_lines": 3, "excluded_lines": 0, "num_branches": 4,
        "num_partial_branches": 1, "covered_branches": 3, "missing_branches": 0}}"#;

    #[test]
    fn test_convert_single_file() {
        let content = report(MOD_ENTRY);
        let analyzer = Analyzer::from_json("pkg", Path::new("coverage.json"), &content).unwrap();
        let root = analyzer.convert().unwrap();

        assert_eq!(root.name, "pkg");
        let sub = root.package("sub").unwrap();
        let module = sub.module("mod").unwrap();

        assert_eq!(module.counters.total_statements, 10);
        assert_eq!(module.counters.missing_statements, 3);
        assert!((module.statement_coverage() - 0.7).abs() < 1e-9);
        assert_eq!(module.branch_coverage(), 1.0);
        assert!((module.coverage - 0.7857142857).abs() < 1e-6);

        // Packages without an __init__ entry keep their defaults
        assert_eq!(sub.coverage, NOT_COMPUTED);
        assert_eq!(root.aggregated_total_statements(), 10);
    }

    #[test]
    fn test_init_counters_belong_to_package() {
        let content = report(&format!(
            r#"{MOD_ENTRY}, "pkg/sub/__init__.py": {{"summary": {{
                "covered_lines": 2, "num_statements": 2, "percent_covered": 100.0,
                "missing_lines": 0, "excluded_lines": 1}}}}"#
        ));
        let root = Analyzer::from_json("pkg", Path::new("c.json"), &content)
            .unwrap()
            .convert()
            .unwrap();

        let sub = root.package("sub").unwrap();
        assert_eq!(sub.counters.total_statements, 3);
        assert_eq!(sub.counters.excluded_statements, 1);
        assert!(sub.counters.is_consistent());
        assert_eq!(sub.coverage, 1.0);
        assert_eq!(sub.total_module_count(), 1);
        assert_eq!(root.aggregated_covered_statements(), 9);
    }

    #[test]
    fn test_conversion_is_repeatable() {
        let content = report(MOD_ENTRY);
        let analyzer = Analyzer::from_json("pkg", Path::new("c.json"), &content).unwrap();

        let first = analyzer.convert().unwrap();
        let second = analyzer.convert().unwrap();
        assert_eq!(first.aggregated(), second.aggregated());
        assert_eq!(first.file_count(), second.file_count());
    }

    #[test]
    fn test_unsupported_format() {
        let content = r#"{"meta": {"format": 1}, "files": {}}"#;
        let err = Analyzer::from_json("pkg", Path::new("c.json"), content).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat { .. }));

        let content = r#"{"files": {}}"#;
        let err = Analyzer::from_json("pkg", Path::new("c.json"), content).unwrap_err();
        assert!(err.to_string().contains("meta.format"));
    }

    #[test]
    fn test_malformed_json() {
        let err = Analyzer::from_json("pkg", Path::new("c.json"), "{ not json").unwrap_err();
        assert!(matches!(err, ReportError::Json { .. }));
    }

    #[test]
    fn test_open_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", report(MOD_ENTRY)).unwrap();

        let analyzer = Analyzer::open("pkg", file.path()).unwrap();
        assert_eq!(analyzer.report().files.len(), 1);

        let err = Analyzer::open("pkg", Path::new("/does/not/exist.json")).unwrap_err();
        assert!(matches!(err, ReportError::ReportNotFound { .. }));
    }
}
