//! docstr-coverage JSON result converter

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{DocCounters, PackageCoverage};
use crate::coverage::split_module_path;
use crate::error::{read_report, ReportError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct DocstrReport {
    #[serde(default)]
    pub files: Option<BTreeMap<String, FileResult>>,
}

/// Per-file documentation counts
#[derive(Debug, Clone, Deserialize)]
pub struct FileResult {
    pub needed_count: u64,
    pub missing_count: u64,
    /// Percentage in 0..100
    #[serde(default)]
    pub coverage: Option<f64>,
    #[serde(default)]
    pub empty: bool,
}

impl FileResult {
    pub fn counters(&self) -> DocCounters {
        DocCounters {
            total: self.needed_count,
            excluded: 0,
            ignored: 0,
            expected: self.needed_count,
            covered: self.needed_count.saturating_sub(self.missing_count),
            uncovered: self.missing_count,
        }
    }

    pub fn coverage_ratio(&self) -> f64 {
        match self.coverage {
            Some(percent) => percent / 100.0,
            None => self.counters().coverage(),
        }
    }
}

/// Converts a docstr-coverage scan result into a documentation coverage tree
#[derive(Debug)]
pub struct Analyzer {
    package_name: String,
    directory: Option<PathBuf>,
    report_file: PathBuf,
    files: BTreeMap<String, FileResult>,
}

impl Analyzer {
    pub fn open(package_name: &str, directory: Option<&Path>, report_file: &Path) -> Result<Self> {
        let content = read_report("Documentation coverage", report_file)?;
        Self::from_json(package_name, directory, report_file, &content)
    }

    pub fn from_json(
        package_name: &str,
        directory: Option<&Path>,
        report_file: &Path,
        content: &str,
    ) -> Result<Self> {
        let report: DocstrReport =
            serde_json::from_str(content).map_err(|source| ReportError::Json {
                path: report_file.to_path_buf(),
                source,
            })?;

        let files = report
            .files
            .ok_or_else(|| ReportError::unsupported(report_file, "missing 'files' object"))?;

        info!(
            report = %report_file.display(),
            files = files.len(),
            "Read documentation coverage report"
        );

        Ok(Self {
            package_name: package_name.to_string(),
            directory: directory.map(Path::to_path_buf),
            report_file: report_file.to_path_buf(),
            files,
        })
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn report_file(&self) -> &Path {
        &self.report_file
    }

    /// Path of a report entry relative to the package directory.
    ///
    /// Returns the relative path and whether its first segment still names the root package.
    fn relative_path(&self, key: &str) -> (String, bool) {
        let normalized = key.replace('\\', "/");
        if let Some(directory) = &self.directory {
            if let Ok(relative) = Path::new(&normalized).strip_prefix(directory) {
                return (relative.to_string_lossy().to_string(), false);
            }
        }
        (normalized, true)
    }

    /// Build the package tree. Call [`PackageCoverage::aggregate`] on the result
    /// before reading aggregated values.
    pub fn convert(&self) -> Result<PackageCoverage> {
        let root_file = match &self.directory {
            Some(directory) => directory.join("__init__.py"),
            None => PathBuf::from("__init__.py"),
        };
        let mut root = PackageCoverage::new(&self.package_name, &root_file);

        for (key, result) in &self.files {
            let (relative, skip_root) = self.relative_path(key);
            let Some(module_path) = split_module_path(&relative, skip_root) else {
                debug!(file = %key, "Skipping entry without a file name");
                continue;
            };
            let module_file = PathBuf::from(key);

            let mut current = &mut root;
            for package_name in &module_path.packages {
                current = current.get_or_insert_package(package_name, &module_file)?;
            }

            match module_path.module {
                Some(module_name) => {
                    let module = current.get_or_insert_module(&module_name, &module_file)?;
                    module.counters = result.counters();
                    module.coverage = result.coverage_ratio();
                }
                None => {
                    current.file = module_file;
                    current.counters = result.counters();
                    current.coverage = result.coverage_ratio();
                }
            }
        }

        Ok(root)
    }
}
