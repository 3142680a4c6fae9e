//! Report configuration
//!
//! Read from `docreports.toml`. [`Config::load`] validates level sets,
//! `fail_below` ranges and required keys. Report files are only opened when
//! their report is built, so a missing file fails that report alone.
//! Report paths may use `~` and `$VAR` and are resolved relative to the
//! directory of the configuration file.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::levels::{CoverageLevels, RawLevelStyle};

/// Default configuration file name
pub const CONFIG_FILE: &str = "docreports.toml";

/// Name of the level set used when a package doesn't name one
pub const DEFAULT_LEVELS: &str = "default";

type RawLevels = BTreeMap<String, RawLevelStyle>;

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    codecov: RawCoverageSection,
    #[serde(default)]
    doccov: RawCoverageSection,
    #[serde(default)]
    unittest: RawUnittestSection,
    #[serde(default)]
    dependency: RawDependencySection,
}

#[derive(Debug, Default, Deserialize)]
struct RawCoverageSection {
    #[serde(default)]
    levels: BTreeMap<String, RawLevels>,
    #[serde(default)]
    packages: BTreeMap<String, RawCoveragePackage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCoveragePackage {
    name: Option<String>,
    json_report: Option<String>,
    /// Only used by documentation coverage
    directory: Option<String>,
    fail_below: Option<toml::Value>,
    levels: Option<LevelsRef>,
}

/// `levels = "name"` or an inline level table
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LevelsRef {
    Named(String),
    Inline(RawLevels),
}

#[derive(Debug, Default, Deserialize)]
struct RawUnittestSection {
    #[serde(default)]
    testsuites: BTreeMap<String, RawTestsuite>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTestsuite {
    xml_report: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDependencySection {
    #[serde(default)]
    packages: BTreeMap<String, RawDependencyPackage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDependencyPackage {
    manifest: Option<String>,
}

/// Code coverage report of one package
#[derive(Debug, Clone)]
pub struct CodeCoveragePackage {
    pub id: String,
    pub name: String,
    pub json_report: PathBuf,
    /// Percentage in 0..=100
    pub fail_below: u8,
    pub levels: CoverageLevels,
}

/// Documentation coverage report of one package
#[derive(Debug, Clone)]
pub struct DocCoveragePackage {
    pub id: String,
    pub name: String,
    pub json_report: PathBuf,
    /// Source directory the report paths are relative to
    pub directory: Option<PathBuf>,
    pub fail_below: u8,
    pub levels: CoverageLevels,
}

#[derive(Debug, Clone)]
pub struct UnittestReport {
    pub id: String,
    pub xml_report: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DependencyPackage {
    pub id: String,
    pub manifest: PathBuf,
}

/// Validated configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub base_dir: PathBuf,
    pub code_coverage: BTreeMap<String, CodeCoveragePackage>,
    pub doc_coverage: BTreeMap<String, DocCoveragePackage>,
    pub unittests: BTreeMap<String, UnittestReport>,
    pub dependencies: BTreeMap<String, DependencyPackage>,
}

/// Report family, used for config sections and output file names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    CodeCoverage,
    DocCoverage,
}

impl Family {
    fn prefix(&self) -> &'static str {
        match self {
            Family::CodeCoverage => "codecov",
            Family::DocCoverage => "doccov",
        }
    }

    fn default_levels(&self) -> CoverageLevels {
        match self {
            Family::CodeCoverage => CoverageLevels::code_coverage_default(),
            Family::DocCoverage => CoverageLevels::documentation_default(),
        }
    }
}

/// Package settings shared by both coverage families
struct CoverageSettings {
    name: String,
    json_report: PathBuf,
    fail_below: u8,
    levels: CoverageLevels,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        Self::parse(path, &content, base_dir)
    }

    /// Parse and validate configuration text. `path` is only used in error messages.
    pub fn parse(path: &Path, content: &str, base_dir: &Path) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ReportError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Config {
            base_dir: base_dir.to_path_buf(),
            ..Default::default()
        };

        let code_levels = validate_level_sets(Family::CodeCoverage, &raw.codecov.levels)?;
        for (id, package) in &raw.codecov.packages {
            let settings = config.coverage_settings(Family::CodeCoverage, id, package, &code_levels)?;
            config.code_coverage.insert(
                id.clone(),
                CodeCoveragePackage {
                    id: id.clone(),
                    name: settings.name,
                    json_report: settings.json_report,
                    fail_below: settings.fail_below,
                    levels: settings.levels,
                },
            );
        }

        let doc_levels = validate_level_sets(Family::DocCoverage, &raw.doccov.levels)?;
        for (id, package) in &raw.doccov.packages {
            let location = format!("doccov.packages.{id}");
            let settings = config.coverage_settings(Family::DocCoverage, id, package, &doc_levels)?;

            // Matched against report keys as written, so not resolved
            let directory = match &package.directory {
                Some(directory) if directory.trim().is_empty() => {
                    return Err(ReportError::config(
                        format!("{location}.directory"),
                        "Directory is empty.",
                    ))
                }
                Some(directory) => Some(PathBuf::from(directory)),
                None => None,
            };

            config.doc_coverage.insert(
                id.clone(),
                DocCoveragePackage {
                    id: id.clone(),
                    name: settings.name,
                    json_report: settings.json_report,
                    directory,
                    fail_below: settings.fail_below,
                    levels: settings.levels,
                },
            );
        }

        for (id, testsuite) in &raw.unittest.testsuites {
            let location = format!("unittest.testsuites.{id}.xml_report");
            let xml_report = config.required_path(&location, testsuite.xml_report.as_deref())?;
            config.unittests.insert(
                id.clone(),
                UnittestReport {
                    id: id.clone(),
                    xml_report,
                },
            );
        }

        for (id, package) in &raw.dependency.packages {
            let location = format!("dependency.packages.{id}.manifest");
            let manifest = config.required_path(&location, package.manifest.as_deref())?;
            config.dependencies.insert(
                id.clone(),
                DependencyPackage {
                    id: id.clone(),
                    manifest,
                },
            );
        }

        debug!(
            code_coverage = config.code_coverage.len(),
            doc_coverage = config.doc_coverage.len(),
            unittests = config.unittests.len(),
            dependencies = config.dependencies.len(),
            "Loaded configuration"
        );

        Ok(config)
    }

    fn coverage_settings(
        &self,
        family: Family,
        id: &str,
        package: &RawCoveragePackage,
        level_sets: &BTreeMap<String, CoverageLevels>,
    ) -> Result<CoverageSettings> {
        let location = format!("{}.packages.{id}", family.prefix());

        let name = package
            .name
            .clone()
            .ok_or_else(|| ReportError::config(format!("{location}.name"), "Configuration is missing."))?;

        let json_report = self.required_path(&format!("{location}.json_report"), package.json_report.as_deref())?;

        let fail_below = parse_fail_below(&format!("{location}.fail_below"), package.fail_below.as_ref())?;

        let levels = match &package.levels {
            None => lookup_levels(&location, level_sets, DEFAULT_LEVELS)?,
            Some(LevelsRef::Named(levels_name)) => lookup_levels(&location, level_sets, levels_name)?,
            Some(LevelsRef::Inline(raw)) => CoverageLevels::from_raw(&format!("{location}.levels"), raw)?,
        };

        Ok(CoverageSettings {
            name,
            json_report,
            fail_below,
            levels,
        })
    }

    /// Expand `~`/`$VAR` and resolve against the configuration directory
    pub fn resolve_path(&self, location: &str, raw: &str) -> Result<PathBuf> {
        let expanded = shellexpand::full(raw)
            .map_err(|e| ReportError::config(location, format!("Couldn't expand '{raw}': {e}")))?;

        let path = PathBuf::from(expanded.as_ref());
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.base_dir.join(path))
        }
    }

    /// Resolved path of a required report file entry. Existence is checked
    /// when the report is read.
    fn required_path(&self, location: &str, raw: Option<&str>) -> Result<PathBuf> {
        let raw = raw.ok_or_else(|| ReportError::config(location, "Configuration is missing."))?;
        self.resolve_path(location, raw)
    }

    pub fn code_coverage_package(&self, id: &str) -> Option<&CodeCoveragePackage> {
        self.code_coverage.get(id)
    }

    pub fn doc_coverage_package(&self, id: &str) -> Option<&DocCoveragePackage> {
        self.doc_coverage.get(id)
    }

    pub fn unittest_report(&self, id: &str) -> Option<&UnittestReport> {
        self.unittests.get(id)
    }

    pub fn dependency_package(&self, id: &str) -> Option<&DependencyPackage> {
        self.dependencies.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.code_coverage.is_empty()
            && self.doc_coverage.is_empty()
            && self.unittests.is_empty()
            && self.dependencies.is_empty()
    }
}

/// Validate every configured level set and add the built-in default when absent
fn validate_level_sets(
    family: Family,
    raw: &BTreeMap<String, RawLevels>,
) -> Result<BTreeMap<String, CoverageLevels>> {
    let mut level_sets = BTreeMap::new();

    for (name, levels) in raw {
        let location = format!("{}.levels.{name}", family.prefix());
        level_sets.insert(name.clone(), CoverageLevels::from_raw(&location, levels)?);
    }

    level_sets
        .entry(DEFAULT_LEVELS.to_string())
        .or_insert_with(|| family.default_levels());

    Ok(level_sets)
}

fn lookup_levels(
    location: &str,
    level_sets: &BTreeMap<String, CoverageLevels>,
    name: &str,
) -> Result<CoverageLevels> {
    level_sets.get(name).cloned().ok_or_else(|| {
        ReportError::config(
            format!("{location}.levels"),
            format!("Referenced coverage levels '{name}' are not defined."),
        )
    })
}

fn parse_fail_below(location: &str, value: Option<&toml::Value>) -> Result<u8> {
    let value = value.ok_or_else(|| ReportError::config(location, "Configuration is missing."))?;

    let percent = match value {
        toml::Value::Integer(i) => *i,
        toml::Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            ReportError::config(location, format!("'{s}' is not an integer in range 0..100."))
        })?,
        other => {
            return Err(ReportError::config(
                location,
                format!("'{other}' is not an integer in range 0..100."),
            ))
        }
    };

    u8::try_from(percent)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| ReportError::config(location, "Is out of range 0..100."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("report")).unwrap();
        fs::create_dir_all(dir.path().join("mypackage")).unwrap();
        fs::write(dir.path().join("report/coverage.json"), "{}").unwrap();
        fs::write(dir.path().join("report/docstr.json"), "{}").unwrap();
        fs::write(dir.path().join("report/unittest.xml"), "<testsuites/>").unwrap();
        fs::write(dir.path().join("pyproject.toml"), "[project]\nname = \"p\"\n").unwrap();
        dir
    }

    fn parse(dir: &TempDir, content: &str) -> Result<Config> {
        Config::parse(Path::new(CONFIG_FILE), content, dir.path())
    }

    #[test]
    fn test_parse_config() {
        let dir = workspace();
        let config = parse(
            &dir,
            r#"
[codecov.levels.strict]
50    = { class = "low", desc = "low" }
100   = { class = "high", desc = "high" }
error = { class = "err", desc = "error" }

[codecov.packages.src]
name        = "mypackage"
json_report = "report/coverage.json"
fail_below  = 80
levels      = "strict"

[doccov.packages.src]
name        = "mypackage"
json_report = "report/docstr.json"
directory   = "mypackage"
fail_below  = "75"

[unittest.testsuites.src]
xml_report = "report/unittest.xml"

[dependency.packages.src]
manifest = "pyproject.toml"
"#,
        )
        .unwrap();

        let code = config.code_coverage_package("src").unwrap();
        assert_eq!(code.name, "mypackage");
        assert_eq!(code.fail_below, 80);
        assert_eq!(code.json_report, dir.path().join("report/coverage.json"));
        assert_eq!(code.levels.class_for(0.4), "low");

        let doc = config.doc_coverage_package("src").unwrap();
        assert_eq!(doc.fail_below, 75);
        assert_eq!(doc.directory.as_deref(), Some(Path::new("mypackage")));
        assert_eq!(doc.levels, CoverageLevels::documentation_default());

        assert!(config.unittest_report("src").is_some());
        assert!(config.dependency_package("src").is_some());
        assert!(!config.is_empty());
    }

    #[test]
    fn test_inline_levels() {
        let dir = workspace();
        let config = parse(
            &dir,
            r#"
[codecov.packages.src]
name        = "p"
json_report = "report/coverage.json"
fail_below  = 0
levels      = { 100 = { class = "ok", desc = "ok" }, error = { class = "e", desc = "e" } }
"#,
        )
        .unwrap();

        assert_eq!(config.code_coverage["src"].levels.class_for(0.1), "ok");
    }

    #[test]
    fn test_undefined_level_set() {
        let dir = workspace();
        let err = parse(
            &dir,
            r#"
[codecov.packages.src]
name        = "p"
json_report = "report/coverage.json"
fail_below  = 50
levels      = "missing"
"#,
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "codecov.packages.src.levels: Referenced coverage levels 'missing' are not defined."
        );
    }

    #[test]
    fn test_fail_below_validation() {
        let dir = workspace();
        let config = |fail_below: &str| {
            format!(
                "[codecov.packages.src]\nname = \"p\"\njson_report = \"report/coverage.json\"\n{fail_below}\n"
            )
        };

        let err = parse(&dir, &config("fail_below = 120")).unwrap_err();
        assert_eq!(err.to_string(), "codecov.packages.src.fail_below: Is out of range 0..100.");

        let err = parse(&dir, &config("fail_below = -1")).unwrap_err();
        assert!(err.to_string().ends_with("Is out of range 0..100."));

        let err = parse(&dir, &config("fail_below = \"high\"")).unwrap_err();
        assert!(err.to_string().contains("'high' is not an integer in range 0..100."));

        let err = parse(&dir, &config("")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "codecov.packages.src.fail_below: Configuration is missing."
        );
    }

    #[test]
    fn test_missing_report_file_is_not_a_config_error() {
        let dir = workspace();
        let config = parse(
            &dir,
            "[unittest.testsuites.src]\nxml_report = \"report/missing.xml\"\n",
        )
        .unwrap();

        assert_eq!(
            config.unittests["src"].xml_report,
            dir.path().join("report/missing.xml")
        );
    }

    #[test]
    fn test_missing_report_key() {
        let dir = workspace();
        let err = parse(&dir, "[unittest.testsuites.src]\n").unwrap_err();

        assert!(matches!(err, ReportError::Config { .. }));
        assert_eq!(
            err.to_string(),
            "unittest.testsuites.src.xml_report: Configuration is missing."
        );
    }

    #[test]
    fn test_invalid_level_set() {
        let dir = workspace();
        let err = parse(
            &dir,
            "[doccov.levels.default]\n100 = { class = \"a\", desc = \"a\" }\n",
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "doccov.levels.default[error]: Configuration is missing.");
    }

    #[test]
    fn test_load_resolves_relative_to_config_dir() {
        let dir = workspace();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[dependency.packages.src]\nmanifest = \"pyproject.toml\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_dir, dir.path());
        assert_eq!(config.dependencies["src"].manifest, dir.path().join("pyproject.toml"));
    }

    #[test]
    fn test_empty_config() {
        let dir = workspace();
        let config = parse(&dir, "").unwrap();
        assert!(config.is_empty());
    }
}
