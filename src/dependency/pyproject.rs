//! `pyproject.toml` reader

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{Distribution, License, VersionSpecifier};
use crate::error::{read_report, ReportError, Result};

#[derive(Debug, Deserialize)]
struct PyProject {
    project: Option<Project>,
}

#[derive(Debug, Deserialize)]
struct Project {
    name: String,
    version: Option<String>,
    license: Option<LicenseField>,
    #[serde(default)]
    classifiers: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// `license = "MIT"` or `license = { text = "MIT" }` / `{ file = "LICENSE" }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LicenseField {
    Expression(String),
    Table {
        text: Option<String>,
        file: Option<String>,
    },
}

const LICENSE_CLASSIFIER: &str = "License ::";

/// Reads the `[project]` table of a `pyproject.toml`
#[derive(Debug)]
pub struct DependencyScanner {
    manifest: PathBuf,
    distribution: Distribution,
}

impl DependencyScanner {
    pub fn open(manifest: &Path) -> Result<Self> {
        let content = read_report("Distribution manifest", manifest)?;
        Self::from_toml(manifest, &content)
    }

    pub fn from_toml(manifest: &Path, content: &str) -> Result<Self> {
        let pyproject: PyProject = toml::from_str(content).map_err(|source| ReportError::Toml {
            path: manifest.to_path_buf(),
            source,
        })?;

        let project = pyproject
            .project
            .ok_or_else(|| ReportError::unsupported(manifest, "missing [project] table"))?;

        let mut distribution = Distribution::new(&project.name);
        distribution.version = project.version.as_deref().map(VersionSpecifier::new);

        match project.license {
            Some(LicenseField::Expression(expression)) => {
                distribution.licenses.push(License::new(&expression));
            }
            Some(LicenseField::Table { text: Some(text), .. }) => {
                distribution.licenses.push(License::new(&text));
            }
            Some(LicenseField::Table { file: Some(file), .. }) => {
                debug!(file = %file, "License given as file, using classifiers");
            }
            _ => {}
        }

        for classifier in &project.classifiers {
            if !classifier.starts_with(LICENSE_CLASSIFIER) {
                continue;
            }
            if let Some(name) = classifier.rsplit("::").next().map(str::trim) {
                if !distribution.licenses.iter().any(|l| l.name() == name) {
                    distribution.licenses.push(License::new(name));
                }
            }
        }

        for requirement in &project.dependencies {
            match Distribution::from_requirement(requirement) {
                Some(dependency) => distribution.dependencies.push(dependency),
                None => debug!(requirement = %requirement, "Skipping unparsable requirement"),
            }
        }

        info!(
            manifest = %manifest.display(),
            distribution = %distribution.name,
            dependencies = distribution.dependencies.len(),
            "Read distribution metadata"
        );

        Ok(Self {
            manifest: manifest.to_path_buf(),
            distribution,
        })
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PYPROJECT: &str = r#"
[build-system]
requires = ["setuptools >= 69.0"]

[project]
name = "sphinx-reports"
version = "0.5.1"
license = { text = "Apache-2.0" }
classifiers = [
    "License :: OSI Approved :: Apache Software License",
    "Programming Language :: Python :: 3.12",
]
dependencies = [
    "pyTooling ~= 6.0",
    "sphinx >= 7.2, < 8.0",
    "colorama; platform_system == 'Windows'",
]
"#;

    #[test]
    fn test_read_project() {
        let scanner = DependencyScanner::from_toml(Path::new("pyproject.toml"), PYPROJECT).unwrap();
        let dist = scanner.distribution();

        assert_eq!(dist.name, "sphinx-reports");
        assert_eq!(dist.version_text(), "0.5.1");
        assert_eq!(dist.license_names(), "Apache-2.0, Apache Software License");

        let names: Vec<_> = dist.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["pyTooling", "sphinx", "colorama"]);
        assert_eq!(dist.dependencies[1].version_text(), ">= 7.2, < 8.0");
        assert!(dist.dependencies[2].version.is_none());
    }

    #[test]
    fn test_license_expression() {
        let content = "[project]\nname = \"pkg\"\nlicense = \"MIT\"\n";
        let scanner = DependencyScanner::from_toml(Path::new("pyproject.toml"), content).unwrap();
        assert_eq!(scanner.distribution().license_names(), "MIT");
        assert!(scanner.distribution().version.is_none());
    }

    #[test]
    fn test_missing_project_table() {
        let err = DependencyScanner::from_toml(Path::new("pyproject.toml"), "[tool.black]\n")
            .unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_open_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PYPROJECT.as_bytes()).unwrap();

        let scanner = DependencyScanner::open(file.path()).unwrap();
        assert_eq!(scanner.manifest(), file.path());
        assert_eq!(scanner.distribution().dependencies.len(), 3);
    }
}
