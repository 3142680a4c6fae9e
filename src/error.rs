//! Error types for report loading and conversion
//!
//! Every failure of the library surfaces as a [`ReportError`]. The binary wraps
//! them into `anyhow` errors; batch rendering turns them into placeholders.

use std::io;
use std::path::PathBuf;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Malformed or incomplete configuration entry
    #[error("{location}: {message}")]
    Config { location: String, message: String },

    #[error("{kind} report file '{}' not found", path.display())]
    ReportNotFound { kind: &'static str, path: PathBuf },

    #[error("Couldn't read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Couldn't parse JSON report '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Couldn't parse XML report '{}': {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Couldn't parse TOML file '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unsupported report format in '{}': {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Unknown element '{element}' in report file '{}'", path.display())]
    UnknownElement { path: PathBuf, element: String },

    #[error("'{name}' already exists in '{parent}' as a different kind of node")]
    DuplicateNode { parent: String, name: String },
}

/// Coarse classification of errors, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ReportFile,
    Structure,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::ReportFile => "report-file",
            ErrorCategory::Structure => "structure",
        }
    }
}

impl ReportError {
    pub(crate) fn config(location: impl Into<String>, message: impl Into<String>) -> Self {
        ReportError::Config {
            location: location.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ReportError::UnsupportedFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::Config { .. } | ReportError::Toml { .. } => ErrorCategory::Configuration,
            ReportError::ReportNotFound { .. }
            | ReportError::Io { .. }
            | ReportError::Json { .. }
            | ReportError::Xml { .. }
            | ReportError::UnsupportedFormat { .. } => ErrorCategory::ReportFile,
            ReportError::UnknownElement { .. } | ReportError::DuplicateNode { .. } => {
                ErrorCategory::Structure
            }
        }
    }
}

/// Read a report file, mapping a missing file to [`ReportError::ReportNotFound`]
pub(crate) fn read_report(kind: &'static str, path: &std::path::Path) -> Result<String> {
    if !path.exists() {
        return Err(ReportError::ReportNotFound {
            kind,
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_report_file() {
        let err = read_report("JSON coverage", std::path::Path::new("/nonexistent/coverage.json"))
            .unwrap_err();

        assert!(matches!(err, ReportError::ReportNotFound { .. }));
        assert_eq!(err.category(), ErrorCategory::ReportFile);
        assert_eq!(
            err.to_string(),
            "JSON coverage report file '/nonexistent/coverage.json' not found"
        );
    }

    #[test]
    fn test_config_error_message() {
        let err = ReportError::config("codecov.packages.src.fail_below", "Is out of range 0..100.");
        assert_eq!(
            err.to_string(),
            "codecov.packages.src.fail_below: Is out of range 0..100."
        );
        assert_eq!(err.category().label(), "configuration");
    }
}
