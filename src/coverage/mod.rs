//! Code coverage module
//!
//! Provides:
//! - Package/module coverage tree
//! - coverage.py JSON report conversion

mod json;
mod model;

pub use json::*;
pub use model::*;

use std::path::{Component, Path};

/// Location of a source file inside a package tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModulePath {
    /// Package segments below the root package
    pub packages: Vec<String>,
    /// Module name, `None` for a package's `__init__` file
    pub module: Option<String>,
}

/// Split a report path like `pkg/sub/mod.py` into package segments and a module name.
///
/// With `skip_root`, the first directory is the root package itself and is
/// dropped. Backslash separators are accepted.
pub(crate) fn split_module_path(path: &str, skip_root: bool) -> Option<ModulePath> {
    let normalized = path.replace('\\', "/");
    let path = Path::new(&normalized);

    let stem = path.file_stem()?.to_string_lossy().to_string();

    let mut packages: Vec<String> = path
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if skip_root && !packages.is_empty() {
        packages.remove(0);
    }

    let module = if stem == "__init__" { None } else { Some(stem) };

    Some(ModulePath { packages, module })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_module_path() {
        let path = split_module_path("pkg/sub/mod.py", true).unwrap();
        assert_eq!(path.packages, vec!["sub"]);
        assert_eq!(path.module.as_deref(), Some("mod"));

        let path = split_module_path("pkg/sub/__init__.py", true).unwrap();
        assert_eq!(path.packages, vec!["sub"]);
        assert_eq!(path.module, None);

        let path = split_module_path("./sub/mod.py", false).unwrap();
        assert_eq!(path.packages, vec!["sub"]);
    }

    #[test]
    fn test_split_windows_path() {
        let path = split_module_path("pkg\\Adapter\\JUnit.py", true).unwrap();
        assert_eq!(path.packages, vec!["Adapter"]);
        assert_eq!(path.module.as_deref(), Some("JUnit"));
    }

    #[test]
    fn test_top_level_file() {
        let path = split_module_path("setup.py", true).unwrap();
        assert!(path.packages.is_empty());
        assert_eq!(path.module.as_deref(), Some("setup"));
    }
}
