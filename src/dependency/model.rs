//! Distribution metadata model

use std::fmt;

/// Version constraint as written in a requirement, e.g. `>=1.2,<2`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpecifier(String);

impl VersionSpecifier {
    pub fn new(spec: &str) -> Self {
        Self(spec.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License(String);

impl License {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A distribution and its direct requirements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Distribution {
    pub name: String,
    pub version: Option<VersionSpecifier>,
    pub licenses: Vec<License>,
    pub dependencies: Vec<Distribution>,
}

impl Distribution {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Split a requirement string like `requests[socks]>=2.31; python_version<"3.12"`
    /// into name and version specifier. Extras and environment markers are dropped.
    pub fn from_requirement(requirement: &str) -> Option<Self> {
        let requirement = requirement.split(';').next().unwrap_or_default().trim();

        let name_end = requirement
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
            .unwrap_or(requirement.len());
        let name = &requirement[..name_end];
        if name.is_empty() {
            return None;
        }

        let mut rest = requirement[name_end..].trim_start();
        if rest.starts_with('[') {
            rest = match rest.find(']') {
                Some(end) => rest[end + 1..].trim_start(),
                None => "",
            };
        }

        // PEP 508 also allows the specifier in parentheses
        let spec = rest.trim_start_matches('(').trim_end_matches(')').trim();

        let mut distribution = Self::new(name);
        if !spec.is_empty() {
            distribution.version = Some(VersionSpecifier::new(spec));
        }
        Some(distribution)
    }

    /// Licenses joined for display
    pub fn license_names(&self) -> String {
        self.licenses
            .iter()
            .map(License::name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn version_text(&self) -> &str {
        self.version.as_ref().map(VersionSpecifier::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        let dist = Distribution::from_requirement("colorama").unwrap();
        assert_eq!(dist.name, "colorama");
        assert!(dist.version.is_none());
    }

    #[test]
    fn test_extras_and_markers_are_dropped() {
        let dist =
            Distribution::from_requirement("requests[socks, security] >= 2.31, <3 ; python_version < \"3.12\"")
                .unwrap();
        assert_eq!(dist.name, "requests");
        assert_eq!(dist.version_text(), ">= 2.31, <3");
    }

    #[test]
    fn test_parenthesized_specifier() {
        let dist = Distribution::from_requirement("pyTooling (~=6.0)").unwrap();
        assert_eq!(dist.name, "pyTooling");
        assert_eq!(dist.version_text(), "~=6.0");
    }

    #[test]
    fn test_invalid_requirement() {
        assert!(Distribution::from_requirement("").is_none());
        assert!(Distribution::from_requirement(">=1.0").is_none());
    }

    #[test]
    fn test_license_names() {
        let mut dist = Distribution::new("pkg");
        dist.licenses = vec![License::new("MIT"), License::new("Apache-2.0")];
        assert_eq!(dist.license_names(), "MIT, Apache-2.0");
    }
}
