//! Coverage level definitions
//!
//! A level set maps upper-bound percentages to a display style (CSS class and
//! description). Classification is half-open: a ratio falls into the first
//! level whose bound is strictly greater than `ratio * 100`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ReportError, Result};

/// Coverage value of a node whose coverage was never computed
pub const NOT_COMPUTED: f64 = -1.0;

/// Coverage value of a node whose aggregated counters contradict each other
pub const INCONSISTENT: f64 = -2.0;

/// Key of the mandatory error level
pub const ERROR_LEVEL: &str = "error";

/// Display style of one coverage level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStyle {
    pub class: String,
    #[serde(rename = "desc")]
    pub description: String,
}

impl LevelStyle {
    pub fn new(class: &str, description: &str) -> Self {
        Self {
            class: class.to_string(),
            description: description.to_string(),
        }
    }
}

/// Level style as written in the configuration file, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLevelStyle {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

/// Validated, ordered set of coverage levels
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageLevels {
    /// Sorted ascending by bound, always ends with the 100 level
    levels: Vec<(u8, LevelStyle)>,
    error: LevelStyle,
}

impl CoverageLevels {
    /// Validate a level set read from the configuration.
    ///
    /// `location` prefixes every error message, e.g. `codecov.levels.default`.
    pub fn from_raw(location: &str, raw: &BTreeMap<String, RawLevelStyle>) -> Result<Self> {
        let mut levels: Vec<(u8, LevelStyle)> = Vec::new();
        let mut error = None;

        for (key, level) in raw {
            let entry = format!("{location}[{key}]");

            let bound = parse_level_key(&entry, key)?;

            let class = level
                .class
                .clone()
                .ok_or_else(|| ReportError::config(format!("{entry}.class"), "CSS class is missing."))?;
            let description = level
                .desc
                .clone()
                .ok_or_else(|| ReportError::config(format!("{entry}.desc"), "Description is missing."))?;

            let style = LevelStyle { class, description };
            match bound {
                Some(bound) if levels.iter().any(|(b, _)| *b == bound) => {
                    return Err(ReportError::config(
                        entry,
                        format!("Level {bound} is defined more than once."),
                    ));
                }
                Some(bound) => levels.push((bound, style)),
                None => error = Some(style),
            }
        }

        if !levels.iter().any(|(bound, _)| *bound == 100) {
            return Err(ReportError::config(
                format!("{location}[100]"),
                "Configuration is missing.",
            ));
        }
        let error = error.ok_or_else(|| {
            ReportError::config(format!("{location}[{ERROR_LEVEL}]"), "Configuration is missing.")
        })?;

        Ok(Self::from_sorted(levels, error))
    }

    fn from_sorted(mut levels: Vec<(u8, LevelStyle)>, error: LevelStyle) -> Self {
        levels.sort_by_key(|(bound, _)| *bound);
        Self { levels, error }
    }

    /// Built-in level set for code coverage reports
    pub fn code_coverage_default() -> Self {
        Self::from_sorted(
            vec![
                (30, LevelStyle::new("report-cov-below30", "almost unused")),
                (50, LevelStyle::new("report-cov-below50", "poorly used")),
                (80, LevelStyle::new("report-cov-below80", "roughly used")),
                (90, LevelStyle::new("report-cov-below90", "well used")),
                (100, LevelStyle::new("report-cov-below100", "excellent used")),
            ],
            LevelStyle::new("report-cov-error", "internal error"),
        )
    }

    /// Built-in level set for documentation coverage reports
    pub fn documentation_default() -> Self {
        Self::from_sorted(
            vec![
                (30, LevelStyle::new("report-cov-below30", "almost undocumented")),
                (50, LevelStyle::new("report-cov-below50", "poorly documented")),
                (80, LevelStyle::new("report-cov-below80", "roughly documented")),
                (90, LevelStyle::new("report-cov-below90", "well documented")),
                (100, LevelStyle::new("report-cov-below100", "excellent documented")),
            ],
            LevelStyle::new("report-cov-error", "internal error"),
        )
    }

    /// Map a coverage ratio to its level.
    ///
    /// Negative ratios (and NaN) are error sentinels and always map to the
    /// error level. Ratios above every bound map to the 100 level.
    pub fn classify(&self, ratio: f64) -> &LevelStyle {
        if ratio.is_nan() || ratio < 0.0 {
            return &self.error;
        }

        let percent = ratio * 100.0;
        for (bound, style) in &self.levels {
            if percent < f64::from(*bound) {
                return style;
            }
        }

        self.full()
    }

    /// CSS class of the level a ratio falls into
    pub fn class_for(&self, ratio: f64) -> &str {
        &self.classify(ratio).class
    }

    fn full(&self) -> &LevelStyle {
        self.levels
            .iter()
            .rev()
            .find(|(bound, _)| *bound == 100)
            .map(|(_, style)| style)
            .unwrap_or(&self.error)
    }

    pub fn error_style(&self) -> &LevelStyle {
        &self.error
    }

    /// Numeric levels in ascending order
    pub fn levels(&self) -> impl Iterator<Item = (u8, &LevelStyle)> {
        self.levels.iter().map(|(bound, style)| (*bound, style))
    }

    /// Legend entries: each numeric bound with its description and the class
    /// a value just below the bound is rendered with.
    pub fn legend(&self) -> Vec<LegendEntry<'_>> {
        self.levels
            .iter()
            .map(|(bound, style)| LegendEntry {
                bound: *bound,
                description: &style.description,
                class: self.class_for((f64::from(*bound) - 1.0) / 100.0),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry<'a> {
    pub bound: u8,
    pub description: &'a str,
    pub class: &'a str,
}

fn parse_level_key(entry: &str, key: &str) -> Result<Option<u8>> {
    if key == ERROR_LEVEL {
        return Ok(None);
    }

    if key.chars().all(|c| c.is_ascii_digit()) && !key.is_empty() {
        return match key.parse::<u32>() {
            Ok(bound) if bound <= 100 => Ok(Some(bound as u8)),
            _ => Err(ReportError::config(entry, "Level is out of range 0..100.")),
        };
    }

    if key.chars().all(|c| c.is_ascii_alphabetic() || c == '_') && !key.is_empty() {
        return Err(ReportError::config(entry, "Level is a keyword, but not 'error'."));
    }

    Err(ReportError::config(
        entry,
        "Level is not a keyword or an integer in range 0..100.",
    ))
}
