//! Coverage threshold validation

use colored::Colorize;

/// Result of checking a coverage ratio against `fail_below`
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdResult {
    pub passed: bool,
    /// Coverage ratio in 0..1, or a negative sentinel
    pub coverage: f64,
    /// Threshold in percent
    pub fail_below: u8,
}

impl ThresholdResult {
    /// Distance to the threshold in percentage points
    pub fn delta(&self) -> Option<f64> {
        if self.coverage < 0.0 {
            None
        } else {
            Some(self.coverage * 100.0 - f64::from(self.fail_below))
        }
    }

    pub fn print_summary(&self, label: &str) {
        let status = if self.passed { "✓".green() } else { "✗".red() };

        match self.delta() {
            Some(delta) => {
                let delta_str = if delta >= 0.0 {
                    format!("+{:.1}%", delta).green()
                } else {
                    format!("{:.1}%", delta).red()
                };

                println!(
                    "  {} {}: {:.1}% (fail below: {}%, {})",
                    status,
                    label,
                    self.coverage * 100.0,
                    self.fail_below,
                    delta_str
                );
            }
            None => {
                println!(
                    "  {} {}: {} (fail below: {}%)",
                    status,
                    label,
                    "coverage could not be computed".red(),
                    self.fail_below
                );
            }
        }
    }
}

/// Validate an aggregated coverage ratio against a percentage threshold.
///
/// Error sentinels never pass.
pub fn validate_threshold(coverage: f64, fail_below: u8) -> ThresholdResult {
    let passed = coverage >= 0.0 && coverage * 100.0 >= f64::from(fail_below);

    ThresholdResult {
        passed,
        coverage,
        fail_below,
    }
}
