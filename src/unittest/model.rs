//! Unit test result data model
//!
//! Testsuites form a tree keyed by the dotted class-name segments of their
//! testcases. [`TestsuiteSummary`] is the root of that tree.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::time::Duration;

use tracing::{debug, warn};

/// Outcome of a testcase, or the derived status of a testsuite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestcaseState {
    #[default]
    Unknown,
    Passed,
    Failed,
    Skipped,
    Errored,
}

impl TestcaseState {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestcaseState::Passed => "✅",
            TestcaseState::Unknown => "❓",
            _ => "❌",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestcaseState::Unknown => "unknown",
            TestcaseState::Passed => "passed",
            TestcaseState::Failed => "failed",
            TestcaseState::Skipped => "skipped",
            TestcaseState::Errored => "errored",
        }
    }

    /// Rank of a result element found below a testcase; the highest one wins
    pub(crate) fn result_rank(&self) -> u8 {
        match self {
            TestcaseState::Errored => 3,
            TestcaseState::Failed => 2,
            TestcaseState::Skipped => 1,
            TestcaseState::Passed | TestcaseState::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Testcase {
    pub name: String,
    pub classname: String,
    pub time: Option<Duration>,
    pub assertions: Option<u64>,
    pub state: TestcaseState,
    /// Message of the failure, error or skip element
    pub message: Option<String>,
}

impl Testcase {
    pub fn new(name: &str, classname: &str) -> Self {
        Self {
            name: name.to_string(),
            classname: classname.to_string(),
            time: None,
            assertions: None,
            state: TestcaseState::Unknown,
            message: None,
        }
    }
}

/// Per-status testcase counts of a subtree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestCounts {
    pub tests: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub errored: u64,
    pub assertions: u64,
}

impl TestCounts {
    fn record(&mut self, testcase: &Testcase) {
        self.tests += 1;
        match testcase.state {
            TestcaseState::Passed => self.passed += 1,
            TestcaseState::Failed => self.failed += 1,
            TestcaseState::Skipped => self.skipped += 1,
            TestcaseState::Errored => self.errored += 1,
            TestcaseState::Unknown => {}
        }
        self.assertions += testcase.assertions.unwrap_or(0);
    }

    /// Status of a subtree: Errored > Failed > Passed > Skipped > Unknown.
    ///
    /// Passed means every non-skipped testcase passed, which includes a subtree
    /// without testcases and one where every testcase was skipped.
    pub fn state(&self) -> TestcaseState {
        if self.errored > 0 {
            TestcaseState::Errored
        } else if self.failed > 0 {
            TestcaseState::Failed
        } else if self.passed + self.skipped == self.tests {
            TestcaseState::Passed
        } else if self.skipped == self.tests {
            TestcaseState::Skipped
        } else {
            TestcaseState::Unknown
        }
    }
}

impl AddAssign for TestCounts {
    fn add_assign(&mut self, other: Self) {
        self.tests += other.tests;
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.errored += other.errored;
        self.assertions += other.assertions;
    }
}

#[derive(Debug, Clone)]
pub struct Testsuite {
    pub name: String,
    /// Dotted path from the summary root, e.g. `tests.unit.Parser`
    pub qualified_name: String,
    testsuites: BTreeMap<String, Testsuite>,
    testcases: BTreeMap<String, Testcase>,
    counts: TestCounts,
    time: Duration,
    state: TestcaseState,
}

impl Testsuite {
    fn new(name: &str, qualified_name: String) -> Self {
        Self {
            name: name.to_string(),
            qualified_name,
            testsuites: BTreeMap::new(),
            testcases: BTreeMap::new(),
            counts: TestCounts::default(),
            time: Duration::ZERO,
            state: TestcaseState::Unknown,
        }
    }

    pub fn get_or_insert_testsuite(&mut self, name: &str) -> &mut Testsuite {
        let qualified_name = format!("{}.{}", self.qualified_name, name);
        self.testsuites.entry(name.to_string()).or_insert_with(|| {
            debug!(testsuite = %qualified_name, "Creating testsuite");
            Testsuite::new(name, qualified_name)
        })
    }

    /// Add a testcase, replacing one of the same name
    pub fn add_testcase(&mut self, testcase: Testcase) {
        if let Some(previous) = self.testcases.insert(testcase.name.clone(), testcase) {
            warn!(
                testsuite = %self.qualified_name,
                testcase = %previous.name,
                "Duplicate testcase replaced"
            );
        }
    }

    pub fn testsuite(&self, name: &str) -> Option<&Testsuite> {
        self.testsuites.get(name)
    }

    pub fn testcase(&self, name: &str) -> Option<&Testcase> {
        self.testcases.get(name)
    }

    pub fn testsuites(&self) -> impl Iterator<Item = &Testsuite> {
        self.testsuites.values()
    }

    pub fn testcases(&self) -> impl Iterator<Item = &Testcase> {
        self.testcases.values()
    }

    /// Recompute counts, runtime and status from the subtree, children first
    pub fn aggregate(&mut self) {
        let (mut counts, mut time) = aggregate_testsuites(&mut self.testsuites);

        for testcase in self.testcases.values() {
            counts.record(testcase);
            time += testcase.time.unwrap_or_default();
        }

        self.counts = counts;
        self.time = time;
        self.state = counts.state();
    }

    pub fn counts(&self) -> TestCounts {
        self.counts
    }

    pub fn tests(&self) -> u64 {
        self.counts.tests
    }

    pub fn passed(&self) -> u64 {
        self.counts.passed
    }

    pub fn failed(&self) -> u64 {
        self.counts.failed
    }

    pub fn skipped(&self) -> u64 {
        self.counts.skipped
    }

    pub fn errored(&self) -> u64 {
        self.counts.errored
    }

    pub fn time(&self) -> Duration {
        self.time
    }

    pub fn state(&self) -> TestcaseState {
        self.state
    }
}

fn aggregate_testsuites(testsuites: &mut BTreeMap<String, Testsuite>) -> (TestCounts, Duration) {
    let mut counts = TestCounts::default();
    let mut time = Duration::ZERO;

    for testsuite in testsuites.values_mut() {
        testsuite.aggregate();
        counts += testsuite.counts;
        time += testsuite.time;
    }

    (counts, time)
}

/// Root of a testsuite tree
#[derive(Debug, Clone)]
pub struct TestsuiteSummary {
    pub name: String,
    /// Runtime reported on the root element
    pub reported_time: Option<Duration>,
    pub timestamp: Option<NaiveDateTime>,
    testsuites: BTreeMap<String, Testsuite>,
    counts: TestCounts,
    time: Duration,
    state: TestcaseState,
}

impl TestsuiteSummary {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reported_time: None,
            timestamp: None,
            testsuites: BTreeMap::new(),
            counts: TestCounts::default(),
            time: Duration::ZERO,
            state: TestcaseState::Unknown,
        }
    }

    pub fn get_or_insert_testsuite(&mut self, name: &str) -> &mut Testsuite {
        self.testsuites.entry(name.to_string()).or_insert_with(|| {
            debug!(testsuite = %name, "Creating testsuite");
            Testsuite::new(name, name.to_string())
        })
    }

    /// Walk or create the testsuites along `path`. Returns `None` for an empty path.
    pub fn testsuite_path_mut(&mut self, path: &[&str]) -> Option<&mut Testsuite> {
        let (first, rest) = path.split_first()?;

        let mut current = self.get_or_insert_testsuite(first);
        for segment in rest {
            current = current.get_or_insert_testsuite(segment);
        }

        Some(current)
    }

    pub fn testsuite(&self, name: &str) -> Option<&Testsuite> {
        self.testsuites.get(name)
    }

    pub fn testsuites(&self) -> impl Iterator<Item = &Testsuite> {
        self.testsuites.values()
    }

    /// Aggregate the whole tree. Safe to call repeatedly.
    pub fn aggregate(&mut self) {
        let (counts, time) = aggregate_testsuites(&mut self.testsuites);

        self.counts = counts;
        self.time = time;
        self.state = counts.state();
    }

    pub fn counts(&self) -> TestCounts {
        self.counts
    }

    pub fn tests(&self) -> u64 {
        self.counts.tests
    }

    pub fn passed(&self) -> u64 {
        self.counts.passed
    }

    pub fn failed(&self) -> u64 {
        self.counts.failed
    }

    pub fn skipped(&self) -> u64 {
        self.counts.skipped
    }

    pub fn errored(&self) -> u64 {
        self.counts.errored
    }

    /// Reported runtime if present, otherwise the sum over all testcases
    pub fn time(&self) -> Duration {
        self.reported_time.unwrap_or(self.time)
    }

    pub fn state(&self) -> TestcaseState {
        self.state
    }
}
