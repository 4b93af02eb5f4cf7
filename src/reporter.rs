//! # Reporting
//!
//! The engine reports through [`Reporter`] callbacks. [`CollectingReporter`]
//! turns the callbacks of one spec-file run into a [`TestResults`] tree: one
//! [`AssertionResult`] per spec, pass/fail/pending counts, run timing, and a
//! colored failure summary for terminal output.
//!
//! The reporter also owns the [`Formatter`] used by every matcher of the run,
//! so diagnostics and summaries print values the same way.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use termcolor::{Buffer, Color, ColorSpec, WriteColor};
use tracing::warn;

use crate::capture::ExpectationResult;
use crate::config::RunConfig;
use crate::errors::{AdapterError, Result};
use crate::pretty::{Formatter, PrettyPrinter};

// ============================================================================
// ENGINE-SIDE RESULTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecStatus {
    Passed,
    Failed,
    Pending,
    Disabled,
}

impl fmt::Display for SpecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpecStatus::Passed => "passed",
            SpecStatus::Failed => "failed",
            SpecStatus::Pending => "pending",
            SpecStatus::Disabled => "disabled",
        };
        f.write_str(label)
    }
}

/// What the engine knows about one spec when it finishes.
#[derive(Debug, Clone)]
pub struct SpecResult {
    pub id: String,
    pub description: String,
    pub full_name: String,
    pub ancestor_titles: Vec<String>,
    pub status: SpecStatus,
    pub failed_expectations: Vec<ExpectationResult>,
    pub passed_expectations: Vec<ExpectationResult>,
}

impl SpecResult {
    pub fn new(id: impl Into<String>, description: impl Into<String>, ancestor_titles: Vec<String>) -> Self {
        let description = description.into();
        let full_name = ancestor_titles
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(description.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            id: id.into(),
            description,
            full_name,
            ancestor_titles,
            status: SpecStatus::Pending,
            failed_expectations: Vec::new(),
            passed_expectations: Vec::new(),
        }
    }
}

pub trait Reporter {
    fn run_started(&self, _total_specs: usize) {}

    fn spec_started(&self, _spec: &SpecResult) {}

    fn spec_done(&self, _spec: &SpecResult) {}

    fn run_done(&self) {}

    /// Pretty-printer shared by every matcher message of the run.
    fn formatter(&self) -> Rc<dyn Formatter>;
}

// ============================================================================
// HOST-SIDE RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    pub title: String,
    pub full_name: String,
    pub ancestor_titles: Vec<String>,
    pub status: SpecStatus,
    pub failure_messages: Vec<String>,
    pub num_passing_asserts: usize,
}

impl AssertionResult {
    fn from_spec(spec: &SpecResult) -> Self {
        Self {
            title: spec.description.clone(),
            full_name: spec.full_name.clone(),
            ancestor_titles: spec.ancestor_titles.clone(),
            status: spec.status,
            failure_messages: spec
                .failed_expectations
                .iter()
                .map(|failure| failure.message.clone())
                .collect(),
            num_passing_asserts: spec.passed_expectations.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfStats {
    /// Milliseconds since the Unix epoch.
    pub start: u128,
    pub end: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub test_file_path: PathBuf,
    pub num_passing_tests: usize,
    pub num_failing_tests: usize,
    pub num_pending_tests: usize,
    pub test_results: Vec<AssertionResult>,
    pub failure_message: Option<String>,
    pub perf_stats: PerfStats,
}

impl TestResults {
    pub fn has_failures(&self) -> bool {
        self.num_failing_tests > 0
    }

    pub fn total_tests(&self) -> usize {
        self.num_passing_tests + self.num_failing_tests + self.num_pending_tests
    }
}

// ============================================================================
// COLLECTING REPORTER
// ============================================================================

#[derive(Debug, Default)]
struct Collected {
    specs: Vec<AssertionResult>,
    started: Option<u128>,
    finished: Option<u128>,
}

pub struct CollectingReporter {
    test_path: PathBuf,
    use_colors: bool,
    formatter: Rc<dyn Formatter>,
    collected: RefCell<Collected>,
}

impl fmt::Debug for CollectingReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectingReporter")
            .field("test_path", &self.test_path)
            .field("collected", &self.collected)
            .finish_non_exhaustive()
    }
}

impl CollectingReporter {
    pub fn new(test_path: &Path, config: &RunConfig) -> Self {
        Self::with_formatter(test_path, config, Rc::new(PrettyPrinter::default()))
    }

    pub fn with_formatter(test_path: &Path, config: &RunConfig, formatter: Rc<dyn Formatter>) -> Self {
        Self {
            test_path: test_path.to_path_buf(),
            use_colors: config.use_colors,
            formatter,
            collected: RefCell::new(Collected::default()),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.collected.borrow().finished.is_some()
    }

    /// The result tree of the run. Fails if the engine never signalled the end
    /// of the run.
    pub fn results(&self) -> Result<TestResults> {
        let collected = self.collected.borrow();
        let Some(end) = collected.finished else {
            return Err(AdapterError::Reporter {
                message: format!("run of '{}' never completed", self.test_path.display()),
            });
        };

        let count = |status: SpecStatus| {
            collected
                .specs
                .iter()
                .filter(|spec| spec.status == status)
                .count()
        };
        let num_failing_tests = count(SpecStatus::Failed);
        let results = TestResults {
            test_file_path: self.test_path.clone(),
            num_passing_tests: count(SpecStatus::Passed),
            num_failing_tests,
            num_pending_tests: count(SpecStatus::Pending) + count(SpecStatus::Disabled),
            test_results: collected.specs.clone(),
            failure_message: (num_failing_tests > 0).then(|| self.failure_summary(&collected.specs)),
            perf_stats: PerfStats {
                start: collected.started.unwrap_or(end),
                end,
            },
        };
        if results.has_failures() {
            warn!(
                test_path = %self.test_path.display(),
                failing = results.num_failing_tests,
                "spec file finished with failures"
            );
        }
        Ok(results)
    }

    fn failure_summary(&self, specs: &[AssertionResult]) -> String {
        let mut buffer = if self.use_colors {
            Buffer::ansi()
        } else {
            Buffer::no_color()
        };
        for spec in specs.iter().filter(|spec| spec.status == SpecStatus::Failed) {
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
            let _ = write!(buffer, "  \u{25cf} {}", spec.full_name);
            let _ = buffer.reset();
            let _ = writeln!(buffer);
            for message in &spec.failure_messages {
                let _ = writeln!(buffer);
                for line in message.lines() {
                    let _ = writeln!(buffer, "    {line}");
                }
            }
            let _ = writeln!(buffer);
        }
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }
}

impl Reporter for CollectingReporter {
    fn run_started(&self, _total_specs: usize) {
        self.collected.borrow_mut().started = Some(now_millis());
    }

    fn spec_done(&self, spec: &SpecResult) {
        self.collected
            .borrow_mut()
            .specs
            .push(AssertionResult::from_spec(spec));
    }

    fn run_done(&self) {
        self.collected.borrow_mut().finished = Some(now_millis());
    }

    fn formatter(&self) -> Rc<dyn Formatter> {
        Rc::clone(&self.formatter)
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
