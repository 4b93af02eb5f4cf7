//! # Snapshots
//!
//! A snapshot file stores the pretty-printed form of values asserted with
//! `toMatchSnapshot`, keyed by `"<spec full name> <n>"` where `n` counts the
//! snapshot assertions of that spec from 1.
//!
//! ## Lifecycle
//!
//! - **Load**: the file is read once per spec-file run; every stored key starts
//!   out *unchecked*.
//! - **Match**: each assertion checks its key. Missing keys are written
//!   (`added`), equal ones count as `matched`, different ones are `unmatched`,
//!   or `updated` when the run is in update mode.
//! - **Finalize**: after the run, keys never checked are obsolete. In update
//!   mode they are removed; [`SnapshotState::save`] then writes the file, or
//!   deletes it when nothing is left.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use difference::{Changeset, Difference};
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::errors::{AdapterError, Result};
use crate::matchers::{MatchOutcome, Matcher, MatcherContext};
use crate::pretty::Formatter;
use crate::value::Value;

pub const TO_MATCH_SNAPSHOT: &str = "toMatchSnapshot";

// ============================================================================
// STATE CONTRACT
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotCounts {
    pub added: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStatus {
    pub deleted: bool,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMatch {
    pub pass: bool,
    pub key: String,
    /// Stored text, absent when the key was new.
    pub expected: Option<String>,
    pub actual: String,
}

pub trait SnapshotState {
    fn match_snapshot(&mut self, test_name: &str, received: &str) -> SnapshotMatch;

    fn has_unchecked_keys(&self) -> bool;

    fn remove_unchecked_keys(&mut self);

    fn save(&mut self, update: bool) -> Result<SaveStatus>;

    fn counts(&self) -> SnapshotCounts;
}

// ============================================================================
// FILE-BACKED STATE
// ============================================================================

#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    update: bool,
    data: BTreeMap<String, String>,
    unchecked: BTreeSet<String>,
    assertions: HashMap<String, usize>,
    counts: SnapshotCounts,
    dirty: bool,
}

impl SnapshotFile {
    /// Loads `path`; a missing file is an empty snapshot set.
    pub fn open(path: impl Into<PathBuf>, update: bool) -> Result<Self> {
        let path = path.into();
        let data: BTreeMap<String, String> = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(AdapterError::Snapshot { path, source }),
        };
        debug!(path = %path.display(), stored = data.len(), "loaded snapshots");
        Ok(Self {
            unchecked: data.keys().cloned().collect(),
            path,
            update,
            data,
            assertions: HashMap::new(),
            counts: SnapshotCounts::default(),
            dirty: false,
        })
    }

    pub fn for_test(test_path: &Path, config: &RunConfig) -> Result<Self> {
        Self::open(config.snapshot_path(test_path), config.update_snapshot)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn write(&self) -> Result<()> {
        let io_error = |source| AdapterError::Snapshot {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_error)?;
        }
        let mut text = serde_json::to_string_pretty(&self.data)?;
        text.push('\n');
        fs::write(&self.path, text).map_err(io_error)
    }
}

impl SnapshotState for SnapshotFile {
    fn match_snapshot(&mut self, test_name: &str, received: &str) -> SnapshotMatch {
        let count = self.assertions.entry(test_name.to_string()).or_insert(0);
        *count += 1;
        let key = format!("{test_name} {count}");
        self.unchecked.remove(&key);

        let expected = self.data.get(&key).cloned();
        let pass = match &expected {
            None => {
                self.data.insert(key.clone(), received.to_string());
                self.dirty = true;
                self.counts.added += 1;
                true
            }
            Some(stored) if stored == received => {
                self.counts.matched += 1;
                true
            }
            Some(_) if self.update => {
                self.data.insert(key.clone(), received.to_string());
                self.dirty = true;
                self.counts.updated += 1;
                true
            }
            Some(_) => {
                self.counts.unmatched += 1;
                false
            }
        };
        SnapshotMatch {
            pass,
            key,
            expected,
            actual: received.to_string(),
        }
    }

    fn has_unchecked_keys(&self) -> bool {
        !self.unchecked.is_empty()
    }

    fn remove_unchecked_keys(&mut self) {
        for key in std::mem::take(&mut self.unchecked) {
            self.data.remove(&key);
            self.dirty = true;
        }
    }

    fn save(&mut self, update: bool) -> Result<SaveStatus> {
        let mut status = SaveStatus::default();
        if (self.dirty || self.has_unchecked_keys()) && !self.data.is_empty() {
            self.write()?;
            self.dirty = false;
            status.saved = true;
        } else if self.data.is_empty() && self.path.exists() && update {
            fs::remove_file(&self.path).map_err(|source| AdapterError::Snapshot {
                path: self.path.clone(),
                source,
            })?;
            warn!(path = %self.path.display(), "removed obsolete snapshot file");
            status.deleted = true;
        }
        Ok(status)
    }

    fn counts(&self) -> SnapshotCounts {
        self.counts
    }
}

// ============================================================================
// MATCHER
// ============================================================================

/// `toMatchSnapshot`, bound to the run's snapshot state.
pub struct SnapshotMatcher {
    state: Rc<RefCell<dyn SnapshotState>>,
    formatter: Rc<dyn Formatter>,
}

impl SnapshotMatcher {
    pub fn new(state: Rc<RefCell<dyn SnapshotState>>, formatter: Rc<dyn Formatter>) -> Self {
        Self { state, formatter }
    }
}

impl Matcher for SnapshotMatcher {
    fn compare(&self, actual: &Value, expected: &[Value], context: &MatcherContext<'_>) -> Result<MatchOutcome> {
        if !expected.is_empty() {
            return Err(AdapterError::usage(
                "toMatchSnapshot() does not accept parameters.",
            ));
        }
        let Some(spec_name) = context.spec_name else {
            return Err(AdapterError::usage(
                "toMatchSnapshot() can only be used inside a spec.",
            ));
        };

        let received = self.formatter.pretty_print(actual);
        let outcome = self.state.borrow_mut().match_snapshot(spec_name, &received);
        let SnapshotMatch {
            pass,
            key,
            expected,
            actual,
        } = outcome;

        Ok(if pass {
            MatchOutcome::new(true, move || {
                format!("Expected value not to match snapshot {key}.")
            })
        } else {
            MatchOutcome::new(false, move || {
                format!(
                    "Received value does not match stored snapshot {key}.\n\n{}",
                    line_diff(expected.as_deref().unwrap_or_default(), &actual)
                )
            })
        })
    }
}

/// `- ` stored, `+ ` received, `  ` shared lines.
pub fn line_diff(stored: &str, received: &str) -> String {
    let changeset = Changeset::new(stored, received, "\n");
    let mut lines = Vec::new();
    for diff in &changeset.diffs {
        let (prefix, chunk) = match diff {
            Difference::Same(chunk) => ("  ", chunk),
            Difference::Rem(chunk) => ("- ", chunk),
            Difference::Add(chunk) => ("+ ", chunk),
        };
        lines.extend(chunk.split('\n').map(|line| format!("{prefix}{line}")));
    }
    lines.join("\n")
}
