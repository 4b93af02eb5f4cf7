//! End-of-run aggregation of reporter results and snapshot bookkeeping.

use serde::Serialize;
use tracing::debug;

use crate::errors::Result;
use crate::reporter::TestResults;
use crate::snapshot::SnapshotState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub file_deleted: bool,
    pub added: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub updated: usize,
}

/// Everything the host runner learns about one spec file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    #[serde(flatten)]
    pub results: TestResults,
    pub has_unchecked_keys: bool,
    pub snapshot: SnapshotSummary,
}

impl RunResult {
    pub fn has_failures(&self) -> bool {
        self.results.has_failures() || self.snapshot.unmatched > 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Finalizes the snapshot state and attaches its counters to `results`.
///
/// Unchecked keys are read before anything is removed; the flag survives only
/// if the snapshot file was not deleted.
pub fn aggregate(results: TestResults, state: &mut dyn SnapshotState, update: bool) -> Result<RunResult> {
    let had_unchecked = state.has_unchecked_keys();
    if update {
        state.remove_unchecked_keys();
    }
    let status = state.save(update)?;
    let counts = state.counts();
    debug!(?status, ?counts, had_unchecked, "snapshot state finalized");

    Ok(RunResult {
        results,
        has_unchecked_keys: !status.deleted && had_unchecked,
        snapshot: SnapshotSummary {
            file_deleted: status.deleted,
            added: counts.added,
            matched: counts.matched,
            unmatched: counts.unmatched,
            updated: counts.updated,
        },
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::errors::AdapterError;
    use crate::reporter::PerfStats;
    use crate::snapshot::{SaveStatus, SnapshotCounts, SnapshotMatch};

    #[derive(Default)]
    struct FakeState {
        unchecked: bool,
        removed: bool,
        delete_on_save: bool,
        fail_save: bool,
        counts: SnapshotCounts,
    }

    impl SnapshotState for FakeState {
        fn match_snapshot(&mut self, test_name: &str, received: &str) -> SnapshotMatch {
            SnapshotMatch {
                pass: true,
                key: format!("{test_name} 1"),
                expected: None,
                actual: received.to_string(),
            }
        }

        fn has_unchecked_keys(&self) -> bool {
            self.unchecked
        }

        fn remove_unchecked_keys(&mut self) {
            self.unchecked = false;
            self.removed = true;
        }

        fn save(&mut self, _update: bool) -> Result<SaveStatus> {
            if self.fail_save {
                return Err(AdapterError::Snapshot {
                    path: PathBuf::from("a.snap"),
                    source: std::io::Error::other("disk full"),
                });
            }
            Ok(SaveStatus {
                deleted: self.delete_on_save,
                saved: !self.delete_on_save,
            })
        }

        fn counts(&self) -> SnapshotCounts {
            self.counts
        }
    }

    fn results() -> TestResults {
        TestResults {
            test_file_path: PathBuf::from("a.test.js"),
            num_passing_tests: 1,
            num_failing_tests: 0,
            num_pending_tests: 0,
            test_results: Vec::new(),
            failure_message: None,
            perf_stats: PerfStats::default(),
        }
    }

    #[test]
    fn counters_are_copied() {
        let mut state = FakeState {
            counts: SnapshotCounts {
                added: 1,
                matched: 2,
                unmatched: 3,
                updated: 4,
            },
            ..FakeState::default()
        };
        let run = aggregate(results(), &mut state, false).unwrap();
        assert_eq!(
            run.snapshot,
            SnapshotSummary {
                file_deleted: false,
                added: 1,
                matched: 2,
                unmatched: 3,
                updated: 4,
            }
        );
        assert!(run.has_failures());
    }

    #[test]
    fn unchecked_flag_is_read_before_removal() {
        let mut state = FakeState {
            unchecked: true,
            ..FakeState::default()
        };
        let run = aggregate(results(), &mut state, true).unwrap();
        assert!(state.removed);
        assert!(run.has_unchecked_keys);
    }

    #[test]
    fn deletion_clears_unchecked_flag() {
        let mut state = FakeState {
            unchecked: true,
            delete_on_save: true,
            ..FakeState::default()
        };
        let run = aggregate(results(), &mut state, true).unwrap();
        assert!(run.snapshot.file_deleted);
        assert!(!run.has_unchecked_keys);
    }

    #[test]
    fn without_update_nothing_is_removed() {
        let mut state = FakeState {
            unchecked: true,
            ..FakeState::default()
        };
        let run = aggregate(results(), &mut state, false).unwrap();
        assert!(!state.removed);
        assert!(run.has_unchecked_keys);
    }

    #[test]
    fn save_errors_propagate() {
        let mut state = FakeState {
            fail_save: true,
            ..FakeState::default()
        };
        assert!(matches!(
            aggregate(results(), &mut state, false),
            Err(AdapterError::Snapshot { .. })
        ));
    }

    #[test]
    fn json_flattens_reporter_tree() {
        let run = aggregate(results(), &mut FakeState::default(), false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&run.to_json().unwrap()).unwrap();
        assert_eq!(json["numPassingTests"], 1);
        assert_eq!(json["hasUncheckedKeys"], false);
        assert_eq!(json["snapshot"]["fileDeleted"], false);
    }
}
