//! Replaying a log against a fresh table environment.

use std::time::Instant;

use serde::Serialize;
use squirrel_model::TableEnv;
use squirrel_script::{Context, TableLoader, execute};

use crate::log::Log;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayMode {
    /// Record a failing entry, skip its effect, keep going.
    #[default]
    Lenient,
    /// Stop at the first failing entry.
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    pub mode: ReplayMode,
    /// Absolute cutoff for the whole replay.
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum EntryStatus {
    Applied,
    Failed(String),
    /// Not attempted (strict mode after a failure).
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryOutcome {
    pub id: usize,
    pub label: String,
    #[serde(flatten)]
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub tables: TableEnv,
    pub outcomes: Vec<EntryOutcome>,
}

impl ReplayReport {
    pub fn failed(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, EntryStatus::Failed(_)))
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == EntryStatus::Applied)
    }

    /// True when the log had entries and not one of them applied.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty()
            && self
                .outcomes
                .iter()
                .all(|o| !matches!(o.status, EntryStatus::Applied))
    }
}

/// Fold the log's entries over a fresh environment. A failing entry leaves
/// the environment exactly as it was before that entry.
pub fn replay(log: &Log, options: ReplayOptions, loader: Option<&dyn TableLoader>) -> ReplayReport {
    let mut env = TableEnv::new();
    let mut outcomes = Vec::with_capacity(log.entry_count());
    let mut halted = false;

    for (id, entry) in log.entries() {
        let label = entry.label().to_string();
        if halted {
            outcomes.push(EntryOutcome {
                id,
                label,
                status: EntryStatus::Skipped,
            });
            continue;
        }
        let snapshot = env.clone();
        let mut ctx = Context::new(&mut env);
        if let Some(loader) = loader {
            ctx = ctx.with_loader(loader);
        }
        if let Some(deadline) = options.deadline {
            ctx = ctx.with_deadline(deadline);
        }
        match execute(&entry.text(), &mut ctx) {
            Ok(()) => {
                tracing::debug!(id, label = %label, "entry applied");
                outcomes.push(EntryOutcome {
                    id,
                    label,
                    status: EntryStatus::Applied,
                });
            }
            Err(err) => {
                tracing::warn!(id, label = %label, error = %err, "entry failed");
                env = snapshot;
                if options.mode == ReplayMode::Strict {
                    halted = true;
                }
                outcomes.push(EntryOutcome {
                    id,
                    label,
                    status: EntryStatus::Failed(err.to_string()),
                });
            }
        }
    }

    ReplayReport {
        tables: env,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squirrel_model::Scalar;

    fn log_with(entries: &[&str]) -> Log {
        let mut source = String::from("# Squirrel Pipeline start\n");
        for entry in entries {
            source.push_str(entry);
            source.push('\n');
        }
        source.push_str("# Add new code here (keep this comment line)\n# Squirrel Pipeline end\n");
        Log::parse(&source).unwrap()
    }

    #[test]
    fn test_lenient_skips_failures_and_continues() {
        let log = log_with(&[
            "tables['t'] = tables['missing'].drop(columns=['x'])  #sq_action:Delete column x on table t",
            "tables['t'] = from_rows([{'a': 1}])  #sq_action:Create table t",
        ]);
        let report = replay(&log, ReplayOptions::default(), None);
        assert!(matches!(report.outcomes[0].status, EntryStatus::Failed(_)));
        assert_eq!(report.outcomes[1].status, EntryStatus::Applied);
        assert!(report.tables.contains_key("t"));
        assert!(!report.all_failed());
    }

    #[test]
    fn test_strict_stops_at_first_failure() {
        let log = log_with(&[
            "tables['t'] = tables['missing']  #sq_action:alias",
            "tables['u'] = from_rows([{'a': 1}])  #sq_action:create u",
        ]);
        let options = ReplayOptions {
            mode: ReplayMode::Strict,
            deadline: None,
        };
        let report = replay(&log, options, None);
        assert!(matches!(report.outcomes[0].status, EntryStatus::Failed(_)));
        assert_eq!(report.outcomes[1].status, EntryStatus::Skipped);
        assert!(report.tables.is_empty());
        assert!(report.all_failed());
    }

    #[test]
    fn test_failed_entry_leaves_no_partial_effect() {
        // The first statement of the entry succeeds, the second fails; the
        // whole entry must roll back.
        let log = log_with(&[
            "tables['t'] = from_rows([{'a': 1}])  #sq_action:create t",
            "tables['u'] = tables['t']\ntables['u'] = tables['nope']  #sq_action:Custom action 'partial'",
        ]);
        let report = replay(&log, ReplayOptions::default(), None);
        assert!(matches!(report.outcomes[1].status, EntryStatus::Failed(_)));
        assert!(!report.tables.contains_key("u"));
    }

    #[test]
    fn test_arithmetic_overflow_is_a_failed_outcome_not_a_panic() {
        let create = format!(
            "tables['t'] = from_rows([{{'x': {}}}])  #sq_action:create t",
            i64::MAX
        );
        let log = log_with(&[
            create.as_str(),
            "tables['t']['y'] = tables['t']['x'] + 1  #sq_action:Add column y on table t",
            "tables['t']['z'] = 0  #sq_action:Add column z on table t",
        ]);
        let report = replay(&log, ReplayOptions::default(), None);
        assert_eq!(report.outcomes[0].status, EntryStatus::Applied);
        assert!(matches!(report.outcomes[1].status, EntryStatus::Failed(_)));
        assert_eq!(report.outcomes[2].status, EntryStatus::Applied);
        assert!(!report.tables["t"].has_column("y"));
        assert!(report.tables["t"].has_column("z"));
    }

    #[test]
    fn test_replay_is_idempotent() {
        let log = log_with(&[
            "tables['t'] = from_rows([{'a': 1}, {'a': 2}])  #sq_action:create t",
            "tables['t']['b'] = tables['t']['a'] * 10  #sq_action:Add column b on table t",
        ]);
        let first = replay(&log, ReplayOptions::default(), None);
        let second = replay(&log, ReplayOptions::default(), None);
        assert_eq!(first.tables, second.tables);
        assert_eq!(
            first.tables["t"].column("b").unwrap().values,
            vec![Scalar::Int(10), Scalar::Int(20)]
        );
    }

    #[test]
    fn test_empty_log_is_clean_not_all_failed() {
        let log = log_with(&[]);
        let report = replay(&log, ReplayOptions::default(), None);
        assert!(report.is_clean());
        assert!(!report.all_failed());
    }
}
