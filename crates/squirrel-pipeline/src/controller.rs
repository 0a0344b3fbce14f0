//! File-backed pipeline controller.
//!
//! Every mutation is load-modify-store under a per-log lock, so two
//! handles on the same file cannot interleave their writes. Reads replay
//! against whatever bytes they loaded.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use squirrel_script::TableLoader;

use crate::cache::fingerprint;
use crate::error::{PipelineError, Result};
use crate::log::Log;
use crate::replay::{ReplayOptions, ReplayReport, replay};

/// One lock per canonicalized log path, shared by every controller handle
/// in the process. The registry holds weak references only, so entries for
/// dropped controllers are pruned instead of accumulating.
static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Weak<Mutex<()>>>>> = OnceLock::new();

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let registry = LOCKS.get_or_init(Mutex::default);
    let mut map = registry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    map.retain(|_, weak| weak.strong_count() > 0);
    match map.get(path).and_then(Weak::upgrade) {
        Some(lock) => lock,
        None => {
            let lock = Arc::new(Mutex::new(()));
            map.insert(path.to_path_buf(), Arc::downgrade(&lock));
            lock
        }
    }
}

/// Ordered entry summary for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    pub id: usize,
    pub label: String,
    pub text: String,
}

pub struct Controller {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl Controller {
    /// Open an existing log file.
    pub fn open(path: &Path) -> Result<Self> {
        let path = path.canonicalize()?;
        let lock = lock_for(&path);
        Ok(Self { path, lock })
    }

    /// Create a boilerplate log at `path` (which must not exist yet) and
    /// open it.
    pub fn init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Log::boilerplate())?;
        tracing::info!(path = %path.display(), "initialized pipeline log");
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Log> {
        let source = fs::read_to_string(&self.path)?;
        Log::parse(&source)
    }

    fn store(&self, log: &Log) -> Result<()> {
        fs::write(&self.path, log.serialize())?;
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut Log) -> Result<()>) -> Result<()> {
        let lock = Arc::clone(&self.lock);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut log = self.load()?;
        f(&mut log)?;
        self.store(&log)
    }

    /// Append a snippet as the last entry, right before the anchor.
    pub fn add(&self, snippet: &str) -> Result<()> {
        self.mutate(|log| {
            log.add_entry(snippet);
            Ok(())
        })
    }

    pub fn delete(&self, id: usize) -> Result<()> {
        self.mutate(|log| log.delete_entry(id))
    }

    pub fn reorder(&self, order: &[usize]) -> Result<()> {
        self.mutate(|log| log.reorder(order))
    }

    pub fn edit(&self, id: usize, new_text: &str) -> Result<()> {
        self.mutate(|log| log.edit_entry(id, new_text))
    }

    pub fn entries(&self) -> Result<Vec<EntrySummary>> {
        let log = self.load()?;
        Ok(log
            .entries()
            .map(|(id, entry)| EntrySummary {
                id,
                label: entry.label().to_string(),
                text: entry.text(),
            })
            .collect())
    }

    /// Fingerprint of the current log bytes, the cache key for replays.
    pub fn fingerprint(&self) -> Result<String> {
        Ok(fingerprint(&fs::read(&self.path)?))
    }

    pub fn replay(
        &self,
        options: ReplayOptions,
        loader: Option<&dyn TableLoader>,
    ) -> Result<ReplayReport> {
        let log = self.load()?;
        Ok(replay(&log, options, loader))
    }
}

/// Decode the wire encoding of a reorder request: comma-separated tokens
/// whose numeric prefix (up to the first `-`) is the old entry id.
pub fn parse_reorder_request(raw: &str) -> Result<Vec<usize>> {
    raw.split(',')
        .map(|token| {
            let token = token.trim();
            let prefix = token.split('-').next().unwrap_or("");
            prefix
                .parse::<usize>()
                .map_err(|_| PipelineError::BadReorderToken(token.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use squirrel_actions::{Catalog, Params};

    fn scratch_log() -> (tempfile::TempDir, Controller) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.sq");
        let controller = Controller::init(&path).unwrap();
        (dir, controller)
    }

    fn add_action(controller: &Controller, kind: &str, pairs: &[(&str, &str)]) {
        let params: Params = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let snippet = Catalog::builtin()
            .instantiate(kind, params)
            .unwrap()
            .snippet()
            .unwrap();
        controller.add(&snippet).unwrap();
    }

    #[test]
    fn test_init_refuses_existing_file() {
        let (_dir, controller) = scratch_log();
        assert!(Controller::init(controller.path()).is_err());
    }

    #[test]
    fn test_add_list_delete() {
        let (_dir, controller) = scratch_log();
        add_action(
            &controller,
            "AddColumn",
            &[("table_name", "t"), ("col_name", "x"), ("col_value", "1")],
        );
        add_action(
            &controller,
            "AddColumn",
            &[("table_name", "t"), ("col_name", "y"), ("col_value", "2")],
        );
        let entries = controller.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "Add column x on table t");

        controller.delete(0).unwrap();
        let entries = controller.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "Add column y on table t");

        assert!(matches!(
            controller.delete(7),
            Err(PipelineError::EntryNotFound(7))
        ));
    }

    #[test]
    fn test_reorder_failure_leaves_file_unchanged() {
        let (_dir, controller) = scratch_log();
        add_action(
            &controller,
            "AddColumn",
            &[("table_name", "t"), ("col_name", "x"), ("col_value", "1")],
        );
        let before = fs::read_to_string(controller.path()).unwrap();
        assert!(controller.reorder(&[0, 1]).is_err());
        assert_eq!(fs::read_to_string(controller.path()).unwrap(), before);
    }

    #[test]
    fn test_mutation_changes_fingerprint() {
        let (_dir, controller) = scratch_log();
        let before = controller.fingerprint().unwrap();
        add_action(
            &controller,
            "AddColumn",
            &[("table_name", "t"), ("col_name", "x"), ("col_value", "1")],
        );
        assert_ne!(controller.fingerprint().unwrap(), before);
    }

    #[test]
    fn test_parse_reorder_request() {
        assert_eq!(
            parse_reorder_request("3-anything,0-x,1-y,2-z").unwrap(),
            vec![3, 0, 1, 2]
        );
        assert_eq!(parse_reorder_request("1,0").unwrap(), vec![1, 0]);
        assert!(matches!(
            parse_reorder_request("a-1"),
            Err(PipelineError::BadReorderToken(_))
        ));
    }

    #[test]
    fn test_lock_registry_holds_no_strong_references() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.sq");
        let first = lock_for(&path);
        // Only this handle keeps the lock alive; the registry entry is weak.
        assert_eq!(Arc::strong_count(&first), 1);
        let second = lock_for(&path);
        assert!(Arc::ptr_eq(&first, &second));
        drop(first);
        drop(second);
        let revived = lock_for(&path);
        assert_eq!(Arc::strong_count(&revived), 1);
    }

    #[test]
    fn test_concurrent_adds_do_not_interleave() {
        let (_dir, controller) = scratch_log();
        let path = controller.path().to_path_buf();
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let handle = Controller::open(&path).unwrap();
                    handle
                        .add(&format!(
                            "tables['t{i}'] = from_rows([])  #sq_action:create t{i}"
                        ))
                        .unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(controller.entries().unwrap().len(), 8);
    }
}
