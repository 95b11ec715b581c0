//! File-backed substrate: a pretty-printed JSON state file and a JSON-lines log.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use reviewlens_core::{DecisionLogEntry, SystemState};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{StoreError, Substrate, WriterLock};

const STATE_FILE: &str = "system_state.json";
const LOG_FILE: &str = "decision_log.jsonl";
const LOCK_FILE: &str = ".lock";

/// Persists state to `<dir>/system_state.json` and the decision log to
/// `<dir>/decision_log.jsonl`.
///
/// A commit writes the new state to a uniquely named temporary file, appends
/// the log line, then renames the temporary file over the old state. If the
/// rename fails the log is truncated back to its previous length.
///
/// Writers on the same directory, in this process or another, serialise on
/// an exclusive advisory lock of `<dir>/.lock`. Log readers take it shared.
pub struct FileSubstrate {
    dir: PathBuf,
}

impl FileSubstrate {
    /// Use `dir` for both files, creating it if needed.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        info!(dir = %dir.display(), "opened file substrate");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    fn open_lock_file(&self) -> Result<File, StoreError> {
        let path = self.lock_path();
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))
    }

    fn write_tmp_state(&self, state: &SystemState) -> Result<NamedTempFile, StoreError> {
        let body = serde_json::to_vec_pretty(state)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        tmp.write_all(&body)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        Ok(tmp)
    }

    /// Append one line to the log. Returns the log length before the append.
    fn append_log(&self, entry: &DecisionLogEntry) -> Result<u64, StoreError> {
        let path = self.log_path();
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        let prior_len = file.metadata().map_err(|e| StoreError::io(&path, e))?.len();

        let written = file
            .write_all(&line)
            .and_then(|()| file.sync_all());
        if let Err(e) = written {
            self.truncate_log(prior_len);
            return Err(StoreError::io(&path, e));
        }
        Ok(prior_len)
    }

    fn truncate_log(&self, len: u64) {
        let path = self.log_path();
        let result = OpenOptions::new()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_len(len));
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "failed to roll back decision log");
        }
    }
}

impl Substrate for FileSubstrate {
    fn name(&self) -> &'static str {
        "file"
    }

    fn lock_writer(&self) -> Result<WriterLock, StoreError> {
        let file = self.open_lock_file()?;
        FileExt::lock_exclusive(&file).map_err(|e| StoreError::io(self.lock_path(), e))?;
        debug!(dir = %self.dir.display(), "took writer lock");
        Ok(WriterLock::file(file))
    }

    fn load_state(&self) -> Result<Option<SystemState>, StoreError> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Callers must hold [`lock_writer`](Substrate::lock_writer), otherwise
    /// a rollback could truncate another writer's log line.
    fn commit(&self, state: &SystemState, entry: &DecisionLogEntry) -> Result<(), StoreError> {
        // Dropping `tmp` on any early return deletes it.
        let tmp = self.write_tmp_state(state)?;
        let prior_len = self.append_log(entry)?;

        let path = self.state_path();
        if let Err(e) = tmp.persist(&path) {
            self.truncate_log(prior_len);
            return Err(StoreError::io(&path, e.error));
        }
        Ok(())
    }

    fn log_entries(&self) -> Result<Vec<DecisionLogEntry>, StoreError> {
        let path = self.log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let lock = self.open_lock_file()?;
        FileExt::lock_shared(&lock).map_err(|e| StoreError::io(self.lock_path(), e))?;
        let raw = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        drop(lock);
        raw.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StoreError::from))
            .collect()
    }
}
