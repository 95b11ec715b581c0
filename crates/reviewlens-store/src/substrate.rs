use std::fs::File;

use reviewlens_core::{DecisionLogEntry, SystemState};

use crate::StoreError;

/// Writer lock shared by every handle on the same backing store.
///
/// Released on drop. Backends that are only ever opened by one handle
/// return the empty lock.
#[derive(Debug, Default)]
pub struct WriterLock {
    _file: Option<File>,
}

impl WriterLock {
    /// Hold a file on which an exclusive advisory lock has been taken.
    /// Closing the file releases the lock.
    pub(crate) fn file(file: File) -> Self {
        Self { _file: Some(file) }
    }
}

/// Durable backing for the aggregate state and the decision log.
///
/// [`commit`](Substrate::commit) writes the new state and appends the log
/// entry as one unit: after an error, neither change is visible.
pub trait Substrate: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Exclude other writers, including other processes, until the returned
    /// lock is dropped. Held from `load_state` through `commit`.
    fn lock_writer(&self) -> Result<WriterLock, StoreError> {
        Ok(WriterLock::default())
    }

    /// The persisted state, or `None` if nothing has been saved yet.
    fn load_state(&self) -> Result<Option<SystemState>, StoreError>;

    /// Overwrite the state and append `entry` to the log.
    fn commit(&self, state: &SystemState, entry: &DecisionLogEntry) -> Result<(), StoreError>;

    /// Every log entry, in commit order.
    fn log_entries(&self) -> Result<Vec<DecisionLogEntry>, StoreError>;
}
