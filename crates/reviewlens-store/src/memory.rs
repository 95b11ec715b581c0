use std::sync::Mutex;

use reviewlens_core::{DecisionLogEntry, SystemState};

use crate::{StoreError, Substrate};

/// Volatile substrate. Contents are lost when it is dropped.
#[derive(Default)]
pub struct MemorySubstrate {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Option<SystemState>,
    log: Vec<DecisionLogEntry>,
}

impl MemorySubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state, as if it had been persisted earlier.
    pub fn with_state(state: SystemState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: Some(state),
                log: Vec::new(),
            }),
        }
    }
}

impl Substrate for MemorySubstrate {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load_state(&self) -> Result<Option<SystemState>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Lock)?;
        Ok(inner.state.clone())
    }

    fn commit(&self, state: &SystemState, entry: &DecisionLogEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Lock)?;
        inner.state = Some(state.clone());
        inner.log.push(entry.clone());
        Ok(())
    }

    fn log_entries(&self) -> Result<Vec<DecisionLogEntry>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Lock)?;
        Ok(inner.log.clone())
    }
}
