use std::sync::Mutex;

use chrono::Utc;
use reviewlens_core::{Decision, DecisionLogEntry, SystemState};
use tracing::info;

use crate::{StoreError, Substrate};

/// Aggregate decision state with a single writer.
///
/// [`record`](Self::record) holds the writer lock across load, merge and
/// commit, so concurrent decisions never lose an increment. The substrate's
/// own [`lock_writer`](Substrate::lock_writer) extends that to other handles
/// and processes on the same store.
pub struct StateStore {
    substrate: Box<dyn Substrate>,
    writer: Mutex<()>,
}

impl StateStore {
    pub fn new(substrate: impl Substrate + 'static) -> Self {
        Self::from_boxed(Box::new(substrate))
    }

    pub fn from_boxed(substrate: Box<dyn Substrate>) -> Self {
        Self {
            substrate,
            writer: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.substrate.name()
    }

    /// Current state, or all-zero defaults if nothing has been persisted.
    pub fn snapshot(&self) -> Result<SystemState, StoreError> {
        Ok(self.substrate.load_state()?.unwrap_or_default())
    }

    /// Fold `decision` into the persisted state and append it to the log.
    ///
    /// Returns the state exactly as persisted. On error nothing is written.
    pub fn record(&self, decision: &Decision) -> Result<SystemState, StoreError> {
        let _guard = self.writer.lock().map_err(|_| StoreError::Lock)?;
        let _shared = self.substrate.lock_writer()?;

        let mut state = self.snapshot()?;
        state.apply(decision);
        let now = Utc::now();
        state.stamp(now);

        let entry = DecisionLogEntry::new(decision, now);
        self.substrate.commit(&state, &entry)?;

        info!(
            backend = self.backend(),
            category = %decision.issue_category.category,
            count = state.issue_counts.get(decision.issue_category.category),
            escalated = state.escalation.has_been_escalated,
            level = %state.escalation.level,
            "committed decision"
        );
        Ok(state)
    }

    /// Every decision recorded so far, in call order.
    pub fn decision_log(&self) -> Result<Vec<DecisionLogEntry>, StoreError> {
        self.substrate.log_entries()
    }
}
