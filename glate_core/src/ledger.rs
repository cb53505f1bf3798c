//! Per-user dose ledger.
//!
//! The ledger is the only mutable state shared between the request path
//! (append on ingest, read on status) and the background monitor (snapshot on
//! scan). One `RwLock` guards the whole map; every read hands back a copy.

use crate::ActiveDose;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Ordered record of the doses each user has reported
pub trait DoseLedger: Send + Sync {
    /// Append a dose to the user's stack
    fn append(&self, user_id: &str, dose: ActiveDose);

    /// Copy of the user's stack (empty for unknown users)
    fn get(&self, user_id: &str) -> Vec<ActiveDose>;

    /// Copy of every user's stack
    fn snapshot(&self) -> HashMap<String, Vec<ActiveDose>>;

    /// Drop the user's stack (e.g. for a new day)
    fn clear(&self, user_id: &str);
}

/// Process-local ledger
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    stacks: RwLock<HashMap<String, Vec<ActiveDose>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

// Mutations are single push/remove calls, so a poisoned map is still consistent.
impl DoseLedger for InMemoryLedger {
    fn append(&self, user_id: &str, dose: ActiveDose) {
        let mut stacks = self.stacks.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            "Ledger append for {}: {} {}mg",
            user_id,
            dose.substance_id,
            dose.amount_mg
        );
        stacks.entry(user_id.to_string()).or_default().push(dose);
    }

    fn get(&self, user_id: &str) -> Vec<ActiveDose> {
        let stacks = self.stacks.read().unwrap_or_else(PoisonError::into_inner);
        stacks.get(user_id).cloned().unwrap_or_default()
    }

    fn snapshot(&self) -> HashMap<String, Vec<ActiveDose>> {
        self.stacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self, user_id: &str) {
        let mut stacks = self.stacks.write().unwrap_or_else(PoisonError::into_inner);
        if stacks.remove(user_id).is_some() {
            tracing::debug!("Cleared ledger for {}", user_id);
        }
    }
}
