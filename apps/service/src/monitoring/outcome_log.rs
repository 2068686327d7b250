use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{Check, CheckOutcome, CheckState, LogEntry};
use crate::store::LogStore;

/// Appends one JSON line per probe to the probed check's own log
pub struct OutcomeLogger {
    log_store: Arc<dyn LogStore>,
}

impl OutcomeLogger {
    pub fn new(log_store: Arc<dyn LogStore>) -> Self {
        Self { log_store }
    }

    /// Record a probe. Failures are reported and swallowed; returns whether
    /// the entry reached the log store.
    pub async fn log(
        &self,
        check: &Check,
        outcome: &CheckOutcome,
        new_state: CheckState,
        alerted: bool,
        time_of_check: i64,
    ) -> bool {
        let entry = LogEntry {
            check: check.clone(),
            outcome: outcome.clone(),
            new_state,
            alerted,
            time_of_check,
        };

        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                warn!("Could not serialize log entry for check {}: {e}", check.id);
                return false;
            }
        };

        match self.log_store.append(&check.id, &line).await {
            Ok(()) => {
                debug!("Logged outcome for check {}", check.id);
                true
            }
            Err(e) => {
                warn!("Could not append to log of check {}: {e}", check.id);
                false
            }
        }
    }
}
