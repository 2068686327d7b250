use super::types::{Check, CheckOutcome, CheckState};

/// Result of folding one probe outcome into a check
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The check as it should be committed to the data store
    pub check: Check,
    pub state: CheckState,
    pub alert_warranted: bool,
    /// Unix timestamp in milliseconds, also written to `lastChecked`
    pub checked_at: i64,
}

/// `up` only for an error-free outcome whose code is one of the check's
/// success codes.
pub fn derive_state(check: &Check, outcome: &CheckOutcome) -> CheckState {
    match (&outcome.error, outcome.response_code) {
        (None, Some(code)) if check.accepts(code) => CheckState::Up,
        _ => CheckState::Down,
    }
}

/// Compare the stored state against a fresh outcome.
///
/// A check that has never been probed before does not raise an alert,
/// whatever the outcome.
pub fn reconcile(check: &Check, outcome: &CheckOutcome, now: i64) -> Reconciliation {
    let state = derive_state(check, outcome);
    let alert_warranted = check.has_been_checked() && state != check.state;

    let updated = Check { state, last_checked: Some(now), ..check.clone() };

    Reconciliation { check: updated, state, alert_warranted, checked_at: now }
}
