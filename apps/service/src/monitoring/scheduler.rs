use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::alert::status_change_message;
use super::outcome_log::OutcomeLogger;
use super::prober::Prober;
use super::reconciler::reconcile;
use super::types::CheckState;
use super::validation::{InvalidCheck, ValidationRules, validate_check};
use crate::notify::Notifier;
use crate::store::{DataStore, LogStore};

/// How far one check got through the pipeline in a sweep
#[derive(Debug)]
pub enum CheckCycle {
    /// The record could not be read; nothing was probed
    ReadFailed(String),
    /// The record failed validation; nothing was probed
    Rejected(InvalidCheck),
    Probed(ProbeSummary),
    /// The pipeline task panicked or was cancelled
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSummary {
    pub state: CheckState,
    pub alert_warranted: bool,
    pub logged: bool,
    pub persisted: bool,
    pub alert_sent: bool,
}

/// Per-check results of one sweep, in enumeration order
#[derive(Debug, Default)]
pub struct SweepReport {
    pub cycles: Vec<(String, CheckCycle)>,
}

impl SweepReport {
    pub fn cycle(&self, id: &str) -> Option<&CheckCycle> {
        self.cycles.iter().find(|(check_id, _)| check_id == id).map(|(_, cycle)| cycle)
    }

    pub fn probed(&self) -> usize {
        self.cycles.iter().filter(|(_, cycle)| matches!(cycle, CheckCycle::Probed(_))).count()
    }
}

/// Runs sweeps over every stored check: read, validate, probe, reconcile,
/// log, persist and alert, independently per check.
pub struct CheckScheduler {
    data_store: Arc<dyn DataStore>,
    notifier: Arc<dyn Notifier>,
    prober: Arc<dyn Prober>,
    outcome_logger: OutcomeLogger,
    rules: ValidationRules,
    collection: String,
}

impl CheckScheduler {
    pub fn new(
        data_store: Arc<dyn DataStore>,
        log_store: Arc<dyn LogStore>,
        notifier: Arc<dyn Notifier>,
        prober: Arc<dyn Prober>,
        rules: ValidationRules,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            data_store,
            notifier,
            prober,
            outcome_logger: OutcomeLogger::new(log_store),
            rules,
            collection: collection.into(),
        }
    }

    /// Probe every known check once.
    ///
    /// Each check runs in its own task; a failure in one never affects the
    /// others. Enumeration failures turn the sweep into a no-op.
    pub async fn run_sweep(self: Arc<Self>) -> SweepReport {
        let ids = match self.data_store.list(&self.collection).await {
            Ok(ids) if ids.is_empty() => {
                debug!("No checks found in {}, nothing to sweep", self.collection);
                return SweepReport::default();
            }
            Ok(ids) => ids,
            Err(e) => {
                error!("Could not enumerate {}: {e}", self.collection);
                return SweepReport::default();
            }
        };

        let tasks = ids.iter().map(|id| {
            let scheduler = Arc::clone(&self);
            let id = id.clone();
            tokio::spawn(async move { scheduler.run_check(&id).await })
        });
        let joined = join_all(tasks).await;

        let cycles: Vec<_> = ids
            .into_iter()
            .zip(joined)
            .map(|(id, result)| {
                let cycle = result.unwrap_or_else(|e| {
                    error!("Pipeline for check {id} did not finish: {e}");
                    CheckCycle::Aborted(e.to_string())
                });
                (id, cycle)
            })
            .collect();

        let report = SweepReport { cycles };
        info!("Sweep finished: {} checks, {} probed", report.cycles.len(), report.probed());
        report
    }

    /// Full pipeline for a single check
    pub async fn run_check(&self, id: &str) -> CheckCycle {
        let raw = match self.data_store.read(&self.collection, id).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Could not read check {id}: {e}");
                return CheckCycle::ReadFailed(e.to_string());
            }
        };

        let check = match validate_check(&raw, &self.rules) {
            Ok(check) => check,
            Err(invalid) => {
                warn!("Skipping: {invalid}");
                return CheckCycle::Rejected(invalid);
            }
        };

        let outcome = self.prober.probe(&check).await;
        debug!("Check {} outcome: {:?}", check.id, outcome);

        let now = chrono::Utc::now().timestamp_millis();
        let reconciliation = reconcile(&check, &outcome, now);

        let logged = self
            .outcome_logger
            .log(&check, &outcome, reconciliation.state, reconciliation.alert_warranted, now)
            .await;

        let mut summary = ProbeSummary {
            state: reconciliation.state,
            alert_warranted: reconciliation.alert_warranted,
            logged,
            persisted: false,
            alert_sent: false,
        };

        let record = match serde_json::to_value(&reconciliation.check) {
            Ok(record) => record,
            Err(e) => {
                error!("Could not serialize check {}: {e}", check.id);
                return CheckCycle::Probed(summary);
            }
        };

        if let Err(e) = self.data_store.update(&self.collection, &check.id, &record).await {
            error!("Could not save updates to check {}: {e}", check.id);
            return CheckCycle::Probed(summary);
        }
        summary.persisted = true;

        if reconciliation.alert_warranted {
            info!("Check {} changed {} -> {}", check.id, check.state, reconciliation.state);
            let message = status_change_message(&reconciliation.check);
            match self.notifier.send(&check.phone, &message).await {
                Ok(()) => {
                    debug!("Alerted owner of check {}: {message}", check.id);
                    summary.alert_sent = true;
                }
                Err(e) => error!("Could not alert owner of check {}: {e}", check.id),
            }
        } else {
            debug!("Check {} outcome has not changed, no alert needed", check.id);
        }

        CheckCycle::Probed(summary)
    }
}
