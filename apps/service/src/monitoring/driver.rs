use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use super::rotation::{LogRotator, RotationReport};
use super::scheduler::{CheckScheduler, SweepReport};

/// Cadence of the two background loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub sweep: Duration,
    pub rotation: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self { sweep: Duration::from_secs(60), rotation: Duration::from_secs(60 * 60 * 24) }
    }
}

/// Owns the check scheduler and the log rotator and drives both on timers
pub struct Workers {
    scheduler: Arc<CheckScheduler>,
    rotator: Arc<LogRotator>,
}

impl Workers {
    pub fn new(scheduler: CheckScheduler, rotator: LogRotator) -> Self {
        Self { scheduler: Arc::new(scheduler), rotator: Arc::new(rotator) }
    }

    pub async fn run_sweep(&self) -> SweepReport {
        Arc::clone(&self.scheduler).run_sweep().await
    }

    pub async fn rotate(&self) -> RotationReport {
        self.rotator.rotate().await
    }

    /// Start both loops. Each fires once immediately, then on its interval.
    ///
    /// Every sweep runs as its own task, so a slow sweep can overlap the next
    /// one rather than delaying it.
    pub fn start(&self, intervals: Intervals) -> WorkerHandles {
        info!(
            "Background workers started (sweep every {}s, log rotation every {}s)",
            intervals.sweep.as_secs(),
            intervals.rotation.as_secs()
        );

        let scheduler = Arc::clone(&self.scheduler);
        let sweep = tokio::spawn(async move {
            let mut timer = interval(intervals.sweep);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                debug!("Starting check sweep");
                tokio::spawn(Arc::clone(&scheduler).run_sweep());
            }
        });

        let rotator = Arc::clone(&self.rotator);
        let rotation = tokio::spawn(async move {
            let mut timer = interval(intervals.rotation);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                debug!("Starting log rotation");
                rotator.rotate().await;
            }
        });

        WorkerHandles { sweep, rotation }
    }
}

/// Handles to the running loops
pub struct WorkerHandles {
    sweep: JoinHandle<()>,
    rotation: JoinHandle<()>,
}

impl WorkerHandles {
    pub fn is_running(&self) -> bool {
        !self.sweep.is_finished() && !self.rotation.is_finished()
    }

    /// Stop scheduling new sweeps and rotations. Probes already in flight
    /// run to completion.
    pub async fn stop(self) {
        self.sweep.abort();
        self.rotation.abort();
        let _ = self.sweep.await;
        let _ = self.rotation.await;
        info!("Background workers stopped");
    }
}
