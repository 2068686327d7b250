/// Check execution engine
///
/// This module is responsible for:
/// - Validating raw check records
/// - Probing HTTP/HTTPS targets with a per-check timeout
/// - Reconciling outcomes into up/down state and deciding on alerts
/// - Logging every outcome and rotating those logs
/// - Driving sweeps and rotations on fixed intervals
pub mod alert;
pub mod driver;
pub mod outcome_log;
pub mod prober;
pub mod reconciler;
pub mod rotation;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use driver::{Intervals, Workers};
pub use prober::HttpProber;
pub use rotation::LogRotator;
pub use scheduler::CheckScheduler;
pub use validation::ValidationRules;
