/// Alert delivery
///
/// [`TwilioNotifier`] sends SMS through the Twilio REST API. Without Twilio
/// credentials the workers fall back to [`LogNotifier`], which only records
/// the alert in the service log.
pub mod twilio;

pub use twilio::{TwilioConfig, TwilioNotifier};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid destination {0:?}")]
    InvalidDestination(String),
    #[error("message must be between 1 and {max} characters, got {len}")]
    InvalidMessage { len: usize, max: usize },
    #[error("request to notification provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: &str, message: &str) -> Result<(), NotifyError>;
}

/// Notifier that writes alerts to the service log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        info!(destination, "Alert (not delivered, no notifier configured): {message}");
        Ok(())
    }
}
