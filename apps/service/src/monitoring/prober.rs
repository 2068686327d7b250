use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;
use url::{Position, Url};

use super::types::{Check, CheckOutcome, ProbeErrorKind};

/// Issues one network request for a check and reduces it to a [`CheckOutcome`].
///
/// Implementations never fail: transport errors and timeouts are reported
/// through the outcome itself.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, check: &Check) -> CheckOutcome;
}

/// Single-assignment slot for a probe's outcome.
///
/// Completion, transport error and timeout all race to settle the slot; the
/// first one wins and every later attempt is ignored.
pub struct OutcomeSlot {
    sender: Mutex<Option<oneshot::Sender<CheckOutcome>>>,
}

impl OutcomeSlot {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<CheckOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Arc::new(Self { sender: Mutex::new(Some(tx)) }), rx)
    }

    /// Returns `true` if this call delivered the outcome.
    pub fn settle(&self, outcome: CheckOutcome) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
        match sender {
            Some(tx) => {
                // The receiver may already be gone; the slot is still settled.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

/// Host and path+query split out of a protocol-relative check url
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    url: Url,
}

impl ProbeTarget {
    pub fn from_check(check: &Check) -> Result<Self, String> {
        let mut url =
            Url::parse(&check.target()).map_err(|e| format!("invalid url {}: {e}", check.url))?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(format!("url {} has no host", check.url));
        }
        url.set_fragment(None);
        Ok(Self { url })
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Path plus query string, always starting with `/`
    pub fn path(&self) -> &str {
        &self.url[Position::BeforePath..]
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// HTTP/HTTPS prober
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self, reqwest::Error> {
        // Redirects are reported as-is so that 3xx codes can be listed as
        // success codes.
        let client = reqwest::Client::builder()
            .user_agent(concat!("uppe-workers/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, check: &Check) -> CheckOutcome {
        let target = match ProbeTarget::from_check(check) {
            Ok(target) => target,
            Err(detail) => return CheckOutcome::failure(ProbeErrorKind::InvalidTarget, detail),
        };
        let bound = check.timeout();

        debug!(
            "Probing {} {} (host {}, path {}) with {}s timeout",
            check.method,
            target.url(),
            target.host(),
            target.path(),
            check.timeout_sec
        );

        let request = self
            .client
            .request(check.method.into(), target.url().clone())
            .timeout(bound);

        race_outcome(bound, async move {
            match request.send().await {
                Ok(response) => CheckOutcome::response(response.status().as_u16()),
                Err(e) if e.is_timeout() => CheckOutcome::timed_out(bound),
                Err(e) => CheckOutcome::failure(ProbeErrorKind::Transport, error_chain(&e)),
            }
        })
        .await
    }
}

/// Run `request` against a `bound` timer and return whichever settles first.
///
/// The request keeps running in the background if the timer wins; its late
/// result is discarded by the slot.
pub async fn race_outcome<F>(bound: Duration, request: F) -> CheckOutcome
where
    F: Future<Output = CheckOutcome> + Send + 'static,
{
    let (slot, settled) = OutcomeSlot::new();

    let request_slot = Arc::clone(&slot);
    tokio::spawn(async move {
        let outcome = request.await;
        if !request_slot.settle(outcome) {
            debug!("Discarding probe result that arrived after the timeout");
        }
    });

    let timer_slot = Arc::clone(&slot);
    let timer = tokio::spawn(async move {
        tokio::time::sleep(bound).await;
        timer_slot.settle(CheckOutcome::timed_out(bound));
    });

    let outcome = settled.await.unwrap_or_else(|_| {
        CheckOutcome::failure(ProbeErrorKind::Transport, "probe ended without an outcome")
    });
    timer.abort();
    outcome
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
