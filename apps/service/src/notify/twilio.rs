use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Notifier, NotifyError};

/// Twilio caps a single message body at this many characters.
const MAX_MESSAGE_LEN: usize = 1600;

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 form
    pub from_phone: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .field("from_phone", &self.from_phone)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// SMS delivery through Twilio's Messages API
pub struct TwilioNotifier {
    client: reqwest::Client,
    config: TwilioConfig,
    phone_length: usize,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig, phone_length: usize) -> Self {
        Self { client: reqwest::Client::new(), config, phone_length }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        let phone = destination.trim();
        if phone.is_empty() || phone.chars().count() != self.phone_length {
            return Err(NotifyError::InvalidDestination(destination.to_string()));
        }

        let body = message.trim();
        let len = body.chars().count();
        if len == 0 || len > MAX_MESSAGE_LEN {
            return Err(NotifyError::InvalidMessage { len, max: MAX_MESSAGE_LEN });
        }

        let to = format!("+1{phone}");
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", self.config.from_phone.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Twilio accepted message to {to}");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected { status: status.as_u16(), body })
        }
    }
}
