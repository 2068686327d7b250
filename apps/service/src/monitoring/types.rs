use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Scheme used to reach a check's target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "http" => Some(Protocol::Http),
            "https" => Some(Protocol::Https),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

/// HTTP method issued by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Methods are matched case-sensitively, records store them upper-cased.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Last known state of a check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    #[default]
    Down,
}

impl CheckState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "up" => Some(CheckState::Up),
            "down" => Some(CheckState::Down),
            _ => None,
        }
    }
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// A validated check record.
///
/// Only `state` and `last_checked` are ever rewritten by the workers. Any
/// other fields the record carries (owner, creation metadata, ...) are kept in
/// `extra` so that writing the record back does not drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: String,
    pub phone: String,
    pub protocol: Protocol,
    pub url: String,
    pub method: HttpMethod,
    pub success_codes: Vec<u16>,
    pub timeout_sec: u8,
    #[serde(default)]
    pub state: CheckState,
    /// Unix timestamp in milliseconds, `None` until the first probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Check {
    /// Upper bound for a single probe of this check
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_sec))
    }

    /// `protocol://url` as configured by the owner
    pub fn target(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }

    pub fn accepts(&self, response_code: u16) -> bool {
        self.success_codes.contains(&response_code)
    }

    pub fn has_been_checked(&self) -> bool {
        self.last_checked.is_some()
    }
}

/// Why a probe produced no response code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    /// Connection refused, DNS failure, TLS failure, reset, ...
    Transport,
    /// The probe exceeded `timeout_sec`
    Timeout,
    /// The target could not be turned into a request URL
    InvalidTarget,
}

impl std::fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeErrorKind::Transport => write!(f, "transport"),
            ProbeErrorKind::Timeout => write!(f, "timeout"),
            ProbeErrorKind::InvalidTarget => write!(f, "invalid_target"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeError {
    pub kind: ProbeErrorKind,
    pub detail: String,
}

/// Normalized result of a single probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub error: Option<ProbeError>,
    pub response_code: Option<u16>,
}

impl CheckOutcome {
    /// The target answered with `code`
    pub fn response(code: u16) -> Self {
        Self { error: None, response_code: Some(code) }
    }

    /// The probe failed before a response arrived
    pub fn failure(kind: ProbeErrorKind, detail: impl Into<String>) -> Self {
        Self { error: Some(ProbeError { kind, detail: detail.into() }), response_code: None }
    }

    pub fn timed_out(bound: Duration) -> Self {
        Self::failure(
            ProbeErrorKind::Timeout,
            format!("no response within {}ms", bound.as_millis()),
        )
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One line of a check's audit log. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "check_data")]
    pub check: Check,
    pub outcome: CheckOutcome,
    #[serde(rename = "newState")]
    pub new_state: CheckState,
    pub alerted: bool,
    #[serde(rename = "timeOfCheck")]
    pub time_of_check: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_round_trips_unknown_fields() {
        let raw = json!({
            "id": "abcdefghij0123456789",
            "phone": "5551234567",
            "protocol": "https",
            "url": "example.com",
            "method": "GET",
            "successCodes": [200, 201],
            "timeoutSec": 3,
            "userPhone": "5551234567"
        });

        let check: Check = serde_json::from_value(raw).unwrap();
        assert_eq!(check.state, CheckState::Down);
        assert_eq!(check.last_checked, None);
        assert_eq!(check.extra.get("userPhone"), Some(&json!("5551234567")));

        let written = serde_json::to_value(&check).unwrap();
        assert_eq!(written["userPhone"], json!("5551234567"));
        assert_eq!(written["state"], json!("down"));
        assert!(written.get("lastChecked").is_none());
    }

    #[test]
    fn test_outcome_constructors_are_exclusive() {
        let ok = CheckOutcome::response(204);
        assert!(!ok.is_error());
        assert_eq!(ok.response_code, Some(204));

        let timeout = CheckOutcome::timed_out(Duration::from_secs(2));
        assert!(timeout.is_error());
        assert_eq!(timeout.response_code, None);
        assert_eq!(timeout.error.unwrap().kind, ProbeErrorKind::Timeout);
    }

    #[test]
    fn test_log_entry_field_names() {
        let check: Check = serde_json::from_value(json!({
            "id": "abcdefghij0123456789",
            "phone": "5551234567",
            "protocol": "http",
            "url": "example.com/health",
            "method": "POST",
            "successCodes": [200],
            "timeoutSec": 1,
            "state": "up",
            "lastChecked": 1_700_000_000_000i64
        }))
        .unwrap();

        let entry = LogEntry {
            check,
            outcome: CheckOutcome::failure(ProbeErrorKind::Transport, "connection refused"),
            new_state: CheckState::Down,
            alerted: true,
            time_of_check: 1_700_000_060_000,
        };

        let line = serde_json::to_value(&entry).unwrap();
        assert_eq!(line["newState"], json!("down"));
        assert_eq!(line["alerted"], json!(true));
        assert_eq!(line["timeOfCheck"], json!(1_700_000_060_000i64));
        assert_eq!(line["check_data"]["method"], json!("POST"));
        assert_eq!(line["outcome"]["error"]["kind"], json!("transport"));
        assert_eq!(line["outcome"]["responseCode"], json!(null));
    }
}
