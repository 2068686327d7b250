//! Sanity checks applied to every raw check record before it is probed.
//!
//! Each required field is checked on its own, so a rejected record reports
//! every problem at once. Any single failure disqualifies the record.

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Check, CheckState, HttpMethod, Protocol};

const MIN_TIMEOUT_SEC: u64 = 1;
const MAX_TIMEOUT_SEC: u64 = 5;

/// Fixed lengths enforced on identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub id_length: usize,
    pub phone_length: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self { id_length: 20, phone_length: 10 }
    }
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("record is not an object")]
    NotAnObject,
    #[error("id must be a string of exactly {0} characters")]
    Id(usize),
    #[error("phone must be a string of exactly {0} characters")]
    Phone(usize),
    #[error("protocol must be one of http, https")]
    Protocol,
    #[error("url must be a non-empty string")]
    Url,
    #[error("method must be one of GET, POST, PUT, DELETE")]
    Method,
    #[error("successCodes must be a non-empty array of status codes")]
    SuccessCodes,
    #[error("timeoutSec must be a whole number between 1 and 5")]
    TimeoutSec,
}

/// A record that failed validation and must not be probed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("check {} is not properly formatted: {}", display_id(.id), join(.errors))]
pub struct InvalidCheck {
    /// The record's id, when that field at least was readable
    pub id: Option<String>,
    pub errors: Vec<FieldError>,
}

fn display_id(id: &Option<String>) -> &str {
    id.as_deref().unwrap_or("<unknown>")
}

fn join(errors: &[FieldError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Validate and normalize a raw check record.
///
/// Strings are trimmed, `state` falls back to `down` and `lastChecked` to
/// "never" instead of being rejected.
pub fn validate_check(raw: &Value, rules: &ValidationRules) -> Result<Check, InvalidCheck> {
    let Some(record) = raw.as_object() else {
        return Err(InvalidCheck { id: None, errors: vec![FieldError::NotAnObject] });
    };

    let mut errors = Vec::new();

    let id = fixed_length_string(record, "id", rules.id_length);
    if id.is_none() {
        errors.push(FieldError::Id(rules.id_length));
    }

    let phone = fixed_length_string(record, "phone", rules.phone_length);
    if phone.is_none() {
        errors.push(FieldError::Phone(rules.phone_length));
    }

    let protocol = record.get("protocol").and_then(Value::as_str).and_then(Protocol::parse);
    if protocol.is_none() {
        errors.push(FieldError::Protocol);
    }

    let url = record
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);
    if url.is_none() {
        errors.push(FieldError::Url);
    }

    let method = record.get("method").and_then(Value::as_str).and_then(HttpMethod::parse);
    if method.is_none() {
        errors.push(FieldError::Method);
    }

    let success_codes = record.get("successCodes").and_then(success_codes);
    if success_codes.is_none() {
        errors.push(FieldError::SuccessCodes);
    }

    let timeout_sec = record.get("timeoutSec").and_then(timeout_sec);
    if timeout_sec.is_none() {
        errors.push(FieldError::TimeoutSec);
    }

    let state = record
        .get("state")
        .and_then(Value::as_str)
        .and_then(CheckState::parse)
        .unwrap_or_default();

    let last_checked = record
        .get("lastChecked")
        .and_then(Value::as_f64)
        .filter(|ts| *ts > 0.0)
        .map(|ts| ts as i64);

    match (id, phone, protocol, url, method, success_codes, timeout_sec) {
        (
            Some(id),
            Some(phone),
            Some(protocol),
            Some(url),
            Some(method),
            Some(success_codes),
            Some(timeout_sec),
        ) => Ok(Check {
            id,
            phone,
            protocol,
            url,
            method,
            success_codes,
            timeout_sec,
            state,
            last_checked,
            extra: passthrough_fields(record),
        }),
        (id, ..) => Err(InvalidCheck {
            id: id.or_else(|| record.get("id").and_then(Value::as_str).map(str::to_string)),
            errors,
        }),
    }
}

fn fixed_length_string(record: &Map<String, Value>, key: &str, length: usize) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| value.chars().count() == length)
        .map(str::to_string)
}

/// Every element must be an integer status code; duplicates are collapsed.
fn success_codes(value: &Value) -> Option<Vec<u16>> {
    let raw = value.as_array()?;
    let mut codes = Vec::with_capacity(raw.len());
    for code in raw {
        let code = whole_number(code).and_then(|code| u16::try_from(code).ok())?;
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    (!codes.is_empty()).then_some(codes)
}

fn timeout_sec(value: &Value) -> Option<u8> {
    whole_number(value)
        .filter(|secs| (MIN_TIMEOUT_SEC..=MAX_TIMEOUT_SEC).contains(secs))
        .and_then(|secs| u8::try_from(secs).ok())
}

/// Accepts `3` and `3.0`, rejects `3.5`, negatives and non-numbers.
fn whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= u64::MAX as f64)
        .map(|n| n as u64)
}

const KNOWN_FIELDS: [&str; 9] = [
    "id",
    "phone",
    "protocol",
    "url",
    "method",
    "successCodes",
    "timeoutSec",
    "state",
    "lastChecked",
];

fn passthrough_fields(record: &Map<String, Value>) -> Map<String, Value> {
    record
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
