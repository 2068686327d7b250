use super::types::Check;

/// Text sent to a check's owner after its state flipped
pub fn status_change_message(check: &Check) -> String {
    format!(
        "Alert: Your check for {} {}://{} is currently {}",
        check.method, check.protocol, check.url, check.state
    )
}
