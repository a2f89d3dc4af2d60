//! Shared HTTP client plumbing.

use std::time::Duration;

use crate::error::Result;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("waiverdesk/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by all remote stores.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Pull a human-readable message out of an error response body.
///
/// Understands `{"message": ...}`, `{"error": "..."}` and
/// `{"error": {"message": ...}}`; anything else is returned trimmed.
#[must_use]
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let candidates = [
            value.get("message"),
            value.pointer("/error/message"),
            value.get("error"),
        ];
        for candidate in candidates.into_iter().flatten() {
            if let Some(text) = candidate.as_str() {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(300).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"message":"Bucket not found"}"#), "Bucket not found");
        assert_eq!(
            error_message(r#"{"error":{"type":"INVALID","message":"Unknown field"}}"#),
            "Unknown field"
        );
        assert_eq!(error_message(r#"{"error":"NOT_FOUND"}"#), "NOT_FOUND");
        assert_eq!(error_message("  gateway timeout \n"), "gateway timeout");
        assert_eq!(error_message(""), "no response body");
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(5)).is_ok());
    }
}
