use serde::{Deserialize, Serialize};

/// Trait describing the outbound notification hook (e-mail gateway or similar adapter).
///
/// Dispatch is always best effort: callers log failures and carry on.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification) -> Result<DispatchReceipt, DispatchError>;
}

/// Message handed to the dispatcher; rendering beyond these bodies is the adapter's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub recipient: String,
    pub recipient_name: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Provider acknowledgement, stored on tickets as informational metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub provider: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification rejected by provider: {0}")]
    Rejected(String),
}

/// Escape text interpolated into HTML bodies and public pages.
pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
