//! Hypermedia action model and error definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ledger::{LedgerError, LedgerOutcome};

pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// An input the peer asks for, described by its classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub class: Vec<String>,
}

impl Field {
    pub fn has_classes(&self, classes: &[&str]) -> bool {
        classes.iter().all(|c| self.class.iter().any(|own| own == c))
    }
}

/// A step offered by the peer. Its `href` identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub method: Method,
    pub href: String,
    /// Content type of the request body.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// Result of a successfully executed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The peer's response, when it did not ask for a ledger action.
    Response(Value),
    Ledger(LedgerOutcome),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Action {0} was already executed")]
    AlreadyExecuted(String),

    #[error("Unsupported content type '{0}'")]
    UnsupportedContentType(String),

    #[error("Could not resolve field '{field}': {reason}")]
    FieldResolution { field: String, reason: String },

    #[error("Invalid href '{href}': {reason}")]
    InvalidHref { href: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Peer responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("Ledger action failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Giving up after {attempts} attempts: {last}")]
    MaxRetriesReached { attempts: u32, last: Box<ActionError> },
}

impl ActionError {
    /// Transport failures, timeouts and server errors from the peer.
    pub fn is_retryable(&self) -> bool {
        match self {
            ActionError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            ActionError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_deserialization_defaults() {
        let action: Action = serde_json::from_value(json!({
            "name": "accept",
            "href": "/swaps/rfc003/abc/accept",
            "fields": [{ "name": "beta_ledger_redeem_identity", "class": ["ethereum", "address"] }]
        }))
        .unwrap();

        assert_eq!(action.method, Method::Get);
        assert!(action.media_type.is_none());
        assert!(action.fields[0].has_classes(&["ethereum", "address"]));
        assert!(!action.fields[0].has_classes(&["bitcoin", "address"]));
    }

    #[test]
    fn test_post_with_type() {
        let action: Action = serde_json::from_value(json!({
            "name": "decline",
            "method": "POST",
            "href": "/swaps/rfc003/abc/decline",
            "type": "application/json"
        }))
        .unwrap();
        assert_eq!(action.method, Method::Post);
        assert_eq!(action.media_type.as_deref(), Some(APPLICATION_JSON));
    }

    #[test]
    fn test_retry_classification() {
        let server_error = ActionError::Status {
            status: 503,
            body: String::new(),
        };
        let client_error = ActionError::Status {
            status: 404,
            body: String::new(),
        };
        assert!(server_error.is_retryable());
        assert!(!client_error.is_retryable());
        assert!(!ActionError::AlreadyExecuted("/a".into()).is_retryable());
        assert!(!ActionError::UnsupportedContentType("text/plain".into()).is_retryable());
    }
}
