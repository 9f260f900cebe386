//! Executes peer actions: fields, HTTP step, ledger dispatch.
//!
//! # Responsibilities
//! - Refuse an action whose href was already executed, before any I/O
//! - Resolve declared fields and send them as query (GET) or JSON body (POST)
//! - Hand an embedded `{type, payload}` ledger action to the ledger executor
//! - Retry transport failures and 5xx responses after a fixed delay
//!
//! # Data Flow
//! ```text
//! execute(action)
//!     → ExecutedActions::begin (claim href)
//!     → attempt 1..=max_retries+1:
//!           fields → HTTP → [LedgerExecutor]
//!     → complete (success / retries exhausted) or release (fatal error)
//! ```

use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::action::executed::ExecutedActions;
use crate::action::field_data::FieldDataSource;
use crate::action::types::{Action, ActionError, ActionOutcome, ActionResult, Method, APPLICATION_JSON};
use crate::ledger::{LedgerAction, LedgerExecutor, RawLedgerAction};
use crate::observability::metrics;
use crate::resilience::{retry_with_fixed_delay, RetryError};

/// Body type assumed for a POST action that does not declare one.
const DEFAULT_POST_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

pub struct ActionExecutor {
    client: Client,
    base_url: Url,
    data_source: Arc<dyn FieldDataSource>,
    ledger: Arc<LedgerExecutor>,
    executed: ExecutedActions,
}

impl ActionExecutor {
    pub fn new(
        base_url: Url,
        data_source: Arc<dyn FieldDataSource>,
        ledger: Arc<LedgerExecutor>,
        executed: ExecutedActions,
        request_timeout: Duration,
    ) -> ActionResult<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url,
            data_source,
            ledger,
            executed,
        })
    }

    /// Replace the HTTP client (proxy settings, TLS roots).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn executed(&self) -> &ExecutedActions {
        &self.executed
    }

    /// Execute `action` at most once, making up to `max_retries + 1` attempts.
    pub async fn execute(
        &self,
        action: &Action,
        max_retries: u32,
        retry_delay: Duration,
    ) -> ActionResult<ActionOutcome> {
        if !self.executed.begin(&action.href) {
            metrics::record_action_attempt("already_executed");
            tracing::warn!(action = %action.name, href = %action.href, "Action already executed");
            return Err(ActionError::AlreadyExecuted(action.href.clone()));
        }

        let result = retry_with_fixed_delay(
            max_retries,
            retry_delay,
            ActionError::is_retryable,
            |attempt| self.attempt(action, attempt),
        )
        .await;

        match result {
            Ok(outcome) => {
                self.executed.complete(&action.href);
                tracing::info!(action = %action.name, href = %action.href, "Action executed");
                Ok(outcome)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                self.executed.complete(&action.href);
                tracing::error!(
                    action = %action.name,
                    href = %action.href,
                    attempts = attempts,
                    error = %last,
                    "Action failed, retries exhausted"
                );
                Err(ActionError::MaxRetriesReached {
                    attempts,
                    last: Box::new(last),
                })
            }
            Err(RetryError::Fatal(e)) => {
                self.executed.release(&action.href);
                tracing::error!(action = %action.name, href = %action.href, error = %e, "Action failed");
                Err(e)
            }
        }
    }

    async fn attempt(&self, action: &Action, attempt: u32) -> ActionResult<ActionOutcome> {
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(
            action = %action.name,
            href = %action.href,
            attempt = attempt,
            request_id = %request_id,
            "Attempting action"
        );

        let result = self.run_step(action, &request_id).await;
        let label = match &result {
            Ok(_) => "success",
            Err(e) if e.is_retryable() => "retryable_error",
            Err(_) => "fatal_error",
        };
        metrics::record_action_attempt(label);
        result
    }

    async fn run_step(&self, action: &Action, request_id: &str) -> ActionResult<ActionOutcome> {
        if action.method == Method::Post {
            check_json_media_type(action.media_type.as_deref())?;
        }

        let url = self.base_url.join(&action.href).map_err(|e| ActionError::InvalidHref {
            href: action.href.clone(),
            reason: e.to_string(),
        })?;

        let mut fields = Map::new();
        for field in &action.fields {
            if let Some(value) = self.data_source.resolve(field).await? {
                fields.insert(field.name.clone(), value);
            }
        }

        let request = match action.method {
            Method::Get => {
                let query: Vec<(String, String)> = fields
                    .iter()
                    .map(|(name, value)| (name.clone(), query_value(value)))
                    .collect();
                self.client.get(url).query(&query)
            }
            Method::Post => self.client.post(url).json(&Value::Object(fields)),
        };

        let response = request.header("x-request-id", request_id).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ActionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        match RawLedgerAction::from_response(&body) {
            Some(raw) => {
                let ledger_action = LedgerAction::try_from(raw)?;
                tracing::info!(
                    action = %action.name,
                    kind = ledger_action.kind(),
                    request_id = %request_id,
                    "Peer requested ledger action"
                );
                Ok(ActionOutcome::Ledger(self.ledger.execute(&ledger_action).await?))
            }
            None => Ok(ActionOutcome::Response(body)),
        }
    }
}

fn check_json_media_type(media_type: Option<&str>) -> ActionResult<()> {
    let declared = media_type.unwrap_or(DEFAULT_POST_MEDIA_TYPE);
    let essence = declared.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case(APPLICATION_JSON) {
        Ok(())
    } else {
        Err(ActionError::UnsupportedContentType(declared.to_string()))
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("base_url", &self.base_url.as_str())
            .field("executed", &self.executed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_check() {
        assert!(check_json_media_type(Some("application/json")).is_ok());
        assert!(check_json_media_type(Some("application/json; charset=utf-8")).is_ok());
        assert!(matches!(
            check_json_media_type(Some("text/plain")),
            Err(ActionError::UnsupportedContentType(t)) if t == "text/plain"
        ));
        assert!(matches!(
            check_json_media_type(None),
            Err(ActionError::UnsupportedContentType(t)) if t == DEFAULT_POST_MEDIA_TYPE
        ));
    }

    #[test]
    fn test_query_values() {
        assert_eq!(query_value(&Value::from("bcrt1q")), "bcrt1q");
        assert_eq!(query_value(&Value::from(15u64)), "15");
    }
}
