//! Metrics collection and exposition.
//!
//! # Metrics
//! - `swap_agent_action_attempts_total` (counter): action attempts by outcome
//! - `swap_agent_ledger_actions_total` (counter): ledger actions by kind, result
//! - `swap_agent_broadcasts_total` (counter): transactions sent by chain
//! - `swap_agent_tracked_utxos` (gauge): unspent outputs held by the Bitcoin wallet
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed, so library code and tests never depend on it

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(address: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(address).install()?;
    tracing::info!(address = %address, "Metrics endpoint listening");
    Ok(())
}

pub fn record_action_attempt(outcome: &'static str) {
    ::metrics::counter!("swap_agent_action_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_ledger_action(kind: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    ::metrics::counter!("swap_agent_ledger_actions_total", "kind" => kind, "result" => result)
        .increment(1);
}

pub fn record_broadcast(chain: &'static str) {
    ::metrics::counter!("swap_agent_broadcasts_total", "chain" => chain).increment(1);
}

pub fn record_tracked_utxos(count: usize) {
    ::metrics::gauge!("swap_agent_tracked_utxos").set(count as f64);
}
