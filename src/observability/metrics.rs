//! Deployment metrics.
//!
//! # Metrics
//! - `deployer_transitions_total` (counter): state transitions by target state
//! - `deployer_transactions_total` (counter): submitted transactions by step and outcome
//! - `deployer_confirmation_seconds` (histogram): time spent waiting for commits
//!
//! Without an installed recorder these calls are no-ops.

use std::time::Duration;

use crate::deploy::state::{DeployState, Transition};

pub fn record_transition(state: DeployState) {
    metrics::counter!("deployer_transitions_total", "state" => state.as_str()).increment(1);
}

pub fn record_transaction(transition: Transition, outcome: &'static str) {
    metrics::counter!(
        "deployer_transactions_total",
        "transition" => transition.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_confirmation_latency(transition: Transition, elapsed: Duration) {
    metrics::histogram!("deployer_confirmation_seconds", "transition" => transition.as_str())
        .record(elapsed.as_secs_f64());
}
