//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator and adapters produce:
//!     → logging.rs (structured log events, one span per run id)
//!     → metrics.rs (transition and transaction counters)
//! ```
//!
//! # Design Decisions
//! - Structured fields (address, tx_hash, state) for machine parsing
//! - Private keys never appear in events

pub mod logging;
pub mod metrics;
