//! Resilience primitives.
//!
//! Only read-only polling backs off and repeats. Transaction submissions are
//! never retried: a resubmitted publish, register or mint could apply twice.

pub mod backoff;

pub use backoff::PollBackoff;
