//! Process lifecycle.
//!
//! A deployment is a single run; the only lifecycle event is an operator
//! interrupt, which ends the run wherever it is. The deployment journal
//! keeps any transaction that was in flight at that moment.

pub mod signals;

pub use signals::interrupted;
