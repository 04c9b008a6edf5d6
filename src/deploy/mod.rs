//! Deployment orchestration.
//!
//! # State Machine
//! ```text
//! Start → Funded → Compiled → Published → Registered → Minted → Done
//!   fund    compile  publish    register     mint       report
//! ```
//!
//! Every step that submits a transaction waits for its confirmation before
//! the next state is entered. Any failure halts the run in the last state
//! reached; only the balance reads are allowed to fail.

pub mod journal;
pub mod orchestrator;
pub mod report;
pub mod state;

use std::fmt;

use thiserror::Error;

use crate::account::AccountError;
use crate::blockchain::types::{BlockchainError, TxHash};
use crate::compiler::CompilerError;

pub use journal::{InFlight, Journal, JournalError, JournalRecord};
pub use orchestrator::Deployer;
pub use report::DeploymentReport;
pub use state::{DeployState, Transition};

/// Errors that abort a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    /// A previous run stopped with a submitted transaction of unknown outcome.
    #[error("previous run left {transition} transaction {hash} unconfirmed; inspect it and rerun with --discard-journal")]
    AmbiguousPriorRun { transition: Transition, hash: TxHash },

    #[error("Invalid amount: {0}")]
    Amount(String),
}

/// A deployment that halted, with the last state it reached.
#[derive(Debug)]
pub struct PipelineFailure {
    pub state: DeployState,
    pub error: DeployError,
}

impl PipelineFailure {
    pub fn new(state: DeployState, error: DeployError) -> Self {
        Self { state, error }
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deployment failed in state {}: {}", self.state, self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
