//! Chain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Identity (account module)
//!     → transaction.rs (entry function payloads, submission wire format)
//!     → client.rs (faucet, encode/sign/submit, confirmation polling, balances)
//! ```
//!
//! # Security Constraints
//! - Signing happens locally; only the public key and signature leave the process
//! - Never log private keys or sensitive data
//! - All node requests and confirmation waits have configurable timeouts

pub mod client;
pub mod transaction;
pub mod types;

pub use client::{ChainClient, RestClient};
pub use types::{
    AccountAddress, BlockchainError, CoinType, EntryFunction, MoveValue, TransactionReceipt, TxHash,
};
