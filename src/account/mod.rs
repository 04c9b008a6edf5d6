//! Account provisioning.
//!
//! # Data Flow
//! ```text
//! process environment, then identity file (PRIVATE_KEY / ADDRESS)
//!     → store.rs (read / write plain text)
//!     → identity.rs (key parsing, address derivation, signing)
//!     → AccountProvider::obtain_identity
//! ```
//!
//! # Security Constraints
//! - The identity file is written once, when no identity exists yet
//! - A supplied ADDRESS must match the key-derived address
//! - Private keys are never logged

pub mod identity;
pub mod store;

use std::path::PathBuf;

use thiserror::Error;

use crate::blockchain::types::{AccountAddress, AddressParseError};

pub use identity::Identity;
pub use store::IdentityStore;

/// Errors raised while loading or creating an identity.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The persisted address is not the one controlled by the persisted key.
    #[error("Identity mismatch: configured address {configured} but key derives {derived}")]
    IdentityMismatch {
        configured: AccountAddress,
        derived: AccountAddress,
    },

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    InvalidAddress(#[from] AddressParseError),

    #[error("{} is missing {field}", path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("Identity store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AccountResult<T> = Result<T, AccountError>;

/// Source of the signing identity used by a deployment.
pub trait IdentitySource: Send + Sync {
    fn obtain_identity(&self) -> AccountResult<Identity>;
}

/// Load-or-create provider backed by an [`IdentityStore`].
#[derive(Debug, Clone)]
pub struct AccountProvider {
    store: IdentityStore,
}

impl AccountProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: IdentityStore::new(path),
        }
    }

    pub fn from_store(store: IdentityStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }
}

impl IdentitySource for AccountProvider {
    fn obtain_identity(&self) -> AccountResult<Identity> {
        match self.store.load()? {
            Some(stored) => {
                let expected = stored
                    .address
                    .as_deref()
                    .map(str::parse::<AccountAddress>)
                    .transpose()?;
                let identity = Identity::with_expected_address(&stored.private_key, expected)?;
                tracing::info!(
                    address = %identity.address(),
                    path = %self.store.path().display(),
                    "Loaded persisted identity"
                );
                Ok(identity)
            }
            None => {
                let identity = Identity::generate();
                self.store.save(&identity)?;
                tracing::info!(
                    address = %identity.address(),
                    path = %self.store.path().display(),
                    "Generated and persisted new identity"
                );
                Ok(identity)
            }
        }
    }
}
