//! Signing identity and address derivation.
//!
//! # Security
//! - Keys are never logged; `Debug` prints the address only
//! - Signing happens in-process, the key is never sent anywhere

use ed25519_dalek::{Signer, SigningKey};
use sha3::{Digest, Sha3_256};

use crate::account::{AccountError, AccountResult};
use crate::blockchain::types::AccountAddress;

/// Authentication scheme byte for single-signer Ed25519 accounts.
pub const ED25519_SCHEME: u8 = 0x00;

/// Prefix of the self-describing private key encoding (`ed25519-priv-0x…`).
pub const ED25519_KEY_PREFIX: &str = "ed25519-priv-";

/// Derive the account address owned by an Ed25519 public key.
pub fn derive_address(public_key: &[u8; 32]) -> AccountAddress {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key);
    hasher.update([ED25519_SCHEME]);
    let digest: [u8; 32] = hasher.finalize().into();
    AccountAddress::new(digest)
}

/// A key pair plus the account address it controls.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
    address: AccountAddress,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self::from_signing_key(signing_key)
    }

    /// Create an identity from an encoded private key.
    ///
    /// Accepts `0x`-prefixed hex, bare hex, and `ed25519-priv-0x…`.
    pub fn from_private_key(private_key: &str) -> AccountResult<Self> {
        let encoded = private_key.trim();
        let encoded = encoded.strip_prefix(ED25519_KEY_PREFIX).unwrap_or(encoded);
        let key_hex = encoded.strip_prefix("0x").unwrap_or(encoded);

        let mut seed = [0u8; 32];
        hex::decode_to_slice(key_hex, &mut seed).map_err(|e| {
            AccountError::InvalidKey(format!("expected 32 hex-encoded bytes: {}", e))
        })?;

        Ok(Self::from_signing_key(SigningKey::from_bytes(&seed)))
    }

    /// Create an identity and check it against an explicitly supplied address.
    ///
    /// Fails with [`AccountError::IdentityMismatch`] when the supplied address is
    /// not the one derived from the key.
    pub fn with_expected_address(
        private_key: &str,
        expected: Option<AccountAddress>,
    ) -> AccountResult<Self> {
        let identity = Self::from_private_key(private_key)?;
        match expected {
            Some(configured) if configured != identity.address => Err(AccountError::IdentityMismatch {
                configured,
                derived: identity.address,
            }),
            _ => Ok(identity),
        }
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = derive_address(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Get the account address.
    pub fn address(&self) -> AccountAddress {
        self.address
    }

    /// Get the raw public key.
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// `0x`-prefixed public key, as expected by transaction authenticators.
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.public_key()))
    }

    /// `0x`-prefixed private key for persistence. Never log this.
    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }

    /// Sign a message with the private key.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Identity with an arbitrary address, for tests that need fixed addresses.
    #[cfg(test)]
    pub(crate) fn with_fixed_address(address: AccountAddress) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&[7u8; 32]),
            address,
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
