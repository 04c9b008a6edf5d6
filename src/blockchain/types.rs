//! Chain-specific types and error definitions.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// Re-export NetworkConfig from config module to avoid duplication
pub use crate::config::schema::NetworkConfig;

/// 32-byte account identifier.
///
/// Parses both the short (`0xA1`) and long (64 hex digit) forms and always
/// displays the long form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    /// Address length in bytes.
    pub const LENGTH: usize = 32;

    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Long-form `0x`-prefixed hex literal.
    pub fn to_hex_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Error returned when an account address literal cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid account address '{0}'")]
pub struct AddressParseError(pub String);

impl FromStr for AccountAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() || digits.len() > Self::LENGTH * 2 {
            return Err(AddressParseError(s.to_string()));
        }

        let padded = format!("{:0>64}", digits);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes).map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_literal())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex_literal())
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_literal())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque transaction hash as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TxHash {
    fn from(hash: String) -> Self {
        Self(hash)
    }
}

impl From<&str> for TxHash {
    fn from(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully-qualified Move struct tag naming a coin, e.g. `0x…::spud_coin::SpudCoin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoinType {
    pub address: AccountAddress,
    pub module: String,
    pub name: String,
}

impl CoinType {
    pub fn new(address: AccountAddress, module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address,
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.name)
    }
}

impl Serialize for CoinType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Typed entry function argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveValue {
    U64(u64),
    Address(AccountAddress),
    /// `vector<u8>`, encoded as a hex string on the wire.
    Bytes(Vec<u8>),
    Vector(Vec<MoveValue>),
}

impl MoveValue {
    /// JSON encoding accepted by the node's submission API.
    ///
    /// `u64` is encoded as a string to survive JSON number precision limits.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            MoveValue::U64(n) => Value::String(n.to_string()),
            MoveValue::Address(addr) => Value::String(addr.to_hex_literal()),
            MoveValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
            MoveValue::Vector(items) => Value::Array(items.iter().map(MoveValue::to_json).collect()),
        }
    }
}

/// Entry function invocation: the payload of a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFunction {
    /// Fully-qualified function name, e.g. `0x1::managed_coin::mint`.
    pub function_id: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<MoveValue>,
}

impl EntryFunction {
    pub fn new(function_id: impl Into<String>) -> Self {
        Self {
            function_id: function_id.into(),
            type_arguments: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn with_type_argument(mut self, type_tag: impl Into<String>) -> Self {
        self.type_arguments.push(type_tag.into());
        self
    }

    pub fn with_argument(mut self, value: MoveValue) -> Self {
        self.arguments.push(value);
        self
    }
}

/// An unsigned transaction: built, signed by `sender`, submitted, discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub sender: AccountAddress,
    pub payload: EntryFunction,
}

/// Result of submitting a transaction.
///
/// `confirmed` only becomes true once the node reports the transaction as
/// committed and successful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub hash: TxHash,
    pub confirmed: bool,
    /// Ledger version the transaction was committed at.
    pub version: Option<u64>,
    pub vm_status: Option<String>,
}

impl TransactionReceipt {
    /// Receipt for a transaction accepted into the mempool but not yet committed.
    pub fn pending(hash: impl Into<TxHash>) -> Self {
        Self {
            hash: hash.into(),
            confirmed: false,
            version: None,
            vm_status: None,
        }
    }

    /// Receipt for a committed, successful transaction.
    pub fn confirmed(hash: impl Into<TxHash>, version: Option<u64>, vm_status: Option<String>) -> Self {
        Self {
            hash: hash.into(),
            confirmed: true,
            version,
            vm_status,
        }
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Faucet rejected or could not serve the funding request.
    #[error("Funding failed: {0}")]
    Funding(String),

    /// Chain rejected the submission or the committed transaction aborted.
    #[error("Transaction failed: {reason}")]
    TransactionFailed { hash: Option<TxHash>, reason: String },

    /// Transaction was not confirmed within the configured bound.
    #[error("Transaction {hash} not confirmed within {timeout:?}")]
    ConfirmationTimeout { hash: TxHash, timeout: Duration },

    /// Read-only state query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Node answered with a body we could not interpret.
    #[error("Invalid node response: {0}")]
    InvalidResponse(String),

    /// Network configuration cannot be used.
    #[error("Blockchain not available: {0}")]
    NotAvailable(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_address_is_left_padded() {
        let addr: AccountAddress = "0xA1".parse().unwrap();
        assert_eq!(addr.as_bytes()[31], 0xa1);
        assert!(addr.as_bytes()[..31].iter().all(|b| *b == 0));
        assert_eq!(
            addr.to_string(),
            "0x00000000000000000000000000000000000000000000000000000000000000a1"
        );
    }

    #[test]
    fn test_address_rejects_garbage() {
        assert!("0x".parse::<AccountAddress>().is_err());
        assert!("0xzz".parse::<AccountAddress>().is_err());
        assert!(format!("0x{}", "1".repeat(65)).parse::<AccountAddress>().is_err());
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr: AccountAddress = "0x1".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex_literal()));
        let decoded: AccountAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, addr);
    }

    #[test]
    fn test_coin_type_display() {
        let coin = CoinType::new("0xA1".parse().unwrap(), "spud_coin", "SpudCoin");
        assert!(coin.to_string().ends_with("a1::spud_coin::SpudCoin"));
    }

    #[test]
    fn test_move_value_json() {
        let value = MoveValue::Vector(vec![
            MoveValue::Bytes(vec![0xca, 0xfe]),
            MoveValue::U64(u64::MAX),
            MoveValue::Address("0xA1".parse().unwrap()),
        ]);
        let json = value.to_json();
        assert_eq!(json[0], "0xcafe");
        assert_eq!(json[1], "18446744073709551615");
        assert!(json[2].as_str().unwrap().ends_with("a1"));
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");

        let err = BlockchainError::ConfirmationTimeout {
            hash: TxHash::from("0xabc"),
            timeout: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("0xabc"));
        assert!(err.to_string().contains("30s"));
    }
}
