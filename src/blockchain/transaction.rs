//! Transaction payloads and submission wire types.
//!
//! # Responsibilities
//! - Build entry function payloads for publish, register and mint
//! - Shape the JSON submission request the node signs over
//! - Attach the local Ed25519 authenticator

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::account::Identity;
use crate::blockchain::types::{AccountAddress, CoinType, EntryFunction, MoveValue, Transaction};
use crate::compiler::CompiledModule;

pub const PUBLISH_PACKAGE_FUNCTION: &str = "0x1::code::publish_package_txn";
pub const REGISTER_FUNCTION: &str = "0x1::managed_coin::register";
pub const MINT_FUNCTION: &str = "0x1::managed_coin::mint";

/// `code::publish_package_txn(metadata, modules)`.
pub fn publish_package(module: &CompiledModule) -> EntryFunction {
    EntryFunction::new(PUBLISH_PACKAGE_FUNCTION)
        .with_argument(MoveValue::Bytes(module.metadata().to_vec()))
        .with_argument(MoveValue::Vector(
            module.bytecode().iter().cloned().map(MoveValue::Bytes).collect(),
        ))
}

/// `managed_coin::register<Coin>()`, signed by the account that will hold the coin.
pub fn register_coin(coin_type: &CoinType) -> EntryFunction {
    EntryFunction::new(REGISTER_FUNCTION).with_type_argument(coin_type.to_string())
}

/// `managed_coin::mint<Coin>(receiver, amount)`, signed by the coin's owner.
pub fn mint_coin(coin_type: &CoinType, receiver: AccountAddress, amount: u64) -> EntryFunction {
    EntryFunction::new(MINT_FUNCTION)
        .with_type_argument(coin_type.to_string())
        .with_argument(MoveValue::Address(receiver))
        .with_argument(MoveValue::U64(amount))
}

/// Unsigned submission body, as accepted by `/transactions/encode_submission`.
///
/// Integers are strings on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequest {
    pub sender: String,
    pub sequence_number: String,
    pub max_gas_amount: String,
    pub gas_unit_price: String,
    pub expiration_timestamp_secs: String,
    pub payload: Value,
}

impl SubmissionRequest {
    pub fn new(
        transaction: &Transaction,
        sequence_number: u64,
        max_gas_amount: u64,
        gas_unit_price: u64,
        expiration_timestamp_secs: u64,
    ) -> Self {
        Self {
            sender: transaction.sender.to_hex_literal(),
            sequence_number: sequence_number.to_string(),
            max_gas_amount: max_gas_amount.to_string(),
            gas_unit_price: gas_unit_price.to_string(),
            expiration_timestamp_secs: expiration_timestamp_secs.to_string(),
            payload: entry_function_payload(&transaction.payload),
        }
    }

    /// Attach a signature over the node-provided signing message.
    pub fn sign(self, signer: &Identity, signing_message: &[u8]) -> SignedSubmission {
        let signature = signer.sign(signing_message);
        SignedSubmission {
            request: self,
            signature: Ed25519Authenticator {
                kind: "ed25519_signature",
                public_key: signer.public_key_hex(),
                signature: format!("0x{}", hex::encode(signature)),
            },
        }
    }
}

/// Submission body plus its authenticator, as accepted by `POST /transactions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignedSubmission {
    #[serde(flatten)]
    pub request: SubmissionRequest,
    pub signature: Ed25519Authenticator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ed25519Authenticator {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub public_key: String,
    pub signature: String,
}

/// JSON form of an entry function payload.
pub fn entry_function_payload(function: &EntryFunction) -> Value {
    json!({
        "type": "entry_function_payload",
        "function": function.function_id,
        "type_arguments": function.type_arguments,
        "arguments": function.arguments.iter().map(MoveValue::to_json).collect::<Vec<_>>(),
    })
}

/// Response to an accepted submission.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingTransaction {
    pub hash: String,
}

/// Transaction as returned by `/transactions/by_hash/{hash}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionView {
    #[serde(rename = "type")]
    pub kind: String,
    pub hash: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub vm_status: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl TransactionView {
    pub fn is_pending(&self) -> bool {
        self.kind == "pending_transaction"
    }
}

/// Error body returned by the node for rejected requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub vm_error_code: Option<u64>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if let Some(code) = &self.error_code {
            write!(f, " ({})", code)?;
        }
        if let Some(vm_code) = self.vm_error_code {
            write!(f, " [vm_error_code {}]", vm_code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    fn coin() -> CoinType {
        CoinType::new("0xA1".parse().unwrap(), "spud_coin", "SpudCoin")
    }

    #[test]
    fn test_publish_payload() {
        let module = CompiledModule::new(vec![0x01], vec![vec![0xa1], vec![0xb2]]).unwrap();
        let payload = entry_function_payload(&publish_package(&module));
        assert_eq!(payload["function"], PUBLISH_PACKAGE_FUNCTION);
        assert_eq!(payload["arguments"], json!(["0x01", ["0xa1", "0xb2"]]));
        assert_eq!(payload["type_arguments"], json!([]));
    }

    #[test]
    fn test_mint_payload() {
        let receiver: AccountAddress = "0xA1".parse().unwrap();
        let payload = entry_function_payload(&mint_coin(&coin(), receiver, 1_000_000_000_000_000));
        assert_eq!(payload["function"], MINT_FUNCTION);
        assert_eq!(payload["type_arguments"], json!([coin().to_string()]));
        assert_eq!(
            payload["arguments"],
            json!([receiver.to_hex_literal(), "1000000000000000"])
        );
    }

    #[test]
    fn test_register_payload_has_no_arguments() {
        let function = register_coin(&coin());
        assert!(function.arguments.is_empty());
        assert_eq!(function.type_arguments, vec![coin().to_string()]);
    }

    #[test]
    fn test_signed_submission_shape() {
        let identity = Identity::generate();
        let transaction = Transaction {
            sender: identity.address(),
            payload: register_coin(&coin()),
        };
        let request = SubmissionRequest::new(&transaction, 4, 200_000, 100, 1_700_000_000);
        let signed = request.sign(&identity, b"message");

        let body = serde_json::to_value(&signed).unwrap();
        assert_eq!(body["sender"], identity.address().to_hex_literal());
        assert_eq!(body["sequence_number"], "4");
        assert_eq!(body["signature"]["type"], "ed25519_signature");

        let sig_hex = body["signature"]["signature"].as_str().unwrap();
        let mut sig = [0u8; 64];
        hex::decode_to_slice(sig_hex.trim_start_matches("0x"), &mut sig).unwrap();
        let key = VerifyingKey::from_bytes(&identity.public_key()).unwrap();
        assert!(key.verify(b"message", &Signature::from_bytes(&sig)).is_ok());
    }

    #[test]
    fn test_api_error_display() {
        let err: ApiError = serde_json::from_str(
            r#"{"message":"Invalid transaction","error_code":"vm_error","vm_error_code":3}"#,
        )
        .unwrap();
        assert_eq!(err.to_string(), "Invalid transaction (vm_error) [vm_error_code 3]");
    }
}
