//! In-process mock of an Aptos node and faucet for integration tests.
//!
//! The node keeps a tiny ledger: accounts with sequence numbers, published
//! packages, coin stores and transactions. Submissions must carry a valid
//! Ed25519 signature over the bytes returned by `encode_submission`.
//! Transactions report `pending_transaction` for a few polls before they
//! commit, and their effects apply at commit time.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use coin_deployer::account::identity::derive_address;
use coin_deployer::config::{Network, NetworkConfig};

const COIN_STORE_PREFIX: &str = "0x1::coin::CoinStore<";

/// How the node treats submissions of a given entry function.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Refuse the submission with HTTP 400.
    Reject(String),
    /// Commit with `success: false` and this VM status.
    Abort(String),
    /// Stay pending forever.
    Hang,
}

#[derive(Debug, Clone)]
pub struct LedgerTransaction {
    sender: String,
    function: String,
    type_arguments: Vec<String>,
    arguments: Vec<Value>,
    polls_remaining: u32,
    committed: Option<(bool, String, u64)>,
    hang: bool,
    abort: Option<String>,
}

#[derive(Debug, Default)]
pub struct Ledger {
    /// Polls answered with `pending_transaction` before a transaction commits.
    pub pending_polls: u32,
    pub faults: HashMap<String, Fault>,
    pub faucet_returns_nothing: bool,
    /// Transaction lookups answered with 429 before the node serves them.
    pub rate_limited_polls: u32,

    pub sequence_numbers: HashMap<String, u64>,
    pub published: HashSet<String>,
    pub coin_stores: HashMap<(String, String), u64>,
    pub faucet_requests: Vec<(String, u64)>,
    /// Entry functions of accepted submissions, in order.
    pub submitted: Vec<String>,
    pub transactions: HashMap<String, LedgerTransaction>,
    pub version: u64,
}

impl Ledger {
    fn next_hash(&mut self) -> String {
        self.version += 1;
        format!("0x{:064x}", self.version)
    }

    /// Apply a transaction's effects, returning `(success, vm_status)`.
    fn execute(&mut self, tx: &LedgerTransaction) -> (bool, String) {
        if let Some(status) = &tx.abort {
            return (false, status.clone());
        }
        match tx.function.as_str() {
            "0x1::aptos_account::fund" => (true, "Executed successfully".to_string()),
            "0x1::code::publish_package_txn" => {
                if !self.published.insert(tx.sender.clone()) {
                    return (false, "Move abort in 0x1::code: EMODULE_ALREADY_EXISTS".to_string());
                }
                (true, "Executed successfully".to_string())
            }
            "0x1::managed_coin::register" => {
                let coin = tx.type_arguments.first().cloned().unwrap_or_default();
                let owner = coin.split("::").next().unwrap_or_default().to_string();
                if !self.published.contains(&owner) {
                    return (false, "Move abort in 0x1::coin: ECOIN_INFO_NOT_PUBLISHED".to_string());
                }
                let key = (tx.sender.clone(), coin);
                if self.coin_stores.contains_key(&key) {
                    return (false, "Move abort in 0x1::coin: ECOIN_STORE_ALREADY_PUBLISHED".to_string());
                }
                self.coin_stores.insert(key, 0);
                (true, "Executed successfully".to_string())
            }
            "0x1::managed_coin::mint" => {
                let coin = tx.type_arguments.first().cloned().unwrap_or_default();
                let receiver = tx.arguments.first().and_then(Value::as_str).unwrap_or_default();
                let amount: u64 = tx
                    .arguments
                    .get(1)
                    .and_then(Value::as_str)
                    .and_then(|a| a.parse().ok())
                    .unwrap_or_default();
                match self.coin_stores.get_mut(&(receiver.to_string(), coin)) {
                    Some(balance) => {
                        *balance += amount;
                        (true, "Executed successfully".to_string())
                    }
                    None => (false, "Move abort in 0x1::coin: ECOIN_STORE_NOT_PUBLISHED".to_string()),
                }
            }
            other => (false, format!("FUNCTION_RESOLUTION_FAILURE: {}", other)),
        }
    }
}

type Shared = Arc<Mutex<Ledger>>;

/// Running mock node.
pub struct MockNode {
    pub base_url: String,
    pub ledger: Shared,
}

impl MockNode {
    pub async fn start(ledger: Ledger) -> Self {
        let ledger = Arc::new(Mutex::new(ledger));
        let app = Router::new()
            .route("/fund", post(fund))
            .route("/v1/accounts/{address}", get(account))
            .route("/v1/accounts/{address}/resource/{resource}", get(resource))
            .route("/v1/estimate_gas_price", get(|| async { Json(json!({ "gas_estimate": 100 })) }))
            .route("/v1/transactions/encode_submission", post(encode_submission))
            .route("/v1/transactions", post(submit))
            .route("/v1/transactions/by_hash/{hash}", get(by_hash))
            .with_state(ledger.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            ledger,
        }
    }

    /// Network settings pointing at this node, with fast polling.
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            network: Network::Local,
            node_url: Some(format!("{}/v1", self.base_url)),
            faucet_url: Some(self.base_url.clone()),
            rpc_timeout_secs: 2,
            confirmation_timeout_secs: 5,
            poll_interval_ms: 10,
            max_poll_interval_ms: 50,
            ..NetworkConfig::default()
        }
    }

    pub fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap()
    }
}

/// Fast confirmation limit for tests that expect a timeout.
pub const SHORT_CONFIRMATION: Duration = Duration::from_millis(300);

fn api_error(status: StatusCode, message: &str, code: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message, "error_code": code, "vm_error_code": null })))
}

async fn fund(State(ledger): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut ledger = ledger.lock().unwrap();
    let address = body["address"].as_str().unwrap_or_default().to_string();
    let amount = body["amount"].as_u64().unwrap_or_default();
    ledger.faucet_requests.push((address.clone(), amount));
    if ledger.faucet_returns_nothing {
        return Json(json!({ "txn_hashes": [] }));
    }

    ledger.sequence_numbers.entry(address).or_insert(0);
    let hash = ledger.next_hash();
    let polls = ledger.pending_polls;
    ledger.transactions.insert(
        hash.clone(),
        LedgerTransaction {
            sender: "0x1".to_string(),
            function: "0x1::aptos_account::fund".to_string(),
            type_arguments: Vec::new(),
            arguments: Vec::new(),
            polls_remaining: polls,
            committed: None,
            hang: false,
            abort: None,
        },
    );
    Json(json!({ "txn_hashes": [hash] }))
}

async fn account(
    State(ledger): State<Shared>,
    Path(address): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let ledger = ledger.lock().unwrap();
    match ledger.sequence_numbers.get(&address) {
        Some(seq) => Ok(Json(json!({
            "sequence_number": seq.to_string(),
            "authentication_key": address,
        }))),
        None => Err(api_error(StatusCode::NOT_FOUND, "Account not found", "account_not_found")),
    }
}

async fn resource(
    State(ledger): State<Shared>,
    Path((address, resource)): Path<(String, String)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let not_found = || api_error(StatusCode::NOT_FOUND, "Resource not found", "resource_not_found");
    let coin = resource
        .strip_prefix(COIN_STORE_PREFIX)
        .and_then(|rest| rest.strip_suffix('>'))
        .ok_or_else(not_found)?;
    let ledger = ledger.lock().unwrap();
    let value = ledger
        .coin_stores
        .get(&(address, coin.to_string()))
        .ok_or_else(not_found)?;
    Ok(Json(json!({
        "type": resource,
        "data": { "coin": { "value": value.to_string() }, "frozen": false }
    })))
}

/// Canonical bytes a submission is signed over.
fn signing_bytes(request: &Value) -> Vec<u8> {
    serde_json::to_vec(request).unwrap()
}

async fn encode_submission(Json(request): Json<Value>) -> Json<String> {
    Json(format!("0x{}", hex::encode(signing_bytes(&request))))
}

fn verify_signature(submission: &Value) -> Result<String, String> {
    let mut request = submission.clone();
    let signature = request
        .as_object_mut()
        .and_then(|obj| obj.remove("signature"))
        .ok_or("missing signature")?;
    if signature["type"] != "ed25519_signature" {
        return Err("unsupported authenticator".to_string());
    }

    let decode = |field: &str| {
        let raw = signature[field].as_str().unwrap_or_default();
        hex::decode(raw.trim_start_matches("0x")).map_err(|e| e.to_string())
    };
    let public_key: [u8; 32] = decode("public_key")?.try_into().map_err(|_| "bad public key length")?;
    let signature: [u8; 64] = decode("signature")?.try_into().map_err(|_| "bad signature length")?;

    let key = VerifyingKey::from_bytes(&public_key).map_err(|e| e.to_string())?;
    key.verify(&signing_bytes(&request), &Signature::from_bytes(&signature))
        .map_err(|e| e.to_string())?;

    let sender = request["sender"].as_str().unwrap_or_default();
    if derive_address(&public_key).to_hex_literal() != sender {
        return Err("public key does not control sender".to_string());
    }
    Ok(sender.to_string())
}

async fn submit(
    State(ledger): State<Shared>,
    Json(submission): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let sender = verify_signature(&submission)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e, "invalid_signature"))?;

    let payload = &submission["payload"];
    let function = payload["function"].as_str().unwrap_or_default().to_string();
    let mut ledger = ledger.lock().unwrap();

    let expected_seq = ledger.sequence_numbers.get(&sender).copied().unwrap_or(0);
    let seq: u64 = submission["sequence_number"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or(u64::MAX);
    if seq != expected_seq {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid transaction: SEQUENCE_NUMBER_TOO_OLD",
            "vm_error",
        ));
    }

    let fault = ledger.faults.get(&function).cloned();
    if let Some(Fault::Reject(message)) = &fault {
        return Err(api_error(StatusCode::BAD_REQUEST, message, "vm_error"));
    }

    ledger.sequence_numbers.insert(sender.clone(), seq + 1);
    ledger.submitted.push(function.clone());
    let hash = ledger.next_hash();
    let polls = ledger.pending_polls;
    ledger.transactions.insert(
        hash.clone(),
        LedgerTransaction {
            sender,
            function,
            type_arguments: payload["type_arguments"]
                .as_array()
                .map(|args| args.iter().filter_map(|a| a.as_str().map(String::from)).collect())
                .unwrap_or_default(),
            arguments: payload["arguments"].as_array().cloned().unwrap_or_default(),
            polls_remaining: polls,
            committed: None,
            hang: matches!(fault, Some(Fault::Hang)),
            abort: match fault {
                Some(Fault::Abort(status)) => Some(status),
                _ => None,
            },
        },
    );

    Ok((StatusCode::ACCEPTED, Json(json!({ "hash": hash, "type": "pending_transaction" }))))
}

async fn by_hash(
    State(ledger): State<Shared>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut ledger = ledger.lock().unwrap();
    if ledger.rate_limited_polls > 0 {
        ledger.rate_limited_polls -= 1;
        return Err(api_error(StatusCode::TOO_MANY_REQUESTS, "rate limited", "rate_limited"));
    }
    let Some(mut tx) = ledger.transactions.get(&hash).cloned() else {
        return Err(api_error(StatusCode::NOT_FOUND, "Transaction not found", "transaction_not_found"));
    };

    if tx.committed.is_none() {
        if tx.hang || tx.polls_remaining > 0 {
            tx.polls_remaining = tx.polls_remaining.saturating_sub(1);
            ledger.transactions.insert(hash.clone(), tx);
            return Ok(Json(json!({ "type": "pending_transaction", "hash": hash })));
        }
        let (success, vm_status) = ledger.execute(&tx);
        tx.committed = Some((success, vm_status, ledger.version));
        ledger.transactions.insert(hash.clone(), tx.clone());
    }

    let (success, vm_status, version) = tx.committed.unwrap_or_default();
    Ok(Json(json!({
        "type": "user_transaction",
        "hash": hash,
        "success": success,
        "vm_status": vm_status,
        "version": version.to_string(),
    })))
}
