//! Chain client with timeout and error handling.
//!
//! # Responsibilities
//! - Request test funds from the faucet
//! - Build, sign locally and submit entry function transactions
//! - Wait for commits with a bounded timeout
//! - Query coin balances

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, timeout};

use crate::account::Identity;
use crate::blockchain::transaction::{
    self, ApiError, PendingTransaction, SubmissionRequest, TransactionView,
};
use crate::blockchain::types::{
    AccountAddress, BlockchainError, BlockchainResult, CoinType, EntryFunction, NetworkConfig,
    Transaction, TransactionReceipt, TxHash,
};
use crate::compiler::CompiledModule;
use crate::resilience::PollBackoff;

/// Uniform interface over the chain operations a deployment needs.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Request test-network funds. Returns one receipt per faucet transaction.
    async fn fund(&self, address: AccountAddress, amount: u64) -> BlockchainResult<Vec<TransactionReceipt>>;

    /// Publish a compiled package from `account`.
    async fn publish_module(
        &self,
        account: &Identity,
        module: &CompiledModule,
    ) -> BlockchainResult<TransactionReceipt> {
        self.build_sign_submit(account, transaction::publish_package(module)).await
    }

    /// Build a transaction for `function`, sign it as `sender` and submit it.
    async fn build_sign_submit(
        &self,
        sender: &Identity,
        function: EntryFunction,
    ) -> BlockchainResult<TransactionReceipt>;

    /// Suspend until `hash` commits, fails, or `limit` elapses.
    async fn wait_for_confirmation(
        &self,
        hash: &TxHash,
        limit: Duration,
    ) -> BlockchainResult<TransactionReceipt>;

    /// Balance of `coin_type` at `address`. Zero when the account holds no store.
    async fn query_balance(&self, address: AccountAddress, coin_type: &CoinType) -> BlockchainResult<u64>;
}

/// [`ChainClient`] over the node REST API and faucet.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    node_url: String,
    faucet_url: Option<String>,
    config: NetworkConfig,
    timeout_duration: Duration,
}

#[derive(Debug, Deserialize)]
struct AccountResource {
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct GasEstimate {
    gas_estimate: u64,
}

#[derive(Debug, Deserialize)]
struct FundResponse {
    txn_hashes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CoinStoreResource {
    data: CoinStoreData,
}

#[derive(Debug, Deserialize)]
struct CoinStoreData {
    coin: CoinValue,
}

#[derive(Debug, Deserialize)]
struct CoinValue {
    value: String,
}

impl RestClient {
    /// Create a new client.
    ///
    /// No request is made; an unreachable node surfaces on first use.
    pub fn new(config: &NetworkConfig) -> BlockchainResult<Self> {
        let node_url = config.node_url().ok_or_else(|| {
            BlockchainError::NotAvailable(format!("no node URL for network '{}'", config.network))
        })?;
        let node_url = normalize_url(&node_url)?;
        let faucet_url = config.faucet_url().map(|u| normalize_url(&u)).transpose()?;

        let http = reqwest::Client::builder()
            .timeout(config.rpc_timeout())
            .build()
            .map_err(|e| BlockchainError::Rpc(format!("failed to build HTTP client: {}", e)))?;

        tracing::info!(
            network = %config.network,
            node_url = %node_url,
            faucet = faucet_url.as_deref().unwrap_or("none"),
            "Chain client initialized"
        );

        Ok(Self {
            http,
            node_url,
            faucet_url,
            config: config.clone(),
            timeout_duration: config.rpc_timeout(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    /// Send a request and decode a JSON body. `Ok(None)` on 404.
    async fn request_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> BlockchainResult<Option<T>> {
        let fut = async {
            let response = request
                .send()
                .await
                .map_err(|e| BlockchainError::Rpc(e.to_string()))?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(rejection(status, response).await);
            }
            response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|e| BlockchainError::InvalidResponse(e.to_string()))
        };

        match timeout(self.timeout_duration, fut).await {
            Ok(result) => result,
            Err(_) => Err(BlockchainError::Timeout(self.config.rpc_timeout_secs)),
        }
    }

    /// Sequence number for the next transaction from `address`.
    pub async fn sequence_number(&self, address: AccountAddress) -> BlockchainResult<u64> {
        let url = format!("{}/accounts/{}", self.node_url, address);
        match self.request_json::<AccountResource>(self.http.get(url)).await? {
            Some(account) => account.sequence_number.parse().map_err(|e| {
                BlockchainError::InvalidResponse(format!("sequence_number: {}", e))
            }),
            // Not created on-chain yet.
            None => Ok(0),
        }
    }

    /// Current gas unit price estimate.
    pub async fn estimate_gas_price(&self) -> BlockchainResult<u64> {
        let url = format!("{}/estimate_gas_price", self.node_url);
        self.request_json::<GasEstimate>(self.http.get(url))
            .await?
            .map(|g| g.gas_estimate)
            .ok_or_else(|| BlockchainError::InvalidResponse("gas estimate not found".to_string()))
    }

    /// Ask the node for the bytes to sign for `request`.
    async fn signing_message(&self, request: &SubmissionRequest) -> BlockchainResult<Vec<u8>> {
        let url = format!("{}/transactions/encode_submission", self.node_url);
        let encoded: String = self
            .request_json(self.http.post(url).json(request))
            .await?
            .ok_or_else(|| BlockchainError::InvalidResponse("encode_submission not found".to_string()))?;
        hex::decode(encoded.trim_start_matches("0x"))
            .map_err(|e| BlockchainError::InvalidResponse(format!("signing message: {}", e)))
    }

    fn expiration_timestamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        now + self.config.expiration_secs
    }
}

#[async_trait]
impl ChainClient for RestClient {
    async fn fund(&self, address: AccountAddress, amount: u64) -> BlockchainResult<Vec<TransactionReceipt>> {
        let faucet = self.faucet_url.as_ref().ok_or_else(|| {
            BlockchainError::Funding(format!("network '{}' has no faucet", self.config.network))
        })?;
        let url = format!("{}/fund", faucet);
        let body = json!({ "address": address.to_hex_literal(), "amount": amount });

        let response: FundResponse = self
            .request_json(self.http.post(url).json(&body))
            .await
            .map_err(|e| BlockchainError::Funding(e.to_string()))?
            .ok_or_else(|| BlockchainError::Funding("faucet endpoint not found".to_string()))?;

        if response.txn_hashes.is_empty() {
            return Err(BlockchainError::Funding(
                "faucet accepted the request but returned no transactions".to_string(),
            ));
        }

        tracing::info!(address = %address, amount, transactions = response.txn_hashes.len(), "Faucet funded account");
        Ok(response
            .txn_hashes
            .into_iter()
            .map(TransactionReceipt::pending)
            .collect())
    }

    async fn build_sign_submit(
        &self,
        sender: &Identity,
        function: EntryFunction,
    ) -> BlockchainResult<TransactionReceipt> {
        let transaction = Transaction {
            sender: sender.address(),
            payload: function,
        };

        let sequence_number = self.sequence_number(transaction.sender).await?;
        let gas_unit_price = self.estimate_gas_price().await?;
        let request = SubmissionRequest::new(
            &transaction,
            sequence_number,
            self.config.max_gas_amount,
            gas_unit_price,
            self.expiration_timestamp(),
        );

        let message = self.signing_message(&request).await?;
        let signed = request.sign(sender, &message);

        let url = format!("{}/transactions", self.node_url);
        let pending: PendingTransaction = self
            .request_json(self.http.post(url).json(&signed))
            .await?
            .ok_or_else(|| BlockchainError::InvalidResponse("submit endpoint not found".to_string()))?;

        tracing::debug!(
            function = %transaction.payload.function_id,
            sender = %transaction.sender,
            sequence_number,
            tx_hash = %pending.hash,
            "Transaction submitted"
        );
        Ok(TransactionReceipt::pending(pending.hash))
    }

    async fn wait_for_confirmation(
        &self,
        hash: &TxHash,
        limit: Duration,
    ) -> BlockchainResult<TransactionReceipt> {
        let url = format!("{}/transactions/by_hash/{}", self.node_url, hash);
        let mut backoff = PollBackoff::new(
            Duration::from_millis(self.config.poll_interval_ms),
            Duration::from_millis(self.config.max_poll_interval_ms),
        );

        let result = timeout(limit, async {
            loop {
                match self.request_json::<TransactionView>(self.http.get(&url)).await {
                    Ok(Some(view)) if view.is_pending() => {
                        tracing::debug!(tx_hash = %hash, "Transaction pending");
                    }
                    Ok(Some(view)) => {
                        let version = view.version.as_deref().and_then(|v| v.parse().ok());
                        return match view.success {
                            Some(true) => Ok(TransactionReceipt::confirmed(view.hash, version, view.vm_status)),
                            _ => Err(BlockchainError::TransactionFailed {
                                hash: Some(hash.clone()),
                                reason: view.vm_status.unwrap_or_else(|| "unknown VM status".to_string()),
                            }),
                        };
                    }
                    Ok(None) => {
                        tracing::debug!(tx_hash = %hash, "Transaction not yet visible");
                    }
                    // Only a committed view decides the outcome; a failed poll
                    // says nothing about the transaction, so poll again until
                    // the deadline.
                    Err(e) => {
                        tracing::warn!(tx_hash = %hash, error = %e, "Confirmation poll failed");
                    }
                }
                sleep(backoff.next_delay()).await;
            }
        })
        .await;

        match result {
            Ok(receipt) => receipt,
            Err(_) => Err(BlockchainError::ConfirmationTimeout {
                hash: hash.clone(),
                timeout: limit,
            }),
        }
    }

    async fn query_balance(&self, address: AccountAddress, coin_type: &CoinType) -> BlockchainResult<u64> {
        let url = format!(
            "{}/accounts/{}/resource/0x1::coin::CoinStore<{}>",
            self.node_url, address, coin_type
        );
        match self.request_json::<CoinStoreResource>(self.http.get(url)).await {
            Ok(Some(store)) => store
                .data
                .coin
                .value
                .parse()
                .map_err(|e| BlockchainError::Query(format!("coin value: {}", e))),
            Ok(None) => Ok(0),
            Err(e) => Err(BlockchainError::Query(e.to_string())),
        }
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("network", &self.config.network)
            .field("node_url", &self.node_url)
            .field("faucet_url", &self.faucet_url)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

fn normalize_url(raw: &str) -> BlockchainResult<String> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| BlockchainError::NotAvailable(format!("invalid URL '{}': {}", raw, e)))?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Map a non-success HTTP response to an error.
///
/// 4xx means the node looked at the request and refused it, except 408 and
/// 429 which say nothing about the request itself. Those and 5xx are treated
/// as transport trouble.
async fn rejection(status: StatusCode, response: reqwest::Response) -> BlockchainError {
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.to_string())
        .unwrap_or(body);
    classify_status(status, detail)
}

fn classify_status(status: StatusCode, detail: String) -> BlockchainError {
    let reason = format!("HTTP {}: {}", status.as_u16(), detail);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => BlockchainError::Rpc(reason),
        s if s.is_client_error() => BlockchainError::TransactionFailed { hash: None, reason },
        _ => BlockchainError::Rpc(reason),
    }
}
