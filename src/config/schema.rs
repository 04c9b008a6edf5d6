//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a deployment.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the deployer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DeployerConfig {
    /// Target network and node settings.
    pub network: NetworkConfig,

    /// Token package and amounts.
    pub token: TokenConfig,

    /// Identity file location.
    pub identity: IdentityConfig,

    /// External compiler settings.
    pub compiler: CompilerConfig,

    /// Deployment journal settings.
    pub journal: JournalConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Named networks with well-known endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
    Local,
    /// Endpoints come entirely from `node_url` / `faucet_url`.
    Custom,
}

impl Network {
    pub fn default_node_url(&self) -> Option<&'static str> {
        match self {
            Network::Devnet => Some("https://fullnode.devnet.aptoslabs.com/v1"),
            Network::Testnet => Some("https://fullnode.testnet.aptoslabs.com/v1"),
            Network::Mainnet => Some("https://fullnode.mainnet.aptoslabs.com/v1"),
            Network::Local => Some("http://127.0.0.1:8080/v1"),
            Network::Custom => None,
        }
    }

    /// Mainnet has no faucet.
    pub fn default_faucet_url(&self) -> Option<&'static str> {
        match self {
            Network::Devnet => Some("https://faucet.devnet.aptoslabs.com"),
            Network::Testnet => Some("https://faucet.testnet.aptoslabs.com"),
            Network::Local => Some("http://127.0.0.1:8081"),
            Network::Mainnet | Network::Custom => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
            Network::Local => "local",
            Network::Custom => "custom",
        };
        f.write_str(name)
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            "local" | "localnet" => Ok(Network::Local),
            "custom" => Ok(Network::Custom),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Named network.
    pub network: Network,

    /// Node REST endpoint override (including the `/v1` prefix).
    pub node_url: Option<String>,

    /// Faucet endpoint override.
    pub faucet_url: Option<String>,

    /// Per-request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Upper bound on a single confirmation wait, in seconds.
    pub confirmation_timeout_secs: u64,

    /// First delay between confirmation polls.
    pub poll_interval_ms: u64,

    /// Cap on the delay between confirmation polls.
    pub max_poll_interval_ms: u64,

    /// Gas limit for submitted transactions.
    pub max_gas_amount: u64,

    /// Transaction expiry, relative to submission time.
    pub expiration_secs: u64,
}

impl NetworkConfig {
    pub fn node_url(&self) -> Option<String> {
        self.node_url
            .clone()
            .or_else(|| self.network.default_node_url().map(str::to_string))
    }

    pub fn faucet_url(&self) -> Option<String> {
        self.faucet_url
            .clone()
            .or_else(|| self.network.default_faucet_url().map(str::to_string))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: Network::Devnet,
            node_url: None,
            faucet_url: None,
            rpc_timeout_secs: 10,
            confirmation_timeout_secs: 60,
            poll_interval_ms: 500,
            max_poll_interval_ms: 4_000,
            max_gas_amount: 200_000,
            expiration_secs: 600,
        }
    }
}

/// Token package configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Move package directory.
    pub package_dir: PathBuf,

    /// Where the compiler writes the publish payload.
    pub artifact_path: PathBuf,

    /// Named address in `Move.toml` bound to the deployer's address.
    pub named_address: String,

    /// Module declaring the coin struct.
    pub module_name: String,

    /// Coin struct name.
    pub struct_name: String,

    /// Decimal precision of the coin.
    pub decimals: u8,

    /// Faucet request in base units of the native coin. Zero skips funding.
    pub fund_amount: u64,

    /// Whole tokens to mint; scaled by `decimals`.
    pub mint_amount: u64,
}

impl TokenConfig {
    /// Mint amount in base units, or `None` on overflow.
    pub fn mint_base_units(&self) -> Option<u64> {
        10u64
            .checked_pow(u32::from(self.decimals))?
            .checked_mul(self.mint_amount)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            package_dir: PathBuf::from("move/spudCoin"),
            artifact_path: PathBuf::from("move/spudCoin/spudCoin.json"),
            named_address: "SpudCoin".to_string(),
            module_name: "spud_coin".to_string(),
            struct_name: "SpudCoin".to_string(),
            decimals: 9,
            fund_amount: 100_000_000 * 1_000_000_000,
            mint_amount: 1_000_000,
        }
    }
}

/// Identity file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub path: PathBuf,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".env"),
        }
    }
}

/// External compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Compiler binary (looked up on `PATH` when relative).
    pub binary: PathBuf,

    /// Extra arguments appended to every invocation.
    pub extra_args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("aptos"),
            extra_args: Vec::new(),
        }
    }
}

/// Deployment journal configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(".deploy-journal.json"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
