//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! deployer.toml (optional)
//!     → loader.rs (parse & deserialize, APTOS_NETWORK / --network override)
//!     → validation.rs (semantic checks)
//!     → DeployerConfig (validated, immutable)
//!     → passed by reference into RestClient and Deployer constructors
//! ```
//!
//! # Design Decisions
//! - Config is built once at startup; there is no global client
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    CompilerConfig, DeployerConfig, IdentityConfig, JournalConfig, Network, NetworkConfig,
    ObservabilityConfig, TokenConfig,
};
