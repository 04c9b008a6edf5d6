//! Deploy a Move managed coin to an Aptos network, then register and mint it.

pub mod account;
pub mod blockchain;
pub mod compiler;
pub mod config;
pub mod deploy;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::DeployerConfig;
pub use deploy::{DeployError, Deployer, DeploymentReport, PipelineFailure};
