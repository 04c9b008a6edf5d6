//! coin-deployer
//!
//! Publishes the SpudCoin Move package from a local account, registers the
//! account for the coin, mints to it and reports the resulting balance.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI ──▶ config ──▶ Deployer ─┬─▶ account     (identity file, Ed25519)
//!                                ├─▶ compiler    (aptos move build-publish-payload)
//!                                ├─▶ blockchain  (faucet + node REST API)
//!                                └─▶ journal     (in-flight transaction record)
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use coin_deployer::account::{AccountProvider, IdentitySource, IdentityStore};
use coin_deployer::blockchain::{AccountAddress, ChainClient, CoinType, RestClient};
use coin_deployer::compiler::AptosCliCompiler;
use coin_deployer::config::loader::{finish, read_config, select_network, NETWORK_ENV_VAR};
use coin_deployer::deploy::{Deployer, Journal};
use coin_deployer::lifecycle;
use coin_deployer::observability::logging::init_logging;
use coin_deployer::DeployerConfig;

/// Conventional exit status after SIGINT.
const INTERRUPTED_EXIT: u8 = 130;

#[derive(Parser)]
#[command(name = "coin-deployer", version)]
#[command(about = "Deploy, register and mint a Move managed coin", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Network to use (devnet, testnet, mainnet, local, custom).
    #[arg(short, long)]
    network: Option<String>,

    /// Forget a previous run's unconfirmed transaction and start over.
    #[arg(long)]
    discard_journal: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: fund, compile, publish, register, mint
    Deploy,
    /// Print the coin balance of an account
    Balance {
        /// Holder to query. Defaults to the deployer account.
        #[arg(long)]
        address: Option<AccountAddress>,
    },
    /// Print the deployer account address, creating the identity if needed
    Address,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = read_config(cli.config.as_deref())?;
    let env_network = IdentityStore::new(&config.identity.path).lookup(NETWORK_ENV_VAR)?;
    let ignored = select_network(&mut config, env_network.as_deref(), cli.network.as_deref());
    let config = finish(config)?;

    init_logging(&config.observability)?;
    for skipped in &ignored {
        warn!(origin = skipped.origin, name = %skipped.name, reason = %skipped.reason, "Ignoring network override");
    }

    let node_url = config.network.node_url().unwrap_or_default();
    info!(
        network = %config.network.network,
        node_url = %node_url,
        "coin-deployer v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    match cli.command.unwrap_or(Command::Deploy) {
        Command::Deploy => deploy(&config, cli.discard_journal).await,
        Command::Balance { address } => balance(&config, address).await,
        Command::Address => {
            let identity = AccountProvider::new(&config.identity.path).obtain_identity()?;
            println!("{}", identity.address());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn deploy(config: &DeployerConfig, discard_journal: bool) -> Result<ExitCode, Box<dyn Error>> {
    let chain = Arc::new(RestClient::new(&config.network)?);
    let identities = Arc::new(AccountProvider::new(&config.identity.path));
    let compiler = Arc::new(AptosCliCompiler::from_config(&config.compiler));
    let deployer = Deployer::new(config, identities, compiler, chain)?;

    if discard_journal {
        if let Some(previous) = deployer.journal().map(Journal::discard).transpose()?.flatten() {
            warn!(
                previous_run = %previous.run_id,
                state = %previous.state,
                in_flight = ?previous.in_flight,
                "Discarded deployment journal"
            );
        }
    }

    tokio::select! {
        outcome = deployer.run() => match outcome {
            Ok(report) => {
                println!("{}", report);
                Ok(ExitCode::SUCCESS)
            }
            Err(failure) => {
                error!(state = %failure.state, error = %failure.error, "Deployment failed");
                eprintln!("{}", failure);
                Ok(ExitCode::FAILURE)
            }
        },
        _ = lifecycle::interrupted() => {
            report_interruption(deployer.journal());
            Ok(ExitCode::from(INTERRUPTED_EXIT))
        }
    }
}

/// Tell the operator what may still land on chain.
fn report_interruption(journal: Option<&Journal>) {
    let record = journal.and_then(|journal| match journal.load() {
        Ok(record) => record,
        Err(error) => {
            warn!(error = %error, "Could not read deployment journal");
            None
        }
    });

    match record.as_ref().and_then(|record| record.in_flight.as_ref()) {
        Some(in_flight) => {
            warn!(step = %in_flight.transition, tx_hash = %in_flight.hash, "Interrupted with transaction in flight");
            eprintln!(
                "interrupted: {} transaction {} was submitted but not confirmed; its outcome is unknown. \
                 Check it on chain, then rerun with --discard-journal.",
                in_flight.transition, in_flight.hash
            );
        }
        None => {
            let state = record.map(|r| r.state.to_string()).unwrap_or_else(|| "unknown".to_string());
            eprintln!("interrupted in state {}; no transaction was in flight", state);
        }
    }
}

async fn balance(config: &DeployerConfig, holder: Option<AccountAddress>) -> Result<ExitCode, Box<dyn Error>> {
    let owner = AccountProvider::new(&config.identity.path).obtain_identity()?.address();
    let coin_type = CoinType::new(owner, &config.token.module_name, &config.token.struct_name);
    let holder = holder.unwrap_or(owner);

    let chain = RestClient::new(&config.network)?;
    let balance = chain.query_balance(holder, &coin_type).await?;
    info!(address = %holder, coin_type = %coin_type, balance, "Balance queried");
    println!("{}", balance);
    Ok(ExitCode::SUCCESS)
}
