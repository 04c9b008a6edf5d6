//! Deployment orchestrator.
//!
//! Each [`Stage`] owns exactly what the following step needs, so a later
//! step cannot run without the outputs of the earlier ones.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::account::{Identity, IdentitySource};
use crate::blockchain::transaction;
use crate::blockchain::types::{BlockchainError, BlockchainResult, CoinType, TransactionReceipt, TxHash};
use crate::blockchain::ChainClient;
use crate::compiler::{CompiledModule, ModuleCompiler, NamedAddressBinding};
use crate::config::schema::{DeployerConfig, TokenConfig};
use crate::deploy::journal::{InFlight, Journal, JournalRecord};
use crate::deploy::report::DeploymentReport;
use crate::deploy::state::{DeployState, Transition};
use crate::deploy::{DeployError, PipelineFailure};
use crate::observability::metrics;

/// Values established once the account is known.
struct Session {
    identity: Identity,
    coin_type: CoinType,
    report: DeploymentReport,
}

enum Stage {
    Start,
    Funded(Session),
    Compiled(Session, CompiledModule),
    Published(Session),
    Registered(Session),
    Minted(Session),
    Done(DeploymentReport),
}

impl Stage {
    fn state(&self) -> DeployState {
        match self {
            Stage::Start => DeployState::Start,
            Stage::Funded(_) => DeployState::Funded,
            Stage::Compiled(..) => DeployState::Compiled,
            Stage::Published(_) => DeployState::Published,
            Stage::Registered(_) => DeployState::Registered,
            Stage::Minted(_) => DeployState::Minted,
            Stage::Done(_) => DeployState::Done,
        }
    }
}

/// Runs fund → compile → publish → register → mint → report against the
/// supplied collaborators.
pub struct Deployer {
    identities: Arc<dyn IdentitySource>,
    compiler: Arc<dyn ModuleCompiler>,
    chain: Arc<dyn ChainClient>,
    token: TokenConfig,
    mint_amount: u64,
    confirmation_timeout: Duration,
    journal: Option<Journal>,
    run_id: Uuid,
}

impl Deployer {
    pub fn new(
        config: &DeployerConfig,
        identities: Arc<dyn IdentitySource>,
        compiler: Arc<dyn ModuleCompiler>,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Self, DeployError> {
        let mint_amount = config.token.mint_base_units().ok_or_else(|| {
            DeployError::Amount(format!(
                "{} tokens at {} decimals does not fit in u64",
                config.token.mint_amount, config.token.decimals
            ))
        })?;

        Ok(Self {
            identities,
            compiler,
            chain,
            token: config.token.clone(),
            mint_amount,
            confirmation_timeout: config.network.confirmation_timeout(),
            journal: config
                .journal
                .enabled
                .then(|| Journal::new(&config.journal.path)),
            run_id: Uuid::new_v4(),
        })
    }

    /// Replace the journal chosen from configuration.
    pub fn with_journal(mut self, journal: Option<Journal>) -> Self {
        self.journal = journal;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }

    /// Refuse to start over a transaction whose outcome was never observed.
    pub fn check_prior_run(&self) -> Result<(), DeployError> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let Some(record) = journal.load()? else {
            return Ok(());
        };
        if let Some(in_flight) = record.ambiguous_in_flight() {
            return Err(DeployError::AmbiguousPriorRun {
                transition: in_flight.transition,
                hash: in_flight.hash.clone(),
            });
        }
        if !record.state.is_terminal() {
            info!(
                previous_run = %record.run_id,
                state = %record.state,
                "Previous run halted without pending transactions; starting over"
            );
        }
        Ok(())
    }

    /// Execute the whole pipeline.
    pub async fn run(&self) -> Result<DeploymentReport, PipelineFailure> {
        let span = tracing::info_span!("deploy", run_id = %self.run_id);
        self.drive().instrument(span).await
    }

    async fn drive(&self) -> Result<DeploymentReport, PipelineFailure> {
        self.check_prior_run()
            .map_err(|error| PipelineFailure::new(DeployState::Start, error))?;
        self.write_journal(DeployState::Start, None);

        let mut stage = Stage::Start;
        loop {
            let state = stage.state();
            let next = match self.advance(stage).await {
                Ok(next) => next,
                Err(error) => {
                    warn!(state = %state, error = %error, "Deployment halted");
                    self.record_failure(state, &error);
                    return Err(PipelineFailure::new(state, error));
                }
            };

            let reached = next.state();
            metrics::record_transition(reached);
            self.write_journal(reached, None);
            info!(state = %reached, "State reached");

            stage = match next {
                Stage::Done(report) => return Ok(report),
                other => other,
            };
        }
    }

    async fn advance(&self, stage: Stage) -> Result<Stage, DeployError> {
        match stage {
            Stage::Start => self.fund().await.map(Stage::Funded),
            Stage::Funded(session) => {
                let module = self.compile(&session).await?;
                Ok(Stage::Compiled(session, module))
            }
            Stage::Compiled(mut session, module) => {
                let hash = self
                    .submit(
                        Transition::Publish,
                        self.chain.publish_module(&session.identity, &module),
                    )
                    .await?;
                session.report.publish = Some(hash);
                Ok(Stage::Published(session))
            }
            Stage::Published(mut session) => {
                session.report.balance_before = self.observe_balance(&session, "pre-mint").await;
                let function = transaction::register_coin(&session.coin_type);
                let hash = self
                    .submit(
                        Transition::Register,
                        self.chain.build_sign_submit(&session.identity, function),
                    )
                    .await?;
                session.report.register = Some(hash);
                Ok(Stage::Registered(session))
            }
            Stage::Registered(mut session) => {
                // The receiver is the deployer itself: only it could have registered.
                let receiver = session.identity.address();
                let function = transaction::mint_coin(&session.coin_type, receiver, self.mint_amount);
                let hash = self
                    .submit(
                        Transition::Mint,
                        self.chain.build_sign_submit(&session.identity, function),
                    )
                    .await?;
                session.report.mint = Some(hash);
                Ok(Stage::Minted(session))
            }
            Stage::Minted(mut session) => {
                let after = self.observe_balance(&session, "post-mint").await;
                if let (Some(before), Some(after)) = (session.report.balance_before, after) {
                    if before.checked_add(self.mint_amount) != Some(after) {
                        warn!(
                            before,
                            after,
                            minted = self.mint_amount,
                            "Post-mint balance does not reflect the minted amount"
                        );
                    }
                }
                session.report.balance_after = after;
                Ok(Stage::Done(session.report))
            }
            Stage::Done(report) => Ok(Stage::Done(report)),
        }
    }

    async fn fund(&self) -> Result<Session, DeployError> {
        let identity = self.identities.obtain_identity()?;
        let address = identity.address();
        info!(address = %address, "Deploying from account");

        let coin_type = CoinType::new(address, &self.token.module_name, &self.token.struct_name);
        let mut report = DeploymentReport::new(address, coin_type.clone(), self.mint_amount);

        if self.token.fund_amount == 0 {
            info!("Funding disabled; skipping faucet");
        } else {
            let receipts = self
                .chain
                .fund(address, self.token.fund_amount)
                .await
                .inspect_err(|_| metrics::record_transaction(Transition::Fund, "rejected"))?;
            info!(
                address = %address,
                amount = self.token.fund_amount,
                transactions = receipts.len(),
                "Faucet accepted funding request"
            );
            for receipt in receipts {
                let confirmed = self.confirm(Transition::Fund, receipt).await?;
                report.funding.push(confirmed.hash);
            }
        }

        Ok(Session {
            identity,
            coin_type,
            report,
        })
    }

    async fn compile(&self, session: &Session) -> Result<CompiledModule, DeployError> {
        let binding = NamedAddressBinding::new(&self.token.named_address, session.identity.address());
        info!(
            package = %self.token.package_dir.display(),
            binding = %binding,
            "Compiling package"
        );
        let module = self
            .compiler
            .compile(&self.token.package_dir, &self.token.artifact_path, &[binding])
            .await?;
        info!(
            modules = module.module_count(),
            bytes = module.size(),
            "Package compiled"
        );
        Ok(module)
    }

    /// Await a submission, then its confirmation.
    async fn submit(
        &self,
        transition: Transition,
        submission: impl Future<Output = BlockchainResult<TransactionReceipt>>,
    ) -> Result<TxHash, DeployError> {
        let receipt = submission
            .await
            .inspect_err(|_| metrics::record_transaction(transition, "rejected"))?;
        Ok(self.confirm(transition, receipt).await?.hash)
    }

    async fn confirm(
        &self,
        transition: Transition,
        receipt: TransactionReceipt,
    ) -> Result<TransactionReceipt, DeployError> {
        let hash = receipt.hash;
        info!(step = %transition, tx_hash = %hash, "Transaction submitted; awaiting confirmation");
        self.write_journal(
            transition.source(),
            Some(InFlight {
                transition,
                hash: hash.clone(),
            }),
        );

        let started = Instant::now();
        let outcome = self
            .chain
            .wait_for_confirmation(&hash, self.confirmation_timeout)
            .await;
        metrics::record_confirmation_latency(transition, started.elapsed());

        match outcome {
            Ok(confirmed) => {
                metrics::record_transaction(transition, "committed");
                info!(
                    step = %transition,
                    tx_hash = %confirmed.hash,
                    version = ?confirmed.version,
                    "Transaction confirmed"
                );
                Ok(confirmed)
            }
            Err(error @ BlockchainError::TransactionFailed { .. }) => {
                // Outcome known: nothing is left in flight.
                metrics::record_transaction(transition, "failed");
                self.write_journal(transition.source(), None);
                Err(error.into())
            }
            Err(error) => {
                metrics::record_transaction(transition, "unknown");
                warn!(
                    step = %transition,
                    tx_hash = %hash,
                    "Transaction outcome unknown; it may still commit"
                );
                Err(error.into())
            }
        }
    }

    async fn observe_balance(&self, session: &Session, label: &str) -> Option<u64> {
        let address = session.identity.address();
        match self.chain.query_balance(address, &session.coin_type).await {
            Ok(balance) => {
                info!(
                    address = %address,
                    coin_type = %session.coin_type,
                    balance,
                    "{} balance",
                    label
                );
                Some(balance)
            }
            Err(error) => {
                warn!(error = %error, "{} balance query failed; continuing", label);
                None
            }
        }
    }

    fn write_journal(&self, state: DeployState, in_flight: Option<InFlight>) {
        let Some(journal) = &self.journal else {
            return;
        };
        let mut record = JournalRecord::new(self.run_id, state);
        record.in_flight = in_flight;
        if let Err(error) = journal.write(&record) {
            warn!(error = %error, "Failed to update deployment journal");
        }
    }

    /// Mark the run failed, keeping any in-flight entry already recorded.
    fn record_failure(&self, state: DeployState, error: &DeployError) {
        let Some(journal) = &self.journal else {
            return;
        };
        let mut record = match journal.load() {
            Ok(Some(record)) if record.run_id == self.run_id => record,
            _ => JournalRecord::new(self.run_id, state),
        };
        record.state = state;
        record.failure = Some(error.to_string());
        if let Err(error) = journal.write(&record) {
            warn!(error = %error, "Failed to update deployment journal");
        }
    }
}
