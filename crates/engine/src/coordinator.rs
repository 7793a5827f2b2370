//! Submission coordination with contention retry
//!
//! Each registry mutation runs one Fetch → Build → Sign → Submit cycle.
//! There is no in-process lock: the ledger's single-spender rule serializes
//! writers, and a submitter that loses the race sees a spent-input conflict,
//! refetches the now-updated registry and reapplies its operation against
//! the new state. Deterministic failures from the pure layers are never
//! retried in place; only a fresh UTxO warrants another attempt.

use std::sync::Arc;
use std::time::Duration;

use registry_common::{KeyHash, TxHash};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::authorize::{self, AuthError, AuthPolicy};
use crate::builder::{self, BuildError, BuildParams};
use crate::datum::{self, DecodeError};
use crate::provider::{
    ChainError, ChainProvider, RegistryUtxo, SignedTx, SigningError, SubmitError, TxSigner,
};
use crate::state::{apply, ApplyError, Operation};

/// Attempts across the whole fetch/build/submit cycle before giving up on a
/// contended registry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// In-place resubmissions of the same signed transaction after network
/// failures, before the failure is surfaced.
pub const DEFAULT_SUBMIT_RETRIES: u32 = 3;

/// Bound on a single submission round-trip.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

const NETWORK_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Coordinator policy knobs
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Script address holding the registry UTxO
    pub registry_address: String,

    /// Smallest lovelace value the replacement output may carry
    pub min_output_lovelace: u64,

    /// Authorization rule set, mirrored from the validator
    pub policy: AuthPolicy,

    /// Contention attempt bound
    pub max_attempts: u32,

    /// Network-failure resubmission bound
    pub submit_retries: u32,

    /// Per-submission wait before the outcome is treated as indeterminate
    pub confirm_timeout: Duration,
}

impl CoordinatorSettings {
    pub fn new(registry_address: impl Into<String>) -> Self {
        Self {
            registry_address: registry_address.into(),
            min_output_lovelace: 2_000_000,
            policy: AuthPolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            submit_retries: DEFAULT_SUBMIT_RETRIES,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }
}

/// Terminal failure of a registry operation
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Zero registry UTxOs means an undeployed or consumed registry; more
    /// than one means a corrupted deployment. Neither is transient.
    #[error("expected exactly one registry UTxO, found {found}")]
    NoRegistryFound { found: usize },

    #[error("registry contention persisted through {attempts} attempts")]
    ContentionExhausted { attempts: u32 },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("transaction rejected by the ledger: {0}")]
    Rejected(String),

    #[error("network failure during submission: {0}")]
    Network(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

enum SubmitOutcome {
    Accepted(TxHash),
    Conflicted,
    /// Submission timed out and the transaction is not (yet) visible on the
    /// ledger; the caller must recheck against the live registry before
    /// counting the attempt as lost.
    Indeterminate,
}

/// Drives registry operations through the consume-and-replace protocol
pub struct Coordinator {
    provider: Arc<dyn ChainProvider>,
    signer: Arc<dyn TxSigner>,
    settings: CoordinatorSettings,
}

impl Coordinator {
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        signer: Arc<dyn TxSigner>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            provider,
            signer,
            settings,
        }
    }

    /// Execute one registry operation as `acting`, returning the identifier
    /// of the accepted transaction.
    ///
    /// Dropping the returned future before submission has no on-chain
    /// effect; once a transaction has been handed to the provider the ledger
    /// outcome stands regardless of cancellation.
    pub async fn execute(
        &self,
        operation: Operation,
        acting: KeyHash,
    ) -> Result<TxHash, CoordinatorError> {
        let max_attempts = self.settings.max_attempts;

        for attempt in 1..=max_attempts {
            let utxo = self.fetch_registry().await?;
            let state = datum::decode(&utxo.datum)?;

            let signers = [acting.clone()];
            authorize::authorize(&self.settings.policy, &state, &operation, &acting, &signers)?;
            let next = apply(&state, &operation, &acting)?;

            let params = BuildParams {
                registry_address: self.settings.registry_address.clone(),
                min_output_lovelace: self.settings.min_output_lovelace,
            };
            let draft = builder::build(&utxo, &next, &operation, &acting, &params)?;
            let signed = self.signer.sign(&draft).await?;

            match self.submit_signed(&signed).await? {
                SubmitOutcome::Accepted(tx_hash) => {
                    info!(
                        "Registry {} confirmed in tx {} (attempt {})",
                        operation.kind(),
                        tx_hash,
                        attempt
                    );
                    return Ok(tx_hash);
                }
                SubmitOutcome::Conflicted => {
                    warn!(
                        "Registry input {} already spent, refetching (attempt {}/{})",
                        utxo.output_ref, attempt, max_attempts
                    );
                }
                SubmitOutcome::Indeterminate => {
                    // The submission may have landed despite the timeout;
                    // duplicate-applying the operation would be worse than
                    // one extra fetch.
                    let current = self.fetch_registry().await?;
                    if current.output_ref.tx_hash == signed.tx_hash {
                        info!(
                            "Registry {} confirmed in tx {} after submission timeout",
                            operation.kind(),
                            signed.tx_hash
                        );
                        return Ok(signed.tx_hash);
                    }
                    warn!(
                        "Submission outcome indeterminate, retrying (attempt {}/{})",
                        attempt, max_attempts
                    );
                }
            }
        }

        Err(CoordinatorError::ContentionExhausted {
            attempts: max_attempts,
        })
    }

    /// Read-only fetch of the live registry UTxO.
    pub async fn fetch_registry(&self) -> Result<RegistryUtxo, CoordinatorError> {
        let mut utxos = self
            .provider
            .utxos_at(&self.settings.registry_address)
            .await?;
        if utxos.len() != 1 {
            return Err(CoordinatorError::NoRegistryFound {
                found: utxos.len(),
            });
        }
        Ok(utxos.remove(0))
    }

    async fn submit_signed(&self, signed: &SignedTx) -> Result<SubmitOutcome, CoordinatorError> {
        let mut network_failures = 0;
        loop {
            match timeout(self.settings.confirm_timeout, self.provider.submit(signed)).await {
                Ok(Ok(tx_hash)) => return Ok(SubmitOutcome::Accepted(tx_hash)),
                Ok(Err(SubmitError::Conflict)) => return Ok(SubmitOutcome::Conflicted),
                Ok(Err(SubmitError::Rejected(reason))) => {
                    return Err(CoordinatorError::Rejected(reason))
                }
                Ok(Err(SubmitError::Network(reason))) => {
                    network_failures += 1;
                    if network_failures >= self.settings.submit_retries {
                        return Err(CoordinatorError::Network(reason));
                    }
                    warn!(
                        "Submission network failure ({}/{}), resubmitting: {}",
                        network_failures, self.settings.submit_retries, reason
                    );
                    sleep(NETWORK_RETRY_DELAY).await;
                }
                Err(_elapsed) => {
                    match self.provider.has_landed(&signed.tx_hash).await {
                        Ok(true) => return Ok(SubmitOutcome::Accepted(signed.tx_hash.clone())),
                        _ => return Ok(SubmitOutcome::Indeterminate),
                    }
                }
            }
        }
    }
}
