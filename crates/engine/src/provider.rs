//! External collaborator interfaces
//!
//! The engine talks to the ledger and to the signing layer only through the
//! traits here. Production backends implement them against an indexer and a
//! signing service; tests implement them in memory.

use async_trait::async_trait;
use registry_common::{OutputRef, TxHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::UnsignedTxDraft;

/// An unspent output at the registry address: the output reference that
/// identifies it, the raw datum bytes it carries, and its lovelace value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryUtxo {
    pub output_ref: OutputRef,
    pub datum: Vec<u8>,
    pub lovelace: u64,
}

/// A signed transaction ready for submission.
///
/// The hash is known as soon as the transaction body is signed, before the
/// ledger has seen it; the coordinator uses it to recognize its own
/// transaction when a submission outcome is indeterminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTx {
    pub tx_hash: TxHash,
    pub bytes: Vec<u8>,
}

/// Ledger query failure
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain query failed: {0}")]
    Query(String),
}

/// Submission failure, split by how the coordinator must react
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The registry input was consumed by a competing transaction; refetch
    /// the registry and rebuild against the new state
    #[error("registry input was already spent")]
    Conflict,

    /// The ledger refused the transaction for any other reason; rebuilding
    /// from the same state would produce the same rejection
    #[error("transaction rejected by the ledger: {0}")]
    Rejected(String),

    /// The transaction may or may not have reached the ledger
    #[error("network failure during submission: {0}")]
    Network(String),
}

/// Signing collaborator failure
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing failed: {0}")]
    Failed(String),
}

/// Ledger query and submission collaborator
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// All unspent outputs currently at `address`
    async fn utxos_at(&self, address: &str) -> Result<Vec<RegistryUtxo>, ChainError>;

    /// Submit a signed transaction
    async fn submit(&self, tx: &SignedTx) -> Result<TxHash, SubmitError>;

    /// Whether a transaction is known to the ledger
    async fn has_landed(&self, tx_hash: &TxHash) -> Result<bool, ChainError>;
}

/// Signing collaborator; key custody stays behind this seam
#[async_trait]
pub trait TxSigner: Send + Sync {
    async fn sign(&self, draft: &UnsignedTxDraft) -> Result<SignedTx, SigningError>;
}
