//! Mock ledger for development and testing
//!
//! Simulates the chain's single-spender rule without a node connection: the
//! ledger holds exactly one registry UTxO, accepts a submission only if it
//! spends the current output reference, and answers every other spend with
//! the same conflict a real ledger reports for an already-consumed input.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use registry_common::{KeyHash, OutputRef, TxHash};
use registry_engine::{
    datum, ChainError, ChainProvider, RegistryState, RegistryUtxo, SignedTx, SubmitError,
    UnsignedTxDraft,
};

/// Lovelace seeded into the genesis registry output
const GENESIS_LOVELACE: u64 = 5_000_000;

/// In-memory single-UTxO ledger
pub struct MockNode {
    ledger: Arc<Mutex<Ledger>>,
}

struct Ledger {
    address: String,
    utxo: RegistryUtxo,
    landed: HashSet<TxHash>,
    height: u64,
}

impl MockNode {
    /// Create a mock ledger holding an empty registry owned by `authority`
    pub fn bootstrap(address: String, authority: KeyHash) -> Self {
        let state = RegistryState::new(authority);
        let utxo = RegistryUtxo {
            output_ref: OutputRef::new(genesis_hash(), 0),
            datum: datum::encode(&state),
            lovelace: GENESIS_LOVELACE,
        };

        info!("Mock ledger bootstrapped at {} with an empty registry", address);

        Self {
            ledger: Arc::new(Mutex::new(Ledger {
                address,
                utxo,
                landed: HashSet::new(),
                height: 1,
            })),
        }
    }

    /// Current registry UTxO (test hook)
    pub async fn current_utxo(&self) -> RegistryUtxo {
        self.ledger.lock().await.utxo.clone()
    }

    /// Number of accepted transactions plus genesis (test hook)
    pub async fn height(&self) -> u64 {
        self.ledger.lock().await.height
    }
}

/// Deterministic genesis transaction hash
fn genesis_hash() -> TxHash {
    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = (i as u8).wrapping_mul(7).wrapping_add(1);
    }
    TxHash::new(bytes)
}

#[async_trait]
impl ChainProvider for MockNode {
    async fn utxos_at(&self, address: &str) -> Result<Vec<RegistryUtxo>, ChainError> {
        let ledger = self.ledger.lock().await;
        if address == ledger.address {
            debug!("Mock node: utxos_at({}) -> 1 output", address);
            Ok(vec![ledger.utxo.clone()])
        } else {
            Ok(vec![])
        }
    }

    async fn submit(&self, tx: &SignedTx) -> Result<TxHash, SubmitError> {
        let (draft, _): (UnsignedTxDraft, usize) =
            bincode::serde::decode_from_slice(&tx.bytes, bincode::config::standard())
                .map_err(|e| SubmitError::Rejected(format!("malformed transaction envelope: {e}")))?;

        let mut ledger = self.ledger.lock().await;

        if draft.input != ledger.utxo.output_ref {
            debug!("Mock node: rejecting spend of stale input {}", draft.input);
            return Err(SubmitError::Conflict);
        }

        ledger.utxo = RegistryUtxo {
            output_ref: OutputRef::new(tx.tx_hash.clone(), 0),
            datum: draft.datum,
            lovelace: draft.lovelace,
        };
        ledger.landed.insert(tx.tx_hash.clone());
        ledger.height += 1;

        debug!(
            "Mock node: accepted tx {} at height {}",
            tx.tx_hash, ledger.height
        );

        Ok(tx.tx_hash.clone())
    }

    async fn has_landed(&self, tx_hash: &TxHash) -> Result<bool, ChainError> {
        Ok(self.ledger.lock().await.landed.contains(tx_hash))
    }
}
