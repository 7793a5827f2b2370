//! Chain provider against a Blockfrost-compatible indexer
//!
//! Covers the three queries the engine needs: unspent outputs at the
//! registry address (with their inline datums), CBOR transaction submission
//! with spent-input conflict classification, and a landed-transaction
//! lookup for indeterminate submissions.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use registry_common::{OutputRef, TxHash};
use registry_engine::{ChainError, ChainProvider, RegistryUtxo, SignedTx, SubmitError};

/// Blockfrost API client
pub struct BlockfrostClient {
    base_url: String,
    project_id: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AddressUtxo {
    tx_hash: String,
    output_index: u32,
    amount: Vec<UtxoAmount>,
    inline_datum: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UtxoAmount {
    unit: String,
    quantity: String,
}

impl BlockfrostClient {
    pub fn new(base_url: String, project_id: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChainProvider for BlockfrostClient {
    async fn utxos_at(&self, address: &str) -> Result<Vec<RegistryUtxo>, ChainError> {
        let url = format!("{}/addresses/{}/utxos", self.base_url, address);
        let response = self
            .client
            .get(&url)
            .header("project_id", &self.project_id)
            .send()
            .await
            .map_err(|e| ChainError::Query(format!("utxo query failed: {e}")))?;

        // the indexer answers 404 for addresses it has never seen
        if response.status().as_u16() == 404 {
            return Ok(vec![]);
        }
        if !response.status().is_success() {
            return Err(ChainError::Query(format!(
                "utxo query returned {}",
                response.status()
            )));
        }

        let raw: Vec<AddressUtxo> = response
            .json()
            .await
            .map_err(|e| ChainError::Query(format!("malformed utxo listing: {e}")))?;

        let mut utxos = Vec::new();
        for utxo in raw {
            // outputs without an inline datum cannot be the registry
            let datum_hex = match utxo.inline_datum {
                Some(datum_hex) => datum_hex,
                None => continue,
            };
            let datum = hex::decode(&datum_hex)
                .map_err(|e| ChainError::Query(format!("malformed datum hex: {e}")))?;
            let tx_hash = TxHash::from_hex(&utxo.tx_hash)
                .map_err(|e| ChainError::Query(format!("malformed tx hash: {e}")))?;
            let lovelace = utxo
                .amount
                .iter()
                .find(|amount| amount.unit == "lovelace")
                .and_then(|amount| amount.quantity.parse().ok())
                .unwrap_or(0);

            utxos.push(RegistryUtxo {
                output_ref: OutputRef::new(tx_hash, utxo.output_index),
                datum,
                lovelace,
            });
        }

        debug!("Indexer: {} datum-bearing output(s) at {}", utxos.len(), address);

        Ok(utxos)
    }

    async fn submit(&self, tx: &SignedTx) -> Result<TxHash, SubmitError> {
        let url = format!("{}/tx/submit", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("project_id", &self.project_id)
            .header("Content-Type", "application/cbor")
            .body(tx.bytes.clone())
            .send()
            .await
            .map_err(|e| SubmitError::Network(format!("submission failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            debug!("Indexer: accepted tx {}", tx.tx_hash);
            return Ok(tx.tx_hash.clone());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());

        // the ledger names already-consumed inputs in its UTxO-set failure
        if body.contains("BadInputsUTxO") {
            return Err(SubmitError::Conflict);
        }
        if status.is_server_error() {
            return Err(SubmitError::Network(format!(
                "indexer returned {status}: {body}"
            )));
        }

        Err(SubmitError::Rejected(body))
    }

    async fn has_landed(&self, tx_hash: &TxHash) -> Result<bool, ChainError> {
        let url = format!("{}/txs/{}", self.base_url, tx_hash);
        let response = self
            .client
            .get(&url)
            .header("project_id", &self.project_id)
            .send()
            .await
            .map_err(|e| ChainError::Query(format!("tx lookup failed: {e}")))?;

        if response.status().as_u16() == 404 {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(ChainError::Query(format!(
                "tx lookup returned {}",
                response.status()
            )));
        }

        Ok(true)
    }
}
