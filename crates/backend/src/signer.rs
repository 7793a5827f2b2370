//! Signing collaborators
//!
//! Key custody never enters this service. In mock mode drafts are wrapped
//! with a deterministic stand-in hash; against a real chain the draft is
//! handed to an external signing service that owns the wallet.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

use registry_common::TxHash;
use registry_engine::{SignedTx, SigningError, TxSigner, UnsignedTxDraft};

/// Signer for the mock ledger: no cryptography, deterministic hash
pub struct MockSigner;

#[async_trait]
impl TxSigner for MockSigner {
    async fn sign(&self, draft: &UnsignedTxDraft) -> Result<SignedTx, SigningError> {
        let bytes = bincode::serde::encode_to_vec(draft, bincode::config::standard())
            .map_err(|e| SigningError::Failed(format!("draft encoding failed: {e}")))?;
        let tx_hash = draft_hash(&bytes);

        debug!("Mock signer: signed draft as tx {}", tx_hash);

        Ok(SignedTx { tx_hash, bytes })
    }
}

/// Deterministic 32-byte stand-in for a transaction hash.
/// Equal drafts sign to equal hashes, which keeps retries of an unchanged
/// draft recognizable to the coordinator's landed-transaction check.
fn draft_hash(bytes: &[u8]) -> TxHash {
    let mut hash = [0u8; 32];
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    let mut word = hasher.finish();

    for chunk in hash.chunks_mut(8) {
        chunk.copy_from_slice(&word.to_be_bytes());
        let mut next = DefaultHasher::new();
        word.hash(&mut next);
        word = next.finish();
    }

    TxHash::new(hash)
}

/// Client for an external signing service
pub struct RemoteSigner {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    draft: &'a UnsignedTxDraft,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    tx_hash: String,
    tx_bytes: String,
}

impl RemoteSigner {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TxSigner for RemoteSigner {
    async fn sign(&self, draft: &UnsignedTxDraft) -> Result<SignedTx, SigningError> {
        let response = self
            .client
            .post(format!("{}/sign", self.endpoint))
            .json(&SignRequest { draft })
            .send()
            .await
            .map_err(|e| SigningError::Failed(format!("signing service unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(SigningError::Failed(format!(
                "signing service returned {status}: {body}"
            )));
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| SigningError::Failed(format!("malformed signing response: {e}")))?;

        let tx_hash = TxHash::from_hex(&signed.tx_hash)
            .map_err(|_| SigningError::Failed("signing service returned a bad tx hash".to_string()))?;
        let bytes = hex::decode(&signed.tx_bytes)
            .map_err(|_| SigningError::Failed("signing service returned bad tx bytes".to_string()))?;

        Ok(SignedTx { tx_hash, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_common::{KeyHash, OutputRef};

    fn draft(lovelace: u64) -> UnsignedTxDraft {
        UnsignedTxDraft {
            input: OutputRef::new(TxHash::new([1u8; 32]), 0),
            registry_address: "addr_test1_mock_registry".to_string(),
            datum: vec![1, 2, 3],
            lovelace,
            redeemer: vec![4, 5],
            required_signers: vec![KeyHash::new([0xaa; 28])],
        }
    }

    #[tokio::test]
    async fn test_mock_signer_is_deterministic() {
        let first = MockSigner.sign(&draft(5_000_000)).await.unwrap();
        let second = MockSigner.sign(&draft(5_000_000)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_different_drafts_get_different_hashes() {
        let first = MockSigner.sign(&draft(5_000_000)).await.unwrap();
        let second = MockSigner.sign(&draft(6_000_000)).await.unwrap();
        assert_ne!(first.tx_hash, second.tx_hash);
    }

    #[tokio::test]
    async fn test_signed_envelope_decodes_back_to_draft() {
        let original = draft(5_000_000);
        let signed = MockSigner.sign(&original).await.unwrap();

        let (decoded, _): (UnsignedTxDraft, usize) =
            bincode::serde::decode_from_slice(&signed.bytes, bincode::config::standard()).unwrap();
        assert_eq!(decoded, original);
    }
}
