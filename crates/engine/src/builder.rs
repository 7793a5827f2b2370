//! Unsigned transaction drafts for the consume-and-replace protocol
//!
//! A registry transaction always has the same shape: the live registry UTxO
//! as its sole scripted input, one replacement output at the registry
//! address carrying the re-encoded datum and the input's lovelace, a
//! redeemer naming the operation for the validator's dispatch, and the
//! acting identity as a required signer. Wallet inputs, change and fee
//! balancing are appended by the signing collaborator.

use registry_common::{KeyHash, OutputRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datum;
use crate::plutus::{self, PlutusData};
use crate::provider::RegistryUtxo;
use crate::state::{Operation, RegistryState};

/// Value and address policy for the replacement output
#[derive(Debug, Clone)]
pub struct BuildParams {
    /// Script address holding the registry UTxO
    pub registry_address: String,

    /// Smallest lovelace value the replacement output may carry
    pub min_output_lovelace: u64,
}

/// A not-yet-signed registry transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTxDraft {
    /// The consumed registry UTxO
    pub input: OutputRef,

    /// Address receiving the replacement output
    pub registry_address: String,

    /// Inline datum of the replacement output
    pub datum: Vec<u8>,

    /// Lovelace carried by the replacement output
    pub lovelace: u64,

    /// Redeemer attached to the registry input
    pub redeemer: Vec<u8>,

    /// Signers the transaction declares; the validator checks these
    pub required_signers: Vec<KeyHash>,
}

/// Draft construction failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("registry input holds {available} lovelace, below the required {required}")]
    InsufficientValue { available: u64, required: u64 },
}

/// Draft the transaction replacing `current` with `new_state`.
pub fn build(
    current: &RegistryUtxo,
    new_state: &RegistryState,
    operation: &Operation,
    signer: &KeyHash,
    params: &BuildParams,
) -> Result<UnsignedTxDraft, BuildError> {
    if current.lovelace < params.min_output_lovelace {
        return Err(BuildError::InsufficientValue {
            available: current.lovelace,
            required: params.min_output_lovelace,
        });
    }

    Ok(UnsignedTxDraft {
        input: current.output_ref.clone(),
        registry_address: params.registry_address.clone(),
        datum: datum::encode(new_state),
        lovelace: current.lovelace,
        redeemer: encode_redeemer(operation),
        required_signers: vec![signer.clone()],
    })
}

/// Redeemer naming the operation for the validator's dispatch:
/// constructor 0 registers, 1 approves, 2 revokes.
pub fn encode_redeemer(operation: &Operation) -> Vec<u8> {
    let data = match operation {
        Operation::Register { clinic, .. } => PlutusData::Constr {
            tag: 0,
            fields: vec![PlutusData::Bytes(clinic.as_bytes().to_vec())],
        },
        Operation::Approve {
            clinic,
            approver,
            timestamp,
        } => PlutusData::Constr {
            tag: 1,
            fields: vec![
                PlutusData::Bytes(clinic.as_bytes().to_vec()),
                PlutusData::Bytes(approver.as_bytes().to_vec()),
                PlutusData::Int(*timestamp),
            ],
        },
        Operation::Revoke {
            clinic,
            revoker,
            timestamp,
        } => PlutusData::Constr {
            tag: 2,
            fields: vec![
                PlutusData::Bytes(clinic.as_bytes().to_vec()),
                PlutusData::Bytes(revoker.as_bytes().to_vec()),
                PlutusData::Int(*timestamp),
            ],
        },
    };
    plutus::encode(&data)
}
