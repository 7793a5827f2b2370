//! Registry datum codec
//!
//! Maps `RegistryState` to the on-chain datum bytes and back. The schema is
//! fixed by the validator script:
//!
//! ```text
//! registry = Constr 0 [ Map(clinic id bytes => entry), authority bytes ]
//! entry    = Constr 0 [ approved_by bytes, approved_at int, revoked_at ]
//! revoked_at = Constr 0 [ int ]   -- revoked
//!            | Constr 1 []        -- active
//! ```
//!
//! Encoding is deterministic: the map serializes in ascending clinic id byte
//! order (the `BTreeMap` iteration order), so `decode(encode(s)) == s` and
//! re-encoding an unchanged state is byte-identical. Decoding enforces that
//! same canonical order and the per-entry timestamp invariant, since a datum
//! violating either cannot have been produced by this codec or the validator.

use registry_common::{ClinicId, KeyHash};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::plutus::{self, CborError, PlutusData};
use crate::state::{ClinicEntry, RegistryState};

/// Malformed or inconsistent on-chain datum.
///
/// Any of these indicates a corrupted deployment rather than a transient
/// condition; callers must not retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed datum CBOR: {0}")]
    Cbor(#[from] CborError),

    #[error("expected constructor {expected} for {context}, found tag {found}")]
    WrongConstructor {
        context: &'static str,
        expected: u64,
        found: u64,
    },

    #[error("expected {expected} fields for {context}, found {found}")]
    WrongArity {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("expected {expected} for {context}")]
    UnexpectedItem {
        context: &'static str,
        expected: &'static str,
    },

    #[error("identity in {context} must be 28 bytes, got {found}")]
    BadIdentity { context: &'static str, found: usize },

    #[error("invalid clinic id key in registry map")]
    BadClinicId,

    #[error("registry map keys are duplicated or out of canonical byte order")]
    NonCanonicalMap,

    #[error("entry revoked at {revoked_at}, before its approval at {approved_at}")]
    RevokedBeforeApproved { approved_at: i64, revoked_at: i64 },
}

/// Serialize a registry state into canonical datum bytes
pub fn encode(state: &RegistryState) -> Vec<u8> {
    plutus::encode(&state_to_data(state))
}

/// Parse and validate datum bytes into a registry state
pub fn decode(bytes: &[u8]) -> Result<RegistryState, DecodeError> {
    state_from_data(&plutus::decode(bytes)?)
}

fn state_to_data(state: &RegistryState) -> PlutusData {
    let entries = state
        .clinics
        .iter()
        .map(|(clinic, entry)| {
            (
                PlutusData::Bytes(clinic.as_bytes().to_vec()),
                entry_to_data(entry),
            )
        })
        .collect();

    PlutusData::Constr {
        tag: 0,
        fields: vec![
            PlutusData::Map(entries),
            PlutusData::Bytes(state.authority.as_bytes().to_vec()),
        ],
    }
}

fn entry_to_data(entry: &ClinicEntry) -> PlutusData {
    let revoked_at = match entry.revoked_at {
        Some(at) => PlutusData::Constr {
            tag: 0,
            fields: vec![PlutusData::Int(at)],
        },
        None => PlutusData::Constr {
            tag: 1,
            fields: vec![],
        },
    };

    PlutusData::Constr {
        tag: 0,
        fields: vec![
            PlutusData::Bytes(entry.approved_by.as_bytes().to_vec()),
            PlutusData::Int(entry.approved_at),
            revoked_at,
        ],
    }
}

fn state_from_data(data: &PlutusData) -> Result<RegistryState, DecodeError> {
    let fields = expect_constr(data, "registry", 0, 2)?;

    let entries = match &fields[0] {
        PlutusData::Map(entries) => entries,
        _ => {
            return Err(DecodeError::UnexpectedItem {
                context: "registry clinics",
                expected: "map",
            })
        }
    };

    let mut clinics = BTreeMap::new();
    let mut previous_key: Option<&[u8]> = None;
    for (key, value) in entries {
        let key_bytes = as_bytes(key, "clinic id")?;
        if let Some(previous) = previous_key {
            if previous >= key_bytes {
                return Err(DecodeError::NonCanonicalMap);
            }
        }
        previous_key = Some(key_bytes);

        let clinic = ClinicId::new(key_bytes.to_vec()).map_err(|_| DecodeError::BadClinicId)?;
        clinics.insert(clinic, entry_from_data(value)?);
    }

    Ok(RegistryState {
        clinics,
        authority: as_key_hash(&fields[1], "registry authority")?,
    })
}

fn entry_from_data(data: &PlutusData) -> Result<ClinicEntry, DecodeError> {
    let fields = expect_constr(data, "clinic entry", 0, 3)?;

    let approved_by = as_key_hash(&fields[0], "approved_by")?;
    let approved_at = as_int(&fields[1], "approved_at")?;
    let revoked_at = timestamp_option_from_data(&fields[2])?;

    if let Some(revoked_at) = revoked_at {
        if revoked_at < approved_at {
            return Err(DecodeError::RevokedBeforeApproved {
                approved_at,
                revoked_at,
            });
        }
    }

    Ok(ClinicEntry {
        approved_by,
        approved_at,
        revoked_at,
    })
}

fn timestamp_option_from_data(data: &PlutusData) -> Result<Option<i64>, DecodeError> {
    match data {
        PlutusData::Constr { tag: 0, fields } => {
            if fields.len() != 1 {
                return Err(DecodeError::WrongArity {
                    context: "revoked_at",
                    expected: 1,
                    found: fields.len(),
                });
            }
            Ok(Some(as_int(&fields[0], "revoked_at")?))
        }
        PlutusData::Constr { tag: 1, fields } => {
            if !fields.is_empty() {
                return Err(DecodeError::WrongArity {
                    context: "revoked_at",
                    expected: 0,
                    found: fields.len(),
                });
            }
            Ok(None)
        }
        PlutusData::Constr { tag, .. } => Err(DecodeError::WrongConstructor {
            context: "revoked_at",
            expected: 0,
            found: *tag,
        }),
        _ => Err(DecodeError::UnexpectedItem {
            context: "revoked_at",
            expected: "nullable constructor",
        }),
    }
}

fn expect_constr<'a>(
    data: &'a PlutusData,
    context: &'static str,
    tag: u64,
    arity: usize,
) -> Result<&'a [PlutusData], DecodeError> {
    match data {
        PlutusData::Constr { tag: found, fields } if *found == tag => {
            if fields.len() != arity {
                return Err(DecodeError::WrongArity {
                    context,
                    expected: arity,
                    found: fields.len(),
                });
            }
            Ok(fields)
        }
        PlutusData::Constr { tag: found, .. } => Err(DecodeError::WrongConstructor {
            context,
            expected: tag,
            found: *found,
        }),
        _ => Err(DecodeError::UnexpectedItem {
            context,
            expected: "constructor",
        }),
    }
}

fn as_bytes<'a>(data: &'a PlutusData, context: &'static str) -> Result<&'a [u8], DecodeError> {
    match data {
        PlutusData::Bytes(bytes) => Ok(bytes),
        _ => Err(DecodeError::UnexpectedItem {
            context,
            expected: "byte string",
        }),
    }
}

fn as_int(data: &PlutusData, context: &'static str) -> Result<i64, DecodeError> {
    match data {
        PlutusData::Int(n) => Ok(*n),
        _ => Err(DecodeError::UnexpectedItem {
            context,
            expected: "integer",
        }),
    }
}

fn as_key_hash(data: &PlutusData, context: &'static str) -> Result<KeyHash, DecodeError> {
    let bytes = as_bytes(data, context)?;
    if bytes.len() != 28 {
        return Err(DecodeError::BadIdentity {
            context,
            found: bytes.len(),
        });
    }
    let mut arr = [0u8; 28];
    arr.copy_from_slice(bytes);
    Ok(KeyHash::new(arr))
}
