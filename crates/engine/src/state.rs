//! In-memory registry state and pure operation transitions
//!
//! `RegistryState` mirrors the on-chain map exactly. Transitions never mutate
//! in place: `apply` returns a fresh state so callers keep the prior value
//! for comparison and audit. The clinics map is a `BTreeMap` keyed by
//! `ClinicId`, whose ordering is the natural byte order of the identifier,
//! so iteration always matches the canonical serialization order.

use registry_common::{ClinicId, KeyHash};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// A registered clinic.
///
/// Registration stamps the approver and approval time directly (the on-chain
/// entry has no pending form); a later approval overwrites both as a
/// re-attestation. A revoked entry keeps its approval data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicEntry {
    /// Identity that approved the clinic
    pub approved_by: KeyHash,

    /// Ledger timestamp of the approval
    pub approved_at: i64,

    /// Ledger timestamp of the revocation, absent while the entry is active
    pub revoked_at: Option<i64>,
}

impl ClinicEntry {
    /// Create an active entry approved now
    pub fn new(approved_by: KeyHash, approved_at: i64) -> Self {
        Self {
            approved_by,
            approved_at,
            revoked_at: None,
        }
    }

    /// An entry is active until it is revoked
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// The full registry value carried by the live UTxO's datum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryState {
    /// Registered clinics, keyed by clinic id in canonical byte order
    pub clinics: BTreeMap<ClinicId, ClinicEntry>,

    /// Sole identity permitted to approve and revoke
    pub authority: KeyHash,
}

impl RegistryState {
    /// Create an empty registry owned by `authority`
    pub fn new(authority: KeyHash) -> Self {
        Self {
            clinics: BTreeMap::new(),
            authority,
        }
    }

    /// Look up a clinic entry
    pub fn get(&self, clinic: &ClinicId) -> Option<&ClinicEntry> {
        self.clinics.get(clinic)
    }

    /// Number of registered clinics
    pub fn len(&self) -> usize {
        self.clinics.len()
    }

    /// Whether the registry holds no clinics
    pub fn is_empty(&self) -> bool {
        self.clinics.is_empty()
    }
}

/// A requested registry mutation.
///
/// Operations are ephemeral: they exist only for the transaction that
/// applies them and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Add a clinic; the acting identity becomes the approver
    Register { clinic: ClinicId, timestamp: i64 },

    /// Re-attest an existing clinic under a (possibly new) approver
    Approve {
        clinic: ClinicId,
        approver: KeyHash,
        timestamp: i64,
    },

    /// Permanently revoke a clinic
    Revoke {
        clinic: ClinicId,
        revoker: KeyHash,
        timestamp: i64,
    },
}

impl Operation {
    /// The clinic this operation targets
    pub fn clinic(&self) -> &ClinicId {
        match self {
            Operation::Register { clinic, .. }
            | Operation::Approve { clinic, .. }
            | Operation::Revoke { clinic, .. } => clinic,
        }
    }

    /// Short operation name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Register { .. } => "register",
            Operation::Approve { .. } => "approve",
            Operation::Revoke { .. } => "revoke",
        }
    }
}

/// Rejected state transition
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("clinic {0} is already registered")]
    AlreadyExists(ClinicId),

    #[error("clinic {0} is not registered")]
    NotFound(ClinicId),

    #[error("clinic {0} is already revoked")]
    AlreadyRevoked(ClinicId),

    #[error("revocation at {revoked_at} precedes approval at {approved_at}")]
    TimestampOrderViolation { approved_at: i64, revoked_at: i64 },
}

/// Apply one operation to the registry, producing the next state.
///
/// Pure and deterministic: the same inputs always yield the same result, so
/// a failed apply is never worth retrying against unchanged state.
pub fn apply(
    state: &RegistryState,
    operation: &Operation,
    acting: &KeyHash,
) -> Result<RegistryState, ApplyError> {
    let mut next = state.clone();
    match operation {
        Operation::Register { clinic, timestamp } => {
            if next.clinics.contains_key(clinic) {
                return Err(ApplyError::AlreadyExists(clinic.clone()));
            }
            next.clinics
                .insert(clinic.clone(), ClinicEntry::new(acting.clone(), *timestamp));
        }
        Operation::Approve {
            clinic,
            approver,
            timestamp,
        } => {
            let entry = next
                .clinics
                .get_mut(clinic)
                .ok_or_else(|| ApplyError::NotFound(clinic.clone()))?;
            if entry.revoked_at.is_some() {
                return Err(ApplyError::AlreadyRevoked(clinic.clone()));
            }
            entry.approved_by = approver.clone();
            entry.approved_at = *timestamp;
        }
        Operation::Revoke {
            clinic, timestamp, ..
        } => {
            let entry = next
                .clinics
                .get_mut(clinic)
                .ok_or_else(|| ApplyError::NotFound(clinic.clone()))?;
            if entry.revoked_at.is_some() {
                return Err(ApplyError::AlreadyRevoked(clinic.clone()));
            }
            if *timestamp < entry.approved_at {
                return Err(ApplyError::TimestampOrderViolation {
                    approved_at: entry.approved_at,
                    revoked_at: *timestamp,
                });
            }
            entry.revoked_at = Some(*timestamp);
        }
    }
    Ok(next)
}
