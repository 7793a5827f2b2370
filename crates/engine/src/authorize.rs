//! Authority policy for registry operations
//!
//! Mirrors the validator script's authorization predicate. The whole rule
//! set lives in one place (`AuthPolicy` + `authorize`) so it can be kept in
//! lock-step with the script: a divergence would make the engine build
//! transactions the network rejects. The rule-table test below doubles as
//! the equivalence fixture for the script's documented rules.
//!
//! Signature verification itself belongs to the signing and ledger layers;
//! this check only establishes that the required signer is declared on the
//! transaction being built.

use registry_common::KeyHash;
use thiserror::Error;

use crate::state::{Operation, RegistryState};

/// Who may register a new clinic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationPolicy {
    /// Only the registry authority registers clinics (registration stamps an
    /// approval, so this is the default)
    AuthorityOnly,

    /// Any identity may register itself; approval can be re-attested by the
    /// authority later
    Open,
}

/// The deployment's authorization rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPolicy {
    pub registration: RegistrationPolicy,
}

impl AuthPolicy {
    pub fn new(registration: RegistrationPolicy) -> Self {
        Self { registration }
    }
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            registration: RegistrationPolicy::AuthorityOnly,
        }
    }
}

/// Operation not permitted under the authority policy
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("identity {acting} is not the registry authority")]
    WrongAuthority { acting: KeyHash },

    #[error("required signer {required} is not declared on the transaction")]
    MissingSignature { required: KeyHash },
}

/// Check that `acting` may perform `operation` on `state` with the given
/// declared signers.
pub fn authorize(
    policy: &AuthPolicy,
    state: &RegistryState,
    operation: &Operation,
    acting: &KeyHash,
    signers: &[KeyHash],
) -> Result<(), AuthError> {
    let needs_authority = match operation {
        Operation::Register { .. } => policy.registration == RegistrationPolicy::AuthorityOnly,
        Operation::Approve { .. } | Operation::Revoke { .. } => true,
    };

    if needs_authority && acting != &state.authority {
        return Err(AuthError::WrongAuthority {
            acting: acting.clone(),
        });
    }

    // The identity stamped into the operation must be the one acting;
    // otherwise the transaction would attribute the attestation to a party
    // that never signed it.
    let embedded = match operation {
        Operation::Register { .. } => None,
        Operation::Approve { approver, .. } => Some(approver),
        Operation::Revoke { revoker, .. } => Some(revoker),
    };
    if let Some(embedded) = embedded {
        if embedded != acting {
            return Err(AuthError::WrongAuthority {
                acting: embedded.clone(),
            });
        }
    }

    if !signers.contains(acting) {
        return Err(AuthError::MissingSignature {
            required: acting.clone(),
        });
    }

    Ok(())
}
