//! Integration tests for the registry engine
//!
//! Drives the decode → authorize → apply → encode pipeline through the
//! lifecycle of a clinic: registration, re-approval, early-revocation
//! rejection, revocation and the terminal revoked state.

use registry_common::{ClinicId, KeyHash};
use registry_engine::{
    apply, authorize::authorize, datum, ApplyError, AuthPolicy, Operation, RegistryState,
};

fn authority() -> KeyHash {
    KeyHash::new([0xaa; 28])
}

fn clinic_1() -> ClinicId {
    ClinicId::new(b"clinic-1".to_vec()).unwrap()
}

/// Run an operation the way the coordinator's building phase does:
/// authorize against the decoded state, apply, then round-trip the result
/// through the datum codec.
fn run(
    state: &RegistryState,
    operation: Operation,
    acting: &KeyHash,
) -> Result<RegistryState, ApplyError> {
    let policy = AuthPolicy::default();
    let signers = [acting.clone()];
    authorize(&policy, state, &operation, acting, &signers).expect("authorized");

    let next = apply(state, &operation, acting)?;

    let bytes = datum::encode(&next);
    assert_eq!(datum::decode(&bytes).unwrap(), next, "round-trip law");
    assert_eq!(datum::encode(&next), bytes, "deterministic encoding");

    Ok(next)
}

#[test]
fn test_register_clinic_into_empty_registry() {
    let genesis = RegistryState::new(authority());

    let state = run(
        &genesis,
        Operation::Register {
            clinic: clinic_1(),
            timestamp: 80,
        },
        &authority(),
    )
    .unwrap();

    let entry = state.get(&clinic_1()).unwrap();
    assert_eq!(entry.approved_by, authority());
    assert_eq!(entry.approved_at, 80);
    assert!(entry.is_active());
    assert!(genesis.is_empty(), "input state never mutated");
}

#[test]
fn test_approve_reattests_registered_clinic() {
    let genesis = RegistryState::new(authority());
    let registered = run(
        &genesis,
        Operation::Register {
            clinic: clinic_1(),
            timestamp: 80,
        },
        &authority(),
    )
    .unwrap();

    let approved = run(
        &registered,
        Operation::Approve {
            clinic: clinic_1(),
            approver: authority(),
            timestamp: 100,
        },
        &authority(),
    )
    .unwrap();

    let entry = approved.get(&clinic_1()).unwrap();
    assert_eq!(entry.approved_by, authority());
    assert_eq!(entry.approved_at, 100);
    assert_eq!(entry.revoked_at, None);
}

#[test]
fn test_revoke_before_approval_timestamp_rejected() {
    let genesis = RegistryState::new(authority());
    let registered = run(
        &genesis,
        Operation::Register {
            clinic: clinic_1(),
            timestamp: 100,
        },
        &authority(),
    )
    .unwrap();

    let err = run(
        &registered,
        Operation::Revoke {
            clinic: clinic_1(),
            revoker: authority(),
            timestamp: 50,
        },
        &authority(),
    )
    .unwrap_err();

    assert_eq!(
        err,
        ApplyError::TimestampOrderViolation {
            approved_at: 100,
            revoked_at: 50,
        }
    );
}

#[test]
fn test_revoked_clinic_is_terminal() {
    let genesis = RegistryState::new(authority());
    let registered = run(
        &genesis,
        Operation::Register {
            clinic: clinic_1(),
            timestamp: 100,
        },
        &authority(),
    )
    .unwrap();

    let revoked = run(
        &registered,
        Operation::Revoke {
            clinic: clinic_1(),
            revoker: authority(),
            timestamp: 200,
        },
        &authority(),
    )
    .unwrap();

    let entry = revoked.get(&clinic_1()).unwrap();
    assert_eq!(entry.revoked_at, Some(200));
    assert!(!entry.is_active());

    // a second revocation and a re-approval are both rejected
    let err = run(
        &revoked,
        Operation::Revoke {
            clinic: clinic_1(),
            revoker: authority(),
            timestamp: 300,
        },
        &authority(),
    )
    .unwrap_err();
    assert_eq!(err, ApplyError::AlreadyRevoked(clinic_1()));

    let err = run(
        &revoked,
        Operation::Approve {
            clinic: clinic_1(),
            approver: authority(),
            timestamp: 300,
        },
        &authority(),
    )
    .unwrap_err();
    assert_eq!(err, ApplyError::AlreadyRevoked(clinic_1()));
}

#[test]
fn test_full_lifecycle_stays_byte_stable() {
    let mut state = RegistryState::new(authority());

    for (index, name) in [b"clinic-a", b"clinic-b", b"clinic-c"].iter().enumerate() {
        state = run(
            &state,
            Operation::Register {
                clinic: ClinicId::new(name.to_vec()).unwrap(),
                timestamp: 100 + index as i64,
            },
            &authority(),
        )
        .unwrap();
    }

    state = run(
        &state,
        Operation::Revoke {
            clinic: ClinicId::new(b"clinic-b".to_vec()).unwrap(),
            revoker: authority(),
            timestamp: 500,
        },
        &authority(),
    )
    .unwrap();

    assert_eq!(state.len(), 3);
    let bytes = datum::encode(&state);
    let reloaded = datum::decode(&bytes).unwrap();
    assert_eq!(datum::encode(&reloaded), bytes);
}
