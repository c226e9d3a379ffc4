#![forbid(unsafe_code)]

use meridian_contracts::gate::{GateCheckRequest, GateSource, ResolutionStatus, ViolationCode};
use meridian_contracts::ids::{TenantId, UserId, WorkspaceId};
use meridian_contracts::MonotonicTimeNs;
use meridian_storage::{AuthorityStore, StorageError};

fn request() -> GateCheckRequest {
    GateCheckRequest::v1(
        GateSource::ValidationHarness,
        "/decision/score".to_string(),
        "POST".to_string(),
        TenantId::new("tenant_1").unwrap(),
        WorkspaceId::new("ws_1").unwrap(),
        Some(UserId::new("user_1").unwrap()),
        None,
        None,
    )
    .unwrap()
}

#[test]
fn at_gate_db_01_append_assigns_monotonic_sequence() {
    let mut s = AuthorityStore::new_in_memory();
    let first = s
        .append_gate_violation_row(ViolationCode::NoEnvelope, &request(), MonotonicTimeNs(1))
        .unwrap();
    let second = s
        .append_gate_violation_row(ViolationCode::InvalidEnvelope, &request(), MonotonicTimeNs(2))
        .unwrap();
    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert_eq!(s.gate_violation_rows().len(), 2);
}

#[test]
fn at_gate_db_02_resolution_mutates_once() {
    let mut s = AuthorityStore::new_in_memory();
    let seq = s
        .append_gate_violation_row(ViolationCode::NoEnvelope, &request(), MonotonicTimeNs(1))
        .unwrap();

    s.resolve_gate_violation_row(seq, ResolutionStatus::Escalated)
        .unwrap();
    let again = s.resolve_gate_violation_row(seq, ResolutionStatus::Ignored);
    assert!(matches!(
        again,
        Err(StorageError::AppendOnlyViolation { .. })
    ));
    assert_eq!(
        s.gate_violation_rows()[0].resolution_status,
        ResolutionStatus::Escalated
    );
}

#[test]
fn at_gate_db_03_cannot_resolve_back_to_unresolved() {
    let mut s = AuthorityStore::new_in_memory();
    let seq = s
        .append_gate_violation_row(ViolationCode::ExpiredEnvelope, &request(), MonotonicTimeNs(1))
        .unwrap();
    let bad = s.resolve_gate_violation_row(seq, ResolutionStatus::Unresolved);
    assert!(matches!(bad, Err(StorageError::ContractViolation(_))));
}

#[test]
fn at_gate_db_04_unknown_sequence_is_foreign_key_error() {
    let mut s = AuthorityStore::new_in_memory();
    let missing = s.resolve_gate_violation_row(42, ResolutionStatus::Resolved);
    assert!(matches!(
        missing,
        Err(StorageError::ForeignKeyViolation { .. })
    ));
}
