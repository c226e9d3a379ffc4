#![forbid(unsafe_code)]

use meridian_contracts::gate::GateSource;
use meridian_contracts::ids::Sha256Hex;
use meridian_contracts::replay::{DriftDetails, DriftType, ReplayStatus};
use meridian_contracts::MonotonicTimeNs;
use meridian_storage::{AuthorityStore, StorageError};

fn hash(fill: char) -> Sha256Hex {
    Sha256Hex::new(&fill.to_string().repeat(64)).unwrap()
}

#[test]
fn at_replay_db_01_attempt_terminal_once_completed() {
    let mut s = AuthorityStore::new_in_memory();
    let attempt = s
        .insert_replay_attempt_row(hash('a'), GateSource::ValidationHarness, MonotonicTimeNs(1))
        .unwrap();

    s.complete_replay_attempt_row(
        &attempt.replay_id,
        ReplayStatus::Success,
        Some(hash('a')),
        None,
        Some("score=8000".to_string()),
        MonotonicTimeNs(2),
    )
    .unwrap();

    let again = s.complete_replay_attempt_row(
        &attempt.replay_id,
        ReplayStatus::Failed,
        None,
        None,
        None,
        MonotonicTimeNs(3),
    );
    assert!(matches!(
        again,
        Err(StorageError::AppendOnlyViolation { .. })
    ));
}

#[test]
fn at_replay_db_02_concurrent_attempts_are_independent_rows() {
    let mut s = AuthorityStore::new_in_memory();
    let first = s
        .insert_replay_attempt_row(hash('a'), GateSource::ValidationHarness, MonotonicTimeNs(1))
        .unwrap();
    let second = s
        .insert_replay_attempt_row(hash('a'), GateSource::LiveTraffic, MonotonicTimeNs(1))
        .unwrap();
    assert_ne!(first.replay_id, second.replay_id);
    assert_eq!(s.replay_attempt_rows_for_hash(&hash('a')).len(), 2);
}

#[test]
fn at_replay_db_03_completion_requires_terminal_status() {
    let mut s = AuthorityStore::new_in_memory();
    let attempt = s
        .insert_replay_attempt_row(hash('a'), GateSource::ValidationHarness, MonotonicTimeNs(1))
        .unwrap();
    let bad = s.complete_replay_attempt_row(
        &attempt.replay_id,
        ReplayStatus::Pending,
        None,
        None,
        None,
        MonotonicTimeNs(2),
    );
    assert!(matches!(bad, Err(StorageError::ContractViolation(_))));
}

#[test]
fn at_replay_db_04_drift_completion_records_both_hashes() {
    let mut s = AuthorityStore::new_in_memory();
    let attempt = s
        .insert_replay_attempt_row(hash('a'), GateSource::ValidationHarness, MonotonicTimeNs(1))
        .unwrap();

    let completed = s
        .complete_replay_attempt_row(
            &attempt.replay_id,
            ReplayStatus::DriftDetected,
            Some(hash('b')),
            Some(DriftDetails {
                drift_type: DriftType::HashMismatch,
                original_hash: hash('a'),
                replay_hash: hash('b'),
            }),
            None,
            MonotonicTimeNs(2),
        )
        .unwrap();

    let details = completed.drift_details.unwrap();
    assert_eq!(details.drift_type, DriftType::HashMismatch);
    assert_eq!(details.original_hash, hash('a'));
    assert_eq!(details.replay_hash, hash('b'));
}
