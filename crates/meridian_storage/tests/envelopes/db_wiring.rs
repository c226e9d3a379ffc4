#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use meridian_contracts::envelope::{EnvelopeContent, EnvelopeStatus};
use meridian_contracts::ids::{PersonaId, PolicyId, TenantId, TerritorySlug, WorkspaceId};
use meridian_contracts::persona::PersonaScope;
use meridian_contracts::policy::CapabilityId;
use meridian_contracts::MonotonicTimeNs;
use meridian_storage::{AuthorityStore, EnvelopeSealInput, StorageError};

fn content(policy_version: u32, payload: &str) -> EnvelopeContent {
    EnvelopeContent::v1(
        PersonaId::new("pers_banking").unwrap(),
        policy_version,
        PersonaScope::Global,
        Some(TerritorySlug::new("uae").unwrap()),
        vec!["score_lead".to_string()],
        vec!["legal_advice".to_string()],
        CapabilityId::ordered().into_iter().collect::<BTreeSet<_>>(),
        payload.to_string(),
    )
    .unwrap()
}

fn seal_input(policy_version: u32, payload: &str) -> EnvelopeSealInput {
    let c = content(policy_version, payload);
    EnvelopeSealInput {
        tenant_id: TenantId::new("tenant_1").unwrap(),
        workspace_id: WorkspaceId::new("ws_1").unwrap(),
        persona_id: c.persona_id.clone(),
        policy_id: PolicyId::new("pol_banking_v1").unwrap(),
        policy_version,
        territory: c.territory.clone(),
        resolution_path: "LOCAL(UAE) → REGIONAL(none) → GLOBAL".to_string(),
        scope: c.scope,
        allowed_tools: c.allowed_tools.clone(),
        content: c,
        expires_at: None,
    }
}

#[test]
fn at_env_db_01_sealing_identical_content_is_idempotent() {
    let mut s = AuthorityStore::new_in_memory();
    let (first, is_new_first) = s
        .seal_envelope_row(seal_input(1, "{\"lead\":\"acme\"}"), MonotonicTimeNs(10))
        .unwrap();
    assert!(is_new_first);

    // Payload differs but is not part of the content address.
    let (second, is_new_second) = s
        .seal_envelope_row(seal_input(1, "{\"lead\":\"acme\",\"ts\":99}"), MonotonicTimeNs(20))
        .unwrap();
    assert!(!is_new_second);
    assert_eq!(first.envelope_id, second.envelope_id);
    assert_eq!(first.sha256_hash, second.sha256_hash);
}

#[test]
fn at_env_db_02_distinct_semantic_content_creates_distinct_rows() {
    let mut s = AuthorityStore::new_in_memory();
    let (first, _) = s
        .seal_envelope_row(seal_input(1, "{}"), MonotonicTimeNs(10))
        .unwrap();
    let (second, is_new) = s
        .seal_envelope_row(seal_input(2, "{}"), MonotonicTimeNs(11))
        .unwrap();
    assert!(is_new);
    assert_ne!(first.envelope_id, second.envelope_id);
    assert_ne!(first.sha256_hash, second.sha256_hash);
}

#[test]
fn at_env_db_03_status_transitions_forward_only() {
    let mut s = AuthorityStore::new_in_memory();
    let (envelope, _) = s
        .seal_envelope_row(seal_input(1, "{}"), MonotonicTimeNs(10))
        .unwrap();

    s.set_envelope_status(&envelope.envelope_id, EnvelopeStatus::Revoked)
        .unwrap();
    let back = s.set_envelope_status(&envelope.envelope_id, EnvelopeStatus::Expired);
    assert!(matches!(back, Err(StorageError::AppendOnlyViolation { .. })));
}

#[test]
fn at_env_db_04_reseal_after_revocation_bumps_version() {
    let mut s = AuthorityStore::new_in_memory();
    let (first, _) = s
        .seal_envelope_row(seal_input(1, "{}"), MonotonicTimeNs(10))
        .unwrap();
    s.set_envelope_status(&first.envelope_id, EnvelopeStatus::Revoked)
        .unwrap();

    let (second, is_new) = s
        .seal_envelope_row(seal_input(1, "{}"), MonotonicTimeNs(20))
        .unwrap();
    assert!(is_new);
    assert_eq!(second.envelope_version, 2);
    assert_eq!(second.sha256_hash, first.sha256_hash);
    assert_ne!(second.envelope_id, first.envelope_id);

    // Hash lookup now resolves to the envelope in effect.
    let by_hash = s.envelope_row_by_hash(&first.sha256_hash).unwrap();
    assert_eq!(by_hash.envelope_id, second.envelope_id);
}

#[test]
fn at_env_db_05_expiry_is_clock_relative() {
    let mut s = AuthorityStore::new_in_memory();
    let mut input = seal_input(1, "{}");
    input.expires_at = Some(MonotonicTimeNs(100));
    let (envelope, _) = s.seal_envelope_row(input, MonotonicTimeNs(10)).unwrap();

    assert!(!envelope.is_expired_at(MonotonicTimeNs(99)));
    assert!(envelope.is_expired_at(MonotonicTimeNs(100)));
}
