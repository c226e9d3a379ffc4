#![forbid(unsafe_code)]

use meridian_contracts::codes::AuthorityCode;
use meridian_contracts::envelope::EnvelopeContent;
use meridian_contracts::gate::GateSource;
use meridian_contracts::ids::{ReplayId, Sha256Hex};
use meridian_contracts::replay::{DriftDetails, DriftType, ReplayAttemptRecord, ReplayStatus};
use meridian_contracts::MonotonicTimeNs;
use meridian_storage::repo::{EnvelopeRepo, ReplayRepo};
use meridian_storage::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// No sealed envelope carries the requested hash; no attempt row is
    /// created for a request that never identified an envelope.
    EnvelopeNotFound,
    ReplayNotFound,
    Storage(StorageError),
}

impl ReplayError {
    pub fn authority_code(&self) -> AuthorityCode {
        match self {
            ReplayError::EnvelopeNotFound => AuthorityCode::EnvelopeNotSealed,
            ReplayError::ReplayNotFound => AuthorityCode::ReplayNotFound,
            ReplayError::Storage(_) => AuthorityCode::InvalidEnvelope,
        }
    }
}

impl From<StorageError> for ReplayError {
    fn from(e: StorageError) -> Self {
        ReplayError::Storage(e)
    }
}

/// Drives replay attempts against sealed envelopes.
///
/// `initiate` pins the original hash into a PENDING row and hands back the
/// sealed content for re-execution; `complete` compares the re-executed
/// hash against the pinned original and finalizes the row exactly once.
/// Attempts are append-only history, so concurrent replays of one envelope
/// are just independent rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayCoordinator;

impl ReplayCoordinator {
    pub fn new() -> Self {
        Self
    }

    pub fn initiate<S>(
        &self,
        store: &mut S,
        envelope_hash: &Sha256Hex,
        source: GateSource,
        now: MonotonicTimeNs,
    ) -> Result<(ReplayAttemptRecord, EnvelopeContent), ReplayError>
    where
        S: EnvelopeRepo + ReplayRepo,
    {
        let content = store
            .envelope_row_by_hash(envelope_hash)
            .map(|e| e.content.clone())
            .ok_or(ReplayError::EnvelopeNotFound)?;
        let attempt = store.insert_replay_attempt_row(envelope_hash.clone(), source, now)?;
        Ok((attempt, content))
    }

    /// Finalizes a PENDING attempt. An identical hash is SUCCESS; anything
    /// else is DRIFT_DETECTED with both hashes recorded.
    pub fn complete<S>(
        &self,
        store: &mut S,
        replay_id: &ReplayId,
        replay_hash: Sha256Hex,
        output_summary: Option<String>,
        now: MonotonicTimeNs,
    ) -> Result<ReplayAttemptRecord, ReplayError>
    where
        S: ReplayRepo,
    {
        let original_hash = store
            .replay_attempt_row(replay_id)
            .map(|a| a.original_hash.clone())
            .ok_or(ReplayError::ReplayNotFound)?;

        let (status, drift_details) = if replay_hash == original_hash {
            (ReplayStatus::Success, None)
        } else {
            (
                ReplayStatus::DriftDetected,
                Some(DriftDetails {
                    drift_type: DriftType::HashMismatch,
                    original_hash,
                    replay_hash: replay_hash.clone(),
                }),
            )
        };

        let record = store.complete_replay_attempt_row(
            replay_id,
            status,
            Some(replay_hash),
            drift_details,
            output_summary,
            now,
        )?;
        Ok(record)
    }

    pub fn history<'a, S>(
        &self,
        store: &'a S,
        envelope_hash: &Sha256Hex,
    ) -> Vec<&'a ReplayAttemptRecord>
    where
        S: ReplayRepo,
    {
        store.replay_attempt_rows_for_hash(envelope_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use meridian_contracts::ids::{
        PersonaId, PolicyId, TenantId, TerritorySlug, WorkspaceId,
    };
    use meridian_contracts::persona::PersonaScope;
    use meridian_contracts::policy::CapabilityId;
    use meridian_storage::{AuthorityStore, EnvelopeSealInput};

    fn hash(fill: char) -> Sha256Hex {
        Sha256Hex::new(&fill.to_string().repeat(64)).unwrap()
    }

    fn sealed_hash(store: &mut AuthorityStore) -> Sha256Hex {
        let content = EnvelopeContent::v1(
            PersonaId::new("pers_banking").unwrap(),
            1,
            PersonaScope::Global,
            Some(TerritorySlug::new("uae").unwrap()),
            vec!["score_lead".to_string()],
            vec![],
            CapabilityId::ordered().into_iter().collect::<BTreeSet<_>>(),
            "{}".to_string(),
        )
        .unwrap();
        let input = EnvelopeSealInput {
            tenant_id: TenantId::new("tenant_1").unwrap(),
            workspace_id: WorkspaceId::new("ws_1").unwrap(),
            persona_id: content.persona_id.clone(),
            policy_id: PolicyId::new("pol_banking_v1").unwrap(),
            policy_version: 1,
            territory: content.territory.clone(),
            resolution_path: "LOCAL(UAE) → REGIONAL(none) → GLOBAL".to_string(),
            scope: content.scope,
            allowed_tools: content.allowed_tools.clone(),
            content,
            expires_at: None,
        };
        let (envelope, _) = store.seal_envelope_row(input, MonotonicTimeNs(10)).unwrap();
        envelope.sha256_hash
    }

    #[test]
    fn at_replay_os_01_identical_hash_completes_success() {
        let mut store = AuthorityStore::new_in_memory();
        let envelope_hash = sealed_hash(&mut store);
        let coordinator = ReplayCoordinator::new();

        let (attempt, content) = coordinator
            .initiate(
                &mut store,
                &envelope_hash,
                GateSource::ValidationHarness,
                MonotonicTimeNs(20),
            )
            .unwrap();
        assert_eq!(attempt.replay_status, ReplayStatus::Pending);
        assert_eq!(content.payload_json, "{}");

        let done = coordinator
            .complete(
                &mut store,
                &attempt.replay_id,
                envelope_hash,
                Some("score_bp=8600".to_string()),
                MonotonicTimeNs(30),
            )
            .unwrap();
        assert_eq!(done.replay_status, ReplayStatus::Success);
        assert!(done.drift_details.is_none());
        assert_eq!(done.completed_at, Some(MonotonicTimeNs(30)));
    }

    #[test]
    fn at_replay_os_02_differing_hash_records_drift() {
        let mut store = AuthorityStore::new_in_memory();
        let envelope_hash = sealed_hash(&mut store);
        let coordinator = ReplayCoordinator::new();

        let (attempt, _) = coordinator
            .initiate(
                &mut store,
                &envelope_hash,
                GateSource::AdminConsole,
                MonotonicTimeNs(20),
            )
            .unwrap();

        let drifted = hash('d');
        let done = coordinator
            .complete(&mut store, &attempt.replay_id, drifted.clone(), None, MonotonicTimeNs(30))
            .unwrap();
        assert_eq!(done.replay_status, ReplayStatus::DriftDetected);
        let details = done.drift_details.unwrap();
        assert_eq!(details.drift_type, DriftType::HashMismatch);
        assert_eq!(details.original_hash, envelope_hash);
        assert_eq!(details.replay_hash, drifted);
    }

    #[test]
    fn at_replay_os_03_unknown_envelope_leaves_no_row() {
        let mut store = AuthorityStore::new_in_memory();
        let coordinator = ReplayCoordinator::new();
        let unknown = hash('f');

        let err = coordinator
            .initiate(
                &mut store,
                &unknown,
                GateSource::ValidationHarness,
                MonotonicTimeNs(20),
            )
            .unwrap_err();
        assert_eq!(err, ReplayError::EnvelopeNotFound);
        assert_eq!(err.authority_code(), AuthorityCode::EnvelopeNotSealed);
        assert!(coordinator.history(&store, &unknown).is_empty());
    }

    #[test]
    fn at_replay_os_04_complete_requires_existing_attempt() {
        let mut store = AuthorityStore::new_in_memory();
        let coordinator = ReplayCoordinator::new();
        let err = coordinator
            .complete(
                &mut store,
                &ReplayId::new("rp_missing").unwrap(),
                hash('a'),
                None,
                MonotonicTimeNs(30),
            )
            .unwrap_err();
        assert_eq!(err, ReplayError::ReplayNotFound);
        assert_eq!(err.authority_code(), AuthorityCode::ReplayNotFound);
    }

    #[test]
    fn at_replay_os_05_history_lists_independent_attempts() {
        let mut store = AuthorityStore::new_in_memory();
        let envelope_hash = sealed_hash(&mut store);
        let coordinator = ReplayCoordinator::new();

        let (a, _) = coordinator
            .initiate(
                &mut store,
                &envelope_hash,
                GateSource::ValidationHarness,
                MonotonicTimeNs(20),
            )
            .unwrap();
        let (b, _) = coordinator
            .initiate(
                &mut store,
                &envelope_hash,
                GateSource::AdminConsole,
                MonotonicTimeNs(21),
            )
            .unwrap();
        assert_ne!(a.replay_id, b.replay_id);

        coordinator
            .complete(&mut store, &a.replay_id, envelope_hash.clone(), None, MonotonicTimeNs(30))
            .unwrap();
        let history = coordinator.history(&store, &envelope_hash);
        assert_eq!(history.len(), 2);
        let terminal = history
            .iter()
            .filter(|r| r.replay_status.is_terminal())
            .count();
        assert_eq!(terminal, 1);
    }
}
