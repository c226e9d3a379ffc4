#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use meridian_contracts::envelope::{
    CanonicalEnvelopeV1, EnvelopeContent, EnvelopeRecord, EnvelopeStatus,
};
use meridian_contracts::gate::{
    GateCheckRequest, GateSource, GateViolationRecord, ResolutionStatus, ViolationCode,
};
use meridian_contracts::ids::{
    EnvelopeId, PersonaId, PolicyId, ReplayId, Sha256Hex, SubVertical, TenantId, TerritorySlug,
    WorkspaceId,
};
use meridian_contracts::persona::{PersonaRecord, PersonaScope};
use meridian_contracts::policy::{CapabilityId, PolicyRecord, PolicyStatus};
use meridian_contracts::replay::{DriftDetails, ReplayAttemptRecord, ReplayStatus};
use meridian_contracts::territory::{TerritoryLevel, TerritoryRecord};
use meridian_contracts::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

/// Control-plane schema/behavior version marker, surfaced for operational
/// traceability.
pub const CONTROL_PLANE_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    ForeignKeyViolation { table: &'static str, key: String },
    DuplicateKey { table: &'static str, key: String },
    AppendOnlyViolation { table: &'static str },
    /// The exactly-one-ACTIVE-policy-per-persona constraint. Observing this
    /// outside an insert path is an integrity failure, never repaired here.
    UniqueActiveViolation { table: &'static str, key: String },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

/// Inputs to a seal call. The store computes the content address itself so
/// callers cannot bypass the canonical hashing contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeSealInput {
    pub tenant_id: TenantId,
    pub workspace_id: WorkspaceId,
    pub persona_id: PersonaId,
    pub policy_id: PolicyId,
    pub policy_version: u32,
    pub territory: Option<TerritorySlug>,
    pub resolution_path: String,
    pub scope: PersonaScope,
    pub allowed_tools: BTreeSet<CapabilityId>,
    pub content: EnvelopeContent,
    pub expires_at: Option<MonotonicTimeNs>,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorityStore {
    personas: BTreeMap<PersonaId, PersonaRecord>,

    // Policy ledger is append-only history; the index is the authoritative
    // one-ACTIVE-per-persona constraint.
    policy_ledger: Vec<PolicyRecord>,
    active_policy_index: BTreeMap<PersonaId, PolicyId>,

    territories: BTreeMap<TerritorySlug, TerritoryRecord>,
    global_territory: Option<TerritorySlug>,

    envelopes: BTreeMap<EnvelopeId, EnvelopeRecord>,
    // Content address -> envelope currently in effect for that content.
    envelope_hash_index: BTreeMap<Sha256Hex, EnvelopeId>,
    next_envelope_seq: u64,

    gate_violations: Vec<GateViolationRecord>,

    replay_attempts: BTreeMap<ReplayId, ReplayAttemptRecord>,
    next_replay_seq: u64,
}

impl AuthorityStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    pub fn control_plane_version(&self) -> SchemaVersion {
        CONTROL_PLANE_VERSION
    }

    // ------------------------
    // personas
    // ------------------------

    pub fn insert_persona_row(&mut self, record: PersonaRecord) -> Result<(), StorageError> {
        record.validate()?;
        if self.personas.contains_key(&record.persona_id) {
            return Err(StorageError::DuplicateKey {
                table: "personas",
                key: record.persona_id.as_str().to_string(),
            });
        }
        if let Some(parent) = &record.parent {
            if !self.personas.contains_key(parent) {
                return Err(StorageError::ForeignKeyViolation {
                    table: "personas",
                    key: parent.as_str().to_string(),
                });
            }
        }
        self.personas.insert(record.persona_id.clone(), record);
        Ok(())
    }

    /// Personas are never deleted, only deactivated.
    pub fn deactivate_persona_row(&mut self, persona_id: &PersonaId) -> Result<(), StorageError> {
        let record = self
            .personas
            .get_mut(persona_id)
            .ok_or(StorageError::ForeignKeyViolation {
                table: "personas",
                key: persona_id.as_str().to_string(),
            })?;
        record.active = false;
        Ok(())
    }

    pub fn persona_row(&self, persona_id: &PersonaId) -> Option<&PersonaRecord> {
        self.personas.get(persona_id)
    }

    pub fn persona_rows_for(&self, sub_vertical: &SubVertical) -> Vec<&PersonaRecord> {
        self.personas
            .values()
            .filter(|p| &p.sub_vertical == sub_vertical)
            .collect()
    }

    // ------------------------
    // persona policies
    // ------------------------

    pub fn insert_policy_row(&mut self, record: PolicyRecord) -> Result<(), StorageError> {
        record.validate()?;
        if !self.personas.contains_key(&record.persona_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "persona_policies",
                key: record.persona_id.as_str().to_string(),
            });
        }
        if self
            .policy_ledger
            .iter()
            .any(|p| p.policy_id == record.policy_id)
        {
            return Err(StorageError::DuplicateKey {
                table: "persona_policies",
                key: record.policy_id.as_str().to_string(),
            });
        }
        if let Some(latest) = self.latest_policy_version(&record.persona_id) {
            if record.policy_version <= latest {
                return Err(StorageError::DuplicateKey {
                    table: "persona_policies",
                    key: format!(
                        "{}@v{}",
                        record.persona_id.as_str(),
                        record.policy_version
                    ),
                });
            }
        }
        if record.status == PolicyStatus::Active {
            if self.active_policy_index.contains_key(&record.persona_id) {
                return Err(StorageError::UniqueActiveViolation {
                    table: "persona_policies",
                    key: record.persona_id.as_str().to_string(),
                });
            }
            self.active_policy_index
                .insert(record.persona_id.clone(), record.policy_id.clone());
        }
        self.policy_ledger.push(record);
        Ok(())
    }

    /// Atomically supersedes the current ACTIVE policy (if any) and activates
    /// the new version. The only path that replaces an active policy.
    pub fn supersede_and_activate_policy_row(
        &mut self,
        record: PolicyRecord,
    ) -> Result<(), StorageError> {
        record.validate()?;
        if record.status != PolicyStatus::Active {
            return Err(StorageError::ContractViolation(
                ContractViolation::InvalidValue {
                    field: "policy_record.status",
                    reason: "supersede_and_activate requires an ACTIVE record",
                },
            ));
        }
        if let Some(previous_id) = self.active_policy_index.remove(&record.persona_id) {
            for row in self.policy_ledger.iter_mut() {
                if row.policy_id == previous_id {
                    row.status = PolicyStatus::Superseded;
                }
            }
        }
        self.insert_policy_row(record)
    }

    /// The unambiguous ACTIVE policy lookup. More than one ACTIVE row in the
    /// ledger is an unrecoverable integrity error.
    pub fn active_policy_row(
        &self,
        persona_id: &PersonaId,
    ) -> Result<Option<&PolicyRecord>, StorageError> {
        let active: Vec<&PolicyRecord> = self
            .policy_ledger
            .iter()
            .filter(|p| &p.persona_id == persona_id && p.status == PolicyStatus::Active)
            .collect();
        match active.len() {
            0 => Ok(None),
            1 => Ok(Some(active[0])),
            _ => Err(StorageError::UniqueActiveViolation {
                table: "persona_policies",
                key: persona_id.as_str().to_string(),
            }),
        }
    }

    pub fn policy_history_rows(&self, persona_id: &PersonaId) -> Vec<&PolicyRecord> {
        self.policy_ledger
            .iter()
            .filter(|p| &p.persona_id == persona_id)
            .collect()
    }

    fn latest_policy_version(&self, persona_id: &PersonaId) -> Option<u32> {
        self.policy_ledger
            .iter()
            .filter(|p| &p.persona_id == persona_id)
            .map(|p| p.policy_version)
            .max()
    }

    // ------------------------
    // territories
    // ------------------------

    pub fn insert_territory_row(&mut self, record: TerritoryRecord) -> Result<(), StorageError> {
        record.validate()?;
        if self.territories.contains_key(&record.slug) {
            return Err(StorageError::DuplicateKey {
                table: "territories",
                key: record.slug.as_str().to_string(),
            });
        }
        if record.level == TerritoryLevel::Global {
            if self.global_territory.is_some() {
                return Err(StorageError::DuplicateKey {
                    table: "territories",
                    key: "global".to_string(),
                });
            }
            self.global_territory = Some(record.slug.clone());
        }
        if let Some(parent) = &record.parent {
            if !self.territories.contains_key(parent) {
                return Err(StorageError::ForeignKeyViolation {
                    table: "territories",
                    key: parent.as_str().to_string(),
                });
            }
        }
        self.territories.insert(record.slug.clone(), record);
        Ok(())
    }

    pub fn territory_row(&self, slug: &TerritorySlug) -> Option<&TerritoryRecord> {
        self.territories.get(slug)
    }

    pub fn territory_row_by_country(&self, country_code: &str) -> Option<&TerritoryRecord> {
        self.territories
            .values()
            .find(|t| t.country_code.as_deref() == Some(country_code))
    }

    pub fn territory_row_by_name(&self, name: &str) -> Option<&TerritoryRecord> {
        self.territories
            .values()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn global_territory_row(&self) -> Option<&TerritoryRecord> {
        self.global_territory
            .as_ref()
            .and_then(|slug| self.territories.get(slug))
    }

    // ------------------------
    // envelopes
    // ------------------------

    /// Idempotent on the canonical content hash: concurrent sealers with the
    /// same content converge on one row. A hash whose envelope was revoked or
    /// expired re-seals as a new version under the same content address.
    pub fn seal_envelope_row(
        &mut self,
        input: EnvelopeSealInput,
        now: MonotonicTimeNs,
    ) -> Result<(EnvelopeRecord, bool), StorageError> {
        input.content.validate()?;
        let hash = CanonicalEnvelopeV1::content_hash(&input.content);

        if let Some(existing_id) = self.envelope_hash_index.get(&hash) {
            let existing = self
                .envelopes
                .get(existing_id)
                .ok_or(StorageError::ForeignKeyViolation {
                    table: "envelopes",
                    key: existing_id.as_str().to_string(),
                })?;
            if existing.status == EnvelopeStatus::Sealed && !existing.is_expired_at(now) {
                return Ok((existing.clone(), false));
            }
        }

        let envelope_version = self
            .envelope_hash_index
            .get(&hash)
            .and_then(|id| self.envelopes.get(id))
            .map(|e| e.envelope_version + 1)
            .unwrap_or(1);

        self.next_envelope_seq += 1;
        let envelope_id = EnvelopeId::new(&format!("env_{:08}", self.next_envelope_seq))?;
        let record = EnvelopeRecord::v1(
            envelope_id.clone(),
            envelope_version,
            hash.clone(),
            input.tenant_id,
            input.workspace_id,
            input.persona_id,
            input.policy_id,
            input.policy_version,
            input.territory,
            input.resolution_path,
            input.scope,
            input.allowed_tools,
            input.content,
            now,
            input.expires_at,
        )?;
        self.envelope_hash_index.insert(hash, envelope_id.clone());
        self.envelopes.insert(envelope_id, record.clone());
        Ok((record, true))
    }

    pub fn envelope_row(&self, envelope_id: &EnvelopeId) -> Option<&EnvelopeRecord> {
        self.envelopes.get(envelope_id)
    }

    pub fn envelope_row_by_hash(&self, hash: &Sha256Hex) -> Option<&EnvelopeRecord> {
        self.envelope_hash_index
            .get(hash)
            .and_then(|id| self.envelopes.get(id))
    }

    /// Forward-only lifecycle: SEALED → EXPIRED or SEALED → REVOKED.
    pub fn set_envelope_status(
        &mut self,
        envelope_id: &EnvelopeId,
        to: EnvelopeStatus,
    ) -> Result<(), StorageError> {
        let record =
            self.envelopes
                .get_mut(envelope_id)
                .ok_or(StorageError::ForeignKeyViolation {
                    table: "envelopes",
                    key: envelope_id.as_str().to_string(),
                })?;
        if !record.status.can_transition_to(to) {
            return Err(StorageError::AppendOnlyViolation { table: "envelopes" });
        }
        record.status = to;
        Ok(())
    }

    // ------------------------
    // gate violations (append-only)
    // ------------------------

    pub fn append_gate_violation_row(
        &mut self,
        code: ViolationCode,
        request: &GateCheckRequest,
        occurred_at: MonotonicTimeNs,
    ) -> Result<u64, StorageError> {
        let seq = self.gate_violations.len() as u64 + 1;
        let record = GateViolationRecord::v1(seq, code, request, occurred_at)?;
        self.gate_violations.push(record);
        Ok(seq)
    }

    pub fn gate_violation_rows(&self) -> &[GateViolationRecord] {
        &self.gate_violations
    }

    /// Administrative resolution. Only the resolution status mutates, and
    /// only away from UNRESOLVED; the violation itself is immutable history.
    pub fn resolve_gate_violation_row(
        &mut self,
        violation_seq: u64,
        resolution: ResolutionStatus,
    ) -> Result<(), StorageError> {
        if resolution == ResolutionStatus::Unresolved {
            return Err(StorageError::ContractViolation(
                ContractViolation::InvalidValue {
                    field: "gate_violation.resolution_status",
                    reason: "cannot resolve back to UNRESOLVED",
                },
            ));
        }
        let record = self
            .gate_violations
            .iter_mut()
            .find(|v| v.violation_seq == violation_seq)
            .ok_or(StorageError::ForeignKeyViolation {
                table: "runtime_gate_violations",
                key: violation_seq.to_string(),
            })?;
        if record.resolution_status != ResolutionStatus::Unresolved {
            return Err(StorageError::AppendOnlyViolation {
                table: "runtime_gate_violations",
            });
        }
        record.resolution_status = resolution;
        Ok(())
    }

    // ------------------------
    // replay attempts
    // ------------------------

    pub fn insert_replay_attempt_row(
        &mut self,
        envelope_hash: Sha256Hex,
        source: GateSource,
        initiated_at: MonotonicTimeNs,
    ) -> Result<ReplayAttemptRecord, StorageError> {
        self.next_replay_seq += 1;
        let replay_id = ReplayId::new(&format!("rp_{:08}", self.next_replay_seq))?;
        let record =
            ReplayAttemptRecord::pending_v1(replay_id.clone(), envelope_hash, source, initiated_at)?;
        self.replay_attempts.insert(replay_id, record.clone());
        Ok(record)
    }

    /// Finalizes an attempt exactly once. Completed attempts are audit
    /// history; re-completion is an append-only violation.
    pub fn complete_replay_attempt_row(
        &mut self,
        replay_id: &ReplayId,
        status: ReplayStatus,
        replay_hash: Option<Sha256Hex>,
        drift_details: Option<DriftDetails>,
        output_summary: Option<String>,
        completed_at: MonotonicTimeNs,
    ) -> Result<ReplayAttemptRecord, StorageError> {
        if !status.is_terminal() {
            return Err(StorageError::ContractViolation(
                ContractViolation::InvalidValue {
                    field: "replay_attempt.replay_status",
                    reason: "completion requires a terminal status",
                },
            ));
        }
        let record = self
            .replay_attempts
            .get_mut(replay_id)
            .ok_or(StorageError::ForeignKeyViolation {
                table: "replay_attempts",
                key: replay_id.as_str().to_string(),
            })?;
        if record.replay_status.is_terminal() {
            return Err(StorageError::AppendOnlyViolation {
                table: "replay_attempts",
            });
        }
        let mut updated = record.clone();
        updated.replay_status = status;
        updated.replay_hash = replay_hash;
        updated.drift_details = drift_details;
        updated.output_summary = output_summary;
        updated.completed_at = Some(completed_at);
        updated.validate()?;
        *record = updated.clone();
        Ok(updated)
    }

    pub fn replay_attempt_row(&self, replay_id: &ReplayId) -> Option<&ReplayAttemptRecord> {
        self.replay_attempts.get(replay_id)
    }

    pub fn replay_attempt_rows_for_hash(&self, hash: &Sha256Hex) -> Vec<&ReplayAttemptRecord> {
        self.replay_attempts
            .values()
            .filter(|a| &a.envelope_hash == hash)
            .collect()
    }
}
