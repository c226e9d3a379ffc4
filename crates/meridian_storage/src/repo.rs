#![forbid(unsafe_code)]

use meridian_contracts::envelope::{EnvelopeRecord, EnvelopeStatus};
use meridian_contracts::gate::{
    GateCheckRequest, GateSource, GateViolationRecord, ResolutionStatus, ViolationCode,
};
use meridian_contracts::ids::{
    EnvelopeId, PersonaId, ReplayId, Sha256Hex, SubVertical, TerritorySlug,
};
use meridian_contracts::persona::PersonaRecord;
use meridian_contracts::policy::PolicyRecord;
use meridian_contracts::replay::{DriftDetails, ReplayAttemptRecord, ReplayStatus};
use meridian_contracts::territory::TerritoryRecord;
use meridian_contracts::{MonotonicTimeNs, SchemaVersion};

use crate::store::{AuthorityStore, EnvelopeSealInput, StorageError};

/// Typed repository interface for persona rows.
pub trait PersonaRepo {
    fn insert_persona_row(&mut self, record: PersonaRecord) -> Result<(), StorageError>;
    fn deactivate_persona_row(&mut self, persona_id: &PersonaId) -> Result<(), StorageError>;
    fn persona_row(&self, persona_id: &PersonaId) -> Option<&PersonaRecord>;
    fn persona_rows_for(&self, sub_vertical: &SubVertical) -> Vec<&PersonaRecord>;
}

/// Typed repository interface for the versioned policy ledger with the
/// one-ACTIVE-per-persona constraint.
pub trait PolicyRepo {
    fn insert_policy_row(&mut self, record: PolicyRecord) -> Result<(), StorageError>;
    fn supersede_and_activate_policy_row(&mut self, record: PolicyRecord)
        -> Result<(), StorageError>;
    fn active_policy_row(
        &self,
        persona_id: &PersonaId,
    ) -> Result<Option<&PolicyRecord>, StorageError>;
    fn policy_history_rows(&self, persona_id: &PersonaId) -> Vec<&PolicyRecord>;
}

/// Typed repository interface for hierarchical territory rows.
pub trait TerritoryRepo {
    fn insert_territory_row(&mut self, record: TerritoryRecord) -> Result<(), StorageError>;
    fn territory_row(&self, slug: &TerritorySlug) -> Option<&TerritoryRecord>;
    fn territory_row_by_country(&self, country_code: &str) -> Option<&TerritoryRecord>;
    fn territory_row_by_name(&self, name: &str) -> Option<&TerritoryRecord>;
    fn global_territory_row(&self) -> Option<&TerritoryRecord>;
}

/// Typed repository interface for hash-unique envelope rows.
pub trait EnvelopeRepo {
    fn seal_envelope_row(
        &mut self,
        input: EnvelopeSealInput,
        now: MonotonicTimeNs,
    ) -> Result<(EnvelopeRecord, bool), StorageError>;
    fn envelope_row(&self, envelope_id: &EnvelopeId) -> Option<&EnvelopeRecord>;
    fn envelope_row_by_hash(&self, hash: &Sha256Hex) -> Option<&EnvelopeRecord>;
    fn set_envelope_status(
        &mut self,
        envelope_id: &EnvelopeId,
        to: EnvelopeStatus,
    ) -> Result<(), StorageError>;
}

/// Typed repository interface for the append-only gate violation ledger.
pub trait GateViolationRepo {
    fn append_gate_violation_row(
        &mut self,
        code: ViolationCode,
        request: &GateCheckRequest,
        occurred_at: MonotonicTimeNs,
    ) -> Result<u64, StorageError>;
    fn gate_violation_rows(&self) -> &[GateViolationRecord];
    fn resolve_gate_violation_row(
        &mut self,
        violation_seq: u64,
        resolution: ResolutionStatus,
    ) -> Result<(), StorageError>;
}

/// Typed repository interface for replay attempts (terminal once completed).
pub trait ReplayRepo {
    fn insert_replay_attempt_row(
        &mut self,
        envelope_hash: Sha256Hex,
        source: GateSource,
        initiated_at: MonotonicTimeNs,
    ) -> Result<ReplayAttemptRecord, StorageError>;
    fn complete_replay_attempt_row(
        &mut self,
        replay_id: &ReplayId,
        status: ReplayStatus,
        replay_hash: Option<Sha256Hex>,
        drift_details: Option<DriftDetails>,
        output_summary: Option<String>,
        completed_at: MonotonicTimeNs,
    ) -> Result<ReplayAttemptRecord, StorageError>;
    fn replay_attempt_row(&self, replay_id: &ReplayId) -> Option<&ReplayAttemptRecord>;
    fn replay_attempt_rows_for_hash(&self, hash: &Sha256Hex) -> Vec<&ReplayAttemptRecord>;
}

/// Control-plane marker read.
pub trait ControlPlaneRepo {
    fn control_plane_version(&self) -> SchemaVersion;
}

impl PersonaRepo for AuthorityStore {
    fn insert_persona_row(&mut self, record: PersonaRecord) -> Result<(), StorageError> {
        AuthorityStore::insert_persona_row(self, record)
    }

    fn deactivate_persona_row(&mut self, persona_id: &PersonaId) -> Result<(), StorageError> {
        AuthorityStore::deactivate_persona_row(self, persona_id)
    }

    fn persona_row(&self, persona_id: &PersonaId) -> Option<&PersonaRecord> {
        AuthorityStore::persona_row(self, persona_id)
    }

    fn persona_rows_for(&self, sub_vertical: &SubVertical) -> Vec<&PersonaRecord> {
        AuthorityStore::persona_rows_for(self, sub_vertical)
    }
}

impl PolicyRepo for AuthorityStore {
    fn insert_policy_row(&mut self, record: PolicyRecord) -> Result<(), StorageError> {
        AuthorityStore::insert_policy_row(self, record)
    }

    fn supersede_and_activate_policy_row(
        &mut self,
        record: PolicyRecord,
    ) -> Result<(), StorageError> {
        AuthorityStore::supersede_and_activate_policy_row(self, record)
    }

    fn active_policy_row(
        &self,
        persona_id: &PersonaId,
    ) -> Result<Option<&PolicyRecord>, StorageError> {
        AuthorityStore::active_policy_row(self, persona_id)
    }

    fn policy_history_rows(&self, persona_id: &PersonaId) -> Vec<&PolicyRecord> {
        AuthorityStore::policy_history_rows(self, persona_id)
    }
}

impl TerritoryRepo for AuthorityStore {
    fn insert_territory_row(&mut self, record: TerritoryRecord) -> Result<(), StorageError> {
        AuthorityStore::insert_territory_row(self, record)
    }

    fn territory_row(&self, slug: &TerritorySlug) -> Option<&TerritoryRecord> {
        AuthorityStore::territory_row(self, slug)
    }

    fn territory_row_by_country(&self, country_code: &str) -> Option<&TerritoryRecord> {
        AuthorityStore::territory_row_by_country(self, country_code)
    }

    fn territory_row_by_name(&self, name: &str) -> Option<&TerritoryRecord> {
        AuthorityStore::territory_row_by_name(self, name)
    }

    fn global_territory_row(&self) -> Option<&TerritoryRecord> {
        AuthorityStore::global_territory_row(self)
    }
}

impl EnvelopeRepo for AuthorityStore {
    fn seal_envelope_row(
        &mut self,
        input: EnvelopeSealInput,
        now: MonotonicTimeNs,
    ) -> Result<(EnvelopeRecord, bool), StorageError> {
        AuthorityStore::seal_envelope_row(self, input, now)
    }

    fn envelope_row(&self, envelope_id: &EnvelopeId) -> Option<&EnvelopeRecord> {
        AuthorityStore::envelope_row(self, envelope_id)
    }

    fn envelope_row_by_hash(&self, hash: &Sha256Hex) -> Option<&EnvelopeRecord> {
        AuthorityStore::envelope_row_by_hash(self, hash)
    }

    fn set_envelope_status(
        &mut self,
        envelope_id: &EnvelopeId,
        to: EnvelopeStatus,
    ) -> Result<(), StorageError> {
        AuthorityStore::set_envelope_status(self, envelope_id, to)
    }
}

impl GateViolationRepo for AuthorityStore {
    fn append_gate_violation_row(
        &mut self,
        code: ViolationCode,
        request: &GateCheckRequest,
        occurred_at: MonotonicTimeNs,
    ) -> Result<u64, StorageError> {
        AuthorityStore::append_gate_violation_row(self, code, request, occurred_at)
    }

    fn gate_violation_rows(&self) -> &[GateViolationRecord] {
        AuthorityStore::gate_violation_rows(self)
    }

    fn resolve_gate_violation_row(
        &mut self,
        violation_seq: u64,
        resolution: ResolutionStatus,
    ) -> Result<(), StorageError> {
        AuthorityStore::resolve_gate_violation_row(self, violation_seq, resolution)
    }
}

impl ReplayRepo for AuthorityStore {
    fn insert_replay_attempt_row(
        &mut self,
        envelope_hash: Sha256Hex,
        source: GateSource,
        initiated_at: MonotonicTimeNs,
    ) -> Result<ReplayAttemptRecord, StorageError> {
        AuthorityStore::insert_replay_attempt_row(self, envelope_hash, source, initiated_at)
    }

    fn complete_replay_attempt_row(
        &mut self,
        replay_id: &ReplayId,
        status: ReplayStatus,
        replay_hash: Option<Sha256Hex>,
        drift_details: Option<DriftDetails>,
        output_summary: Option<String>,
        completed_at: MonotonicTimeNs,
    ) -> Result<ReplayAttemptRecord, StorageError> {
        AuthorityStore::complete_replay_attempt_row(
            self,
            replay_id,
            status,
            replay_hash,
            drift_details,
            output_summary,
            completed_at,
        )
    }

    fn replay_attempt_row(&self, replay_id: &ReplayId) -> Option<&ReplayAttemptRecord> {
        AuthorityStore::replay_attempt_row(self, replay_id)
    }

    fn replay_attempt_rows_for_hash(&self, hash: &Sha256Hex) -> Vec<&ReplayAttemptRecord> {
        AuthorityStore::replay_attempt_rows_for_hash(self, hash)
    }
}

impl ControlPlaneRepo for AuthorityStore {
    fn control_plane_version(&self) -> SchemaVersion {
        AuthorityStore::control_plane_version(self)
    }
}
