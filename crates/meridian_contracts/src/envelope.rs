#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::codes::AuthorityCode;
use crate::common::{validate_token, ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};
use crate::ids::{EnvelopeId, PersonaId, PolicyId, Sha256Hex, TenantId, TerritorySlug, WorkspaceId};
use crate::persona::PersonaScope;
use crate::policy::CapabilityId;

pub const ENVELOPE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeStatus {
    Sealed,
    Expired,
    Revoked,
}

impl EnvelopeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeStatus::Sealed => "SEALED",
            EnvelopeStatus::Expired => "EXPIRED",
            EnvelopeStatus::Revoked => "REVOKED",
        }
    }

    /// Lifecycle moves forward only: SEALED → EXPIRED or SEALED → REVOKED.
    pub fn can_transition_to(self, to: EnvelopeStatus) -> bool {
        matches!(
            (self, to),
            (EnvelopeStatus::Sealed, EnvelopeStatus::Expired)
                | (EnvelopeStatus::Sealed, EnvelopeStatus::Revoked)
        )
    }
}

/// Everything the decision engine is permitted to see and do, fully
/// materialized at seal time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EnvelopeContent {
    pub schema_version: SchemaVersion,
    pub persona_id: PersonaId,
    pub policy_version: u32,
    pub scope: PersonaScope,
    pub territory: Option<TerritorySlug>,
    pub allowed_intents: Vec<String>,
    pub forbidden_outputs: Vec<String>,
    pub allowed_tools: BTreeSet<CapabilityId>,
    /// Serialized context body carried for the decision engine. Not part of
    /// the content address.
    pub payload_json: String,
}

impl EnvelopeContent {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        persona_id: PersonaId,
        policy_version: u32,
        scope: PersonaScope,
        territory: Option<TerritorySlug>,
        allowed_intents: Vec<String>,
        forbidden_outputs: Vec<String>,
        allowed_tools: BTreeSet<CapabilityId>,
        payload_json: String,
    ) -> Result<Self, ContractViolation> {
        let content = Self {
            schema_version: ENVELOPE_CONTRACT_VERSION,
            persona_id,
            policy_version,
            scope,
            territory,
            allowed_intents,
            forbidden_outputs,
            allowed_tools,
            payload_json,
        };
        content.validate()?;
        Ok(content)
    }
}

impl Validate for EnvelopeContent {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != ENVELOPE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "envelope_content.schema_version",
                reason: "must match ENVELOPE_CONTRACT_VERSION",
            });
        }
        if self.policy_version == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "envelope_content.policy_version",
                reason: "must be >= 1",
            });
        }
        for intent in &self.allowed_intents {
            validate_token("envelope_content.allowed_intents", intent, 96)?;
        }
        for output in &self.forbidden_outputs {
            validate_token("envelope_content.forbidden_outputs", output, 96)?;
        }
        if self.payload_json.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "envelope_content.payload_json",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

/// The single canonical hashing contract for envelopes (version 1).
///
/// The digest covers the behavior-affecting fields only, in a fixed field
/// order, with list fields sorted. Field records are joined with `\x1e` and
/// list items with `\x1f`; both are control characters and therefore cannot
/// appear inside validated values, so the serialization is unambiguous.
/// Timestamps, ids, the resolution path, and the carried payload are
/// excluded so sealing stays idempotent under metadata changes.
pub struct CanonicalEnvelopeV1;

impl CanonicalEnvelopeV1 {
    pub const SCHEMA_TAG: &'static str = "meridian.envelope.v1";

    pub fn canonical_bytes(content: &EnvelopeContent) -> Vec<u8> {
        let mut intents: Vec<&str> = content.allowed_intents.iter().map(String::as_str).collect();
        intents.sort_unstable();
        let mut outputs: Vec<&str> = content
            .forbidden_outputs
            .iter()
            .map(String::as_str)
            .collect();
        outputs.sort_unstable();
        // BTreeSet iteration is already ordered.
        let tools: Vec<&str> = content.allowed_tools.iter().map(|t| t.as_str()).collect();

        let fields = [
            Self::SCHEMA_TAG.to_string(),
            content.persona_id.as_str().to_string(),
            content.policy_version.to_string(),
            content.scope.as_str().to_string(),
            content
                .territory
                .as_ref()
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| "-".to_string()),
            intents.join("\u{1f}"),
            outputs.join("\u{1f}"),
            tools.join("\u{1f}"),
        ];
        fields.join("\u{1e}").into_bytes()
    }

    pub fn content_hash(content: &EnvelopeContent) -> Sha256Hex {
        let digest = Sha256::digest(Self::canonical_bytes(content));
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Sha256Hex::from_digest(&bytes)
    }
}

/// The immutable, content-addressed authorization artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeRecord {
    pub schema_version: SchemaVersion,
    pub envelope_id: EnvelopeId,
    pub envelope_version: u32,
    pub sha256_hash: Sha256Hex,
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
    pub status: EnvelopeStatus,
    pub sealed_at: MonotonicTimeNs,
    pub expires_at: Option<MonotonicTimeNs>,
}

impl EnvelopeRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        envelope_id: EnvelopeId,
        envelope_version: u32,
        sha256_hash: Sha256Hex,
        tenant_id: TenantId,
        workspace_id: WorkspaceId,
        persona_id: PersonaId,
        policy_id: PolicyId,
        policy_version: u32,
        territory: Option<TerritorySlug>,
        resolution_path: String,
        scope: PersonaScope,
        allowed_tools: BTreeSet<CapabilityId>,
        content: EnvelopeContent,
        sealed_at: MonotonicTimeNs,
        expires_at: Option<MonotonicTimeNs>,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: ENVELOPE_CONTRACT_VERSION,
            envelope_id,
            envelope_version,
            sha256_hash,
            tenant_id,
            workspace_id,
            persona_id,
            policy_id,
            policy_version,
            territory,
            resolution_path,
            scope,
            allowed_tools,
            content,
            status: EnvelopeStatus::Sealed,
            sealed_at,
            expires_at,
        };
        record.validate()?;
        Ok(record)
    }

    /// Expiry against the injected clock; a stored EXPIRED status and a
    /// passed `expires_at` are equivalent for gating purposes.
    pub fn is_expired_at(&self, now: MonotonicTimeNs) -> bool {
        if self.status == EnvelopeStatus::Expired {
            return true;
        }
        matches!(self.expires_at, Some(at) if at.0 <= now.0)
    }
}

impl Validate for EnvelopeRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != ENVELOPE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "envelope_record.schema_version",
                reason: "must match ENVELOPE_CONTRACT_VERSION",
            });
        }
        if self.envelope_version == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "envelope_record.envelope_version",
                reason: "must be >= 1",
            });
        }
        validate_token("envelope_record.resolution_path", &self.resolution_path, 512)?;
        self.content.validate()?;
        if self.sha256_hash != CanonicalEnvelopeV1::content_hash(&self.content) {
            return Err(ContractViolation::InvalidValue {
                field: "envelope_record.sha256_hash",
                reason: "must equal the canonical content hash",
            });
        }
        if self.persona_id != self.content.persona_id {
            return Err(ContractViolation::InvalidValue {
                field: "envelope_record.persona_id",
                reason: "must match content.persona_id",
            });
        }
        if self.policy_version != self.content.policy_version {
            return Err(ContractViolation::InvalidValue {
                field: "envelope_record.policy_version",
                reason: "must match content.policy_version",
            });
        }
        if self.allowed_tools != self.content.allowed_tools {
            return Err(ContractViolation::InvalidValue {
                field: "envelope_record.allowed_tools",
                reason: "must match content.allowed_tools",
            });
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at.0 <= self.sealed_at.0 {
                return Err(ContractViolation::InvalidValue {
                    field: "envelope_record.expires_at",
                    reason: "must be after sealed_at",
                });
            }
        }
        Ok(())
    }
}

/// Outcome of a seal call. `is_new = false` means an envelope with the same
/// content hash already existed and was returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealOutcome {
    pub envelope: EnvelopeRecord,
    pub is_new: bool,
}

/// Verification report with a message drawn from the fixed vocabulary that
/// downstream gates pattern-match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub is_valid: bool,
    pub status: Option<EnvelopeStatus>,
    pub verification_message: AuthorityCode,
}
