#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};

use crate::common::{validate_token, ContractViolation, SchemaVersion, Validate};
use crate::ids::Sha256Hex;
use crate::policy::CapabilityId;
use crate::scoring::MAX_SCORE_BP;

pub const DECISION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Operating mode selects the outcome vocabulary. Switched by an explicit
/// flag, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionMode {
    Discovery,
    Standard,
}

impl DecisionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionMode::Discovery => "DISCOVERY",
            DecisionMode::Standard => "STANDARD",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DISCOVERY" => Some(DecisionMode::Discovery),
            "STANDARD" => Some(DecisionMode::Standard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionOutcome {
    Act,
    Wait,
    Ignore,
    Block,
    Pass,
}

impl DecisionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionOutcome::Act => "ACT",
            DecisionOutcome::Wait => "WAIT",
            DecisionOutcome::Ignore => "IGNORE",
            DecisionOutcome::Block => "BLOCK",
            DecisionOutcome::Pass => "PASS",
        }
    }

    pub fn legal_in(self, mode: DecisionMode) -> bool {
        match mode {
            DecisionMode::Discovery => matches!(
                self,
                DecisionOutcome::Act
                    | DecisionOutcome::Wait
                    | DecisionOutcome::Ignore
                    | DecisionOutcome::Block
            ),
            DecisionMode::Standard => {
                matches!(self, DecisionOutcome::Pass | DecisionOutcome::Block)
            }
        }
    }
}

/// Three score bands by fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreTier {
    Priority,
    Standard,
    Deferred,
}

impl ScoreTier {
    pub const PRIORITY_THRESHOLD_BP: u16 = 7_000;
    pub const STANDARD_THRESHOLD_BP: u16 = 4_000;

    pub fn from_score_bp(score_bp: u16) -> Self {
        if score_bp >= Self::PRIORITY_THRESHOLD_BP {
            ScoreTier::Priority
        } else if score_bp >= Self::STANDARD_THRESHOLD_BP {
            ScoreTier::Standard
        } else {
            ScoreTier::Deferred
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreTier::Priority => "PRIORITY",
            ScoreTier::Standard => "STANDARD",
            ScoreTier::Deferred => "DEFERRED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityRunStatus {
    Success,
    Failed,
    DeniedByPolicy,
}

impl CapabilityRunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityRunStatus::Success => "SUCCESS",
            CapabilityRunStatus::Failed => "FAILED",
            CapabilityRunStatus::DeniedByPolicy => "DENIED_BY_POLICY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTraceEntry {
    pub capability: CapabilityId,
    pub status: CapabilityRunStatus,
    pub duration_ns: u64,
    pub input_hash: Sha256Hex,
    pub output_hash: Option<Sha256Hex>,
}

/// One policy-gate evaluation. A DENIED hit means the capability was skipped
/// and its neutral contribution substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyGateTraceEntry {
    pub capability: CapabilityId,
    pub allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceRef {
    pub source: String,
    pub content_hash: Sha256Hex,
}

/// What happened during one decision-engine invocation; the material the
/// replay detector re-derives and compares.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionTrace {
    pub capabilities: Vec<CapabilityTraceEntry>,
    pub policy_gates: Vec<PolicyGateTraceEntry>,
    pub evidence: Vec<EvidenceRef>,
    pub total_duration_ns: u64,
}

impl ExecutionTrace {
    pub fn denied_capabilities(&self) -> Vec<CapabilityId> {
        self.policy_gates
            .iter()
            .filter(|g| !g.allowed)
            .map(|g| g.capability)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionResult {
    pub schema_version: SchemaVersion,
    pub mode: DecisionMode,
    pub score_bp: u16,
    pub tier: ScoreTier,
    pub outcome: DecisionOutcome,
    pub reason: String,
    pub trace: ExecutionTrace,
    pub content_hash: Sha256Hex,
}

impl DecisionResult {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        mode: DecisionMode,
        score_bp: u16,
        tier: ScoreTier,
        outcome: DecisionOutcome,
        reason: String,
        trace: ExecutionTrace,
    ) -> Result<Self, ContractViolation> {
        let content_hash = CanonicalDecisionV1::content_hash(mode, score_bp, tier, outcome, &trace);
        let result = Self {
            schema_version: DECISION_CONTRACT_VERSION,
            mode,
            score_bp,
            tier,
            outcome,
            reason,
            trace,
            content_hash,
        };
        result.validate()?;
        Ok(result)
    }
}

impl Validate for DecisionResult {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != DECISION_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "decision_result.schema_version",
                reason: "must match DECISION_CONTRACT_VERSION",
            });
        }
        if self.score_bp > MAX_SCORE_BP {
            return Err(ContractViolation::InvalidValue {
                field: "decision_result.score_bp",
                reason: "must be <= 10000",
            });
        }
        if !self.outcome.legal_in(self.mode) {
            return Err(ContractViolation::InvalidValue {
                field: "decision_result.outcome",
                reason: "outcome not legal for the operating mode",
            });
        }
        if self.tier != ScoreTier::from_score_bp(self.score_bp) {
            return Err(ContractViolation::InvalidValue {
                field: "decision_result.tier",
                reason: "must match the score thresholds",
            });
        }
        validate_token("decision_result.reason", &self.reason, 256)?;
        if self.content_hash
            != CanonicalDecisionV1::content_hash(
                self.mode,
                self.score_bp,
                self.tier,
                self.outcome,
                &self.trace,
            )
        {
            return Err(ContractViolation::InvalidValue {
                field: "decision_result.content_hash",
                reason: "must equal the canonical decision hash",
            });
        }
        Ok(())
    }
}

/// The single canonical hashing contract for decision outputs (version 1).
///
/// Covers mode, score, tier, outcome, and the ordered per-capability run
/// statuses with their policy-gate verdicts. Durations, evidence sources,
/// and reason text are excluded so concurrent replays of identical inputs
/// hash identically.
pub struct CanonicalDecisionV1;

impl CanonicalDecisionV1 {
    pub const SCHEMA_TAG: &'static str = "meridian.decision.v1";

    pub fn canonical_bytes(
        mode: DecisionMode,
        score_bp: u16,
        tier: ScoreTier,
        outcome: DecisionOutcome,
        trace: &ExecutionTrace,
    ) -> Vec<u8> {
        let capability_runs: Vec<String> = trace
            .capabilities
            .iter()
            .map(|entry| format!("{}:{}", entry.capability.as_str(), entry.status.as_str()))
            .collect();
        let gate_hits: Vec<String> = trace
            .policy_gates
            .iter()
            .map(|gate| {
                format!(
                    "{}:{}",
                    gate.capability.as_str(),
                    if gate.allowed { "ALLOWED" } else { "DENIED" }
                )
            })
            .collect();

        let fields = [
            Self::SCHEMA_TAG.to_string(),
            mode.as_str().to_string(),
            score_bp.to_string(),
            tier.as_str().to_string(),
            outcome.as_str().to_string(),
            capability_runs.join("\u{1f}"),
            gate_hits.join("\u{1f}"),
        ];
        fields.join("\u{1e}").into_bytes()
    }

    pub fn content_hash(
        mode: DecisionMode,
        score_bp: u16,
        tier: ScoreTier,
        outcome: DecisionOutcome,
        trace: &ExecutionTrace,
    ) -> Sha256Hex {
        let digest = Sha256::digest(Self::canonical_bytes(mode, score_bp, tier, outcome, trace));
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Sha256Hex::from_digest(&bytes)
    }
}
