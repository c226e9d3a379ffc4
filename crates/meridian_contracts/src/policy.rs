#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use crate::common::{validate_token, ContractViolation, SchemaVersion, Validate};
use crate::ids::{PersonaId, PolicyId};

pub const POLICY_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Closed capability enumeration. Authorization is a set over these variants,
/// never free-form tool-name strings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum CapabilityId {
    CompanyQuality,
    EdgeCaseCompliance,
    TimingFit,
    ProductFit,
}

impl CapabilityId {
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityId::CompanyQuality => "COMPANY_QUALITY",
            CapabilityId::EdgeCaseCompliance => "EDGE_CASE_COMPLIANCE",
            CapabilityId::TimingFit => "TIMING_FIT",
            CapabilityId::ProductFit => "PRODUCT_FIT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "COMPANY_QUALITY" => Some(CapabilityId::CompanyQuality),
            "EDGE_CASE_COMPLIANCE" => Some(CapabilityId::EdgeCaseCompliance),
            "TIMING_FIT" => Some(CapabilityId::TimingFit),
            "PRODUCT_FIT" => Some(CapabilityId::ProductFit),
            _ => None,
        }
    }

    /// Fixed execution order of the decision engine.
    pub fn ordered() -> [CapabilityId; 4] {
        [
            CapabilityId::CompanyQuality,
            CapabilityId::EdgeCaseCompliance,
            CapabilityId::TimingFit,
            CapabilityId::ProductFit,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyStatus {
    Active,
    Superseded,
}

impl PolicyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyStatus::Active => "ACTIVE",
            PolicyStatus::Superseded => "SUPERSEDED",
        }
    }
}

/// Versioned ruleset bound to exactly one persona. Updating always creates a
/// new version; history is retained for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRecord {
    pub schema_version: SchemaVersion,
    pub policy_id: PolicyId,
    pub persona_id: PersonaId,
    pub policy_version: u32,
    pub status: PolicyStatus,
    pub allowed_intents: Vec<String>,
    pub forbidden_outputs: Vec<String>,
    pub allowed_tools: BTreeSet<CapabilityId>,
    pub cost_budget_microunits: u64,
    pub latency_budget_ms: u32,
    pub escalation_rule: String,
    pub disclaimer_rule: String,
}

impl PolicyRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        policy_id: PolicyId,
        persona_id: PersonaId,
        policy_version: u32,
        status: PolicyStatus,
        allowed_intents: Vec<String>,
        forbidden_outputs: Vec<String>,
        allowed_tools: BTreeSet<CapabilityId>,
        cost_budget_microunits: u64,
        latency_budget_ms: u32,
        escalation_rule: String,
        disclaimer_rule: String,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: POLICY_CONTRACT_VERSION,
            policy_id,
            persona_id,
            policy_version,
            status,
            allowed_intents,
            forbidden_outputs,
            allowed_tools,
            cost_budget_microunits,
            latency_budget_ms,
            escalation_rule,
            disclaimer_rule,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for PolicyRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != POLICY_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "policy_record.schema_version",
                reason: "must match POLICY_CONTRACT_VERSION",
            });
        }
        if self.policy_version == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "policy_record.policy_version",
                reason: "must be >= 1",
            });
        }
        if self.allowed_intents.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "policy_record.allowed_intents",
                reason: "must be <= 32",
            });
        }
        for intent in &self.allowed_intents {
            validate_token("policy_record.allowed_intents", intent, 96)?;
        }
        if self.forbidden_outputs.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "policy_record.forbidden_outputs",
                reason: "must be <= 32",
            });
        }
        for output in &self.forbidden_outputs {
            validate_token("policy_record.forbidden_outputs", output, 96)?;
        }
        if self.latency_budget_ms == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "policy_record.latency_budget_ms",
                reason: "must be > 0",
            });
        }
        validate_token("policy_record.escalation_rule", &self.escalation_rule, 256)?;
        validate_token("policy_record.disclaimer_rule", &self.disclaimer_rule, 256)?;
        Ok(())
    }
}
