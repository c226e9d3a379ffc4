#![forbid(unsafe_code)]

use crate::common::{validate_token, ContractViolation, ReasonCodeId, SchemaVersion, Validate};
use crate::ids::SubVertical;
use crate::policy::CapabilityId;

pub const SCORING_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Score contributions are integer basis points (0..=10_000) so replays of
/// the same inputs hash identically on every platform.
pub const MAX_SCORE_BP: u16 = 10_000;

/// Contribution substituted when a capability is denied by policy. Chosen so
/// a denial changes which tools ran, not the score's center of mass.
pub const NEUTRAL_SCORE_BP: u16 = 5_000;

/// Multiplier substituted when the edge-case capability is denied.
pub const NEUTRAL_MULTIPLIER_PCT: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeBucket {
    Micro,
    Small,
    Medium,
    Large,
    Enterprise,
}

impl SizeBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            SizeBucket::Micro => "MICRO",
            SizeBucket::Small => "SMALL",
            SizeBucket::Medium => "MEDIUM",
            SizeBucket::Large => "LARGE",
            SizeBucket::Enterprise => "ENTERPRISE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MICRO" => Some(SizeBucket::Micro),
            "SMALL" => Some(SizeBucket::Small),
            "MEDIUM" => Some(SizeBucket::Medium),
            "LARGE" => Some(SizeBucket::Large),
            "ENTERPRISE" => Some(SizeBucket::Enterprise),
            _ => None,
        }
    }
}

/// The decision engine's input features for one lead, materialized upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadSnapshot {
    pub schema_version: SchemaVersion,
    pub company_name: String,
    pub industry: String,
    pub size_bucket: SizeBucket,
    pub region_presence: bool,
    pub engagement_bp: u16,
    pub send_day_of_week: u8,
    pub send_hour_of_day: u8,
    pub sub_vertical: SubVertical,
    pub product_line: String,
}

impl LeadSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        company_name: String,
        industry: String,
        size_bucket: SizeBucket,
        region_presence: bool,
        engagement_bp: u16,
        send_day_of_week: u8,
        send_hour_of_day: u8,
        sub_vertical: SubVertical,
        product_line: String,
    ) -> Result<Self, ContractViolation> {
        let snapshot = Self {
            schema_version: SCORING_CONTRACT_VERSION,
            company_name,
            industry,
            size_bucket,
            region_presence,
            engagement_bp,
            send_day_of_week,
            send_hour_of_day,
            sub_vertical,
            product_line,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl Validate for LeadSnapshot {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != SCORING_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "lead_snapshot.schema_version",
                reason: "must match SCORING_CONTRACT_VERSION",
            });
        }
        validate_token("lead_snapshot.company_name", &self.company_name, 128)?;
        validate_token("lead_snapshot.industry", &self.industry, 64)?;
        validate_token("lead_snapshot.product_line", &self.product_line, 64)?;
        if self.engagement_bp > MAX_SCORE_BP {
            return Err(ContractViolation::InvalidValue {
                field: "lead_snapshot.engagement_bp",
                reason: "must be <= 10000",
            });
        }
        if self.send_day_of_week > 6 {
            return Err(ContractViolation::InvalidValue {
                field: "lead_snapshot.send_day_of_week",
                reason: "must be within 0..=6",
            });
        }
        if self.send_hour_of_day > 23 {
            return Err(ContractViolation::InvalidValue {
                field: "lead_snapshot.send_hour_of_day",
                reason: "must be within 0..=23",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeCaseKind {
    RegulatedSector,
    PremiumBrand,
    FavorableContext,
}

impl EdgeCaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeCaseKind::RegulatedSector => "REGULATED_SECTOR",
            EdgeCaseKind::PremiumBrand => "PREMIUM_BRAND",
            EdgeCaseKind::FavorableContext => "FAVORABLE_CONTEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCaseFinding {
    pub kind: EdgeCaseKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringRequest {
    CompanyQuality(LeadSnapshot),
    EdgeCaseCompliance(LeadSnapshot),
    TimingFit(LeadSnapshot),
    ProductFit(LeadSnapshot),
}

impl ScoringRequest {
    pub fn capability_id(&self) -> CapabilityId {
        match self {
            ScoringRequest::CompanyQuality(_) => CapabilityId::CompanyQuality,
            ScoringRequest::EdgeCaseCompliance(_) => CapabilityId::EdgeCaseCompliance,
            ScoringRequest::TimingFit(_) => CapabilityId::TimingFit,
            ScoringRequest::ProductFit(_) => CapabilityId::ProductFit,
        }
    }

    pub fn snapshot(&self) -> &LeadSnapshot {
        match self {
            ScoringRequest::CompanyQuality(s)
            | ScoringRequest::EdgeCaseCompliance(s)
            | ScoringRequest::TimingFit(s)
            | ScoringRequest::ProductFit(s) => s,
        }
    }
}

impl Validate for ScoringRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.snapshot().validate()
    }
}

/// Weighted sub-score contribution, 0..=10_000.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreContributionOk {
    pub schema_version: SchemaVersion,
    pub capability_id: CapabilityId,
    pub reason_code: ReasonCodeId,
    pub score_bp: u16,
    pub rationale: String,
}

impl ScoreContributionOk {
    pub fn v1(
        capability_id: CapabilityId,
        reason_code: ReasonCodeId,
        score_bp: u16,
        rationale: String,
    ) -> Result<Self, ContractViolation> {
        let ok = Self {
            schema_version: SCORING_CONTRACT_VERSION,
            capability_id,
            reason_code,
            score_bp,
            rationale,
        };
        ok.validate()?;
        Ok(ok)
    }
}

impl Validate for ScoreContributionOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.capability_id == CapabilityId::EdgeCaseCompliance {
            return Err(ContractViolation::InvalidValue {
                field: "score_contribution_ok.capability_id",
                reason: "edge-case capability reports a multiplier, not a score",
            });
        }
        if self.score_bp > MAX_SCORE_BP {
            return Err(ContractViolation::InvalidValue {
                field: "score_contribution_ok.score_bp",
                reason: "must be <= 10000",
            });
        }
        validate_token("score_contribution_ok.rationale", &self.rationale, 256)?;
        Ok(())
    }
}

/// Multiplicative adjustment from edge-case findings, in whole percent.
/// Fixed explainable constants: 10 (compliance block), 120/130 (favorable),
/// 100 (neutral).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCaseOk {
    pub schema_version: SchemaVersion,
    pub reason_code: ReasonCodeId,
    pub multiplier_pct: u16,
    pub findings: Vec<EdgeCaseFinding>,
}

impl EdgeCaseOk {
    pub fn v1(
        reason_code: ReasonCodeId,
        multiplier_pct: u16,
        findings: Vec<EdgeCaseFinding>,
    ) -> Result<Self, ContractViolation> {
        let ok = Self {
            schema_version: SCORING_CONTRACT_VERSION,
            reason_code,
            multiplier_pct,
            findings,
        };
        ok.validate()?;
        Ok(ok)
    }
}

impl Validate for EdgeCaseOk {
    fn validate(&self) -> Result<(), ContractViolation> {
        if !matches!(self.multiplier_pct, 10 | 100 | 120 | 130) {
            return Err(ContractViolation::InvalidValue {
                field: "edge_case_ok.multiplier_pct",
                reason: "must be one of the fixed auditable constants",
            });
        }
        if self.findings.len() > 8 {
            return Err(ContractViolation::InvalidValue {
                field: "edge_case_ok.findings",
                reason: "must be <= 8",
            });
        }
        for finding in &self.findings {
            validate_token("edge_case_ok.findings", &finding.detail, 128)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringRefuse {
    pub schema_version: SchemaVersion,
    pub capability_id: CapabilityId,
    pub reason_code: ReasonCodeId,
    pub message: String,
}

impl ScoringRefuse {
    pub fn v1(
        capability_id: CapabilityId,
        reason_code: ReasonCodeId,
        message: String,
    ) -> Result<Self, ContractViolation> {
        let refuse = Self {
            schema_version: SCORING_CONTRACT_VERSION,
            capability_id,
            reason_code,
            message,
        };
        refuse.validate()?;
        Ok(refuse)
    }
}

impl Validate for ScoringRefuse {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("scoring_refuse.message", &self.message, 256)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringResponse {
    Contribution(ScoreContributionOk),
    EdgeCase(EdgeCaseOk),
    Refuse(ScoringRefuse),
}

impl Validate for ScoringResponse {
    fn validate(&self) -> Result<(), ContractViolation> {
        match self {
            ScoringResponse::Contribution(r) => r.validate(),
            ScoringResponse::EdgeCase(r) => r.validate(),
            ScoringResponse::Refuse(r) => r.validate(),
        }
    }
}
