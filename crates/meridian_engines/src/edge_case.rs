#![forbid(unsafe_code)]

use meridian_contracts::policy::CapabilityId;
use meridian_contracts::scoring::{
    EdgeCaseFinding, EdgeCaseKind, EdgeCaseOk, LeadSnapshot, ScoringRefuse, ScoringRequest,
    ScoringResponse, SizeBucket, NEUTRAL_MULTIPLIER_PCT,
};
use meridian_contracts::{ContractViolation, Validate};

pub mod reason_codes {
    use meridian_contracts::ReasonCodeId;

    // EDGE_CASE_COMPLIANCE reason-code namespace.
    pub const EDGE_CASE_OK_CLEAN: ReasonCodeId = ReasonCodeId(0x4543_0001);
    pub const EDGE_CASE_OK_REGULATED_BLOCK: ReasonCodeId = ReasonCodeId(0x4543_0002);
    pub const EDGE_CASE_OK_UPLIFT: ReasonCodeId = ReasonCodeId(0x4543_0003);

    pub const EDGE_CASE_INPUT_SCHEMA_INVALID: ReasonCodeId = ReasonCodeId(0x4543_00F1);
    pub const EDGE_CASE_WRONG_CAPABILITY: ReasonCodeId = ReasonCodeId(0x4543_00F2);
    pub const EDGE_CASE_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x4543_00F3);
}

/// Compliance-block multiplier, applied when a regulated-sector finding is
/// present. Effectively suppresses the score without erasing the trace.
pub const REGULATED_SECTOR_MULTIPLIER_PCT: u16 = 10;
pub const PREMIUM_BRAND_MULTIPLIER_PCT: u16 = 120;
pub const FAVORABLE_CONTEXT_MULTIPLIER_PCT: u16 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeCaseConfig {
    /// Engagement floor (basis points) for the premium-brand uplift.
    pub premium_engagement_floor_bp: u16,
    /// Engagement floor (basis points) for the favorable-context uplift.
    pub favorable_engagement_floor_bp: u16,
}

impl EdgeCaseConfig {
    pub fn mvp_v1() -> Self {
        Self {
            premium_engagement_floor_bp: 7_000,
            favorable_engagement_floor_bp: 8_000,
        }
    }
}

impl Validate for EdgeCaseConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.premium_engagement_floor_bp > 10_000 || self.favorable_engagement_floor_bp > 10_000
        {
            return Err(ContractViolation::InvalidValue {
                field: "edge_case_config.engagement_floors",
                reason: "must be <= 10000 basis points",
            });
        }
        Ok(())
    }
}

const REGULATED_INDUSTRIES: &[&str] = &["government", "defense", "crypto_assets", "gambling"];

#[derive(Debug, Clone)]
pub struct EdgeCaseRuntime {
    config: EdgeCaseConfig,
}

impl EdgeCaseRuntime {
    pub fn new(config: EdgeCaseConfig) -> Result<Self, ContractViolation> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, req: &ScoringRequest) -> ScoringResponse {
        if req.validate().is_err() {
            return self.refuse(
                reason_codes::EDGE_CASE_INPUT_SCHEMA_INVALID,
                "edge case request failed contract validation",
            );
        }
        let snapshot = match req {
            ScoringRequest::EdgeCaseCompliance(s) => s,
            _ => {
                return self.refuse(
                    reason_codes::EDGE_CASE_WRONG_CAPABILITY,
                    "request routed to the wrong capability runtime",
                )
            }
        };

        let findings = self.detect(snapshot);
        let (multiplier_pct, reason_code) = resolve_multiplier(&findings);

        match EdgeCaseOk::v1(reason_code, multiplier_pct, findings) {
            Ok(ok) => ScoringResponse::EdgeCase(ok),
            Err(_) => self.refuse(
                reason_codes::EDGE_CASE_INTERNAL_PIPELINE_ERROR,
                "failed to construct edge case output",
            ),
        }
    }

    fn detect(&self, snapshot: &LeadSnapshot) -> Vec<EdgeCaseFinding> {
        let mut findings = Vec::new();
        if REGULATED_INDUSTRIES.contains(&snapshot.industry.as_str()) {
            findings.push(EdgeCaseFinding {
                kind: EdgeCaseKind::RegulatedSector,
                detail: format!("industry {} requires compliance review", snapshot.industry),
            });
        }
        if snapshot.size_bucket == SizeBucket::Enterprise
            && snapshot.engagement_bp >= self.config.premium_engagement_floor_bp
        {
            findings.push(EdgeCaseFinding {
                kind: EdgeCaseKind::PremiumBrand,
                detail: "enterprise account with sustained engagement".to_string(),
            });
        }
        if snapshot.region_presence
            && snapshot.engagement_bp >= self.config.favorable_engagement_floor_bp
        {
            findings.push(EdgeCaseFinding {
                kind: EdgeCaseKind::FavorableContext,
                detail: "in-region account above favorable engagement floor".to_string(),
            });
        }
        findings
    }

    fn refuse(
        &self,
        reason_code: meridian_contracts::ReasonCodeId,
        message: &'static str,
    ) -> ScoringResponse {
        let refuse =
            ScoringRefuse::v1(CapabilityId::EdgeCaseCompliance, reason_code, message.to_string())
                .expect("ScoringRefuse::v1 must construct for static messages");
        ScoringResponse::Refuse(refuse)
    }
}

/// Regulated-sector findings dominate; otherwise the strongest uplift wins.
fn resolve_multiplier(
    findings: &[EdgeCaseFinding],
) -> (u16, meridian_contracts::ReasonCodeId) {
    let has = |kind: EdgeCaseKind| findings.iter().any(|f| f.kind == kind);
    if has(EdgeCaseKind::RegulatedSector) {
        return (
            REGULATED_SECTOR_MULTIPLIER_PCT,
            reason_codes::EDGE_CASE_OK_REGULATED_BLOCK,
        );
    }
    if has(EdgeCaseKind::FavorableContext) {
        return (
            FAVORABLE_CONTEXT_MULTIPLIER_PCT,
            reason_codes::EDGE_CASE_OK_UPLIFT,
        );
    }
    if has(EdgeCaseKind::PremiumBrand) {
        return (
            PREMIUM_BRAND_MULTIPLIER_PCT,
            reason_codes::EDGE_CASE_OK_UPLIFT,
        );
    }
    (NEUTRAL_MULTIPLIER_PCT, reason_codes::EDGE_CASE_OK_CLEAN)
}
