#![forbid(unsafe_code)]

use meridian_contracts::policy::CapabilityId;
use meridian_contracts::scoring::{
    LeadSnapshot, ScoreContributionOk, ScoringRefuse, ScoringRequest, ScoringResponse, SizeBucket,
    MAX_SCORE_BP,
};
use meridian_contracts::{ContractViolation, Validate};

pub mod reason_codes {
    use meridian_contracts::ReasonCodeId;

    // COMPANY_QUALITY reason-code namespace.
    pub const COMPANY_QUALITY_OK_SCORED: ReasonCodeId = ReasonCodeId(0x4351_0001);

    pub const COMPANY_QUALITY_INPUT_SCHEMA_INVALID: ReasonCodeId = ReasonCodeId(0x4351_00F1);
    pub const COMPANY_QUALITY_WRONG_CAPABILITY: ReasonCodeId = ReasonCodeId(0x4351_00F2);
    pub const COMPANY_QUALITY_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x4351_00F3);
}

/// Feature weights in whole percent. Must sum to 100 so the weighted sum
/// stays within 0..=10_000 basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyQualityConfig {
    pub industry_weight_pct: u16,
    pub size_weight_pct: u16,
    pub presence_weight_pct: u16,
    pub engagement_weight_pct: u16,
}

impl CompanyQualityConfig {
    pub fn mvp_v1() -> Self {
        Self {
            industry_weight_pct: 35,
            size_weight_pct: 25,
            presence_weight_pct: 20,
            engagement_weight_pct: 20,
        }
    }
}

impl Validate for CompanyQualityConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        let total = self.industry_weight_pct
            + self.size_weight_pct
            + self.presence_weight_pct
            + self.engagement_weight_pct;
        if total != 100 {
            return Err(ContractViolation::InvalidValue {
                field: "company_quality_config.weights",
                reason: "feature weights must sum to 100 percent",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CompanyQualityRuntime {
    config: CompanyQualityConfig,
}

impl CompanyQualityRuntime {
    pub fn new(config: CompanyQualityConfig) -> Result<Self, ContractViolation> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, req: &ScoringRequest) -> ScoringResponse {
        if req.validate().is_err() {
            return self.refuse(
                reason_codes::COMPANY_QUALITY_INPUT_SCHEMA_INVALID,
                "company quality request failed contract validation",
            );
        }
        let snapshot = match req {
            ScoringRequest::CompanyQuality(s) => s,
            _ => {
                return self.refuse(
                    reason_codes::COMPANY_QUALITY_WRONG_CAPABILITY,
                    "request routed to the wrong capability runtime",
                )
            }
        };

        let score_bp = self.score_bp(snapshot);
        let rationale = format!(
            "industry={} size={} presence={} engagement_bp={}",
            snapshot.industry,
            snapshot.size_bucket.as_str(),
            snapshot.region_presence,
            snapshot.engagement_bp
        );

        match ScoreContributionOk::v1(
            CapabilityId::CompanyQuality,
            reason_codes::COMPANY_QUALITY_OK_SCORED,
            score_bp,
            rationale,
        ) {
            Ok(ok) => ScoringResponse::Contribution(ok),
            Err(_) => self.refuse(
                reason_codes::COMPANY_QUALITY_INTERNAL_PIPELINE_ERROR,
                "failed to construct company quality contribution",
            ),
        }
    }

    fn score_bp(&self, snapshot: &LeadSnapshot) -> u16 {
        let weighted = u32::from(industry_base_bp(&snapshot.industry))
            * u32::from(self.config.industry_weight_pct)
            + u32::from(size_base_bp(snapshot.size_bucket)) * u32::from(self.config.size_weight_pct)
            + u32::from(presence_base_bp(snapshot.region_presence))
                * u32::from(self.config.presence_weight_pct)
            + u32::from(snapshot.engagement_bp) * u32::from(self.config.engagement_weight_pct);
        let score = weighted / 100;
        score.min(u32::from(MAX_SCORE_BP)) as u16
    }

    fn refuse(
        &self,
        reason_code: meridian_contracts::ReasonCodeId,
        message: &'static str,
    ) -> ScoringResponse {
        let refuse = ScoringRefuse::v1(CapabilityId::CompanyQuality, reason_code, message.to_string())
            .expect("ScoringRefuse::v1 must construct for static messages");
        ScoringResponse::Refuse(refuse)
    }
}

fn industry_base_bp(industry: &str) -> u16 {
    match industry {
        "banking" | "fintech" | "financial_services" | "insurance" => 9_000,
        "technology" | "professional_services" | "healthcare" => 7_000,
        "retail" | "hospitality" | "logistics" | "construction" => 5_500,
        _ => 3_500,
    }
}

fn size_base_bp(bucket: SizeBucket) -> u16 {
    match bucket {
        SizeBucket::Micro => 3_000,
        SizeBucket::Small => 4_500,
        SizeBucket::Medium => 6_500,
        SizeBucket::Large => 8_000,
        SizeBucket::Enterprise => 9_000,
    }
}

fn presence_base_bp(region_presence: bool) -> u16 {
    if region_presence {
        9_000
    } else {
        4_000
    }
}
