#![forbid(unsafe_code)]

use meridian_contracts::policy::CapabilityId;
use meridian_contracts::scoring::{
    LeadSnapshot, ScoreContributionOk, ScoringRefuse, ScoringRequest, ScoringResponse,
    MAX_SCORE_BP,
};
use meridian_contracts::{ContractViolation, Validate};

pub mod reason_codes {
    use meridian_contracts::ReasonCodeId;

    // TIMING_FIT reason-code namespace.
    pub const TIMING_OK_SCORED: ReasonCodeId = ReasonCodeId(0x5446_0001);

    pub const TIMING_INPUT_SCHEMA_INVALID: ReasonCodeId = ReasonCodeId(0x5446_00F1);
    pub const TIMING_WRONG_CAPABILITY: ReasonCodeId = ReasonCodeId(0x5446_00F2);
    pub const TIMING_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x5446_00F3);
}

/// Send-window fit for the Gulf working week. Days are postgres DOW
/// convention (0 = Sunday); the working week runs Sunday through Thursday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    pub business_day_base_bp: u16,
    pub weekend_base_bp: u16,
    pub peak_hour_bonus_bp: u16,
    pub working_hour_bonus_bp: u16,
    pub shoulder_hour_bonus_bp: u16,
}

impl TimingConfig {
    pub fn mvp_v1() -> Self {
        Self {
            business_day_base_bp: 7_000,
            weekend_base_bp: 2_500,
            peak_hour_bonus_bp: 2_000,
            working_hour_bonus_bp: 1_000,
            shoulder_hour_bonus_bp: 500,
        }
    }
}

impl Validate for TimingConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.business_day_base_bp > MAX_SCORE_BP || self.weekend_base_bp > MAX_SCORE_BP {
            return Err(ContractViolation::InvalidValue {
                field: "timing_config.day_base",
                reason: "must be <= 10000 basis points",
            });
        }
        if self.peak_hour_bonus_bp > MAX_SCORE_BP {
            return Err(ContractViolation::InvalidValue {
                field: "timing_config.peak_hour_bonus_bp",
                reason: "must be <= 10000 basis points",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TimingRuntime {
    config: TimingConfig,
}

impl TimingRuntime {
    pub fn new(config: TimingConfig) -> Result<Self, ContractViolation> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, req: &ScoringRequest) -> ScoringResponse {
        if req.validate().is_err() {
            return self.refuse(
                reason_codes::TIMING_INPUT_SCHEMA_INVALID,
                "timing request failed contract validation",
            );
        }
        let snapshot = match req {
            ScoringRequest::TimingFit(s) => s,
            _ => {
                return self.refuse(
                    reason_codes::TIMING_WRONG_CAPABILITY,
                    "request routed to the wrong capability runtime",
                )
            }
        };

        let score_bp = self.score_bp(snapshot);
        let rationale = format!(
            "day_of_week={} hour_of_day={}",
            snapshot.send_day_of_week, snapshot.send_hour_of_day
        );

        match ScoreContributionOk::v1(
            CapabilityId::TimingFit,
            reason_codes::TIMING_OK_SCORED,
            score_bp,
            rationale,
        ) {
            Ok(ok) => ScoringResponse::Contribution(ok),
            Err(_) => self.refuse(
                reason_codes::TIMING_INTERNAL_PIPELINE_ERROR,
                "failed to construct timing contribution",
            ),
        }
    }

    fn score_bp(&self, snapshot: &LeadSnapshot) -> u16 {
        let base = if snapshot.send_day_of_week <= 4 {
            self.config.business_day_base_bp
        } else {
            self.config.weekend_base_bp
        };
        let bonus = match snapshot.send_hour_of_day {
            8..=11 => self.config.peak_hour_bonus_bp,
            12..=16 => self.config.working_hour_bonus_bp,
            7 | 17 => self.config.shoulder_hour_bonus_bp,
            _ => 0,
        };
        base.saturating_add(bonus).min(MAX_SCORE_BP)
    }

    fn refuse(
        &self,
        reason_code: meridian_contracts::ReasonCodeId,
        message: &'static str,
    ) -> ScoringResponse {
        let refuse = ScoringRefuse::v1(CapabilityId::TimingFit, reason_code, message.to_string())
            .expect("ScoringRefuse::v1 must construct for static messages");
        ScoringResponse::Refuse(refuse)
    }
}
