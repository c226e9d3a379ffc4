#![forbid(unsafe_code)]

use meridian_contracts::policy::CapabilityId;
use meridian_contracts::scoring::{
    LeadSnapshot, ScoreContributionOk, ScoringRefuse, ScoringRequest, ScoringResponse,
};
use meridian_contracts::{ContractViolation, Validate};

pub mod reason_codes {
    use meridian_contracts::ReasonCodeId;

    // PRODUCT_FIT reason-code namespace.
    pub const PRODUCT_FIT_OK_SCORED: ReasonCodeId = ReasonCodeId(0x5046_0001);

    pub const PRODUCT_FIT_INPUT_SCHEMA_INVALID: ReasonCodeId = ReasonCodeId(0x5046_00F1);
    pub const PRODUCT_FIT_WRONG_CAPABILITY: ReasonCodeId = ReasonCodeId(0x5046_00F2);
    pub const PRODUCT_FIT_INTERNAL_PIPELINE_ERROR: ReasonCodeId = ReasonCodeId(0x5046_00F3);
}

/// Known (sub_vertical, product_line) pairings and their fit score.
const FIT_TABLE: &[(&str, &str, u16)] = &[
    ("employee_banking", "payroll_accounts", 9_000),
    ("employee_banking", "salary_advance", 8_000),
    ("sme_lending", "working_capital", 9_000),
    ("sme_lending", "trade_finance", 7_500),
    ("merchant_services", "pos_acquiring", 8_500),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductFitConfig {
    /// Fit when the sub-vertical is served but the product line is not a
    /// known pairing.
    pub partial_fit_bp: u16,
    /// Fit when the sub-vertical itself is not in the catalog.
    pub unknown_fit_bp: u16,
}

impl ProductFitConfig {
    pub fn mvp_v1() -> Self {
        Self {
            partial_fit_bp: 4_000,
            unknown_fit_bp: 3_000,
        }
    }
}

impl Validate for ProductFitConfig {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.partial_fit_bp > 10_000 || self.unknown_fit_bp > 10_000 {
            return Err(ContractViolation::InvalidValue {
                field: "product_fit_config.fallback_fit",
                reason: "must be <= 10000 basis points",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProductFitRuntime {
    config: ProductFitConfig,
}

impl ProductFitRuntime {
    pub fn new(config: ProductFitConfig) -> Result<Self, ContractViolation> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, req: &ScoringRequest) -> ScoringResponse {
        if req.validate().is_err() {
            return self.refuse(
                reason_codes::PRODUCT_FIT_INPUT_SCHEMA_INVALID,
                "product fit request failed contract validation",
            );
        }
        let snapshot = match req {
            ScoringRequest::ProductFit(s) => s,
            _ => {
                return self.refuse(
                    reason_codes::PRODUCT_FIT_WRONG_CAPABILITY,
                    "request routed to the wrong capability runtime",
                )
            }
        };

        let score_bp = self.score_bp(snapshot);
        let rationale = format!(
            "sub_vertical={} product_line={}",
            snapshot.sub_vertical.as_str(),
            snapshot.product_line
        );

        match ScoreContributionOk::v1(
            CapabilityId::ProductFit,
            reason_codes::PRODUCT_FIT_OK_SCORED,
            score_bp,
            rationale,
        ) {
            Ok(ok) => ScoringResponse::Contribution(ok),
            Err(_) => self.refuse(
                reason_codes::PRODUCT_FIT_INTERNAL_PIPELINE_ERROR,
                "failed to construct product fit contribution",
            ),
        }
    }

    fn score_bp(&self, snapshot: &LeadSnapshot) -> u16 {
        let sub_vertical = snapshot.sub_vertical.as_str();
        if let Some((_, _, fit)) = FIT_TABLE
            .iter()
            .find(|(sv, pl, _)| *sv == sub_vertical && *pl == snapshot.product_line)
        {
            return *fit;
        }
        if FIT_TABLE.iter().any(|(sv, _, _)| *sv == sub_vertical) {
            self.config.partial_fit_bp
        } else {
            self.config.unknown_fit_bp
        }
    }

    fn refuse(
        &self,
        reason_code: meridian_contracts::ReasonCodeId,
        message: &'static str,
    ) -> ScoringResponse {
        let refuse = ScoringRefuse::v1(CapabilityId::ProductFit, reason_code, message.to_string())
            .expect("ScoringRefuse::v1 must construct for static messages");
        ScoringResponse::Refuse(refuse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_contracts::ids::SubVertical;
    use meridian_contracts::scoring::SizeBucket;

    fn snapshot(sub_vertical: &str, product_line: &str) -> LeadSnapshot {
        LeadSnapshot::v1(
            "Falcon Trading LLC".to_string(),
            "banking".to_string(),
            SizeBucket::Medium,
            true,
            6_000,
            2,
            9,
            SubVertical::new(sub_vertical).unwrap(),
            product_line.to_string(),
        )
        .unwrap()
    }

    fn score(sub_vertical: &str, product_line: &str) -> u16 {
        let runtime = ProductFitRuntime::new(ProductFitConfig::mvp_v1()).unwrap();
        match runtime.run(&ScoringRequest::ProductFit(snapshot(sub_vertical, product_line))) {
            ScoringResponse::Contribution(ok) => ok.score_bp,
            other => panic!("expected contribution, got {other:?}"),
        }
    }

    #[test]
    fn at_pf_01_known_pairing_scores_catalog_fit() {
        assert_eq!(score("employee_banking", "payroll_accounts"), 9_000);
        assert_eq!(score("sme_lending", "trade_finance"), 7_500);
    }

    #[test]
    fn at_pf_02_served_sub_vertical_with_unknown_product_is_partial() {
        assert_eq!(score("employee_banking", "yacht_financing"), 4_000);
    }

    #[test]
    fn at_pf_03_unknown_sub_vertical_is_floor() {
        assert_eq!(score("space_tourism", "payroll_accounts"), 3_000);
    }
}
