#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};

use meridian_contracts::codes::AuthorityCode;
use meridian_contracts::decision::{
    CapabilityRunStatus, CapabilityTraceEntry, DecisionMode, DecisionOutcome, DecisionResult,
    EvidenceRef, ExecutionTrace, PolicyGateTraceEntry, ScoreTier,
};
use meridian_contracts::envelope::{EnvelopeRecord, EnvelopeStatus};
use meridian_contracts::ids::{EnvelopeId, Sha256Hex};
use meridian_contracts::policy::CapabilityId;
use meridian_contracts::scoring::{
    LeadSnapshot, ScoringRequest, ScoringResponse, MAX_SCORE_BP, NEUTRAL_MULTIPLIER_PCT,
    NEUTRAL_SCORE_BP,
};
use meridian_contracts::{ContractViolation, MonotonicTimeNs};
use meridian_engines::company_quality::{CompanyQualityConfig, CompanyQualityRuntime};
use meridian_engines::edge_case::{
    EdgeCaseConfig, EdgeCaseRuntime, REGULATED_SECTOR_MULTIPLIER_PCT,
};
use meridian_engines::product_fit::{ProductFitConfig, ProductFitRuntime};
use meridian_engines::timing::{TimingConfig, TimingRuntime};
use meridian_storage::repo::EnvelopeRepo;

/// Injected time source. Durations land in the trace for operators but are
/// excluded from the canonical decision hash.
pub trait Clock {
    fn now(&self) -> MonotonicTimeNs;
}

/// Seam between the orchestrator and the capability runtimes.
pub trait ScoringEngine {
    fn run(&self, req: &ScoringRequest) -> ScoringResponse;
}

/// The four production capability runtimes behind one dispatch.
#[derive(Debug, Clone)]
pub struct ProductionEngines {
    company_quality: CompanyQualityRuntime,
    edge_case: EdgeCaseRuntime,
    timing: TimingRuntime,
    product_fit: ProductFitRuntime,
}

impl ProductionEngines {
    pub fn mvp_v1() -> Result<Self, ContractViolation> {
        Ok(Self {
            company_quality: CompanyQualityRuntime::new(CompanyQualityConfig::mvp_v1())?,
            edge_case: EdgeCaseRuntime::new(EdgeCaseConfig::mvp_v1())?,
            timing: TimingRuntime::new(TimingConfig::mvp_v1())?,
            product_fit: ProductFitRuntime::new(ProductFitConfig::mvp_v1())?,
        })
    }
}

impl ScoringEngine for ProductionEngines {
    fn run(&self, req: &ScoringRequest) -> ScoringResponse {
        match req.capability_id() {
            CapabilityId::CompanyQuality => self.company_quality.run(req),
            CapabilityId::EdgeCaseCompliance => self.edge_case.run(req),
            CapabilityId::TimingFit => self.timing.run(req),
            CapabilityId::ProductFit => self.product_fit.run(req),
        }
    }
}

/// Sub-score weights in whole percent; must sum to 100. The edge-case
/// capability contributes a multiplier, not a weighted sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionConfig {
    pub company_weight_pct: u16,
    pub timing_weight_pct: u16,
    pub product_weight_pct: u16,
}

impl DecisionConfig {
    pub fn mvp_v1() -> Self {
        Self {
            company_weight_pct: 40,
            timing_weight_pct: 30,
            product_weight_pct: 30,
        }
    }

    fn validate(&self) -> Result<(), ContractViolation> {
        if self.company_weight_pct + self.timing_weight_pct + self.product_weight_pct != 100 {
            return Err(ContractViolation::InvalidValue {
                field: "decision_config.weights",
                reason: "sub-score weights must sum to 100 percent",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionError {
    EnvelopeNotSealed,
    EnvelopeRevoked,
    EnvelopeExpired,
    Contract(ContractViolation),
}

impl DecisionError {
    pub fn authority_code(&self) -> AuthorityCode {
        match self {
            DecisionError::EnvelopeNotSealed => AuthorityCode::EnvelopeNotSealed,
            DecisionError::EnvelopeRevoked => AuthorityCode::EnvelopeRevoked,
            DecisionError::EnvelopeExpired => AuthorityCode::EnvelopeExpired,
            DecisionError::Contract(_) => AuthorityCode::InvalidEnvelope,
        }
    }
}

impl From<ContractViolation> for DecisionError {
    fn from(v: ContractViolation) -> Self {
        DecisionError::Contract(v)
    }
}

/// The single production path to a decision.
///
/// Requires a sealed, unexpired envelope; runs the fixed capability order;
/// checks each capability against the envelope's `allowed_tools` before
/// dispatch. A denial records a DENIED gate entry and substitutes the
/// capability's neutral contribution. All arithmetic is integer basis
/// points, so replays of identical inputs produce identical hashes.
#[derive(Debug, Clone)]
pub struct DecisionOrchestrator<E>
where
    E: ScoringEngine,
{
    config: DecisionConfig,
    engine: E,
}

impl<E> DecisionOrchestrator<E>
where
    E: ScoringEngine,
{
    pub fn new(config: DecisionConfig, engine: E) -> Result<Self, ContractViolation> {
        config.validate()?;
        Ok(Self { config, engine })
    }

    pub fn decide<S>(
        &self,
        store: &S,
        clock: &impl Clock,
        envelope_id: &EnvelopeId,
        mode: DecisionMode,
        snapshot: &LeadSnapshot,
    ) -> Result<DecisionResult, DecisionError>
    where
        S: EnvelopeRepo,
    {
        let started_at = clock.now();
        let envelope = self.authorized_envelope(store, envelope_id, started_at)?;

        let mut capabilities: Vec<CapabilityTraceEntry> = Vec::new();
        let mut policy_gates: Vec<PolicyGateTraceEntry> = Vec::new();

        let mut company_bp = NEUTRAL_SCORE_BP;
        let mut timing_bp = NEUTRAL_SCORE_BP;
        let mut product_bp = NEUTRAL_SCORE_BP;
        let mut multiplier_pct = NEUTRAL_MULTIPLIER_PCT;

        for capability in CapabilityId::ordered() {
            let allowed = envelope.allowed_tools.contains(&capability);
            policy_gates.push(PolicyGateTraceEntry {
                capability,
                allowed,
            });
            let input_hash = capability_input_hash(capability, snapshot);

            if !allowed {
                capabilities.push(CapabilityTraceEntry {
                    capability,
                    status: CapabilityRunStatus::DeniedByPolicy,
                    duration_ns: 0,
                    input_hash,
                    output_hash: None,
                });
                continue;
            }

            let request = scoring_request(capability, snapshot.clone());
            let run_started = clock.now();
            let response = self.engine.run(&request);
            let run_finished = clock.now();

            let (status, output_hash) = match &response {
                ScoringResponse::Contribution(ok) => {
                    match capability {
                        CapabilityId::CompanyQuality => company_bp = ok.score_bp,
                        CapabilityId::TimingFit => timing_bp = ok.score_bp,
                        CapabilityId::ProductFit => product_bp = ok.score_bp,
                        CapabilityId::EdgeCaseCompliance => {}
                    }
                    (CapabilityRunStatus::Success, Some(contribution_hash(ok)))
                }
                ScoringResponse::EdgeCase(ok) => {
                    multiplier_pct = ok.multiplier_pct;
                    (CapabilityRunStatus::Success, Some(edge_case_hash(ok)))
                }
                // A refusing capability keeps its neutral substitution.
                ScoringResponse::Refuse(_) => (CapabilityRunStatus::Failed, None),
            };

            capabilities.push(CapabilityTraceEntry {
                capability,
                status,
                duration_ns: run_finished.0.saturating_sub(run_started.0),
                input_hash,
                output_hash,
            });
        }

        let weighted = u32::from(company_bp) * u32::from(self.config.company_weight_pct)
            + u32::from(timing_bp) * u32::from(self.config.timing_weight_pct)
            + u32::from(product_bp) * u32::from(self.config.product_weight_pct);
        let base_bp = weighted / 100;
        let adjusted = base_bp * u32::from(multiplier_pct) / 100;
        let score_bp = adjusted.min(u32::from(MAX_SCORE_BP)) as u16;

        let tier = ScoreTier::from_score_bp(score_bp);
        let compliance_blocked = multiplier_pct == REGULATED_SECTOR_MULTIPLIER_PCT;
        let outcome = outcome_for(mode, tier, compliance_blocked);
        let denied = policy_gates.iter().filter(|g| !g.allowed).count();
        let reason = format!(
            "tier={} score_bp={} multiplier_pct={} denied_capabilities={}",
            tier.as_str(),
            score_bp,
            multiplier_pct,
            denied
        );

        let finished_at = clock.now();
        let trace = ExecutionTrace {
            capabilities,
            policy_gates,
            evidence: vec![
                EvidenceRef {
                    source: format!("envelope:{}", envelope.envelope_id.as_str()),
                    content_hash: envelope.sha256_hash.clone(),
                },
                EvidenceRef {
                    source: "lead_snapshot".to_string(),
                    content_hash: snapshot_hash(snapshot),
                },
            ],
            total_duration_ns: finished_at.0.saturating_sub(started_at.0),
        };

        Ok(DecisionResult::v1(
            mode, score_bp, tier, outcome, reason, trace,
        )?)
    }

    fn authorized_envelope<'a, S>(
        &self,
        store: &'a S,
        envelope_id: &EnvelopeId,
        now: MonotonicTimeNs,
    ) -> Result<&'a EnvelopeRecord, DecisionError>
    where
        S: EnvelopeRepo,
    {
        let envelope = store
            .envelope_row(envelope_id)
            .ok_or(DecisionError::EnvelopeNotSealed)?;
        if envelope.status == EnvelopeStatus::Revoked {
            return Err(DecisionError::EnvelopeRevoked);
        }
        if envelope.is_expired_at(now) {
            return Err(DecisionError::EnvelopeExpired);
        }
        Ok(envelope)
    }
}

fn outcome_for(mode: DecisionMode, tier: ScoreTier, compliance_blocked: bool) -> DecisionOutcome {
    if compliance_blocked {
        return DecisionOutcome::Block;
    }
    match mode {
        DecisionMode::Discovery => match tier {
            ScoreTier::Priority => DecisionOutcome::Act,
            ScoreTier::Standard => DecisionOutcome::Wait,
            ScoreTier::Deferred => DecisionOutcome::Ignore,
        },
        DecisionMode::Standard => match tier {
            ScoreTier::Priority | ScoreTier::Standard => DecisionOutcome::Pass,
            ScoreTier::Deferred => DecisionOutcome::Block,
        },
    }
}

fn scoring_request(capability: CapabilityId, snapshot: LeadSnapshot) -> ScoringRequest {
    match capability {
        CapabilityId::CompanyQuality => ScoringRequest::CompanyQuality(snapshot),
        CapabilityId::EdgeCaseCompliance => ScoringRequest::EdgeCaseCompliance(snapshot),
        CapabilityId::TimingFit => ScoringRequest::TimingFit(snapshot),
        CapabilityId::ProductFit => ScoringRequest::ProductFit(snapshot),
    }
}

fn hash_fields(fields: &[String]) -> Sha256Hex {
    let digest = Sha256::digest(fields.join("\u{1e}").into_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Sha256Hex::from_digest(&bytes)
}

fn snapshot_fields(snapshot: &LeadSnapshot) -> Vec<String> {
    vec![
        snapshot.company_name.clone(),
        snapshot.industry.clone(),
        snapshot.size_bucket.as_str().to_string(),
        snapshot.region_presence.to_string(),
        snapshot.engagement_bp.to_string(),
        snapshot.send_day_of_week.to_string(),
        snapshot.send_hour_of_day.to_string(),
        snapshot.sub_vertical.as_str().to_string(),
        snapshot.product_line.clone(),
    ]
}

pub fn snapshot_hash(snapshot: &LeadSnapshot) -> Sha256Hex {
    let mut fields = vec!["meridian.snapshot.v1".to_string()];
    fields.extend(snapshot_fields(snapshot));
    hash_fields(&fields)
}

fn capability_input_hash(capability: CapabilityId, snapshot: &LeadSnapshot) -> Sha256Hex {
    let mut fields = vec![
        "meridian.capreq.v1".to_string(),
        capability.as_str().to_string(),
    ];
    fields.extend(snapshot_fields(snapshot));
    hash_fields(&fields)
}

fn contribution_hash(ok: &meridian_contracts::scoring::ScoreContributionOk) -> Sha256Hex {
    hash_fields(&[
        "meridian.capout.v1".to_string(),
        ok.capability_id.as_str().to_string(),
        "SCORE".to_string(),
        ok.score_bp.to_string(),
    ])
}

fn edge_case_hash(ok: &meridian_contracts::scoring::EdgeCaseOk) -> Sha256Hex {
    let findings: Vec<&str> = ok.findings.iter().map(|f| f.kind.as_str()).collect();
    hash_fields(&[
        "meridian.capout.v1".to_string(),
        CapabilityId::EdgeCaseCompliance.as_str().to_string(),
        "MULTIPLIER".to_string(),
        ok.multiplier_pct.to_string(),
        findings.join("\u{1f}"),
    ])
}
