#![forbid(unsafe_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use meridian_contracts::codes::AuthorityCode;
use meridian_contracts::decision::DecisionMode;
use meridian_contracts::envelope::EnvelopeContent;
use meridian_contracts::gate::{GateCheckRequest, GateSource};
use meridian_contracts::ids::{
    EnvelopeId, PersonaId, PolicyId, RegionCode, ReplayId, Sha256Hex, SubVertical, TenantId,
    TerritorySlug, UserId, WorkspaceId,
};
use meridian_contracts::persona::{PersonaRecord, PersonaScope};
use meridian_contracts::policy::{CapabilityId, PolicyRecord, PolicyStatus};
use meridian_contracts::scoring::{LeadSnapshot, SizeBucket};
use meridian_contracts::territory::{CoverageType, TerritoryLevel, TerritoryRecord};
use meridian_contracts::MonotonicTimeNs;
use meridian_os::decision::{
    Clock, DecisionConfig, DecisionOrchestrator, ProductionEngines,
};
use meridian_os::gate::{enforcement_for, GateEnforcement, GateMetrics, RuntimeGate, RuntimeGateConfig};
use meridian_os::persona::{PersonaResolver, PersonaResolverConfig};
use meridian_os::replay::ReplayCoordinator;
use meridian_os::sealer::EnvelopeSealer;
use meridian_os::territory::{TerritoryResolver, TerritoryResolverConfig};
use meridian_storage::{AuthorityStore, EnvelopeSealInput};

/// Adapter-level failure. `authority_code` carries the wire code when the
/// failure maps onto the authority vocabulary; `None` means a malformed
/// request that never reached the subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterError {
    pub authority_code: Option<AuthorityCode>,
    pub message: String,
}

impl AdapterError {
    pub fn coded(code: AuthorityCode, message: impl Into<String>) -> Self {
        Self {
            authority_code: Some(code),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            authority_code: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdapterErrorBody {
    pub status: String,
    pub authority_code: Option<String>,
    pub message: String,
}

impl From<&AdapterError> for AdapterErrorBody {
    fn from(err: &AdapterError) -> Self {
        Self {
            status: "error".to_string(),
            authority_code: err.authority_code.map(|c| c.as_str().to_string()),
            message: err.message.clone(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub control_plane_version: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResolvePersonaAdapterResponse {
    pub persona_id: String,
    pub persona_name: String,
    pub resolution_scope: String,
    pub resolution_path: String,
    pub policy_id: String,
    pub policy_version: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResolveTerritoryAdapterResponse {
    pub slug: String,
    pub name: String,
    pub level: String,
    pub coverage_type: String,
    pub resolution_path: String,
    pub resolution_depth: u8,
    pub sub_vertical_valid: Option<bool>,
    pub sub_vertical_reason: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SealEnvelopeAdapterRequest {
    pub tenant_id: String,
    pub workspace_id: String,
    pub sub_vertical: String,
    pub region: Option<String>,
    pub payload_json: String,
    pub expires_at_ns: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SealEnvelopeAdapterResponse {
    pub status: String,
    pub envelope_id: String,
    pub sha256_hash: String,
    pub is_new: bool,
    pub persona_id: String,
    pub policy_version: u32,
    pub territory: Option<String>,
    pub resolution_path: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VerifyEnvelopeAdapterResponse {
    pub is_valid: bool,
    pub envelope_status: Option<String>,
    pub verification_message: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EnvelopeContentAdapterResponse {
    pub persona_id: String,
    pub policy_version: u32,
    pub scope: String,
    pub territory: Option<String>,
    pub allowed_intents: Vec<String>,
    pub forbidden_outputs: Vec<String>,
    pub allowed_tools: Vec<String>,
    pub payload_json: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GateCheckAdapterRequest {
    pub source: String,
    pub endpoint: String,
    pub method: String,
    pub tenant_id: String,
    pub workspace_id: String,
    pub user_id: Option<String>,
    pub envelope_id: Option<String>,
    pub envelope_hash: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GateCheckAdapterResponse {
    pub gate_passed: bool,
    pub violation_code: Option<String>,
    pub envelope_status: Option<String>,
    pub enforcement: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReplayInitiateAdapterRequest {
    pub envelope_hash: String,
    pub source: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReplayInitiateAdapterResponse {
    pub replay_id: String,
    pub replay_status: String,
    pub payload_json: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReplayCompleteAdapterRequest {
    pub replay_hash: String,
    pub output_summary: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReplayCompleteAdapterResponse {
    pub replay_id: String,
    pub replay_status: String,
    pub original_hash: String,
    pub replay_hash: Option<String>,
    pub drift_type: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecideAdapterRequest {
    pub envelope_id: String,
    pub mode: String,
    pub company_name: String,
    pub industry: String,
    pub size_bucket: String,
    pub region_presence: bool,
    pub engagement_bp: u16,
    pub send_day_of_week: u8,
    pub send_hour_of_day: u8,
    pub sub_vertical: String,
    pub product_line: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecideAdapterResponse {
    pub mode: String,
    pub score_bp: u16,
    pub tier: String,
    pub outcome: String,
    pub reason: String,
    pub content_hash: String,
    pub denied_capabilities: Vec<String>,
}

/// Wall-clock time source for the HTTP surface. Everything below the adapter
/// takes time as an argument; this is the single place it is read.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl WallClock {
    pub fn now_ns(&self) -> MonotonicTimeNs {
        let ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        MonotonicTimeNs(ns)
    }
}

impl Clock for WallClock {
    fn now(&self) -> MonotonicTimeNs {
        self.now_ns()
    }
}

/// One process-wide runtime: the in-memory control plane plus every
/// subsystem entry point, behind a lock owned by the binary.
pub struct AdapterRuntime {
    store: AuthorityStore,
    clock: WallClock,
    persona_resolver: PersonaResolver,
    territory_resolver: TerritoryResolver,
    sealer: EnvelopeSealer,
    gate: RuntimeGate,
    replay: ReplayCoordinator,
    orchestrator: DecisionOrchestrator<ProductionEngines>,
}

impl AdapterRuntime {
    pub fn mvp_v1() -> Result<Self, String> {
        let engines = ProductionEngines::mvp_v1().map_err(|err| format!("{err:?}"))?;
        let orchestrator = DecisionOrchestrator::new(DecisionConfig::mvp_v1(), engines)
            .map_err(|err| format!("{err:?}"))?;
        Ok(Self {
            store: AuthorityStore::new_in_memory(),
            clock: WallClock,
            persona_resolver: PersonaResolver::new(PersonaResolverConfig::mvp_v1()),
            territory_resolver: TerritoryResolver::new(TerritoryResolverConfig::mvp_v1()),
            sealer: EnvelopeSealer::new(),
            gate: RuntimeGate::new(RuntimeGateConfig::mvp_v1(), GateMetrics::default()),
            replay: ReplayCoordinator::new(),
            orchestrator,
        })
    }

    /// Minimal control plane for local runs: the global territory, the UAE
    /// country territory, and one global employee-banking persona with an
    /// active policy.
    pub fn seed_demo_control_plane(&mut self) -> Result<(), String> {
        let global_slug = TerritorySlug::new("global").map_err(|err| format!("{err:?}"))?;
        self.store
            .insert_territory_row(
                TerritoryRecord::v1(
                    global_slug.clone(),
                    "Global".to_string(),
                    None,
                    TerritoryLevel::Global,
                    CoverageType::Global,
                    None,
                    true,
                )
                .map_err(|err| format!("{err:?}"))?,
            )
            .map_err(|err| format!("{err:?}"))?;
        self.store
            .insert_territory_row(
                TerritoryRecord::v1(
                    TerritorySlug::new("uae").map_err(|err| format!("{err:?}"))?,
                    "United Arab Emirates".to_string(),
                    Some("AE".to_string()),
                    TerritoryLevel::Country,
                    CoverageType::Single,
                    Some(global_slug),
                    true,
                )
                .map_err(|err| format!("{err:?}"))?,
            )
            .map_err(|err| format!("{err:?}"))?;

        let persona_id = PersonaId::new("pers_eb_global").map_err(|err| format!("{err:?}"))?;
        self.store
            .insert_persona_row(
                PersonaRecord::v1(
                    persona_id.clone(),
                    "Employee Banking Global".to_string(),
                    PersonaScope::Global,
                    None,
                    SubVertical::new("employee_banking").map_err(|err| format!("{err:?}"))?,
                    None,
                    "score employee banking leads".to_string(),
                    true,
                )
                .map_err(|err| format!("{err:?}"))?,
            )
            .map_err(|err| format!("{err:?}"))?;
        self.store
            .insert_policy_row(
                PolicyRecord::v1(
                    PolicyId::new("pol_eb_global_v1").map_err(|err| format!("{err:?}"))?,
                    persona_id,
                    1,
                    PolicyStatus::Active,
                    vec!["score_lead".to_string()],
                    vec!["legal_advice".to_string()],
                    CapabilityId::ordered().into_iter().collect(),
                    1_000_000,
                    2_000,
                    "escalate_to_admin".to_string(),
                    "automated_decision_notice".to_string(),
                )
                .map_err(|err| format!("{err:?}"))?,
            )
            .map_err(|err| format!("{err:?}"))?;
        Ok(())
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        AdapterHealthResponse {
            status: "ok".to_string(),
            control_plane_version: self.store.control_plane_version().0,
        }
    }

    pub fn resolve_persona(
        &self,
        sub_vertical: &str,
        region: Option<&str>,
    ) -> Result<ResolvePersonaAdapterResponse, AdapterError> {
        let sub_vertical = SubVertical::new(sub_vertical)
            .map_err(|err| AdapterError::bad_request(format!("sub_vertical: {err:?}")))?;
        let region = region
            .map(RegionCode::new)
            .transpose()
            .map_err(|err| AdapterError::bad_request(format!("region: {err:?}")))?;

        let resolution = self
            .persona_resolver
            .resolve(&self.store, &sub_vertical, region.as_ref())
            .map_err(|code| AdapterError::coded(code, "persona resolution failed"))?;
        let policy = self
            .persona_resolver
            .active_policy(&self.store, &resolution.persona.persona_id)
            .map_err(|code| AdapterError::coded(code, "policy lookup failed"))?;

        Ok(ResolvePersonaAdapterResponse {
            persona_id: resolution.persona.persona_id.as_str().to_string(),
            persona_name: resolution.persona.name.clone(),
            resolution_scope: resolution.resolution_scope.as_str().to_string(),
            resolution_path: resolution.resolution_path,
            policy_id: policy.policy_id.as_str().to_string(),
            policy_version: policy.policy_version,
        })
    }

    pub fn resolve_territory(
        &self,
        region_ident: &str,
        sub_vertical: Option<&str>,
    ) -> Result<ResolveTerritoryAdapterResponse, AdapterError> {
        let resolution = self
            .territory_resolver
            .resolve(&self.store, region_ident)
            .map_err(|code| AdapterError::coded(code, "territory resolution failed"))?;

        let (sub_vertical_valid, sub_vertical_reason) = match sub_vertical {
            Some(raw) => {
                let sv = SubVertical::new(raw)
                    .map_err(|err| AdapterError::bad_request(format!("sub_vertical: {err:?}")))?;
                let verdict = self
                    .territory_resolver
                    .validate_for_sub_vertical(&resolution.territory, &sv);
                (Some(verdict.is_valid), Some(verdict.reason))
            }
            None => (None, None),
        };

        Ok(ResolveTerritoryAdapterResponse {
            slug: resolution.territory.slug.as_str().to_string(),
            name: resolution.territory.name.clone(),
            level: resolution.territory.level.as_str().to_string(),
            coverage_type: resolution.territory.coverage_type.as_str().to_string(),
            resolution_path: resolution.resolution_path,
            resolution_depth: resolution.resolution_depth,
            sub_vertical_valid,
            sub_vertical_reason,
        })
    }

    pub fn seal_envelope(
        &mut self,
        request: SealEnvelopeAdapterRequest,
    ) -> Result<SealEnvelopeAdapterResponse, AdapterError> {
        let tenant_id = TenantId::new(&request.tenant_id)
            .map_err(|err| AdapterError::bad_request(format!("tenant_id: {err:?}")))?;
        let workspace_id = WorkspaceId::new(&request.workspace_id)
            .map_err(|err| AdapterError::bad_request(format!("workspace_id: {err:?}")))?;
        let sub_vertical = SubVertical::new(&request.sub_vertical)
            .map_err(|err| AdapterError::bad_request(format!("sub_vertical: {err:?}")))?;
        let region = request
            .region
            .as_deref()
            .map(RegionCode::new)
            .transpose()
            .map_err(|err| AdapterError::bad_request(format!("region: {err:?}")))?;

        let resolution = self
            .persona_resolver
            .resolve(&self.store, &sub_vertical, region.as_ref())
            .map_err(|code| AdapterError::coded(code, "persona resolution failed"))?;
        let policy = self
            .persona_resolver
            .active_policy(&self.store, &resolution.persona.persona_id)
            .map_err(|code| AdapterError::coded(code, "policy lookup failed"))?;

        let territory = match request.region.as_deref() {
            Some(ident) => {
                let resolved = self
                    .territory_resolver
                    .resolve(&self.store, ident)
                    .map_err(|code| AdapterError::coded(code, "territory resolution failed"))?;
                let verdict = self
                    .territory_resolver
                    .validate_for_sub_vertical(&resolved.territory, &sub_vertical);
                if !verdict.is_valid {
                    return Err(AdapterError::coded(
                        AuthorityCode::TerritoryInvalidForSubvertical,
                        verdict.reason,
                    ));
                }
                Some(resolved.territory.slug.clone())
            }
            None => None,
        };

        let content = EnvelopeContent::v1(
            resolution.persona.persona_id.clone(),
            policy.policy_version,
            resolution.resolution_scope,
            territory.clone(),
            policy.allowed_intents.clone(),
            policy.forbidden_outputs.clone(),
            policy.allowed_tools.clone(),
            request.payload_json,
        )
        .map_err(|err| AdapterError::bad_request(format!("envelope content: {err:?}")))?;

        let input = EnvelopeSealInput {
            tenant_id,
            workspace_id,
            persona_id: content.persona_id.clone(),
            policy_id: policy.policy_id.clone(),
            policy_version: policy.policy_version,
            territory,
            resolution_path: resolution.resolution_path.clone(),
            scope: content.scope,
            allowed_tools: content.allowed_tools.clone(),
            content,
            expires_at: request.expires_at_ns.map(MonotonicTimeNs),
        };
        let outcome = self
            .sealer
            .seal(&mut self.store, input, self.clock.now_ns())
            .map_err(|err| {
                AdapterError::coded(AuthorityCode::InvalidEnvelope, format!("seal failed: {err:?}"))
            })?;

        Ok(SealEnvelopeAdapterResponse {
            status: "ok".to_string(),
            envelope_id: outcome.envelope.envelope_id.as_str().to_string(),
            sha256_hash: outcome.envelope.sha256_hash.as_str().to_string(),
            is_new: outcome.is_new,
            persona_id: outcome.envelope.persona_id.as_str().to_string(),
            policy_version: outcome.envelope.policy_version,
            territory: outcome
                .envelope
                .territory
                .as_ref()
                .map(|t| t.as_str().to_string()),
            resolution_path: outcome.envelope.resolution_path.clone(),
        })
    }

    pub fn verify_envelope(
        &self,
        envelope_id: Option<&str>,
        envelope_hash: Option<&str>,
    ) -> Result<VerifyEnvelopeAdapterResponse, AdapterError> {
        let id = envelope_id
            .map(EnvelopeId::new)
            .transpose()
            .map_err(|err| AdapterError::bad_request(format!("envelope_id: {err:?}")))?;
        let hash = envelope_hash
            .map(Sha256Hex::new)
            .transpose()
            .map_err(|err| AdapterError::bad_request(format!("envelope_hash: {err:?}")))?;

        let report = self
            .sealer
            .verify(&self.store, id.as_ref(), hash.as_ref(), self.clock.now_ns());
        Ok(VerifyEnvelopeAdapterResponse {
            is_valid: report.is_valid,
            envelope_status: report.status.map(|s| s.as_str().to_string()),
            verification_message: report.verification_message.as_str().to_string(),
        })
    }

    pub fn envelope_content(
        &self,
        envelope_id: &str,
    ) -> Result<EnvelopeContentAdapterResponse, AdapterError> {
        let id = EnvelopeId::new(envelope_id)
            .map_err(|err| AdapterError::bad_request(format!("envelope_id: {err:?}")))?;
        let content = self
            .sealer
            .content(&self.store, &id)
            .map_err(|code| AdapterError::coded(code, "envelope content lookup failed"))?;
        Ok(EnvelopeContentAdapterResponse {
            persona_id: content.persona_id.as_str().to_string(),
            policy_version: content.policy_version,
            scope: content.scope.as_str().to_string(),
            territory: content.territory.as_ref().map(|t| t.as_str().to_string()),
            allowed_intents: content.allowed_intents.clone(),
            forbidden_outputs: content.forbidden_outputs.clone(),
            allowed_tools: content
                .allowed_tools
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            payload_json: content.payload_json,
        })
    }

    pub fn gate_check(
        &mut self,
        request: GateCheckAdapterRequest,
    ) -> Result<GateCheckAdapterResponse, AdapterError> {
        let source = GateSource::parse(&request.source);
        let tenant_id = TenantId::new(&request.tenant_id)
            .map_err(|err| AdapterError::bad_request(format!("tenant_id: {err:?}")))?;
        let workspace_id = WorkspaceId::new(&request.workspace_id)
            .map_err(|err| AdapterError::bad_request(format!("workspace_id: {err:?}")))?;
        let user_id = request
            .user_id
            .as_deref()
            .map(UserId::new)
            .transpose()
            .map_err(|err| AdapterError::bad_request(format!("user_id: {err:?}")))?;
        let envelope_id = request
            .envelope_id
            .as_deref()
            .map(EnvelopeId::new)
            .transpose()
            .map_err(|err| AdapterError::bad_request(format!("envelope_id: {err:?}")))?;
        let envelope_hash = request
            .envelope_hash
            .as_deref()
            .map(Sha256Hex::new)
            .transpose()
            .map_err(|err| AdapterError::bad_request(format!("envelope_hash: {err:?}")))?;

        let check = GateCheckRequest::v1(
            source,
            request.endpoint,
            request.method,
            tenant_id,
            workspace_id,
            user_id,
            envelope_id,
            envelope_hash,
        )
        .map_err(|err| AdapterError::bad_request(format!("gate check: {err:?}")))?;

        let decision = self
            .gate
            .check(&mut self.store, &check, self.clock.now_ns());
        Ok(GateCheckAdapterResponse {
            gate_passed: decision.gate_passed,
            violation_code: decision.violation_code.map(|c| c.as_str().to_string()),
            envelope_status: decision.envelope_status.map(|s| s.as_str().to_string()),
            enforcement: match enforcement_for(source) {
                GateEnforcement::Mandatory => "MANDATORY".to_string(),
                GateEnforcement::Advisory => "ADVISORY".to_string(),
            },
        })
    }

    pub fn replay_initiate(
        &mut self,
        request: ReplayInitiateAdapterRequest,
    ) -> Result<ReplayInitiateAdapterResponse, AdapterError> {
        let hash = Sha256Hex::new(&request.envelope_hash)
            .map_err(|err| AdapterError::bad_request(format!("envelope_hash: {err:?}")))?;
        let source = GateSource::parse(&request.source);
        let (attempt, content) = self
            .replay
            .initiate(&mut self.store, &hash, source, self.clock.now_ns())
            .map_err(|e| AdapterError::coded(e.authority_code(), "replay initiation failed"))?;
        Ok(ReplayInitiateAdapterResponse {
            replay_id: attempt.replay_id.as_str().to_string(),
            replay_status: attempt.replay_status.as_str().to_string(),
            payload_json: content.payload_json,
        })
    }

    pub fn replay_complete(
        &mut self,
        replay_id: &str,
        request: ReplayCompleteAdapterRequest,
    ) -> Result<ReplayCompleteAdapterResponse, AdapterError> {
        let id = ReplayId::new(replay_id)
            .map_err(|err| AdapterError::bad_request(format!("replay_id: {err:?}")))?;
        let hash = Sha256Hex::new(&request.replay_hash)
            .map_err(|err| AdapterError::bad_request(format!("replay_hash: {err:?}")))?;
        let record = self
            .replay
            .complete(
                &mut self.store,
                &id,
                hash,
                request.output_summary,
                self.clock.now_ns(),
            )
            .map_err(|e| AdapterError::coded(e.authority_code(), "replay completion failed"))?;
        Ok(ReplayCompleteAdapterResponse {
            replay_id: record.replay_id.as_str().to_string(),
            replay_status: record.replay_status.as_str().to_string(),
            original_hash: record.original_hash.as_str().to_string(),
            replay_hash: record.replay_hash.as_ref().map(|h| h.as_str().to_string()),
            drift_type: record
                .drift_details
                .as_ref()
                .map(|d| d.drift_type.as_str().to_string()),
        })
    }

    pub fn decide(
        &self,
        request: DecideAdapterRequest,
    ) -> Result<DecideAdapterResponse, AdapterError> {
        let envelope_id = EnvelopeId::new(&request.envelope_id)
            .map_err(|err| AdapterError::bad_request(format!("envelope_id: {err:?}")))?;
        let mode = DecisionMode::parse(&request.mode)
            .ok_or_else(|| AdapterError::bad_request("mode must be DISCOVERY or STANDARD"))?;
        let size_bucket = parse_size_bucket(&request.size_bucket)
            .ok_or_else(|| AdapterError::bad_request("unknown size_bucket"))?;
        let snapshot = LeadSnapshot::v1(
            request.company_name,
            request.industry,
            size_bucket,
            request.region_presence,
            request.engagement_bp,
            request.send_day_of_week,
            request.send_hour_of_day,
            SubVertical::new(&request.sub_vertical)
                .map_err(|err| AdapterError::bad_request(format!("sub_vertical: {err:?}")))?,
            request.product_line,
        )
        .map_err(|err| AdapterError::bad_request(format!("lead snapshot: {err:?}")))?;

        let result = self
            .orchestrator
            .decide(&self.store, &self.clock, &envelope_id, mode, &snapshot)
            .map_err(|e| AdapterError::coded(e.authority_code(), "decision failed"))?;
        Ok(DecideAdapterResponse {
            mode: result.mode.as_str().to_string(),
            score_bp: result.score_bp,
            tier: result.tier.as_str().to_string(),
            outcome: result.outcome.as_str().to_string(),
            reason: result.reason.clone(),
            content_hash: result.content_hash.as_str().to_string(),
            denied_capabilities: result
                .trace
                .denied_capabilities()
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
        })
    }
}

fn parse_size_bucket(value: &str) -> Option<SizeBucket> {
    match value {
        "MICRO" => Some(SizeBucket::Micro),
        "SMALL" => Some(SizeBucket::Small),
        "MEDIUM" => Some(SizeBucket::Medium),
        "LARGE" => Some(SizeBucket::Large),
        "ENTERPRISE" => Some(SizeBucket::Enterprise),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_runtime() -> AdapterRuntime {
        let mut runtime = AdapterRuntime::mvp_v1().unwrap();
        runtime.seed_demo_control_plane().unwrap();
        runtime
    }

    fn seal_request() -> SealEnvelopeAdapterRequest {
        SealEnvelopeAdapterRequest {
            tenant_id: "tenant_acme".to_string(),
            workspace_id: "ws_sales".to_string(),
            sub_vertical: "employee_banking".to_string(),
            region: Some("uae".to_string()),
            payload_json: "{\"lead\":\"falcon\"}".to_string(),
            expires_at_ns: None,
        }
    }

    #[test]
    fn at_adapter_01_seal_then_verify_and_fetch_content() {
        let mut runtime = seeded_runtime();
        let sealed = runtime.seal_envelope(seal_request()).unwrap();
        assert!(sealed.is_new);
        assert_eq!(sealed.territory.as_deref(), Some("uae"));

        let resealed = runtime.seal_envelope(seal_request()).unwrap();
        assert!(!resealed.is_new);
        assert_eq!(sealed.envelope_id, resealed.envelope_id);

        let report = runtime
            .verify_envelope(Some(&sealed.envelope_id), None)
            .unwrap();
        assert!(report.is_valid);
        assert_eq!(report.verification_message, "ENVELOPE_VALID");

        let content = runtime.envelope_content(&sealed.envelope_id).unwrap();
        assert_eq!(content.payload_json, "{\"lead\":\"falcon\"}");
        assert_eq!(content.allowed_tools.len(), 4);
    }

    #[test]
    fn at_adapter_02_resolution_misses_carry_authority_codes() {
        let runtime = seeded_runtime();
        let err = runtime
            .resolve_persona("unknown_vertical", None)
            .unwrap_err();
        assert_eq!(
            err.authority_code,
            Some(AuthorityCode::SubVerticalNotFound)
        );

        let resolved = runtime
            .resolve_territory("UNKNOWN-REGION", Some("merchant_services"))
            .unwrap();
        assert_eq!(resolved.slug, "global");
        assert_eq!(resolved.sub_vertical_valid, Some(true));
    }

    #[test]
    fn at_adapter_03_gate_and_decision_over_one_envelope() {
        let mut runtime = seeded_runtime();
        let sealed = runtime.seal_envelope(seal_request()).unwrap();

        let gate = runtime
            .gate_check(GateCheckAdapterRequest {
                source: "VALIDATION_HARNESS".to_string(),
                endpoint: "/decision/score".to_string(),
                method: "POST".to_string(),
                tenant_id: "tenant_acme".to_string(),
                workspace_id: "ws_sales".to_string(),
                user_id: None,
                envelope_id: Some(sealed.envelope_id.clone()),
                envelope_hash: None,
            })
            .unwrap();
        assert!(gate.gate_passed);
        assert_eq!(gate.enforcement, "MANDATORY");

        let decision = runtime
            .decide(DecideAdapterRequest {
                envelope_id: sealed.envelope_id.clone(),
                mode: "DISCOVERY".to_string(),
                company_name: "Falcon Trading LLC".to_string(),
                industry: "banking".to_string(),
                size_bucket: "MEDIUM".to_string(),
                region_presence: true,
                engagement_bp: 6_000,
                send_day_of_week: 2,
                send_hour_of_day: 9,
                sub_vertical: "employee_banking".to_string(),
                product_line: "payroll_accounts".to_string(),
            })
            .unwrap();
        assert!(decision.score_bp <= 10_000);
        assert!(decision.denied_capabilities.is_empty());
        assert_eq!(decision.mode, "DISCOVERY");
    }

    #[test]
    fn at_adapter_04_replay_round_trip_reports_drift() {
        let mut runtime = seeded_runtime();
        let sealed = runtime.seal_envelope(seal_request()).unwrap();

        let initiated = runtime
            .replay_initiate(ReplayInitiateAdapterRequest {
                envelope_hash: sealed.sha256_hash.clone(),
                source: "VALIDATION_HARNESS".to_string(),
            })
            .unwrap();
        assert_eq!(initiated.replay_status, "PENDING");

        let same = runtime
            .replay_complete(
                &initiated.replay_id,
                ReplayCompleteAdapterRequest {
                    replay_hash: sealed.sha256_hash.clone(),
                    output_summary: None,
                },
            )
            .unwrap();
        assert_eq!(same.replay_status, "SUCCESS");

        let initiated = runtime
            .replay_initiate(ReplayInitiateAdapterRequest {
                envelope_hash: sealed.sha256_hash.clone(),
                source: "ADMIN_CONSOLE".to_string(),
            })
            .unwrap();
        let drifted = runtime
            .replay_complete(
                &initiated.replay_id,
                ReplayCompleteAdapterRequest {
                    replay_hash: "f".repeat(64),
                    output_summary: Some("replayed with updated engine".to_string()),
                },
            )
            .unwrap();
        assert_eq!(drifted.replay_status, "DRIFT_DETECTED");
        assert_eq!(drifted.drift_type.as_deref(), Some("HASH_MISMATCH"));
    }

    #[test]
    fn at_adapter_05_unknown_replay_hash_is_coded_not_found() {
        let mut runtime = seeded_runtime();
        let err = runtime
            .replay_initiate(ReplayInitiateAdapterRequest {
                envelope_hash: "a".repeat(64),
                source: "VALIDATION_HARNESS".to_string(),
            })
            .unwrap_err();
        assert_eq!(
            err.authority_code,
            Some(AuthorityCode::EnvelopeNotSealed)
        );
    }
}
