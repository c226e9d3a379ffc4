#![forbid(unsafe_code)]

use crate::common::{validate_token, ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};
use crate::envelope::EnvelopeStatus;
use crate::ids::{EnvelopeId, Sha256Hex, TenantId, UserId, WorkspaceId};

pub const GATE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Known calling sources. The validation harness is held to mandatory
/// enforcement; everything else is advisory but always logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateSource {
    ValidationHarness,
    LiveTraffic,
    AdminConsole,
    Unknown,
}

impl GateSource {
    pub fn as_str(self) -> &'static str {
        match self {
            GateSource::ValidationHarness => "VALIDATION_HARNESS",
            GateSource::LiveTraffic => "LIVE_TRAFFIC",
            GateSource::AdminConsole => "ADMIN_CONSOLE",
            GateSource::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "VALIDATION_HARNESS" => GateSource::ValidationHarness,
            "LIVE_TRAFFIC" => GateSource::LiveTraffic,
            "ADMIN_CONSOLE" => GateSource::AdminConsole,
            _ => GateSource::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationCode {
    NoEnvelope,
    InvalidEnvelope,
    RevokedEnvelope,
    ExpiredEnvelope,
}

impl ViolationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationCode::NoEnvelope => "NO_ENVELOPE",
            ViolationCode::InvalidEnvelope => "INVALID_ENVELOPE",
            ViolationCode::RevokedEnvelope => "REVOKED_ENVELOPE",
            ViolationCode::ExpiredEnvelope => "EXPIRED_ENVELOPE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStatus {
    Unresolved,
    Resolved,
    Ignored,
    Escalated,
}

impl ResolutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionStatus::Unresolved => "UNRESOLVED",
            ResolutionStatus::Resolved => "RESOLVED",
            ResolutionStatus::Ignored => "IGNORED",
            ResolutionStatus::Escalated => "ESCALATED",
        }
    }
}

/// Full request context presented to the gate before a decision-engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateCheckRequest {
    pub schema_version: SchemaVersion,
    pub source: GateSource,
    pub endpoint: String,
    pub method: String,
    pub tenant_id: TenantId,
    pub workspace_id: WorkspaceId,
    pub user_id: Option<UserId>,
    pub envelope_id: Option<EnvelopeId>,
    pub envelope_hash: Option<Sha256Hex>,
}

impl GateCheckRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        source: GateSource,
        endpoint: String,
        method: String,
        tenant_id: TenantId,
        workspace_id: WorkspaceId,
        user_id: Option<UserId>,
        envelope_id: Option<EnvelopeId>,
        envelope_hash: Option<Sha256Hex>,
    ) -> Result<Self, ContractViolation> {
        let req = Self {
            schema_version: GATE_CONTRACT_VERSION,
            source,
            endpoint,
            method,
            tenant_id,
            workspace_id,
            user_id,
            envelope_id,
            envelope_hash,
        };
        req.validate()?;
        Ok(req)
    }
}

impl Validate for GateCheckRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != GATE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "gate_check_request.schema_version",
                reason: "must match GATE_CONTRACT_VERSION",
            });
        }
        validate_token("gate_check_request.endpoint", &self.endpoint, 256)?;
        validate_token("gate_check_request.method", &self.method, 8)?;
        Ok(())
    }
}

/// Gate verdict. `violation_code` is present exactly when the gate fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub gate_passed: bool,
    pub violation_code: Option<ViolationCode>,
    pub envelope_status: Option<EnvelopeStatus>,
}

impl GateDecision {
    pub fn pass(status: EnvelopeStatus) -> Self {
        Self {
            gate_passed: true,
            violation_code: None,
            envelope_status: Some(status),
        }
    }

    pub fn fail(code: ViolationCode, status: Option<EnvelopeStatus>) -> Self {
        Self {
            gate_passed: false,
            violation_code: Some(code),
            envelope_status: status,
        }
    }
}

/// Append-only audit row for a rejected decision-engine invocation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateViolationRecord {
    pub schema_version: SchemaVersion,
    pub violation_seq: u64,
    pub violation_code: ViolationCode,
    pub source: GateSource,
    pub endpoint: String,
    pub method: String,
    pub tenant_id: TenantId,
    pub workspace_id: WorkspaceId,
    pub user_id: Option<UserId>,
    pub envelope_id: Option<EnvelopeId>,
    pub envelope_hash: Option<Sha256Hex>,
    pub occurred_at: MonotonicTimeNs,
    pub resolution_status: ResolutionStatus,
}

impl GateViolationRecord {
    pub fn v1(
        violation_seq: u64,
        violation_code: ViolationCode,
        request: &GateCheckRequest,
        occurred_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        request.validate()?;
        Ok(Self {
            schema_version: GATE_CONTRACT_VERSION,
            violation_seq,
            violation_code,
            source: request.source,
            endpoint: request.endpoint.clone(),
            method: request.method.clone(),
            tenant_id: request.tenant_id.clone(),
            workspace_id: request.workspace_id.clone(),
            user_id: request.user_id.clone(),
            envelope_id: request.envelope_id.clone(),
            envelope_hash: request.envelope_hash.clone(),
            occurred_at,
            resolution_status: ResolutionStatus::Unresolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GateCheckRequest {
        GateCheckRequest::v1(
            GateSource::ValidationHarness,
            "/decision/score".to_string(),
            "POST".to_string(),
            TenantId::new("tenant_1").unwrap(),
            WorkspaceId::new("ws_1").unwrap(),
            Some(UserId::new("user_1").unwrap()),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn at_gate_01_violation_record_starts_unresolved() {
        let record =
            GateViolationRecord::v1(1, ViolationCode::NoEnvelope, &request(), MonotonicTimeNs(5))
                .unwrap();
        assert_eq!(record.resolution_status, ResolutionStatus::Unresolved);
        assert_eq!(record.violation_code.as_str(), "NO_ENVELOPE");
    }

    #[test]
    fn at_gate_02_decision_constructors_pair_code_with_failure() {
        let pass = GateDecision::pass(EnvelopeStatus::Sealed);
        assert!(pass.gate_passed && pass.violation_code.is_none());

        let fail = GateDecision::fail(ViolationCode::RevokedEnvelope, Some(EnvelopeStatus::Revoked));
        assert!(!fail.gate_passed);
        assert_eq!(fail.violation_code, Some(ViolationCode::RevokedEnvelope));
    }

    #[test]
    fn at_gate_03_unknown_source_parses_to_unknown() {
        assert_eq!(GateSource::parse("cron_job"), GateSource::Unknown);
        assert_eq!(
            GateSource::parse("VALIDATION_HARNESS"),
            GateSource::ValidationHarness
        );
    }
}
