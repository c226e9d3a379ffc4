#![forbid(unsafe_code)]

use crate::common::{validate_token, ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};
use crate::gate::GateSource;
use crate::ids::{ReplayId, Sha256Hex};

pub const REPLAY_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplayStatus {
    Pending,
    Success,
    DriftDetected,
    EnvelopeNotFound,
    Failed,
}

impl ReplayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplayStatus::Pending => "PENDING",
            ReplayStatus::Success => "SUCCESS",
            ReplayStatus::DriftDetected => "DRIFT_DETECTED",
            ReplayStatus::EnvelopeNotFound => "ENVELOPE_NOT_FOUND",
            ReplayStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ReplayStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriftType {
    HashMismatch,
}

impl DriftType {
    pub fn as_str(self) -> &'static str {
        match self {
            DriftType::HashMismatch => "HASH_MISMATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftDetails {
    pub drift_type: DriftType,
    pub original_hash: Sha256Hex,
    pub replay_hash: Sha256Hex,
}

/// One replay of a sealed envelope. Created PENDING, finalized exactly once;
/// history is an audit trail, not a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayAttemptRecord {
    pub schema_version: SchemaVersion,
    pub replay_id: ReplayId,
    pub envelope_hash: Sha256Hex,
    pub source: GateSource,
    pub replay_status: ReplayStatus,
    pub original_hash: Sha256Hex,
    pub replay_hash: Option<Sha256Hex>,
    pub drift_details: Option<DriftDetails>,
    pub output_summary: Option<String>,
    pub initiated_at: MonotonicTimeNs,
    pub completed_at: Option<MonotonicTimeNs>,
}

impl ReplayAttemptRecord {
    pub fn pending_v1(
        replay_id: ReplayId,
        envelope_hash: Sha256Hex,
        source: GateSource,
        initiated_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: REPLAY_CONTRACT_VERSION,
            replay_id,
            original_hash: envelope_hash.clone(),
            envelope_hash,
            source,
            replay_status: ReplayStatus::Pending,
            replay_hash: None,
            drift_details: None,
            output_summary: None,
            initiated_at,
            completed_at: None,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for ReplayAttemptRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != REPLAY_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "replay_attempt_record.schema_version",
                reason: "must match REPLAY_CONTRACT_VERSION",
            });
        }
        if let Some(summary) = &self.output_summary {
            validate_token("replay_attempt_record.output_summary", summary, 4096)?;
        }
        match self.replay_status {
            ReplayStatus::Pending => {
                if self.replay_hash.is_some()
                    || self.drift_details.is_some()
                    || self.completed_at.is_some()
                {
                    return Err(ContractViolation::InvalidValue {
                        field: "replay_attempt_record.replay_status",
                        reason: "PENDING attempts must carry no completion data",
                    });
                }
            }
            ReplayStatus::Success => {
                if self.drift_details.is_some() {
                    return Err(ContractViolation::InvalidValue {
                        field: "replay_attempt_record.drift_details",
                        reason: "must be absent on SUCCESS",
                    });
                }
                if self.replay_hash != Some(self.original_hash.clone()) {
                    return Err(ContractViolation::InvalidValue {
                        field: "replay_attempt_record.replay_hash",
                        reason: "must equal original_hash on SUCCESS",
                    });
                }
            }
            ReplayStatus::DriftDetected => {
                let details =
                    self.drift_details
                        .as_ref()
                        .ok_or(ContractViolation::InvalidValue {
                            field: "replay_attempt_record.drift_details",
                            reason: "required on DRIFT_DETECTED",
                        })?;
                if details.original_hash != self.original_hash {
                    return Err(ContractViolation::InvalidValue {
                        field: "replay_attempt_record.drift_details",
                        reason: "original_hash must match the attempt",
                    });
                }
                if Some(&details.replay_hash) == Some(&self.original_hash) {
                    return Err(ContractViolation::InvalidValue {
                        field: "replay_attempt_record.drift_details",
                        reason: "replay_hash must differ from original on drift",
                    });
                }
            }
            ReplayStatus::EnvelopeNotFound | ReplayStatus::Failed => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(fill: char) -> Sha256Hex {
        Sha256Hex::new(&fill.to_string().repeat(64)).unwrap()
    }

    #[test]
    fn at_replay_01_pending_carries_no_completion_data() {
        let record = ReplayAttemptRecord::pending_v1(
            ReplayId::new("rp_1").unwrap(),
            hash('a'),
            GateSource::ValidationHarness,
            MonotonicTimeNs(1),
        )
        .unwrap();
        assert_eq!(record.replay_status, ReplayStatus::Pending);
        assert!(record.drift_details.is_none());
    }

    #[test]
    fn at_replay_02_success_requires_matching_hash() {
        let mut record = ReplayAttemptRecord::pending_v1(
            ReplayId::new("rp_1").unwrap(),
            hash('a'),
            GateSource::ValidationHarness,
            MonotonicTimeNs(1),
        )
        .unwrap();
        record.replay_status = ReplayStatus::Success;
        record.replay_hash = Some(hash('b'));
        record.completed_at = Some(MonotonicTimeNs(2));
        assert!(record.validate().is_err());

        record.replay_hash = Some(hash('a'));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn at_replay_03_drift_requires_differing_details() {
        let mut record = ReplayAttemptRecord::pending_v1(
            ReplayId::new("rp_1").unwrap(),
            hash('a'),
            GateSource::ValidationHarness,
            MonotonicTimeNs(1),
        )
        .unwrap();
        record.replay_status = ReplayStatus::DriftDetected;
        record.completed_at = Some(MonotonicTimeNs(2));
        assert!(record.validate().is_err());

        record.replay_hash = Some(hash('b'));
        record.drift_details = Some(DriftDetails {
            drift_type: DriftType::HashMismatch,
            original_hash: hash('a'),
            replay_hash: hash('b'),
        });
        assert!(record.validate().is_ok());
    }

    #[test]
    fn at_replay_04_terminality() {
        assert!(!ReplayStatus::Pending.is_terminal());
        assert!(ReplayStatus::Success.is_terminal());
        assert!(ReplayStatus::DriftDetected.is_terminal());
        assert!(ReplayStatus::Failed.is_terminal());
    }
}
