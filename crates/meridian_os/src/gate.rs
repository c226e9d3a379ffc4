#![forbid(unsafe_code)]

use std::collections::VecDeque;

use meridian_contracts::envelope::EnvelopeStatus;
use meridian_contracts::gate::{GateCheckRequest, GateDecision, GateSource, ViolationCode};
use meridian_contracts::MonotonicTimeNs;
use meridian_storage::repo::{EnvelopeRepo, GateViolationRepo};

/// Enforcement posture per calling source. The validation harness is never
/// allowed through on a failed gate; other sources may degrade, but every
/// violation is recorded either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEnforcement {
    Mandatory,
    Advisory,
}

pub fn enforcement_for(source: GateSource) -> GateEnforcement {
    match source {
        GateSource::ValidationHarness => GateEnforcement::Mandatory,
        GateSource::LiveTraffic | GateSource::AdminConsole | GateSource::Unknown => {
            GateEnforcement::Advisory
        }
    }
}

/// Injected, explicitly scoped counters. Owned by the gate instance; callers
/// decide when a counting window starts and ends via `reset()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateMetrics {
    pub checks_total: u64,
    pub violations_total: u64,
    pub audit_write_failures: u64,
    pub pending_audit_dropped: u64,
}

impl GateMetrics {
    pub fn reset(&mut self) {
        *self = GateMetrics::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeGateConfig {
    /// Capacity of the retry buffer for violations whose audit write failed.
    pub pending_audit_capacity: usize,
}

impl RuntimeGateConfig {
    pub fn mvp_v1() -> Self {
        Self {
            pending_audit_capacity: 64,
        }
    }
}

/// The precondition check in front of every decision-engine call.
///
/// The decision table runs in order: no identifier, unknown identifier,
/// revoked, expired, pass. Each rejection appends exactly one violation row
/// before the decision is returned. A failed audit write does not block the
/// rejection; the row is parked in a bounded retry buffer, counted in the
/// metrics, and flushed by `drain_pending_audit`.
#[derive(Debug, Clone)]
pub struct RuntimeGate {
    config: RuntimeGateConfig,
    metrics: GateMetrics,
    pending_audit: VecDeque<(ViolationCode, GateCheckRequest, MonotonicTimeNs)>,
}

impl RuntimeGate {
    pub fn new(config: RuntimeGateConfig, metrics: GateMetrics) -> Self {
        Self {
            config,
            metrics,
            pending_audit: VecDeque::new(),
        }
    }

    pub fn check<S>(
        &mut self,
        store: &mut S,
        request: &GateCheckRequest,
        now: MonotonicTimeNs,
    ) -> GateDecision
    where
        S: EnvelopeRepo + GateViolationRepo,
    {
        self.metrics.checks_total += 1;

        let (code, status) = match self.evaluate(store, request, now) {
            Ok(status) => return GateDecision::pass(status),
            Err(failure) => failure,
        };

        self.metrics.violations_total += 1;
        self.record_violation(store, code, request, now);
        GateDecision::fail(code, status)
    }

    fn evaluate<S>(
        &self,
        store: &S,
        request: &GateCheckRequest,
        now: MonotonicTimeNs,
    ) -> Result<EnvelopeStatus, (ViolationCode, Option<EnvelopeStatus>)>
    where
        S: EnvelopeRepo,
    {
        if request.envelope_id.is_none() && request.envelope_hash.is_none() {
            return Err((ViolationCode::NoEnvelope, None));
        }

        let envelope = match (&request.envelope_id, &request.envelope_hash) {
            (Some(id), _) => store.envelope_row(id),
            (None, Some(hash)) => store.envelope_row_by_hash(hash),
            (None, None) => None,
        };
        let Some(envelope) = envelope else {
            return Err((ViolationCode::InvalidEnvelope, None));
        };

        if envelope.status == EnvelopeStatus::Revoked {
            return Err((ViolationCode::RevokedEnvelope, Some(EnvelopeStatus::Revoked)));
        }
        if envelope.is_expired_at(now) {
            return Err((ViolationCode::ExpiredEnvelope, Some(envelope.status)));
        }
        Ok(EnvelopeStatus::Sealed)
    }

    fn record_violation<S>(
        &mut self,
        store: &mut S,
        code: ViolationCode,
        request: &GateCheckRequest,
        occurred_at: MonotonicTimeNs,
    ) where
        S: GateViolationRepo,
    {
        if store
            .append_gate_violation_row(code, request, occurred_at)
            .is_ok()
        {
            return;
        }
        self.metrics.audit_write_failures += 1;
        if self.pending_audit.len() >= self.config.pending_audit_capacity {
            self.pending_audit.pop_front();
            self.metrics.pending_audit_dropped += 1;
        }
        self.pending_audit
            .push_back((code, request.clone(), occurred_at));
    }

    /// Retries parked audit writes in arrival order. Rows that fail again
    /// stay parked. Returns the number flushed.
    pub fn drain_pending_audit<S>(&mut self, store: &mut S) -> usize
    where
        S: GateViolationRepo,
    {
        let mut flushed = 0;
        let mut remaining = VecDeque::new();
        while let Some((code, request, occurred_at)) = self.pending_audit.pop_front() {
            match store.append_gate_violation_row(code, &request, occurred_at) {
                Ok(_) => flushed += 1,
                Err(_) => remaining.push_back((code, request, occurred_at)),
            }
        }
        self.pending_audit = remaining;
        flushed
    }

    pub fn pending_audit_len(&self) -> usize {
        self.pending_audit.len()
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}
