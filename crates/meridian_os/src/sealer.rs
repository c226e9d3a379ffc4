#![forbid(unsafe_code)]

use meridian_contracts::codes::AuthorityCode;
use meridian_contracts::envelope::{
    EnvelopeContent, EnvelopeStatus, SealOutcome, VerifyReport,
};
use meridian_contracts::ids::{EnvelopeId, Sha256Hex};
use meridian_contracts::MonotonicTimeNs;
use meridian_storage::repo::EnvelopeRepo;
use meridian_storage::{EnvelopeSealInput, StorageError};

/// Seals, verifies, and administers content-addressed envelopes.
///
/// Sealing delegates to the store, which owns the canonical hash and the
/// hash index, so two sealers with the same content always converge on one
/// row. Verification never mutates; revoke/expire are the only transitions
/// and the store enforces they move forward only.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeSealer;

impl EnvelopeSealer {
    pub fn new() -> Self {
        Self
    }

    pub fn seal<S>(
        &self,
        store: &mut S,
        input: EnvelopeSealInput,
        now: MonotonicTimeNs,
    ) -> Result<SealOutcome, StorageError>
    where
        S: EnvelopeRepo,
    {
        let (envelope, is_new) = store.seal_envelope_row(input, now)?;
        Ok(SealOutcome { envelope, is_new })
    }

    /// Verifies by id or content hash; id wins when both are present.
    /// The report message is drawn from the fixed vocabulary the gate and
    /// HTTP surface pattern-match on.
    pub fn verify<S>(
        &self,
        store: &S,
        envelope_id: Option<&EnvelopeId>,
        envelope_hash: Option<&Sha256Hex>,
        now: MonotonicTimeNs,
    ) -> VerifyReport
    where
        S: EnvelopeRepo,
    {
        let record = match (envelope_id, envelope_hash) {
            (None, None) => {
                return VerifyReport {
                    is_valid: false,
                    status: None,
                    verification_message: AuthorityCode::IdentifierRequired,
                }
            }
            (Some(id), _) => store.envelope_row(id),
            (None, Some(hash)) => store.envelope_row_by_hash(hash),
        };

        let Some(envelope) = record else {
            return VerifyReport {
                is_valid: false,
                status: None,
                verification_message: AuthorityCode::EnvelopeNotSealed,
            };
        };

        if envelope.status == EnvelopeStatus::Revoked {
            return VerifyReport {
                is_valid: false,
                status: Some(EnvelopeStatus::Revoked),
                verification_message: AuthorityCode::EnvelopeRevoked,
            };
        }
        if envelope.is_expired_at(now) {
            return VerifyReport {
                is_valid: false,
                status: Some(envelope.status),
                verification_message: AuthorityCode::EnvelopeExpired,
            };
        }
        VerifyReport {
            is_valid: true,
            status: Some(EnvelopeStatus::Sealed),
            verification_message: AuthorityCode::EnvelopeValid,
        }
    }

    /// Full stored content, never a partial view.
    pub fn content<S>(
        &self,
        store: &S,
        envelope_id: &EnvelopeId,
    ) -> Result<EnvelopeContent, AuthorityCode>
    where
        S: EnvelopeRepo,
    {
        store
            .envelope_row(envelope_id)
            .map(|e| e.content.clone())
            .ok_or(AuthorityCode::EnvelopeNotSealed)
    }

    pub fn revoke<S>(&self, store: &mut S, envelope_id: &EnvelopeId) -> Result<(), StorageError>
    where
        S: EnvelopeRepo,
    {
        store.set_envelope_status(envelope_id, EnvelopeStatus::Revoked)
    }

    pub fn expire<S>(&self, store: &mut S, envelope_id: &EnvelopeId) -> Result<(), StorageError>
    where
        S: EnvelopeRepo,
    {
        store.set_envelope_status(envelope_id, EnvelopeStatus::Expired)
    }
}
