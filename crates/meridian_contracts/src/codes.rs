#![forbid(unsafe_code)]

/// Code-based outcome vocabulary. Downstream systems pattern-match on these
/// exact strings, so they are a wire contract, not display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorityCode {
    PersonaNotResolved,
    PolicyNotFound,
    MultipleActivePolicies,
    SubVerticalNotFound,
    SubVerticalInactive,
    TerritoryNotConfigured,
    TerritoryInvalidForSubvertical,
    EnvelopeValid,
    EnvelopeNotSealed,
    EnvelopeNotFound,
    EnvelopeExpired,
    EnvelopeRevoked,
    IdentifierRequired,
    NoEnvelope,
    InvalidEnvelope,
    RevokedEnvelope,
    ExpiredEnvelope,
    ReplayDriftDetected,
    ReplayNotFound,
    HashRequired,
}

impl AuthorityCode {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthorityCode::PersonaNotResolved => "PERSONA_NOT_RESOLVED",
            AuthorityCode::PolicyNotFound => "POLICY_NOT_FOUND",
            AuthorityCode::MultipleActivePolicies => "MULTIPLE_ACTIVE_POLICIES",
            AuthorityCode::SubVerticalNotFound => "SUB_VERTICAL_NOT_FOUND",
            AuthorityCode::SubVerticalInactive => "SUB_VERTICAL_INACTIVE",
            AuthorityCode::TerritoryNotConfigured => "TERRITORY_NOT_CONFIGURED",
            AuthorityCode::TerritoryInvalidForSubvertical => "TERRITORY_INVALID_FOR_SUBVERTICAL",
            AuthorityCode::EnvelopeValid => "ENVELOPE_VALID",
            AuthorityCode::EnvelopeNotSealed => "ENVELOPE_NOT_SEALED",
            AuthorityCode::EnvelopeNotFound => "ENVELOPE_NOT_FOUND",
            AuthorityCode::EnvelopeExpired => "ENVELOPE_EXPIRED",
            AuthorityCode::EnvelopeRevoked => "ENVELOPE_REVOKED",
            AuthorityCode::IdentifierRequired => "IDENTIFIER_REQUIRED",
            AuthorityCode::NoEnvelope => "NO_ENVELOPE",
            AuthorityCode::InvalidEnvelope => "INVALID_ENVELOPE",
            AuthorityCode::RevokedEnvelope => "REVOKED_ENVELOPE",
            AuthorityCode::ExpiredEnvelope => "EXPIRED_ENVELOPE",
            AuthorityCode::ReplayDriftDetected => "REPLAY_DRIFT_DETECTED",
            AuthorityCode::ReplayNotFound => "REPLAY_NOT_FOUND",
            AuthorityCode::HashRequired => "HASH_REQUIRED",
        }
    }

    /// Recoverable codes allow the caller to degrade (404-class); everything
    /// else is a hard stop for the current call.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            AuthorityCode::PersonaNotResolved
                | AuthorityCode::SubVerticalNotFound
                | AuthorityCode::TerritoryNotConfigured
        )
    }
}
