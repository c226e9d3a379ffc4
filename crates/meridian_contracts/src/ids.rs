#![forbid(unsafe_code)]

use crate::common::{validate_token, ContractViolation};

macro_rules! token_id {
    ($(#[$doc:meta])* $name:ident, $field:literal, $max:expr) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(String);

        impl $name {
            pub fn new(value: &str) -> Result<Self, ContractViolation> {
                validate_token($field, value, $max)?;
                Ok(Self(value.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

token_id!(TenantId, "tenant_id", 96);
token_id!(WorkspaceId, "workspace_id", 96);
token_id!(UserId, "user_id", 128);
token_id!(PersonaId, "persona_id", 96);
token_id!(PolicyId, "policy_id", 96);
token_id!(TerritorySlug, "territory_slug", 96);
token_id!(EnvelopeId, "envelope_id", 96);
token_id!(ReplayId, "replay_id", 96);
token_id!(
    /// Normalized sub-vertical identifier, e.g. `employee_banking`.
    SubVertical, "sub_vertical", 96
);
token_id!(RegionCode, "region_code", 32);

/// Lowercase hex SHA-256 digest. The only accepted content-address form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Sha256Hex(String);

impl Sha256Hex {
    pub fn new(value: &str) -> Result<Self, ContractViolation> {
        if value.len() != 64 {
            return Err(ContractViolation::InvalidValue {
                field: "sha256_hex",
                reason: "must be exactly 64 hex chars",
            });
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
            return Err(ContractViolation::InvalidValue {
                field: "sha256_hex",
                reason: "must be lowercase hex",
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut out = String::with_capacity(64);
        for b in digest {
            out.push_str(&format!("{:02x}", b));
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
