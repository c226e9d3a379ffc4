#![forbid(unsafe_code)]

use crate::common::{validate_token, ContractViolation, SchemaVersion, Validate};
use crate::ids::{PersonaId, RegionCode, SubVertical};

pub const PERSONA_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Scope levels in resolution order, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum PersonaScope {
    Local,
    Regional,
    Global,
}

impl PersonaScope {
    pub fn as_str(self) -> &'static str {
        match self {
            PersonaScope::Local => "LOCAL",
            PersonaScope::Regional => "REGIONAL",
            PersonaScope::Global => "GLOBAL",
        }
    }
}

/// A named decision-making stance. Never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaRecord {
    pub schema_version: SchemaVersion,
    pub persona_id: PersonaId,
    pub name: String,
    pub scope: PersonaScope,
    pub parent: Option<PersonaId>,
    pub sub_vertical: SubVertical,
    pub region: Option<RegionCode>,
    pub mission: String,
    pub active: bool,
}

impl PersonaRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        persona_id: PersonaId,
        name: String,
        scope: PersonaScope,
        parent: Option<PersonaId>,
        sub_vertical: SubVertical,
        region: Option<RegionCode>,
        mission: String,
        active: bool,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: PERSONA_CONTRACT_VERSION,
            persona_id,
            name,
            scope,
            parent,
            sub_vertical,
            region,
            mission,
            active,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for PersonaRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != PERSONA_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "persona_record.schema_version",
                reason: "must match PERSONA_CONTRACT_VERSION",
            });
        }
        validate_token("persona_record.name", &self.name, 128)?;
        validate_token("persona_record.mission", &self.mission, 512)?;
        // A GLOBAL persona binds to no region; LOCAL requires one.
        match self.scope {
            PersonaScope::Global => {
                if self.region.is_some() {
                    return Err(ContractViolation::InvalidValue {
                        field: "persona_record.region",
                        reason: "must be absent for GLOBAL scope",
                    });
                }
            }
            PersonaScope::Local | PersonaScope::Regional => {
                if self.region.is_none() {
                    return Err(ContractViolation::InvalidValue {
                        field: "persona_record.region",
                        reason: "required for LOCAL and REGIONAL scope",
                    });
                }
            }
        }
        Ok(())
    }
}

/// Result of a persona resolution: the persona, the scope level it was found
/// at, and the auditable trail of every level attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaResolution {
    pub schema_version: SchemaVersion,
    pub persona: PersonaRecord,
    pub resolution_scope: PersonaScope,
    pub resolution_path: String,
}

impl PersonaResolution {
    pub fn v1(
        persona: PersonaRecord,
        resolution_scope: PersonaScope,
        resolution_path: String,
    ) -> Result<Self, ContractViolation> {
        let resolution = Self {
            schema_version: PERSONA_CONTRACT_VERSION,
            persona,
            resolution_scope,
            resolution_path,
        };
        resolution.validate()?;
        Ok(resolution)
    }
}

impl Validate for PersonaResolution {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.persona.validate()?;
        validate_token(
            "persona_resolution.resolution_path",
            &self.resolution_path,
            512,
        )?;
        Ok(())
    }
}
