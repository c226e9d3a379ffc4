#![forbid(unsafe_code)]

use crate::common::{validate_token, ContractViolation, SchemaVersion, Validate};
use crate::ids::TerritorySlug;

pub const TERRITORY_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TerritoryLevel {
    Global,
    Region,
    Country,
    State,
    District,
}

impl TerritoryLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            TerritoryLevel::Global => "GLOBAL",
            TerritoryLevel::Region => "REGION",
            TerritoryLevel::Country => "COUNTRY",
            TerritoryLevel::State => "STATE",
            TerritoryLevel::District => "DISTRICT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverageType {
    Single,
    Multi,
    Global,
}

impl CoverageType {
    pub fn as_str(self) -> &'static str {
        match self {
            CoverageType::Single => "SINGLE",
            CoverageType::Multi => "MULTI",
            CoverageType::Global => "GLOBAL",
        }
    }
}

/// Hierarchical geographic/regulatory scope. Exactly one record carries
/// `TerritoryLevel::Global`; every resolution chain terminates there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryRecord {
    pub schema_version: SchemaVersion,
    pub slug: TerritorySlug,
    pub name: String,
    pub country_code: Option<String>,
    pub level: TerritoryLevel,
    pub coverage_type: CoverageType,
    pub parent: Option<TerritorySlug>,
    pub active: bool,
}

impl TerritoryRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        slug: TerritorySlug,
        name: String,
        country_code: Option<String>,
        level: TerritoryLevel,
        coverage_type: CoverageType,
        parent: Option<TerritorySlug>,
        active: bool,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: TERRITORY_CONTRACT_VERSION,
            slug,
            name,
            country_code,
            level,
            coverage_type,
            parent,
            active,
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for TerritoryRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != TERRITORY_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "territory_record.schema_version",
                reason: "must match TERRITORY_CONTRACT_VERSION",
            });
        }
        validate_token("territory_record.name", &self.name, 128)?;
        if let Some(cc) = &self.country_code {
            validate_token("territory_record.country_code", cc, 3)?;
            if !cc.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(ContractViolation::InvalidValue {
                    field: "territory_record.country_code",
                    reason: "must be uppercase ISO letters",
                });
            }
        }
        match self.level {
            TerritoryLevel::Global => {
                if self.coverage_type != CoverageType::Global {
                    return Err(ContractViolation::InvalidValue {
                        field: "territory_record.coverage_type",
                        reason: "global territory must have GLOBAL coverage",
                    });
                }
                if self.parent.is_some() {
                    return Err(ContractViolation::InvalidValue {
                        field: "territory_record.parent",
                        reason: "global territory must have no parent",
                    });
                }
            }
            _ => {
                if self.coverage_type == CoverageType::Global {
                    return Err(ContractViolation::InvalidValue {
                        field: "territory_record.coverage_type",
                        reason: "GLOBAL coverage reserved for the global territory",
                    });
                }
            }
        }
        Ok(())
    }
}

/// Result of a territory resolution; total by construction (the resolver
/// falls back to the global territory for any input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryResolution {
    pub schema_version: SchemaVersion,
    pub territory: TerritoryRecord,
    pub resolution_path: String,
    pub resolution_depth: u8,
}

impl TerritoryResolution {
    pub fn v1(
        territory: TerritoryRecord,
        resolution_path: String,
        resolution_depth: u8,
    ) -> Result<Self, ContractViolation> {
        let resolution = Self {
            schema_version: TERRITORY_CONTRACT_VERSION,
            territory,
            resolution_path,
            resolution_depth,
        };
        resolution.validate()?;
        Ok(resolution)
    }
}

impl Validate for TerritoryResolution {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.territory.validate()?;
        validate_token(
            "territory_resolution.resolution_path",
            &self.resolution_path,
            512,
        )?;
        if self.resolution_depth == 0 || self.resolution_depth > 5 {
            return Err(ContractViolation::InvalidValue {
                field: "territory_resolution.resolution_depth",
                reason: "must be within 1..=5",
            });
        }
        Ok(())
    }
}

/// Outcome of checking a territory against a sub-vertical. Incompatibility is
/// reported, never thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryValidation {
    pub is_valid: bool,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_terr_01_global_requires_global_coverage_and_no_parent() {
        let bad = TerritoryRecord::v1(
            TerritorySlug::new("global").unwrap(),
            "Global".to_string(),
            None,
            TerritoryLevel::Global,
            CoverageType::Single,
            None,
            true,
        );
        assert!(bad.is_err());

        let ok = TerritoryRecord::v1(
            TerritorySlug::new("global").unwrap(),
            "Global".to_string(),
            None,
            TerritoryLevel::Global,
            CoverageType::Global,
            None,
            true,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn at_terr_02_country_rejects_global_coverage() {
        let bad = TerritoryRecord::v1(
            TerritorySlug::new("uae").unwrap(),
            "United Arab Emirates".to_string(),
            Some("AE".to_string()),
            TerritoryLevel::Country,
            CoverageType::Global,
            Some(TerritorySlug::new("global").unwrap()),
            true,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn at_terr_03_country_code_must_be_uppercase() {
        let bad = TerritoryRecord::v1(
            TerritorySlug::new("uae").unwrap(),
            "United Arab Emirates".to_string(),
            Some("ae".to_string()),
            TerritoryLevel::Country,
            CoverageType::Single,
            Some(TerritorySlug::new("global").unwrap()),
            true,
        );
        assert!(bad.is_err());
    }
}
