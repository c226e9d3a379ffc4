#![forbid(unsafe_code)]

use meridian_contracts::codes::AuthorityCode;
use meridian_contracts::ids::{SubVertical, TerritorySlug};
use meridian_contracts::territory::{
    CoverageType, TerritoryRecord, TerritoryResolution, TerritoryValidation,
};
use meridian_contracts::ContractViolation;
use meridian_storage::repo::TerritoryRepo;

/// Sub-verticals that may only operate inside a single-coverage territory
/// (regulatory carve-outs are licensed per country, not per region block).
const SINGLE_COVERAGE_SUB_VERTICALS: &[&str] = &["employee_banking", "sme_lending"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerritoryResolverConfig {
    pub max_identifier_len: usize,
}

impl TerritoryResolverConfig {
    pub fn mvp_v1() -> Self {
        Self {
            max_identifier_len: 96,
        }
    }
}

/// Resolves a free-form region identifier to a configured territory.
///
/// The lookup order is fixed: EXACT slug, then country code, then normalized
/// slug, then case-insensitive name, then the global fallback. Every step is
/// recorded in the resolution path, misses included, so an operator can see
/// why an identifier landed where it did. Resolution is total as long as the
/// global territory row exists.
#[derive(Debug, Clone)]
pub struct TerritoryResolver {
    config: TerritoryResolverConfig,
}

impl TerritoryResolver {
    pub fn new(config: TerritoryResolverConfig) -> Self {
        Self { config }
    }

    pub fn resolve<S>(
        &self,
        store: &S,
        region_ident: &str,
    ) -> Result<TerritoryResolution, AuthorityCode>
    where
        S: TerritoryRepo,
    {
        let trimmed = region_ident.trim();
        let bounded: String = trimmed.chars().take(self.config.max_identifier_len).collect();
        let mut path: Vec<String> = Vec::new();

        // EXACT: the identifier used verbatim as a slug.
        if let Ok(slug) = TerritorySlug::new(&bounded) {
            if let Some(found) = store.territory_row(&slug) {
                path.push(format!("EXACT({})", found.slug.as_str()));
                return finish(found.clone(), path);
            }
        }
        path.push("EXACT(none)".to_string());

        // COUNTRY: uppercase ISO country code.
        let upper = bounded.to_ascii_uppercase();
        if let Some(found) = store.territory_row_by_country(&upper) {
            path.push(format!("COUNTRY({})", found.slug.as_str()));
            return finish(found.clone(), path);
        }
        path.push("COUNTRY(none)".to_string());

        // SLUG: lowercased, spaces and dashes folded to underscores.
        let normalized: String = bounded
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        if let Ok(slug) = TerritorySlug::new(&normalized) {
            if let Some(found) = store.territory_row(&slug) {
                path.push(format!("SLUG({})", found.slug.as_str()));
                return finish(found.clone(), path);
            }
        }
        path.push("SLUG(none)".to_string());

        // NAME: display-name match, case-insensitive.
        if let Some(found) = store.territory_row_by_name(trimmed) {
            path.push(format!("NAME({})", found.slug.as_str()));
            return finish(found.clone(), path);
        }
        path.push("NAME(none)".to_string());

        let global = store
            .global_territory_row()
            .ok_or(AuthorityCode::TerritoryNotConfigured)?;
        path.push("GLOBAL".to_string());
        finish(global.clone(), path)
    }

    /// Checks whether a resolved territory may serve a sub-vertical. Always
    /// reports; never errors.
    pub fn validate_for_sub_vertical(
        &self,
        territory: &TerritoryRecord,
        sub_vertical: &SubVertical,
    ) -> TerritoryValidation {
        if !territory.active {
            return TerritoryValidation {
                is_valid: false,
                reason: AuthorityCode::TerritoryNotConfigured.as_str().to_string(),
            };
        }
        if SINGLE_COVERAGE_SUB_VERTICALS.contains(&sub_vertical.as_str())
            && territory.coverage_type == CoverageType::Multi
        {
            return TerritoryValidation {
                is_valid: false,
                reason: AuthorityCode::TerritoryInvalidForSubvertical
                    .as_str()
                    .to_string(),
            };
        }
        TerritoryValidation {
            is_valid: true,
            reason: "OK".to_string(),
        }
    }
}

fn finish(
    territory: TerritoryRecord,
    path: Vec<String>,
) -> Result<TerritoryResolution, AuthorityCode> {
    let depth = path.len() as u8;
    TerritoryResolution::v1(territory, path.join(" → "), depth)
        .map_err(|_: ContractViolation| AuthorityCode::TerritoryNotConfigured)
}
