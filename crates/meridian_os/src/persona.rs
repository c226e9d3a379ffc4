#![forbid(unsafe_code)]

use meridian_contracts::codes::AuthorityCode;
use meridian_contracts::ids::{PersonaId, RegionCode, SubVertical};
use meridian_contracts::persona::{PersonaRecord, PersonaResolution, PersonaScope};
use meridian_contracts::policy::PolicyRecord;
use meridian_storage::repo::{PersonaRepo, PolicyRepo};
use meridian_storage::StorageError;

/// Region-group memberships for the REGIONAL resolution level. A country
/// with no entry here has no regional desk and the REGIONAL step records
/// `none`. Empty until regional desks are provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonaResolverConfig {
    pub region_groups: &'static [(&'static str, &'static str)],
}

impl PersonaResolverConfig {
    pub fn mvp_v1() -> Self {
        Self { region_groups: &[] }
    }
}

/// Resolves `(sub_vertical, region)` to the persona in authority.
///
/// Scope inheritance walks LOCAL(region) → REGIONAL(region group) → GLOBAL;
/// the first active persona wins and every level attempted lands in the
/// resolution path. Pure read over the persona table, deterministic for a
/// given store state.
#[derive(Debug, Clone)]
pub struct PersonaResolver {
    config: PersonaResolverConfig,
}

impl PersonaResolver {
    pub fn new(config: PersonaResolverConfig) -> Self {
        Self { config }
    }

    pub fn resolve<S>(
        &self,
        store: &S,
        sub_vertical: &SubVertical,
        region: Option<&RegionCode>,
    ) -> Result<PersonaResolution, AuthorityCode>
    where
        S: PersonaRepo,
    {
        let candidates = store.persona_rows_for(sub_vertical);
        if candidates.is_empty() {
            return Err(AuthorityCode::SubVerticalNotFound);
        }
        if !candidates.iter().any(|p| p.active) {
            return Err(AuthorityCode::SubVerticalInactive);
        }

        let mut path: Vec<String> = Vec::new();

        let local_label = region.map(|r| r.as_str().to_string());
        if let Some(found) = first_active_at(&candidates, PersonaScope::Local, local_label.as_deref())
        {
            path.push(format!("LOCAL({})", label_or_none(local_label.as_deref())));
            return build(found.clone(), PersonaScope::Local, path);
        }
        path.push(format!("LOCAL({})", label_or_none(local_label.as_deref())));

        let group_label = region.and_then(|r| self.region_group(r));
        if let Some(found) = first_active_at(&candidates, PersonaScope::Regional, group_label) {
            path.push(format!("REGIONAL({})", label_or_none(group_label)));
            return build(found.clone(), PersonaScope::Regional, path);
        }
        path.push(format!("REGIONAL({})", label_or_none(group_label)));

        if let Some(found) = first_active_at(&candidates, PersonaScope::Global, None) {
            path.push("GLOBAL".to_string());
            return build(found.clone(), PersonaScope::Global, path);
        }

        Err(AuthorityCode::PersonaNotResolved)
    }

    /// The single ACTIVE policy for a persona. No default policy exists:
    /// absence is a hard stop, and two ACTIVE rows is an integrity failure
    /// this layer reports and never repairs.
    pub fn active_policy<S>(
        &self,
        store: &S,
        persona_id: &PersonaId,
    ) -> Result<PolicyRecord, AuthorityCode>
    where
        S: PolicyRepo,
    {
        match store.active_policy_row(persona_id) {
            Ok(Some(policy)) => Ok(policy.clone()),
            Ok(None) => Err(AuthorityCode::PolicyNotFound),
            Err(StorageError::UniqueActiveViolation { .. }) => {
                Err(AuthorityCode::MultipleActivePolicies)
            }
            Err(_) => Err(AuthorityCode::PolicyNotFound),
        }
    }

    fn region_group(&self, region: &RegionCode) -> Option<&'static str> {
        self.config
            .region_groups
            .iter()
            .find(|(member, _)| *member == region.as_str())
            .map(|(_, group)| *group)
    }
}

/// Candidates arrive in persona-id order from the store; the first active
/// match at a level is therefore deterministic.
fn first_active_at<'a>(
    candidates: &[&'a PersonaRecord],
    scope: PersonaScope,
    region_label: Option<&str>,
) -> Option<&'a PersonaRecord> {
    candidates.iter().copied().find(|p| {
        p.active
            && p.scope == scope
            && match scope {
                PersonaScope::Global => true,
                PersonaScope::Local | PersonaScope::Regional => {
                    match (p.region.as_ref(), region_label) {
                        (Some(r), Some(label)) => r.as_str() == label,
                        _ => false,
                    }
                }
            }
    })
}

fn label_or_none(label: Option<&str>) -> &str {
    label.unwrap_or("none")
}

fn build(
    persona: PersonaRecord,
    scope: PersonaScope,
    path: Vec<String>,
) -> Result<PersonaResolution, AuthorityCode> {
    PersonaResolution::v1(persona, scope, path.join(" → "))
        .map_err(|_| AuthorityCode::PersonaNotResolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_storage::AuthorityStore;

    fn persona(
        id: &str,
        scope: PersonaScope,
        region: Option<&str>,
        active: bool,
    ) -> PersonaRecord {
        PersonaRecord::v1(
            PersonaId::new(id).unwrap(),
            format!("Persona {id}"),
            scope,
            None,
            SubVertical::new("employee_banking").unwrap(),
            region.map(|r| RegionCode::new(r).unwrap()),
            "score employee banking leads".to_string(),
            active,
        )
        .unwrap()
    }

    fn resolver() -> PersonaResolver {
        PersonaResolver::new(PersonaResolverConfig::mvp_v1())
    }

    #[test]
    fn at_pers_os_01_local_override_wins() {
        let mut store = AuthorityStore::new_in_memory();
        store
            .insert_persona_row(persona("pers_global", PersonaScope::Global, None, true))
            .unwrap();
        store
            .insert_persona_row(persona("pers_uae", PersonaScope::Local, Some("UAE"), true))
            .unwrap();

        let region = RegionCode::new("UAE").unwrap();
        let resolution = resolver()
            .resolve(
                &store,
                &SubVertical::new("employee_banking").unwrap(),
                Some(&region),
            )
            .unwrap();
        assert_eq!(resolution.resolution_scope, PersonaScope::Local);
        assert_eq!(resolution.persona.persona_id.as_str(), "pers_uae");
        assert_eq!(resolution.resolution_path, "LOCAL(UAE)");
    }

    #[test]
    fn at_pers_os_02_falls_through_to_global_with_full_path() {
        let mut store = AuthorityStore::new_in_memory();
        store
            .insert_persona_row(persona("pers_global", PersonaScope::Global, None, true))
            .unwrap();

        let region = RegionCode::new("UAE").unwrap();
        let resolution = resolver()
            .resolve(
                &store,
                &SubVertical::new("employee_banking").unwrap(),
                Some(&region),
            )
            .unwrap();
        assert_eq!(resolution.resolution_scope, PersonaScope::Global);
        assert_eq!(
            resolution.resolution_path,
            "LOCAL(UAE) → REGIONAL(none) → GLOBAL"
        );
    }

    #[test]
    fn at_pers_os_03_inactive_local_is_skipped() {
        let mut store = AuthorityStore::new_in_memory();
        store
            .insert_persona_row(persona("pers_global", PersonaScope::Global, None, true))
            .unwrap();
        store
            .insert_persona_row(persona("pers_uae", PersonaScope::Local, Some("UAE"), false))
            .unwrap();

        let region = RegionCode::new("UAE").unwrap();
        let resolution = resolver()
            .resolve(
                &store,
                &SubVertical::new("employee_banking").unwrap(),
                Some(&region),
            )
            .unwrap();
        assert_eq!(resolution.resolution_scope, PersonaScope::Global);
    }

    #[test]
    fn at_pers_os_04_unknown_sub_vertical_vs_all_inactive() {
        let mut store = AuthorityStore::new_in_memory();
        let unknown = resolver().resolve(
            &store,
            &SubVertical::new("employee_banking").unwrap(),
            None,
        );
        assert_eq!(unknown, Err(AuthorityCode::SubVerticalNotFound));

        store
            .insert_persona_row(persona("pers_global", PersonaScope::Global, None, false))
            .unwrap();
        let inactive = resolver().resolve(
            &store,
            &SubVertical::new("employee_banking").unwrap(),
            None,
        );
        assert_eq!(inactive, Err(AuthorityCode::SubVerticalInactive));
    }

    #[test]
    fn at_pers_os_05_active_policy_error_mapping() {
        use meridian_contracts::ids::PolicyId;
        use meridian_contracts::policy::{CapabilityId, PolicyStatus};

        let mut store = AuthorityStore::new_in_memory();
        store
            .insert_persona_row(persona("pers_global", PersonaScope::Global, None, true))
            .unwrap();

        let persona_id = PersonaId::new("pers_global").unwrap();
        assert_eq!(
            resolver().active_policy(&store, &persona_id),
            Err(AuthorityCode::PolicyNotFound)
        );

        let policy = PolicyRecord::v1(
            PolicyId::new("pol_global_v1").unwrap(),
            persona_id.clone(),
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
        .unwrap();
        store.insert_policy_row(policy).unwrap();

        let active = resolver().active_policy(&store, &persona_id).unwrap();
        assert_eq!(active.policy_version, 1);
    }
}
