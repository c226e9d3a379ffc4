#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use meridian_contracts::ids::{PersonaId, PolicyId, SubVertical};
use meridian_contracts::persona::{PersonaRecord, PersonaScope};
use meridian_contracts::policy::{CapabilityId, PolicyRecord, PolicyStatus};
use meridian_storage::{AuthorityStore, StorageError};

fn persona(id: &str) -> PersonaRecord {
    PersonaRecord::v1(
        PersonaId::new(id).unwrap(),
        "Global Employee Banking".to_string(),
        PersonaScope::Global,
        None,
        SubVertical::new("employee_banking").unwrap(),
        None,
        "score employee banking leads conservatively".to_string(),
        true,
    )
    .unwrap()
}

fn policy(persona_id: &str, version: u32, status: PolicyStatus) -> PolicyRecord {
    PolicyRecord::v1(
        PolicyId::new(&format!("pol_{persona_id}_v{version}")).unwrap(),
        PersonaId::new(persona_id).unwrap(),
        version,
        status,
        vec!["score_lead".to_string()],
        vec!["legal_advice".to_string()],
        CapabilityId::ordered().into_iter().collect::<BTreeSet<_>>(),
        1_000_000,
        2_000,
        "escalate_to_admin".to_string(),
        "automated_decision_notice".to_string(),
    )
    .unwrap()
}

#[test]
fn at_pp_db_01_second_active_policy_rejected_by_store() {
    let mut s = AuthorityStore::new_in_memory();
    s.insert_persona_row(persona("pers_banking")).unwrap();
    s.insert_policy_row(policy("pers_banking", 1, PolicyStatus::Active))
        .unwrap();

    let second = s.insert_policy_row(policy("pers_banking", 2, PolicyStatus::Active));
    assert!(matches!(
        second,
        Err(StorageError::UniqueActiveViolation { .. })
    ));
}

#[test]
fn at_pp_db_02_supersede_and_activate_retains_history() {
    let mut s = AuthorityStore::new_in_memory();
    s.insert_persona_row(persona("pers_banking")).unwrap();
    s.insert_policy_row(policy("pers_banking", 1, PolicyStatus::Active))
        .unwrap();
    s.supersede_and_activate_policy_row(policy("pers_banking", 2, PolicyStatus::Active))
        .unwrap();

    let persona_id = PersonaId::new("pers_banking").unwrap();
    let active = s.active_policy_row(&persona_id).unwrap().unwrap();
    assert_eq!(active.policy_version, 2);

    let history = s.policy_history_rows(&persona_id);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, PolicyStatus::Superseded);
}

#[test]
fn at_pp_db_03_policy_versions_strictly_increasing() {
    let mut s = AuthorityStore::new_in_memory();
    s.insert_persona_row(persona("pers_banking")).unwrap();
    s.insert_policy_row(policy("pers_banking", 3, PolicyStatus::Active))
        .unwrap();

    let stale = s.supersede_and_activate_policy_row(policy("pers_banking", 3, PolicyStatus::Active));
    assert!(matches!(stale, Err(StorageError::DuplicateKey { .. })));
}

#[test]
fn at_pp_db_04_persona_deactivated_never_deleted() {
    let mut s = AuthorityStore::new_in_memory();
    s.insert_persona_row(persona("pers_banking")).unwrap();

    let persona_id = PersonaId::new("pers_banking").unwrap();
    s.deactivate_persona_row(&persona_id).unwrap();

    let row = s.persona_row(&persona_id).unwrap();
    assert!(!row.active);
}

#[test]
fn at_pp_db_05_policy_requires_existing_persona() {
    let mut s = AuthorityStore::new_in_memory();
    let orphan = s.insert_policy_row(policy("pers_ghost", 1, PolicyStatus::Active));
    assert!(matches!(
        orphan,
        Err(StorageError::ForeignKeyViolation { .. })
    ));
}

#[test]
fn at_pp_db_06_no_active_policy_is_distinguishable() {
    let mut s = AuthorityStore::new_in_memory();
    s.insert_persona_row(persona("pers_banking")).unwrap();
    s.insert_policy_row(policy("pers_banking", 1, PolicyStatus::Superseded))
        .unwrap();

    let persona_id = PersonaId::new("pers_banking").unwrap();
    assert!(s.active_policy_row(&persona_id).unwrap().is_none());
}
