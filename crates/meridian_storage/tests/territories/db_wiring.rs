#![forbid(unsafe_code)]

use meridian_contracts::ids::TerritorySlug;
use meridian_contracts::territory::{CoverageType, TerritoryLevel, TerritoryRecord};
use meridian_storage::{AuthorityStore, StorageError};

fn global() -> TerritoryRecord {
    TerritoryRecord::v1(
        TerritorySlug::new("global").unwrap(),
        "Global".to_string(),
        None,
        TerritoryLevel::Global,
        CoverageType::Global,
        None,
        true,
    )
    .unwrap()
}

fn country(slug: &str, name: &str, code: &str) -> TerritoryRecord {
    TerritoryRecord::v1(
        TerritorySlug::new(slug).unwrap(),
        name.to_string(),
        Some(code.to_string()),
        TerritoryLevel::Country,
        CoverageType::Single,
        Some(TerritorySlug::new("global").unwrap()),
        true,
    )
    .unwrap()
}

#[test]
fn at_terr_db_01_exactly_one_global_territory() {
    let mut s = AuthorityStore::new_in_memory();
    s.insert_territory_row(global()).unwrap();

    let second = TerritoryRecord::v1(
        TerritorySlug::new("global_2").unwrap(),
        "Global Two".to_string(),
        None,
        TerritoryLevel::Global,
        CoverageType::Global,
        None,
        true,
    )
    .unwrap();
    assert!(matches!(
        s.insert_territory_row(second),
        Err(StorageError::DuplicateKey { .. })
    ));
}

#[test]
fn at_terr_db_02_parent_must_exist() {
    let mut s = AuthorityStore::new_in_memory();
    let orphan = country("uae", "United Arab Emirates", "AE");
    assert!(matches!(
        s.insert_territory_row(orphan),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
}

#[test]
fn at_terr_db_03_lookup_by_country_code_and_name() {
    let mut s = AuthorityStore::new_in_memory();
    s.insert_territory_row(global()).unwrap();
    s.insert_territory_row(country("uae", "United Arab Emirates", "AE"))
        .unwrap();

    assert_eq!(
        s.territory_row_by_country("AE").unwrap().slug.as_str(),
        "uae"
    );
    assert_eq!(
        s.territory_row_by_name("united arab emirates")
            .unwrap()
            .slug
            .as_str(),
        "uae"
    );
    assert!(s.territory_row_by_country("ZZ").is_none());
}

#[test]
fn at_terr_db_04_global_fallback_row_is_reachable() {
    let mut s = AuthorityStore::new_in_memory();
    assert!(s.global_territory_row().is_none());
    s.insert_territory_row(global()).unwrap();
    assert_eq!(s.global_territory_row().unwrap().slug.as_str(), "global");
}
