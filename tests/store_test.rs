//! Tests for the link store and the resolver
//!
//! These bypass HTTP and check the storage invariants directly.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use clipsnip::database::init_db;
use clipsnip::error::AppError;
use clipsnip::model::NewLink;
use clipsnip::store::{LinkStore, OwnerStats};

fn setup_store() -> (LinkStore, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");
    (LinkStore::new(Arc::new(db)), temp_db)
}

fn new_link(owner: &str, slug: Option<&str>) -> NewLink {
    NewLink {
        owner_id: owner.to_string(),
        long_url: "https://example.com".to_string(),
        description: None,
        slug: slug.map(str::to_string),
        enabled: true,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

#[test]
fn test_create_then_find_returns_same_record() {
    let (store, _temp_db) = setup_store();

    let created = store.create(new_link("alice", None)).unwrap();
    assert_eq!(created.short_slug.len(), 6);
    assert_eq!(created.total_visit_count, 1);
    assert!(!created.disabled);
    assert!(created.visit_count_by_country.is_empty());

    let found = store.find(&created.short_slug).unwrap().unwrap();
    assert_eq!(found, created);
}

#[test]
fn test_ids_are_sequential() {
    let (store, _temp_db) = setup_store();

    let first = store.create(new_link("alice", Some("one"))).unwrap();
    let second = store.create(new_link("bob", Some("two"))).unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
}

#[test]
fn test_created_disabled_when_not_enabled() {
    let (store, _temp_db) = setup_store();

    let mut link = new_link("alice", Some("off"));
    link.enabled = false;
    let created = store.create(link).unwrap();
    assert!(created.disabled);
}

#[test]
fn test_requested_slug_must_be_unique() {
    let (store, _temp_db) = setup_store();

    store.create(new_link("alice", Some("taken"))).unwrap();
    let err = store.create(new_link("bob", Some("taken"))).unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The failed creation must not consume an id or add an owner entry
    let next = store.create(new_link("bob", Some("free"))).unwrap();
    assert_eq!(next.id, 2);
    assert_eq!(store.owner_stats("bob").unwrap().links, 1);
}

#[test]
fn test_generated_slugs_are_unique() {
    let (store, _temp_db) = setup_store();

    let slugs: HashSet<String> = (0..200)
        .map(|_| store.create(new_link("alice", None)).unwrap().short_slug)
        .collect();
    assert_eq!(slugs.len(), 200);
    assert_eq!(store.count_all().unwrap(), 200);
}

#[test]
fn test_resolve_increments_every_counter_once() {
    let (store, _temp_db) = setup_store();
    store.create(new_link("alice", Some("visit"))).unwrap();

    let record = store.resolve("visit", "US", day(19)).unwrap();
    assert_eq!(record.total_visit_count, 2);
    assert_eq!(record.visit_count_by_country.get("US"), Some(&1));
    assert_eq!(record.visit_count_by_date.get("2026-10-19"), Some(&1));

    store.resolve("visit", "US", day(20)).unwrap();
    let record = store.resolve("visit", "FR", day(20)).unwrap();
    assert_eq!(record.total_visit_count, 4);
    assert_eq!(record.visit_count_by_country.get("US"), Some(&2));
    assert_eq!(record.visit_count_by_country.get("FR"), Some(&1));
    assert_eq!(record.visit_count_by_date.get("2026-10-19"), Some(&1));
    assert_eq!(record.visit_count_by_date.get("2026-10-20"), Some(&2));

    // Persisted, not just returned
    assert_eq!(store.find("visit").unwrap().unwrap(), record);
}

#[test]
fn test_resolve_disabled_leaves_counters() {
    let (store, _temp_db) = setup_store();
    store.create(new_link("alice", Some("paused"))).unwrap();
    store.resolve("paused", "US", day(19)).unwrap();

    let before = store.toggle_disabled("alice", "paused").unwrap().unwrap();
    assert!(before.disabled);

    let after = store.resolve("paused", "US", day(19)).unwrap();
    assert!(after.disabled);
    assert_eq!(after, before);
    assert_eq!(after.total_visit_count, 2);
}

#[test]
fn test_resolve_unknown_slug() {
    let (store, _temp_db) = setup_store();

    let err = store.resolve("never-created", "US", day(19)).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = store.resolve("", "US", day(19)).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn test_toggle_twice_restores_state() {
    let (store, _temp_db) = setup_store();
    let created = store.create(new_link("alice", Some("flip"))).unwrap();

    store.toggle_disabled("alice", "flip").unwrap();
    let restored = store.toggle_disabled("alice", "flip").unwrap().unwrap();
    assert_eq!(restored.disabled, created.disabled);
}

#[test]
fn test_toggle_ignores_missing_and_foreign_links() {
    let (store, _temp_db) = setup_store();
    store.create(new_link("alice", Some("mine"))).unwrap();

    assert!(store.toggle_disabled("alice", "missing").unwrap().is_none());
    assert!(store.toggle_disabled("mallory", "mine").unwrap().is_none());
    assert!(!store.find("mine").unwrap().unwrap().disabled);
}

#[test]
fn test_owner_listing_and_stats() {
    let (store, _temp_db) = setup_store();

    for slug in ["a1", "a2", "a3"] {
        store.create(new_link("alice", Some(slug))).unwrap();
    }
    store.create(new_link("bob", Some("b1"))).unwrap();

    store.resolve("a1", "US", day(19)).unwrap();
    store.resolve("a1", "US", day(19)).unwrap();
    store.resolve("a3", "DE", day(19)).unwrap();
    store.resolve("b1", "DE", day(19)).unwrap();

    let slugs: Vec<String> = store
        .list_for_owner("alice", 0, 10)
        .unwrap()
        .into_iter()
        .map(|r| r.short_slug)
        .collect();
    assert_eq!(slugs, ["a1", "a2", "a3"]);

    let page: Vec<String> = store
        .list_for_owner("alice", 1, 1)
        .unwrap()
        .into_iter()
        .map(|r| r.short_slug)
        .collect();
    assert_eq!(page, ["a2"]);

    assert_eq!(
        store.owner_stats("alice").unwrap(),
        OwnerStats { links: 3, visits: 3 }
    );
    assert_eq!(
        store.owner_stats("bob").unwrap(),
        OwnerStats { links: 1, visits: 1 }
    );
    assert_eq!(store.owner_stats("nobody").unwrap(), OwnerStats::default());
    assert_eq!(store.count_all().unwrap(), 4);
}

#[test]
fn test_owner_ids_sharing_a_prefix_stay_separate() {
    let (store, _temp_db) = setup_store();

    store.create(new_link("user", Some("u1"))).unwrap();
    store.create(new_link("user:2", Some("u2"))).unwrap();

    assert_eq!(store.list_for_owner("user", 0, 10).unwrap().len(), 1);
    assert_eq!(store.list_for_owner("user:2", 0, 10).unwrap().len(), 1);
}

#[test]
fn test_concurrent_visits_are_not_lost() {
    let (store, _temp_db) = setup_store();
    store.create(new_link("alice", Some("busy"))).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    store.resolve("busy", "US", day(19)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let record = store.find("busy").unwrap().unwrap();
    assert_eq!(record.total_visit_count, 201);
    assert_eq!(record.visit_count_by_country.get("US"), Some(&200));
    assert_eq!(record.visit_count_by_date.get("2026-10-19"), Some(&200));
}
