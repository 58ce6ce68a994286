use super::*;
use crate::state::test_helpers::{FailingStore, identity, test_clock};
use crate::store::MemoryStore;
use time::Duration;

fn gate() -> (ProfileGate, Arc<MemoryStore>, Arc<crate::clock::ManualClock>) {
    let clock = test_clock();
    let store = Arc::new(MemoryStore::new(clock.clone()));
    (ProfileGate::new(store.clone(), clock.clone()), store, clock)
}

// =============================================================================
// register_new
// =============================================================================

#[tokio::test]
async fn register_new_creates_defaults() {
    let (gate, _, _) = gate();
    gate.register_new(&identity("u2", Some("a@b.com"))).await.unwrap();

    let profile = gate.get_profile("u2").await.unwrap().unwrap();
    assert_eq!(profile.uid, "u2");
    assert_eq!(profile.gmail, "a@b.com");
    assert!(!profile.is_admin);
    assert!(!profile.is_examiner);
    assert!(!profile.is_graduated);
    assert_eq!(profile.year, 2025);
    assert_eq!(profile.created_at, profile.updated_at);
    assert_eq!(profile.created_at, profile.last_login_at);
}

#[tokio::test]
async fn register_new_name_falls_back_to_email_local_part() {
    let (gate, _, _) = gate();
    let who = Identity { display_name: None, ..identity("u1", Some("hanako@example.com")) };
    gate.register_new(&who).await.unwrap();
    assert_eq!(gate.get_profile("u1").await.unwrap().unwrap().name, "hanako");
}

#[tokio::test]
async fn register_new_prefers_display_name() {
    let (gate, _, _) = gate();
    let who = Identity { display_name: Some("Hanako Y".into()), ..identity("u1", Some("h@example.com")) };
    gate.register_new(&who).await.unwrap();
    assert_eq!(gate.get_profile("u1").await.unwrap().unwrap().name, "Hanako Y");
}

#[test]
fn default_name_placeholder_when_nothing_usable() {
    let who = Identity { display_name: Some("  ".into()), ..identity("u1", Some("@example.com")) };
    assert_eq!(default_name(&who), "Unknown User");
}

#[tokio::test]
async fn register_new_twice_is_already_registered() {
    let (gate, store, clock) = gate();
    gate.register_new(&identity("u1", Some("a@b.com"))).await.unwrap();
    let before = store.get_document(USERS_COLLECTION, "u1").await.unwrap();

    clock.advance(Duration::minutes(5));
    let err = gate
        .register_new(&Identity { display_name: Some("Other".into()), ..identity("u1", Some("a@b.com")) })
        .await
        .unwrap_err();
    assert!(matches!(err, ProfileError::AlreadyRegistered));
    assert_eq!(store.get_document(USERS_COLLECTION, "u1").await.unwrap(), before);
}

#[tokio::test]
async fn register_new_requires_email() {
    let (gate, store, _) = gate();
    let err = gate.register_new(&identity("u1", None)).await.unwrap_err();
    assert!(matches!(err, ProfileError::Validation(_)));
    assert_eq!(store.count(USERS_COLLECTION).await, 0);
}

#[tokio::test]
async fn register_new_stores_photo_when_present() {
    let (gate, _, _) = gate();
    let who = Identity { photo_url: Some("https://img/p.png".into()), ..identity("u1", Some("a@b.com")) };
    gate.register_new(&who).await.unwrap();
    let profile = gate.get_profile("u1").await.unwrap().unwrap();
    assert_eq!(profile.photo_url.as_deref(), Some("https://img/p.png"));
}

// =============================================================================
// login_existing
// =============================================================================

#[tokio::test]
async fn login_existing_unknown_is_not_registered_without_write() {
    let (gate, store, _) = gate();
    let err = gate.login_existing(&identity("ghost", Some("g@b.com"))).await.unwrap_err();
    assert!(matches!(err, ProfileError::NotRegistered));
    assert_eq!(store.count(USERS_COLLECTION).await, 0);
}

#[tokio::test]
async fn login_existing_touches_only_login_timestamps() {
    let (gate, _, clock) = gate();
    gate.register_new(&identity("u1", Some("a@b.com"))).await.unwrap();
    let before = gate.get_profile("u1").await.unwrap().unwrap();

    clock.advance(Duration::hours(2));
    gate.login_existing(&identity("u1", Some("a@b.com"))).await.unwrap();
    let after = gate.get_profile("u1").await.unwrap().unwrap();

    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.last_login_at, before.last_login_at + Duration::hours(2));
    assert_eq!(after.updated_at, after.last_login_at);
    assert_eq!(after.name, before.name);
}

#[tokio::test]
async fn login_existing_requires_email() {
    let (gate, _, _) = gate();
    let err = gate.login_existing(&identity("u1", None)).await.unwrap_err();
    assert!(matches!(err, ProfileError::Validation(_)));
}

// =============================================================================
// store failures
// =============================================================================

#[tokio::test]
async fn check_exists_surfaces_store_errors() {
    let gate = ProfileGate::new(Arc::new(FailingStore), test_clock());
    assert!(matches!(gate.check_exists("u1").await, Err(ProfileError::Store(_))));
    assert!(matches!(gate.get_profile("u1").await, Err(ProfileError::Store(_))));
}

// =============================================================================
// update_profile
// =============================================================================

#[tokio::test]
async fn update_profile_patches_given_fields() {
    let (gate, _, clock) = gate();
    gate.register_new(&identity("u1", Some("a@b.com"))).await.unwrap();
    clock.advance(Duration::minutes(1));

    let update = ProfileUpdate { name: Some("  New Name ".into()), year: Some(2031), ..ProfileUpdate::default() };
    gate.update_profile("u1", update).await.unwrap();

    let profile = gate.get_profile("u1").await.unwrap().unwrap();
    assert_eq!(profile.name, "New Name");
    assert_eq!(profile.year, 2031);
    assert_eq!(profile.gmail, "a@b.com");
    assert_eq!(profile.updated_at, profile.created_at + Duration::minutes(1));
}

#[tokio::test]
async fn update_profile_rejects_blank_name_and_bad_year() {
    let (gate, _, _) = gate();
    gate.register_new(&identity("u1", Some("a@b.com"))).await.unwrap();

    let blank = ProfileUpdate { name: Some("   ".into()), ..ProfileUpdate::default() };
    assert!(matches!(gate.update_profile("u1", blank).await, Err(ProfileError::Validation(_))));

    let early = ProfileUpdate { year: Some(1999), ..ProfileUpdate::default() };
    assert!(matches!(gate.update_profile("u1", early).await, Err(ProfileError::Validation(_))));

    let late = ProfileUpdate { year: Some(2051), ..ProfileUpdate::default() };
    assert!(matches!(gate.update_profile("u1", late).await, Err(ProfileError::Validation(_))));
}

#[tokio::test]
async fn update_profile_missing_document_surfaces_not_found() {
    let (gate, _, _) = gate();
    let err = gate.update_profile("ghost", ProfileUpdate::default()).await.unwrap_err();
    assert!(matches!(err, ProfileError::Store(StoreError::NotFound { .. })));
}

#[test]
fn profile_update_deserializes_camel_case() {
    let update: ProfileUpdate = serde_json::from_str(r#"{"isGraduated":true,"photoURL":"x"}"#).unwrap();
    assert_eq!(update.is_graduated, Some(true));
    assert_eq!(update.photo_url.as_deref(), Some("x"));
    assert!(update.name.is_none());
}
