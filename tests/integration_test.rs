//! End-to-end tests for the contacts surface.
//!
//! Exercises the full flow: AppState → validation → store → change listener

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use contactbridge_lib::mocks::{FailingContactStore, ScriptedAuthorization};
use contactbridge_lib::traits::StoreError;
use contactbridge_lib::{
    AppState, AuthorizationStatus, ContactStoreClient, ListenerEvent, ListenerState,
};

fn authorized_state() -> (AppState, contactbridge_lib::mocks::InMemoryContactStore) {
    AppState::in_memory(ScriptedAuthorization::fixed(AuthorizationStatus::Authorized)).unwrap()
}

fn counter(state: &AppState, once: bool) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = Arc::clone(&count);
    let handler = Arc::new(move || {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });
    if once {
        state.listener().once(ListenerEvent::ContactChanged, handler);
    } else {
        state.listener().on(ListenerEvent::ContactChanged, handler);
    }
    count
}

#[test]
fn test_add_and_find_by_full_name() {
    let (state, _store) = authorized_state();

    assert!(state
        .add_new_contact(&json!({"firstName": "Grapeseed", "lastName": "Oil"}))
        .unwrap());
    assert!(state
        .add_new_contact(&json!({
            "firstName": "Sherlock",
            "lastName": "Holmes",
            "phoneNumbers": ["+44 20 7224 3688"],
            "emailAddresses": ["sherlock@bakerstreet.example"],
            "birthday": "1854-01-06",
        }))
        .unwrap());

    let found = state.get_contacts_by_name(&json!("Sherlock Holmes"), None).unwrap();
    assert!(!found.is_empty());
    assert_eq!(found[0].first_name.as_deref(), Some("Sherlock"));
    assert_eq!(found[0].phone_numbers, vec!["+44 20 7224 3688".to_string()]);
    assert!(found[0].identifier.is_some());

    let all = state.get_all_contacts(None).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_add_full_contact_payload() {
    let (state, store) = authorized_state();

    assert!(state
        .add_new_contact(&json!({
            "firstName": "William",
            "lastName": "Grapeseed",
            "nickname": "Billy",
            "birthday": "1990-09-09",
            "phoneNumbers": ["+1234567890"],
            "emailAddresses": ["billy@grapeseed.com"],
        }))
        .unwrap());

    let stored = store.snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].nickname.as_deref(), Some("Billy"));
    assert_eq!(stored[0].birthday.as_deref(), Some("1990-09-09"));
    assert_eq!(stored[0].email_addresses, vec!["billy@grapeseed.com".to_string()]);
}

#[test]
fn test_extra_properties_projection() {
    let (state, _store) = authorized_state();
    state
        .add_new_contact(&json!({
            "firstName": "John",
            "lastName": "Watson",
            "jobTitle": "Doctor",
            "note": "Army surgeon",
        }))
        .unwrap();

    let plain = state.get_all_contacts(None).unwrap();
    assert!(plain[0].job_title.is_none());
    assert!(plain[0].note.is_none());

    let extended = state.get_all_contacts(Some(&json!(["jobTitle"]))).unwrap();
    assert_eq!(extended[0].job_title, Some(json!("Doctor")));
    assert!(extended[0].note.is_none());
}

#[test]
fn test_update_then_delete_by_identifier() {
    let (state, store) = authorized_state();
    state
        .add_new_contact(&json!({"firstName": "Irene", "lastName": "Adler"}))
        .unwrap();
    let identifier = store.snapshot()[0].identifier.clone().unwrap();

    assert!(state
        .update_contact(&json!({"identifier": identifier, "nickname": "The Woman"}))
        .unwrap());
    let updated = state.get_contacts_by_name(&json!("Woman"), None).unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].last_name.as_deref(), Some("Adler"));

    assert!(state.delete_contact(&json!({"identifier": identifier})).unwrap());
    assert!(state.get_all_contacts(None).unwrap().is_empty());
}

#[test]
fn test_validation_messages_reach_caller() {
    let (state, store) = authorized_state();

    let message = |r: Result<bool, contactbridge_lib::ContactsError>| r.unwrap_err().to_string();

    assert_eq!(message(state.add_new_contact(&json!({}))), "contact must be a non-empty object");
    assert_eq!(
        message(state.add_new_contact(&json!({"firstName": 42}))),
        "firstName must be a string"
    );
    assert_eq!(
        message(state.add_new_contact(&json!({"birthday": "06/01/1854"}))),
        "birthday must use YYYY-MM-DD format"
    );
    assert_eq!(
        message(state.update_contact(&json!({"phoneNumbers": "555"}))),
        "phoneNumbers must be an array"
    );
    assert_eq!(message(state.delete_contact(&json!("Holmes"))), "selector must be an object");
    assert_eq!(message(state.delete_contact(&json!({}))), "name or identifier must be provided");

    let err = state.get_all_contacts(Some(&json!("jobTitle"))).unwrap_err();
    assert_eq!(err.to_string(), "extraProperties must be an array");
    let err = state.get_all_contacts(Some(&json!(["shoeSize"]))).unwrap_err();
    assert!(err.is_validation());
    assert!(err
        .to_string()
        .starts_with("properties in extraProperties must be one of jobTitle"));

    let err = state.get_contacts_by_name(&json!(1), None).unwrap_err();
    assert_eq!(err.to_string(), "name must be a string");

    // Nothing invalid reached the store
    assert_eq!(store.write_count(), 0);
}

#[test]
fn test_store_errors_are_not_validation_errors() {
    let (state, _store) = authorized_state();
    let err = state
        .update_contact(&json!({"identifier": "missing", "firstName": "Mycroft"}))
        .unwrap_err();
    assert!(!err.is_validation());
}

#[test]
fn test_store_failures_surface_unchanged() {
    let client = ContactStoreClient::new(Arc::new(FailingContactStore::new(
        StoreError::StorageError("disk full".to_string()),
    )));

    let err = client.get_all_contacts(None).unwrap_err();
    assert!(!err.is_validation());
    assert_eq!(err.to_string(), "Storage error: disk full");

    // Validation still runs first
    let err = client.add_new_contact(&json!({})).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_listener_lifecycle() {
    let (state, store) = authorized_state();
    let listener = state.listener();

    assert_eq!(
        listener.remove().unwrap_err().to_string(),
        "No observers are currently observing for contact changes."
    );

    listener.setup().unwrap();
    assert_eq!(listener.state(), ListenerState::Active);
    assert_eq!(store.subscriber_count(), 1);
    assert_eq!(
        listener.setup().unwrap_err().to_string(),
        "An observer is already observing for contact changes."
    );

    listener.remove().unwrap();
    assert_eq!(listener.state(), ListenerState::Idle);
    assert_eq!(store.subscriber_count(), 0);

    // Listening can start again after removal
    listener.setup().unwrap();
    listener.remove().unwrap();
}

#[test]
fn test_change_events_follow_mutations() {
    let (state, _store) = authorized_state();
    let every = counter(&state, false);
    let first_only = counter(&state, true);

    state
        .add_new_contact(&json!({"firstName": "Before", "lastName": "Setup"}))
        .unwrap();
    assert_eq!(every.load(Ordering::SeqCst), 0);

    state.listener().setup().unwrap();
    state
        .add_new_contact(&json!({"firstName": "Mycroft", "lastName": "Holmes"}))
        .unwrap();
    state.delete_contact(&json!({"name": "Mycroft"})).unwrap();

    assert_eq!(every.load(Ordering::SeqCst), 2);
    assert_eq!(first_only.load(Ordering::SeqCst), 1);
    assert_eq!(state.listener().handler_count(ListenerEvent::ContactChanged), 1);

    state.listener().remove().unwrap();
    state
        .add_new_contact(&json!({"firstName": "After", "lastName": "Remove"}))
        .unwrap();
    assert_eq!(every.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_request_access_prompts_once() {
    let authorization = ScriptedAuthorization::prompting(AuthorizationStatus::Authorized);
    let (state, _store) = AppState::in_memory(authorization.clone()).unwrap();

    assert_eq!(state.get_auth_status(), AuthorizationStatus::NotDetermined);
    assert_eq!(state.request_access().await, AuthorizationStatus::Authorized);
    assert_eq!(state.request_access().await, AuthorizationStatus::Authorized);
    assert_eq!(state.get_auth_status(), AuthorizationStatus::Authorized);
    assert_eq!(authorization.prompt_count(), 1);
}

#[tokio::test]
async fn test_denied_status_is_stable() {
    let authorization = ScriptedAuthorization::fixed(AuthorizationStatus::Denied);
    let (state, _store) = AppState::in_memory(authorization.clone()).unwrap();

    for _ in 0..3 {
        assert_eq!(state.get_auth_status(), AuthorizationStatus::Denied);
    }
    assert_eq!(state.request_access().await, AuthorizationStatus::Denied);
    assert_eq!(authorization.prompt_count(), 0);
}

#[test]
fn test_sqlite_backed_state_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (state, authorization) = AppState::new_production(dir.path()).unwrap();
        authorization.respond(AuthorizationStatus::Limited).unwrap();
        state
            .add_new_contact(&json!({"firstName": "Mrs", "lastName": "Hudson"}))
            .unwrap();
    }

    let (state, _) = AppState::new_production(dir.path()).unwrap();
    assert_eq!(state.get_auth_status(), AuthorizationStatus::Limited);
    let found = state.get_contacts_by_name(&json!("hudson"), None).unwrap();
    assert_eq!(found.len(), 1);
}
