mod common;

use std::sync::Arc;

use common::FakeStorage;
use watchdb::config::DbConfig;
use watchdb::coordinator::Coordinator;
use watchdb::object_change_set::ObjKey;
use watchdb::storage::StorageEngine;

fn test_config() -> DbConfig {
    let mut config = DbConfig::new("/tmp/watchdb-coordinator-test.realm");
    config.automatic_change_notifications = false;
    config
}

#[test]
fn opening_a_database_reports_no_pending_async_error() {
    let storage = Arc::new(FakeStorage::new());
    storage.commit("people", ObjKey(1));
    let coordinator = Coordinator::open_database(test_config(), storage).unwrap();
    assert!(coordinator.async_error().is_none());
}

#[test]
fn process_available_async_is_a_no_op_with_no_registered_notifiers() {
    let storage = Arc::new(FakeStorage::new());
    let coordinator = Coordinator::open_database(test_config(), storage).unwrap();
    coordinator.process_available_async();
    assert!(coordinator.async_error().is_none());
}

#[test]
fn advance_read_accumulates_only_the_requested_window() {
    let storage = FakeStorage::new();
    let v1 = storage.commit("people", ObjKey(1));
    let v2 = storage.commit("people", ObjKey(2));
    let v3 = storage.commit("people", ObjKey(3));
    let info = storage.advance_read(v1, v3).unwrap();
    let people = info.table("people").unwrap();
    assert!(!people.insertions_contains(ObjKey(1)));
    assert!(people.insertions_contains(ObjKey(2)));
    assert!(people.insertions_contains(ObjKey(3)));
    let _ = v2;
}
