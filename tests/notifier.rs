mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::FakeStorage;
use watchdb::config::DbConfig;
use watchdb::coordinator::Coordinator;
use watchdb::notifier::{HandoverPayload, Notifier};
use watchdb::object_change_set::ObjKey;
use watchdb::storage::TransactionChangeInfo;
use watchdb::version::VersionId;

/// A test-double notifier: counts how many rows it observed inserted into
/// `table` and how many times the coordinator ran it, standing in for a
/// concrete collection/object/result-set notifier.
struct CountingNotifier {
    table: &'static str,
    version: VersionId,
    run_count: Arc<AtomicUsize>,
    seen_insertions: Arc<AtomicUsize>,
}

impl Notifier for CountingNotifier {
    fn version(&self) -> VersionId {
        self.version
    }

    fn is_alive(&self) -> bool {
        true
    }

    fn is_for_handle(&self, _handle_id: u64) -> bool {
        false
    }

    fn is_for_object_type(&self, object_type: &str) -> bool {
        object_type == self.table
    }

    fn attach_to(&mut self, version: VersionId) {
        self.version = version;
    }

    fn add_required_change_info(&self, _info: &mut TransactionChangeInfo) {}

    fn run(&mut self, info: &TransactionChangeInfo) {
        self.run_count.fetch_add(1, Ordering::SeqCst);
        if let Some(table) = info.table(self.table) {
            let count = (0..10).filter(|&id| table.insertions_contains(ObjKey(id))).count();
            self.seen_insertions.fetch_add(count, Ordering::SeqCst);
        }
    }

    fn prepare_handover(&mut self) -> HandoverPayload {
        Box::new(())
    }

    fn deliver(&mut self, _payload: HandoverPayload) {}

    fn release_data(&mut self) {}
}

#[test]
fn a_registered_notifier_catches_up_from_its_registration_version_to_head() {
    let storage = Arc::new(FakeStorage::new());
    storage.commit("people", ObjKey(1));
    storage.commit("people", ObjKey(2));

    let mut config = DbConfig::new("/tmp/watchdb-notifier-test.realm");
    config.automatic_change_notifications = false;
    let coordinator = Coordinator::open_database(config, storage.clone()).unwrap();

    let run_count = Arc::new(AtomicUsize::new(0));
    let seen_insertions = Arc::new(AtomicUsize::new(0));
    let notifier = CountingNotifier {
        table: "people",
        version: VersionId::new(0, 0),
        run_count: run_count.clone(),
        seen_insertions: seen_insertions.clone(),
    };
    coordinator.register_notifier(Box::new(notifier)).unwrap();

    coordinator.process_available_async();

    assert_eq!(run_count.load(Ordering::SeqCst), 1);
    assert_eq!(seen_insertions.load(Ordering::SeqCst), 2);
}
