//! The external-collaborator interface the coordinator drives: a concrete
//! notifier (collection-, object-, or result-set-backed) attaches to a read
//! transaction, consumes the per-version change info the coordinator
//! gathers, and hands its computed state back to its home scheduler.
//!
//! Only the trait is in scope here; concrete notifier bodies belong to the
//! accessor/binding layer this core does not cover.

use std::any::Any;

use crate::storage::TransactionChangeInfo;
use crate::version::VersionId;

/// A thread-portable snapshot of a notifier's computed state, produced by
/// `prepare_handover` on the background worker and consumed by `deliver`
/// on the observer's scheduler.
pub type HandoverPayload = Box<dyn Any + Send>;

/// Per-observable unit of change tracking registered with the coordinator.
/// Tagged-variant dispatch (one `Notifier` impl per concrete notifier kind)
/// is preferred over deep inheritance, per the component design.
pub trait Notifier: Send {
    /// The version at which this notifier currently holds data.
    fn version(&self) -> VersionId;

    /// False once the notifier's last external (observer-side) reference
    /// has been dropped; the coordinator drops and releases such notifiers
    /// on its next run.
    fn is_alive(&self) -> bool;

    /// Whether this notifier belongs to the open database handle
    /// identified by `handle_id`.
    fn is_for_handle(&self, handle_id: u64) -> bool;

    /// Whether this notifier observes the named object type.
    fn is_for_object_type(&self, object_type: &str) -> bool;

    /// Binds the notifier to a specific read transaction version owned by
    /// the coordinator; called once before the first `run`.
    fn attach_to(&mut self, version: VersionId);

    /// Registers the tables/lists this notifier needs observed in the
    /// `TransactionChangeInfo` the coordinator is assembling for the
    /// window ending at this notifier's target version.
    fn add_required_change_info(&self, info: &mut TransactionChangeInfo);

    /// Computes this notifier's change-set from `info`, the change record
    /// gathered for its advancement window (restricted to whatever this
    /// notifier asked for via `add_required_change_info`). Runs on the
    /// background worker, without the notifier lock held.
    fn run(&mut self, info: &TransactionChangeInfo);

    /// Snapshots the state computed by `run` into a thread-portable form.
    /// Called on the background worker while the notifier lock is held.
    fn prepare_handover(&mut self) -> HandoverPayload;

    /// Installs a handed-over payload on the observer thread, with a read
    /// transaction already positioned at the handed-over version.
    fn deliver(&mut self, payload: HandoverPayload);

    /// Drops all data derived from the storage engine. Called before the
    /// coordinator relinquishes the read transaction backing this
    /// notifier, and whenever the notifier is found to be `!is_alive`.
    fn release_data(&mut self);
}
