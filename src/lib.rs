//! Change tracking and notification core for an embedded, transactional
//! object store: the primitives a collection/object/result-set notifier
//! needs to compute a minimal diff between two row-orderings, fold a
//! succession of such diffs into one cumulative description, and have that
//! description delivered to an observer thread at the right version.
//!
//! What lives here: [`index_set`]'s position algebra, [`change_set`]'s
//! accumulating builder and its finalized output, [`object_change_set`]'s
//! per-key accumulation, [`diff`]'s row-sequence comparison, the
//! [`notifier`] trait external collaborators implement, the [`storage`]
//! seam this crate consumes from the underlying engine, and the
//! [`coordinator`] that ties all of the above into a per-file background
//! pipeline.
//!
//! Accessor bindings, query evaluation, and the storage engine itself are
//! out of scope; see each module's own documentation for its exact
//! boundary.

pub mod change_set;
pub mod config;
pub mod coordinator;
pub mod diff;
pub mod error;
pub mod index_set;
pub mod notifier;
pub mod object_change_set;
pub mod storage;
pub mod version;

pub use change_set::{ChangeSet, ChangeSetBuilder, ColKey, Move};
pub use config::{DbConfig, SchemaMode};
pub use coordinator::{Coordinator, CoordinatorRegistry};
pub use error::{Error, Result};
pub use index_set::IndexSet;
pub use notifier::{HandoverPayload, Notifier};
pub use object_change_set::{ObjKey, ObjectChangeSet};
pub use storage::{StorageEngine, TransactionChangeInfo};
pub use version::VersionId;
