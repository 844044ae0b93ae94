//! Per-database-file singleton that owns the background-notifier
//! lifecycle: pins and advances read versions for pending notifiers,
//! funnels transaction-log deltas into each one, applies "skip this
//! version" suppression requested by a committing thread, and hands
//! refreshed results back to the originating scheduler.

mod registry;
mod worker;

pub use registry::CoordinatorRegistry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, instrument, trace, warn};

use crate::config::DbConfig;
use crate::error::{Error, Result};
use crate::notifier::{HandoverPayload, Notifier};
use crate::storage::{StorageEngine, TransactionChangeInfo};
use crate::version::VersionId;

struct PendingNotifier {
    notifier: Box<dyn Notifier>,
    registered_at: VersionId,
}

/// A notifier attached to the coordinator's main read transaction, paired
/// with whatever handover payload its last `run` produced and is still
/// awaiting delivery on an observer thread.
struct TrackedNotifier {
    notifier: Box<dyn Notifier>,
    pending_handover: Option<HandoverPayload>,
}

#[derive(Default)]
struct State {
    new_notifiers: Vec<PendingNotifier>,
    notifiers: Vec<TrackedNotifier>,
    main_version: Option<VersionId>,
    skip_version: Option<VersionId>,
    async_error: Option<Arc<Error>>,
    /// Incremented on every completed `on_change` run, so waiters can tell
    /// a fresh run apart from a stale wakeup.
    run_count: u64,
}

/// Per-file singleton coordinating notifier advancement. Identified
/// uniquely by canonical file path; obtained through
/// [`CoordinatorRegistry::get_or_create`].
pub struct Coordinator {
    path: PathBuf,
    config: DbConfig,
    storage: Arc<dyn StorageEngine>,
    state: Mutex<State>,
    completion: Condvar,
    wake: worker::WakeHandle,
}

impl Coordinator {
    /// Opens the shared database handle with `config`, translating
    /// storage-engine failures into the file-open error taxonomy.
    #[instrument(level = "trace", skip(storage))]
    pub fn open_database(
        config: DbConfig,
        storage: Arc<dyn StorageEngine>,
    ) -> Result<Arc<Coordinator>> {
        storage.current_head().map_err(|e| {
            warn!(error = %e, "failed to open database handle");
            e
        })?;
        let coordinator = Arc::new(Coordinator {
            path: config.path.clone(),
            config,
            storage,
            state: Mutex::new(State::default()),
            completion: Condvar::new(),
            wake: worker::WakeHandle::new(),
        });
        if coordinator.config.automatic_change_notifications {
            worker::spawn(Arc::clone(&coordinator));
        }
        Ok(coordinator)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Adds `notifier` to `new_notifiers` and pins its registration
    /// version by opening (or reusing) a read transaction there.
    #[instrument(level = "trace", skip(self, notifier))]
    pub fn register_notifier(&self, notifier: Box<dyn Notifier>) -> Result<()> {
        let registered_at = self.storage.begin_read(Some(notifier.version()))?;
        let mut state = self.state.lock();
        state.new_notifiers.push(PendingNotifier { notifier, registered_at });
        drop(state);
        self.wake.notify();
        Ok(())
    }

    /// Called on a writer thread after the storage engine has advanced
    /// `handle`'s read transaction to `post_commit_version`. Records the
    /// skip-version suppression if any notifier belongs to this handle,
    /// then wakes the background worker.
    #[instrument(level = "trace", skip(self))]
    pub fn commit_write(&self, handle_id: u64, post_commit_version: VersionId) {
        let mut state = self.state.lock();
        let belongs = state
            .notifiers
            .iter()
            .any(|t| t.notifier.is_for_handle(handle_id))
            || state
                .new_notifiers
                .iter()
                .any(|p| p.notifier.is_for_handle(handle_id));
        if belongs {
            state.skip_version = Some(post_commit_version);
            trace!(version = post_commit_version.version, "skip_version set");
        }
        drop(state);
        self.wake.notify();
    }

    /// The background channel's entry point: advances every notifier to
    /// the current head and fires their callbacks. See the module-level
    /// algorithm description on
    /// [`run_async_notifiers`](Self::run_async_notifiers).
    pub fn on_change(&self) {
        self.drive(true);
    }

    /// Observer-side entry point used when `automatic_change_notifications`
    /// is disabled and nothing else calls [`on_change`](Self::on_change):
    /// onboards and runs any newly registered notifiers (which only need to
    /// catch up from their own registration version, not the coordinator's
    /// shared main read transaction) and delivers them, but never touches
    /// `main_version` or re-runs already-attached notifiers.
    pub fn process_available_async(&self) {
        self.drive(false);
    }

    fn drive(&self, advance_main_version: bool) {
        if let Err(e) = self.run_async_notifiers(advance_main_version) {
            warn!(error = %e, "async notifier run failed");
            let mut state = self.state.lock();
            let err = Arc::new(e);
            state.async_error = Some(Arc::clone(&err));
            // Promote new notifiers to existing so they receive the error
            // on the next delivery instead of being silently dropped.
            for pending in state.new_notifiers.drain(..) {
                state.notifiers.push(TrackedNotifier { notifier: pending.notifier, pending_handover: None });
            }
            self.completion.notify_all();
        }
    }

    #[instrument(level = "trace", skip(self))]
    fn run_async_notifiers(&self, advance_main_version: bool) -> Result<()> {
        // Step 1: lock, drop dead notifiers, early-exit if nothing to do.
        {
            let mut state = self.state.lock();
            state.notifiers.retain_mut(|t| {
                let alive = t.notifier.is_alive();
                if !alive {
                    debug!("dropping notifier: no longer alive");
                    t.notifier.release_data();
                }
                alive
            });
            state.new_notifiers.retain_mut(|p| {
                let alive = p.notifier.is_alive();
                if !alive {
                    p.notifier.release_data();
                }
                alive
            });
            if state.notifiers.is_empty() && state.new_notifiers.is_empty() {
                state.run_count += 1;
                self.completion.notify_all();
                return Ok(());
            }
        }

        // Step 2: ensure a main read transaction exists.
        {
            let mut state = self.state.lock();
            if state.main_version.is_none() {
                state.main_version = Some(self.storage.begin_read(None)?);
            }
        }

        // Step 3: handle new notifiers, advancing each incrementally from
        // its registration version to the current head. This does not
        // depend on `main_version` at all, so it always runs regardless of
        // `advance_main_version`.
        let mut new_notifiers: Vec<PendingNotifier> = {
            let mut state = self.state.lock();
            let mut taken = std::mem::take(&mut state.new_notifiers);
            taken.sort_by_key(|p| p.registered_at);
            taken
        };

        let mut cumulative_new_change_info = TransactionChangeInfo::new();
        if !new_notifiers.is_empty() {
            let mut cursor = new_notifiers[0].registered_at;
            for pending in &mut new_notifiers {
                if pending.registered_at != cursor {
                    let chunk = self.storage.advance_read(cursor, pending.registered_at)?;
                    cumulative_new_change_info.merge(chunk);
                    cursor = pending.registered_at;
                }
                pending.notifier.attach_to(pending.registered_at);
                pending.notifier.add_required_change_info(&mut cumulative_new_change_info);
            }
            let head = self.storage.current_head()?;
            if head != cursor {
                let chunk = self.storage.advance_read(cursor, head)?;
                cumulative_new_change_info.merge(chunk);
            }
        }

        let mut new_tracked: Vec<TrackedNotifier> = new_notifiers
            .into_iter()
            .map(|pending| {
                let mut notifier = pending.notifier;
                notifier.run(&cumulative_new_change_info);
                let pending_handover = Some(notifier.prepare_handover());
                TrackedNotifier { notifier, pending_handover }
            })
            .collect();

        if !advance_main_version {
            // Deliver the freshly-onboarded notifiers immediately: this is
            // the observer-thread call, and none of this work touched the
            // shared main read transaction.
            for t in &mut new_tracked {
                if let Some(payload) = t.pending_handover.take() {
                    t.notifier.deliver(payload);
                }
            }
            let mut state = self.state.lock();
            state.notifiers.append(&mut new_tracked);
            state.run_count += 1;
            self.completion.notify_all();
            return Ok(());
        }

        // Step 4: choose a target version.
        let head = self.storage.current_head()?;
        let main_version = self.state.lock().main_version.expect("set in step 2");
        if new_tracked.is_empty() && head == main_version {
            let mut state = self.state.lock();
            debug_assert!(state.skip_version.is_none() || state.skip_version == Some(head));
            state.skip_version = None;
            state.run_count += 1;
            self.completion.notify_all();
            return Ok(());
        }
        let target = head;

        // Step 5: snapshot skip_version and the notifier vector, then
        // release the lock before running anything.
        let (skip_version, mut running_notifiers) = {
            let mut state = self.state.lock();
            let skip = state.skip_version.take();
            let snapshot = std::mem::take(&mut state.notifiers);
            (skip, snapshot)
        };

        // Step 6: if skip_version is set and older than target, deliver an
        // intermediate empty-ish run up to (not including) the skip.
        let mut current = main_version;
        if let Some(skip) = skip_version {
            if skip <= target && !running_notifiers.is_empty() {
                let mut info = self.storage.advance_read(current, skip)?;
                for t in &mut running_notifiers {
                    t.notifier.add_required_change_info(&mut info);
                    t.notifier.run(&info);
                }
                current = skip;
                for t in running_notifiers.iter_mut() {
                    t.pending_handover = Some(t.notifier.prepare_handover());
                }
            }
        }

        // Step 7: advance to target and run the existing notifiers.
        if current != target {
            let mut info = self.storage.advance_read(current, target)?;
            for t in &mut running_notifiers {
                t.notifier.add_required_change_info(&mut info);
                t.notifier.run(&info);
            }
        }

        // Step 8: re-acquire the lock, prepare handover, clean up, signal.
        for t in running_notifiers.iter_mut() {
            t.pending_handover = Some(t.notifier.prepare_handover());
        }
        running_notifiers.retain_mut(|t| {
            let alive = t.notifier.is_alive();
            if !alive {
                t.notifier.release_data();
            }
            alive
        });
        let mut state = self.state.lock();
        state.notifiers = running_notifiers;
        state.notifiers.append(&mut new_tracked);
        state.main_version = Some(target);
        state.run_count += 1;
        self.completion.notify_all();
        Ok(())
    }

    /// Delivers every notifier's already-prepared handover payload, if any,
    /// without otherwise touching coordinator state.
    fn deliver_ready(state: &mut State) {
        for t in state.notifiers.iter_mut() {
            if let Some(payload) = t.pending_handover.take() {
                t.notifier.deliver(payload);
            }
        }
    }

    /// Observer-thread operation: waits for an in-flight run at a version
    /// at least as new as `target`, then delivers every notifier's
    /// already-prepared handover.
    pub fn advance_to_ready(&self, target: VersionId) -> Result<()> {
        let mut state = self.state.lock();
        while state.main_version.map(|v| v < target).unwrap_or(true) && state.async_error.is_none() {
            self.completion.wait(&mut state);
        }
        if let Some(err) = state.async_error.clone() {
            return Err(Error::AsyncNotifier(err));
        }
        Self::deliver_ready(&mut state);
        Ok(())
    }

    /// As [`advance_to_ready`](Self::advance_to_ready), targeting the
    /// current head rather than a caller-supplied version.
    pub fn advance_to_latest(&self) -> Result<()> {
        let head = self.storage.current_head()?;
        self.advance_to_ready(head)
    }

    /// Packages notifiers for `handle_id`, then lets the storage engine
    /// begin a write that also delivers pending notifications for it.
    pub fn promote_to_write(&self, handle_id: u64) -> Result<VersionId> {
        self.advance_to_latest()?;
        self.storage.commit_write().map(|v| {
            self.commit_write(handle_id, v);
            v
        })
    }

    /// Returns the async error latched on this coordinator, if any.
    pub fn async_error(&self) -> Option<Arc<Error>> {
        self.state.lock().async_error.clone()
    }

    pub fn shutdown(&self) {
        self.wake.shutdown();
    }
}
