//! Background thread that drives [`Coordinator::on_change`] whenever a
//! writer commits or a new notifier registers. Mirrors a condition-variable
//! notification loop, but over a bounded channel so a burst of wakeups
//! coalesces into a single pending run instead of queuing up work.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, trace};

use super::Coordinator;

enum Signal {
    Wake,
    Shutdown,
}

pub(super) struct WakeHandle {
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
}

impl WakeHandle {
    pub(super) fn new() -> Self {
        // Capacity 1: a pending wakeup already covers any additional
        // wakeups that arrive before the worker drains it.
        let (tx, rx) = bounded(1);
        WakeHandle { tx, rx }
    }

    pub(super) fn notify(&self) {
        let _ = self.tx.try_send(Signal::Wake);
    }

    pub(super) fn shutdown(&self) {
        let _ = self.tx.send(Signal::Shutdown);
    }
}

/// Spawns the background worker thread for `coordinator`. The thread exits
/// once `shutdown` is called or the coordinator's sender is dropped.
pub(super) fn spawn(coordinator: Arc<Coordinator>) {
    let rx = coordinator.wake.rx.clone();
    thread::Builder::new()
        .name("watchdb-notifier".into())
        .spawn(move || run(coordinator, rx))
        .expect("failed to spawn background notifier thread");
}

fn run(coordinator: Arc<Coordinator>, rx: Receiver<Signal>) {
    debug!(path = %coordinator.path().display(), "notifier worker started");
    loop {
        match rx.recv() {
            Ok(Signal::Wake) => {
                trace!("notifier worker woke up");
                coordinator.on_change();
            }
            Ok(Signal::Shutdown) | Err(_) => break,
        }
    }
    debug!(path = %coordinator.path().display(), "notifier worker stopped");
}
