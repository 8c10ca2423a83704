//! Cooperative progress reporting.
//!
//! # Overview
//!
//! [`ProgressSnapshot`] is the single piece of cross-thread shared
//! state in the builder: a set of relaxed atomic counters written by
//! the pipeline and read by one background reporter thread. The values
//! are advisory telemetry only; a torn or stale read is harmless.
//!
//! [`ProgressReporter`] owns the background thread. It invokes the
//! user callback with `final_call = false` on a fixed cadence and, on
//! drop, wakes the worker, joins it, and lets it deliver exactly one
//! `final_call = true` invocation. Teardown never panics outward; a
//! failed join is swallowed.

use std::sync::atomic::{AtomicU64, AtomicUsize};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Cadence of the periodic callback.
const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Shared, advisory telemetry for one packer run.
///
/// All fields use relaxed ordering; they are single machine words and
/// no reader depends on cross-field consistency.
#[derive(Debug, Default)]
pub struct ProgressSnapshot {
    /// Current adaptive nilsimsa comparison window, published by the
    /// ordering engine.
    pub nilsimsa_depth: AtomicUsize,
    /// Regular files discovered by the walker.
    pub files_found: AtomicU64,
    /// Inodes whose content has been fingerprinted.
    pub inodes_scanned: AtomicU64,
    /// Bytes streamed through the fingerprint hashers.
    pub bytes_scanned: AtomicU64,
    /// Inodes emitted by the ordering engine.
    pub inodes_ordered: AtomicU64,
}

struct Shared {
    snapshot: ProgressSnapshot,
    running: Mutex<bool>,
    cond: Condvar,
}

/// Background progress reporter.
///
/// # Example
///
/// ```
/// use blockpack::progress::ProgressReporter;
/// use std::sync::atomic::Ordering;
///
/// let reporter = ProgressReporter::new(|snapshot, final_call| {
///     let ordered = snapshot.inodes_ordered.load(Ordering::Relaxed);
///     if final_call {
///         eprintln!("done, {ordered} inodes ordered");
///     }
/// });
/// reporter
///     .snapshot()
///     .inodes_ordered
///     .store(42, Ordering::Relaxed);
/// // Dropping the reporter delivers the final callback.
/// drop(reporter);
/// ```
pub struct ProgressReporter {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Start the reporter thread.
    ///
    /// `callback` runs on the worker thread: periodically with
    /// `final_call = false`, then exactly once with `final_call = true`
    /// when the reporter is dropped.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&ProgressSnapshot, bool) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            snapshot: ProgressSnapshot::default(),
            running: Mutex::new(true),
            cond: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("progress".to_string())
            .spawn(move || {
                let mut callback = callback;
                let mut running = worker_shared.running.lock().unwrap();
                while *running {
                    callback(&worker_shared.snapshot, false);
                    let (guard, _timeout) = worker_shared
                        .cond
                        .wait_timeout(running, TICK_INTERVAL)
                        .unwrap();
                    running = guard;
                }
                drop(running);
                callback(&worker_shared.snapshot, true);
            })
            .expect("failed to spawn progress thread");

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// The shared snapshot written by the pipeline.
    #[must_use]
    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.shared.snapshot
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        // The flag write happens under the mutex, so the worker cannot
        // miss the notification between its check and its wait.
        if let Ok(mut running) = self.shared.running.lock() {
            *running = false;
        }
        self.shared.cond.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
