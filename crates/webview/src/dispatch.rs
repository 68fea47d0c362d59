//! Cross-thread dispatch queue and termination flag
//!
//! Closures are appended from any thread and drained in batches on the UI
//! thread. A batch is swapped out under the lock before it runs, so a
//! closure that dispatches again lands in the next batch instead of
//! re-entering the current one.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::Webview;

/// Deferred work executed on the UI thread
pub type Job = Box<dyn FnOnce(&mut Webview) + Send + 'static>;

#[derive(Default)]
pub(crate) struct Shared {
    queue: Mutex<VecDeque<Job>>,
    wake: Condvar,
    terminated: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        // Jobs never run under the lock, so a poisoned queue is still consistent.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, job: Job) {
        let mut queue = self.lock();
        queue.push_back(job);
        self.wake.notify_one();
    }

    /// Swap out everything queued so far
    pub(crate) fn take_batch(&self) -> VecDeque<Job> {
        std::mem::take(&mut *self.lock())
    }

    /// Block the UI thread until work arrives, termination, or `timeout`
    pub(crate) fn wait_idle(&self, timeout: Duration) {
        let queue = self.lock();
        if !queue.is_empty() || self.is_terminated() {
            return;
        }
        let _ = self
            .wake
            .wait_timeout_while(queue, timeout, |queue| {
                queue.is_empty() && !self.terminated.load(Ordering::Acquire)
            });
    }

    pub(crate) fn terminate(&self) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            tracing::debug!("termination requested");
        }
        // Take the lock so a waiter between its check and its wait sees the flag.
        let _queue = self.lock();
        self.wake.notify_all();
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub(crate) fn pending(&self) -> usize {
        self.lock().len()
    }
}

/// Thread-safe handle to a browser engine.
///
/// Handles are cheap to clone and can be moved to other threads; they only
/// reach the dispatch queue and the termination flag.
#[derive(Clone)]
pub struct WebviewHandle {
    shared: Arc<Shared>,
}

impl WebviewHandle {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    /// Queue `job` to run on the UI thread during a later loop iteration.
    ///
    /// Never blocks beyond the queue lock. Jobs queued after the loop has
    /// exited are dropped with the engine without running.
    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce(&mut Webview) + Send + 'static,
    {
        self.shared.push(Box::new(job));
    }

    /// Ask the run loop to exit after its current iteration.
    ///
    /// The transition is one-way; calling it again has no further effect.
    pub fn terminate(&self) {
        self.shared.terminate();
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.is_terminated()
    }
}

impl fmt::Debug for WebviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebviewHandle")
            .field("pending", &self.shared.pending())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn noop() -> Job {
        Box::new(|_| {})
    }

    #[test]
    fn test_take_batch_empties_queue() {
        let handle = WebviewHandle::new();
        for _ in 0..3 {
            handle.dispatch(|_| {});
        }
        assert_eq!(handle.shared().pending(), 3);
        let batch = handle.shared().take_batch();
        assert_eq!(batch.len(), 3);
        assert_eq!(handle.shared().pending(), 0);
    }

    #[test]
    fn test_terminate_is_monotonic() {
        let handle = WebviewHandle::new();
        assert!(!handle.is_terminated());
        handle.terminate();
        handle.terminate();
        assert!(handle.clone().is_terminated());
    }

    #[test]
    fn test_wait_idle_returns_on_pending_work() {
        let handle = WebviewHandle::new();
        handle.shared().push(noop());
        let start = Instant::now();
        handle.shared().wait_idle(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_idle_wakes_on_terminate_from_other_thread() {
        let handle = WebviewHandle::new();
        let remote = handle.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.terminate();
        });
        let start = Instant::now();
        handle.shared().wait_idle(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(4));
        waker.join().unwrap();
    }

    #[test]
    fn test_wait_idle_times_out_when_nothing_happens() {
        let handle = WebviewHandle::new();
        let start = Instant::now();
        handle.shared().wait_idle(Duration::from_millis(15));
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
