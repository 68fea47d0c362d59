//! Wall-clock budget for a single test
//!
//! The engine has no notion of time; the harness owns the watchdog. When
//! the budget runs out the whole process exits, since a stuck UI loop can
//! not be interrupted from another thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;

/// Exit status used for failures and timeouts
pub const FAILURE_STATUS: i32 = 1;

/// What happens when the budget runs out
pub type OnTimeout = fn();

fn exit_on_timeout() {
    println!("Exiting due to a timeout.");
    std::process::exit(FAILURE_STATUS);
}

/// Run `test` on the calling thread, exiting the process after `timeout`
pub fn run_with_timeout<F>(test: F, timeout: Duration) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    run_with_watchdog(test, timeout, exit_on_timeout)
}

fn run_with_watchdog<F>(test: F, timeout: Duration, on_timeout: OnTimeout) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    // Dropping the sender is the cancellation signal.
    let (done, cancelled) = mpsc::channel::<()>();
    let watchdog = thread::Builder::new()
        .name("watchdog".into())
        .spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(timeout) {
                tracing::error!(?timeout, "test exceeded its budget");
                on_timeout();
            }
        })?;

    let outcome = panic::catch_unwind(AssertUnwindSafe(test));
    drop(done);
    let _ = watchdog.join();

    outcome.unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(anyhow!("test panicked: {reason}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    static FIRED: AtomicBool = AtomicBool::new(false);

    fn mark_fired() {
        FIRED.store(true, Ordering::SeqCst);
    }

    #[test]
    fn test_fast_test_cancels_watchdog() {
        let start = Instant::now();
        run_with_watchdog(|| Ok(()), Duration::from_secs(5), || panic!("fired")).unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_errors_and_panics_are_reported() {
        let err = run_with_watchdog(|| anyhow::bail!("nope"), Duration::from_secs(5), || {})
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");

        let err = run_with_watchdog(|| panic!("boom"), Duration::from_secs(5), || {}).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_slow_test_trips_watchdog() {
        run_with_watchdog(
            || {
                thread::sleep(Duration::from_millis(100));
                Ok(())
            },
            Duration::from_millis(10),
            mark_fired,
        )
        .unwrap();
        assert!(FIRED.load(Ordering::SeqCst));
    }
}
