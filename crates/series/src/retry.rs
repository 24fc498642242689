//! Bounded retry with exponential backoff and timeout-bounded calls
//!
//! The zonal reduction and every source call are treated as blocking
//! operations that may fail transiently: retried with exponential
//! backoff up to the policy budget, and (for the reduction) bounded by
//! a wall-clock timeout on a dedicated thread.

use std::thread;
use std::time::Duration;

use crate::config::RetryPolicy;

/// Run `op`, retrying transient failures with exponential backoff.
///
/// A failure is retried only while `is_transient` says so and the
/// attempt budget (`max_retries` beyond the first call) is not
/// exhausted; the last error is returned otherwise.
pub fn with_backoff<T, E, F>(
    policy: &RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> std::result::Result<T, E>,
{
    let mut attempt: u32 = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries || !is_transient(&err) {
                    return Err(err);
                }
                attempt += 1;
                thread::sleep(policy.backoff_for(attempt));
            }
        }
    }
}

/// Run a blocking computation with a wall-clock timeout.
///
/// The computation runs on its own thread; on timeout the thread is
/// abandoned (it finishes on its own and its result is dropped) and
/// `None` is returned. The closure must own its inputs, which is why
/// the builder hands reductions `Arc`s rather than references.
pub fn blocking_with_timeout<T, F>(timeout: Duration, op: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        // The receiver may be gone after a timeout; nothing to do then
        let _ = sender.send(op());
    });
    receiver.recv_timeout(timeout).ok()
}
