//! Polling helpers for asynchronous outcomes

use std::path::Path;
use std::time::Duration;

/// Poll `condition` every 10ms until it holds or `timeout` elapses
///
/// Returns whether the condition was reached.
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Whether `dir` has no entries (a missing directory counts as empty)
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
