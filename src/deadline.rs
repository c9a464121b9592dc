//! Bounding blocking calls with a wall-clock deadline

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Run `f` on a helper thread and wait at most `deadline` for its result.
///
/// Returns `None` when the deadline passes first. The helper thread is not
/// interrupted; it runs to completion and its result is dropped.
pub fn run_with_deadline<T, F>(deadline: Duration, f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    let spawned = thread::Builder::new()
        .name("taqwa-deadline".into())
        .spawn(move || {
            // Receiver may be gone after a timeout
            let _ = tx.send(f());
        });

    if let Err(err) = spawned {
        tracing::warn!(%err, "could not spawn helper thread");
        return None;
    }

    rx.recv_timeout(deadline).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_returns_value_before_deadline() {
        let value = run_with_deadline(Duration::from_secs(5), || 42);
        assert_eq!(value, Some(42));
    }

    #[test]
    fn test_gives_up_after_deadline() {
        let start = Instant::now();
        let value = run_with_deadline(Duration::from_millis(50), || {
            thread::sleep(Duration::from_secs(2));
            1
        });
        assert_eq!(value, None);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_panicking_call_counts_as_missed() {
        let value: Option<u8> = run_with_deadline(Duration::from_secs(1), || panic!("boom"));
        assert_eq!(value, None);
    }
}
