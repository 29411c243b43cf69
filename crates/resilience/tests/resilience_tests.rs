//! Integration tests for retry and failure classification

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use stowage_resilience::{classify_io_error, with_retry, FailureKind, RetryPolicy};

#[tokio::test]
async fn test_retry_skips_fatal_failures() {
    let policy = RetryPolicy::new(4).with_initial_delay(Duration::from_millis(1));
    let calls = AtomicUsize::new(0);

    let result: Result<(), io::Error> = with_retry(
        &policy,
        |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")) }
        },
        |e| policy.should_retry(classify_io_error(e)),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_recovers_from_reset() {
    let policy = RetryPolicy::new(4).with_initial_delay(Duration::from_millis(1));
    let calls = AtomicUsize::new(0);

    let result = with_retry(
        &policy,
        |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 1 {
                    Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
                } else {
                    Ok("payload")
                }
            }
        },
        |e| policy.should_retry(classify_io_error(e)),
    )
    .await;

    assert_eq!(result.ok(), Some("payload"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_classification_matches_fatal_set() {
    let cases = [
        (io::ErrorKind::Interrupted, FailureKind::Interrupted),
        (io::ErrorKind::TimedOut, FailureKind::Interrupted),
        (io::ErrorKind::ConnectionRefused, FailureKind::ConnectionRefused),
        (io::ErrorKind::ConnectionReset, FailureKind::Other),
        (io::ErrorKind::BrokenPipe, FailureKind::Other),
        (io::ErrorKind::UnexpectedEof, FailureKind::Other),
    ];

    for (kind, expected) in cases {
        let err = io::Error::new(kind, "boom");
        assert_eq!(classify_io_error(&err), expected, "{kind:?}");
    }
}
