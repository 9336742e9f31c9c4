//! Bounded-latency execution of a single lookup.
//!
//! The lookup runs as its own task and the caller waits on the task's
//! `JoinHandle` under a deadline. When the deadline wins, the handle is
//! dropped: the task is detached, not aborted. It keeps running until the
//! remote answers, releases the response, and its outcome is discarded.
//!
//! A detached task still has an upper bound on its life (`abandon_after`,
//! never shorter than `deadline`). A remote that never answers costs one
//! task and one connection for that long, not for the life of the process.

use std::{future::Future, time::Duration};

use tokio::time;

use crate::error::LookupError;

pub async fn race<F, T>(
    deadline: Duration,
    abandon_after: Duration,
    lookup: F,
) -> Result<T, LookupError>
where
    F: Future<Output = Result<T, LookupError>> + Send + 'static,
    T: Send + 'static,
{
    let abandon_after = abandon_after.max(deadline);
    let handle = tokio::spawn(async move {
        match time::timeout(abandon_after, lookup).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => {
                tracing::debug!(
                    abandon_after_ms = abandon_after.as_millis() as u64,
                    "ezpass lookup dropped after outliving its caller"
                );
                Err(LookupError::Timeout)
            }
        }
    });

    match time::timeout(deadline, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_err)) => {
            tracing::error!(error = %join_err, "ezpass lookup task failed");
            Err(join_err.into())
        }
        Err(_elapsed) => {
            tracing::warn!(
                deadline_ms = deadline.as_millis() as u64,
                "ezpass lookup timed out, abandoning in-flight call"
            );
            Err(LookupError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;
    use crate::error::ErrorKind;

    const GRACE: Duration = Duration::from_secs(2);

    /// Flags the shared bool when dropped, standing in for a response body.
    struct Resource(Arc<AtomicBool>);

    impl Drop for Resource {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_fast_success_is_returned() {
        let out = race(Duration::from_millis(200), GRACE, async {
            Ok::<_, LookupError>(7)
        })
        .await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_fast_failure_is_returned() {
        let out = race(Duration::from_millis(200), GRACE, async {
            Err::<(), _>(LookupError::Unauthorized)
        })
        .await;
        assert_eq!(out.unwrap_err().kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_slow_success_times_out() {
        let out = race(Duration::from_millis(20), GRACE, async {
            time::sleep(Duration::from_millis(300)).await;
            Ok::<_, LookupError>("too late")
        })
        .await;
        assert_eq!(out.unwrap_err().kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_panicking_lookup_is_unknown() {
        let out = race(Duration::from_millis(200), GRACE, async {
            if true {
                panic!("boom");
            }
            Ok::<(), LookupError>(())
        })
        .await;
        assert_eq!(out.unwrap_err().kind(), ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_abandoned_lookup_runs_to_completion_and_releases() {
        let finished = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));

        let lookup = {
            let finished = finished.clone();
            let resource = Resource(released.clone());
            async move {
                time::sleep(Duration::from_millis(100)).await;
                finished.store(true, Ordering::SeqCst);
                drop(resource);
                Ok::<_, LookupError>(())
            }
        };

        let out = race(Duration::from_millis(10), GRACE, lookup).await;
        assert_eq!(out.unwrap_err().kind(), ErrorKind::Timeout);

        // Not cancelled: still holding its resource right after the timeout.
        assert!(!finished.load(Ordering::SeqCst));
        assert!(!released.load(Ordering::SeqCst));

        time::sleep(Duration::from_millis(400)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_repeated_timeouts_are_deterministic() {
        for _ in 0..5 {
            let out = race(Duration::from_millis(5), GRACE, async {
                time::sleep(Duration::from_millis(100)).await;
                Ok::<_, LookupError>(())
            })
            .await;
            assert_eq!(out.unwrap_err().kind(), ErrorKind::Timeout);
        }
    }

    #[tokio::test]
    async fn test_hung_lookup_is_dropped_after_abandon_window() {
        let metrics = tokio::runtime::Handle::current().metrics();
        let baseline = metrics.num_alive_tasks();
        let released = Arc::new(AtomicBool::new(false));

        for _ in 0..10 {
            let resource = Resource(released.clone());
            let out = race(
                Duration::from_millis(5),
                Duration::from_millis(50),
                async move {
                    let _resource = resource;
                    std::future::pending::<Result<(), LookupError>>().await
                },
            )
            .await;
            assert_eq!(out.unwrap_err().kind(), ErrorKind::Timeout);
        }
        assert!(metrics.num_alive_tasks() > baseline);

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(metrics.num_alive_tasks(), baseline);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_abandon_window_never_undercuts_deadline() {
        let out = race(Duration::from_millis(200), Duration::from_millis(1), async {
            time::sleep(Duration::from_millis(20)).await;
            Ok::<_, LookupError>("in time")
        })
        .await;
        assert_eq!(out.unwrap(), "in time");
    }
}
