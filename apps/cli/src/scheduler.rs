//! Bounded Task Scheduler.
//!
//! Tasks are launched in input order. Before each launch the scheduler
//! acquires a semaphore permit, so launching suspends while `limit` tasks
//! are still in flight. Results are collected by awaiting the join handles
//! in input order, which keeps result `i` paired with task `i` no matter
//! which task settles first.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

/// Section generation talks to a rate- and cost-sensitive service.
pub const GENERATION_CONCURRENCY: usize = 3;

/// Runs `tasks` with at most `limit` of them executing at once and returns
/// their outputs in input order.
///
/// A `limit` of zero is treated as one. Task failures are whatever `T`
/// encodes; a panicking task resumes the panic in the caller, and so does a
/// task cancelled because the runtime is shutting down.
pub async fn run_bounded<T, F, Fut>(tasks: Vec<F>, limit: usize) -> Vec<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let limit = limit.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let total = tasks.len();
    let mut handles = Vec::with_capacity(total);

    for (index, task) in tasks.into_iter().enumerate() {
        // the semaphore is never closed, so this only ever waits
        let permit = semaphore.clone().acquire_owned().await;
        debug!("launching task {}/{} (limit {limit})", index + 1, total);

        let fut = task();
        handles.push(tokio::spawn(async move {
            let _permit = permit; // released when the task settles
            fut.await
        }));
    }

    let mut results = Vec::with_capacity(total);
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(value) => results.push(value),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // handles are never aborted, so this is the runtime shutting down
            Err(e) => panic!("scheduled task {index} cancelled by runtime shutdown: {e}"),
        }
    }
    results
}

/// Full fan-out: every task may run at once.
pub async fn run_unbounded<T, F, Fut>(tasks: Vec<F>) -> Vec<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let limit = tasks.len();
    run_bounded(tasks, limit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many tasks are running and the highest value ever seen.
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn delayed_tasks(
        delays_ms: &[u64],
        gauge: &Arc<Gauge>,
    ) -> Vec<impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = usize> + Send>>> {
        delays_ms
            .iter()
            .enumerate()
            .map(|(i, &ms)| {
                let gauge = gauge.clone();
                move || {
                    Box::pin(async move {
                        gauge.enter();
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        gauge.exit();
                        i
                    }) as std::pin::Pin<Box<dyn Future<Output = usize> + Send>>
                }
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_input_order() {
        let gauge = Arc::new(Gauge::default());
        let results = run_bounded(delayed_tasks(&[100, 1], &gauge), 2).await;
        assert_eq!(results, vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_limit() {
        let gauge = Arc::new(Gauge::default());
        let delays = [30, 5, 50, 10, 20, 1, 40, 15, 25, 35];
        let results = run_bounded(delayed_tasks(&delays, &gauge), 3).await;

        assert_eq!(results, (0..delays.len()).collect::<Vec<_>>());
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 3);
        assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_one_runs_serially() {
        let gauge = Arc::new(Gauge::default());
        let results = run_bounded(delayed_tasks(&[5, 5, 5, 5], &gauge), 1).await;
        assert_eq!(results, vec![0, 1, 2, 3]);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_treated_as_one() {
        let gauge = Arc::new(Gauge::default());
        let results = run_bounded(delayed_tasks(&[5, 5], &gauge), 0).await;
        assert_eq!(results, vec![0, 1]);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_runs_everything_at_once() {
        let gauge = Arc::new(Gauge::default());
        let results = run_unbounded(delayed_tasks(&[10, 10, 10, 10, 10], &gauge)).await;
        assert_eq!(results.len(), 5);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_empty_task_list() {
        let tasks: Vec<fn() -> std::future::Ready<u8>> = Vec::new();
        assert!(run_bounded(tasks, 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_task_failures_stay_in_their_slot() {
        let tasks: Vec<_> = (0..4)
            .map(|i| {
                move || async move {
                    if i % 2 == 0 {
                        Ok(i)
                    } else {
                        Err(format!("task {i} failed"))
                    }
                }
            })
            .collect();
        let results = run_bounded(tasks, 2).await;
        assert_eq!(results[0], Ok(0));
        assert_eq!(results[1], Err("task 1 failed".to_string()));
        assert_eq!(results[2], Ok(2));
        assert_eq!(results[3], Err("task 3 failed".to_string()));
    }

    #[tokio::test]
    #[should_panic(expected = "task 1 exploded")]
    async fn test_task_panic_resumes_in_caller() {
        let tasks: Vec<_> = (0..3)
            .map(|i| {
                move || async move {
                    if i == 1 {
                        panic!("task {i} exploded");
                    }
                    i
                }
            })
            .collect();
        run_bounded(tasks, 2).await;
    }
}
