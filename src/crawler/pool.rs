//! Bounded worker pool for fetch tasks
//!
//! This module handles:
//! - Spawning `min(max_workers, task_count)` workers on the tokio runtime
//! - One HTTP session and one seeded jitter generator per worker
//! - Jittered pacing before every request
//! - Collecting outcomes in completion order through a shared aggregator
//!
//! Task bodies never fail the pool: each returns an outcome value that
//! carries its own success or failure. A body that panics is turned into a
//! failed outcome for its input and the worker moves on to the next task.

use crate::config::HttpConfig;
use crate::crawler::session::build_session;
use crate::HarvestError;
use futures::FutureExt;
use reqwest::Client;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinSet;

/// Describes a finished task for progress output
pub trait TaskReport {
    /// The task input this outcome was produced from
    type Input;

    /// Builds the failed outcome for a task whose body panicked
    fn from_panic(input: Self::Input, message: String) -> Self;

    /// One-line description used in the progress log
    fn report(&self) -> String;

    /// Whether the task ended in a failure
    fn is_failure(&self) -> bool;
}

/// Completed/total counter for one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Shared state for one pool run
///
/// Holds the two pieces of cross-task mutable state: the progress counter
/// and the outcome collection, each behind its own mutex.
#[derive(Debug)]
pub struct RunAggregator<O> {
    progress: Mutex<Progress>,
    outcomes: Mutex<Vec<O>>,
}

impl<O: TaskReport> RunAggregator<O> {
    pub fn new(total: usize) -> Self {
        Self {
            progress: Mutex::new(Progress {
                completed: 0,
                total,
            }),
            outcomes: Mutex::new(Vec::with_capacity(total)),
        }
    }

    /// Records a finished task: bumps the counter, logs progress, stores the outcome
    pub fn complete(&self, outcome: O) {
        {
            let mut progress = lock(&self.progress);
            progress.completed += 1;
            if outcome.is_failure() {
                tracing::warn!(
                    "Progress: {}/{} - {}",
                    progress.completed,
                    progress.total,
                    outcome.report()
                );
            } else {
                tracing::info!(
                    "Progress: {}/{} - {}",
                    progress.completed,
                    progress.total,
                    outcome.report()
                );
            }
        }

        lock(&self.outcomes).push(outcome);
    }

    pub fn progress(&self) -> Progress {
        *lock(&self.progress)
    }

    /// Drains the collected outcomes
    pub fn take_outcomes(&self) -> Vec<O> {
        std::mem::take(&mut *lock(&self.outcomes))
    }
}

/// Locks a mutex, recovering the data if a worker panicked while holding it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Text of a panic payload, when it carries one
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Draws a pacing multiplier in [0.5, 1.0)
pub fn jitter_factor(rng: &mut fastrand::Rng) -> f64 {
    0.5 + 0.5 * rng.f64()
}

/// Fixed-size pool of fetch workers
///
/// The same pool runs both the listing-page phase and the job-detail phase;
/// only the task body differs.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    max_workers: usize,
    delay: Duration,
    seed: u64,
    http: HttpConfig,
}

impl WorkerPool {
    /// Creates a new pool
    ///
    /// # Arguments
    ///
    /// * `max_workers` - Upper bound on concurrent workers
    /// * `delay` - Base pause before each request, scaled by the jitter factor
    /// * `seed` - Seed for the per-worker jitter generators
    /// * `http` - Settings for the per-worker HTTP sessions
    pub fn new(max_workers: usize, delay: Duration, seed: u64, http: HttpConfig) -> Self {
        Self {
            max_workers: max_workers.max(1),
            delay,
            seed,
            http,
        }
    }

    pub fn http_config(&self) -> &HttpConfig {
        &self.http
    }

    /// Number of workers used for `task_count` tasks
    pub fn worker_count(&self, task_count: usize) -> usize {
        self.max_workers.min(task_count)
    }

    /// Runs every task and returns one outcome per task, in completion order
    ///
    /// # Arguments
    ///
    /// * `tasks` - Task inputs; all are queued at once
    /// * `body` - Task body, given the worker's session and one input
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<O>)` - One outcome per task that ran to completion
    /// * `Err(HarvestError)` - A worker session could not be built
    pub async fn run<I, O, F, Fut>(&self, tasks: Vec<I>, body: F) -> Result<Vec<O>, HarvestError>
    where
        I: Clone + Send + 'static,
        O: TaskReport<Input = I> + Send + 'static,
        F: Fn(Client, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send,
    {
        let workers = self.worker_count(tasks.len());
        if workers == 0 {
            return Ok(Vec::new());
        }

        tracing::debug!("Starting {} workers for {} tasks", workers, tasks.len());

        let aggregator = Arc::new(RunAggregator::new(tasks.len()));
        let queue = Arc::new(Mutex::new(tasks.into_iter()));
        let body = Arc::new(body);
        let mut handles = JoinSet::new();

        for worker_id in 0..workers {
            let session = build_session(&self.http)?;
            let mut rng = fastrand::Rng::with_seed(self.seed.wrapping_add(worker_id as u64));
            let delay = self.delay;
            let queue = Arc::clone(&queue);
            let aggregator = Arc::clone(&aggregator);
            let body = Arc::clone(&body);

            handles.spawn(async move {
                loop {
                    let next = lock(&queue).next();
                    let Some(input) = next else {
                        break;
                    };

                    let pause = delay.mul_f64(jitter_factor(&mut rng));
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }

                    let retained = input.clone();
                    let task = async { body(session.clone(), input).await };
                    let outcome = match AssertUnwindSafe(task).catch_unwind().await {
                        Ok(outcome) => outcome,
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            tracing::error!("Worker {} task panicked: {}", worker_id, message);
                            O::from_panic(retained, message)
                        }
                    };
                    aggregator.complete(outcome);
                }
                tracing::trace!("Worker {} finished", worker_id);
            });
        }

        while let Some(joined) = handles.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task aborted: {}", e);
            }
        }

        Ok(aggregator.take_outcomes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug)]
    struct Echo {
        value: usize,
        failed: bool,
    }

    impl TaskReport for Echo {
        type Input = usize;

        fn from_panic(input: usize, _message: String) -> Self {
            Echo {
                value: input,
                failed: true,
            }
        }

        fn report(&self) -> String {
            format!("task {}", self.value)
        }

        fn is_failure(&self) -> bool {
            self.failed
        }
    }

    fn create_test_pool(max_workers: usize) -> WorkerPool {
        WorkerPool::new(max_workers, Duration::ZERO, 7, HttpConfig::default())
    }

    #[test]
    fn test_jitter_factor_bounds() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..1000 {
            let factor = jitter_factor(&mut rng);
            assert!((0.5..1.0).contains(&factor));
        }
    }

    #[test]
    fn test_jitter_is_reproducible_for_seed() {
        let mut first = fastrand::Rng::with_seed(99);
        let mut second = fastrand::Rng::with_seed(99);
        let a: Vec<f64> = (0..5).map(|_| jitter_factor(&mut first)).collect();
        let b: Vec<f64> = (0..5).map(|_| jitter_factor(&mut second)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_worker_count_is_bounded_by_tasks() {
        let pool = create_test_pool(8);
        assert_eq!(pool.worker_count(3), 3);
        assert_eq!(pool.worker_count(20), 8);
        assert_eq!(pool.worker_count(0), 0);
    }

    #[test]
    fn test_aggregator_counts_and_collects() {
        let aggregator = RunAggregator::new(2);
        aggregator.complete(Echo { value: 1, failed: false });
        aggregator.complete(Echo { value: 2, failed: true });

        assert_eq!(aggregator.progress(), Progress { completed: 2, total: 2 });
        assert_eq!(aggregator.take_outcomes().len(), 2);
        assert!(aggregator.take_outcomes().is_empty());
    }

    #[tokio::test]
    async fn test_run_returns_one_outcome_per_task() {
        let pool = create_test_pool(4);
        let tasks: Vec<usize> = (0..25).collect();

        let outcomes = pool
            .run(tasks, |_session, value| async move {
                Echo {
                    value,
                    failed: false,
                }
            })
            .await
            .unwrap();

        let values: HashSet<usize> = outcomes.iter().map(|o| o.value).collect();
        assert_eq!(outcomes.len(), 25);
        assert_eq!(values, (0..25).collect());
    }

    #[tokio::test]
    async fn test_failing_task_does_not_stop_others() {
        let pool = create_test_pool(3);
        let tasks: Vec<usize> = (0..10).collect();

        let outcomes = pool
            .run(tasks, |_session, value| async move {
                Echo {
                    value,
                    failed: value == 4,
                }
            })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 10);
        assert_eq!(outcomes.iter().filter(|o| o.failed).count(), 1);
    }

    #[tokio::test]
    async fn test_panicking_task_becomes_failed_outcome() {
        let pool = create_test_pool(1);
        let tasks: Vec<usize> = (0..10).collect();

        let outcomes = pool
            .run(tasks, |_session, value| async move {
                if value == 0 {
                    panic!("bad page {}", value);
                }
                Echo {
                    value,
                    failed: false,
                }
            })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 10);
        let failed: Vec<usize> = outcomes.iter().filter(|o| o.failed).map(|o| o.value).collect();
        assert_eq!(failed, vec![0]);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_run_with_no_tasks() {
        let pool = create_test_pool(4);
        let outcomes = pool
            .run(Vec::<usize>::new(), |_session, value| async move {
                Echo {
                    value,
                    failed: false,
                }
            })
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }
}
