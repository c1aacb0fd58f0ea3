//! Bounded fan-out/fan-in executor shared by bulk create and bulk delete.
//!
//! A source task feeds items one at a time into a shared queue, a fixed pool
//! of workers pulls from it and applies the per-item operation, and a merge
//! stage funnels every worker's results into one stream. The stream closes
//! once all workers have finished.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::trace;

/// Number of workers used when none is configured.
pub const DEFAULT_WORKERS: usize = 5;

/// Raises the shared cancellation signal of one pipeline run.
///
/// Once raised, the source stops emitting and idle workers stop taking new
/// items. Work already in flight runs to completion and its results are
/// still delivered.
#[derive(Debug, Clone)]
pub struct Canceller {
    done: Arc<watch::Sender<bool>>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.done.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.done.borrow()
    }
}

/// Resolves once the signal is raised. Never resolves if the run was dropped
/// without cancelling.
async fn cancelled(done: &mut watch::Receiver<bool>) {
    if done.wait_for(|raised| *raised).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// A running batch: the merged result stream plus its cancellation handle.
#[derive(Debug)]
pub struct BatchRun<R> {
    results: mpsc::Receiver<R>,
    canceller: Canceller,
}

impl<R> BatchRun<R> {
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Next result in completion order, `None` once every worker is done.
    pub async fn next(&mut self) -> Option<R> {
        self.results.recv().await
    }

    /// Drains the run. Results come in completion order.
    pub async fn collect(mut self) -> Vec<R> {
        let mut collected = Vec::new();
        while let Some(result) = self.results.recv().await {
            collected.push(result);
        }
        collected
    }
}

/// Fan-out/fan-in executor with a fixed worker count.
#[derive(Debug, Clone, Copy)]
pub struct BatchPipeline {
    workers: usize,
}

impl Default for BatchPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl BatchPipeline {
    /// A zero worker count is raised to one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Starts processing `items` with `operation` on the current runtime.
    ///
    /// Without cancellation every item yields exactly one result.
    pub fn run<T, R, F, Fut>(&self, items: Vec<T>, operation: F) -> BatchRun<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let (done_tx, done_rx) = watch::channel(false);
        let capacity = items.len().max(1);

        let queue = source(items, done_rx.clone());
        let per_worker = self.fan_out(queue, Arc::new(operation), done_rx);
        let results = fan_in(per_worker, capacity);

        BatchRun {
            results,
            canceller: Canceller {
                done: Arc::new(done_tx),
            },
        }
    }

    fn fan_out<T, R, F, Fut>(
        &self,
        queue: mpsc::Receiver<T>,
        operation: Arc<F>,
        done: watch::Receiver<bool>,
    ) -> Vec<mpsc::Receiver<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let queue = Arc::new(Mutex::new(queue));

        (0..self.workers)
            .map(|worker| {
                let (tx, rx) = mpsc::channel(1);
                let queue = Arc::clone(&queue);
                let operation = Arc::clone(&operation);
                let mut done = done.clone();

                tokio::spawn(async move {
                    loop {
                        let next = tokio::select! {
                            biased;
                            _ = cancelled(&mut done) => None,
                            item = async { queue.lock().await.recv().await } => item,
                        };
                        let Some(item) = next else {
                            break;
                        };

                        let result = operation(item).await;
                        if tx.send(result).await.is_err() {
                            break;
                        }
                    }
                    trace!(worker, "batch worker finished");
                });

                rx
            })
            .collect()
    }
}

fn source<T: Send + 'static>(items: Vec<T>, mut done: watch::Receiver<bool>) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        for item in items {
            tokio::select! {
                biased;
                _ = cancelled(&mut done) => {
                    trace!("batch source stopped by cancellation");
                    break;
                }
                sent = tx.send(item) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
    });

    rx
}

fn fan_in<R: Send + 'static>(per_worker: Vec<mpsc::Receiver<R>>, capacity: usize) -> mpsc::Receiver<R> {
    let (tx, rx) = mpsc::channel(capacity);

    for mut worker_rx in per_worker {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(result) = worker_rx.recv().await {
                if tx.send(result).await.is_err() {
                    break;
                }
            }
        });
    }

    rx
}
