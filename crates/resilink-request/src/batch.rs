//! Bounded batch execution
//!
//! Futures are lazy, so a batch is just a list of unstarted calls. Parallel
//! mode runs them in consecutive groups of `concurrency`, each group
//! starting only after the previous one fully succeeded. Sequential mode
//! runs them one at a time. Either way the first failure aborts the batch
//! and results come back in input order.

use std::future::Future;

use futures::future::try_join_all;
use tracing::{debug, trace};

use crate::error::RequestResult;

/// Default group size for parallel batches
pub const DEFAULT_BATCH_CONCURRENCY: usize = 5;

/// Batch execution options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Run groups concurrently (`true`) or every call in sequence (`false`)
    pub parallel: bool,
    /// Group size in parallel mode; `0` behaves as `1`
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

impl BatchConfig {
    /// Run every call in sequence
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Parallel groups of `concurrency`
    pub fn parallel(concurrency: usize) -> Self {
        Self {
            parallel: true,
            concurrency,
        }
    }

    fn group_size(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Run `requests` per `config`, collecting results in input order.
pub async fn batch_requests<I, F, T>(requests: I, config: BatchConfig) -> RequestResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = RequestResult<T>>,
{
    let mut requests: Vec<F> = requests.into_iter().collect();
    let total = requests.len();
    let mut results = Vec::with_capacity(total);

    if !config.parallel {
        debug!(total, "Running batch sequentially");
        for request in requests {
            results.push(request.await?);
        }
        return Ok(results);
    }

    let group_size = config.group_size();
    debug!(total, group_size, "Running batch in parallel groups");

    while !requests.is_empty() {
        let rest = requests.split_off(group_size.min(requests.len()));
        let group = std::mem::replace(&mut requests, rest);
        trace!(size = group.len(), done = results.len(), "Starting batch group");
        results.extend(try_join_all(group).await?);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_parallel_groups_bound_concurrency() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let requests = (0..7usize).map(|i| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10 * (7 - i as u64))).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            }
        });

        let results = batch_requests(requests, BatchConfig::parallel(3)).await.unwrap();
        assert_eq!(results, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_runs_one_at_a_time() {
        let results = batch_requests(
            (1..=2u8).map(|i| async move { Ok(i) }),
            BatchConfig::parallel(0),
        )
        .await;
        assert_eq!(results, Ok(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let started = Arc::new(AtomicUsize::new(0));
        let requests = (0..4u32).map(|i| {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if i == 1 {
                    Err(RequestError::failed("second failed"))
                } else {
                    Ok(i)
                }
            }
        });

        let result = batch_requests(requests, BatchConfig::sequential()).await;
        assert_eq!(result, Err(RequestError::failed("second failed")));
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let requests: Vec<std::future::Ready<RequestResult<u8>>> = Vec::new();
        assert_eq!(batch_requests(requests, BatchConfig::default()).await, Ok(vec![]));
    }
}
