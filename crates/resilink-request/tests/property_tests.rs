//! Property-based tests for request decorators
//!
//! Each case builds its own paused current-thread runtime so timer-driven
//! behaviour is deterministic.

use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use resilink_request::{
    BatchConfig, Request, RequestError, RequestExt, RetryConfig, batch_requests, debounce_request,
    request_fn,
};

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: failing exactly n times under retries=n succeeds after n+1 calls
    #[test]
    fn prop_retry_recovers_within_budget(retries in 0u32..8) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let flaky = request_fn(move |_: ()| {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < retries {
                    Err(RequestError::failed("not yet"))
                } else {
                    Ok(())
                }
            }
        })
        .with_retry(RetryConfig::default().with_retries(retries));

        let result = paused_runtime().block_on(flaky.call(()));
        prop_assert_eq!(result, Ok(()));
        prop_assert_eq!(calls.load(Ordering::SeqCst), retries + 1);
    }

    /// Property: failing n+1 times under retries=n surfaces the last error
    #[test]
    fn prop_retry_gives_up_after_budget(retries in 0u32..8) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let broken = request_fn(move |_: ()| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(RequestError::failed(format!("attempt {n}"))) }
        })
        .with_retry(RetryConfig::default().with_retries(retries));

        let result = paused_runtime().block_on(broken.call(()));
        prop_assert_eq!(result, Err(RequestError::failed(format!("attempt {retries}"))));
        prop_assert_eq!(calls.load(Ordering::SeqCst), retries + 1);
    }

    /// Property: k calls inside the wait collapse into one invocation sharing one value
    #[test]
    fn prop_debounce_single_invocation(k in 1usize..20, wait_ms in 10u64..1000) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let debounced = debounce_request(
            request_fn(move |x: usize| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(x * 10)
                }
            }),
            Duration::from_millis(wait_ms),
        );

        let results = paused_runtime().block_on(async {
            let pending: Vec<_> = (0..k).map(|i| debounced.call(i)).collect();
            futures::future::join_all(pending).await
        });

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The cycle runs with the arguments of the call that opened it
        prop_assert!(results.iter().all(|r| *r == Ok(0)));
    }

    /// Property: batch output order equals input order for any group size
    #[test]
    fn prop_batch_preserves_order(
        delays in prop::collection::vec(0u64..100, 0..20),
        concurrency in 0usize..6,
    ) {
        let expected: Vec<usize> = (0..delays.len()).collect();
        let requests = delays.iter().enumerate().map(|(i, &delay)| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, RequestError>(i)
        });

        let results = paused_runtime()
            .block_on(batch_requests(requests, BatchConfig::parallel(concurrency)));
        prop_assert_eq!(results, Ok(expected));
    }
}
