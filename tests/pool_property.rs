//! Property tests for pool acquire/release invariants.
//!
//! After arbitrary acquire/release sequences, `stats.active + stats.idle <=
//! capacity` holds at every observation point, for both idle-queue
//! strategies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lease_pool::{ManageHandle, Pool, PoolConfig, Result, Strategy};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Test factory
// ---------------------------------------------------------------------------

struct CountingFactory {
    counter: AtomicU64,
}

impl CountingFactory {
    fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ManageHandle for CountingFactory {
    type Handle = u64;

    async fn create(&self) -> Result<u64> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

/// Poll until `cond` holds, bounded by a deadline, so tests do not depend
/// on a fixed sleep for the spawned return-to-pool task.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            std::time::Instant::now() < deadline,
            "pool did not settle within deadline"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ---------------------------------------------------------------------------
// Property: active + idle <= capacity after arbitrary acquire/release cycles
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn active_plus_idle_never_exceeds_capacity(
        capacity in 1usize..8,
        ops in proptest::collection::vec(prop_oneof![Just(true), Just(false)], 1..30),
        strategy in prop_oneof![Just(Strategy::Fifo), Just(Strategy::Lifo)],
    ) {
        // Run the async property test on the Tokio runtime.
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let config = PoolConfig {
                capacity,
                acquire_timeout: Some(Duration::from_millis(50)),
                strategy,
                ..Default::default()
            };
            let pool = Pool::new(CountingFactory::new(), config).unwrap();
            let mut leases = Vec::new();
            let mut released = 0u64;

            for op_is_acquire in &ops {
                if *op_is_acquire {
                    // Acquire (may fail if pool is exhausted -- that is fine)
                    if let Ok(lease) = pool.acquire().await {
                        leases.push(lease);
                    }
                } else if !leases.is_empty() {
                    // Release one and wait for the return-to-pool task
                    leases.pop();
                    released += 1;
                    let want = released;
                    wait_until(|| pool.stats().releases >= want).await;
                }

                // INVARIANT: active + idle <= capacity
                let stats = pool.stats();
                prop_assert!(
                    stats.active + stats.idle <= capacity,
                    "invariant violated: active={} + idle={} = {} > capacity={}",
                    stats.active, stats.idle, stats.active + stats.idle, capacity,
                );
            }

            // Drop all remaining leases and verify
            drop(leases);
            wait_until(|| pool.stats().active == 0).await;

            let final_stats = pool.stats();
            prop_assert!(
                final_stats.active + final_stats.idle <= capacity,
                "final invariant violated: active={} + idle={} > capacity={}",
                final_stats.active, final_stats.idle, capacity,
            );
            prop_assert_eq!(
                final_stats.active, 0,
                "all leases dropped, active should be 0"
            );

            Ok(())
        })?;
    }
}

/// Deterministic test: rapid acquire-release cycles maintain pool invariants.
#[tokio::test]
async fn rapid_acquire_release_preserves_invariants() {
    let capacity = 4;
    let config = PoolConfig {
        capacity,
        acquire_timeout: Some(Duration::from_millis(200)),
        ..Default::default()
    };
    let pool = Pool::new(CountingFactory::new(), config).unwrap();

    for i in 0..20u64 {
        let lease = pool.acquire().await.unwrap();
        drop(lease);
        wait_until(|| pool.stats().releases == i + 1).await;

        let stats = pool.stats();
        assert!(
            stats.active + stats.idle <= capacity,
            "invariant violated during rapid cycling"
        );
    }
}

/// Verify that releases == acquisitions after all leases are dropped.
#[tokio::test]
async fn acquisitions_equal_releases_after_cleanup() {
    let config = PoolConfig {
        capacity: 3,
        acquire_timeout: Some(Duration::from_secs(1)),
        ..Default::default()
    };
    let pool = Pool::new(CountingFactory::new(), config).unwrap();

    let mut leases = Vec::new();
    for _ in 0..3 {
        leases.push(pool.acquire().await.unwrap());
    }

    let stats = pool.stats();
    assert_eq!(stats.acquisitions, 3);
    assert_eq!(stats.active, 3);

    drop(leases);
    wait_until(|| pool.stats().releases == 3).await;

    let stats = pool.stats();
    assert_eq!(stats.releases, 3);
    assert_eq!(stats.active, 0);
    assert_eq!(stats.acquisitions, stats.releases);
}

/// Concurrent acquirers never push the pool past its capacity.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_acquirers_respect_capacity() {
    let capacity = 3;
    let config = PoolConfig {
        capacity,
        acquire_timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let pool = Pool::new(CountingFactory::new(), config).unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let lease = pool.acquire().await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            drop(lease);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    wait_until(|| pool.stats().releases == 16).await;

    let stats = pool.stats();
    assert_eq!(stats.acquisitions, 16);
    assert_eq!(stats.active, 0);
    assert!(
        stats.created as usize <= capacity,
        "never more than capacity handles created: {}",
        stats.created
    );
}
