//! Process-wide rate limiters for external dependencies.
//!
//! A [`Throttle`] bounds how many calls are in flight and spaces out call
//! dispatches by a minimum interval. Clones share state, so one throttle
//! built at startup paces every caller of the same dependency.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::trace;

use crate::config::{LimitConfig, LimitsConfig};

/// Concurrency cap plus minimum dispatch spacing.
#[derive(Debug, Clone)]
pub struct Throttle {
    name: &'static str,
    permits: Arc<Semaphore>,
    min_interval: Duration,
    next_slot: Arc<Mutex<Instant>>,
}

impl Throttle {
    pub fn new(name: &'static str, max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            name,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            min_interval,
            next_slot: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn from_config(name: &'static str, config: &LimitConfig) -> Self {
        Self::new(
            name,
            config.max_concurrent,
            Duration::from_millis(config.min_interval_ms),
        )
    }

    /// A throttle that never waits (for tests).
    pub fn unlimited(name: &'static str) -> Self {
        Self::new(name, Semaphore::MAX_PERMITS, Duration::ZERO)
    }

    /// Run `task` once a permit and a dispatch slot are available.
    ///
    /// The permit is held until `task` resolves, whatever its outcome.
    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("throttle semaphore is never closed");

        let wait = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let start = (*next).max(now);
            *next = start + self.min_interval;
            start - now
        };

        if !wait.is_zero() {
            trace!(throttle = self.name, wait_ms = wait.as_millis() as u64, "pacing call");
            tokio::time::sleep(wait).await;
        }

        task.await
    }
}

/// The three long-lived limiters, one per external dependency.
#[derive(Debug, Clone)]
pub struct Limiters {
    pub llm: Throttle,
    pub search: Throttle,
    pub scraping: Throttle,
}

impl Limiters {
    pub fn from_config(config: &LimitsConfig) -> Self {
        Self {
            llm: Throttle::from_config("llm", &config.llm),
            search: Throttle::from_config("search", &config.search),
            scraping: Throttle::from_config("scraping", &config.scraping),
        }
    }
}
