//! Client-side request pacing shared by the hosted providers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use finquery_core::FinqueryResult;
use tokio::sync::{Semaphore, SemaphorePermit};

use super::request_failed;

/// Bounds in-flight requests and spaces consecutive requests evenly across
/// a per-minute budget.
#[derive(Debug)]
pub struct RequestPacer {
    permits: Semaphore,
    last_request_ms: AtomicU64,
    min_interval_ms: u64,
    start: Instant,
}

impl RequestPacer {
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        Self {
            permits: Semaphore::new(rpm as usize),
            last_request_ms: AtomicU64::new(0),
            min_interval_ms: (60_000 / rpm as u64).max(10),
            start: Instant::now(),
        }
    }

    /// Wait for a permit and for the minimum interval since the previous
    /// request. Hold the returned permit for the duration of the request.
    pub async fn acquire(&self, provider: &str) -> FinqueryResult<SemaphorePermit<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| request_failed(provider, 0, format!("Rate limiter error: {}", e)))?;

        let now_ms = self.start.elapsed().as_millis() as u64;
        let last_ms = self.last_request_ms.load(Ordering::Relaxed);
        let elapsed = now_ms.saturating_sub(last_ms);
        if last_ms != 0 && elapsed < self.min_interval_ms {
            tokio::time::sleep(Duration::from_millis(self.min_interval_ms - elapsed)).await;
        }
        self.last_request_ms
            .store(self.start.elapsed().as_millis().max(1) as u64, Ordering::Relaxed);

        Ok(permit)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_budget() {
        assert_eq!(RequestPacer::new(60).min_interval(), Duration::from_secs(1));
        assert_eq!(RequestPacer::new(0).min_interval(), Duration::from_secs(60));
        assert_eq!(RequestPacer::new(100_000).min_interval(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_first_request_is_not_delayed() {
        let pacer = RequestPacer::new(1);
        let started = Instant::now();
        let _permit = pacer.acquire("test").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
