//! Per-backend health checks (spec §4.8): "a graph-module ping for the
//! graph store, an HTTP GET for the vector store, a model-list GET for the
//! embedding server." Bounded by a timeout with a fixed poll interval.

use cv_core::Result;
use std::time::Duration;

pub async fn graph_ping(url: &str) -> bool {
    let Ok(client) = redis::Client::open(url) else { return false };
    let Ok(mut conn) = redis::aio::ConnectionManager::new(client).await else { return false };
    let result: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
    result.is_ok()
}

pub async fn http_get_ok(url: &str) -> bool {
    reqwest::get(url).await.map(|r| r.status().is_success()).unwrap_or(false)
}

/// Polls `check` until it returns true or `timeout` elapses.
pub async fn wait_until_healthy<F, Fut>(mut check: F, timeout: Duration, poll: Duration) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_until_healthy_returns_true_once_check_passes() {
        let attempts = Arc::new(AtomicU32::new(0));
        let a = attempts.clone();
        let healthy = wait_until_healthy(
            move || {
                let a = a.clone();
                async move { a.fetch_add(1, Ordering::SeqCst) >= 2 }
            },
            Duration::from_millis(200),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert!(healthy);
    }

    #[tokio::test]
    async fn wait_until_healthy_times_out() {
        let healthy = wait_until_healthy(
            || async { false },
            Duration::from_millis(30),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert!(!healthy);
    }
}
