//! Tokio-backed [`Clock`].

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::traits::Clock;

/// Wall clock used by watch streams outside of tests.
///
/// Sleeps with `tokio::time::sleep`, so it honours a paused Tokio runtime in
/// `#[tokio::test(start_paused = true)]` tests as well.
///
/// ```rust
/// use towns_bindings::providers::TokioClock;
///
/// let clock = TokioClock::default();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
