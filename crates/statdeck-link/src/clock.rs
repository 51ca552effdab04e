//! Time helpers shared by the async drivers.
//!
//! The state machines in `statdeck-core` take `std::time::Instant`.  Reading
//! the time through tokio keeps them in step with tokio's clock, which tests
//! pause and advance manually.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// The current instant according to tokio's clock.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Sleeps until `deadline` on tokio's clock.
pub async fn sleep_until(deadline: Instant) {
    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
}

/// Sleeps until `deadline`, or forever when there is none.
///
/// Handy as a `tokio::select!` branch for optional timers.
pub async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Wall-clock milliseconds since the Unix epoch, as carried in `timestamp`
/// fields.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_now_follows_paused_clock() {
        let before = now();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(now() - before, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_until_wakes_at_deadline() {
        let deadline = now() + Duration::from_millis(1500);
        sleep_until(deadline).await;
        assert!(now() >= deadline);
    }

    #[test]
    fn test_epoch_millis_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(epoch_millis() > 1_577_836_800_000);
    }
}
