//! Timestamp utilities

use chrono::{DateTime, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC calendar date
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Seconds since the Unix epoch
pub fn now_seconds() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        // Should be reasonably recent (before year 2100)
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[tokio::test]
    async fn test_now_millis_advances() {
        let first = now_millis();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = now_millis();
        assert!(second > first);
    }

    #[test]
    fn test_seconds_and_millis_agree() {
        let secs = now_seconds();
        let millis = now_millis();
        assert!((millis / 1000 - secs).abs() <= 1);
    }

    #[test]
    fn test_today_matches_now() {
        let date = today();
        let stamp = now().date_naive();
        // Could straddle midnight, but never by more than a day
        assert!((stamp - date).num_days().abs() <= 1);
    }
}
