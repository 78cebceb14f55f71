//! Relative time labels for the conversation list ("5 minutes ago").
//!
//! Thresholds follow the usual humanized buckets: seconds round to
//! minutes at 45s, minutes to hours at 45m, hours to days at 22h.

use chrono::{DateTime, Local, Utc};

/// Humanized distance from `date` to `now`. Future dates read as "a few seconds ago".
pub fn from_now(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(date) = date else {
        return String::new();
    };

    let secs = (now - date).num_seconds().max(0);
    let minutes = (secs as f64 / 60.0).round() as i64;
    let hours = (secs as f64 / 3600.0).round() as i64;
    let days = (secs as f64 / 86_400.0).round() as i64;

    match secs {
        s if s < 45 => "a few seconds ago".to_string(),
        s if s < 90 => "a minute ago".to_string(),
        s if s < 45 * 60 => format!("{} minutes ago", minutes),
        s if s < 90 * 60 => "an hour ago".to_string(),
        s if s < 22 * 3600 => format!("{} hours ago", hours),
        s if s < 36 * 3600 => "a day ago".to_string(),
        s if s < 26 * 86_400 => format!("{} days ago", days),
        s if s < 45 * 86_400 => "a month ago".to_string(),
        s if s < 320 * 86_400 => format!("{} months ago", (days as f64 / 30.4).round() as i64),
        s if s < 548 * 86_400 => "a year ago".to_string(),
        _ => format!("{} years ago", (days as f64 / 365.25).round() as i64),
    }
}

/// Full local timestamp shown under a message bubble.
pub fn local_timestamp(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_from_now_buckets() {
        let now: DateTime<Utc> = "2025-06-01T12:00:00Z".parse().unwrap();
        let ago = |d: Duration| from_now(Some(now - d), now);

        assert_eq!(ago(Duration::seconds(10)), "a few seconds ago");
        assert_eq!(ago(Duration::seconds(60)), "a minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::minutes(60)), "an hour ago");
        assert_eq!(ago(Duration::hours(3)), "3 hours ago");
        assert_eq!(ago(Duration::hours(30)), "a day ago");
        assert_eq!(ago(Duration::days(4)), "4 days ago");
        assert_eq!(ago(Duration::days(400)), "a year ago");
        assert_eq!(ago(Duration::days(1000)), "3 years ago");
    }

    #[test]
    fn test_from_now_edge_cases() {
        let now: DateTime<Utc> = "2025-06-01T12:00:00Z".parse().unwrap();
        assert_eq!(from_now(None, now), "");
        assert_eq!(
            from_now(Some(now + Duration::minutes(3)), now),
            "a few seconds ago"
        );
    }
}
