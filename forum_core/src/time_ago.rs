use chrono::{DateTime, Utc};

fn ago(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// Human-readable age of `created` as seen at `now`, e.g. "3 hours ago".
pub fn time_ago(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        ago(minutes, "minute")
    } else if hours < 24 {
        ago(hours, "hour")
    } else if days < 7 {
        ago(days, "day")
    } else if days < 30 {
        ago(days / 7, "week")
    } else if days < 365 {
        ago(days / 30, "month")
    } else {
        ago(days / 365, "year")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(offset: Duration) -> String {
        let now = Utc::now();
        time_ago(now - offset, now)
    }

    #[test]
    fn test_buckets() {
        assert_eq!(at(Duration::seconds(20)), "just now");
        assert_eq!(at(Duration::minutes(1)), "1 minute ago");
        assert_eq!(at(Duration::minutes(59)), "59 minutes ago");
        assert_eq!(at(Duration::hours(3)), "3 hours ago");
        assert_eq!(at(Duration::days(1)), "1 day ago");
        assert_eq!(at(Duration::days(13)), "1 week ago");
        assert_eq!(at(Duration::days(45)), "1 month ago");
        assert_eq!(at(Duration::days(800)), "2 years ago");
    }

    #[test]
    fn test_future_timestamps_read_as_just_now() {
        assert_eq!(at(Duration::minutes(-5)), "just now");
    }
}
