use chrono::{DateTime, Duration, Utc};

/// Default staleness window: re-sync a collection after 1 hour.
pub const DEFAULT_STALE_MINUTES: i64 = 60;

/// A value together with the time it was synced.
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.cached_at
    }

    pub fn age_minutes(&self) -> i64 {
        self.age().num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    /// Stale once strictly older than `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aged(minutes: i64) -> CachedData<()> {
        let mut cached = CachedData::new(());
        cached.cached_at = Utc::now() - Duration::minutes(minutes);
        cached
    }

    #[test]
    fn test_age_display() {
        assert_eq!(CachedData::new(()).age_display(), "just now");
        assert_eq!(aged(5).age_display(), "5m ago");
        assert_eq!(aged(60 + 10).age_display(), "1h ago");
        assert_eq!(aged(60 + 45).age_display(), "2h ago");
        assert_eq!(aged(3 * 1440 + 60).age_display(), "3d ago");
        assert_eq!(aged(-5).age_display(), "just now");
    }

    #[test]
    fn test_is_stale_boundaries() {
        let window = Duration::minutes(DEFAULT_STALE_MINUTES);

        let mut just_inside = CachedData::new(());
        just_inside.cached_at = Utc::now() - window + Duration::seconds(5);
        assert!(!just_inside.is_stale(window));

        let mut just_outside = CachedData::new(());
        just_outside.cached_at = Utc::now() - window - Duration::seconds(5);
        assert!(just_outside.is_stale(window));
    }

    #[test]
    fn test_age_minutes() {
        assert!(CachedData::new(()).age_minutes() <= 1);
        assert_eq!(aged(61).age_minutes(), 61);
    }
}
