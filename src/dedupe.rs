use moka::future::Cache;
use std::time::Duration;

/// Remembers call ids that already produced a row.
///
/// Bounded and expiring: the oldest/least-used ids are evicted once
/// `max_entries` is reached and every id is forgotten after `ttl`.
/// The check and the insert happen in one cache-entry operation, so two
/// concurrent deliveries of the same call cannot both win.
#[derive(Clone)]
pub struct CallDeduplicator {
    seen: Cache<String, ()>,
}

impl CallDeduplicator {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Records `call_id` and returns `true` if it had not been seen before.
    pub async fn first_sighting(&self, call_id: &str) -> bool {
        self.seen
            .entry(call_id.to_string())
            .or_insert(())
            .await
            .is_fresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_second_sighting_is_duplicate() {
        let dedupe = CallDeduplicator::new(100, Duration::from_secs(60));

        assert!(dedupe.first_sighting("call-abc").await);
        assert!(!dedupe.first_sighting("call-abc").await);
        assert!(dedupe.first_sighting("call-def").await);
    }

    #[tokio::test]
    async fn test_concurrent_sightings_have_one_winner() {
        let dedupe = Arc::new(CallDeduplicator::new(100, Duration::from_secs(60)));

        let mut handles = vec![];
        for _ in 0..16 {
            let dedupe = dedupe.clone();
            handles.push(tokio::spawn(async move {
                dedupe.first_sighting("call-race").await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_ids_expire() {
        let dedupe = CallDeduplicator::new(100, Duration::from_millis(50));

        assert!(dedupe.first_sighting("call-ttl").await);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(dedupe.first_sighting("call-ttl").await);
    }
}
