//! In-process backend with sorted-set and pub/sub semantics

use super::{OrderStore, TickPublisher};
use crate::Error;
use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tokio::sync::broadcast;

/// Per-channel buffer for slow subscribers
const CHANNEL_CAPACITY: usize = 4096;

/// Totally ordered score
#[derive(Debug, Copy, Clone)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Members ordered by `(score, member)`, unique by member
#[derive(Debug, Default)]
struct SortedSet {
    scores: AHashMap<String, f64>,
    ordered: BTreeSet<(Score, String)>,
}

impl SortedSet {
    fn insert(&mut self, score: f64, member: String) {
        if let Some(old) = self.scores.insert(member.clone(), score) {
            self.ordered.remove(&(Score(old), member.clone()));
        }
        self.ordered.insert((Score(score), member));
    }

    fn range(&self, min: f64, max: f64) -> Vec<String> {
        self.ordered
            .range((Score(min), String::new())..)
            .take_while(|(score, _)| score.0 <= max)
            .map(|(_, member)| member.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }
}

/// In-memory order set and tick channel
///
/// Behaves like the Redis commands it stands in for: `ZADD` updates the
/// score of an existing member, ranges are inclusive and ascending, and a
/// publish reaches only subscribers that are attached at that moment.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: RwLock<AHashMap<String, SortedSet>>,
    channels: Mutex<AHashMap<String, broadcast::Sender<String>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a subscriber to `channel`
    ///
    /// The receiver sees every message published after this call.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Number of members in `key`
    pub fn len(&self, key: &str) -> usize {
        self.sets.read().get(key).map_or(0, SortedSet::len)
    }

    /// Whether `key` holds no members
    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }

    /// Every member of `key` with its score, ascending
    pub fn entries(&self, key: &str) -> Vec<(f64, String)> {
        self.sets
            .read()
            .get(key)
            .map(|set| {
                set.ordered
                    .iter()
                    .map(|(score, member)| (score.0, member.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_score(score: f64) -> crate::Result<()> {
        if score.is_nan() {
            return Err(Error::Store("score is not a valid float".to_string()));
        }
        Ok(())
    }
}

impl OrderStore for MemoryStore {
    async fn insert(&self, key: &str, score: f64, member: String) -> crate::Result<()> {
        Self::check_score(score)?;
        self.sets
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(score, member);
        Ok(())
    }

    async fn insert_batch(&self, key: &str, entries: Vec<(f64, String)>) -> crate::Result<()> {
        for (score, _) in &entries {
            Self::check_score(*score)?;
        }

        let mut sets = self.sets.write();
        let set = sets.entry(key.to_string()).or_default();
        for (score, member) in entries {
            set.insert(score, member);
        }
        Ok(())
    }

    async fn range_by_score(&self, key: &str, min: f64, max: f64) -> crate::Result<Vec<String>> {
        Ok(self
            .sets
            .read()
            .get(key)
            .map(|set| set.range(min, max))
            .unwrap_or_default())
    }

    async fn cardinality(&self, key: &str) -> crate::Result<usize> {
        Ok(self.len(key))
    }
}

impl TickPublisher for MemoryStore {
    async fn publish(&self, channel: &str, payload: String) -> crate::Result<usize> {
        let sender = self.channels.lock().get(channel).cloned();
        // No subscribers is not an error; the message is simply lost
        Ok(sender.and_then(|tx| tx.send(payload).ok()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_range_is_ordered_and_inclusive() {
        let store = MemoryStore::new();

        store.insert("s", 120.0, "c".to_string()).await.unwrap();
        store.insert("s", 60.0, "a".to_string()).await.unwrap();
        store.insert("s", 90.0, "b".to_string()).await.unwrap();

        let members = store.range_by_score("s", 60.0, 90.0).await.unwrap();
        assert_eq!(members, vec!["a", "b"]);

        let all = store
            .range_by_score("s", f64::NEG_INFINITY, f64::INFINITY)
            .await
            .unwrap();
        assert_eq!(all, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_duplicate_scores_kept() {
        let store = MemoryStore::new();

        store.insert("s", 75.0, "x".to_string()).await.unwrap();
        store.insert("s", 75.0, "y".to_string()).await.unwrap();

        assert_eq!(store.cardinality("s").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reinsert_updates_score() {
        let store = MemoryStore::new();

        store.insert("s", 75.0, "x".to_string()).await.unwrap();
        store.insert("s", 140.0, "x".to_string()).await.unwrap();

        assert_eq!(store.len("s"), 1);
        assert_eq!(store.entries("s"), vec![(140.0, "x".to_string())]);
    }

    #[tokio::test]
    async fn test_nan_score_rejected() {
        let store = MemoryStore::new();

        let err = store.insert("s", f64::NAN, "x".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));

        let batch = vec![(1.0, "a".to_string()), (f64::NAN, "b".to_string())];
        assert!(store.insert_batch("s", batch).await.is_err());
        assert!(store.is_empty("s"));
    }

    #[tokio::test]
    async fn test_missing_key_is_empty() {
        let store = MemoryStore::new();

        assert_eq!(store.cardinality("nope").await.unwrap(), 0);
        assert!(store.range_by_score("nope", 0.0, 1.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let store = MemoryStore::new();

        assert_eq!(store.publish("ch", "hello".to_string()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_publish_reaches_live_subscribers_only() {
        let store = MemoryStore::new();

        store.publish("ch", "before".to_string()).await.unwrap();

        let mut first = store.subscribe("ch");
        let mut second = store.subscribe("ch");
        let delivered = store.publish("ch", "after".to_string()).await.unwrap();

        assert_eq!(delivered, 2);
        assert_eq!(first.recv().await.unwrap(), "after");
        assert_eq!(second.recv().await.unwrap(), "after");
        assert!(first.try_recv().is_err());
    }
}
