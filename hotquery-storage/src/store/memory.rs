//! Process-local [`KvStore`] implementation.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use hotquery_core::{HotqueryResult, StorageError};
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::pattern::GlobPattern;
use super::KvStore;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(VecDeque<String>),
    SortedSet(SortedSet),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::SortedSet(_) => "zset",
        }
    }
}

/// Members keep their first-insertion sequence so that equal scores rank
/// in insertion order.
#[derive(Debug, Clone, Default)]
struct SortedSet {
    members: HashMap<String, (f64, u64)>,
    next_seq: u64,
}

impl SortedSet {
    fn upsert(&mut self, member: &str, score: f64) {
        match self.members.get_mut(member) {
            Some(entry) => entry.0 = score,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.members.insert(member.to_string(), (score, seq));
            }
        }
    }

    fn top(&self, n: usize) -> Vec<(String, f64)> {
        let mut ranked: Vec<(&String, &(f64, u64))> = self.members.iter().collect();
        ranked.sort_by(|a, b| {
            b.1 .0
                .total_cmp(&a.1 .0)
                .then_with(|| a.1 .1.cmp(&b.1 .1))
        });
        ranked
            .into_iter()
            .take(n)
            .map(|(member, (score, _))| (member.clone(), *score))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn persistent(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

fn wrong_type(key: &str, expected: &str, found: &Value) -> StorageError {
    StorageError::WrongType {
        key: key.to_string(),
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

/// In-memory key-value store with lazy expiry.
///
/// Expired entries are dropped when next touched; `db_size` and `scan_keys`
/// skip them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `key` if it has expired, returning the live entry if any.
    fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if entries.get(key).map(|e| e.is_expired(now)).unwrap_or(false) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> HotqueryResult<Option<String>> {
        let mut entries = self.entries.write().await;
        match Self::live(&mut entries, key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(entry) => Err(wrong_type(key, "string", &entry.value).into()),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HotqueryResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> HotqueryResult<bool> {
        let mut entries = self.entries.write().await;
        Ok(Self::live(&mut entries, key).is_some())
    }

    async fn delete(&self, key: &str) -> HotqueryResult<bool> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        Ok(entries
            .remove(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false))
    }

    async fn delete_many(&self, keys: &[String]) -> HotqueryResult<u64> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired(now))
            .count();
        Ok(removed as u64)
    }

    async fn scan_keys(&self, pattern: &str) -> HotqueryResult<Vec<String>> {
        let glob = GlobPattern::compile(pattern)?;
        let entries = self.entries.read().await;
        let now = Instant::now();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob.matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn db_size(&self) -> HotqueryResult<u64> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries.values().filter(|e| !e.is_expired(now)).count() as u64)
    }

    async fn flush_all(&self) -> HotqueryResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> HotqueryResult<u64> {
        let mut entries = self.entries.write().await;
        if Self::live(&mut entries, key).is_none() {
            entries.insert(
                key.to_string(),
                Entry::persistent(Value::List(VecDeque::new())),
            );
        }
        match entries.get_mut(key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => {
                list.push_front(value.to_string());
                Ok(list.len() as u64)
            }
            Some(entry) => Err(wrong_type(key, "list", &entry.value).into()),
            None => Ok(0),
        }
    }

    async fn list_pop(&self, key: &str) -> HotqueryResult<Option<String>> {
        let mut entries = self.entries.write().await;
        let (popped, now_empty) = match Self::live(&mut entries, key) {
            None => return Ok(None),
            Some(Entry {
                value: Value::List(list),
                ..
            }) => {
                let popped = list.pop_back();
                (popped, list.is_empty())
            }
            Some(entry) => return Err(wrong_type(key, "list", &entry.value).into()),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(popped)
    }

    async fn list_len(&self, key: &str) -> HotqueryResult<u64> {
        let mut entries = self.entries.write().await;
        match Self::live(&mut entries, key) {
            None => Ok(0),
            Some(Entry {
                value: Value::List(list),
                ..
            }) => Ok(list.len() as u64),
            Some(entry) => Err(wrong_type(key, "list", &entry.value).into()),
        }
    }

    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> HotqueryResult<()> {
        let mut entries = self.entries.write().await;
        if Self::live(&mut entries, key).is_none() {
            entries.insert(
                key.to_string(),
                Entry::persistent(Value::SortedSet(SortedSet::default())),
            );
        }
        match entries.get_mut(key) {
            Some(Entry {
                value: Value::SortedSet(set),
                ..
            }) => {
                set.upsert(member, score);
                Ok(())
            }
            Some(entry) => Err(wrong_type(key, "zset", &entry.value).into()),
            None => Ok(()),
        }
    }

    async fn sorted_set_top(&self, key: &str, n: usize) -> HotqueryResult<Vec<(String, f64)>> {
        let mut entries = self.entries.write().await;
        match Self::live(&mut entries, key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::SortedSet(set),
                ..
            }) => Ok(set.top(n)),
            Some(entry) => Err(wrong_type(key, "zset", &entry.value).into()),
        }
    }

    async fn sorted_set_score(&self, key: &str, member: &str) -> HotqueryResult<Option<f64>> {
        let mut entries = self.entries.write().await;
        match Self::live(&mut entries, key) {
            None => Ok(None),
            Some(Entry {
                value: Value::SortedSet(set),
                ..
            }) => Ok(set.members.get(member).map(|(score, _)| *score)),
            Some(entry) => Err(wrong_type(key, "zset", &entry.value).into()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hotquery_core::HotqueryError;

    #[tokio::test]
    async fn test_string_round_trip_and_overwrite() {
        let store = MemoryStore::new();
        store.set("k", "v1", None).await.expect("set should succeed");
        store.set("k", "v2", None).await.expect("set should succeed");
        assert_eq!(
            store.get("k").await.expect("get should succeed"),
            Some("v2".to_string())
        );
        assert_eq!(store.get("missing").await.expect("get should succeed"), None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = MemoryStore::new();
        store
            .set("short", "v", Some(Duration::from_millis(20)))
            .await
            .expect("set should succeed");
        store.set("long", "v", None).await.expect("set should succeed");
        assert!(store.exists("short").await.expect("exists should succeed"));

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.get("short").await.expect("get should succeed"), None);
        assert!(!store.delete("short").await.expect("delete should succeed"));
        assert_eq!(store.db_size().await.expect("db_size should succeed"), 1);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = MemoryStore::new();
        store.set("a", "1", None).await.expect("set should succeed");
        assert!(store.delete("a").await.expect("delete should succeed"));
        assert!(!store.delete("a").await.expect("delete should succeed"));

        store.set("b", "1", None).await.expect("set should succeed");
        store.list_push("c", "x").await.expect("push should succeed");
        let removed = store
            .delete_many(&["b".to_string(), "c".to_string(), "d".to_string()])
            .await
            .expect("delete_many should succeed");
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn test_scan_keys() {
        let store = MemoryStore::new();
        for key in ["query:stats:a", "query:stats:b", "query:log:a:1", "other"] {
            store.set(key, "{}", None).await.expect("set should succeed");
        }
        let keys = store
            .scan_keys("query:stats:*")
            .await
            .expect("scan should succeed");
        assert_eq!(keys, vec!["query:stats:a", "query:stats:b"]);
        assert!(store.scan_keys("[").await.is_err());
    }

    #[tokio::test]
    async fn test_list_is_fifo_via_head_push_tail_pop() {
        let store = MemoryStore::new();
        store.list_push("q", "first").await.expect("push should succeed");
        let len = store.list_push("q", "second").await.expect("push should succeed");
        assert_eq!(len, 2);

        assert_eq!(
            store.list_pop("q").await.expect("pop should succeed"),
            Some("first".to_string())
        );
        assert_eq!(
            store.list_pop("q").await.expect("pop should succeed"),
            Some("second".to_string())
        );
        assert_eq!(store.list_pop("q").await.expect("pop should succeed"), None);
        assert!(!store.exists("q").await.expect("exists should succeed"));
    }

    #[tokio::test]
    async fn test_sorted_set_ranking() {
        let store = MemoryStore::new();
        store.sorted_set_add("z", "low", 1.0).await.expect("add should succeed");
        store.sorted_set_add("z", "high", 9.0).await.expect("add should succeed");
        store.sorted_set_add("z", "tie_a", 5.0).await.expect("add should succeed");
        store.sorted_set_add("z", "tie_b", 5.0).await.expect("add should succeed");

        let top = store.sorted_set_top("z", 3).await.expect("top should succeed");
        let members: Vec<&str> = top.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(members, vec!["high", "tie_a", "tie_b"]);

        // Updating a score keeps the original insertion order for ties.
        store.sorted_set_add("z", "tie_a", 5.0).await.expect("add should succeed");
        let top = store.sorted_set_top("z", 10).await.expect("top should succeed");
        assert_eq!(top.len(), 4);
        assert_eq!(top[1].0, "tie_a");

        store.sorted_set_add("z", "low", 10.0).await.expect("add should succeed");
        assert_eq!(
            store.sorted_set_score("z", "low").await.expect("score should succeed"),
            Some(10.0)
        );
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryStore::new();
        store.set("s", "v", None).await.expect("set should succeed");
        let err = store.list_push("s", "x").await.expect_err("push should fail");
        assert!(matches!(
            err,
            HotqueryError::Storage(StorageError::WrongType { .. })
        ));

        store.list_push("l", "x").await.expect("push should succeed");
        assert!(store.get("l").await.is_err());
        assert!(store.sorted_set_top("l", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_flush_all() {
        let store = MemoryStore::new();
        store.set("a", "1", None).await.expect("set should succeed");
        store.list_push("b", "1").await.expect("push should succeed");
        store.sorted_set_add("c", "m", 1.0).await.expect("add should succeed");
        assert_eq!(store.db_size().await.expect("db_size should succeed"), 3);

        store.flush_all().await.expect("flush should succeed");
        assert_eq!(store.db_size().await.expect("db_size should succeed"), 0);
    }
}
