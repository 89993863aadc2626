//! EventCache and PersistentStore tests

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use beacon_client::cache::EventCache;
use beacon_client::codec;
use beacon_client::error::{RestoreError, StoreError, StoreResult};
use beacon_client::event::Event;
use beacon_client::queue::EventQueue;
use beacon_client::store::{DurabilityHook, FileStore, MemoryStore, PersistentStore};

fn sorted_pairs(events: &[Event]) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = events
        .iter()
        .map(|e| (e.event_type.clone(), e.data.clone()))
        .collect();
    pairs.sort();
    pairs
}

#[derive(Default)]
struct CountingHook {
    commits: AtomicUsize,
}

impl DurabilityHook for CountingHook {
    fn commit(&self, path: &Path) -> StoreResult<()> {
        assert!(path.exists(), "commit must follow a completed write");
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingHook;

impl DurabilityHook for FailingHook {
    fn commit(&self, _path: &Path) -> StoreResult<()> {
        Err(StoreError::Commit("sync rejected".to_string()))
    }
}

/// A store whose every operation fails
struct BrokenStore;

impl PersistentStore for BrokenStore {
    fn save(&self, _bytes: &[u8]) -> StoreResult<()> {
        Err(StoreError::Write {
            path: "/dev/full/analytics_cache".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        Err(StoreError::Read {
            path: "/dev/full/analytics_cache".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[test]
fn test_file_store_absent_before_first_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());

    assert!(store.load().unwrap().is_none());
}

#[test]
fn test_file_store_overwrites_wholesale() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());

    store.save(br#"{"events":[{"type":"a","data":"1"},{"type":"b","data":"2"}]}"#).unwrap();
    store.save(b"{}").unwrap();

    assert_eq!(store.load().unwrap().unwrap(), b"{}".to_vec());
    assert!(!dir.path().join("analytics_cache.tmp").exists());
}

#[test]
fn test_file_store_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("app").join("data");
    let store = FileStore::in_dir(&nested);

    store.save(b"{}").unwrap();

    assert!(nested.join("analytics_cache").exists());
}

#[test]
fn test_file_store_calls_durability_hook_after_each_write() {
    let dir = tempfile::tempdir().unwrap();
    let hook = Arc::new(CountingHook::default());
    let store = FileStore::in_dir(dir.path()).with_durability_hook(hook.clone());

    store.save(b"{}").unwrap();
    store.save(b"{}").unwrap();

    assert_eq!(hook.commits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_file_store_read_error_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    // A directory in place of the slot cannot be read as a file
    std::fs::create_dir(dir.path().join("analytics_cache")).unwrap();
    let store = FileStore::in_dir(dir.path());

    assert!(matches!(store.load(), Err(StoreError::Read { .. })));
}

#[test]
fn test_persist_writes_current_queue() {
    let store = Arc::new(MemoryStore::new());
    let cache = EventCache::new(store.clone());
    let queue = EventQueue::new();

    queue.add(Event::new("levelStart", "level:3"));
    assert!(cache.persist(&queue));

    let saved = store.load().unwrap().unwrap();
    assert_eq!(codec::decode(&saved).unwrap(), vec![Event::new("levelStart", "level:3")]);
    assert_eq!(cache.stats().saves, 1);
    assert!(cache.stats().last_saved_at.is_some());
}

#[test]
fn test_persisting_twice_then_loading_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let cache = EventCache::new(Arc::new(FileStore::in_dir(dir.path())));
    let queue = EventQueue::new();
    queue.add(Event::new("getReward", "coins:100"));
    queue.add(Event::new("coinSpent", "count:3"));
    queue.add(Event::new("coinSpent", "count:3"));

    cache.persist(&queue);
    cache.persist(&queue);

    let restored = EventQueue::new();
    let fresh = EventCache::new(Arc::new(FileStore::in_dir(dir.path())));
    assert_eq!(fresh.restore_into(&restored), 3);
    assert_eq!(sorted_pairs(&restored.events()), sorted_pairs(&queue.events()));
}

#[test]
fn test_write_failure_is_absorbed() {
    let cache = EventCache::new(Arc::new(BrokenStore));
    let queue = EventQueue::new();
    queue.add(Event::new("a", "b"));

    assert!(!cache.persist(&queue));
    assert_eq!(queue.len(), 1);

    let stats = cache.stats();
    assert_eq!(stats.saves, 0);
    assert_eq!(stats.save_failures, 1);
    assert_eq!(stats.backend, "broken");
}

#[test]
fn test_commit_failure_counts_as_failed_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path()).with_durability_hook(Arc::new(FailingHook));
    let cache = EventCache::new(Arc::new(store));
    let queue = EventQueue::new();
    queue.add(Event::new("a", "b"));

    assert!(!cache.persist(&queue));
    assert_eq!(cache.stats().save_failures, 1);
}

#[test]
fn test_read_failure_degrades_to_empty() {
    let cache = EventCache::new(Arc::new(BrokenStore));
    let queue = EventQueue::new();

    assert!(matches!(cache.load_events(), Err(RestoreError::Store(_))));
    assert_eq!(cache.restore_into(&queue), 0);
    assert!(queue.is_empty());
}

#[test]
fn test_malformed_cache_degrades_to_empty() {
    let cache = EventCache::new(Arc::new(MemoryStore::with_content("{\"events\": [")));
    let queue = EventQueue::new();

    assert!(matches!(cache.load_events(), Err(RestoreError::Codec(_))));
    assert_eq!(cache.restore_into(&queue), 0);
    assert!(queue.is_empty());
}

#[test]
fn test_concurrent_persists_leave_latest_state() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(EventCache::new(store.clone()));
    let queue = Arc::new(EventQueue::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for i in 0..25 {
                    queue.add(Event::new("tick", format!("{}:{}", t, i)));
                    cache.persist(&queue);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let saved = codec::decode(&store.load().unwrap().unwrap()).unwrap();
    assert_eq!(saved.len(), 200);
}
