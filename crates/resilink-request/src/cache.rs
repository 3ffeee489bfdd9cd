//! Memoizing cache decorator and its backing store
//!
//! [`CacheStore`] maps string keys to type-erased values stamped with the
//! time they were stored. Entries are never evicted actively; a read that
//! finds an entry older than the reader's `max_age` treats it as a miss and
//! drops it.
//!
//! The store is an explicit object so applications can scope it to their
//! own lifecycle and tests can isolate it. [`CacheStore::global`] is the
//! process-wide instance used by [`CacheConfig::default`]; every decorator
//! built on it shares one key namespace. Unrelated decorated requests whose
//! arguments serialize identically will collide unless they supply
//! distinguishing key functions (see [`CacheConfig::with_prefix`]).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{trace, warn};

use crate::error::RequestResult;
use crate::request::Request;

/// Default maximum age for cached responses
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_millis(60_000);

static GLOBAL_STORE: Lazy<Arc<CacheStore>> = Lazy::new(|| Arc::new(CacheStore::new()));

/// A stored response
#[derive(Clone)]
pub struct CacheEntry {
    /// Key the entry is stored under
    pub key: String,
    /// Type-erased response value
    pub value: Arc<dyn Any + Send + Sync>,
    /// When the entry was stored
    pub stored_at: Instant,
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("stored_at", &self.stored_at)
            .finish_non_exhaustive()
    }
}

impl CacheEntry {
    /// Whether the entry is still live for a reader allowing `max_age`
    pub fn is_live(&self, max_age: Duration, now: Instant) -> bool {
        now.duration_since(self.stored_at) < max_age
    }
}

/// Shared response store backing [`Cached`] requests
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store
    pub fn global() -> Arc<CacheStore> {
        Arc::clone(&GLOBAL_STORE)
    }

    /// Look up a live value of type `T`, evicting the entry if it expired.
    pub fn get<T>(&self, key: &str, max_age: Duration) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            let entry = entries.get(key)?;
            if entry.is_live(max_age, now) {
                return match entry.value.downcast_ref::<T>() {
                    Some(value) => Some(value.clone()),
                    None => {
                        warn!(
                            key,
                            expected = std::any::type_name::<T>(),
                            "Cache key holds a value of another type; treating as miss"
                        );
                        None
                    }
                };
            }
        }

        let mut entries = self.entries.write();
        // Re-check under the write lock; another writer may have refreshed it.
        if entries
            .get(key)
            .is_some_and(|entry| !entry.is_live(max_age, now))
        {
            trace!(key, "Evicting expired cache entry");
            entries.remove(key);
        }
        None
    }

    /// Store `value` under `key`, stamped with the current time.
    pub fn insert<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        let entry = CacheEntry {
            key: key.clone(),
            value: Arc::new(value),
            stored_at: Instant::now(),
        };
        self.entries.write().insert(key, entry);
    }

    /// Remove one entry when `key` is given, otherwise every entry.
    pub fn clear_cache(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.entries.write().remove(key);
            }
            None => self.entries.write().clear(),
        }
    }

    /// Whether an entry exists for `key`, live or not
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of stored entries, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Get store statistics relative to `max_age`
    pub fn statistics(&self, max_age: Duration) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read();
        let expired_entries = entries
            .values()
            .filter(|entry| !entry.is_live(max_age, now))
            .count();

        CacheStats {
            total_entries: entries.len(),
            expired_entries,
            active_entries: entries.len() - expired_entries,
            max_age,
        }
    }
}

/// Clear the process-wide store: one key, or everything when `key` is `None`.
pub fn clear_cache(key: Option<&str>) {
    GLOBAL_STORE.clear_cache(key);
}

/// Cache store statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of entries in the store
    pub total_entries: usize,
    /// Entries older than `max_age`
    pub expired_entries: usize,
    /// Entries younger than `max_age`
    pub active_entries: usize,
    /// Age the statistics were computed against
    pub max_age: Duration,
}

/// Function deriving a cache key from call arguments
pub type CacheKeyFn<A> = Arc<dyn Fn(&A) -> RequestResult<String> + Send + Sync>;

/// Cache decorator configuration
pub struct CacheConfig<A> {
    /// Maximum age of a usable entry
    pub max_age: Duration,
    /// Key derivation; `None` serializes the arguments as JSON
    pub cache_key: Option<CacheKeyFn<A>>,
    /// Backing store
    pub store: Arc<CacheStore>,
}

impl<A> Clone for CacheConfig<A> {
    fn clone(&self) -> Self {
        Self {
            max_age: self.max_age,
            cache_key: self.cache_key.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<A> fmt::Debug for CacheConfig<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("max_age", &self.max_age)
            .field("cache_key", &self.cache_key.as_ref().map(|_| "<fn>"))
            .finish_non_exhaustive()
    }
}

impl<A> Default for CacheConfig<A> {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_CACHE_MAX_AGE,
            cache_key: None,
            store: CacheStore::global(),
        }
    }
}

impl<A> CacheConfig<A> {
    /// Create a configuration backed by the process-wide store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum entry age
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Use a dedicated store instead of the process-wide one
    pub fn with_store(mut self, store: Arc<CacheStore>) -> Self {
        self.store = store;
        self
    }

    /// Derive keys with a custom function
    pub fn with_cache_key<K>(mut self, key: K) -> Self
    where
        K: Fn(&A) -> String + Send + Sync + 'static,
    {
        self.cache_key = Some(Arc::new(move |args: &A| Ok(key(args))));
        self
    }
}

impl<A: Serialize> CacheConfig<A> {
    /// Namespace the default JSON key with `prefix`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.cache_key = Some(Arc::new(move |args: &A| {
            Ok(format!("{prefix}:{}", serde_json::to_string(args)?))
        }));
        self
    }

    fn key_for(&self, args: &A) -> RequestResult<String> {
        match &self.cache_key {
            Some(key) => key(args),
            None => Ok(serde_json::to_string(args)?),
        }
    }
}

/// A request whose responses are memoized in a [`CacheStore`]
pub struct Cached<A, R> {
    inner: Arc<R>,
    config: CacheConfig<A>,
    _args: PhantomData<fn(A)>,
}

impl<A, R> Clone for Cached<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
            _args: PhantomData,
        }
    }
}

impl<A, R> fmt::Debug for Cached<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cached")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<A, R> Cached<A, R> {
    /// Wrap `inner` with response caching
    pub fn new(inner: R, config: CacheConfig<A>) -> Self {
        Self {
            inner: Arc::new(inner),
            config,
            _args: PhantomData,
        }
    }

    /// The backing store
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.config.store
    }
}

impl<A, R> Request<A> for Cached<A, R>
where
    A: Serialize + 'static,
    R: Request<A>,
    R::Response: Clone + Sync,
{
    type Response = R::Response;

    fn call(&self, args: A) -> BoxFuture<'static, RequestResult<R::Response>> {
        let key = match self.config.key_for(&args) {
            Ok(key) => key,
            Err(e) => return async move { Err(e) }.boxed(),
        };

        let store = Arc::clone(&self.config.store);
        if let Some(hit) = store.get::<R::Response>(&key, self.config.max_age) {
            trace!(key = %key, "Cache hit");
            return async move { Ok(hit) }.boxed();
        }

        let call = self.inner.call(args);
        async move {
            let value = call.await?;
            store.insert(key, value.clone());
            Ok(value)
        }
        .boxed()
    }
}

/// Wrap `request` so responses are memoized per `config`.
pub fn with_cache<A, R>(request: R, config: CacheConfig<A>) -> Cached<A, R>
where
    A: Serialize + 'static,
    R: Request<A>,
    R::Response: Clone + Sync,
{
    Cached::new(request, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_lazily_on_read() {
        let store = CacheStore::new();
        store.insert("k", 7u32);

        assert_eq!(store.get::<u32>("k", Duration::from_millis(100)), Some(7));

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(store.contains_key("k"));
        assert_eq!(store.get::<u32>("k", Duration::from_millis(100)), None);
        assert!(!store.contains_key("k"));
    }

    #[test]
    fn test_type_collision_is_a_miss() {
        let store = CacheStore::new();
        store.insert("shared", "text".to_string());

        assert_eq!(store.get::<u32>("shared", DEFAULT_CACHE_MAX_AGE), None);
        // The mistyped read does not evict a live entry
        assert_eq!(
            store.get::<String>("shared", DEFAULT_CACHE_MAX_AGE),
            Some("text".to_string())
        );
    }

    #[test]
    fn test_clear_cache_single_and_all() {
        let store = CacheStore::new();
        store.insert("a", 1u8);
        store.insert("b", 2u8);

        store.clear_cache(Some("a"));
        assert!(!store.contains_key("a"));
        assert_eq!(store.len(), 1);

        store.clear_cache(None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_statistics() {
        let store = CacheStore::new();
        store.insert("old", 1u8);
        tokio::time::advance(Duration::from_secs(2)).await;
        store.insert("new", 2u8);

        let stats = store.statistics(Duration::from_secs(1));
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.active_entries, 1);
    }

    #[test]
    fn test_default_key_is_json_of_arguments() {
        let config = CacheConfig::<(u32, &str)>::new();
        assert_eq!(config.key_for(&(1, "a")).unwrap(), r#"[1,"a"]"#);

        let prefixed = CacheConfig::<(u32, &str)>::new().with_prefix("customers");
        assert_eq!(prefixed.key_for(&(1, "a")).unwrap(), r#"customers:[1,"a"]"#);
    }
}
