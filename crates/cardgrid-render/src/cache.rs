//! Keyed caches with an in-flight registry.
//!
//! Every key maps to a [`OnceCell`]: the first caller runs the producer, callers
//! arriving while it runs await the same result, and a failed producer leaves
//! the cell empty so the next caller retries. A producer that finishes after
//! [`OnceMap::clear`] puts its value back unless the key was claimed again.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::OnceCell;

use cardgrid_core::CardResult;

use crate::texture::Texture;

/// Outcome of [`OnceMap::get_or_try_insert_with`].
#[derive(Debug, Clone)]
pub struct Fetched<V> {
    pub value: V,
    /// The value already existed or another caller produced it.
    pub hit: bool,
    /// The map holds this value. `false` only when the map was cleared while
    /// the value was being produced and the key has since been claimed again.
    pub tracked: bool,
}

/// A map from key to a value produced at most once per key.
pub struct OnceMap<K, V> {
    cells: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    /// The finished value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Store a finished value, replacing whatever was there.
    pub fn put(&self, key: K, value: V) {
        self.cells.insert(key, Arc::new(OnceCell::new_with(Some(value))));
    }

    /// Return the value for `key`, producing it with `init` if absent.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: K, init: F) -> CardResult<Fetched<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CardResult<V>>,
    {
        let cell = self
            .cells
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        if let Some(value) = cell.get() {
            return Ok(Fetched {
                value: value.clone(),
                hit: true,
                tracked: true,
            });
        }
        let mut produced = false;
        let value = cell
            .get_or_try_init(|| {
                produced = true;
                init()
            })
            .await?
            .clone();
        let tracked = match self.cells.entry(key) {
            Entry::Occupied(slot) => Arc::ptr_eq(slot.get(), &cell),
            Entry::Vacant(slot) => {
                slot.insert(cell);
                true
            }
        };
        Ok(Fetched {
            value,
            hit: !produced,
            tracked,
        })
    }

    /// Number of finished values.
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every finished value.
    pub fn values(&self) -> Vec<V> {
        self.cells
            .iter()
            .filter_map(|cell| cell.value().get().cloned())
            .collect()
    }

    /// Snapshot of every finished (key, value) pair.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.cells
            .iter()
            .filter_map(|cell| cell.value().get().map(|v| (cell.key().clone(), v.clone())))
            .collect()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.cells.clear();
    }
}

impl<K, V> Default for OnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Content fingerprint → texture. No eviction; [`TextureCache::clear`] is the
/// only teardown.
#[derive(Default)]
pub struct TextureCache {
    map: OnceMap<String, Texture>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Texture> {
        self.map.get(&key.to_string())
    }

    pub fn put(&self, key: impl Into<String>, texture: Texture) {
        self.map.put(key.into(), texture);
    }

    /// Cached texture for `key`, or the one `draw` produces. Concurrent calls
    /// for the same key share a single draw.
    pub async fn get_or_try_insert_with<F, Fut>(&self, key: &str, draw: F) -> CardResult<Texture>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CardResult<Texture>>,
    {
        let Fetched { value: texture, hit, .. } = self.map.get_or_try_insert_with(key.to_string(), draw).await?;
        if hit {
            tracing::debug!("texture cache hit: {}", key);
        } else {
            tracing::debug!("texture cache miss, drew: {}", key);
        }
        Ok(texture)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&self) {
        self.map.clear();
    }
}
