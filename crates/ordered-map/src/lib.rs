//! Insertion-ordered map used for every keyed collection of a model.
//!
//! Backed by an [`IndexMap`], so the hash index and the order list can never
//! disagree. Two upserts are offered:
//!
//! - [`OrderedMap::set`] replaces in place and keeps the key's position;
//! - [`OrderedMap::add`] moves an existing key to the end.
//!
//! Iteration ([`OrderedMap::all`], [`OrderedMap::keys`],
//! [`OrderedMap::values`], [`OrderedMap::all_ordered`]) walks a snapshot of the
//! key order taken at call time. Callers that need to mutate the map between
//! steps take a detached [`Cursor`] instead.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use docmodel_json_pointer::{
    KeyNavigable, MapLike, Navigable, StepError, Structure, Target,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Iteration order for [`OrderedMap::all_ordered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Insertion,
    ReverseInsertion,
    /// Ascending by the key's string rendering.
    KeyAsc,
    /// Descending by the key's string rendering.
    KeyDesc,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(
    serialize = "K: Serialize + Hash + Eq, V: Serialize",
    deserialize = "K: Deserialize<'de> + Hash + Eq, V: Deserialize<'de>"
))]
pub struct OrderedMap<K, V> {
    inner: IndexMap<K, V>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            inner: IndexMap::default(),
        }
    }
}

impl<K, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Entry at `index` in insertion order.
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        self.inner.get_index(index)
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.inner.first()
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        self.inner.last()
    }
}

impl<K: Hash + Eq, V> OrderedMap<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: IndexMap::with_capacity(capacity),
        }
    }

    /// Upserts `key`. An existing key keeps its position.
    ///
    /// Returns the previous value, if any.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    /// Upserts `key` and moves it to the end.
    pub fn add(&mut self, key: K, value: V) -> Option<V> {
        let previous = self.inner.shift_remove(&key);
        self.inner.insert(key, value);
        previous
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get_mut(key)
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(key)
    }

    /// Insertion index of `key`.
    pub fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get_index_of(key)
    }

    /// Removes `key`, closing the gap in the order.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.shift_remove(key)
    }

    /// Keeps only the entries `keep` accepts, preserving order.
    pub fn retain(&mut self, keep: impl FnMut(&K, &mut V) -> bool) {
        self.inner.retain(keep);
    }

    /// Same length and the same pairs in the same order, under `eq`.
    pub fn is_equal_with(&self, other: &Self, mut eq: impl FnMut(&V, &V) -> bool) -> bool {
        self.len() == other.len()
            && self
                .inner
                .iter()
                .zip(other.inner.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && eq(va, vb))
    }

    /// Like [`OrderedMap::is_equal`], but an absent map equals an empty one.
    pub fn is_equal_opt(a: Option<&Self>, b: Option<&Self>) -> bool
    where
        V: PartialEq,
    {
        match (a, b) {
            (Some(a), Some(b)) => a.is_equal(b),
            (Some(m), None) | (None, Some(m)) => m.is_empty(),
            (None, None) => true,
        }
    }

    pub fn is_equal(&self, other: &Self) -> bool
    where
        V: PartialEq,
    {
        self.is_equal_with(other, |a, b| a == b)
    }
}

impl<K: Hash + Eq + Clone, V> OrderedMap<K, V> {
    /// Entries in insertion order, over a snapshot of the keys.
    pub fn all(&self) -> Iter<'_, K, V> {
        Iter::new(self, self.inner.keys().cloned().collect())
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { iter: self.all() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { iter: self.all() }
    }

    /// Entries in the requested order. Key orders compare string renderings.
    pub fn all_ordered(&self, order: Order) -> Iter<'_, K, V>
    where
        K: fmt::Display,
    {
        let mut keys: Vec<K> = self.inner.keys().cloned().collect();
        match order {
            Order::Insertion => {}
            Order::ReverseInsertion => keys.reverse(),
            Order::KeyAsc | Order::KeyDesc => {
                let mut rendered: Vec<(String, K)> =
                    keys.into_iter().map(|k| (k.to_string(), k)).collect();
                rendered.sort_by(|a, b| a.0.cmp(&b.0));
                if order == Order::KeyDesc {
                    rendered.reverse();
                }
                keys = rendered.into_iter().map(|(_, k)| k).collect();
            }
        }
        Iter::new(self, keys)
    }

    /// A detached snapshot of the key order that does not borrow the map.
    pub fn cursor(&self) -> Cursor<K> {
        Cursor {
            keys: self.inner.keys().cloned().collect(),
            pos: 0,
        }
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.iter()).finish()
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    /// Later duplicates overwrite in place, as with [`OrderedMap::set`].
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for OrderedMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = indexmap::map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

// ── Iteration ───────────────────────────────────────────────────────────────

/// Snapshot iterator over `(key, value)` pairs.
///
/// A clone continues from the same position; [`Iter::restart`] rewinds to the
/// start of the snapshot.
pub struct Iter<'a, K, V> {
    map: &'a OrderedMap<K, V>,
    keys: Vec<K>,
    pos: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(map: &'a OrderedMap<K, V>, keys: Vec<K>) -> Self {
        Self { map, keys, pos: 0 }
    }

    pub fn restart(&mut self) {
        self.pos = 0;
    }
}

impl<K: Clone, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            map: self.map,
            keys: self.keys.clone(),
            pos: self.pos,
        }
    }
}

impl<'a, K: Hash + Eq, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(key) = self.keys.get(self.pos) {
            self.pos += 1;
            if let Some(entry) = self.map.inner.get_key_value(key) {
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.keys.len() - self.pos))
    }
}

#[derive(Clone)]
pub struct Keys<'a, K, V> {
    iter: Iter<'a, K, V>,
}

impl<'a, K: Hash + Eq, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(k, _)| k)
    }
}

#[derive(Clone)]
pub struct Values<'a, K, V> {
    iter: Iter<'a, K, V>,
}

impl<'a, K: Hash + Eq, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, v)| v)
    }
}

/// Key-order snapshot that is advanced against the live map.
///
/// Keys deleted after the snapshot are skipped; keys added after it are not
/// observed. No key is yielded twice.
#[derive(Debug, Clone)]
pub struct Cursor<K> {
    keys: Vec<K>,
    pos: usize,
}

impl<K: Hash + Eq> Cursor<K> {
    pub fn next<'m, V>(&mut self, map: &'m OrderedMap<K, V>) -> Option<(&'m K, &'m V)> {
        while let Some(key) = self.keys.get(self.pos) {
            self.pos += 1;
            if let Some(entry) = map.inner.get_key_value(key) {
                return Some(entry);
            }
        }
        None
    }

    pub fn restart(&mut self) {
        self.pos = 0;
    }

    pub fn remaining(&self) -> usize {
        self.keys.len() - self.pos
    }
}

// ── Navigation ──────────────────────────────────────────────────────────────

impl<V: Navigable> Navigable for OrderedMap<String, V> {
    fn structure(&self) -> Structure<'_> {
        Structure::Map(self)
    }

    fn as_key_navigable(&self) -> Option<&dyn KeyNavigable> {
        Some(self)
    }
}

impl<V: Navigable> KeyNavigable for OrderedMap<String, V> {
    fn navigate_key(&self, key: &str) -> Result<Target<'_>, StepError> {
        self.get(key)
            .map(|v| Target::Value(v as &dyn Navigable))
            .ok_or(StepError::NotFound)
    }
}

impl<V: Navigable> MapLike for OrderedMap<String, V> {
    fn get_entry(&self, key: &str) -> Option<&dyn Navigable> {
        self.get(key).map(|v| v as &dyn Navigable)
    }
}
