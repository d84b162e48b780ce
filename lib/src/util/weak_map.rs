use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

/// Key that may refer to something which has since been dropped
pub trait WeakKey: Hash + Eq {
    fn is_live(&self) -> bool;
}

/// Concurrent map whose entries disappear once their key is no longer live
///
/// Dead entries are swept every `SWEEP_INTERVAL` insertions and on [`WeakKeyedMap::purge`].
/// Insertion is first-writer-wins: when two threads race to insert the same key, the loser gets
/// back the winner's value and its own is dropped.
pub struct WeakKeyedMap<K, V> {
    inner: RwLock<Inner<K, V>>,
}

struct Inner<K, V> {
    entries: HashMap<K, V>,
    inserts_since_sweep: usize,
}

impl<K: WeakKey, V: Clone> WeakKeyedMap<K, V> {
    const SWEEP_INTERVAL: usize = 256;

    pub fn new() -> WeakKeyedMap<K, V> {
        WeakKeyedMap {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                inserts_since_sweep: 0,
            }),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().entries.get(key).cloned()
    }

    /// Insert a value unless the key is already present, returning the value that ends up stored
    pub fn insert(&self, key: K, value: V) -> V {
        let mut inner = self.inner.write();

        inner.inserts_since_sweep += 1;
        if inner.inserts_since_sweep >= Self::SWEEP_INTERVAL {
            let removed = Self::sweep(&mut inner);
            if removed > 0 {
                log::debug!("Swept {} entries with unloaded keys", removed);
            }
        }

        inner.entries.entry(key).or_insert(value).clone()
    }

    /// Remove every entry whose key is no longer live, returning how many were removed
    pub fn purge(&self) -> usize {
        Self::sweep(&mut self.inner.write())
    }

    /// Remove every entry whose key matches the predicate
    pub fn remove_where(&self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !predicate(key));
        before - inner.entries.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(inner: &mut Inner<K, V>) -> usize {
        let before = inner.entries.len();
        inner.entries.retain(|key, _| key.is_live());
        inner.inserts_since_sweep = 0;
        before - inner.entries.len()
    }
}

impl<K: WeakKey, V: Clone> Default for WeakKeyedMap<K, V> {
    fn default() -> Self {
        WeakKeyedMap::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Weak};

    #[derive(Clone)]
    struct Key(Weak<u32>);

    impl PartialEq for Key {
        fn eq(&self, other: &Key) -> bool {
            self.0.ptr_eq(&other.0)
        }
    }
    impl Eq for Key {}
    impl Hash for Key {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            std::ptr::hash(self.0.as_ptr(), state)
        }
    }
    impl WeakKey for Key {
        fn is_live(&self) -> bool {
            self.0.strong_count() > 0
        }
    }

    #[test]
    fn first_writer_wins() {
        let map = WeakKeyedMap::new();
        let target = Arc::new(1);
        let key = Key(Arc::downgrade(&target));

        assert_eq!(map.insert(key.clone(), "first"), "first");
        assert_eq!(map.insert(key.clone(), "second"), "first");
        assert_eq!(map.get(&key), Some("first"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn purge_drops_dead_keys() {
        let map = WeakKeyedMap::new();
        let kept = Arc::new(1);
        let dropped = Arc::new(2);
        map.insert(Key(Arc::downgrade(&kept)), 'k');
        map.insert(Key(Arc::downgrade(&dropped)), 'd');

        drop(dropped);
        assert_eq!(map.purge(), 1);
        assert_eq!(map.get(&Key(Arc::downgrade(&kept))), Some('k'));
    }

    #[test]
    fn inserts_sweep_periodically() {
        let map = WeakKeyedMap::new();
        for i in 0..1000 {
            let target = Arc::new(i);
            map.insert(Key(Arc::downgrade(&target)), i);
        }
        assert!(map.len() < 300);
    }
}
