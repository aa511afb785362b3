//! A concurrent map whose values can be demoted to weak references.
//!
//! Values start out strongly held. [`SoftMap::reclaim`] is the memory-pressure
//! hook: it demotes every value to a weak reference and drops the entries whose
//! values nobody else holds. A demoted value that is still alive elsewhere is
//! promoted back to a strong entry the next time it is looked up.

use dashmap::DashMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError, Weak};

enum Slot<V> {
    Strong(Arc<V>),
    Weak(Weak<V>),
}

impl<V> Slot<V> {
    fn demote(self) -> Self {
        match self {
            Slot::Strong(value) => Slot::Weak(Arc::downgrade(&value)),
            weak => weak,
        }
    }

    fn is_live(&self) -> bool {
        match self {
            Slot::Strong(_) => true,
            Slot::Weak(weak) => weak.strong_count() > 0,
        }
    }
}

pub struct SoftMap<K, V> {
    entries: DashMap<K, Slot<V>>,
    writes: Mutex<()>,
    limit: usize,
}

impl<K, V> SoftMap<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(limit: usize) -> Self {
        Self {
            entries: DashMap::new(),
            writes: Mutex::new(()),
            limit,
        }
    }

    /// The value for `key`, or `None` if it was never stored or has been reclaimed.
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        {
            let mut slot = self.entries.get_mut(key)?;
            let value = match &*slot {
                Slot::Strong(value) => return Some(value.clone()),
                Slot::Weak(weak) => weak.upgrade(),
            };
            if let Some(value) = value {
                *slot = Slot::Strong(value.clone());
                return Some(value);
            }
        }
        self.entries.remove_if(key, |_, slot| !slot.is_live());
        None
    }

    /// Stores `value`. Returns true if the map was full and an entry had to be evicted first.
    pub fn insert(&self, key: K, value: Arc<V>) -> bool {
        insert_bounded(&self.entries, &self.writes, self.limit, key, Slot::Strong(value))
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.remove(key)?.1 {
            Slot::Strong(value) => Some(value),
            Slot::Weak(weak) => weak.upgrade(),
        }
    }

    /// Demotes every value and drops the entries nobody else holds. Returns how many were dropped.
    pub fn reclaim(&self) -> usize {
        self.entries.alter_all(|_, slot| slot.demote());
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.is_live());
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// Inserts `value`, first evicting arbitrary entries until a new key fits
/// under `limit`. Writers serialise on `writes`; readers never take it.
/// Returns true if anything was evicted.
pub(crate) fn insert_bounded<K, V>(
    entries: &DashMap<K, V>,
    writes: &Mutex<()>,
    limit: usize,
    key: K,
    value: V,
) -> bool
where
    K: Eq + Hash + Clone,
{
    let _guard = writes.lock().unwrap_or_else(PoisonError::into_inner);
    let mut evicted = false;
    if !entries.contains_key(&key) {
        while entries.len() >= limit.max(1) {
            let Some(victim) = entries.iter().next().map(|entry| entry.key().clone()) else {
                break;
            };
            entries.remove(&victim);
            evicted = true;
        }
    }
    entries.insert(key, value);
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reclaim_drops_unused_values() {
        let map: SoftMap<String, u32> = SoftMap::new(10);
        let held = Arc::new(1);
        map.insert("held".to_string(), held.clone());
        map.insert("loose".to_string(), Arc::new(2));

        assert_eq!(map.reclaim(), 1);
        assert!(map.get("loose").is_none());
        assert_eq!(map.get("held").as_deref(), Some(&1));

        // Promoted back to a strong entry by the lookup.
        drop(held);
        assert_eq!(map.get("held").as_deref(), Some(&1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_insert_honours_limit() {
        let map: SoftMap<u32, u32> = SoftMap::new(2);
        assert!(!map.insert(1, Arc::new(1)));
        assert!(!map.insert(2, Arc::new(2)));
        assert!(!map.insert(2, Arc::new(20)));
        assert!(map.insert(3, Arc::new(3)));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&3).as_deref(), Some(&3));
    }

    #[test]
    fn test_concurrent_inserts_stay_within_limit() {
        let map: SoftMap<u32, u32> = SoftMap::new(3);
        let barrier = std::sync::Barrier::new(8);
        std::thread::scope(|scope| {
            for thread in 0..8u32 {
                let (map, barrier) = (&map, &barrier);
                scope.spawn(move || {
                    for round in 0..200u32 {
                        barrier.wait();
                        map.insert(round * 8 + thread, Arc::new(round));
                        assert!(map.len() <= 3, "len {} after round {}", map.len(), round);
                    }
                });
            }
        });
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_remove_and_clear() {
        let map: SoftMap<u32, &str> = SoftMap::new(4);
        map.insert(1, Arc::new("a"));
        map.insert(2, Arc::new("b"));
        assert_eq!(map.remove(&1).as_deref(), Some(&"a"));
        assert_eq!(map.keys(), vec![2]);
        map.clear();
        assert!(map.is_empty());
    }
}
