//! A map that also indexes its entries by value.

use crate::error::{OptResult, OptimizerError};
use rustc_hash::{FxHashMap, FxHashSet};
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

/// Key to value map with a reverse index from each value to the keys mapped
/// to it.
///
/// After every operation, `references[v] == {k | values[k] == v}`, and no
/// reverse entry is ever empty.
#[derive(Clone, PartialEq, Eq)]
pub struct BidirectionalMap<T: Eq + Hash + Clone> {
    values: FxHashMap<T, T>,
    references: FxHashMap<T, FxHashSet<T>>,
}

impl<T: Eq + Hash + Clone> Default for BidirectionalMap<T> {
    fn default() -> Self {
        Self {
            values: FxHashMap::default(),
            references: FxHashMap::default(),
        }
    }
}

impl<T: Eq + Hash + Clone> BidirectionalMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `key` to `value`, replacing any previous mapping of `key`.
    pub fn set(&mut self, key: T, value: T) {
        if let Some(old) = self.values.get(&key).cloned() {
            self.unlink(&key, &old);
        }
        self.references
            .entry(value.clone())
            .or_default()
            .insert(key.clone());
        self.values.insert(key, value);
    }

    pub fn erase_key(&mut self, key: &T) {
        if let Some(old) = self.values.remove(key) {
            self.unlink(key, &old);
        }
    }

    /// Remove every key currently mapped to `value`.
    pub fn erase_value(&mut self, value: &T) {
        if let Some(keys) = self.references.remove(value) {
            for key in keys {
                self.values.remove(&key);
            }
        }
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&T, &T) -> bool) {
        let doomed: Vec<T> = self
            .values
            .iter()
            .filter(|(key, value)| !keep(key, value))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            self.erase_key(key);
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.references.clear();
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.contains_key(key)
    }

    /// Keys mapped to `value`.
    pub fn keys_for(&self, value: &T) -> impl Iterator<Item = &T> {
        self.references.get(value).into_iter().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, &T)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Verify that the reverse index matches the forward map exactly.
    pub fn check_invariant(&self) -> OptResult<()> {
        for (key, value) in &self.values {
            let indexed = self
                .references
                .get(value)
                .map_or(false, |keys| keys.contains(key));
            if !indexed {
                return Err(OptimizerError::InconsistentKnowledge {
                    message: "mapped key missing from the reverse index".to_string(),
                });
            }
        }
        for (value, keys) in &self.references {
            if keys.is_empty() {
                return Err(OptimizerError::InconsistentKnowledge {
                    message: "empty reverse index entry".to_string(),
                });
            }
            if keys.iter().any(|key| self.values.get(key) != Some(value)) {
                return Err(OptimizerError::InconsistentKnowledge {
                    message: "reverse index entry does not match the forward map".to_string(),
                });
            }
        }
        Ok(())
    }

    fn unlink(&mut self, key: &T, value: &T) {
        if let Some(keys) = self.references.get_mut(value) {
            keys.remove(key);
            if keys.is_empty() {
                self.references.remove(value);
            }
        }
    }
}

impl<T: Eq + Hash + Clone + fmt::Debug> fmt::Debug for BidirectionalMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keys_of(map: &BidirectionalMap<u8>, value: u8) -> Vec<u8> {
        let mut keys: Vec<u8> = map.keys_for(&value).copied().collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn test_set_moves_key_between_values() {
        let mut map = BidirectionalMap::new();
        map.set(1u8, 10u8);
        map.set(2, 10);
        assert_eq!(keys_of(&map, 10), vec![1, 2]);

        map.set(1, 20);
        assert_eq!(map.get(&1), Some(&20));
        assert_eq!(keys_of(&map, 10), vec![2]);
        assert_eq!(keys_of(&map, 20), vec![1]);
        assert!(map.check_invariant().is_ok());
    }

    #[test]
    fn test_erase_key() {
        let mut map = BidirectionalMap::new();
        map.set(1u8, 10u8);
        map.erase_key(&1);
        map.erase_key(&7);
        assert!(map.is_empty());
        assert_eq!(keys_of(&map, 10), Vec::<u8>::new());
        assert!(map.check_invariant().is_ok());
    }

    #[test]
    fn test_erase_value_removes_all_keys() {
        let mut map = BidirectionalMap::new();
        map.set(1u8, 10u8);
        map.set(2, 10);
        map.set(3, 30);
        map.erase_value(&10);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&3), Some(&30));
        assert!(!map.contains_key(&1));
        assert!(map.check_invariant().is_ok());
    }

    #[test]
    fn test_retain() {
        let mut map = BidirectionalMap::new();
        map.set(1u8, 10u8);
        map.set(2, 20);
        map.set(3, 10);
        map.retain(|key, _| *key != 3);
        assert_eq!(keys_of(&map, 10), vec![1]);
        assert_eq!(map.len(), 2);
        assert!(map.check_invariant().is_ok());
    }

    #[test]
    fn test_clear() {
        let mut map = BidirectionalMap::new();
        map.set(1u8, 1u8);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map, BidirectionalMap::new());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(u8, u8),
        EraseKey(u8),
        EraseValue(u8),
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => (0u8..6, 0u8..4).prop_map(|(k, v)| Op::Set(k, v)),
            2 => (0u8..6).prop_map(Op::EraseKey),
            2 => (0u8..4).prop_map(Op::EraseValue),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn invariant_holds_after_every_operation(ops in prop::collection::vec(op(), 0..64)) {
            let mut map = BidirectionalMap::new();
            for op in ops {
                match op {
                    Op::Set(k, v) => map.set(k, v),
                    Op::EraseKey(k) => map.erase_key(&k),
                    Op::EraseValue(v) => map.erase_value(&v),
                    Op::Clear => map.clear(),
                }
                prop_assert!(map.check_invariant().is_ok());
                for value in 0u8..4 {
                    let mut expected: Vec<u8> = map
                        .iter()
                        .filter(|(_, v)| **v == value)
                        .map(|(k, _)| *k)
                        .collect();
                    expected.sort_unstable();
                    prop_assert_eq!(keys_of(&map, value), expected);
                }
            }
        }
    }
}
