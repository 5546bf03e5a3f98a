//! Sorted containers (§4.C): an ordered set and an ordered map, both keyed
//! by the total order fixed in `value::compare`. Backed by `BTreeMap`/
//! `BTreeSet`, which gives O(log n) single-key operations and O(n) in-order
//! iteration for free; the contract item the standard collections don't
//! give us for free is "no equal-comparing key collapses silently" — callers
//! that construct from a sequence with duplicate keys must supply a conflict
//! resolver (default: raise `DuplicateKey`).

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{EastError, EastResult};
use crate::value::{compare, OrdValue, Value};

/// A mutable sorted set of keys.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    inner: BTreeSet<OrdValue>,
}

impl PartialEq for SortedSet {
    fn eq(&self, other: &Self) -> bool {
        self.inner.len() == other.inner.len()
            && self.inner.iter().zip(other.inner.iter()).all(|(a, b)| a == b)
    }
}

impl SortedSet {
    pub fn new() -> Self {
        SortedSet { inner: BTreeSet::new() }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn has(&self, key: &Value) -> bool {
        self.inner.contains(&OrdValue(key.clone()))
    }

    /// Insert, raising `DuplicateKey` if already present (the throwing
    /// variant of §4.E.4's "insert ... throwing and try-variants").
    pub fn insert(&mut self, key: Value) -> EastResult<()> {
        if !self.inner.insert(OrdValue(key)) {
            return Err(EastError::duplicate_key("key already present in set"));
        }
        Ok(())
    }

    /// Insert, silently replacing an existing key (the "try" variant).
    pub fn insert_or_replace(&mut self, key: Value) {
        self.inner.replace(OrdValue(key));
    }

    pub fn remove(&mut self, key: &Value) -> EastResult<()> {
        if !self.inner.remove(&OrdValue(key.clone())) {
            return Err(EastError::missing_key("key not present in set"));
        }
        Ok(())
    }

    pub fn try_remove(&mut self, key: &Value) -> bool {
        self.inner.remove(&OrdValue(key.clone()))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.inner.iter().map(|k| &k.0)
    }

    pub fn union_with(&self, other: &SortedSet) -> SortedSet {
        let mut out = self.clone();
        for k in other.iter() {
            out.inner.replace(OrdValue(k.clone()));
        }
        out
    }

    pub fn intersection_with(&self, other: &SortedSet) -> SortedSet {
        SortedSet { inner: self.inner.intersection(&other.inner).cloned().collect() }
    }

    pub fn difference_with(&self, other: &SortedSet) -> SortedSet {
        SortedSet { inner: self.inner.difference(&other.inner).cloned().collect() }
    }

    pub fn symmetric_difference_with(&self, other: &SortedSet) -> SortedSet {
        SortedSet { inner: self.inner.symmetric_difference(&other.inner).cloned().collect() }
    }

    pub fn is_subset_of(&self, other: &SortedSet) -> bool {
        self.inner.is_subset(&other.inner)
    }

    pub fn is_disjoint_from(&self, other: &SortedSet) -> bool {
        self.inner.is_disjoint(&other.inner)
    }

    /// Build from a sequence, applying `resolve` to an incoming duplicate
    /// and the value already present (here: ignored, since sets carry no
    /// payload) — default behaviour raises `DuplicateKey`.
    pub fn from_values(
        values: impl IntoIterator<Item = Value>,
        allow_duplicates: bool,
    ) -> EastResult<SortedSet> {
        let mut set = SortedSet::new();
        for v in values {
            if allow_duplicates {
                set.insert_or_replace(v);
            } else {
                set.insert(v)?;
            }
        }
        Ok(set)
    }

    pub fn compare_ordered(&self, other: &SortedSet) -> Ordering {
        for (a, b) in self.inner.iter().zip(other.inner.iter()) {
            match compare(&a.0, &b.0) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        self.inner.len().cmp(&other.inner.len())
    }
}

/// A mutable sorted dictionary, iterating in key order.
#[derive(Debug, Clone, Default)]
pub struct SortedMap {
    inner: BTreeMap<OrdValue, Value>,
}

impl PartialEq for SortedMap {
    fn eq(&self, other: &Self) -> bool {
        self.inner.len() == other.inner.len()
            && self
                .inner
                .iter()
                .zip(other.inner.iter())
                .all(|((k1, v1), (k2, v2))| k1 == k2 && v1 == v2)
    }
}

impl SortedMap {
    pub fn new() -> Self {
        SortedMap { inner: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn has(&self, key: &Value) -> bool {
        self.inner.contains_key(&OrdValue(key.clone()))
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.inner.get(&OrdValue(key.clone()))
    }

    pub fn insert(&mut self, key: Value, value: Value) -> EastResult<()> {
        if self.inner.contains_key(&OrdValue(key.clone())) {
            return Err(EastError::duplicate_key("key already present in dict"));
        }
        self.inner.insert(OrdValue(key), value);
        Ok(())
    }

    pub fn insert_or_replace(&mut self, key: Value, value: Value) -> Option<Value> {
        self.inner.insert(OrdValue(key), value)
    }

    pub fn remove(&mut self, key: &Value) -> EastResult<Value> {
        self.inner
            .remove(&OrdValue(key.clone()))
            .ok_or_else(|| EastError::missing_key("key not present in dict"))
    }

    pub fn try_remove(&mut self, key: &Value) -> Option<Value> {
        self.inner.remove(&OrdValue(key.clone()))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.inner.iter().map(|(k, v)| (&k.0, v))
    }

    /// Union with a conflict resolver invoked `resolve(existing, incoming)`
    /// for keys present in both (§4.E.4).
    pub fn union_with(
        &self,
        other: &SortedMap,
        mut resolve: impl FnMut(&Value, &Value) -> Value,
    ) -> SortedMap {
        let mut out = self.clone();
        for (k, v) in other.iter() {
            if let Some(existing) = out.inner.get(&OrdValue(k.clone())).cloned() {
                let merged = resolve(&existing, v);
                out.inner.insert(OrdValue(k.clone()), merged);
            } else {
                out.inner.insert(OrdValue(k.clone()), v.clone());
            }
        }
        out
    }

    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (Value, Value)>,
        mut resolve: Option<impl FnMut(&Value, &Value) -> Value>,
    ) -> EastResult<SortedMap> {
        let mut map = SortedMap::new();
        for (k, v) in pairs {
            match (&mut resolve, map.inner.get(&OrdValue(k.clone())).cloned()) {
                (Some(f), Some(existing)) => {
                    let merged = f(&existing, &v);
                    map.inner.insert(OrdValue(k), merged);
                }
                (None, Some(_)) => return Err(EastError::duplicate_key("duplicate key in dict construction")),
                _ => {
                    map.inner.insert(OrdValue(k), v);
                }
            }
        }
        Ok(map)
    }

    pub fn compare_ordered(&self, other: &SortedMap) -> Ordering {
        for ((k1, v1), (k2, v2)) in self.inner.iter().zip(other.inner.iter()) {
            match compare(&k1.0, &k2.0) {
                Ordering::Equal => {}
                other => return other,
            }
            match compare(v1, v2) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        self.inner.len().cmp(&other.inner.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_iterates_in_key_order_regardless_of_insertion_order() {
        let mut map = SortedMap::new();
        map.insert(Value::Integer(3), Value::string("c")).unwrap();
        map.insert(Value::Integer(1), Value::string("a")).unwrap();
        map.insert(Value::Integer(2), Value::string("b")).unwrap();
        let keys: Vec<i64> = map
            .iter()
            .map(|(k, _)| match k {
                Value::Integer(n) => *n,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_insert_raises_duplicate_key() {
        let mut map = SortedMap::new();
        map.insert(Value::Integer(1), Value::string("a")).unwrap();
        let err = map.insert(Value::Integer(1), Value::string("b"));
        assert!(matches!(err, Err(EastError::DuplicateKey { .. })));
    }

    #[test]
    fn set_algebra() {
        let a = SortedSet::from_values([Value::Integer(1), Value::Integer(2)], false).unwrap();
        let b = SortedSet::from_values([Value::Integer(2), Value::Integer(3)], false).unwrap();
        assert_eq!(a.union_with(&b).len(), 3);
        assert_eq!(a.intersection_with(&b).len(), 1);
        assert_eq!(a.difference_with(&b).len(), 1);
        assert_eq!(a.symmetric_difference_with(&b).len(), 2);
        assert!(!a.is_disjoint_from(&b));
        assert!(SortedSet::from_values([Value::Integer(1)], false)
            .unwrap()
            .is_subset_of(&a));
    }
}
