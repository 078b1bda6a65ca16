use std::{
    iter::FusedIterator,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use crate::memory::EntityIndex;

/// A slab arena holding the nodes of a tree.
///
/// Freed slots are chained into a free list and handed out again by later
/// insertions, so keys of removed values may be reused.
#[derive(Debug, Clone)]
pub struct Slab<K, V> {
    data: Vec<Entry<V>>,
    /// First free slot, or `data.len()` when the free list is empty.
    free: usize,
    len: usize,
    phantom: PhantomData<K>,
}

impl<K, V> Slab<K, V>
where
    K: EntityIndex,
{
    /// Creates an empty [`Slab<K, V>`].
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            free: 0,
            len: 0,
            phantom: PhantomData,
        }
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether there is no stored value.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, used or free. Every valid key's index is below this bound.
    pub fn slot_count(&self) -> usize {
        self.data.len()
    }

    pub fn contains(&self, key: K) -> bool {
        matches!(self.data.get(key.index()), Some(Entry::Full(_)))
    }

    pub fn insert(&mut self, value: V) -> K {
        let index = self.free;

        match self.data.get(index) {
            None => {
                self.data.push(Entry::Full(value));
                self.free = self.data.len();
            }
            Some(&Entry::Free(next)) => {
                self.free = next;
                self.data[index] = Entry::Full(value);
            }
            Some(Entry::Full(_)) => unreachable!("free list points at an occupied slot"),
        }

        self.len += 1;
        K::new(index)
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        let index = key.index();
        let entry = self.data.get_mut(index)?;

        if let Entry::Free(_) = entry {
            return None;
        }

        let Entry::Full(value) = std::mem::replace(entry, Entry::Free(self.free)) else {
            unreachable!()
        };

        self.free = index;
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, key: K) -> Option<&V> {
        match self.data.get(key.index()) {
            Some(Entry::Full(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        match self.data.get_mut(key.index()) {
            Some(Entry::Full(value)) => Some(value),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.free = 0;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: self.data.iter().enumerate(),
            len: self.len,
            phantom: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            entries: self.data.iter_mut().enumerate(),
            len: self.len,
            phantom: PhantomData,
        }
    }

    /// Moves all values to the front, dropping the free slots.
    ///
    /// Calls `rekey` with the old and the new key of every value that is kept.
    pub fn compact<F>(&mut self, mut rekey: F)
    where
        F: FnMut(&mut V, K, K),
    {
        let mut old_index = 0;
        let mut new_index = 0;

        self.data.retain_mut(|entry| {
            let keep = match entry {
                Entry::Free(_) => false,
                Entry::Full(value) => {
                    rekey(value, K::new(old_index), K::new(new_index));
                    new_index += 1;
                    true
                }
            };
            old_index += 1;
            keep
        });

        self.free = self.data.len();
    }

    pub fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit()
    }
}

impl<K, V> Index<K> for Slab<K, V>
where
    K: EntityIndex,
{
    type Output = V;

    fn index(&self, key: K) -> &Self::Output {
        self.get(key).expect("invalid key")
    }
}

impl<K, V> IndexMut<K> for Slab<K, V>
where
    K: EntityIndex,
{
    fn index_mut(&mut self, key: K) -> &mut Self::Output {
        self.get_mut(key).expect("invalid key")
    }
}

impl<K, V> Default for Slab<K, V>
where
    K: EntityIndex,
{
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum Entry<V> {
    Free(usize),
    Full(V),
}

pub struct Iter<'a, K, V> {
    entries: std::iter::Enumerate<std::slice::Iter<'a, Entry<V>>>,
    len: usize,
    phantom: PhantomData<K>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: EntityIndex,
{
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.by_ref().find_map(|(index, entry)| match entry {
            Entry::Full(value) => {
                self.len -= 1;
                Some((K::new(index), value))
            }
            Entry::Free(_) => None,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K: EntityIndex, V> ExactSizeIterator for Iter<'a, K, V> {}
impl<'a, K: EntityIndex, V> FusedIterator for Iter<'a, K, V> {}

pub struct IterMut<'a, K, V> {
    entries: std::iter::Enumerate<std::slice::IterMut<'a, Entry<V>>>,
    len: usize,
    phantom: PhantomData<K>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V>
where
    K: EntityIndex,
{
    type Item = (K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let len = &mut self.len;
        self.entries.by_ref().find_map(|(index, entry)| match entry {
            Entry::Full(value) => {
                *len -= 1;
                Some((K::new(index), value))
            }
            Entry::Free(_) => None,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K: EntityIndex, V> ExactSizeIterator for IterMut<'a, K, V> {}
impl<'a, K: EntityIndex, V> FusedIterator for IterMut<'a, K, V> {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::NodeIndex;

    #[test]
    fn reuses_freed_slots() {
        let mut slab = Slab::<NodeIndex, &str>::new();
        let a = slab.insert("a");
        let b = slab.insert("b");
        let c = slab.insert("c");

        assert_eq!(slab.remove(b), Some("b"));
        assert_eq!(slab.remove(b), None);
        assert_eq!(slab.len(), 2);
        assert!(!slab.contains(b));

        let d = slab.insert("d");
        assert_eq!(d, b);
        assert_eq!(slab.slot_count(), 3);
        assert!(slab.iter().map(|(k, _)| k).eq([a, d, c]));
    }

    #[test]
    fn compact_reports_moves() {
        let mut slab = Slab::<NodeIndex, u8>::new();
        let keys: Vec<NodeIndex> = (0..4).map(|v| slab.insert(v)).collect();
        slab.remove(keys[0]);
        slab.remove(keys[2]);

        let mut moves = Vec::new();
        slab.compact(|_, old, new| moves.push((old, new)));

        assert_eq!(moves, [(keys[1], keys[0]), (keys[3], keys[1])]);
        assert_eq!(slab.slot_count(), 2);
        assert_eq!(slab[keys[1]], 3);

        // Insertion after compaction appends.
        assert_eq!(slab.insert(9), keys[2]);
    }
}
