//! Bag variant that forgets continuously: every resident is decayed up to
//! the current cycle before each selection, not only when it is put back.

use crate::bag::{Bag, Item, ItemBuilder, UpdateResult};

pub struct DelayBag<V: Item> {
    bag: Bag<V>,
    forget_cycles: f64,
    last_refresh: Option<u64>,
}

impl<V: Item> DelayBag<V> {
    pub fn new(bag: Bag<V>, forget_cycles: f64) -> Self {
        Self {
            bag,
            forget_cycles,
            last_refresh: None,
        }
    }

    /// Decay all residents to `now` (at most once per cycle), then select.
    pub fn take_next(&mut self, now: u64) -> Option<V> {
        if self.last_refresh != Some(now) {
            self.bag.refresh(now, self.forget_cycles);
            self.last_refresh = Some(now);
        }
        self.bag.take_next()
    }

    /// Re-insert a taken item. Its budget was already decayed to the last
    /// refresh, so no further forgetting is applied here.
    pub fn put_back(&mut self, item: V) -> Option<V> {
        self.bag.put(item)
    }

    pub fn put(&mut self, item: V) -> Option<V> {
        self.bag.put(item)
    }

    pub fn update<B: ItemBuilder<V>>(&mut self, builder: &B) -> UpdateResult<'_, V> {
        self.bag.update(builder)
    }

    pub fn get(&self, key: &V::Key) -> Option<&V> {
        self.bag.get(key)
    }

    pub fn remove(&mut self, key: &V::Key) -> Option<V> {
        self.bag.remove(key)
    }

    pub fn contains(&self, key: &V::Key) -> bool {
        self.bag.contains(key)
    }

    pub fn len(&self) -> usize {
        self.bag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bag.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bag.capacity()
    }

    pub fn lowest_priority(&self) -> Option<f64> {
        self.bag.lowest_priority()
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.bag.iter()
    }

    pub fn clear(&mut self) {
        self.bag.clear();
    }
}
