//! Bounded priority container with probabilistic, priority-weighted
//! retrieval.
//!
//! Items are filed into a fixed number of priority levels. Selection first
//! samples a non-empty level, weighting level `i` by `i + 1`, then takes the
//! oldest item in that level. Nothing is sorted; insert and select cost
//! O(levels) plus a bucket scan on eviction.
//!
//! The bag never grows beyond its capacity. When full, the lowest-priority
//! item among the residents and the newcomer is dropped and handed back to
//! the caller; ties go against the older item.

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::budget::Budget;
use crate::constants::FORGET_QUALITY_RELATIVE;

/// Anything with a unique key and a budget can live in a bag.
pub trait Item {
    type Key: Clone + Eq + Hash + Debug;

    fn key(&self) -> &Self::Key;
    fn budget(&self) -> &Budget;
    fn budget_mut(&mut self) -> &mut Budget;
}

/// Recipe for merge-or-insert via [`Bag::update`]: the key is computed
/// first, and the item is only built when the key is absent.
pub trait ItemBuilder<V: Item> {
    fn key(&self) -> V::Key;
    fn budget(&self) -> Budget;
    fn build(&self) -> V;
}

/// Outcome of [`Bag::update`].
pub struct UpdateResult<'a, V> {
    /// The item now stored under the builder's key, if it is resident.
    pub item: Option<&'a V>,
    /// Whatever was pushed out to make room (possibly the new item itself).
    pub evicted: Option<V>,
}

struct Slot<V> {
    item: V,
    level: usize,
    seq: u64,
}

fn level_for(priority: f64, levels: usize) -> usize {
    let raw = (priority * levels as f64).floor();
    (raw.max(0.0) as usize).min(levels.saturating_sub(1))
}

pub struct Bag<V: Item> {
    capacity: usize,
    levels: Vec<VecDeque<V::Key>>,
    slots: HashMap<V::Key, Slot<V>>,
    next_seq: u64,
    forget_relative: f64,
    rng: SmallRng,
}

impl<V: Item> Bag<V> {
    pub fn new(capacity: usize, levels: usize) -> Self {
        Self::with_rng(capacity, levels, SmallRng::from_rng(&mut rand::rng()))
    }

    pub fn with_seed(capacity: usize, levels: usize, seed: u64) -> Self {
        Self::with_rng(capacity, levels, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, levels: usize, rng: SmallRng) -> Self {
        let levels = levels.max(1);
        Self {
            capacity,
            levels: (0..levels).map(|_| VecDeque::new()).collect(),
            slots: HashMap::with_capacity(capacity),
            next_seq: 0,
            forget_relative: FORGET_QUALITY_RELATIVE,
            rng,
        }
    }

    /// Share of quality kept as the floor when items are forgotten.
    pub fn with_forget_relative(mut self, relative: f64) -> Self {
        self.forget_relative = relative;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn contains(&self, key: &V::Key) -> bool {
        self.slots.contains_key(key)
    }

    pub fn get(&self, key: &V::Key) -> Option<&V> {
        self.slots.get(key).map(|s| &s.item)
    }

    /// Insert `item`, merging with a resident of the same key. Returns the
    /// item dropped to respect capacity, if any.
    pub fn put(&mut self, mut item: V) -> Option<V> {
        let key = item.key().clone();
        if let Some(slot) = self.slots.get_mut(&key) {
            item.budget_mut().merge(slot.item.budget());
            slot.item = item;
            self.relevel(&key);
            return None;
        }

        if self.capacity == 0 {
            return Some(item);
        }

        let mut evicted = None;
        if self.slots.len() >= self.capacity {
            let Some((level, pos, lowest)) = self.lowest() else {
                return Some(item);
            };
            if item.budget().priority() < lowest {
                tracing::trace!(?key, priority = item.budget().priority(), "bag rejected newcomer");
                return Some(item);
            }
            evicted = self.levels[level]
                .remove(pos)
                .and_then(|k| self.slots.remove(&k))
                .map(|s| s.item);
            if let Some(victim) = &evicted {
                tracing::trace!(
                    key = ?victim.key(),
                    priority = victim.budget().priority(),
                    "bag evicted resident"
                );
            }
        }

        let level = level_for(item.budget().priority(), self.levels.len());
        let seq = self.next_seq;
        self.next_seq += 1;
        self.levels[level].push_back(key.clone());
        self.slots.insert(key, Slot { item, level, seq });
        evicted
    }

    /// Remove and return one item, sampling a level biased toward higher
    /// priority and taking the oldest item within it.
    pub fn take_next(&mut self) -> Option<V> {
        let total: usize = self
            .levels
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.is_empty())
            .map(|(i, _)| i + 1)
            .sum();
        if total == 0 {
            return None;
        }

        let mut r = self.rng.random_range(0..total);
        let mut chosen = None;
        for (i, level) in self.levels.iter().enumerate() {
            if level.is_empty() {
                continue;
            }
            if r < i + 1 {
                chosen = Some(i);
                break;
            }
            r -= i + 1;
        }

        let key = self.levels[chosen?].pop_front()?;
        self.slots.remove(&key).map(|s| s.item)
    }

    /// Return an item after use. Forgetting is applied for the cycles elapsed
    /// since the item was last touched, then it is re-inserted.
    pub fn put_back(&mut self, mut item: V, forget_cycles: f64, now: u64) -> Option<V> {
        item.budget_mut()
            .forget(now, forget_cycles, self.forget_relative);
        self.put(item)
    }

    /// Merge the builder's budget into the resident item with the same key,
    /// or build and insert a new one.
    pub fn update<B: ItemBuilder<V>>(&mut self, builder: &B) -> UpdateResult<'_, V> {
        let key = builder.key();
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.item.budget_mut().merge(&builder.budget());
            self.relevel(&key);
            return UpdateResult {
                item: self.get(&key),
                evicted: None,
            };
        }
        let evicted = self.put(builder.build());
        UpdateResult {
            item: self.get(&key),
            evicted,
        }
    }

    pub fn remove(&mut self, key: &V::Key) -> Option<V> {
        let slot = self.slots.remove(key)?;
        let level = &mut self.levels[slot.level];
        if let Some(pos) = level.iter().position(|k| k == key) {
            level.remove(pos);
        }
        Some(slot.item)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        for level in &mut self.levels {
            level.clear();
        }
    }

    /// Residents from the highest level down, oldest first within a level.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.levels
            .iter()
            .rev()
            .flat_map(|l| l.iter())
            .filter_map(|k| self.slots.get(k).map(|s| &s.item))
    }

    pub fn total_priority(&self) -> f64 {
        self.slots.values().map(|s| s.item.budget().priority()).sum()
    }

    pub fn average_priority(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        self.total_priority() / self.slots.len() as f64
    }

    /// Priority of the resident that would be evicted next.
    pub fn lowest_priority(&self) -> Option<f64> {
        self.lowest().map(|(_, _, p)| p)
    }

    /// Apply forgetting to every resident up to `now` and refile them.
    pub fn refresh(&mut self, now: u64, forget_cycles: f64) {
        let n = self.levels.len();
        let old = std::mem::replace(&mut self.levels, (0..n).map(|_| VecDeque::new()).collect());
        for key in old.into_iter().flatten() {
            if let Some(slot) = self.slots.get_mut(&key) {
                slot.item
                    .budget_mut()
                    .forget(now, forget_cycles, self.forget_relative);
                slot.level = level_for(slot.item.budget().priority(), n);
                self.levels[slot.level].push_back(key);
            }
        }
    }

    /// (level, position in level, priority) of the lowest-priority resident,
    /// oldest first on ties.
    fn lowest(&self) -> Option<(usize, usize, f64)> {
        let (level, deque) = self
            .levels
            .iter()
            .enumerate()
            .find(|(_, l)| !l.is_empty())?;
        let mut best: Option<(usize, f64, u64)> = None;
        for (pos, key) in deque.iter().enumerate() {
            let Some(slot) = self.slots.get(key) else {
                continue;
            };
            let p = slot.item.budget().priority();
            let better = match best {
                None => true,
                Some((_, bp, bseq)) => p < bp || (p == bp && slot.seq < bseq),
            };
            if better {
                best = Some((pos, p, slot.seq));
            }
        }
        best.map(|(pos, p, _)| (level, pos, p))
    }

    fn relevel(&mut self, key: &V::Key) {
        let n = self.levels.len();
        let Some(slot) = self.slots.get_mut(key) else {
            return;
        };
        let level = level_for(slot.item.budget().priority(), n);
        if level == slot.level {
            return;
        }
        let old = std::mem::replace(&mut slot.level, level);
        if let Some(pos) = self.levels[old].iter().position(|k| k == key) {
            self.levels[old].remove(pos);
        }
        self.levels[level].push_back(key.clone());
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let filed: usize = self.levels.iter().map(VecDeque::len).sum();
        assert_eq!(filed, self.slots.len(), "level count != slot count");
        assert!(self.slots.len() <= self.capacity);
        for (i, level) in self.levels.iter().enumerate() {
            for key in level {
                let slot = &self.slots[key];
                assert_eq!(slot.level, i);
                assert_eq!(level_for(slot.item.budget().priority(), self.levels.len()), i);
            }
        }
    }
}
