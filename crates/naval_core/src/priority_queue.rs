//! Array-backed binary heap with in-place priority updates.
//!
//! Unlike [`std::collections::BinaryHeap`], items can be looked up and
//! re-sifted after their key changes, which A* needs when it finds a
//! cheaper route to a node that is already open. Each item carries a
//! stable key; the heap keeps a key -> slot index so `contains` and
//! `update` never scan the array.

use std::cmp::Ordering;
use std::collections::HashMap;

/// An item that can be stored in a [`PriorityQueue`].
pub trait HeapItem {
    /// Compare priorities. `Ordering::Greater` means `self` should leave
    /// the heap before `other`. Ties should be broken inside this method
    /// (A* prefers the lower h-cost).
    fn priority_cmp(&self, other: &Self) -> Ordering;

    /// Stable identity used for membership and updates.
    fn heap_key(&self) -> usize;
}

/// Binary heap that pops the highest-priority item first.
///
/// A min-heap is obtained by having [`HeapItem::priority_cmp`] report
/// smaller keys as greater priority.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T: HeapItem> {
    items: Vec<T>,
    slots: HashMap<usize, usize>,
}

impl<T: HeapItem> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HeapItem> PriorityQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Create an empty queue with room for `capacity` items.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
        }
    }

    /// Number of queued items.
    #[must_use]
    pub fn size(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check whether an item with this key is queued.
    #[must_use]
    pub fn contains(&self, key: usize) -> bool {
        self.slots.contains_key(&key)
    }

    /// Highest-priority item, if any.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    /// Insert an item.
    ///
    /// # Panics
    ///
    /// Panics if an item with the same key is already queued; use
    /// [`update`](Self::update) for that.
    pub fn add(&mut self, item: T) {
        let key = item.heap_key();
        assert!(
            !self.slots.contains_key(&key),
            "PriorityQueue already holds key {key}"
        );
        let index = self.items.len();
        self.items.push(item);
        self.slots.insert(key, index);
        self.sift_up(index);
        self.validate();
    }

    /// Remove and return the highest-priority item.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty. Popping an empty queue is a logic
    /// error in the caller; use [`try_remove_top`](Self::try_remove_top)
    /// when emptiness is expected.
    pub fn remove_top(&mut self) -> T {
        assert!(!self.items.is_empty(), "remove_top on an empty PriorityQueue");
        self.pop_root()
    }

    /// Remove and return the highest-priority item, or `None` if empty.
    pub fn try_remove_top(&mut self) -> Option<T> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.pop_root())
        }
    }

    /// Replace the queued item sharing `item`'s key and restore heap order.
    ///
    /// Works whether the priority rose or fell.
    ///
    /// # Panics
    ///
    /// Panics if no item with that key is queued.
    pub fn update(&mut self, item: T) {
        let key = item.heap_key();
        let Some(&index) = self.slots.get(&key) else {
            panic!("PriorityQueue::update for unknown key {key}");
        };
        self.items[index] = item;
        let index = self.sift_up(index);
        self.sift_down(index);
        self.validate();
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.items.clear();
        self.slots.clear();
    }

    /// Drain items in priority order.
    pub fn drain_sorted(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.items.len());
        while let Some(item) = self.try_remove_top() {
            out.push(item);
        }
        out
    }

    fn pop_root(&mut self) -> T {
        // Swap-remove keeps the single-item case trivial: the last item
        // is the root itself and nothing is left to sift.
        let top = self.items.swap_remove(0);
        self.slots.remove(&top.heap_key());
        if !self.items.is_empty() {
            let moved = self.items[0].heap_key();
            self.slots.insert(moved, 0);
            self.sift_down(0);
        }
        self.validate();
        top
    }

    fn higher(&self, a: usize, b: usize) -> bool {
        self.items[a].priority_cmp(&self.items[b]) == Ordering::Greater
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.items.swap(a, b);
        self.slots.insert(self.items[a].heap_key(), a);
        self.slots.insert(self.items[b].heap_key(), b);
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.higher(index, parent) {
                self.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
        index
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut best = index;
            if left < len && self.higher(left, best) {
                best = left;
            }
            if right < len && self.higher(right, best) {
                best = right;
            }
            if best == index {
                break;
            }
            self.swap(index, best);
            index = best;
        }
    }

    #[cfg(feature = "debug-validation")]
    fn validate(&self) {
        assert_eq!(self.items.len(), self.slots.len(), "heap index out of sync");
        for (index, item) in self.items.iter().enumerate() {
            assert_eq!(
                self.slots.get(&item.heap_key()),
                Some(&index),
                "heap index corrupted for key {}",
                item.heap_key()
            );
            if index > 0 {
                let parent = (index - 1) / 2;
                assert!(
                    !self.higher(index, parent),
                    "heap order violated at slot {index}"
                );
            }
        }
    }

    #[cfg(not(feature = "debug-validation"))]
    #[inline]
    fn validate(&self) {}
}
