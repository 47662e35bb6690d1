//! LRU Tracker Module
//!
//! Implements access-order tracking as a doubly-linked list threaded through
//! an index arena, so touching, removing and evicting are all O(1).

// == Node ==
#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Each tracked key lives in a slot of `nodes`; callers keep the slot index
/// returned by [`LruTracker::push_back`] and hand it back to touch or remove
/// the key. Vacated slots are recycled through `free`.
///
/// - Head = Least recently used
/// - Tail = Most recently used
#[derive(Debug)]
pub struct LruTracker<K> {
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Back ==
    /// Adds a key as the most recently used and returns its slot.
    pub fn push_back(&mut self, key: K) -> usize {
        let node = Node {
            key,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.link_back(slot);
        self.len += 1;
        slot
    }

    // == Touch ==
    /// Marks the key in `slot` as most recently used.
    pub fn touch(&mut self, slot: usize) {
        if self.tail == Some(slot) || !self.is_occupied(slot) {
            return;
        }
        self.unlink(slot);
        self.link_back(slot);
    }

    // == Remove ==
    /// Removes the key in `slot` from the tracker and returns it.
    pub fn remove(&mut self, slot: usize) -> Option<K> {
        if !self.is_occupied(slot) {
            return None;
        }
        self.unlink(slot);
        let node = self.nodes.get_mut(slot)?.take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(node.key)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        let head = self.head?;
        self.remove(head)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.head.and_then(|slot| self.node(slot)).map(|node| &node.key)
    }

    // == Iterate ==
    /// Iterates keys from least to most recently used.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            tracker: self,
            cursor: self.head,
        }
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, slot: usize) -> Option<&Node<K>> {
        self.nodes.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node<K>> {
        self.nodes.get_mut(slot).and_then(Option::as_mut)
    }

    fn is_occupied(&self, slot: usize) -> bool {
        self.node(slot).is_some()
    }

    /// Detaches `slot` from its neighbours, leaving the node in place.
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = match self.node_mut(slot) {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    /// Attaches a detached `slot` at the tail.
    fn link_back(&mut self, slot: usize) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(slot) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.node_mut(t) {
                    node.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }
}

// == Iterator ==
/// Oldest-first iterator over tracked keys.
pub struct Iter<'a, K> {
    tracker: &'a LruTracker<K>,
    cursor: Option<usize>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tracker.node(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn keys(lru: &LruTracker<&'static str>) -> Vec<&'static str> {
        lru.iter().copied().collect()
    }

    #[test]
    fn test_lru_new() {
        let lru: LruTracker<&str> = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert_eq!(lru.peek_oldest(), None);
    }

    #[test]
    fn test_lru_push_back() {
        let mut lru = LruTracker::new();

        lru.push_back("key1");
        lru.push_back("key2");
        lru.push_back("key3");

        assert_eq!(lru.len(), 3);
        // key1 is oldest (added first)
        assert_eq!(lru.peek_oldest(), Some(&"key1"));
        assert_eq!(keys(&lru), vec!["key1", "key2", "key3"]);
    }

    #[test]
    fn test_lru_touch_existing_key() {
        let mut lru = LruTracker::new();

        let key1 = lru.push_back("key1");
        lru.push_back("key2");
        lru.push_back("key3");

        // Touch key1 again - should move to the tail
        lru.touch(key1);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some(&"key2"));
        assert_eq!(keys(&lru), vec!["key2", "key3", "key1"]);
    }

    #[test]
    fn test_lru_touch_tail_is_noop() {
        let mut lru = LruTracker::new();

        lru.push_back("a");
        let b = lru.push_back("b");
        lru.touch(b);

        assert_eq!(keys(&lru), vec!["a", "b"]);
    }

    #[test]
    fn test_lru_evict_oldest() {
        let mut lru = LruTracker::new();

        lru.push_back("key1");
        lru.push_back("key2");
        lru.push_back("key3");

        assert_eq!(lru.evict_oldest(), Some("key1"));
        assert_eq!(lru.len(), 2);

        assert_eq!(lru.evict_oldest(), Some("key2"));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_lru_evict_empty() {
        let mut lru: LruTracker<&str> = LruTracker::new();
        assert_eq!(lru.evict_oldest(), None);
    }

    #[test]
    fn test_lru_remove_middle() {
        let mut lru = LruTracker::new();

        lru.push_back("key1");
        let key2 = lru.push_back("key2");
        lru.push_back("key3");

        assert_eq!(lru.remove(key2), Some("key2"));

        assert_eq!(lru.len(), 2);
        assert_eq!(keys(&lru), vec!["key1", "key3"]);
    }

    #[test]
    fn test_lru_remove_vacant_slot() {
        let mut lru = LruTracker::new();

        let key1 = lru.push_back("key1");
        lru.push_back("key2");

        assert_eq!(lru.remove(key1), Some("key1"));
        // Removing again must not disturb remaining keys
        assert_eq!(lru.remove(key1), None);
        assert_eq!(lru.remove(99), None);
        lru.touch(key1);

        assert_eq!(keys(&lru), vec!["key2"]);
    }

    #[test]
    fn test_lru_slots_are_recycled() {
        let mut lru = LruTracker::new();

        let a = lru.push_back("a");
        lru.push_back("b");
        lru.remove(a);
        let c = lru.push_back("c");

        assert_eq!(c, a, "Freed slot should be reused");
        assert_eq!(keys(&lru), vec!["b", "c"]);
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let mut lru = LruTracker::new();

        let a = lru.push_back("a");
        let b = lru.push_back("b");
        let c = lru.push_back("c");

        // touch(a): [b, c, a]
        // touch(c): [b, a, c]
        // touch(b): [a, c, b]
        lru.touch(a);
        lru.touch(c);
        lru.touch(b);

        assert_eq!(lru.evict_oldest(), Some("a"));
        assert_eq!(lru.evict_oldest(), Some("c"));
        assert_eq!(lru.evict_oldest(), Some("b"));
        assert!(lru.is_empty());
    }

    #[test]
    fn test_lru_single_element_remove_resets_ends() {
        let mut lru = LruTracker::new();

        let only = lru.push_back("only");
        lru.remove(only);
        lru.push_back("next");

        assert_eq!(lru.peek_oldest(), Some(&"next"));
        assert_eq!(keys(&lru), vec!["next"]);
    }
}
