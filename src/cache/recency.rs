//! Recency Index Module
//!
//! Orders cache keys by last access for least-recently-used eviction.

use std::collections::{BTreeMap, HashMap};

// == Recency Index ==
/// Tracks access order for LRU eviction.
///
/// Every touch stamps the key with a fresh tick. `by_tick` keeps ticks sorted,
/// so the oldest key is its first element and touching or removing a key is
/// O(log n).
#[derive(Debug, Default)]
pub struct RecencyIndex {
    next_tick: u64,
    tick_of: HashMap<String, u64>,
    by_tick: BTreeMap<u64, String>,
}

impl RecencyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a key as most recently used, adding it if absent.
    pub fn touch(&mut self, key: &str) {
        let tick = self.next_tick;
        self.next_tick += 1;

        match self.tick_of.get_mut(key) {
            Some(previous) => {
                self.by_tick.remove(&*previous);
                *previous = tick;
            }
            None => {
                self.tick_of.insert(key.to_string(), tick);
            }
        }
        self.by_tick.insert(tick, key.to_string());
    }

    /// Forgets a key. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.tick_of.remove(key) {
            self.by_tick.remove(&tick);
        }
    }

    /// Removes and returns the least recently used key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        let (_, key) = self.by_tick.pop_first()?;
        self.tick_of.remove(&key);
        Some(key)
    }

    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.by_tick.values().next().map(String::as_str)
    }

    /// Drops every key.
    pub fn clear(&mut self) {
        self.tick_of.clear();
        self.by_tick.clear();
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.tick_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tick_of.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tick_of.contains_key(key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_index_is_empty() {
        let index = RecencyIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.peek_oldest(), None);
    }

    #[test]
    fn test_oldest_is_first_touched() {
        let mut index = RecencyIndex::new();
        index.touch("a");
        index.touch("b");
        index.touch("c");

        assert_eq!(index.len(), 3);
        assert_eq!(index.peek_oldest(), Some("a"));
    }

    #[test]
    fn test_touch_moves_key_to_newest() {
        let mut index = RecencyIndex::new();
        index.touch("a");
        index.touch("b");
        index.touch("c");
        index.touch("a");

        assert_eq!(index.len(), 3);
        assert_eq!(index.pop_oldest(), Some("b".to_string()));
        assert_eq!(index.pop_oldest(), Some("c".to_string()));
        assert_eq!(index.pop_oldest(), Some("a".to_string()));
        assert_eq!(index.pop_oldest(), None);
    }

    #[test]
    fn test_remove_forgets_key() {
        let mut index = RecencyIndex::new();
        index.touch("a");
        index.touch("b");
        index.remove("a");
        index.remove("missing");

        assert!(!index.contains("a"));
        assert_eq!(index.len(), 1);
        assert_eq!(index.pop_oldest(), Some("b".to_string()));
    }

    #[test]
    fn test_repeated_touch_keeps_single_slot() {
        let mut index = RecencyIndex::new();
        index.touch("k");
        index.touch("k");
        index.touch("k");

        assert_eq!(index.len(), 1);
        assert_eq!(index.pop_oldest(), Some("k".to_string()));
        assert!(index.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut index = RecencyIndex::new();
        index.touch("a");
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.pop_oldest(), None);
    }
}
