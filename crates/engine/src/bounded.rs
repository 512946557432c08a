use std::collections::VecDeque;

/// A FIFO sequence that never holds more than `capacity` items.
///
/// [`append`](Self::append) is the only way to grow the queue and evicts the
/// oldest item once the cap is reached, so the length invariant cannot be
/// broken by callers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build from persisted items (oldest first), keeping only the newest
    /// `capacity` of them.
    pub fn from_items(capacity: usize, items: impl IntoIterator<Item = T>) -> Self {
        let mut queue = Self::new(capacity);
        for item in items {
            queue.append(item);
        }
        queue
    }

    /// Push `item` to the back.  Returns the evicted item, if any.
    pub fn append(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// The newest `n` items, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        self.items.iter().skip(self.items.len().saturating_sub(n))
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> BoundedQueue<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::BoundedQueue;

    #[test]
    fn append_evicts_oldest_at_capacity() {
        let mut queue = BoundedQueue::new(3);
        assert_eq!(queue.append(1), None);
        assert_eq!(queue.append(2), None);
        assert_eq!(queue.append(3), None);
        assert_eq!(queue.append(4), Some(1));
        assert_eq!(queue.to_vec(), vec![2, 3, 4]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn from_items_keeps_newest() {
        let queue = BoundedQueue::from_items(2, vec!["a", "b", "c", "d"]);
        assert_eq!(queue.to_vec(), vec!["c", "d"]);
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let queue = BoundedQueue::from_items(10, 0..8);
        assert_eq!(queue.recent(3).copied().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert_eq!(queue.recent(20).count(), 8);
        assert_eq!(queue.last(), Some(&7));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut queue = BoundedQueue::new(0);
        assert_eq!(queue.append("x"), Some("x"));
        assert!(queue.is_empty());
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut queue = BoundedQueue::new(50);
        for i in 0..137 {
            queue.append(i);
            assert!(queue.len() <= 50);
        }
        assert_eq!(queue.len(), 50);
        assert_eq!(queue.iter().next(), Some(&87));
        assert_eq!(queue.last(), Some(&136));
    }
}
