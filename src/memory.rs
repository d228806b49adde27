/// Fixed-capacity ring of the most recently occupied places.
///
/// Pushing at capacity overwrites the oldest slot. A zero-capacity window
/// remembers nothing.
#[derive(Debug, Clone)]
pub struct MemoryWindow<P> {
    slots: Vec<P>,
    capacity: usize,
    // Slot the next push writes to once the window is full.
    head: usize,
}

impl<P: Copy> MemoryWindow<P> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            head: 0,
        }
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

    pub fn push(&mut self, place: P) {
        if self.capacity == 0 {
            return;
        }
        if self.slots.len() < self.capacity {
            self.slots.push(place);
        } else {
            self.slots[self.head] = place;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn any(&self, mut pred: impl FnMut(&P) -> bool) -> bool {
        self.slots.iter().any(|p| pred(p))
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn evicts_oldest_first() {
        let mut window = MemoryWindow::new(3);
        for value in 1..=3 {
            window.push(value);
        }
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        window.push(4);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        window.push(5);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert!(!window.any(|&v| v == 2));
    }

    #[test]
    fn zero_capacity_remembers_nothing() {
        let mut window = MemoryWindow::new(0);
        window.push(1);
        assert!(window.is_empty());
        assert!(!window.any(|_| true));
    }

    #[test]
    fn huge_capacity_allocates_lazily() {
        let mut window = MemoryWindow::new(usize::MAX / 4);
        window.push(7u64);
        window.push(8);
        assert_eq!(window.len(), 2);
        assert_eq!(window.capacity(), usize::MAX / 4);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(
            capacity in 0usize..16,
            values in prop::collection::vec(any::<i32>(), 0..64),
        ) {
            let mut window = MemoryWindow::new(capacity);
            for &v in &values {
                window.push(v);
                prop_assert!(window.len() <= capacity);
            }
            let keep = values.len().min(capacity);
            let expected: Vec<i32> = values[values.len() - keep..].to_vec();
            prop_assert_eq!(window.iter().copied().collect::<Vec<_>>(), expected);
        }
    }
}
