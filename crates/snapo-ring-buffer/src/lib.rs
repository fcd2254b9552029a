//! Fixed-capacity FIFO with overwrite and drop accounting.
//!
//! A circular array of optional slots with `head`, `tail`, `count`, and
//! `dropped`. Capacity is fixed at construction; `append` is O(1), `all`
//! materializes an in-order snapshot in O(n).

/// Contract: `count <= capacity` always; `all().len() == count`; `dropped`
/// is monotonically non-decreasing between [`RingBuffer::consume_drop_count`]
/// calls. Capacity 0 accepts nothing and never panics.
#[derive(Debug)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    capacity: usize,
    head: usize,
    count: usize,
    dropped: u64,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            capacity,
            head: 0,
            count: 0,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends `value`. Returns the evicted element when the buffer was
    /// already full (or, for a capacity-0 buffer, `value` itself -- nothing
    /// is ever stored). Increments the drop counter on every eviction.
    pub fn append(&mut self, value: T) -> Option<T> {
        if self.capacity == 0 {
            self.dropped += 1;
            return Some(value);
        }

        let tail = (self.head + self.count) % self.capacity;

        if self.count < self.capacity {
            self.slots[tail] = Some(value);
            self.count += 1;
            None
        } else {
            let evicted = self.slots[self.head].take();
            self.slots[self.head] = Some(value);
            self.head = (self.head + 1) % self.capacity;
            self.dropped += 1;
            evicted
        }
    }

    /// An in-order snapshot of every element currently held, oldest first.
    pub fn all(&self) -> Vec<&T>
    where
        T: Sized,
    {
        let mut out = Vec::with_capacity(self.count);
        for i in 0..self.count {
            let idx = (self.head + i) % self.capacity.max(1);
            if let Some(v) = &self.slots[idx] {
                out.push(v);
            }
        }
        out
    }

    /// Reads and zeros the drop counter accumulated since the last call.
    pub fn consume_drop_count(&mut self) -> u64 {
        std::mem::take(&mut self.dropped)
    }

    /// Clears all elements and the drop counter; capacity is unchanged.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.count = 0;
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_keeps_last_capacity_insertions() {
        // S4 -- capacity 3; inserts e1..e5.
        let mut rb = RingBuffer::new(3);
        for v in ["e1", "e2", "e3", "e4", "e5"] {
            rb.append(v);
        }
        assert_eq!(rb.all(), vec![&"e3", &"e4", &"e5"]);
        assert_eq!(rb.consume_drop_count(), 2);
        assert_eq!(rb.consume_drop_count(), 0);
    }

    #[test]
    fn capacity_zero_accepts_nothing_and_never_panics() {
        let mut rb: RingBuffer<i32> = RingBuffer::new(0);
        let evicted = rb.append(1);
        assert_eq!(evicted, Some(1));
        assert_eq!(rb.len(), 0);
        assert!(rb.all().is_empty());
    }

    #[test]
    fn property_all_equals_last_capacity_insertions_for_any_n_ge_capacity() {
        let capacity = 4usize;
        let n = 11usize;
        let mut rb = RingBuffer::new(capacity);
        for i in 0..n {
            rb.append(i);
        }
        let expected: Vec<usize> = ((n - capacity)..n).collect();
        let got: Vec<usize> = rb.all().into_iter().copied().collect();
        assert_eq!(got, expected);
        assert_eq!(rb.consume_drop_count(), (n - capacity) as u64);
    }

    #[test]
    fn reset_zeros_state_but_preserves_capacity() {
        let mut rb = RingBuffer::new(2);
        rb.append(1);
        rb.append(2);
        rb.append(3);
        rb.reset();
        assert_eq!(rb.len(), 0);
        assert_eq!(rb.capacity(), 2);
        assert_eq!(rb.consume_drop_count(), 0);
        assert!(rb.all().is_empty());

        rb.append(9);
        assert_eq!(rb.all(), vec![&9]);
    }

    #[test]
    fn count_never_exceeds_capacity() {
        let mut rb = RingBuffer::new(5);
        for i in 0..100 {
            rb.append(i);
            assert!(rb.len() <= rb.capacity());
        }
    }
}
