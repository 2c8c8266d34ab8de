//! Batch buffer.

/// Accumulates items until a batch is full.
///
/// Owned by the single collector loop, so no locking is involved.
#[derive(Debug)]
pub struct BatchBuffer<T> {
    capacity: usize,
    items: Vec<T>,
}

impl<T> BatchBuffer<T> {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: T) -> BatchAddResult {
        self.items.push(item);
        let count = self.items.len();
        if count >= self.capacity {
            BatchAddResult::ShouldFlush { count }
        } else {
            BatchAddResult::Added { count }
        }
    }

    /// Hand out the buffered items and start a fresh batch.
    pub fn take(&mut self) -> Vec<T> {
        std::mem::replace(&mut self.items, Vec::with_capacity(self.capacity))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchAddResult {
    Added { count: usize },
    ShouldFlush { count: usize },
}

impl BatchAddResult {
    pub fn should_flush(&self) -> bool {
        matches!(self, BatchAddResult::ShouldFlush { .. })
    }

    pub fn count(&self) -> usize {
        match self {
            BatchAddResult::Added { count } | BatchAddResult::ShouldFlush { count } => *count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_empty() {
        let buffer: BatchBuffer<String> = BatchBuffer::new(5);
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_buffer_flush_at_capacity() {
        let mut buffer = BatchBuffer::new(3);
        assert!(!buffer.push(1).should_flush());
        assert!(!buffer.push(2).should_flush());

        let result = buffer.push(3);
        assert!(result.should_flush());
        assert_eq!(result.count(), 3);
    }

    #[test]
    fn test_take_resets() {
        let mut buffer = BatchBuffer::new(10);
        buffer.push("a");
        buffer.push("b");
        assert_eq!(buffer.len(), 2);

        let items = buffer.take();
        assert_eq!(items, vec!["a", "b"]);
        assert!(buffer.is_empty());
        assert!(!buffer.push("c").should_flush());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buffer = BatchBuffer::new(0);
        assert!(buffer.push(42).should_flush());
        assert_eq!(buffer.take(), vec![42]);
    }

    #[test]
    fn test_add_result_methods() {
        let added = BatchAddResult::Added { count: 5 };
        let should_flush = BatchAddResult::ShouldFlush { count: 10 };

        assert!(!added.should_flush());
        assert_eq!(added.count(), 5);

        assert!(should_flush.should_flush());
        assert_eq!(should_flush.count(), 10);
    }
}
