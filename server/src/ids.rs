/// Hands out monotonically increasing entity ids
///
/// One allocator exists per entity kind. Restoring a snapshot calls
/// `advance_next` for every restored id so fresh ids never collide with
/// restored ones.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Ensures the next allocated id is greater than `used`
    pub fn advance_next(&mut self, used: u64) {
        if used >= self.next {
            self.next = used.saturating_add(1);
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_allocation() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.allocate(), 0);
        assert_eq!(ids.allocate(), 1);
        assert_eq!(ids.allocate(), 2);
    }

    #[test]
    fn test_advance_past_restored_id() {
        let mut ids = IdAllocator::starting_at(1);
        ids.advance_next(5);
        assert_eq!(ids.allocate(), 6);
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let mut ids = IdAllocator::default();
        ids.advance_next(10);
        ids.advance_next(3);
        assert_eq!(ids.allocate(), 11);
    }

    #[test]
    fn test_advance_on_equal_id() {
        let mut ids = IdAllocator::default();
        ids.allocate();
        ids.advance_next(1);
        assert_eq!(ids.allocate(), 2);
    }
}
