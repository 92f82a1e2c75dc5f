use std::ops::{Index, IndexMut};

/// A fixed-size ring buffer addressed by absolute time step
///
/// Time step `t` lives in slot `t % capacity`, so only the most recent `capacity` steps are
/// retained. This is the sliding window used by n-step methods, where `capacity = n + 1`.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
}

impl<T: Clone + Default> RingBuffer<T> {
    /// Construct a new `RingBuffer` of default values for `T`
    ///
    /// **Panics** if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Ring buffer capacity must be positive.");
        Self {
            buffer: vec![T::default(); capacity],
        }
    }
}

impl<T> RingBuffer<T> {
    /// Returns the buffer length
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Store the element for time step `t`, overwriting whatever was stored `len()` steps earlier
    pub fn store(&mut self, t: usize, item: T) {
        let len = self.len();
        self.buffer[t % len] = item;
    }
}

impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, t: usize) -> &Self::Output {
        &self.buffer[t % self.buffer.len()]
    }
}

impl<T> IndexMut<usize> for RingBuffer<T> {
    fn index_mut(&mut self, t: usize) -> &mut Self::Output {
        let len = self.buffer.len();
        &mut self.buffer[t % len]
    }
}
