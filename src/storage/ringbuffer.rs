/// Fixed-size circular buffer that hands out its contents as one contiguous,
/// oldest-first slice. Every write lands twice, once in each half of the
/// backing storage, so the last `len` elements never wrap.
pub struct SliceableRingBuffer<T: Clone> {
    buffer: Vec<T>,
    write_position: usize,
    len: usize,
    capacity: usize,
}

impl<T: Clone> SliceableRingBuffer<T> {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize, default_value: T) -> Self {
        SliceableRingBuffer {
            buffer: vec![default_value; capacity * 2],
            write_position: 0,
            len: 0,
            capacity,
        }
    }

    // Overwrites the oldest element once full.
    pub fn write(&mut self, data: T) {
        self.buffer[self.write_position] = data.clone();
        self.buffer[self.write_position + self.capacity] = data;

        self.write_position = (self.write_position + 1) % self.capacity;
        self.len = (self.len + 1).min(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get_slice(&self) -> &[T] {
        self.get_slice_with_len(self.len)
    }

    // The most recent `len` elements, clamped to what has been written.
    pub fn get_slice_with_len(&self, len: usize) -> &[T] {
        let len = len.min(self.len);
        let start = (self.write_position + (self.capacity - len)) % self.capacity;
        &self.buffer[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use super::SliceableRingBuffer;

    #[test]
    fn starts_empty() {
        let rb = SliceableRingBuffer::new(5, 0);
        assert!(rb.is_empty());
        assert_eq!(rb.get_slice(), &[] as &[i32]);
    }

    #[test]
    fn partial_fill() {
        let mut rb = SliceableRingBuffer::new(5, 0);
        for i in 1..=3 {
            rb.write(i);
        }
        assert_eq!(rb.get_slice(), &[1, 2, 3]);
        assert_eq!(rb.len(), 3);
    }

    #[test]
    fn writing_and_reading() {
        let mut rb = SliceableRingBuffer::new(5, 0);
        for i in 1..=5 {
            rb.write(i);
        }
        assert_eq!(rb.get_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn overwriting_elements() {
        let mut rb = SliceableRingBuffer::new(5, 0);
        for i in 1..=13 {
            rb.write(i);
        }
        assert_eq!(rb.get_slice(), &[9, 10, 11, 12, 13]);
        assert_eq!(rb.len(), 5);
        assert!(!rb.is_empty());
    }

    #[test]
    fn get_slice_with_len() {
        let mut rb = SliceableRingBuffer::new(5, 0);
        for i in 1..=13 {
            rb.write(i);
        }
        assert_eq!(rb.get_slice_with_len(3), &[11, 12, 13]);
        assert_eq!(rb.get_slice_with_len(9), &[9, 10, 11, 12, 13]);
    }
}
