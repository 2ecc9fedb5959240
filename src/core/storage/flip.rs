/// A handle to bytes allocated in a FlipBuffer.
///
/// Handles are tagged with the generation of the half they were allocated
/// in, so a handle outliving a flip resolves to nothing instead of to someone
/// else's bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handle {
    half: usize,
    generation: u16,
    offset: usize,
    len: usize,
}

#[derive(Clone, Debug)]
struct Half {
    buffer: Vec<u8>,
    size: usize,
    generation: u16,
}

impl Half {
    fn reset(&mut self) {
        self.size = 0;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Double buffered bump allocator for short lived payloads.
///
/// Allocations are carved from the current half until it runs out of space,
/// at which point the other half is reset and becomes current. Everything
/// that was allocated in it is invalidated.
#[derive(Clone, Debug)]
pub struct FlipBuffer {
    halves: [Half; 2],
    current: usize,
}

impl FlipBuffer {
    /// Creates a flip buffer where each half holds capacity bytes.
    pub fn new(capacity: usize) -> FlipBuffer {
        FlipBuffer {
            halves: [
                Half {
                    buffer: vec![0; capacity],
                    size: 0,
                    generation: 1000,
                },
                Half {
                    buffer: vec![0; capacity],
                    size: 0,
                    generation: 60000,
                },
            ],
            current: 0,
        }
    }

    /// Returns the largest allocation possible.
    pub fn capacity(&self) -> usize {
        self.halves[0].buffer.len()
    }

    /// Allocates len bytes, flipping halves if the current one is full.
    /// Returns None if len exceeds the capacity.
    pub fn alloc(&mut self, len: usize) -> Option<Handle> {
        if len > self.capacity() {
            return None;
        }

        if len > self.capacity() - self.halves[self.current].size {
            self.current = 1 - self.current;
            self.halves[self.current].reset();
        }

        let half = &mut self.halves[self.current];
        let handle = Handle {
            half: self.current,
            generation: half.generation,
            offset: half.size,
            len,
        };
        half.size += len;

        Some(handle)
    }

    /// Returns the bytes behind a handle, or None if they were invalidated
    /// by a flip.
    pub fn data(&self, handle: Handle) -> Option<&[u8]> {
        let half = self.halves.get(handle.half)?;

        if handle.generation != half.generation || handle.offset + handle.len > half.size {
            return None;
        }

        Some(&half.buffer[handle.offset .. handle.offset + handle.len])
    }

    /// Mutable version of data(...).
    pub fn data_mut(&mut self, handle: Handle) -> Option<&mut [u8]> {
        let half = self.halves.get_mut(handle.half)?;

        if handle.generation != half.generation || handle.offset + handle.len > half.size {
            return None;
        }

        Some(&mut half.buffer[handle.offset .. handle.offset + handle.len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_more_than_capacity() {
        let mut buffer = FlipBuffer::new(1024);
        assert_matches!(buffer.alloc(1025), None);
    }

    #[test]
    fn test_alloc_full_capacity() {
        let mut buffer = FlipBuffer::new(1024);
        let handle = buffer.alloc(1024).unwrap();
        assert_eq!(buffer.data(handle).map(|data| data.len()), Some(1024));
    }

    #[test]
    fn test_data_round_trips() {
        let mut buffer = FlipBuffer::new(16);
        let handle1 = buffer.alloc(3).unwrap();
        let handle2 = buffer.alloc(2).unwrap();
        buffer.data_mut(handle1).unwrap().copy_from_slice(b"abc");
        buffer.data_mut(handle2).unwrap().copy_from_slice(b"de");
        assert_eq!(buffer.data(handle1), Some(&b"abc"[..]));
        assert_eq!(buffer.data(handle2), Some(&b"de"[..]));
    }

    #[test]
    fn test_flipping_invalidates_handles() {
        let mut buffer = FlipBuffer::new(1024);

        let handle1 = buffer.alloc(512).unwrap();
        let handle2 = buffer.alloc(1024).unwrap();

        assert!(buffer.data(handle1).is_some());
        assert!(buffer.data(handle2).is_some());

        let handle3 = buffer.alloc(1).unwrap();
        assert!(buffer.data(handle1).is_none());
        assert!(buffer.data(handle2).is_some());
        assert!(buffer.data(handle3).is_some());

        let handle4 = buffer.alloc(1023).unwrap();
        assert!(buffer.data(handle1).is_none());
        assert!(buffer.data(handle2).is_some());
        assert!(buffer.data(handle3).is_some());
        assert!(buffer.data(handle4).is_some());

        let handle5 = buffer.alloc(256).unwrap();
        assert!(buffer.data(handle1).is_none());
        assert!(buffer.data(handle2).is_none());
        assert!(buffer.data(handle3).is_some());
        assert!(buffer.data(handle4).is_some());
        assert!(buffer.data(handle5).is_some());
    }
}
