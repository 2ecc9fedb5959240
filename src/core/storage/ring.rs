use crate::{
    Error,
    Result,
};

/// Ring/bounded buffer of bytes.
///
/// Unlike a plain queue, bytes can be written at an offset past the current
/// end which leaves a gap of unspecified bytes behind. This lets out of order
/// data be parked until the gap is filled in.
#[derive(Clone, Debug)]
pub struct Ring {
    buffer: Vec<u8>,
    begin: usize,
    len: usize,
}

impl Ring {
    /// Creates a ring with a fixed capacity in bytes.
    pub fn new(capacity: usize) -> Ring {
        Ring {
            buffer: vec![0; capacity],
            begin: 0,
            len: 0,
        }
    }

    /// Returns the maximum number of bytes the ring can hold.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the number of bytes from the head up to the furthest byte
    /// written.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of bytes that can still be appended.
    pub fn free(&self) -> usize {
        self.capacity() - self.len
    }

    /// Discards all bytes.
    pub fn clear(&mut self) {
        self.begin = 0;
        self.len = 0;
    }

    /// Writes data at an offset relative to the head, growing the ring if
    /// needed. Fails if the write would extend beyond the capacity.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len()).ok_or(Error::Exhausted)?;
        if end > self.capacity() {
            return Err(Error::Exhausted);
        }

        let capacity = self.capacity();
        for (i, byte) in data.iter().enumerate() {
            self.buffer[(self.begin + offset + i) % capacity] = *byte;
        }

        if end > self.len {
            self.len = end;
        }

        Ok(())
    }

    /// Writes data after the last byte in the ring.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        let len = self.len;
        self.write_at(len, data)
    }

    /// Copies buffer.len() bytes starting at an offset relative to the head
    /// without consuming them.
    pub fn peek_at(&self, offset: usize, buffer: &mut [u8]) -> Result<()> {
        if offset + buffer.len() > self.len {
            return Err(Error::Exhausted);
        }

        let capacity = self.capacity();
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.buffer[(self.begin + offset + i) % capacity];
        }

        Ok(())
    }

    /// Drops bytes from the head of the ring.
    pub fn consume(&mut self, len: usize) -> Result<()> {
        if len > self.len {
            return Err(Error::Exhausted);
        }

        if self.capacity() > 0 {
            self.begin = (self.begin + len) % self.capacity();
        }
        self.len -= len;
        Ok(())
    }

    /// Copies bytes from the head of the ring into buffer and consumes them.
    pub fn dequeue(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.peek_at(0, buffer)?;
        self.consume(buffer.len())
    }
}
