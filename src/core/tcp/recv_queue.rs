use crate::core::storage::Ring;

/// Bytes of payload which can be buffered ahead of the read cursor.
pub const DATA_CAPACITY: usize = 0xFFFF;

/// Maximum number of segments waiting to be read.
pub const MAX_SEGMENTS: usize = 200;

/// A received segment, minus its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecvSegment {
    pub flags: u16,
    pub seq_num: u32,
    pub len: usize,
}

/// A queue that reorders and deduplicates received segments.
///
/// Payloads are parked in a ring at their offset from the read cursor, so
/// segments can arrive in any order but are read back strictly in sequence.
#[derive(Debug)]
pub struct RecvQueue {
    segments: Vec<RecvSegment>,
    data: Ring,
    read_cursor: u32,
}

impl RecvQueue {
    pub fn new() -> RecvQueue {
        RecvQueue {
            segments: Vec::with_capacity(MAX_SEGMENTS),
            data: Ring::new(DATA_CAPACITY),
            read_cursor: 0,
        }
    }

    /// Inserts a segment, returning false if it could not be stored.
    ///
    /// Segments must carry at least one byte and fit within the buffer
    /// relative to the read cursor. A segment whose sequence number is
    /// already queued is treated as a retransmission and dropped.
    pub fn insert(&mut self, flags: u16, seq_num: u32, data: &[u8]) -> bool {
        if data.is_empty() || self.segments.len() >= MAX_SEGMENTS {
            return false;
        }

        let offset = seq_num.wrapping_sub(self.read_cursor) as usize;
        if offset + data.len() > self.data.capacity() {
            return false;
        }

        if self.segments.iter().any(|segment| segment.seq_num == seq_num) {
            return true;
        }

        if self.data.write_at(offset, data).is_err() {
            return false;
        }

        self.segments.push(RecvSegment {
            flags,
            seq_num,
            len: data.len(),
        });
        true
    }

    /// Reads the segment at the read cursor into buffer, advancing the
    /// cursor past it.
    pub fn read_one_segment(&mut self, buffer: &mut [u8]) -> Option<RecvSegment> {
        self.drop_stale_segments();

        let index = self.front_segment()?;
        let segment = self.segments[index];

        if segment.seq_num != self.read_cursor || segment.len > buffer.len() {
            return None;
        }

        self.data.dequeue(&mut buffer[.. segment.len]).ok()?;
        self.segments.swap_remove(index);
        self.read_cursor = self.read_cursor.wrapping_add(segment.len as u32);
        Some(segment)
    }

    /// Returns the end of the continuous chunk starting at the read cursor.
    pub fn readable_until(&self) -> u32 {
        match self.readable_segment() {
            Some(segment) => self.read_cursor.wrapping_add(segment.len as u32),
            None => self.read_cursor,
        }
    }

    pub fn has_readable(&self) -> bool {
        self.readable_segment().is_some()
    }

    /// Returns the next sequence number expected from the remote.
    pub fn read_cursor(&self) -> u32 {
        self.read_cursor
    }

    /// Drops all segments and expects seq_num next.
    pub fn reset(&mut self, seq_num: u32) {
        self.read_cursor = seq_num;
        self.data.clear();
        self.segments.clear();
    }

    fn offset(&self, segment: &RecvSegment) -> usize {
        segment.seq_num.wrapping_sub(self.read_cursor) as usize
    }

    fn readable_segment(&self) -> Option<&RecvSegment> {
        self.front_segment()
            .map(|index| &self.segments[index])
            .filter(|segment| segment.seq_num == self.read_cursor)
    }

    fn front_segment(&self) -> Option<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|&(_, segment)| self.offset(segment) < self.data.capacity())
            .min_by_key(|&(_, segment)| self.offset(segment))
            .map(|(index, _)| index)
    }

    /// Segments which overlapped one already read now start behind the
    /// cursor.
    fn drop_stale_segments(&mut self) {
        let read_cursor = self.read_cursor;
        let capacity = self.data.capacity();
        self.segments
            .retain(|segment| (segment.seq_num.wrapping_sub(read_cursor) as usize) < capacity);
    }
}

impl Default for RecvQueue {
    fn default() -> RecvQueue {
        RecvQueue::new()
    }
}
