/// An unwritten range of bytes in a FragBuffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Hole {
    start: usize,
    end: usize,
}

impl Hole {
    /// Edge to edge ranges do not overlap.
    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && self.end > start
    }
}

/// Fixed capacity byte buffer which tracks the ranges that have not been
/// written yet, see [RFC815](https://tools.ietf.org/html/rfc815).
///
/// Starts out as one hole spanning everything. The last hole always extends
/// past the capacity so "all bytes from 0 are present" is equivalent to
/// exactly one hole remaining.
#[derive(Clone, Debug)]
pub struct FragBuffer {
    buffer: Vec<u8>,
    holes: Vec<Hole>,
    max_holes: usize,
}

impl FragBuffer {
    /// Creates a buffer of capacity bytes, allowing up to capacity / 40
    /// outstanding holes.
    pub fn new(capacity: usize) -> FragBuffer {
        FragBuffer {
            buffer: vec![0; capacity],
            holes: vec![Hole {
                start: 0,
                end: usize::max_value(),
            }],
            max_holes: (capacity / 40).max(2),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Writes data at an offset. Writes reaching past the capacity are
    /// rejected whole.
    ///
    /// Data is only copied if it fills at least part of a hole, in which case
    /// all of it is copied (overwriting bytes that were already present).
    /// Returns false if nothing was written, which includes the case where the
    /// write would split the holes beyond the allowed count.
    pub fn insert(&mut self, offset: usize, data: &[u8]) -> bool {
        let end = offset.saturating_add(data.len());
        if offset >= end || end > self.capacity() {
            return false;
        }

        let mut holes = Vec::with_capacity(self.holes.len() + 1);
        let mut removed_holes = false;

        for hole in self.holes.iter() {
            if !hole.overlaps(offset, end) {
                holes.push(*hole);
                continue;
            }

            removed_holes = true;

            if hole.start < offset {
                holes.push(Hole {
                    start: hole.start,
                    end: offset,
                });
            }

            if hole.end > end {
                holes.push(Hole {
                    start: end,
                    end: hole.end,
                });
            }
        }

        if !removed_holes || holes.len() > self.max_holes {
            return false;
        }

        self.holes = holes;
        self.buffer[offset .. end].copy_from_slice(data);
        true
    }

    /// Returns the number of bytes present from offset 0 if there are no
    /// holes before the final one, else 0.
    pub fn continuous_size(&self) -> usize {
        if self.holes.len() != 1 {
            return 0;
        }

        self.holes[0].start
    }

    /// Returns the whole underlying buffer.
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }
}
