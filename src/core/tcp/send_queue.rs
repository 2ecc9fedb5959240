use std::collections::VecDeque;

use crate::core::storage::Ring;
use crate::core::tcp::seq;

/// Bytes of unacknowledged payload which can be buffered.
pub const DATA_CAPACITY: usize = 0xFFFF;

/// Maximum number of unacknowledged segments.
pub const MAX_SEGMENTS: usize = 100;

/// Window assumed until the remote says otherwise.
pub const DEFAULT_WINDOW: usize = 0xFFFF;

/// An outgoing segment, minus its payload.
///
/// data_len bytes are buffered for the segment while send_len is what it
/// counts against the window. Phantom bytes for SYN and FIN are buffered but
/// not counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendSegment {
    pub flags: u16,
    pub seq_num: u32,
    pub data_len: usize,
    pub send_len: usize,
}

/// Outgoing segments kept until the remote acknowledges them.
#[derive(Debug)]
pub struct SendQueue {
    ack_cursor: u32,
    write_cursor: u32,
    /// Index of the next segment to be sent.
    read_pos: usize,
    window: usize,
    data: Ring,
    segments: VecDeque<SendSegment>,
}

impl SendQueue {
    pub fn new() -> SendQueue {
        let mut send_queue = SendQueue {
            ack_cursor: 0,
            write_cursor: 0,
            read_pos: 0,
            window: DEFAULT_WINDOW,
            data: Ring::new(DATA_CAPACITY),
            segments: VecDeque::with_capacity(MAX_SEGMENTS),
        };
        send_queue.reset(0);
        send_queue
    }

    /// Appends a segment, returning false if there is no room or seq_num is
    /// not the write cursor.
    pub fn write_back(&mut self, flags: u16, seq_num: u32, data: &[u8], send_len: usize) -> bool {
        if data.len() > self.data.free() || self.segments.len() >= MAX_SEGMENTS {
            return false;
        }

        if seq_num != self.write_cursor {
            return false;
        }

        if self.data.append(data).is_err() {
            return false;
        }

        self.segments.push_back(SendSegment {
            flags,
            seq_num,
            data_len: data.len(),
            send_len,
        });
        self.write_cursor = self.write_cursor.wrapping_add(data.len() as u32);
        true
    }

    /// Copies the next unsent segment within the window into buffer.
    ///
    /// The segment stays queued until acknowledged.
    pub fn read_one_segment(&mut self, buffer: &mut [u8]) -> Option<SendSegment> {
        let segment = *self.segments.get(self.read_pos)?;
        let offset = segment.seq_num.wrapping_sub(self.ack_cursor) as usize;

        if offset + segment.send_len > self.window || segment.data_len > buffer.len() {
            return None;
        }

        self.data
            .peek_at(offset, &mut buffer[.. segment.data_len])
            .ok()?;
        self.read_pos += 1;
        Some(segment)
    }

    pub fn has_readable(&self) -> bool {
        self.segments.len() > self.read_pos
    }

    pub fn set_window(&mut self, window: usize) {
        self.window = window;
    }

    /// Drops all segments fully covered by ack_num so they won't be sent
    /// again.
    pub fn ack(&mut self, ack_num: u32) {
        while seq::gt(ack_num, self.ack_cursor) {
            let segment = match self.segments.front() {
                Some(segment) => *segment,
                None => break,
            };

            let end = segment.seq_num.wrapping_add(segment.data_len as u32);
            if seq::gt(end, ack_num) {
                break;
            }

            debug!("Acknowledged segment {}.", segment.seq_num);

            if self.data.consume(segment.data_len).is_err() {
                break;
            }
            self.segments.pop_front();
            if self.read_pos > 0 {
                self.read_pos -= 1;
            }
            self.ack_cursor = end;
        }
    }

    /// Returns the sequence number of the next byte written.
    pub fn write_cursor(&self) -> u32 {
        self.write_cursor
    }

    /// Drops all segments and starts sequencing at seq_num.
    pub fn reset(&mut self, seq_num: u32) {
        self.read_pos = 0;
        self.ack_cursor = seq_num;
        self.write_cursor = seq_num;
        self.data.clear();
        self.segments.clear();
        self.window = DEFAULT_WINDOW;
    }
}

impl Default for SendQueue {
    fn default() -> SendQueue {
        SendQueue::new()
    }
}
