use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::{
    Error,
    Result,
};

/// A device for sending and receiving raw Ethernet frames.
pub trait Device {
    /// Sends a single frame.
    fn send(&mut self, buffer: &[u8]) -> Result<()>;

    /// Receives a single frame into buffer, returning its size.
    ///
    /// Waits at most timeout for a frame, after which `Error::Timeout` is
    /// returned.
    fn recv(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Returns the largest frame payload the device can carry.
    fn max_transmission_unit(&self) -> usize;
}

#[derive(Debug, Default)]
struct MockQueues {
    sent: VecDeque<Vec<u8>>,
    received: VecDeque<Vec<u8>>,
}

/// An in memory device which records sent frames and replays queued ones.
///
/// Clones share the same queues, so a test can keep one clone around after
/// handing another to a stack.
#[derive(Clone, Debug)]
pub struct MockDevice {
    queues: Rc<RefCell<MockQueues>>,
    mtu: usize,
}

impl MockDevice {
    pub fn new() -> MockDevice {
        MockDevice::with_mtu(1500)
    }

    pub fn with_mtu(mtu: usize) -> MockDevice {
        MockDevice {
            queues: Rc::default(),
            mtu,
        }
    }

    /// Removes and returns the oldest frame that was sent.
    pub fn pop_sent(&self) -> Option<Vec<u8>> {
        self.queues.borrow_mut().sent.pop_front()
    }

    /// Removes and returns all frames that were sent, oldest first.
    pub fn drain_sent(&self) -> Vec<Vec<u8>> {
        self.queues.borrow_mut().sent.drain(..).collect()
    }

    /// Queues a frame to be returned by recv(...).
    pub fn push_received(&self, frame: &[u8]) {
        self.queues.borrow_mut().received.push_back(frame.to_vec());
    }
}

impl Device for MockDevice {
    fn send(&mut self, buffer: &[u8]) -> Result<()> {
        self.queues.borrow_mut().sent.push_back(buffer.to_vec());
        Ok(())
    }

    fn recv(&mut self, buffer: &mut [u8], _: Duration) -> Result<usize> {
        let frame = match self.queues.borrow_mut().received.pop_front() {
            Some(frame) => frame,
            None => return Err(Error::Timeout),
        };

        if frame.len() > buffer.len() {
            return Err(Error::Exhausted);
        }

        buffer[.. frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }

    fn max_transmission_unit(&self) -> usize {
        self.mtu
    }
}

impl Default for MockDevice {
    fn default() -> MockDevice {
        MockDevice::new()
    }
}
