//! Abstractions for providing the current time.

use std::fmt::Debug;
use std::time::{
    Duration,
    Instant,
};

/// An environment that provides the current time.
pub trait Env: Clone + Debug {
    /// Returns an instance corresponding to "now".
    fn now_instant(&self) -> Instant;
}

/// An environment that provides system based time.
#[derive(Clone, Debug)]
pub struct SystemEnv;

impl SystemEnv {
    pub fn new() -> SystemEnv {
        SystemEnv {}
    }
}

impl Env for SystemEnv {
    fn now_instant(&self) -> Instant {
        Instant::now()
    }
}

/// An environment that provides a configurable time.
#[derive(Clone, Debug)]
pub struct MockEnv {
    pub now: Instant,
}

impl MockEnv {
    pub fn new() -> MockEnv {
        MockEnv {
            now: Instant::now(),
        }
    }
}

impl Env for MockEnv {
    fn now_instant(&self) -> Instant {
        self.now
    }
}

/// Measures the milliseconds elapsed between successive calls, for driving
/// the protocol timers.
#[derive(Clone, Debug)]
pub struct Ticker<T: Env = SystemEnv> {
    env: T,
    last: Instant,
}

impl<T: Env> Ticker<T> {
    pub fn new(env: T) -> Ticker<T> {
        let last = env.now_instant();
        Ticker { env, last }
    }

    /// Returns the whole milliseconds since the previous call (or creation).
    ///
    /// Sub millisecond remainders carry over to the next call so repeated
    /// short intervals still add up.
    pub fn elapsed_ms(&mut self) -> u32 {
        let now = self.env.now_instant();
        let elapsed = now.duration_since(self.last);
        let elapsed_ms = elapsed.as_secs() * 1000 + (elapsed.subsec_nanos() / 1_000_000) as u64;
        self.last += Duration::from_millis(elapsed_ms);
        elapsed_ms.min(u32::max_value() as u64) as u32
    }

    pub fn env_mut(&mut self) -> &mut T {
        &mut self.env
    }
}
