//! TCP connection state machine with sliding window queues.

pub mod connection;
pub mod recv_queue;
pub mod send_queue;
pub mod state;
pub mod table;

pub use self::connection::{
    Connection,
    Endpoint,
};
pub use self::recv_queue::{
    RecvQueue,
    RecvSegment,
};
pub use self::send_queue::{
    SendQueue,
    SendSegment,
};
pub use self::state::State;
pub use self::table::{
    Callback,
    ConnectionHandle,
    ConnectionTable,
};

/// Comparisons of 32 bit sequence numbers which may have wrapped around.
pub mod seq {
    /// Checks if a comes strictly after b.
    pub fn gt(a: u32, b: u32) -> bool {
        (a.wrapping_sub(b) as i32) > 0
    }

    /// Checks if a is b or comes after it.
    pub fn ge(a: u32, b: u32) -> bool {
        (a.wrapping_sub(b) as i32) >= 0
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_compare_without_wrap() {
            assert!(gt(10, 9));
            assert!(!gt(9, 9));
            assert!(ge(9, 9));
            assert!(!ge(8, 9));
        }

        #[test]
        fn test_compare_with_wrap() {
            assert!(gt(4, 0xFFFF_FFF0));
            assert!(!gt(0xFFFF_FFF0, 4));
            assert!(ge(0, u32::max_value()));
        }
    }
}
