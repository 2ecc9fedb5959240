//! Buffers and containers with bounded capacities.

pub mod flip;
pub mod frag;
pub mod ring;
pub mod slab;

pub use self::flip::{
    FlipBuffer,
    Handle as FlipHandle,
};
pub use self::frag::FragBuffer;
pub use self::ring::Ring;
pub use self::slab::{
    Handle as SlabHandle,
    Slab,
};
