//! Core, platform independent networking code.

pub mod arp_cache;
pub mod check;
pub mod config;
pub mod dev;
pub mod repr;
pub mod service;
pub mod stack;
pub mod storage;
pub mod tcp;
pub mod time;
