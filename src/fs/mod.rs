//! Filesystem helpers for muster.
//!
//! All store mutations go through the atomic write functions in this
//! module so a reader never observes a partially written file.

mod atomic;

pub use atomic::{atomic_write_bytes, atomic_write_json, atomic_write_yaml, read_json, read_yaml};
