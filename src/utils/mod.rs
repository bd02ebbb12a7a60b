//! Utility functions and helpers.
//!
//! - [`hash`]: streamed MD5 content hashing

/// Content hashing
pub mod hash;
