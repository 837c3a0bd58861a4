//! # Colony Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixture armies, colonies, and seeded RNGs
//! - Determinism checks for battle replays
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
