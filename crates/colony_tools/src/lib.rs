//! # Colony Warfare Development Tools
//!
//! Command-line tools for tuning combat:
//! - One-off battle simulation
//! - Combat config validation
//! - Parallel balance batches

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod balance;
pub mod error;
pub mod simulate;
pub mod validate;
