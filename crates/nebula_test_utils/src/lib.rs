//! # Nebula Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Scenario builder fixtures
//! - Determinism and purity harness
//! - Ground combat balance sweeps
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
