//! # Hegemony Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Force and commander fixtures
//! - Balance statistics over many engagements
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
