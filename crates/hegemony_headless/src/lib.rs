//! Headless engagement runner for balance testing and CI verification.
//!
//! This crate drives the engine from scenario files without any interactive
//! surface. It enables:
//!
//! - **Balance testing**: thousands of seeded engagements in parallel
//! - **CI verification**: determinism checks over repeated runs
//! - **Replay verification**: records that must reproduce their digest
//!
//! # Output
//!
//! - **stdout**: narrative reports or JSON results
//! - **stderr**: logs (human-readable, filtered by `RUST_LOG`)
//!
//! # Example
//!
//! ```bash
//! # Resolve a built-in scenario once
//! cargo run -p hegemony_headless -- run --scenario border_clash --seed 7
//!
//! # Balance batch
//! cargo run -p hegemony_headless -- batch --scenario assets/scenarios/siege_relief.ron --count 1000
//!
//! # Record and replay
//! cargo run -p hegemony_headless -- record --scenario border_clash --seed 7 --output clash.bin
//! cargo run -p hegemony_headless -- replay --file clash.bin
//! ```

pub mod batch;
pub mod metrics;
pub mod narrative;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, EngagementMetrics};
pub use narrative::Narrator;
pub use runner::OutputFormat;
pub use scenario::{Scenario, ScenarioError};
