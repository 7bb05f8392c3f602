//! # Hegemony Development Tools
//!
//! Command-line tools for development:
//! - Data validators for rulesets, engine configs and scenarios

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;
