//! Common types and utilities for the rulecheck workspace.
//!
//! This crate provides foundational types used across all rulecheck crates:
//! - Source spans (`Span`)
//! - Line/column conversion (`LineMap`, `Position`)
//! - Evaluation and worker limits
//! - The normalized rule-run result shared by the worker and its callers
//! - Tracing subscriber setup

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Position types for line/column source locations
pub mod position;
pub use position::{LineMap, Position};

// Centralized limits and thresholds
pub mod limits;

// Normalized result of running a rule under test
pub mod result;
pub use result::{Diagnostic, NormalizedResult, RuleMetaSummary, Suggestion};

// Tracing configuration
pub mod tracing_config;

#[cfg(test)]
#[path = "tests/position_tests.rs"]
mod position_tests;

#[cfg(test)]
#[path = "tests/result_tests.rs"]
mod result_tests;

#[cfg(test)]
#[path = "tests/tracing_config_tests.rs"]
mod tracing_config_tests;
