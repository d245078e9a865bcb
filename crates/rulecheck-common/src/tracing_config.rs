//! Tracing configuration.
//!
//! Supports three output formats controlled by `RULECHECK_LOG_FORMAT`:
//!
//! - `text` (default): Standard `tracing-subscriber` flat output
//! - `tree`: Hierarchical indented output via `tracing-tree`
//! - `json`: One JSON object per span/event
//!
//! ## Quick start
//!
//! The embedding binary installs the subscriber once, at startup:
//!
//! ```no_run
//! rulecheck_common::tracing_config::init_tracing();
//! ```
//!
//! ```bash
//! # Follow worker lifecycle and restarts
//! RULECHECK_LOG=rulecheck_worker=debug my-test-runner
//!
//! # Trace every evaluator step as a tree
//! RULECHECK_LOG=rulecheck_eval=trace RULECHECK_LOG_FORMAT=tree my-test-runner
//! ```
//!
//! The subscriber is only initialised when `RULECHECK_LOG` (or `RUST_LOG`) is
//! set, so embedding hosts that install their own subscriber are unaffected.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Standard flat text lines (default).
    Text,
    /// Hierarchical indented tree via `tracing-tree`.
    Tree,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    /// Parse a format name; anything unrecognized is `Text`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("RULECHECK_LOG_FORMAT").unwrap_or_default())
    }
}

/// Build an `EnvFilter` from `RULECHECK_LOG`, falling back to `RUST_LOG`.
fn build_filter() -> EnvFilter {
    if let Ok(val) = std::env::var("RULECHECK_LOG") {
        EnvFilter::builder().parse_lossy(val)
    } else {
        EnvFilter::from_default_env()
    }
}

/// Initialise the global tracing subscriber.
///
/// Does nothing when neither `RULECHECK_LOG` nor `RUST_LOG` is set. Calling it
/// more than once is harmless: later calls leave the first subscriber in place.
/// All output goes to stderr.
pub fn init_tracing() {
    let has_own_log = std::env::var("RULECHECK_LOG").is_ok();
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !has_own_log && !has_rust_log {
        return;
    }

    let filter = build_filter();

    // try_init: a host process may already own the global subscriber
    let _ = match LogFormat::from_env() {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_targets(true)
                .with_writer(std::io::stderr);

            Registry::default().with(filter).with(tree_layer).try_init()
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).try_init()
        }
        LogFormat::Text => {
            let text_layer = fmt::layer().with_writer(std::io::stderr);
            Registry::default().with(filter).with(text_layer).try_init()
        }
    };
}
