//! Execution workers for rulecheck.
//!
//! This crate provides:
//! - `WorkerPool` - Per-package workers with restart-on-resave
//! - `WorkerService` / `LinterService` - Synchronous calls into a worker
//! - `ModuleHost` - Per-worker module loading and caching
//! - `RuleRunner` / `lint` - One rule over one test case
//! - `Rule` / `RuleContext` - The interface rules are written against

pub mod config;
pub mod linter;
pub mod message_template;
pub mod modules;
pub mod pool;
pub mod protocol;
pub mod rule;
pub mod runner;
pub mod signal;
pub mod worker;

pub use config::{ConfigError, PoolConfig, RestartMode};
pub use linter::{LintMessage, LintRequest, RuleFailure, apply_fixes, lint, verify};
pub use message_template::{TemplatePart, interpolate, parse_message_template};
pub use modules::{ModuleHost, ModuleRegistry};
pub use pool::{LinterService, RestartPolicy, WorkerPool, WorkerService};
pub use protocol::{CallArgs, Reply, Request, TestCaseConfig, WorkerError};
pub use rule::{
    Fix, Fixable, NodeRef, Report, ReportMessage, Rule, RuleContext, RuleError, RuleMeta,
    RuleVisitor, SuggestionReport, VisitorMap,
};
pub use runner::RuleRunner;
pub use signal::{SignalCell, WaitStatus};
pub use worker::{Flavor, ServiceError, WorkerHandle, WorkerId};
