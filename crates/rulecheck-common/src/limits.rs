//! Centralized limits and thresholds.
//!
//! Shared constants for recursion depths and lifecycle timings used by the
//! evaluators and the worker pool.

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting depth for the static partial evaluator.
///
/// Chains of `const` aliases are followed by recursion; a pathological chain
/// such as `const a0 = a1, a1 = a2, ...` stops here and the remaining
/// reference is left in the residual expression.
pub const MAX_STATIC_RESOLVE_DEPTH: u32 = 256;

/// Maximum depth for the best-effort static value evaluator.
pub const MAX_STATIC_VALUE_DEPTH: u32 = 128;

/// Maximum depth for the dynamic evaluator.
///
/// Residual expressions are trees, so this only trips on very deeply nested
/// input such as `[[[[...]]]]` generated by tooling.
pub const MAX_DYNAMIC_EVAL_DEPTH: u32 = 512;

/// Maximum nesting of module loads inside one worker (`a` imports `b` imports `c` ...).
pub const MAX_MODULE_LOAD_DEPTH: u32 = 64;

// =============================================================================
// Worker Lifecycle
// =============================================================================

/// Window, in milliseconds, during which a repeated request for the same
/// analysis address restarts the worker pool.
pub const DEFAULT_RESTART_WINDOW_MS: u64 = 1000;

/// Filename used for rule input when the test case does not provide one.
pub const DEFAULT_FILENAME: &str = "input.js";

/// Rule namespace under which the rule under test is registered in the
/// single-rule linter configuration (`test/<rule-name>`).
pub const TEST_PLUGIN_NAMESPACE: &str = "test";
