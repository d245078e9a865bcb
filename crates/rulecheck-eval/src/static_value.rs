//! Best-effort static value of an expression.
//!
//! Evaluates only what is knowable without loading modules: literals,
//! `const` bindings with determinable initializers, operators over known
//! operands and pure builtins.

use crate::globals::global;
use crate::interpreter::{Environment, Interpreter};
use crate::value::Value;
use rulecheck_common::limits::MAX_STATIC_VALUE_DEPTH;
use rulecheck_syntax::{NodeArena, NodeIndex, ScopeTree};
use rustc_hash::FxHashSet;

/// Free identifiers resolve to builtins only, except names the caller knows
/// to be shadowed by a local binding.
pub(crate) struct BuiltinsOnly<'s> {
    pub shadowed: Option<&'s FxHashSet<String>>,
}

impl Environment for BuiltinsOnly<'_> {
    fn free_identifier(&mut self, name: &str) -> Option<Value> {
        if self.shadowed.is_some_and(|shadowed| shadowed.contains(name)) {
            return None;
        }
        global(name)
    }
}

/// Value of `node`, or `None` when it cannot be determined statically.
///
/// With `scopes`, identifiers are resolved through the module's bindings;
/// without, every identifier is treated as free.
pub fn static_value(arena: &NodeArena, scopes: Option<&ScopeTree>, node: NodeIndex) -> Option<Value> {
    let mut env = BuiltinsOnly { shadowed: None };
    Interpreter::new(arena, scopes, &mut env, MAX_STATIC_VALUE_DEPTH).evaluate(node)
}

pub(crate) fn fold_value(
    arena: &NodeArena,
    node: NodeIndex,
    shadowed: &FxHashSet<String>,
) -> Option<Value> {
    let mut env = BuiltinsOnly {
        shadowed: Some(shadowed),
    };
    Interpreter::new(arena, None, &mut env, MAX_STATIC_VALUE_DEPTH).evaluate(node)
}

#[cfg(test)]
#[path = "tests/static_value_tests.rs"]
mod tests;
