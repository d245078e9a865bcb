//! Dynamic evaluation of residual expressions.
//!
//! Runs where modules can actually be loaded. Opaque references are looked up
//! in the import table and loaded through a [`ModuleLoader`] the first time
//! they are evaluated; everything else is evaluated like the static stage,
//! except that calls and constructions are genuinely invoked.

use crate::globals::global;
use crate::interpreter::{Environment, Interpreter};
use crate::partial::{ImportTable, ResolvedExpression};
use crate::value::Value;
use rulecheck_common::limits::MAX_DYNAMIC_EVAL_DEPTH;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// Loads a module address to its namespace value.
///
/// Implementations own their module cache; returning `None` means every
/// loading strategy failed.
pub trait ModuleLoader {
    fn load(&mut self, address: &str) -> Option<Value>;
}

impl<F> ModuleLoader for F
where
    F: FnMut(&str) -> Option<Value>,
{
    fn load(&mut self, address: &str) -> Option<Value> {
        self(address)
    }
}

struct DynamicEnv<'a> {
    imports: &'a ImportTable,
    loader: &'a mut dyn ModuleLoader,
    /// Loaded opaque references of this evaluation.
    loaded: FxHashMap<String, Option<Value>>,
}

impl Environment for DynamicEnv<'_> {
    fn free_identifier(&mut self, name: &str) -> Option<Value> {
        let Some(address) = self.imports.get(name) else {
            return global(name);
        };
        if let Some(cached) = self.loaded.get(name) {
            return cached.clone();
        }
        let value = self.loader.load(address);
        if value.is_none() {
            debug!(%address, "module could not be loaded");
        }
        self.loaded.insert(name.to_string(), value.clone());
        value
    }

    fn allows_await(&self) -> bool {
        true
    }
}

/// Evaluate a residual expression to a concrete value.
///
/// `None` means the value is not determinable: a module failed to load, a
/// callee was not a function, or some node has no dynamic meaning.
pub fn evaluate(resolved: &ResolvedExpression, loader: &mut dyn ModuleLoader) -> Option<Value> {
    let mut env = DynamicEnv {
        imports: &resolved.imports,
        loader,
        loaded: FxHashMap::default(),
    };
    let value = Interpreter::new(&resolved.arena, None, &mut env, MAX_DYNAMIC_EVAL_DEPTH)
        .evaluate(resolved.root);
    trace!(determined = value.is_some(), "dynamic evaluation finished");
    value
}
