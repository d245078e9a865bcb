//! Partial evaluation of JavaScript expressions for rulecheck.
//!
//! This crate provides:
//! - `Value` - Runtime values and the JavaScript operator semantics over them
//! - `resolve_expression` - Static stage: residual expression plus import table
//! - `evaluate` - Dynamic stage: residual expression to a concrete value
//! - `resolve_import_source` / `resolve_require` - Module specifier resolution
//! - `static_value` - Best-effort static value of a source expression

pub mod dynamic;
pub mod error;
pub mod globals;
pub mod import_resolver;
pub mod interpreter;
pub mod js_ops;
pub mod literal;
pub mod partial;
pub mod prototype;
pub mod static_value;
pub mod value;

pub use dynamic::{ModuleLoader, evaluate};
pub use error::EvalError;
pub use import_resolver::{
    ResolveError, find_package_root, is_builtin_module, resolve_import_source, resolve_require,
};
pub use interpreter::{Environment, Interpreter};
pub use literal::value_to_literal;
pub use partial::{ImportTable, ResolvedExpression, StaticEvaluator, resolve_expression};
pub use static_value::static_value;
pub use value::{Function, JsObject, RegExpValue, Value};

/// Result of evaluation: `None` is "not determinable", `Some(Value::Undefined)`
/// is "determined to be undefined".
pub type Evaluated = Option<Value>;
