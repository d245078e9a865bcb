//! Dynamic evaluation of residual expressions with a test module loader.

use indexmap::IndexMap;
use rulecheck_eval::{
    Function, JsObject, ModuleLoader, ResolvedExpression, Value, evaluate, resolve_expression,
};
use rulecheck_syntax::{NodeIndex, NodeKind, ParsedModule};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::rc::{Rc, Weak};

/// Serves canned namespaces and records every address it was asked for.
#[derive(Default)]
struct RecordingLoader {
    modules: FxHashMap<String, Value>,
    loaded: Vec<String>,
}

impl RecordingLoader {
    fn with_default(mut self, address: &str, value: Value) -> Self {
        self.modules
            .insert(address.to_string(), Value::from_entries([("default", value)]));
        self
    }
}

impl ModuleLoader for RecordingLoader {
    fn load(&mut self, address: &str) -> Option<Value> {
        self.loaded.push(address.to_string());
        self.modules.get(address).cloned()
    }
}

fn last_init(module: &ParsedModule) -> NodeIndex {
    let mut found = NodeIndex::NONE;
    for &stmt in module.statements() {
        if let Some(NodeKind::VariableDeclaration { declarations, .. }) = module.arena.kind(stmt) {
            for &declarator in declarations {
                if let Some(NodeKind::VariableDeclarator { init, .. }) = module.arena.kind(declarator) {
                    found = *init;
                }
            }
        }
    }
    found
}

fn resolve(source: &str) -> ResolvedExpression {
    let module = ParsedModule::parse("/project/rule.test.js", source).unwrap();
    resolve_expression(&module, last_init(&module), Path::new("/project/rule.test.js"))
}

fn json(value: Option<Value>) -> Option<serde_json::Value> {
    value.and_then(|v| v.to_json())
}

#[test]
fn conditional_only_evaluates_the_selected_branch() {
    let resolved = resolve(
        "import cond from 'cond'; import a from 'a'; import b from 'b'; const c = cond ? a : b;",
    );
    let mut loader = RecordingLoader::default()
        .with_default("cond", Value::Bool(true))
        .with_default("a", Value::string("A"))
        .with_default("b", Value::string("B"));
    let value = evaluate(&resolved, &mut loader);
    assert_eq!(json(value), Some(serde_json::json!("A")));
    assert_eq!(loader.loaded, vec!["cond".to_string(), "a".to_string()]);
}

#[test]
fn logical_operators_short_circuit() {
    let resolved = resolve("import a from 'a'; import b from 'b'; const c = a || b;");
    let mut loader = RecordingLoader::default()
        .with_default("a", Value::Number(1.0))
        .with_default("b", Value::Number(2.0));
    assert_eq!(json(evaluate(&resolved, &mut loader)), Some(serde_json::json!(1)));
    assert_eq!(loader.loaded, vec!["a".to_string()]);
}

#[test]
fn loaded_values_flow_through_spreads_members_and_templates() {
    let resolved = resolve(
        "import cfg from 'pkg'; const c = { ...cfg, extra: [cfg.x, `${cfg.x}!`], n: cfg.x + 1 };",
    );
    let mut loader = RecordingLoader::default()
        .with_default("pkg", Value::from_entries([("x", Value::Number(1.0))]));
    assert_eq!(
        json(evaluate(&resolved, &mut loader)),
        Some(serde_json::json!({ "x": 1, "extra": [1, "1!"], "n": 2 }))
    );
}

#[test]
fn failed_load_is_not_determinable() {
    let resolved = resolve("import missing from 'missing'; const c = [1, missing];");
    let mut loader = RecordingLoader::default();
    assert!(evaluate(&resolved, &mut loader).is_none());
}

#[test]
fn calling_a_non_function_is_not_determinable() {
    let resolved = resolve("import x from 'pkg'; const c = x();");
    let mut loader = RecordingLoader::default().with_default("pkg", Value::Number(1.0));
    assert!(evaluate(&resolved, &mut loader).is_none());
}

#[test]
fn native_functions_are_invoked_with_evaluated_arguments() {
    let resolved = resolve("import make from 'pkg'; const c = make('a', ...[1, 2]);");
    let make = Function::native("make", |_, args| {
        Ok(Value::array(args.to_vec()))
    });
    let mut loader = RecordingLoader::default().with_default("pkg", Value::function(make));
    assert_eq!(
        json(evaluate(&resolved, &mut loader)),
        Some(serde_json::json!(["a", 1, 2]))
    );
}

#[test]
fn an_undeterminable_argument_aborts_the_call() {
    let resolved = resolve("import make from 'pkg'; const c = make(unknownGlobal);");
    let make = Function::native("make", |_, _| Ok(Value::Null));
    let mut loader = RecordingLoader::default().with_default("pkg", Value::function(make));
    assert!(evaluate(&resolved, &mut loader).is_none());
}

#[test]
fn constructors_and_instanceof() {
    let resolved = resolve(
        "import { Box } from 'pkg'; const box = new Box(3); const c = [box instanceof Box, box.value];",
    );
    let ctor = Rc::new_cyclic(|this: &Weak<Function>| {
        let this = this.clone();
        Function::constructor_only("Box", move |args| {
            let mut properties = IndexMap::new();
            properties.insert("value".to_string(), args.first().cloned().unwrap_or(Value::Undefined));
            Ok(Value::Object(Rc::new(JsObject {
                properties,
                constructor: this.upgrade(),
                intrinsic: None,
            })))
        })
    });
    let mut loader = RecordingLoader::default();
    loader.modules.insert(
        "pkg".to_string(),
        Value::from_entries([("Box", Value::Function(ctor))]),
    );
    assert_eq!(
        json(evaluate(&resolved, &mut loader)),
        Some(serde_json::json!([true, 3]))
    );
}

#[test]
fn await_yields_the_loaded_value() {
    let resolved = resolve("import x from 'pkg'; const c = await x;");
    let mut loader = RecordingLoader::default().with_default("pkg", Value::string("ready"));
    assert_eq!(json(evaluate(&resolved, &mut loader)), Some(serde_json::json!("ready")));
}

#[test]
fn string_raw_is_the_only_recognized_tag() {
    let resolved = resolve("import x from 'pkg'; const c = String.raw`a\\n${x}`;");
    let mut loader = RecordingLoader::default().with_default("pkg", Value::string("b"));
    assert_eq!(json(evaluate(&resolved, &mut loader)), Some(serde_json::json!("a\\nb")));

    let resolved = resolve("import tag from 'pkg'; const c = tag`a`;");
    let tag = Function::native("tag", |_, _| Ok(Value::Null));
    let mut loader = RecordingLoader::default().with_default("pkg", Value::function(tag));
    assert!(evaluate(&resolved, &mut loader).is_none());
}

#[test]
fn delete_is_not_determinable() {
    let resolved = resolve("import x from 'pkg'; const c = delete x.y;");
    let mut loader = RecordingLoader::default()
        .with_default("pkg", Value::from_entries([("y", Value::Number(1.0))]));
    assert!(evaluate(&resolved, &mut loader).is_none());
}

#[test]
fn repeated_evaluation_does_not_share_state() {
    let resolved = resolve("import x from 'pkg'; const c = [x, x];");
    for _ in 0..2 {
        let mut loader = RecordingLoader::default().with_default("pkg", Value::Number(7.0));
        assert_eq!(json(evaluate(&resolved, &mut loader)), Some(serde_json::json!([7, 7])));
        assert_eq!(loader.loaded.len(), 2);
    }
}

#[test]
fn closures_can_serve_as_loaders() {
    let resolved = resolve("const c = require('pkg').name;");
    let mut loader = |address: &str| {
        Some(Value::from_entries([("name", Value::string(address))]))
    };
    assert_eq!(json(evaluate(&resolved, &mut loader)), Some(serde_json::json!("pkg")));
}
