use super::*;
use rulecheck_syntax::{NodeKind, ParsedModule};

/// Initializer of the last top-level declarator in `source`.
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

fn value_of(source: &str) -> Option<Value> {
    let module = ParsedModule::parse("test.js", source).unwrap();
    static_value(&module.arena, Some(&module.scopes), last_init(&module))
}

fn json_of(source: &str) -> Option<serde_json::Value> {
    value_of(source).and_then(|v| v.to_json())
}

#[test]
fn follows_const_bindings() {
    assert_eq!(
        json_of("const a = 2; const b = a * 3;"),
        Some(serde_json::json!(6))
    );
}

#[test]
fn let_bindings_are_not_followed() {
    assert!(value_of("let a = 2; const b = a * 3;").is_none());
}

#[test]
fn builtins_fold() {
    assert_eq!(
        json_of("const x = Math.max(1, 5, 3) + Number('2');"),
        Some(serde_json::json!(7))
    );
    assert_eq!(
        json_of("const x = JSON.stringify({ a: [1, 'b'] });"),
        Some(serde_json::json!("{\"a\":[1,\"b\"]}"))
    );
    assert_eq!(
        json_of("const x = String.raw`a\\nb${1}`;"),
        Some(serde_json::json!("a\\nb1"))
    );
}

#[test]
fn shadowed_builtins_are_unknown() {
    assert!(value_of("let Math = {}; const x = Math.max(1, 2);").is_none());
}

#[test]
fn imports_are_unknown() {
    assert!(value_of("import x from './x'; const y = x + 1;").is_none());
}

#[test]
fn optional_chains_short_circuit() {
    assert!(matches!(
        value_of("const o = null; const x = o?.a.b;"),
        Some(Value::Undefined)
    ));
}

#[test]
fn recursive_consts_do_not_loop() {
    assert!(value_of("const a = b + 1; const b = a + 1; const c = a;").is_none());
}

#[test]
fn function_literals_are_not_evaluated() {
    assert!(value_of("const f = () => 1; const x = f();").is_none());
}

#[test]
fn unmodeled_builtin_members_are_unknown() {
    assert!(value_of("const x = [].sort;").is_none());
    assert!(value_of("const x = [3, 1, 2].sort();").is_none());
    assert!(value_of("const x = Math.random();").is_none());
    assert!(value_of("const x = 'a'.localeCompare('b');").is_none());
    assert!(matches!(
        value_of("const o = { a: 1 }; const x = o.b;"),
        Some(Value::Undefined)
    ));
}

fn keys_of(source: &str) -> Vec<String> {
    match value_of(source) {
        Some(Value::Object(obj)) => obj.properties.keys().cloned().collect(),
        other => panic!("expected an object, got {other:?}"),
    }
}

#[test]
fn object_keys_follow_own_key_order() {
    assert_eq!(keys_of("const x = { a: 1, b: 2, ...{ a: 3 } };"), ["a", "b"]);
    assert_eq!(keys_of("const x = { a: 1, b: 2, a: 3 };"), ["a", "b"]);
    assert_eq!(keys_of("const x = { b: 1, 10: 2, 2: 3, '01': 4 };"), ["2", "10", "b", "01"]);
    assert_eq!(
        json_of("const x = { a: 1, b: 2, ...{ a: 3 } };").map(|json| json.to_string()),
        Some(r#"{"a":3,"b":2}"#.to_string())
    );
}
