use rulecheck_syntax::{Definition, ImportKind, NodeKind, ParsedModule, ScopeKind, ScopeTree};

fn parse(source: &str) -> ParsedModule {
    ParsedModule::parse("input.js", source).expect("source should parse")
}

#[test]
fn binds_module_level_declarations() {
    let module = parse(
        "import def, { named as local } from 'pkg';\n\
         const { a, b: [c] } = source;\n\
         function f() {}\n\
         class K {}",
    );
    let root = ScopeTree::ROOT;
    for name in ["def", "local", "a", "c", "f", "K"] {
        assert!(module.scopes.is_bound(root, name), "{name} should be bound");
    }
    assert!(!module.scopes.is_bound(root, "named"));
    assert!(!module.scopes.is_bound(root, "b"));
    assert!(!module.scopes.is_bound(root, "source"));
}

#[test]
fn records_import_definitions() {
    let module = parse("import { x as y } from './dep.js';");
    let variable = module
        .scopes
        .lookup(ScopeTree::ROOT, "y")
        .expect("y should be bound");
    let [Definition::Import { kind, source, .. }] = variable.defs.as_slice() else {
        panic!("expected a single import definition");
    };
    assert_eq!(*kind, ImportKind::Named("x".to_string()));
    assert_eq!(source, "./dep.js");
}

#[test]
fn records_variable_initializers() {
    let module = parse("const a = 1, b = a;");
    let variable = module
        .scopes
        .lookup(ScopeTree::ROOT, "b")
        .expect("b should be bound");
    let [Definition::Variable { init, .. }] = variable.defs.as_slice() else {
        panic!("expected a single variable definition");
    };
    assert_eq!(module.arena.identifier_name(*init), Some("a"));
}

#[test]
fn block_scopes_shadow_and_var_hoists() {
    let source = "const x = 1;\n{ const x = 2; var h = x; probe; }\nouter;";
    let module = parse(source);
    assert_eq!(module.scopes.len(), 2);

    let inner_offset = source.find("probe").expect("probe") as u32;
    let inner = module.scopes.scope_at(inner_offset);
    assert_eq!(
        module.scopes.get(inner).map(|s| s.kind),
        Some(ScopeKind::Block)
    );
    let inner_x = module.scopes.lookup(inner, "x").expect("x");
    let [Definition::Variable { init, .. }] = inner_x.defs.as_slice() else {
        panic!("expected variable");
    };
    assert!(matches!(
        module.arena.literal(*init),
        Some(rulecheck_syntax::Literal::Number(n)) if *n == 2.0
    ));

    let outer_offset = source.find("outer").expect("outer") as u32;
    assert_eq!(module.scopes.scope_at(outer_offset), ScopeTree::ROOT);
    // `var` hoists out of the block
    assert!(module.scopes.is_bound(ScopeTree::ROOT, "h"));
}

#[test]
fn export_default_named_function_is_bound() {
    let module = parse("export default function handler() {}");
    let variable = module
        .scopes
        .lookup(ScopeTree::ROOT, "handler")
        .expect("handler should be bound");
    let [Definition::Function { node }] = variable.defs.as_slice() else {
        panic!("expected function definition");
    };
    assert!(matches!(
        module.arena.kind(*node),
        Some(NodeKind::Function { .. })
    ));
}
