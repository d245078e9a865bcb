use rulecheck_syntax::{
    BinaryOperator, DeclarationKind, ImportKind, Literal, NodeArena, NodeIndex, NodeKind,
    ParsedModule, ParserState, print_node,
};

fn parse(source: &str) -> ParsedModule {
    ParsedModule::parse("input.js", source).expect("source should parse")
}

fn parse_expr(source: &str) -> (NodeArena, NodeIndex) {
    let mut parser = ParserState::new("input.js".to_string(), source.to_string());
    let root = parser
        .parse_expression_source()
        .expect("expression should parse");
    (parser.into_arena(), root)
}

fn roundtrip(source: &str) -> String {
    let (arena, root) = parse_expr(source);
    print_node(&arena, root)
}

#[test]
fn parses_variable_declarations_with_patterns() {
    let module = parse("const { a, b: [c, , d = 1], ...rest } = obj, e = 2;");
    let [decl] = module.statements() else {
        panic!("expected one statement");
    };
    let Some(NodeKind::VariableDeclaration { kind, declarations }) = module.arena.kind(*decl)
    else {
        panic!("expected declaration");
    };
    assert_eq!(*kind, DeclarationKind::Const);
    assert_eq!(declarations.len(), 2);
    let Some(NodeKind::VariableDeclarator { id, init }) = module.arena.kind(declarations[0])
    else {
        panic!("expected declarator");
    };
    assert!(matches!(
        module.arena.kind(*id),
        Some(NodeKind::ObjectPattern { properties }) if properties.len() == 3
    ));
    assert_eq!(module.arena.identifier_name(*init), Some("obj"));
}

#[test]
fn parses_import_forms() {
    let module = parse(
        "import def, * as ns from './a.js';\n\
         import { x, y as z, default as w } from \"b\";\n\
         import 'side-effect';",
    );
    let statements = module.statements();
    assert_eq!(statements.len(), 3);

    let Some(NodeKind::ImportDeclaration { specifiers, source }) =
        module.arena.kind(statements[1])
    else {
        panic!("expected import");
    };
    assert_eq!(source, "b");
    let kinds: Vec<(ImportKind, String)> = specifiers
        .iter()
        .filter_map(|&s| match module.arena.kind(s) {
            Some(NodeKind::ImportSpecifier { kind, local }) => Some((kind.clone(), local.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (ImportKind::Named("x".into()), "x".into()),
            (ImportKind::Named("y".into()), "z".into()),
            (ImportKind::Default, "w".into()),
        ]
    );

    assert!(matches!(
        module.arena.kind(statements[2]),
        Some(NodeKind::ImportDeclaration { specifiers, .. }) if specifiers.is_empty()
    ));
}

#[test]
fn parses_export_forms() {
    let module = parse(
        "export const a = 1;\n\
         export function f() { return a; }\n\
         export { a as b };\n\
         export * from './c.js';\n\
         export default { a };",
    );
    let statements = module.statements();
    assert_eq!(statements.len(), 5);
    assert!(matches!(
        module.arena.kind(statements[1]),
        Some(NodeKind::ExportNamed { declaration, .. })
            if matches!(module.arena.kind(*declaration), Some(NodeKind::FunctionDeclaration { name, .. }) if name == "f")
    ));
    assert!(matches!(
        module.arena.kind(statements[3]),
        Some(NodeKind::ExportAll { exported: None, source }) if source == "./c.js"
    ));
    assert!(matches!(
        module.arena.kind(statements[4]),
        Some(NodeKind::ExportDefault { .. })
    ));
}

#[test]
fn keeps_function_bodies_as_text() {
    let (arena, root) = parse_expr("async (a, { b }) => { if (a) return b; }");
    let Some(NodeKind::Function {
        arrow,
        is_async,
        text,
        ..
    }) = arena.kind(root)
    else {
        panic!("expected function literal");
    };
    assert!(*arrow);
    assert!(*is_async);
    assert_eq!(text, "async (a, { b }) => { if (a) return b; }");
}

#[test]
fn distinguishes_regex_from_division() {
    let module = parse("const r = /a[/]b+/gi; const d = x / y / 2;");
    let printed = print_node(&module.arena, module.root);
    assert_eq!(printed, "const r = /a[/]b+/gi;\nconst d = x / y / 2;");
}

#[test]
fn parses_nested_templates() {
    let (arena, root) = parse_expr("`a${ { b: `x${c}` }.b }z`");
    let Some(NodeKind::Template {
        quasis,
        expressions,
    }) = arena.kind(root)
    else {
        panic!("expected template");
    };
    assert_eq!(quasis.len(), 2);
    assert_eq!(quasis[0].cooked.as_deref(), Some("a"));
    assert_eq!(quasis[1].raw, "z");
    assert_eq!(expressions.len(), 1);
    assert!(matches!(arena.kind(expressions[0]), Some(NodeKind::Member { .. })));
}

#[test]
fn wraps_optional_chains() {
    let (arena, root) = parse_expr("a?.b.c()");
    let Some(NodeKind::Chain { expression }) = arena.kind(root) else {
        panic!("expected chain");
    };
    assert!(matches!(
        arena.kind(*expression),
        Some(NodeKind::Call { optional: false, .. })
    ));
    assert_eq!(print_node(&arena, root), "a?.b.c()");
}

#[test]
fn respects_operator_precedence() {
    let (arena, root) = parse_expr("1 + 2 * 3 ** 2 ** 2");
    let Some(NodeKind::Binary {
        operator, right, ..
    }) = arena.kind(root)
    else {
        panic!("expected binary");
    };
    assert_eq!(*operator, BinaryOperator::Add);
    assert!(matches!(
        arena.kind(*right),
        Some(NodeKind::Binary { operator: BinaryOperator::Mul, .. })
    ));
    assert_eq!(roundtrip("(1 + 2) * 3"), "(1 + 2) * 3");
    assert_eq!(roundtrip("a ?? (b || c)"), "a ?? (b || c)");
    assert_eq!(roundtrip("(a, b)"), "a, b");
    assert_eq!(roundtrip("- -x"), "- -x");
}

#[test]
fn inserts_semicolons_at_line_breaks() {
    let module = parse("const a = 1\nconst b = a\n++b");
    assert_eq!(module.statements().len(), 3);
}

#[test]
fn rejects_unsupported_statements() {
    let err = ParsedModule::parse("input.js", "if (a) { b(); }").expect_err("should fail");
    assert!(err.message.contains("Unsupported statement"), "{}", err.message);
    assert_eq!(err.span.pos, 0);
}

#[test]
fn reports_syntax_errors_with_position() {
    let err = ParsedModule::parse("input.js", "const a = ;").expect_err("should fail");
    assert_eq!(err.span.pos, 10);
    assert!(err.message.starts_with("Unexpected token"), "{}", err.message);
}

#[test]
fn skips_typescript_syntax() {
    let module = ParsedModule::parse(
        "input.ts",
        "import type { T } from './t';\n\
         type Alias = { a: string } | null;\n\
         interface Shape { size: number }\n\
         const x: Array<string> = ['a'] as const;\n\
         const y = (v: number): string => String(v);\n\
         const z = obj!.value satisfies unknown;",
    )
    .expect("typescript should parse");
    let declarations: Vec<_> = module
        .statements()
        .iter()
        .filter(|&&s| matches!(module.arena.kind(s), Some(NodeKind::VariableDeclaration { .. })))
        .collect();
    assert_eq!(declarations.len(), 3);
    assert!(module.scopes.is_bound(rulecheck_syntax::ScopeTree::ROOT, "z"));
}

#[test]
fn parses_literals() {
    let (arena, root) = parse_expr("[0x10, 1_000n, 'a\\u{1F600}', null, true, , ]");
    let Some(NodeKind::Array { elements }) = arena.kind(root) else {
        panic!("expected array");
    };
    assert_eq!(elements.len(), 6);
    assert_eq!(arena.literal(elements[0]), Some(&Literal::Number(16.0)));
    assert_eq!(arena.literal(elements[1]), Some(&Literal::BigInt(1000)));
    assert_eq!(
        arena.literal(elements[2]),
        Some(&Literal::String("a\u{1F600}".to_string()))
    );
    assert!(elements[5].is_none());
}

#[test]
fn object_methods_are_opaque() {
    let (arena, root) = parse_expr("({ get a() { return 1; }, async *b() {}, [k]: 2, c })");
    let Some(NodeKind::Object { properties }) = arena.kind(root) else {
        panic!("expected object");
    };
    assert_eq!(properties.len(), 4);
    assert_eq!(
        print_node(&arena, root),
        "{ get a() { return 1; }, async *b() {}, [k]: 2, c }"
    );
}
