use super::*;

#[test]
fn specifiers_are_sanitized_per_utf16_unit() {
    assert_eq!(sanitize_specifier("./foo-bar.js"), "__foo_bar_js");
    assert_eq!(sanitize_specifier("@scope/pkg"), "_scope_pkg");
    assert_eq!(sanitize_specifier("$lib_1"), "$lib_1");
    assert_eq!(sanitize_specifier("é"), "_");
    assert_eq!(sanitize_specifier("😀"), "__");
}

#[test]
fn import_meta_is_not_folded_statically_first() {
    let import_meta = NodeKind::MetaProperty {
        meta: "import".to_string(),
        property: "meta".to_string(),
    };
    let new_target = NodeKind::MetaProperty {
        meta: "new".to_string(),
        property: "target".to_string(),
    };
    assert!(!folds_statically_first(&import_meta));
    assert!(folds_statically_first(&new_target));
    assert!(!folds_statically_first(&NodeKind::Identifier {
        name: "x".to_string()
    }));
}

#[test]
fn opaque_names_are_unique_across_resolutions() {
    let module = ParsedModule::parse("a.js", "import x from 'pkg'; x;").unwrap();
    let NodeKind::ExpressionStatement { expression } =
        module.arena.kind(module.statements()[1]).unwrap().clone()
    else {
        panic!("expected expression statement");
    };
    let first = resolve_expression(&module, expression, Path::new("/project/a.js"));
    let second = resolve_expression(&module, expression, Path::new("/project/a.js"));
    let first_names: Vec<_> = first.imports.keys().cloned().collect();
    let second_names: Vec<_> = second.imports.keys().cloned().collect();
    assert_eq!(first_names.len(), 1);
    assert_eq!(second_names.len(), 1);
    assert_ne!(first_names, second_names);
    assert!(first_names[0].starts_with("$_import_pkg_"));
    assert_eq!(first.imports[&first_names[0]], "pkg");
}
