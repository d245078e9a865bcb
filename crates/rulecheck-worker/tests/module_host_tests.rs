use rulecheck_eval::{ModuleLoader, Value};
use rulecheck_worker::{Flavor, ModuleHost, ModuleRegistry, Report, Rule, RuleContext, RuleError, RuleMeta, RuleVisitor, VisitorMap};
use serde_json::json;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn package(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("package.json"), r#"{ "name": "fixture" }"#).unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

fn host(dir: &TempDir, flavor: Flavor) -> ModuleHost {
    ModuleHost::new(Arc::new(ModuleRegistry::new()), dir.path().to_path_buf(), flavor)
}

fn address(dir: &TempDir, name: &str) -> String {
    let path = std::fs::canonicalize(dir.path()).unwrap().join(name);
    path.to_str().unwrap().to_string()
}

fn load_json(host: &mut ModuleHost, address: &str) -> Option<serde_json::Value> {
    host.load(address).and_then(|value| value.to_json())
}

#[test]
fn es_module_exports_are_evaluated() {
    let dir = package(&[(
        "config.mjs",
        "export default { a: 1 };\nexport const b = [1, 2];\nexport { c as d };\nconst c = 'see';\n",
    )]);
    let mut host = host(&dir, Flavor::Native);
    assert_eq!(
        load_json(&mut host, &address(&dir, "config.mjs")),
        Some(json!({ "default": { "a": 1 }, "b": [1, 2], "d": "see" }))
    );
}

#[test]
fn imports_between_source_modules_are_followed() {
    let dir = package(&[
        ("lib.mjs", "export const base = 40;\nexport default 'lib';\n"),
        ("main.mjs", "import { base } from './lib.mjs';\nexport const answer = base + 2;\n"),
        ("star.mjs", "export * from './lib.mjs';\nexport * as lib from './lib.mjs';\n"),
    ]);
    let mut host = host(&dir, Flavor::Native);
    assert_eq!(
        load_json(&mut host, &address(&dir, "main.mjs")),
        Some(json!({ "answer": 42 }))
    );
    assert_eq!(
        load_json(&mut host, &address(&dir, "star.mjs")),
        Some(json!({ "base": 40, "lib": { "base": 40, "default": "lib" } }))
    );
}

#[test]
fn commonjs_modules_gain_a_default_export() {
    let dir = package(&[
        ("replaced.js", "module.exports = { rules: ['a'] };\nmodule.exports.extra = 1;\n"),
        ("named.js", "exports.x = 1;\nexports.y = 'z';\n"),
        ("flagged.js", "exports.__esModule = true;\nexports.default = 5;\n"),
    ]);
    let mut host = host(&dir, Flavor::Native);
    assert_eq!(
        load_json(&mut host, &address(&dir, "replaced.js")),
        Some(json!({
            "rules": ["a"],
            "extra": 1,
            "default": { "rules": ["a"], "extra": 1 }
        }))
    );
    assert_eq!(
        load_json(&mut host, &address(&dir, "named.js")),
        Some(json!({ "x": 1, "y": "z", "default": { "x": 1, "y": "z" } }))
    );
    assert_eq!(
        load_json(&mut host, &address(&dir, "flagged.js")),
        Some(json!({ "__esModule": true, "default": 5 }))
    );
}

#[test]
fn json_files_and_bare_packages_load() {
    let dir = package(&[
        ("data.json", r#"{ "name": "pkg", "list": [1] }"#),
        ("node_modules/dep/package.json", r#"{ "main": "main.js" }"#),
        ("node_modules/dep/main.js", "module.exports = 'dep';\n"),
    ]);
    let mut host = host(&dir, Flavor::Native);
    assert_eq!(
        load_json(&mut host, &address(&dir, "data.json")),
        Some(json!({ "name": "pkg", "list": [1], "default": { "name": "pkg", "list": [1] } }))
    );
    assert_eq!(load_json(&mut host, "dep"), Some(json!({ "default": "dep" })));
    assert_eq!(load_json(&mut host, "not-installed"), None);
    assert_eq!(load_json(&mut host, "fs"), None);
}

#[test]
fn cyclic_imports_fail_and_stay_failed() {
    let dir = package(&[
        ("a.mjs", "import { b } from './b.mjs';\nexport const a = b;\n"),
        ("b.mjs", "import { a } from './a.mjs';\nexport const b = a;\n"),
    ]);
    let mut host = host(&dir, Flavor::Native);
    let a = address(&dir, "a.mjs");
    assert_eq!(load_json(&mut host, &a), None);
    assert_eq!(load_json(&mut host, &a), None);
    assert_eq!(host.cached_modules(), 2);
}

#[test]
fn typescript_needs_the_transpiled_flavor() {
    let dir = package(&[("util.ts", "export const x = 1;\n")]);
    let util = address(&dir, "util.ts");

    let mut native = host(&dir, Flavor::Native);
    assert_eq!(load_json(&mut native, &util), None);

    let mut transpiled = host(&dir, Flavor::Transpiled);
    assert_eq!(load_json(&mut transpiled, &util), Some(json!({ "x": 1 })));
}

#[test]
fn function_exports_are_not_determinable() {
    let dir = package(&[("fn.mjs", "export const a = 1;\nexport function f() {}\n")]);
    let mut host = host(&dir, Flavor::Native);
    assert_eq!(load_json(&mut host, &address(&dir, "fn.mjs")), None);
}

#[test]
fn registered_modules_are_created_once_per_host() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = ModuleRegistry::new();
    registry.register_module("virtual:answer", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Value::from_entries([("default", Value::Number(42.0))])
    });
    let registry = Arc::new(registry);

    let mut first = ModuleHost::new(Arc::clone(&registry), Path::new("/").to_path_buf(), Flavor::Native);
    assert_eq!(load_json(&mut first, "virtual:answer"), Some(json!({ "default": 42 })));
    assert_eq!(load_json(&mut first, "virtual:answer"), Some(json!({ "default": 42 })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let mut second = ModuleHost::new(registry, Path::new("/").to_path_buf(), Flavor::Native);
    assert!(second.load("virtual:answer").is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

struct Silent;

impl Rule for Silent {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new().with_message("never", "Never reported.")
    }

    fn create(&self, _context: &RuleContext<'_>) -> Result<Box<dyn RuleVisitor>, RuleError> {
        Ok(Box::new(VisitorMap::new().on("Never", |node, context| {
            context.report(Report::message_id(node.span, "never"))
        })))
    }
}

#[test]
fn rules_are_instantiated_once_per_host() {
    let mut registry = ModuleRegistry::new();
    registry.register_rule("/p/silent.js", || Box::new(Silent));
    let mut host = ModuleHost::new(Arc::new(registry), Path::new("/p").to_path_buf(), Flavor::Native);

    let first = host.load_rule("/p/silent.js").unwrap();
    let second = host.load_rule("/p/silent.js").unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(
        host.load_rule("/p/other.js").err(),
        Some(RuleError::RuleNotFound("/p/other.js".to_string()))
    );
}
