//! File-system backed module resolution.

use rulecheck_eval::{ResolveError, find_package_root, resolve_import_source, resolve_require};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

fn canonical(path: PathBuf) -> String {
    fs::canonicalize(path).unwrap().display().to_string()
}

fn project() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    write(&root, "package.json", r#"{ "name": "project" }"#);
    let from = write(&root, "tests/rule.test.js", "");
    (dir, from)
}

#[test]
fn require_tries_extensions_in_order() {
    let (dir, from) = project();
    let js = write(dir.path(), "tests/helper.js", "");
    write(dir.path(), "tests/helper.json", "{}");
    let json = write(dir.path(), "tests/data.json", "{}");

    assert_eq!(resolve_require("./helper", &from).unwrap(), canonical(js));
    assert_eq!(resolve_require("./data", &from).unwrap(), canonical(json.clone()));
    assert_eq!(resolve_require("./data.json", &from).unwrap(), canonical(json));
}

#[test]
fn require_resolves_directories_through_main_then_index() {
    let (dir, from) = project();
    write(dir.path(), "lib/with-main/package.json", r#"{ "main": "./src/entry" }"#);
    let entry = write(dir.path(), "lib/with-main/src/entry.js", "");
    let index = write(dir.path(), "lib/plain/index.js", "");

    assert_eq!(resolve_require("../lib/with-main", &from).unwrap(), canonical(entry));
    assert_eq!(resolve_require("../lib/plain", &from).unwrap(), canonical(index));
}

#[test]
fn missing_relative_module_is_not_found() {
    let (_dir, from) = project();
    let err = resolve_require("./nope", &from).unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { ref specifier, .. } if specifier == "./nope"));
    assert!(err.to_string().starts_with("Cannot find module './nope'"));
}

#[test]
fn bare_specifiers_use_node_modules_exports() {
    let (dir, from) = project();
    write(
        dir.path(),
        "node_modules/pkg/package.json",
        r#"{ "exports": { ".": { "import": "./esm.mjs", "require": "./cjs.js" }, "./extra": "./lib/extra.js" } }"#,
    );
    let cjs = write(dir.path(), "node_modules/pkg/cjs.js", "");
    write(dir.path(), "node_modules/pkg/esm.mjs", "");
    let extra = write(dir.path(), "node_modules/pkg/lib/extra.js", "");

    assert_eq!(resolve_require("pkg", &from).unwrap(), canonical(cjs));
    assert_eq!(resolve_require("pkg/extra", &from).unwrap(), canonical(extra));
    // Subpaths not listed in `exports` are not reachable.
    assert!(resolve_require("pkg/lib/extra", &from).is_err());
}

#[test]
fn bare_specifiers_fall_back_to_main_and_files() {
    let (dir, from) = project();
    write(dir.path(), "node_modules/@scope/tool/package.json", r#"{ "main": "dist/main.js" }"#);
    let main = write(dir.path(), "node_modules/@scope/tool/dist/main.js", "");
    let util = write(dir.path(), "node_modules/@scope/tool/util.js", "");

    assert_eq!(resolve_require("@scope/tool", &from).unwrap(), canonical(main));
    assert_eq!(resolve_require("@scope/tool/util", &from).unwrap(), canonical(util));
}

#[test]
fn invalid_package_json_is_reported() {
    let (dir, from) = project();
    write(dir.path(), "node_modules/broken/package.json", "{ not json");
    let err = resolve_require("broken", &from).unwrap_err();
    assert!(matches!(err, ResolveError::InvalidPackageJson { .. }));
}

#[test]
fn builtins_resolve_to_themselves() {
    let (_dir, from) = project();
    assert_eq!(resolve_require("node:fs", &from).unwrap(), "node:fs");
    assert_eq!(resolve_import_source("path", &from).unwrap(), "path");
}

#[test]
fn import_sources_keep_bare_specifiers_and_resolve_relative_ones() {
    let (dir, from) = project();
    let rule = write(dir.path(), "tests/rule.ts", "");

    assert_eq!(resolve_import_source("some-package", &from).unwrap(), "some-package");
    assert_eq!(resolve_import_source("./rule", &from).unwrap(), canonical(rule));
    assert!(resolve_import_source("./absent", &from).is_err());
}

#[test]
fn import_sources_prefer_the_exact_file() {
    let (dir, from) = project();
    let exact = write(dir.path(), "tests/config", "");
    write(dir.path(), "tests/config.js", "");
    assert_eq!(resolve_import_source("./config", &from).unwrap(), canonical(exact));
}

#[test]
fn package_root_is_the_nearest_package_json() {
    let (dir, from) = project();
    let nested = write(dir.path(), "packages/inner/package.json", "{}");
    let inner_file = write(dir.path(), "packages/inner/src/index.js", "");

    assert_eq!(find_package_root(&from), dir.path().to_path_buf());
    assert_eq!(find_package_root(&inner_file), nested.parent().unwrap().to_path_buf());
}
