//! Module specifier resolution.
//!
//! Node-style resolution of `require`/`import` specifiers to canonical file
//! paths. Pure apart from reading the file system; nothing is cached.

use serde_json::Value as Json;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Cannot find module '{specifier}' from '{from}'")]
    NotFound { specifier: String, from: String },
    #[error("Invalid package.json at '{path}': {message}")]
    InvalidPackageJson { path: String, message: String },
}

/// Extensions tried by `require` when the specifier has none.
pub const REQUIRE_EXTENSIONS: &[&str] = &[".js", ".json", ".node", ".mjs", ".cjs", ".ts", ".mts", ".cts"];

/// Suffixes tried for relative `import` specifiers, in order.
const IMPORT_SUFFIXES: &[&str] = &["", ".js", ".mjs", ".cjs", ".ts", ".mts", ".cts"];

/// Condition names honored in `package.json` `exports`, by priority.
const EXPORT_CONDITIONS: &[&str] = &["require", "node", "default"];

const BUILTIN_MODULES: &[&str] = &[
    "assert", "buffer", "child_process", "crypto", "events", "fs", "fs/promises", "module", "os",
    "path", "path/posix", "path/win32", "process", "querystring", "stream", "string_decoder",
    "timers", "tty", "url", "util", "v8", "vm", "worker_threads", "zlib",
];

pub fn is_builtin_module(specifier: &str) -> bool {
    specifier.starts_with("node:") || BUILTIN_MODULES.contains(&specifier)
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Resolve an `import` source as seen from `file`.
///
/// Relative specifiers are resolved against the file's directory, trying the
/// specifier as written and then with each known extension. Anything else is
/// returned unchanged; the loader resolves bare specifiers itself.
pub fn resolve_import_source(source: &str, file: &Path) -> Result<String, ResolveError> {
    if !source.starts_with('.') {
        return Ok(source.to_string());
    }
    for suffix in IMPORT_SUFFIXES {
        let candidate = format!("{source}{suffix}");
        if let Ok(path) = resolve_require(&candidate, file) {
            return Ok(path);
        }
    }
    Err(ResolveError::NotFound {
        specifier: source.to_string(),
        from: file.display().to_string(),
    })
}

/// Resolve `specifier` the way `require.resolve` does from `file`.
pub fn resolve_require(specifier: &str, file: &Path) -> Result<String, ResolveError> {
    if is_builtin_module(specifier) {
        return Ok(specifier.to_string());
    }
    let base = file.parent().unwrap_or_else(|| Path::new("."));
    let not_found = || ResolveError::NotFound {
        specifier: specifier.to_string(),
        from: file.display().to_string(),
    };
    let resolved = if is_relative(specifier) || Path::new(specifier).is_absolute() {
        let target = normalize(&base.join(specifier));
        match resolve_as_file(&target) {
            Some(found) => Some(found),
            None => resolve_as_directory(&target)?,
        }
    } else {
        resolve_node_modules(specifier, base)?
    };
    let resolved = resolved.ok_or_else(not_found)?;
    trace!(specifier, resolved = %resolved.display(), "resolved");
    Ok(canonical(&resolved).display().to_string())
}

/// Nearest ancestor of `file` containing a `package.json`, or the file's
/// own directory when there is none.
pub fn find_package_root(file: &Path) -> PathBuf {
    let start = if file.is_dir() {
        file
    } else {
        file.parent().unwrap_or(file)
    };
    start
        .ancestors()
        .find(|dir| dir.join("package.json").is_file())
        .unwrap_or(start)
        .to_path_buf()
}

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn resolve_as_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let text = path.as_os_str().to_string_lossy();
    REQUIRE_EXTENSIONS
        .iter()
        .map(|ext| PathBuf::from(format!("{text}{ext}")))
        .find(|candidate| candidate.is_file())
}

fn resolve_index(dir: &Path) -> Option<PathBuf> {
    resolve_as_file(&dir.join("index"))
}

fn read_package_json(dir: &Path) -> Result<Option<Json>, ResolveError> {
    let path = dir.join("package.json");
    let Ok(text) = fs::read_to_string(&path) else {
        return Ok(None);
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|err| ResolveError::InvalidPackageJson {
            path: path.display().to_string(),
            message: err.to_string(),
        })
}

fn resolve_as_directory(dir: &Path) -> Result<Option<PathBuf>, ResolveError> {
    if !dir.is_dir() {
        return Ok(None);
    }
    if let Some(package) = read_package_json(dir)?
        && let Some(main) = package.get("main").and_then(Json::as_str)
    {
        let target = normalize(&dir.join(main));
        if let Some(found) = resolve_as_file(&target).or_else(|| resolve_index(&target)) {
            return Ok(Some(found));
        }
    }
    Ok(resolve_index(dir))
}

/// Split `@scope/pkg/sub/path` into (`@scope/pkg`, `./sub/path`).
fn split_package_specifier(specifier: &str) -> (&str, String) {
    let mut segments = specifier.splitn(if specifier.starts_with('@') { 3 } else { 2 }, '/');
    let first = segments.next().unwrap_or_default();
    let (name_len, rest) = if specifier.starts_with('@') {
        let scope_pkg = segments.next().unwrap_or_default();
        (first.len() + 1 + scope_pkg.len(), segments.next())
    } else {
        (first.len(), segments.next())
    };
    let name = &specifier[..name_len.min(specifier.len())];
    let subpath = match rest {
        Some(rest) if !rest.is_empty() => format!("./{rest}"),
        _ => ".".to_string(),
    };
    (name, subpath)
}

fn resolve_node_modules(specifier: &str, base: &Path) -> Result<Option<PathBuf>, ResolveError> {
    let (name, subpath) = split_package_specifier(specifier);
    for dir in base.ancestors() {
        if dir.file_name().is_some_and(|n| n == "node_modules") {
            continue;
        }
        let package_dir = dir.join("node_modules").join(name);
        if !package_dir.is_dir() {
            continue;
        }
        if let Some(package) = read_package_json(&package_dir)?
            && let Some(exports) = package.get("exports")
        {
            if let Some(target) = resolve_exports(exports, &subpath) {
                let target = normalize(&package_dir.join(target));
                return Ok(target.is_file().then_some(target));
            }
            return Ok(None);
        }
        let target = if subpath == "." {
            package_dir.clone()
        } else {
            normalize(&package_dir.join(&subpath))
        };
        if let Some(found) = resolve_as_file(&target) {
            return Ok(Some(found));
        }
        if let Some(found) = resolve_as_directory(&target)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Target of `subpath` in a `package.json` `exports` field.
fn resolve_exports(exports: &Json, subpath: &str) -> Option<String> {
    let is_subpath_map = exports
        .as_object()
        .is_some_and(|map| map.keys().any(|key| key.starts_with('.')));
    if !is_subpath_map {
        return (subpath == ".").then(|| resolve_conditions(exports)).flatten();
    }
    let map = exports.as_object()?;
    if let Some(target) = map.get(subpath) {
        return resolve_conditions(target);
    }
    // "./features/*": "./src/features/*.js"
    for (pattern, target) in map {
        let Some((prefix, suffix)) = pattern.split_once('*') else {
            continue;
        };
        if let Some(middle) = subpath
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
        {
            return resolve_conditions(target).map(|t| t.replace('*', middle));
        }
    }
    None
}

fn resolve_conditions(target: &Json) -> Option<String> {
    match target {
        Json::String(path) => Some(path.clone()),
        Json::Array(candidates) => candidates.iter().find_map(resolve_conditions),
        Json::Object(conditions) => EXPORT_CONDITIONS
            .iter()
            .find_map(|condition| conditions.get(*condition).and_then(resolve_conditions)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_scoped_and_plain_specifiers() {
        assert_eq!(split_package_specifier("lodash"), ("lodash", ".".to_string()));
        assert_eq!(
            split_package_specifier("lodash/fp/map"),
            ("lodash", "./fp/map".to_string())
        );
        assert_eq!(
            split_package_specifier("@scope/pkg"),
            ("@scope/pkg", ".".to_string())
        );
        assert_eq!(
            split_package_specifier("@scope/pkg/deep/file"),
            ("@scope/pkg", "./deep/file".to_string())
        );
    }

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
    }

    #[test]
    fn exports_conditions_follow_priority() {
        let exports = serde_json::json!({
            ".": { "import": "./esm.mjs", "default": "./cjs.js", "require": "./req.js" },
            "./feature/*": "./lib/feature/*.js"
        });
        assert_eq!(resolve_exports(&exports, "."), Some("./req.js".to_string()));
        assert_eq!(
            resolve_exports(&exports, "./feature/x"),
            Some("./lib/feature/x.js".to_string())
        );
        assert_eq!(resolve_exports(&exports, "./missing"), None);
        assert_eq!(
            resolve_exports(&serde_json::json!("./main.js"), "."),
            Some("./main.js".to_string())
        );
    }

    #[test]
    fn builtins_pass_through() {
        assert!(is_builtin_module("node:path"));
        assert!(is_builtin_module("fs"));
        assert!(!is_builtin_module("lodash"));
        assert_eq!(resolve_require("path", Path::new("/x/y.js")).ok(), Some("path".to_string()));
    }
}
