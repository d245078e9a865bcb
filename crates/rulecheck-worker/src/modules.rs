//! Module loading inside an execution worker.
//!
//! Every worker owns one [`ModuleHost`]: its module cache and rule cache.
//! Discarding the worker is the only way to invalidate either.
//!
//! An address is loaded by trying two strategies in order:
//!
//! 1. ES modules: a native module from the [`ModuleRegistry`], or a source
//!    file using `import`/`export` whose exports are evaluated statically and
//!    then dynamically.
//! 2. Legacy: JSON files and CommonJS sources (`module.exports = ...`,
//!    `exports.name = ...`), wrapped into a namespace with a `default` slot.

use crate::rule::{Rule, RuleError};
use crate::worker::Flavor;
use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use rulecheck_common::limits::MAX_MODULE_LOAD_DEPTH;
use rulecheck_eval::globals::own_entries;
use rulecheck_eval::{
    ModuleLoader, Value, evaluate, is_builtin_module, resolve_expression, resolve_import_source,
    resolve_require,
};
use rulecheck_syntax::binder::collect_pattern_names;
use rulecheck_syntax::{
    AssignmentOperator, Definition, ImportKind, NodeArena, NodeIndex, NodeKind, ParsedModule,
    ScopeTree,
};
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

pub type ModuleFactory = Arc<dyn Fn() -> Value + Send + Sync>;
pub type RuleFactory = Arc<dyn Fn() -> Box<dyn Rule> + Send + Sync>;

// =============================================================================
// Registry
// =============================================================================

/// Host-provided modules and rules, shared by every worker of a pool.
///
/// Factories run inside the worker the first time it needs the address, so
/// each worker gets its own instances.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: FxHashMap<String, ModuleFactory>,
    rules: FxHashMap<String, RuleFactory>,
}

impl ModuleRegistry {
    pub fn new() -> ModuleRegistry {
        ModuleRegistry::default()
    }

    /// Register a native module. `factory` returns the module namespace.
    pub fn register_module(
        &mut self,
        address: impl Into<String>,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) -> &mut ModuleRegistry {
        self.modules.insert(address.into(), Arc::new(factory));
        self
    }

    pub fn register_rule(
        &mut self,
        address: impl Into<String>,
        factory: impl Fn() -> Box<dyn Rule> + Send + Sync + 'static,
    ) -> &mut ModuleRegistry {
        self.rules.insert(address.into(), Arc::new(factory));
        self
    }

    pub fn module_factory(&self, address: &str) -> Option<&ModuleFactory> {
        lookup(&self.modules, address)
    }

    pub fn rule_factory(&self, address: &str) -> Option<&RuleFactory> {
        lookup(&self.rules, address)
    }
}

/// Exact match first, then the canonical form of a file path.
fn lookup<'a, T>(map: &'a FxHashMap<String, T>, address: &str) -> Option<&'a T> {
    if let Some(found) = map.get(address) {
        return Some(found);
    }
    let canonical = std::fs::canonicalize(address).ok()?;
    map.get(canonical.to_str()?)
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Host
// =============================================================================

enum ModuleState {
    Loading,
    Loaded(Option<Value>),
}

pub struct ModuleHost {
    registry: Arc<ModuleRegistry>,
    /// Package root the worker serves; bare specifiers resolve from here.
    root: PathBuf,
    flavor: Flavor,
    modules: FxHashMap<String, ModuleState>,
    rules: FxHashMap<String, Rc<dyn Rule>>,
    depth: u32,
}

impl ModuleHost {
    pub fn new(registry: Arc<ModuleRegistry>, root: PathBuf, flavor: Flavor) -> ModuleHost {
        ModuleHost {
            registry,
            root,
            flavor,
            modules: FxHashMap::default(),
            rules: FxHashMap::default(),
            depth: 0,
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Number of addresses in the module cache, failed loads included.
    pub fn cached_modules(&self) -> usize {
        self.modules.len()
    }

    /// The rule registered at `address`, instantiated once per host.
    pub fn load_rule(&mut self, address: &str) -> Result<Rc<dyn Rule>, RuleError> {
        if let Some(rule) = self.rules.get(address) {
            return Ok(Rc::clone(rule));
        }
        let factory = self
            .registry
            .rule_factory(address)
            .ok_or_else(|| RuleError::RuleNotFound(address.to_string()))?;
        let rule: Rc<dyn Rule> = Rc::from(factory());
        debug!(address, "rule loaded");
        self.rules.insert(address.to_string(), Rc::clone(&rule));
        Ok(rule)
    }

    fn load_uncached(&mut self, address: &str) -> Option<Value> {
        let strategies: [(&str, fn(&mut ModuleHost, &str) -> Result<Value>); 2] = [
            ("esm", ModuleHost::load_es_module),
            ("legacy", ModuleHost::load_legacy_module),
        ];
        for (strategy, load) in strategies {
            match load(self, address) {
                Ok(value) => {
                    debug!(address, strategy, "module loaded");
                    return Some(value);
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    debug!(address, strategy, %reason, "loading strategy failed");
                }
            }
        }
        None
    }

    // =========================================================================
    // Strategies
    // =========================================================================

    fn load_es_module(&mut self, address: &str) -> Result<Value> {
        if let Some(factory) = self.registry.module_factory(address) {
            return Ok(factory());
        }
        let path = self.locate(address)?;
        let extension = extension(&path);
        match extension {
            "mjs" | "js" => {}
            "mts" | "ts" => self.ensure_typescript_allowed(&path)?,
            other => bail!("'.{other}' files are not ES modules"),
        }
        let module = parse_file(&path)?;
        if !matches!(extension, "mjs" | "mts") && !has_module_syntax(&module) {
            bail!("{} has no import or export statements", path.display());
        }
        self.evaluate_es_module(&module, &path)
    }

    fn load_legacy_module(&mut self, address: &str) -> Result<Value> {
        let path = self.locate(address)?;
        let exports = match extension(&path) {
            "json" => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let json: serde_json::Value = serde_json::from_str(&text)
                    .with_context(|| format!("invalid JSON in {}", path.display()))?;
                Value::from_json(&json)
            }
            "js" | "cjs" => self.load_commonjs(&path)?,
            "ts" | "cts" => {
                self.ensure_typescript_allowed(&path)?;
                self.load_commonjs(&path)?
            }
            other => bail!("cannot load '.{other}' files"),
        };
        Ok(interop_namespace(exports))
    }

    fn load_commonjs(&mut self, path: &Path) -> Result<Value> {
        let module = parse_file(path)?;
        if has_module_syntax(&module) {
            bail!("{} uses ES module syntax", path.display());
        }
        self.evaluate_commonjs(&module, path)
    }

    fn ensure_typescript_allowed(&self, path: &Path) -> Result<()> {
        if !self.flavor.allows_typescript() {
            bail!(
                "{} is TypeScript; the {} flavor cannot load it",
                path.display(),
                self.flavor.as_str()
            );
        }
        Ok(())
    }

    /// File path of a non-native address.
    fn locate(&self, address: &str) -> Result<PathBuf> {
        let path = Path::new(address);
        if path.is_absolute() {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            bail!("no such file: {address}");
        }
        if is_builtin_module(address) {
            bail!("builtin module '{address}' is not available");
        }
        let anchor = self.root.join("package.json");
        let resolved = resolve_require(address, &anchor)
            .with_context(|| format!("resolving '{address}' from {}", self.root.display()))?;
        Ok(PathBuf::from(resolved))
    }

    // =========================================================================
    // Evaluation of source modules
    // =========================================================================

    fn evaluate_node(&mut self, module: &ParsedModule, node: NodeIndex, path: &Path) -> Result<Value> {
        let resolved = resolve_expression(module, node, path);
        evaluate(&resolved, self)
            .ok_or_else(|| anyhow!("`{}` is not determinable", resolved.print()))
    }

    fn load_dependency(&mut self, source: &str, from: &Path) -> Result<Value> {
        let address = resolve_import_source(source, from)?;
        self.load(&address)
            .ok_or_else(|| anyhow!("cannot load '{source}' from {}", from.display()))
    }

    fn evaluate_es_module(&mut self, module: &ParsedModule, path: &Path) -> Result<Value> {
        let mut exports: IndexMap<String, Value> = IndexMap::new();
        for &stmt in module.statements() {
            match module.arena.kind(stmt) {
                Some(NodeKind::ExportDefault { expression }) => {
                    let value = self
                        .evaluate_node(module, *expression, path)
                        .context("default export")?;
                    exports.insert("default".to_string(), value);
                }
                Some(NodeKind::ExportNamed {
                    declaration,
                    specifiers,
                    source,
                }) => {
                    if declaration.is_some() {
                        self.export_declaration(module, *declaration, path, &mut exports)?;
                    }
                    match source {
                        Some(source) => {
                            let namespace = self.load_dependency(source, path)?;
                            for specifier in specifiers {
                                let value = export_of(&namespace, &specifier.local)
                                    .with_context(|| format!("re-export from '{source}'"))?;
                                exports.insert(specifier.exported.clone(), value);
                            }
                        }
                        None => {
                            for specifier in specifiers {
                                let value = self
                                    .binding_value(module, &specifier.local, path)
                                    .with_context(|| format!("export '{}'", specifier.exported))?;
                                exports.insert(specifier.exported.clone(), value);
                            }
                        }
                    }
                }
                Some(NodeKind::ExportAll { exported, source }) => {
                    let namespace = self.load_dependency(source, path)?;
                    match exported {
                        Some(name) => {
                            exports.insert(name.clone(), namespace);
                        }
                        None => {
                            for (key, value) in own_entries(&namespace)? {
                                if key != "default" {
                                    exports.entry(key).or_insert(value);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        trace!(path = %path.display(), exports = exports.len(), "evaluated ES module");
        Ok(Value::object(exports))
    }

    fn export_declaration(
        &mut self,
        module: &ParsedModule,
        declaration: NodeIndex,
        path: &Path,
        exports: &mut IndexMap<String, Value>,
    ) -> Result<()> {
        match module.arena.kind(declaration) {
            Some(NodeKind::VariableDeclaration { declarations, .. }) => {
                for &declarator in declarations {
                    let Some(NodeKind::VariableDeclarator { id, init }) = module.arena.kind(declarator)
                    else {
                        continue;
                    };
                    if let Some(name) = module.arena.identifier_name(*id) {
                        let value = if init.is_some() {
                            self.evaluate_node(module, *init, path)
                                .with_context(|| format!("export '{name}'"))?
                        } else {
                            Value::Undefined
                        };
                        exports.insert(name.to_string(), value);
                        continue;
                    }
                    let mut names = Vec::new();
                    collect_pattern_names(&module.arena, *id, &mut names);
                    for name_node in names {
                        let name = module.arena.identifier_name(name_node).unwrap_or_default();
                        let value = self
                            .evaluate_node(module, name_node, path)
                            .with_context(|| format!("export '{name}'"))?;
                        exports.insert(name.to_string(), value);
                    }
                }
                Ok(())
            }
            Some(NodeKind::FunctionDeclaration { name, .. } | NodeKind::ClassDeclaration { name, .. }) => {
                bail!("export '{name}' is a function or class")
            }
            _ => bail!("unsupported export declaration"),
        }
    }

    /// Value of a module-scope binding, for `export { name }`.
    fn binding_value(&mut self, module: &ParsedModule, name: &str, path: &Path) -> Result<Value> {
        let variable = module
            .scopes
            .lookup(ScopeTree::ROOT, name)
            .ok_or_else(|| anyhow!("'{name}' is not declared"))?;
        let [def] = variable.defs.as_slice() else {
            bail!("'{name}' is declared more than once");
        };
        match def {
            Definition::Variable {
                declarator,
                name_node,
                init,
                ..
            } => {
                let direct = matches!(
                    module.arena.kind(*declarator),
                    Some(NodeKind::VariableDeclarator { id, .. }) if id == name_node
                );
                match (direct, init.is_some()) {
                    (true, true) => self.evaluate_node(module, *init, path),
                    (true, false) => Ok(Value::Undefined),
                    (false, _) => self.evaluate_node(module, *name_node, path),
                }
            }
            Definition::Import { kind, source, .. } => {
                let namespace = self.load_dependency(source, path)?;
                match kind {
                    ImportKind::Namespace => Ok(namespace),
                    ImportKind::Default => export_of(&namespace, "default"),
                    ImportKind::Named(imported) => export_of(&namespace, imported),
                }
            }
            Definition::Function { .. } | Definition::Class { .. } => {
                bail!("'{name}' is a function or class")
            }
        }
    }

    fn evaluate_commonjs(&mut self, module: &ParsedModule, path: &Path) -> Result<Value> {
        let free = |name: &str| module.scopes.lookup(ScopeTree::ROOT, name).is_none();
        if !free("module") && !free("exports") {
            bail!("`module` and `exports` are shadowed");
        }
        let mut replaced: Option<Value> = None;
        let mut properties: IndexMap<String, Value> = IndexMap::new();
        for &stmt in module.statements() {
            let Some(NodeKind::ExpressionStatement { expression }) = module.arena.kind(stmt) else {
                continue;
            };
            let Some(NodeKind::Assignment {
                operator: AssignmentOperator::Assign,
                target,
                value,
            }) = module.arena.kind(*expression)
            else {
                continue;
            };
            match commonjs_target(&module.arena, *target) {
                Some(CommonJsTarget::ModuleExports) if free("module") => {
                    replaced = Some(self.evaluate_node(module, *value, path)?);
                    properties.clear();
                }
                Some(CommonJsTarget::ModuleProperty(key)) if free("module") => {
                    properties.insert(key, self.evaluate_node(module, *value, path)?);
                }
                // `exports` no longer aliases `module.exports` once it is replaced
                Some(CommonJsTarget::ExportsProperty(key)) if free("exports") && replaced.is_none() => {
                    properties.insert(key, self.evaluate_node(module, *value, path)?);
                }
                _ => {}
            }
        }
        match replaced {
            Some(value) if properties.is_empty() => Ok(value),
            Some(value) => {
                let mut merged: IndexMap<String, Value> = own_entries(&value)?.into_iter().collect();
                merged.extend(properties);
                Ok(Value::object(merged))
            }
            None => Ok(Value::object(properties)),
        }
    }
}

impl ModuleLoader for ModuleHost {
    fn load(&mut self, address: &str) -> Option<Value> {
        match self.modules.get(address) {
            Some(ModuleState::Loaded(value)) => return value.clone(),
            Some(ModuleState::Loading) => {
                debug!(address, "cyclic module load");
                return None;
            }
            None => {}
        }
        if self.depth >= MAX_MODULE_LOAD_DEPTH {
            debug!(address, depth = self.depth, "module load depth exceeded");
            return None;
        }
        self.modules.insert(address.to_string(), ModuleState::Loading);
        self.depth += 1;
        let mut load = LoadGuard {
            host: self,
            address,
            finished: false,
        };
        let value = load.host.load_uncached(address);
        load.host
            .modules
            .insert(address.to_string(), ModuleState::Loaded(value.clone()));
        load.finished = true;
        value
    }
}

/// Restores the host when a load unwinds, so the address can be loaded again.
struct LoadGuard<'h> {
    host: &'h mut ModuleHost,
    address: &'h str,
    finished: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.host.depth -= 1;
        if !self.finished {
            self.host.modules.remove(self.address);
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

enum CommonJsTarget {
    /// `module.exports = ...`
    ModuleExports,
    /// `module.exports.name = ...`
    ModuleProperty(String),
    /// `exports.name = ...`
    ExportsProperty(String),
}

fn member_parts(arena: &NodeArena, node: NodeIndex) -> Option<(NodeIndex, String)> {
    let NodeKind::Member {
        object,
        property,
        computed,
        ..
    } = arena.kind(node)?
    else {
        return None;
    };
    let key = if *computed {
        arena.string_literal(*property)?.to_string()
    } else {
        arena.identifier_name(*property)?.to_string()
    };
    Some((*object, key))
}

fn commonjs_target(arena: &NodeArena, target: NodeIndex) -> Option<CommonJsTarget> {
    let (object, key) = member_parts(arena, target)?;
    match arena.identifier_name(object) {
        Some("module") if key == "exports" => return Some(CommonJsTarget::ModuleExports),
        Some("exports") => return Some(CommonJsTarget::ExportsProperty(key)),
        _ => {}
    }
    let (inner, inner_key) = member_parts(arena, object)?;
    (arena.identifier_name(inner) == Some("module") && inner_key == "exports")
        .then_some(CommonJsTarget::ModuleProperty(key))
}

fn has_module_syntax(module: &ParsedModule) -> bool {
    module.statements().iter().any(|&stmt| {
        matches!(
            module.arena.kind(stmt),
            Some(
                NodeKind::ImportDeclaration { .. }
                    | NodeKind::ExportNamed { .. }
                    | NodeKind::ExportDefault { .. }
                    | NodeKind::ExportAll { .. }
            )
        )
    })
}

fn parse_file(path: &Path) -> Result<ParsedModule> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ParsedModule::parse(path.display().to_string(), source)
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

fn export_of(namespace: &Value, name: &str) -> Result<Value> {
    namespace
        .as_object()
        .and_then(|object| object.properties.get(name))
        .cloned()
        .ok_or_else(|| anyhow!("no export named '{name}'"))
}

/// Namespace seen by `import` for a legacy module: its own properties plus
/// `default`, unless it is flagged `__esModule`.
pub fn interop_namespace(exports: Value) -> Value {
    let Some(object) = exports.as_object() else {
        return Value::from_entries([("default", exports)]);
    };
    if object
        .properties
        .get("__esModule")
        .is_some_and(Value::is_truthy)
    {
        return exports;
    }
    let mut namespace = object.properties.clone();
    namespace.insert("default".to_string(), exports.clone());
    Value::object(namespace)
}
