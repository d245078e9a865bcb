//! Static partial evaluation.
//!
//! Reduces an expression from a host source file to a residual expression
//! plus an import table without executing any code. Every subtree whose value
//! is statically known is folded to a literal; references to imported
//! bindings and `require(...)` calls are replaced by opaque references whose
//! module address is recorded in the import table. The dynamic stage later
//! loads those addresses and evaluates what is left.

use crate::import_resolver::{resolve_import_source, resolve_require};
use crate::literal::{is_literal_tree, value_to_literal};
use crate::static_value::{fold_value, static_value};
use crate::value::Value;
use indexmap::IndexMap;
use rulecheck_common::Span;
use rulecheck_common::limits::MAX_STATIC_RESOLVE_DEPTH;
use rulecheck_syntax::binder::collect_pattern_names;
use rulecheck_syntax::{
    BinaryOperator, DeclarationKind, Definition, ImportKind, Literal, LogicalOperator, NodeArena,
    NodeIndex, NodeKind, ParsedModule, PropertyKind, ScopeId, ScopeTree, print_node,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Opaque reference name → module address.
pub type ImportTable = IndexMap<String, String>;

static OPAQUE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Residual expression and the imports it needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedExpression {
    pub arena: NodeArena,
    pub root: NodeIndex,
    pub imports: ImportTable,
}

impl ResolvedExpression {
    /// A residual expression that is just `value`.
    pub fn from_value(value: &Value) -> Option<ResolvedExpression> {
        let mut arena = NodeArena::new();
        let root = value_to_literal(&mut arena, value, Span::default())?;
        Some(ResolvedExpression {
            arena,
            root,
            imports: ImportTable::new(),
        })
    }

    /// Whether the residual is fully folded (a literal, or an array/object of
    /// literals).
    pub fn is_literal(&self) -> bool {
        is_literal_tree(&self.arena, self.root)
    }

    /// Value of a fully folded residual.
    pub fn literal_value(&self) -> Option<Value> {
        if !self.is_literal() {
            return None;
        }
        static_value(&self.arena, None, self.root)
    }

    /// Residual rendered as source text.
    pub fn print(&self) -> String {
        print_node(&self.arena, self.root)
    }

    /// Opaque reference names occurring in the residual, in tree order.
    pub fn opaque_references(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if let Some(name) = self.arena.identifier_name(node)
                && self.imports.contains_key(name)
            {
                out.push(name.to_string());
            }
            let children = self.arena.children(node);
            stack.extend(children.into_iter().rev());
        }
        out
    }
}

/// Resolve `node` of `module` statically.
///
/// `origin_file` is the path of the module's source file. It anchors relative
/// imports, `__dirname`, `__filename` and `import.meta`.
pub fn resolve_expression(
    module: &ParsedModule,
    node: NodeIndex,
    origin_file: &Path,
) -> ResolvedExpression {
    let mut evaluator = StaticEvaluator::new(&module.arena, &module.scopes, origin_file);
    let out_root = evaluator.resolve(node);
    let mut arena = NodeArena::with_capacity(evaluator.out.len());
    let root = arena.copy_subtree(&evaluator.out, out_root);
    let resolved = ResolvedExpression {
        arena,
        root,
        imports: evaluator.imports,
    };
    debug!(
        residual = %resolved.print(),
        imports = resolved.imports.len(),
        "resolved expression statically"
    );
    resolved
}

/// Sanitized form of a specifier for use inside an identifier.
fn sanitize_specifier(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for ch in source.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
            out.push(ch);
        } else {
            out.extend(std::iter::repeat_n('_', ch.len_utf16()));
        }
    }
    out
}

pub struct StaticEvaluator<'m> {
    arena: &'m NodeArena,
    scopes: &'m ScopeTree,
    origin_file: &'m Path,
    out: NodeArena,
    imports: ImportTable,
    memo: FxHashMap<NodeIndex, NodeIndex>,
    visiting: FxHashSet<NodeIndex>,
    /// Every name declared in the module. Residual identifiers with these
    /// names must not be folded as builtins.
    shadowed: FxHashSet<String>,
    depth: u32,
}

impl<'m> StaticEvaluator<'m> {
    pub fn new(arena: &'m NodeArena, scopes: &'m ScopeTree, origin_file: &'m Path) -> Self {
        let shadowed = (0..scopes.len() as u32)
            .filter_map(|id| scopes.get(ScopeId(id)))
            .flat_map(|scope| scope.variables.keys().cloned())
            .collect();
        StaticEvaluator {
            arena,
            scopes,
            origin_file,
            out: NodeArena::new(),
            imports: ImportTable::new(),
            memo: FxHashMap::default(),
            visiting: FxHashSet::default(),
            shadowed,
            depth: 0,
        }
    }

    /// Resolve an input node into a node of the output arena.
    pub fn resolve(&mut self, node: NodeIndex) -> NodeIndex {
        if node.is_none() {
            return NodeIndex::NONE;
        }
        if let Some(&cached) = self.memo.get(&node) {
            return cached;
        }
        if self.visiting.contains(&node) || self.depth >= MAX_STATIC_RESOLVE_DEPTH {
            trace!(node = node.0, "cyclic or too deep, left unchanged");
            return self.copy_input(node);
        }
        self.visiting.insert(node);
        self.depth += 1;
        let resolved = self.resolve_kind(node);
        self.depth -= 1;
        self.visiting.remove(&node);
        self.memo.insert(node, resolved);
        resolved
    }

    // =========================================================================
    // Output helpers
    // =========================================================================

    fn copy_input(&mut self, node: NodeIndex) -> NodeIndex {
        self.out.copy_subtree(self.arena, node)
    }

    fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeIndex {
        self.out.alloc(kind, span)
    }

    fn literal(&mut self, literal: Literal, span: Span) -> NodeIndex {
        self.out.alloc(NodeKind::Literal(literal), span)
    }

    fn string(&mut self, value: &str, span: Span) -> NodeIndex {
        self.literal(Literal::String(value.to_string()), span)
    }

    fn identifier(&mut self, name: &str, span: Span) -> NodeIndex {
        self.out.alloc(
            NodeKind::Identifier {
                name: name.to_string(),
            },
            span,
        )
    }

    fn member(&mut self, object: NodeIndex, name: &str, span: Span) -> NodeIndex {
        let is_identifier = name
            .chars()
            .next()
            .is_some_and(rulecheck_syntax::scanner::is_identifier_start)
            && name.chars().all(rulecheck_syntax::scanner::is_identifier_part);
        let (property, computed) = if is_identifier {
            (self.identifier(name, span), false)
        } else {
            (self.string(name, span), true)
        };
        self.alloc(
            NodeKind::Member {
                object,
                property,
                computed,
                optional: false,
            },
            span,
        )
    }

    /// Fold an output node to a literal when its value is known.
    fn try_fold(&mut self, node: NodeIndex) -> NodeIndex {
        if is_literal_tree(&self.out, node) {
            return node;
        }
        let Some(value) = fold_value(&self.out, node, &self.shadowed) else {
            return node;
        };
        let span = self.out.span(node);
        value_to_literal(&mut self.out, &value, span).unwrap_or(node)
    }

    /// Static value of an output node, if known.
    fn known_value(&self, node: NodeIndex) -> Option<Value> {
        fold_value(&self.out, node, &self.shadowed)
    }

    fn is_unbound(&self, node: NodeIndex, name: &str) -> bool {
        let scope = self.scopes.scope_at(self.arena.span(node).pos);
        !self.scopes.is_bound(scope, name)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn resolve_kind(&mut self, node: NodeIndex) -> NodeIndex {
        let arena = self.arena;
        let Some(kind) = arena.kind(node) else {
            return NodeIndex::NONE;
        };
        let span = arena.span(node);

        if folds_statically_first(kind)
            && let Some(value) = static_value(arena, Some(self.scopes), node)
            && let Some(folded) = value_to_literal(&mut self.out, &value, span)
        {
            return folded;
        }

        match kind {
            NodeKind::Literal(literal) => self.literal(literal.clone(), span),
            NodeKind::Identifier { name } => self.resolve_identifier(node, name),
            NodeKind::Template {
                quasis,
                expressions,
            } => {
                let expressions = expressions.iter().map(|&e| self.resolve(e)).collect();
                let template = self.alloc(
                    NodeKind::Template {
                        quasis: quasis.clone(),
                        expressions,
                    },
                    span,
                );
                self.try_fold(template)
            }
            NodeKind::TaggedTemplate { tag, quasi } => {
                let tag = self.resolve(*tag);
                let quasi = match arena.kind(*quasi) {
                    Some(NodeKind::Template {
                        quasis,
                        expressions,
                    }) => {
                        let expressions = expressions.iter().map(|&e| self.resolve(e)).collect();
                        self.alloc(
                            NodeKind::Template {
                                quasis: quasis.clone(),
                                expressions,
                            },
                            arena.span(*quasi),
                        )
                    }
                    _ => self.copy_input(*quasi),
                };
                let tagged = self.alloc(NodeKind::TaggedTemplate { tag, quasi }, span);
                self.try_fold(tagged)
            }
            NodeKind::Array { elements } => {
                let elements = self.resolve_elements(elements);
                let array = self.alloc(NodeKind::Array { elements }, span);
                self.try_fold(array)
            }
            NodeKind::Object { properties } => self.resolve_object(properties, span),
            NodeKind::Unary { operator, argument } => {
                let argument = self.resolve(*argument);
                let unary = self.alloc(
                    NodeKind::Unary {
                        operator: *operator,
                        argument,
                    },
                    span,
                );
                self.try_fold(unary)
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.resolve(*left);
                let right = self.resolve(*right);
                let binary = self.alloc(
                    NodeKind::Binary {
                        operator: *operator,
                        left,
                        right,
                    },
                    span,
                );
                self.try_fold(binary)
            }
            NodeKind::Logical {
                operator,
                left,
                right,
            } => self.resolve_logical(*operator, *left, *right, span),
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.resolve(*test);
                if let Some(value) = self.known_value(test) {
                    return if value.is_truthy() {
                        self.resolve(*consequent)
                    } else {
                        self.resolve(*alternate)
                    };
                }
                let consequent = self.resolve(*consequent);
                let alternate = self.resolve(*alternate);
                self.alloc(
                    NodeKind::Conditional {
                        test,
                        consequent,
                        alternate,
                    },
                    span,
                )
            }
            NodeKind::Assignment { value, .. } => self.resolve(*value),
            NodeKind::Sequence { expressions } => match expressions.last() {
                Some(&last) => self.resolve(last),
                None => self.copy_input(node),
            },
            NodeKind::Call {
                callee,
                arguments,
                optional,
            } => self.resolve_call(node, *callee, arguments, *optional, span),
            NodeKind::New { callee, arguments } => {
                let callee = self.resolve_callee(*callee);
                let arguments = self.resolve_elements(arguments);
                let new = self.alloc(NodeKind::New { callee, arguments }, span);
                self.try_fold(new)
            }
            NodeKind::Member {
                object,
                property,
                computed,
                optional,
            } => {
                let object = self.resolve_callee(*object);
                let property = if *computed {
                    self.resolve(*property)
                } else {
                    self.copy_input(*property)
                };
                let member = self.alloc(
                    NodeKind::Member {
                        object,
                        property,
                        computed: *computed,
                        optional: *optional,
                    },
                    span,
                );
                self.try_fold(member)
            }
            NodeKind::Chain { expression } => {
                let expression = self.resolve(*expression);
                let chain = self.alloc(NodeKind::Chain { expression }, span);
                self.try_fold(chain)
            }
            NodeKind::MetaProperty { meta, property } if meta == "import" && property == "meta" => {
                self.import_meta(span)
            }
            NodeKind::Update { .. }
            | NodeKind::MetaProperty { .. }
            | NodeKind::This
            | NodeKind::Super
            | NodeKind::Yield { .. }
            | NodeKind::Await { .. }
            | NodeKind::ImportCall { .. }
            | NodeKind::Function { .. }
            | NodeKind::Class { .. } => self.copy_input(node),
            _ => {
                trace!(kind = kind.name(), "not an expression, left unchanged");
                self.copy_input(node)
            }
        }
    }

    /// `super` stays as is in callee and object position.
    fn resolve_callee(&mut self, node: NodeIndex) -> NodeIndex {
        match self.arena.kind(node) {
            Some(NodeKind::Super) => self.copy_input(node),
            _ => self.resolve(node),
        }
    }

    // =========================================================================
    // Identifiers and imports
    // =========================================================================

    fn resolve_identifier(&mut self, node: NodeIndex, name: &str) -> NodeIndex {
        let scopes = self.scopes;
        let span = self.arena.span(node);
        let scope = scopes.scope_at(span.pos);
        let Some(variable) = scopes.lookup(scope, name) else {
            return match name {
                "__dirname" => {
                    let dir = self
                        .origin_file
                        .parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    self.string(&dir, span)
                }
                "__filename" => {
                    let file = self.origin_file.display().to_string();
                    self.string(&file, span)
                }
                "undefined" => self.literal(Literal::Undefined, span),
                "NaN" => self.literal(Literal::Number(f64::NAN), span),
                "Infinity" => self.literal(Literal::Number(f64::INFINITY), span),
                _ => self.copy_input(node),
            };
        };
        let [def] = variable.defs.as_slice() else {
            return self.copy_input(node);
        };
        match def {
            Definition::Variable {
                kind: DeclarationKind::Const,
                declarator,
                init,
                ..
            } if init.is_some() => {
                let Some(NodeKind::VariableDeclarator { id, .. }) = self.arena.kind(*declarator)
                else {
                    return self.copy_input(node);
                };
                let id = *id;
                let resolved_init = self.resolve(*init);
                self.resolve_pattern(resolved_init, id, name)
                    .unwrap_or_else(|| self.copy_input(node))
            }
            Definition::Import { kind, source, .. } => {
                match self.mint_opaque(source, span) {
                    Some(opaque) => self.import_specifier(opaque, kind, span),
                    None => self.copy_input(node),
                }
            }
            _ => self.copy_input(node),
        }
    }

    /// Create an opaque reference for `source` and record its address.
    /// `None` when a relative specifier does not resolve.
    fn mint_opaque(&mut self, source: &str, span: Span) -> Option<NodeIndex> {
        let address = match resolve_import_source(source, self.origin_file) {
            Ok(address) => address,
            Err(err) => {
                debug!(%err, "import left unresolved");
                return None;
            }
        };
        let sequence = OPAQUE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let name = format!("$_import_{}_{sequence}", sanitize_specifier(source));
        trace!(%name, %address, "minted opaque reference");
        self.imports.insert(name.clone(), address);
        Some(self.identifier(&name, span))
    }

    fn import_specifier(&mut self, opaque: NodeIndex, kind: &ImportKind, span: Span) -> NodeIndex {
        match kind {
            ImportKind::Namespace => opaque,
            ImportKind::Default => self.member(opaque, "default", span),
            ImportKind::Named(imported) => self.member(opaque, imported, span),
        }
    }

    fn import_meta(&mut self, span: Span) -> NodeIndex {
        let file = self.origin_file.display().to_string();
        let dirname = self
            .origin_file
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let url = url::Url::from_file_path(self.origin_file)
            .map(|u| u.to_string())
            .unwrap_or_else(|()| format!("file://{file}"));
        let entries = [("dirname", dirname), ("filename", file), ("url", url)];
        let mut properties = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let key = self.identifier(key, span);
            let value = self.string(&value, span);
            properties.push(self.alloc(
                NodeKind::Property {
                    key,
                    value,
                    computed: false,
                    shorthand: false,
                    method: false,
                    kind: PropertyKind::Init,
                },
                span,
            ));
        }
        self.alloc(NodeKind::Object { properties }, span)
    }

    // =========================================================================
    // Destructuring
    // =========================================================================

    /// Access path to `name` inside `pattern` when `pattern` is bound to the
    /// output node `init`.
    fn resolve_pattern(&mut self, init: NodeIndex, pattern: NodeIndex, name: &str) -> Option<NodeIndex> {
        let arena = self.arena;
        let span = arena.span(pattern);
        match arena.kind(pattern)? {
            NodeKind::Identifier { name: bound } => (bound == name).then_some(init),
            NodeKind::AssignmentPattern { left, right } => {
                if !self.pattern_binds(*left, name) {
                    return None;
                }
                let defaulted = self.with_default(init, *right, span);
                self.resolve_pattern(defaulted, *left, name)
            }
            NodeKind::ArrayPattern { elements } => {
                for (index, &element) in elements.iter().enumerate() {
                    if element.is_none() || !self.pattern_binds(element, name) {
                        continue;
                    }
                    let index_literal = self.literal(Literal::Number(index as f64), span);
                    if let Some(NodeKind::Rest { argument }) = arena.kind(element) {
                        let slice = self.member(init, "slice", span);
                        let call = self.alloc(
                            NodeKind::Call {
                                callee: slice,
                                arguments: vec![index_literal],
                                optional: false,
                            },
                            span,
                        );
                        let access = self.try_fold(call);
                        return self.resolve_pattern(access, *argument, name);
                    }
                    let member = self.alloc(
                        NodeKind::Member {
                            object: init,
                            property: index_literal,
                            computed: true,
                            optional: false,
                        },
                        span,
                    );
                    let access = self.try_fold(member);
                    return self.resolve_pattern(access, element, name);
                }
                None
            }
            NodeKind::ObjectPattern { properties } => {
                for &property in properties {
                    let Some(NodeKind::Property {
                        key,
                        value,
                        computed,
                        ..
                    }) = arena.kind(property)
                    else {
                        // `...rest` has no member-access form.
                        continue;
                    };
                    if !self.pattern_binds(*value, name) {
                        continue;
                    }
                    let member = if *computed {
                        let key = self.resolve(*key);
                        self.alloc(
                            NodeKind::Member {
                                object: init,
                                property: key,
                                computed: true,
                                optional: false,
                            },
                            span,
                        )
                    } else {
                        let key = crate::interpreter::static_property_key(arena, *key)?;
                        self.member(init, &key, span)
                    };
                    let access = self.try_fold(member);
                    return self.resolve_pattern(access, *value, name);
                }
                None
            }
            _ => None,
        }
    }

    fn pattern_binds(&self, pattern: NodeIndex, name: &str) -> bool {
        let mut names = Vec::new();
        collect_pattern_names(self.arena, pattern, &mut names);
        names
            .iter()
            .any(|&n| self.arena.identifier_name(n) == Some(name))
    }

    /// `value === undefined ? default : value`, reduced when `value` is known.
    fn with_default(&mut self, value: NodeIndex, default: NodeIndex, span: Span) -> NodeIndex {
        if let Some(known) = self.known_value(value) {
            return if matches!(known, Value::Undefined) {
                self.resolve(default)
            } else {
                value
            };
        }
        let undefined = self.literal(Literal::Undefined, span);
        let test = self.alloc(
            NodeKind::Binary {
                operator: BinaryOperator::StrictEq,
                left: value,
                right: undefined,
            },
            span,
        );
        let consequent = self.resolve(default);
        self.alloc(
            NodeKind::Conditional {
                test,
                consequent,
                alternate: value,
            },
            span,
        )
    }

    // =========================================================================
    // Composite expressions
    // =========================================================================

    /// Resolve an element list: holes become `undefined`, spreads of array
    /// literals are inlined.
    fn resolve_elements(&mut self, elements: &[NodeIndex]) -> Vec<NodeIndex> {
        let arena = self.arena;
        let mut out = Vec::with_capacity(elements.len());
        for &element in elements {
            if element.is_none() {
                out.push(self.literal(Literal::Undefined, Span::default()));
                continue;
            }
            let Some(NodeKind::Spread { argument }) = arena.kind(element) else {
                out.push(self.resolve(element));
                continue;
            };
            let argument = self.resolve(*argument);
            if let Some(NodeKind::Array { elements: inner }) = self.out.kind(argument) {
                let inner = inner.clone();
                for item in inner {
                    if item.is_none() {
                        out.push(self.literal(Literal::Undefined, Span::default()));
                    } else {
                        out.push(item);
                    }
                }
                continue;
            }
            out.push(self.alloc(NodeKind::Spread { argument }, arena.span(element)));
        }
        out
    }

    fn resolve_object(&mut self, properties: &[NodeIndex], span: Span) -> NodeIndex {
        let arena = self.arena;
        let mut out = Vec::with_capacity(properties.len());
        for &property in properties {
            match arena.kind(property) {
                Some(NodeKind::Property {
                    key,
                    value,
                    computed,
                    method,
                    kind,
                    ..
                }) => {
                    if *method || *kind != PropertyKind::Init {
                        out.push(self.copy_input(property));
                        continue;
                    }
                    let key = if *computed {
                        self.resolve(*key)
                    } else {
                        self.copy_input(*key)
                    };
                    let value = self.resolve(*value);
                    out.push(self.alloc(
                        NodeKind::Property {
                            key,
                            value,
                            computed: *computed,
                            shorthand: false,
                            method: false,
                            kind: PropertyKind::Init,
                        },
                        arena.span(property),
                    ));
                }
                Some(NodeKind::Spread { argument }) => {
                    let argument = self.resolve(*argument);
                    if let Some(NodeKind::Object { properties: inner }) = self.out.kind(argument) {
                        out.extend(inner.iter().copied());
                        continue;
                    }
                    out.push(self.alloc(NodeKind::Spread { argument }, arena.span(property)));
                }
                _ => out.push(self.copy_input(property)),
            }
        }
        let object = self.alloc(NodeKind::Object { properties: out }, span);
        self.try_fold(object)
    }

    fn resolve_logical(
        &mut self,
        operator: LogicalOperator,
        left: NodeIndex,
        right: NodeIndex,
        span: Span,
    ) -> NodeIndex {
        let left = self.resolve(left);
        if let Some(value) = self.known_value(left) {
            let short_circuits = match operator {
                LogicalOperator::And => !value.is_truthy(),
                LogicalOperator::Or => value.is_truthy(),
                LogicalOperator::Nullish => !value.is_nullish(),
            };
            return if short_circuits {
                left
            } else {
                self.resolve(right)
            };
        }
        let right = self.resolve(right);
        self.alloc(
            NodeKind::Logical {
                operator,
                left,
                right,
            },
            span,
        )
    }

    fn resolve_call(
        &mut self,
        node: NodeIndex,
        callee: NodeIndex,
        arguments: &[NodeIndex],
        optional: bool,
        span: Span,
    ) -> NodeIndex {
        let arena = self.arena;
        let first_argument = arguments
            .first()
            .filter(|arg| !matches!(arena.kind(**arg), Some(NodeKind::Spread { .. })))
            .copied();

        if let Some(first) = first_argument {
            // require("x")
            if arena.identifier_name(callee) == Some("require") && self.is_unbound(callee, "require") {
                let source = self.resolve(first);
                if let Some(source) = self.out.string_literal(source).map(str::to_string)
                    && let Some(opaque) = self.mint_opaque(&source, span)
                {
                    return opaque;
                }
            }
            // require.resolve("x") / import.meta.resolve("x")
            if let Some(NodeKind::Member {
                object,
                property,
                computed: false,
                ..
            }) = arena.kind(callee)
                && arena.identifier_name(*property) == Some("resolve")
                && self.is_resolve_host(*object)
            {
                let source = self.resolve(first);
                if let Some(source) = self.out.string_literal(source).map(str::to_string) {
                    match resolve_require(&source, self.origin_file) {
                        Ok(path) => return self.string(&path, span),
                        Err(err) => debug!(%err, "resolve call left residual"),
                    }
                }
            }
        }

        let callee = self.resolve_callee(callee);
        let arguments = self.resolve_elements(arguments);
        let call = self.alloc(
            NodeKind::Call {
                callee,
                arguments,
                optional,
            },
            span,
        );
        trace!(node = node.0, "rebuilt call");
        self.try_fold(call)
    }

    /// `require` (unbound) or `import.meta`.
    fn is_resolve_host(&self, object: NodeIndex) -> bool {
        match self.arena.kind(object) {
            Some(NodeKind::Identifier { name }) => name == "require" && self.is_unbound(object, name),
            Some(NodeKind::MetaProperty { meta, property }) => meta == "import" && property == "meta",
            _ => false,
        }
    }
}

/// Kinds for which a best-effort static value is attempted before the node
/// is rebuilt from its resolved children.
fn folds_statically_first(kind: &NodeKind) -> bool {
    match kind {
        NodeKind::Binary { .. }
        | NodeKind::Call { .. }
        | NodeKind::Chain { .. }
        | NodeKind::Conditional { .. }
        | NodeKind::Logical { .. }
        | NodeKind::Member { .. }
        | NodeKind::New { .. }
        | NodeKind::TaggedTemplate { .. }
        | NodeKind::This
        | NodeKind::Unary { .. }
        | NodeKind::Update { .. }
        | NodeKind::Yield { .. } => true,
        NodeKind::MetaProperty { meta, property } => !(meta == "import" && property == "meta"),
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/partial_unit_tests.rs"]
mod tests;
