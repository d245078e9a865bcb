//! Scope analysis.
//!
//! Builds a `ScopeTree` for a parsed module: one module scope plus a scope
//! per block. Function and class bodies are opaque, so only their names are
//! bound. `var` declarations hoist to the module scope.

use crate::ast::{DeclarationKind, ImportKind, NodeArena, NodeIndex, NodeKind};
use indexmap::IndexMap;
use rulecheck_common::Span;
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Block,
}

/// Where a name was introduced.
#[derive(Clone, Debug, PartialEq)]
pub enum Definition {
    Variable {
        kind: DeclarationKind,
        /// The `VariableDeclarator` node.
        declarator: NodeIndex,
        /// The identifier node that names the binding inside the declarator's
        /// pattern.
        name_node: NodeIndex,
        /// Initializer of the declarator; `NONE` when absent.
        init: NodeIndex,
    },
    Import {
        declaration: NodeIndex,
        specifier: NodeIndex,
        kind: ImportKind,
        source: String,
    },
    Function {
        node: NodeIndex,
    },
    Class {
        node: NodeIndex,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub defs: Vec<Definition>,
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub span: Span,
    pub variables: IndexMap<String, Variable>,
}

#[derive(Clone, Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    /// Resolve `name` starting at `scope` and walking outwards.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Variable> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id)?;
            if let Some(variable) = scope.variables.get(name) {
                return Some(variable);
            }
            current = scope.parent;
        }
        None
    }

    pub fn is_bound(&self, scope: ScopeId, name: &str) -> bool {
        self.lookup(scope, name).is_some()
    }

    /// Innermost scope whose span contains `offset`.
    pub fn scope_at(&self, offset: u32) -> ScopeId {
        let mut best = Self::ROOT;
        let mut best_len = u32::MAX;
        for (idx, scope) in self.scopes.iter().enumerate() {
            let contains = scope.span.pos <= offset && offset < scope.span.end.max(scope.span.pos + 1);
            if contains && scope.span.len() <= best_len {
                best = ScopeId(idx as u32);
                best_len = scope.span.len();
            }
        }
        best
    }

    fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>, span: Span) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent,
            span,
            variables: IndexMap::new(),
        });
        id
    }

    fn declare(&mut self, scope: ScopeId, name: &str, def: Definition) {
        let Some(scope) = self.scopes.get_mut(scope.0 as usize) else {
            return;
        };
        scope
            .variables
            .entry(name.to_string())
            .or_insert_with(|| Variable {
                name: name.to_string(),
                defs: Vec::new(),
            })
            .defs
            .push(def);
    }
}

pub struct BinderState<'a> {
    arena: &'a NodeArena,
    tree: ScopeTree,
}

impl<'a> BinderState<'a> {
    pub fn new(arena: &'a NodeArena) -> Self {
        BinderState {
            arena,
            tree: ScopeTree::default(),
        }
    }

    pub fn bind_program(mut self, program: NodeIndex) -> ScopeTree {
        let arena = self.arena;
        let root = self
            .tree
            .push(ScopeKind::Module, None, arena.span(program));
        if let Some(NodeKind::Program { body }) = arena.kind(program) {
            for &stmt in body {
                self.bind_statement(stmt, root);
            }
        }
        trace!(scopes = self.tree.len(), "bound program");
        self.tree
    }

    fn bind_statement(&mut self, stmt: NodeIndex, scope: ScopeId) {
        let arena = self.arena;
        let Some(kind) = arena.kind(stmt) else {
            return;
        };
        match kind {
            NodeKind::VariableDeclaration { kind, declarations } => {
                let target = if *kind == DeclarationKind::Var {
                    ScopeTree::ROOT
                } else {
                    scope
                };
                for &declarator in declarations {
                    let Some(NodeKind::VariableDeclarator { id, init }) = arena.kind(declarator)
                    else {
                        continue;
                    };
                    let mut names = Vec::new();
                    collect_pattern_names(arena, *id, &mut names);
                    for name_node in names {
                        if let Some(name) = arena.identifier_name(name_node) {
                            self.tree.declare(
                                target,
                                name,
                                Definition::Variable {
                                    kind: *kind,
                                    declarator,
                                    name_node,
                                    init: *init,
                                },
                            );
                        }
                    }
                }
            }
            NodeKind::ImportDeclaration { specifiers, source } => {
                for &specifier in specifiers {
                    if let Some(NodeKind::ImportSpecifier { kind, local }) = arena.kind(specifier)
                    {
                        self.tree.declare(
                            scope,
                            local,
                            Definition::Import {
                                declaration: stmt,
                                specifier,
                                kind: kind.clone(),
                                source: source.clone(),
                            },
                        );
                    }
                }
            }
            NodeKind::ExportNamed { declaration, .. } if declaration.is_some() => {
                self.bind_statement(*declaration, scope);
            }
            NodeKind::ExportDefault { expression } => {
                self.bind_named_literal(*expression, scope);
            }
            NodeKind::FunctionDeclaration { name, .. } => {
                self.tree
                    .declare(scope, name, Definition::Function { node: stmt });
            }
            NodeKind::ClassDeclaration { name, .. } => {
                self.tree.declare(scope, name, Definition::Class { node: stmt });
            }
            NodeKind::Block { body } => {
                let block = self
                    .tree
                    .push(ScopeKind::Block, Some(scope), arena.span(stmt));
                for &inner in body {
                    self.bind_statement(inner, block);
                }
            }
            _ => {}
        }
    }

    /// `export default function f() {}` binds `f` in the module.
    fn bind_named_literal(&mut self, node: NodeIndex, scope: ScopeId) {
        let arena = self.arena;
        match arena.kind(node) {
            Some(NodeKind::Function {
                name: Some(name),
                arrow: false,
                ..
            }) => self.tree.declare(scope, name, Definition::Function { node }),
            Some(NodeKind::Class {
                name: Some(name), ..
            }) => self.tree.declare(scope, name, Definition::Class { node }),
            _ => {}
        }
    }
}

/// Identifier nodes bound by a binding pattern, in source order.
pub fn collect_pattern_names(arena: &NodeArena, pattern: NodeIndex, out: &mut Vec<NodeIndex>) {
    let Some(kind) = arena.kind(pattern) else {
        return;
    };
    match kind {
        NodeKind::Identifier { .. } => out.push(pattern),
        NodeKind::ArrayPattern { elements } => {
            for &element in elements {
                collect_pattern_names(arena, element, out);
            }
        }
        NodeKind::ObjectPattern { properties } => {
            for &property in properties {
                match arena.kind(property) {
                    Some(NodeKind::Property { value, .. }) => {
                        collect_pattern_names(arena, *value, out)
                    }
                    Some(NodeKind::Rest { argument }) => collect_pattern_names(arena, *argument, out),
                    _ => {}
                }
            }
        }
        NodeKind::AssignmentPattern { left, .. } => collect_pattern_names(arena, *left, out),
        NodeKind::Rest { argument } => collect_pattern_names(arena, *argument, out),
        _ => {}
    }
}

/// Convenience wrapper around [`BinderState::bind_program`].
pub fn bind_program(arena: &NodeArena, program: NodeIndex) -> ScopeTree {
    BinderState::new(arena).bind_program(program)
}
