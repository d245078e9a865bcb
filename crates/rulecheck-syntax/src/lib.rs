//! JavaScript/TypeScript front-end for rulecheck.
//!
//! This crate provides:
//! - `ScannerState` / `tokenize` - Tokenizer with template and regex handling
//! - `ParserState` - Recursive-descent parser into an arena AST
//! - `NodeArena`, `NodeIndex`, `NodeKind` - The AST itself
//! - `ScopeTree` / `bind_program` - Module and block scopes
//! - `Printer` - AST back to source text

pub mod ast;
pub mod binder;
pub mod numeric;
pub mod parser;
mod parser_expressions;
pub mod printer;
pub mod scanner;

pub use ast::{
    AssignmentOperator, BinaryOperator, DeclarationKind, ExportSpecifier, ImportKind, Literal,
    LogicalOperator, Node, NodeArena, NodeIndex, NodeKind, PropertyKind, TemplateElement,
    UnaryOperator, UpdateOperator,
};
pub use binder::{Definition, ScopeId, ScopeKind, ScopeTree, Variable, bind_program};
pub use parser::{ParseError, ParserState, is_typescript_file};
pub use printer::{Printer, print_literal, print_node, quote_string};

/// A parsed and bound source file.
#[derive(Debug)]
pub struct ParsedModule {
    pub file_name: String,
    pub source: String,
    pub arena: NodeArena,
    pub root: NodeIndex,
    pub scopes: ScopeTree,
}

impl ParsedModule {
    pub fn parse(file_name: impl Into<String>, source: impl Into<String>) -> Result<Self, ParseError> {
        let file_name = file_name.into();
        let source = source.into();
        let mut parser = ParserState::new(file_name.clone(), source.clone());
        let root = parser.parse_source_file()?;
        let arena = parser.into_arena();
        let scopes = bind_program(&arena, root);
        Ok(ParsedModule {
            file_name,
            source,
            arena,
            root,
            scopes,
        })
    }

    /// Top-level statements of the module.
    pub fn statements(&self) -> &[NodeIndex] {
        match self.arena.kind(self.root) {
            Some(NodeKind::Program { body }) => body,
            _ => &[],
        }
    }
}
