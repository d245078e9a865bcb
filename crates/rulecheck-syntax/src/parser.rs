//! Recursive-descent parser producing a `NodeArena`.
//!
//! Covers module-level declarations and the full expression grammar. Function
//! and class bodies are skipped by bracket matching and kept as opaque text.
//! In TypeScript mode type annotations, `as`/`satisfies`, non-null assertions
//! and type-only declarations are skipped.

use crate::ast::{
    DeclarationKind, ExportSpecifier, ImportKind, Literal, NodeArena, NodeIndex, NodeKind,
    PropertyKind,
};
use crate::scanner::{Token, TokenKind, tokenize};
use rulecheck_common::Span;
use thiserror::Error;
use tracing::trace;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span,
        }
    }
}

/// Whether a file name selects TypeScript syntax.
pub fn is_typescript_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    [".ts", ".mts", ".cts", ".tsx"]
        .iter()
        .any(|ext| lower.ends_with(ext))
        && !lower.ends_with(".d.ts")
}

pub struct ParserState {
    pub(crate) file_name: String,
    pub(crate) source: String,
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) arena: NodeArena,
    pub(crate) typescript: bool,
}

impl ParserState {
    pub fn new(file_name: String, source: String) -> ParserState {
        let typescript = is_typescript_file(&file_name);
        ParserState {
            file_name,
            source,
            tokens: Vec::new(),
            pos: 0,
            arena: NodeArena::new(),
            typescript,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source_text(&self) -> &str {
        &self.source
    }

    pub fn get_arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn into_arena(self) -> NodeArena {
        self.arena
    }

    /// Parse the source as a module and return the `Program` node.
    pub fn parse_source_file(&mut self) -> Result<NodeIndex, ParseError> {
        self.tokens = tokenize(&self.source)?;
        self.pos = 0;
        let mut body = Vec::new();
        while !self.at_eof() {
            body.push(self.parse_statement()?);
        }
        trace!(file = %self.file_name, nodes = self.arena.len(), "parsed source file");
        Ok(self.alloc(
            NodeKind::Program { body },
            Span::new(0, self.source.len() as u32),
        ))
    }

    /// Parse the whole source as a single expression.
    pub fn parse_expression_source(&mut self) -> Result<NodeIndex, ParseError> {
        self.tokens = tokenize(&self.source)?;
        self.pos = 0;
        let expr = self.parse_expression()?;
        if !self.at_eof() {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    pub(crate) fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len().saturating_sub(1) {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn is_punct(&self, text: &str) -> bool {
        self.peek().is_punct(text)
    }

    pub(crate) fn is_ident(&self, text: &str) -> bool {
        self.peek().is_ident(text)
    }

    pub(crate) fn eat_punct(&mut self, text: &str) -> bool {
        if self.is_punct(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_ident(&mut self, text: &str) -> bool {
        if self.is_ident(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_punct(&mut self, text: &str) -> Result<Span, ParseError> {
        if self.is_punct(text) {
            Ok(self.advance().span)
        } else {
            Err(self.error_here(format!("'{text}' expected")))
        }
    }

    pub(crate) fn expect_ident(&mut self, text: &str) -> Result<Span, ParseError> {
        if self.is_ident(text) {
            Ok(self.advance().span)
        } else {
            Err(self.error_here(format!("'{text}' expected")))
        }
    }

    /// Start offset of the current token.
    pub(crate) fn token_start(&self) -> u32 {
        self.peek().span.pos
    }

    /// End offset of the most recently consumed token.
    pub(crate) fn prev_end(&self) -> u32 {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    pub(crate) fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeIndex {
        self.arena.alloc(kind, span)
    }

    pub(crate) fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.peek().span)
    }

    pub(crate) fn unexpected(&self) -> ParseError {
        let token = self.peek();
        let message = match &token.kind {
            TokenKind::Eof => "Unexpected end of input".to_string(),
            _ => format!(
                "Unexpected token '{}'",
                Span::new(token.span.pos, token.span.end).text(&self.source)
            ),
        };
        ParseError::new(message, token.span)
    }

    /// Automatic semicolon insertion.
    pub(crate) fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat_punct(";") {
            return Ok(());
        }
        if self.is_punct("}") || self.at_eof() || self.peek().newline_before {
            return Ok(());
        }
        Err(self.error_here("';' expected"))
    }

    /// Skip a bracketed region starting at the current open bracket, returning
    /// the end offset of the matching close bracket.
    pub(crate) fn skip_balanced(&mut self) -> Result<u32, ParseError> {
        let start = self.peek().span;
        let mut depth = 0usize;
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]" | "}") => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(token.span.end);
                    }
                }
                TokenKind::Eof => return Err(ParseError::new("Unbalanced brackets", start)),
                _ => {}
            }
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub(crate) fn parse_statement(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        if self.eat_punct(";") {
            return Ok(self.alloc(NodeKind::Empty, self.span_from(start)));
        }
        if self.is_punct("{") {
            return self.parse_block();
        }
        if self.is_ident("import")
            && !self.peek_at(1).is_punct("(")
            && !self.peek_at(1).is_punct(".")
        {
            return self.parse_import_declaration();
        }
        if self.is_ident("export") {
            return self.parse_export_declaration();
        }
        if self.at_variable_declaration() {
            let decl = self.parse_variable_declaration()?;
            self.consume_semicolon()?;
            return Ok(decl);
        }
        if self.at_function_declaration() {
            return self.parse_function_declaration();
        }
        if self.is_ident("class") {
            return self.parse_class_declaration();
        }
        if self.typescript && self.at_type_only_declaration() {
            self.skip_type_only_declaration()?;
            return Ok(self.alloc(NodeKind::Empty, self.span_from(start)));
        }
        if let Some(keyword) = self.peek().ident()
            && matches!(
                keyword,
                "if" | "for"
                    | "while"
                    | "do"
                    | "switch"
                    | "try"
                    | "return"
                    | "throw"
                    | "break"
                    | "continue"
                    | "with"
                    | "debugger"
            )
        {
            return Err(self.error_here(format!("Unsupported statement '{keyword}'")));
        }

        let expression = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(self.alloc(
            NodeKind::ExpressionStatement { expression },
            self.span_from(start),
        ))
    }

    fn parse_block(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(self.error_here("'}' expected"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance();
        Ok(self.alloc(NodeKind::Block { body }, self.span_from(start)))
    }

    fn at_variable_declaration(&self) -> bool {
        match self.peek().ident() {
            Some("const" | "var") => true,
            // `let` is only a keyword when a binding follows.
            Some("let") => {
                let next = self.peek_at(1);
                next.is_punct("[") || next.is_punct("{") || next.ident().is_some()
            }
            _ => false,
        }
    }

    fn at_function_declaration(&self) -> bool {
        self.is_ident("function")
            || (self.is_ident("async")
                && self.peek_at(1).is_ident("function")
                && !self.peek_at(1).newline_before)
    }

    fn at_type_only_declaration(&self) -> bool {
        let next = self.peek_at(1);
        match self.peek().ident() {
            Some("type" | "interface") => next.ident().is_some() && !next.newline_before,
            Some("declare") => !next.newline_before && next.ident().is_some(),
            Some("enum") => next.ident().is_some(),
            _ => false,
        }
    }

    fn skip_type_only_declaration(&mut self) -> Result<(), ParseError> {
        if self.eat_ident("declare") {
            // `declare const x: T;`, `declare module "m" { ... }`, ...
            while !self.is_punct(";") && !self.is_punct("{") && !self.at_eof() {
                self.advance();
                if self.peek().newline_before {
                    return Ok(());
                }
            }
            if self.is_punct("{") {
                self.skip_balanced()?;
            } else {
                self.eat_punct(";");
            }
            return Ok(());
        }
        if self.eat_ident("type") {
            self.advance();
            if self.is_punct("<") {
                self.skip_type_arguments()?;
            }
            self.expect_punct("=")?;
            self.skip_type()?;
            return self.consume_semicolon();
        }
        // interface / enum: skip up to and including the body.
        self.advance();
        while !self.is_punct("{") {
            if self.at_eof() {
                return Err(self.error_here("'{' expected"));
            }
            if self.is_punct("<") {
                self.skip_type_arguments()?;
            } else {
                self.advance();
            }
        }
        self.skip_balanced()?;
        Ok(())
    }

    pub(crate) fn parse_variable_declaration(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let kind = match self.advance().ident() {
            Some("const") => DeclarationKind::Const,
            Some("let") => DeclarationKind::Let,
            _ => DeclarationKind::Var,
        };
        let mut declarations = Vec::new();
        loop {
            let decl_start = self.token_start();
            let id = self.parse_binding_target()?;
            if self.typescript {
                self.eat_punct("!");
                if self.eat_punct(":") {
                    self.skip_type()?;
                }
            }
            let init = if self.eat_punct("=") {
                self.parse_assignment()?
            } else {
                NodeIndex::NONE
            };
            declarations.push(self.alloc(
                NodeKind::VariableDeclarator { id, init },
                self.span_from(decl_start),
            ));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(self.alloc(
            NodeKind::VariableDeclaration { kind, declarations },
            self.span_from(start),
        ))
    }

    fn parse_function_declaration(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let function = self.parse_function_literal()?;
        let Some(NodeKind::Function {
            name: Some(name), ..
        }) = self.arena.kind(function)
        else {
            return Err(ParseError::new(
                "Function declaration requires a name",
                self.span_from(start),
            ));
        };
        let name = name.clone();
        Ok(self.alloc(
            NodeKind::FunctionDeclaration { name, function },
            self.span_from(start),
        ))
    }

    fn parse_class_declaration(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let class = self.parse_class_literal()?;
        let Some(NodeKind::Class {
            name: Some(name), ..
        }) = self.arena.kind(class)
        else {
            return Err(ParseError::new(
                "Class declaration requires a name",
                self.span_from(start),
            ));
        };
        let name = name.clone();
        Ok(self.alloc(
            NodeKind::ClassDeclaration { name, class },
            self.span_from(start),
        ))
    }

    // =========================================================================
    // Modules
    // =========================================================================

    fn parse_module_specifier(&mut self) -> Result<String, ParseError> {
        match self.advance().kind {
            TokenKind::String(source) => {
                self.skip_import_attributes()?;
                Ok(source)
            }
            _ => Err(ParseError::new(
                "Module specifier expected",
                self.tokens[self.pos.saturating_sub(1)].span,
            )),
        }
    }

    /// `with { type: "json" }` / `assert { ... }`
    fn skip_import_attributes(&mut self) -> Result<(), ParseError> {
        if (self.is_ident("with") || self.is_ident("assert"))
            && self.peek_at(1).is_punct("{")
            && !self.peek().newline_before
        {
            self.advance();
            self.skip_balanced()?;
        }
        Ok(())
    }

    /// Name in an import/export clause: identifier, keyword or string.
    fn parse_module_export_name(&mut self) -> Result<String, ParseError> {
        match self.advance().kind {
            TokenKind::Identifier(name) | TokenKind::String(name) => Ok(name),
            _ => Err(ParseError::new(
                "Identifier expected",
                self.tokens[self.pos.saturating_sub(1)].span,
            )),
        }
    }

    fn parse_binding_identifier_name(&mut self) -> Result<String, ParseError> {
        match self.peek().kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here("Identifier expected")),
        }
    }

    fn parse_import_declaration(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_ident("import")?;

        // `import type { T } from "m"` has no runtime bindings.
        if self.typescript
            && self.is_ident("type")
            && !self.peek_at(1).is_ident("from")
            && !self.peek_at(1).is_punct(",")
        {
            while !self.at_eof() && !matches!(self.peek().kind, TokenKind::String(_)) {
                self.advance();
            }
            self.parse_module_specifier()?;
            self.consume_semicolon()?;
            return Ok(self.alloc(NodeKind::Empty, self.span_from(start)));
        }

        if let TokenKind::String(_) = self.peek().kind {
            let source = self.parse_module_specifier()?;
            self.consume_semicolon()?;
            return Ok(self.alloc(
                NodeKind::ImportDeclaration {
                    specifiers: Vec::new(),
                    source,
                },
                self.span_from(start),
            ));
        }

        let mut specifiers = Vec::new();
        if self.peek().ident().is_some() && !self.is_punct("{") {
            let spec_start = self.token_start();
            let local = self.parse_binding_identifier_name()?;
            specifiers.push(self.alloc(
                NodeKind::ImportSpecifier {
                    kind: ImportKind::Default,
                    local,
                },
                self.span_from(spec_start),
            ));
            self.eat_punct(",");
        }
        if self.is_punct("*") {
            let spec_start = self.token_start();
            self.advance();
            self.expect_ident("as")?;
            let local = self.parse_binding_identifier_name()?;
            specifiers.push(self.alloc(
                NodeKind::ImportSpecifier {
                    kind: ImportKind::Namespace,
                    local,
                },
                self.span_from(spec_start),
            ));
        } else if self.eat_punct("{") {
            while !self.eat_punct("}") {
                let spec_start = self.token_start();
                let type_only = self.typescript
                    && self.is_ident("type")
                    && self.peek_at(1).ident().is_some()
                    && !self.peek_at(1).is_ident("as");
                if type_only {
                    self.advance();
                }
                let imported = self.parse_module_export_name()?;
                let local = if self.eat_ident("as") {
                    self.parse_binding_identifier_name()?
                } else {
                    imported.clone()
                };
                if !type_only {
                    let kind = if imported == "default" {
                        ImportKind::Default
                    } else {
                        ImportKind::Named(imported)
                    };
                    specifiers.push(self.alloc(
                        NodeKind::ImportSpecifier { kind, local },
                        self.span_from(spec_start),
                    ));
                }
                if !self.eat_punct(",") {
                    self.expect_punct("}")?;
                    break;
                }
            }
        }
        self.expect_ident("from")?;
        let source = self.parse_module_specifier()?;
        self.consume_semicolon()?;
        Ok(self.alloc(
            NodeKind::ImportDeclaration { specifiers, source },
            self.span_from(start),
        ))
    }

    fn parse_export_declaration(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_ident("export")?;

        if self.eat_ident("default") {
            let expression = if self.at_function_declaration() {
                self.parse_function_literal()?
            } else if self.is_ident("class") {
                self.parse_class_literal()?
            } else {
                let expr = self.parse_assignment()?;
                self.consume_semicolon()?;
                expr
            };
            return Ok(self.alloc(
                NodeKind::ExportDefault { expression },
                self.span_from(start),
            ));
        }

        if self.eat_punct("*") {
            let exported = if self.eat_ident("as") {
                Some(self.parse_module_export_name()?)
            } else {
                None
            };
            self.expect_ident("from")?;
            let source = self.parse_module_specifier()?;
            self.consume_semicolon()?;
            return Ok(self.alloc(
                NodeKind::ExportAll { exported, source },
                self.span_from(start),
            ));
        }

        if self.typescript && self.is_ident("type") && self.peek_at(1).is_punct("{") {
            self.advance();
            self.skip_balanced()?;
            if self.eat_ident("from") {
                self.parse_module_specifier()?;
            }
            self.consume_semicolon()?;
            return Ok(self.alloc(NodeKind::Empty, self.span_from(start)));
        }

        if self.eat_punct("{") {
            let mut specifiers = Vec::new();
            while !self.eat_punct("}") {
                let local = self.parse_module_export_name()?;
                let exported = if self.eat_ident("as") {
                    self.parse_module_export_name()?
                } else {
                    local.clone()
                };
                specifiers.push(ExportSpecifier { local, exported });
                if !self.eat_punct(",") {
                    self.expect_punct("}")?;
                    break;
                }
            }
            let source = if self.eat_ident("from") {
                Some(self.parse_module_specifier()?)
            } else {
                None
            };
            self.consume_semicolon()?;
            return Ok(self.alloc(
                NodeKind::ExportNamed {
                    declaration: NodeIndex::NONE,
                    specifiers,
                    source,
                },
                self.span_from(start),
            ));
        }

        if self.typescript && self.at_type_only_declaration() {
            self.skip_type_only_declaration()?;
            return Ok(self.alloc(NodeKind::Empty, self.span_from(start)));
        }

        let declaration = if self.at_variable_declaration() {
            let decl = self.parse_variable_declaration()?;
            self.consume_semicolon()?;
            decl
        } else if self.at_function_declaration() {
            self.parse_function_declaration()?
        } else if self.is_ident("class") {
            self.parse_class_declaration()?
        } else {
            return Err(self.unexpected());
        };
        Ok(self.alloc(
            NodeKind::ExportNamed {
                declaration,
                specifiers: Vec::new(),
                source: None,
            },
            self.span_from(start),
        ))
    }

    // =========================================================================
    // Binding patterns
    // =========================================================================

    pub(crate) fn parse_binding_target(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        if self.is_punct("[") {
            return self.parse_array_pattern();
        }
        if self.is_punct("{") {
            return self.parse_object_pattern();
        }
        let name = self.parse_binding_identifier_name()?;
        Ok(self.alloc(NodeKind::Identifier { name }, self.span_from(start)))
    }

    fn parse_binding_element(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let target = self.parse_binding_target()?;
        if self.eat_punct("=") {
            let right = self.parse_assignment()?;
            return Ok(self.alloc(
                NodeKind::AssignmentPattern {
                    left: target,
                    right,
                },
                self.span_from(start),
            ));
        }
        Ok(target)
    }

    fn parse_array_pattern(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.eat_punct("]") {
            if self.eat_punct(",") {
                elements.push(NodeIndex::NONE);
                continue;
            }
            if self.is_punct("...") {
                let rest_start = self.token_start();
                self.advance();
                let argument = self.parse_binding_target()?;
                elements.push(self.alloc(NodeKind::Rest { argument }, self.span_from(rest_start)));
            } else {
                elements.push(self.parse_binding_element()?);
            }
            if !self.eat_punct(",") {
                self.expect_punct("]")?;
                break;
            }
        }
        Ok(self.alloc(NodeKind::ArrayPattern { elements }, self.span_from(start)))
    }

    fn parse_object_pattern(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.eat_punct("}") {
            let prop_start = self.token_start();
            if self.eat_punct("...") {
                let argument = self.parse_binding_target()?;
                properties.push(self.alloc(NodeKind::Rest { argument }, self.span_from(prop_start)));
            } else {
                let (key, computed) = self.parse_property_key()?;
                let (value, shorthand) = if self.eat_punct(":") {
                    (self.parse_binding_element()?, false)
                } else {
                    let Some(name) = self.arena.identifier_name(key).map(str::to_string) else {
                        return Err(self.error_here("':' expected"));
                    };
                    if computed {
                        return Err(self.error_here("':' expected"));
                    }
                    let ident = self.alloc(NodeKind::Identifier { name }, self.arena.span(key));
                    let value = if self.eat_punct("=") {
                        let right = self.parse_assignment()?;
                        self.alloc(
                            NodeKind::AssignmentPattern { left: ident, right },
                            self.span_from(prop_start),
                        )
                    } else {
                        ident
                    };
                    (value, true)
                };
                properties.push(self.alloc(
                    NodeKind::Property {
                        key,
                        value,
                        computed,
                        shorthand,
                        method: false,
                        kind: PropertyKind::Init,
                    },
                    self.span_from(prop_start),
                ));
            }
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(self.alloc(NodeKind::ObjectPattern { properties }, self.span_from(start)))
    }

    /// Property name in an object literal or pattern. Returns the key node and
    /// whether it was computed.
    pub(crate) fn parse_property_key(&mut self) -> Result<(NodeIndex, bool), ParseError> {
        let start = self.token_start();
        let token = self.advance();
        let kind = match token.kind {
            TokenKind::Identifier(name) => NodeKind::Identifier { name },
            TokenKind::String(value) => NodeKind::Literal(Literal::String(value)),
            TokenKind::Number(value) => NodeKind::Literal(Literal::Number(value)),
            TokenKind::BigInt(value) => NodeKind::Literal(Literal::BigInt(value)),
            TokenKind::PrivateName(name) => NodeKind::Identifier {
                name: format!("#{name}"),
            },
            TokenKind::Punct("[") => {
                let key = self.parse_assignment()?;
                self.expect_punct("]")?;
                return Ok((key, true));
            }
            _ => {
                return Err(ParseError::new("Property name expected", token.span));
            }
        };
        Ok((self.alloc(kind, self.span_from(start)), false))
    }

    // =========================================================================
    // TypeScript type skipping
    // =========================================================================

    /// Skip `<...>`, counting `>>` and `>>>` as several closers.
    pub(crate) fn skip_type_arguments(&mut self) -> Result<(), ParseError> {
        let start = self.peek().span;
        let mut depth: i32 = 0;
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Punct("<") => depth += 1,
                TokenKind::Punct(">") => depth -= 1,
                TokenKind::Punct(">>") => depth -= 2,
                TokenKind::Punct(">>>") => depth -= 3,
                TokenKind::Punct("=>") => {}
                TokenKind::Punct("(" | "[" | "{") => {
                    self.pos -= 1;
                    self.skip_balanced()?;
                }
                TokenKind::Punct(";") | TokenKind::Eof => {
                    return Err(ParseError::new("'>' expected", start));
                }
                _ => {}
            }
            if depth <= 0 {
                return Ok(());
            }
        }
    }

    /// Skip one type expression.
    pub(crate) fn skip_type(&mut self) -> Result<(), ParseError> {
        // Leading `|` / `&` in multi-line unions.
        if self.is_punct("|") || self.is_punct("&") {
            self.advance();
        }
        loop {
            while matches!(self.peek().ident(), Some("keyof" | "typeof" | "readonly" | "unique"))
                && matches!(
                    self.peek_at(1).kind,
                    TokenKind::Identifier(_) | TokenKind::Punct("(" | "[" | "{")
                )
            {
                self.advance();
            }
            if self.is_punct("-") {
                self.advance();
            }
            match self.peek().kind.clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    if name == "new" && self.is_punct("(") {
                        self.skip_balanced()?;
                        self.expect_punct("=>")?;
                        continue;
                    }
                    while self.is_punct(".") {
                        self.advance();
                        self.advance();
                    }
                    if self.is_punct("<") {
                        self.skip_type_arguments()?;
                    }
                    // `x is T` predicates
                    if self.is_ident("is") && !self.peek().newline_before {
                        self.advance();
                        continue;
                    }
                }
                TokenKind::String(_)
                | TokenKind::Number(_)
                | TokenKind::BigInt(_)
                | TokenKind::Template(_) => {
                    self.advance();
                }
                TokenKind::Punct("(") => {
                    self.skip_balanced()?;
                    if self.eat_punct("=>") {
                        continue;
                    }
                }
                TokenKind::Punct("<") => {
                    // generic function type `<T>(x: T) => T`
                    self.skip_type_arguments()?;
                    continue;
                }
                TokenKind::Punct("[" | "{") => {
                    self.skip_balanced()?;
                }
                _ => return Err(self.error_here("Type expected")),
            }
            while self.is_punct("[") && !self.peek().newline_before {
                self.skip_balanced()?;
            }
            // conditional types
            if self.is_ident("extends") && !self.peek().newline_before {
                self.advance();
                continue;
            }
            if self.is_punct("?") && self.typescript_conditional_ahead() {
                self.advance();
                self.skip_type()?;
                self.expect_punct(":")?;
                continue;
            }
            if self.is_punct("|") || self.is_punct("&") {
                self.advance();
                continue;
            }
            return Ok(());
        }
    }

    /// `?` inside a type is a conditional type only when a matching `:` follows
    /// before the annotation ends.
    fn typescript_conditional_ahead(&self) -> bool {
        let mut depth = 0i32;
        let mut offset = 1;
        loop {
            let token = self.peek_at(offset);
            match token.kind {
                TokenKind::Punct("(" | "[" | "{" | "<") => depth += 1,
                TokenKind::Punct(")" | "]" | "}" | ">") => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                TokenKind::Punct(":") if depth == 0 => return true,
                TokenKind::Punct(";" | "=" | ",") if depth == 0 => return false,
                TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
    }
}
