//! Expression grammar for `ParserState`.

use crate::ast::{
    AssignmentOperator, BinaryOperator, Literal, LogicalOperator, NodeIndex, NodeKind,
    PropertyKind, TemplateElement, UnaryOperator, UpdateOperator,
};
use crate::parser::{ParseError, ParserState};
use crate::scanner::TokenKind;

/// Words that can never start an expression.
const STATEMENT_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "return", "switch", "case", "default", "break",
    "continue", "throw", "try", "catch", "finally", "var", "const", "export", "with", "debugger",
    "enum",
];

#[derive(Clone, Copy)]
enum InfixOperator {
    Binary(BinaryOperator),
    Logical(LogicalOperator),
}

impl InfixOperator {
    fn precedence(self) -> u8 {
        match self {
            InfixOperator::Binary(op) => op.precedence(),
            InfixOperator::Logical(op) => op.precedence(),
        }
    }
}

impl ParserState {
    pub(crate) fn parse_expression(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let first = self.parse_assignment()?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat_punct(",") {
            expressions.push(self.parse_assignment()?);
        }
        Ok(self.alloc(NodeKind::Sequence { expressions }, self.span_from(start)))
    }

    pub(crate) fn parse_assignment(&mut self) -> Result<NodeIndex, ParseError> {
        if self.arrow_ahead() {
            return self.parse_arrow_function();
        }
        if self.is_ident("yield") {
            return self.parse_yield();
        }
        let start = self.token_start();
        let target = self.parse_conditional()?;
        let operator = match self.peek().kind {
            TokenKind::Punct(p) => AssignmentOperator::from_token(p),
            _ => None,
        };
        let Some(operator) = operator else {
            return Ok(target);
        };
        self.advance();
        let value = self.parse_assignment()?;
        Ok(self.alloc(
            NodeKind::Assignment {
                operator,
                target,
                value,
            },
            self.span_from(start),
        ))
    }

    fn parse_yield(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.advance();
        let delegate = self.eat_punct("*");
        let ends_here = self.peek().newline_before
            || self.at_eof()
            || [")", "]", "}", ",", ";", ":"]
                .iter()
                .any(|p| self.is_punct(p));
        let argument = if ends_here && !delegate {
            NodeIndex::NONE
        } else {
            self.parse_assignment()?
        };
        Ok(self.alloc(
            NodeKind::Yield { argument, delegate },
            self.span_from(start),
        ))
    }

    fn parse_conditional(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let test = self.parse_binary(0)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect_punct(":")?;
        let alternate = self.parse_assignment()?;
        Ok(self.alloc(
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            },
            self.span_from(start),
        ))
    }

    fn current_infix_operator(&self) -> Option<InfixOperator> {
        match &self.peek().kind {
            TokenKind::Punct(p) => LogicalOperator::from_token(p)
                .map(InfixOperator::Logical)
                .or_else(|| BinaryOperator::from_token(p).map(InfixOperator::Binary)),
            TokenKind::Identifier(name) if name == "in" || name == "instanceof" => {
                BinaryOperator::from_token(name).map(InfixOperator::Binary)
            }
            _ => None,
        }
    }

    /// Precedence climbing over binary and logical operators.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let mut left = self.parse_unary()?;
        loop {
            if self.typescript
                && !self.peek().newline_before
                && (self.is_ident("as") || self.is_ident("satisfies"))
            {
                self.advance();
                if !self.eat_ident("const") {
                    self.skip_type()?;
                }
                continue;
            }
            let Some(operator) = self.current_infix_operator() else {
                break;
            };
            let precedence = operator.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = match operator {
                // right-associative
                InfixOperator::Binary(BinaryOperator::Exp) => self.parse_binary(precedence)?,
                _ => self.parse_binary(precedence + 1)?,
            };
            let kind = match operator {
                InfixOperator::Binary(operator) => NodeKind::Binary {
                    operator,
                    left,
                    right,
                },
                InfixOperator::Logical(operator) => NodeKind::Logical {
                    operator,
                    left,
                    right,
                },
            };
            left = self.alloc(kind, self.span_from(start));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let unary = match &self.peek().kind {
            TokenKind::Punct("!") => Some(UnaryOperator::Not),
            TokenKind::Punct("~") => Some(UnaryOperator::BitNot),
            TokenKind::Punct("+") => Some(UnaryOperator::Plus),
            TokenKind::Punct("-") => Some(UnaryOperator::Minus),
            TokenKind::Identifier(name) => match name.as_str() {
                "typeof" => Some(UnaryOperator::Typeof),
                "void" => Some(UnaryOperator::Void),
                "delete" => Some(UnaryOperator::Delete),
                _ => None,
            },
            _ => None,
        };
        if let Some(operator) = unary {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(self.alloc(
                NodeKind::Unary { operator, argument },
                self.span_from(start),
            ));
        }
        let update = if self.is_punct("++") {
            Some(UpdateOperator::Increment)
        } else if self.is_punct("--") {
            Some(UpdateOperator::Decrement)
        } else {
            None
        };
        if let Some(operator) = update {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(self.alloc(
                NodeKind::Update {
                    operator,
                    prefix: true,
                    argument,
                },
                self.span_from(start),
            ));
        }
        if self.is_ident("await") && !self.peek_at(1).is_punct("=>") {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(self.alloc(NodeKind::Await { argument }, self.span_from(start)));
        }
        // `<T>value` type assertion (not valid in .tsx)
        if self.typescript && self.is_punct("<") && !self.file_name.ends_with(".tsx") {
            self.skip_type_arguments()?;
            return self.parse_unary();
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let argument = self.parse_lhs()?;
        if self.peek().newline_before {
            return Ok(argument);
        }
        let operator = if self.is_punct("++") {
            UpdateOperator::Increment
        } else if self.is_punct("--") {
            UpdateOperator::Decrement
        } else {
            return Ok(argument);
        };
        self.advance();
        Ok(self.alloc(
            NodeKind::Update {
                operator,
                prefix: false,
                argument,
            },
            self.span_from(start),
        ))
    }

    fn parse_lhs(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let expr = if self.is_ident("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        self.parse_call_tail(start, expr, true)
    }

    fn parse_new(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_ident("new")?;
        if self.eat_punct(".") {
            self.expect_ident("target")?;
            return Ok(self.alloc(
                NodeKind::MetaProperty {
                    meta: "new".to_string(),
                    property: "target".to_string(),
                },
                self.span_from(start),
            ));
        }
        let callee_start = self.token_start();
        let callee = if self.is_ident("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let callee = self.parse_call_tail(callee_start, callee, false)?;
        if self.typescript && self.is_punct("<") {
            self.try_skip_call_type_arguments();
        }
        let arguments = if self.is_punct("(") {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(self.alloc(
            NodeKind::New { callee, arguments },
            self.span_from(start),
        ))
    }

    /// Skip `<T>` when it is followed by a call's `(`; otherwise leave the
    /// cursor untouched. Returns whether anything was skipped.
    fn try_skip_call_type_arguments(&mut self) -> bool {
        let save = self.pos;
        if self.skip_type_arguments().is_ok() && self.is_punct("(") {
            return true;
        }
        self.pos = save;
        false
    }

    /// Member accesses, calls, tagged templates and optional chains following
    /// `expr`. Calls are only consumed when `allow_call` is set (a `new` callee).
    fn parse_call_tail(
        &mut self,
        start: u32,
        mut expr: NodeIndex,
        allow_call: bool,
    ) -> Result<NodeIndex, ParseError> {
        let mut in_chain = false;
        loop {
            if self.eat_punct(".") {
                let property = self.parse_member_name()?;
                expr = self.alloc(
                    NodeKind::Member {
                        object: expr,
                        property,
                        computed: false,
                        optional: false,
                    },
                    self.span_from(start),
                );
            } else if self.is_punct("?.") {
                if !allow_call {
                    return Err(self.error_here("Invalid optional chain from new expression"));
                }
                self.advance();
                in_chain = true;
                if self.is_punct("(") {
                    let arguments = self.parse_arguments()?;
                    expr = self.alloc(
                        NodeKind::Call {
                            callee: expr,
                            arguments,
                            optional: true,
                        },
                        self.span_from(start),
                    );
                } else if self.eat_punct("[") {
                    let property = self.parse_expression()?;
                    self.expect_punct("]")?;
                    expr = self.alloc(
                        NodeKind::Member {
                            object: expr,
                            property,
                            computed: true,
                            optional: true,
                        },
                        self.span_from(start),
                    );
                } else {
                    let property = self.parse_member_name()?;
                    expr = self.alloc(
                        NodeKind::Member {
                            object: expr,
                            property,
                            computed: false,
                            optional: true,
                        },
                        self.span_from(start),
                    );
                }
            } else if self.eat_punct("[") {
                let property = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = self.alloc(
                    NodeKind::Member {
                        object: expr,
                        property,
                        computed: true,
                        optional: false,
                    },
                    self.span_from(start),
                );
            } else if allow_call && self.is_punct("(") {
                let arguments = self.parse_arguments()?;
                expr = self.alloc(
                    NodeKind::Call {
                        callee: expr,
                        arguments,
                        optional: false,
                    },
                    self.span_from(start),
                );
            } else if matches!(&self.peek().kind, TokenKind::Template(chunk) if chunk.head) {
                if in_chain {
                    return Err(self.error_here("Tagged template cannot be used in optional chain"));
                }
                let quasi = self.parse_template()?;
                expr = self.alloc(
                    NodeKind::TaggedTemplate { tag: expr, quasi },
                    self.span_from(start),
                );
            } else if self.typescript && self.is_punct("!") && !self.peek().newline_before {
                // non-null assertion
                self.advance();
            } else if self.typescript && allow_call && self.is_punct("<") {
                if !self.try_skip_call_type_arguments() {
                    break;
                }
            } else {
                break;
            }
        }
        if in_chain {
            expr = self.alloc(NodeKind::Chain { expression: expr }, self.span_from(start));
        }
        Ok(expr)
    }

    fn parse_member_name(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let name = match self.peek().kind.clone() {
            TokenKind::Identifier(name) => name,
            TokenKind::PrivateName(name) => format!("#{name}"),
            _ => return Err(self.error_here("Identifier expected")),
        };
        self.advance();
        Ok(self.alloc(NodeKind::Identifier { name }, self.span_from(start)))
    }

    fn parse_arguments(&mut self) -> Result<Vec<NodeIndex>, ParseError> {
        self.expect_punct("(")?;
        let mut arguments = Vec::new();
        while !self.eat_punct(")") {
            let start = self.token_start();
            if self.eat_punct("...") {
                let argument = self.parse_assignment()?;
                arguments.push(self.alloc(NodeKind::Spread { argument }, self.span_from(start)));
            } else {
                arguments.push(self.parse_assignment()?);
            }
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let token = self.peek().clone();
        let literal = match token.kind {
            TokenKind::Number(value) => Literal::Number(value),
            TokenKind::BigInt(value) => Literal::BigInt(value),
            TokenKind::String(value) => Literal::String(value),
            TokenKind::RegExp { pattern, flags } => Literal::RegExp { pattern, flags },
            TokenKind::Template(_) => return self.parse_template(),
            TokenKind::PrivateName(name) => {
                // `#field in object`
                self.advance();
                return Ok(self.alloc(
                    NodeKind::Identifier {
                        name: format!("#{name}"),
                    },
                    self.span_from(start),
                ));
            }
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(")")?;
                return Ok(expr);
            }
            TokenKind::Punct("[") => return self.parse_array_literal(),
            TokenKind::Punct("{") => return self.parse_object_literal(),
            TokenKind::Identifier(name) => match name.as_str() {
                "null" => Literal::Null,
                "true" => Literal::Bool(true),
                "false" => Literal::Bool(false),
                "this" => {
                    self.advance();
                    return Ok(self.alloc(NodeKind::This, self.span_from(start)));
                }
                "super" => {
                    self.advance();
                    return Ok(self.alloc(NodeKind::Super, self.span_from(start)));
                }
                "function" => return self.parse_function_literal(),
                "async"
                    if self.peek_at(1).is_ident("function") && !self.peek_at(1).newline_before =>
                {
                    return self.parse_function_literal();
                }
                "class" => return self.parse_class_literal(),
                "new" => return self.parse_new(),
                "import" => return self.parse_import_expression(),
                word if STATEMENT_KEYWORDS.contains(&word) => return Err(self.unexpected()),
                _ => {
                    self.advance();
                    let name = name.clone();
                    return Ok(self.alloc(NodeKind::Identifier { name }, self.span_from(start)));
                }
            },
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(self.alloc(NodeKind::Literal(literal), self.span_from(start)))
    }

    /// `import(specifier)` or `import.meta`.
    fn parse_import_expression(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_ident("import")?;
        if self.eat_punct(".") {
            self.expect_ident("meta")?;
            return Ok(self.alloc(
                NodeKind::MetaProperty {
                    meta: "import".to_string(),
                    property: "meta".to_string(),
                },
                self.span_from(start),
            ));
        }
        self.expect_punct("(")?;
        let source = self.parse_assignment()?;
        // import options argument is accepted and ignored
        if self.eat_punct(",") && !self.is_punct(")") {
            self.parse_assignment()?;
            self.eat_punct(",");
        }
        self.expect_punct(")")?;
        Ok(self.alloc(NodeKind::ImportCall { source }, self.span_from(start)))
    }

    fn parse_array_literal(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.eat_punct("]") {
            if self.eat_punct(",") {
                elements.push(NodeIndex::NONE);
                continue;
            }
            let element_start = self.token_start();
            if self.eat_punct("...") {
                let argument = self.parse_assignment()?;
                elements.push(self.alloc(
                    NodeKind::Spread { argument },
                    self.span_from(element_start),
                ));
            } else {
                elements.push(self.parse_assignment()?);
            }
            if !self.eat_punct(",") {
                self.expect_punct("]")?;
                break;
            }
        }
        Ok(self.alloc(NodeKind::Array { elements }, self.span_from(start)))
    }

    /// Whether the token at `offset` can begin a property key.
    fn property_key_at(&self, offset: usize) -> bool {
        let token = self.peek_at(offset);
        matches!(
            token.kind,
            TokenKind::Identifier(_)
                | TokenKind::String(_)
                | TokenKind::Number(_)
                | TokenKind::BigInt(_)
                | TokenKind::PrivateName(_)
                | TokenKind::Punct("[" | "*")
        )
    }

    fn parse_object_literal(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.eat_punct("}") {
            properties.push(self.parse_object_member()?);
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(self.alloc(NodeKind::Object { properties }, self.span_from(start)))
    }

    fn parse_object_member(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        if self.eat_punct("...") {
            let argument = self.parse_assignment()?;
            return Ok(self.alloc(NodeKind::Spread { argument }, self.span_from(start)));
        }

        let mut kind = PropertyKind::Init;
        let mut is_async = false;
        if (self.is_ident("get") || self.is_ident("set")) && self.property_key_at(1) {
            kind = if self.is_ident("get") {
                PropertyKind::Get
            } else {
                PropertyKind::Set
            };
            self.advance();
        } else if self.is_ident("async")
            && self.property_key_at(1)
            && !self.peek_at(1).newline_before
        {
            is_async = true;
            self.advance();
        }
        let generator = self.eat_punct("*");
        let (key, computed) = self.parse_property_key()?;

        let is_method = self.is_punct("(")
            || (self.typescript && self.is_punct("<"))
            || kind != PropertyKind::Init
            || is_async
            || generator;
        if is_method {
            if self.typescript && self.is_punct("<") {
                self.skip_type_arguments()?;
            }
            if !self.is_punct("(") {
                return Err(self.error_here("'(' expected"));
            }
            self.skip_balanced()?;
            if self.typescript && self.eat_punct(":") {
                self.skip_type()?;
            }
            if !self.is_punct("{") {
                return Err(self.error_here("'{' expected"));
            }
            self.skip_balanced()?;
            let span = self.span_from(start);
            let name = if computed {
                None
            } else {
                self.arena
                    .identifier_name(key)
                    .or_else(|| self.arena.string_literal(key))
                    .map(str::to_string)
            };
            let value = self.alloc(
                NodeKind::Function {
                    name,
                    arrow: false,
                    is_async,
                    generator,
                    text: span.text(&self.source).to_string(),
                },
                span,
            );
            return Ok(self.alloc(
                NodeKind::Property {
                    key,
                    value,
                    computed,
                    shorthand: false,
                    method: kind == PropertyKind::Init,
                    kind,
                },
                span,
            ));
        }

        if self.eat_punct(":") {
            let value = self.parse_assignment()?;
            return Ok(self.alloc(
                NodeKind::Property {
                    key,
                    value,
                    computed,
                    shorthand: false,
                    method: false,
                    kind,
                },
                self.span_from(start),
            ));
        }

        // Shorthand `{ a }`, or `{ a = 1 }` when the literal is later used as a pattern.
        let name = match self.arena.identifier_name(key) {
            Some(name) if !computed => name.to_string(),
            _ => return Err(self.error_here("':' expected")),
        };
        let ident = self.alloc(NodeKind::Identifier { name }, self.arena.span(key));
        let value = if self.eat_punct("=") {
            let right = self.parse_assignment()?;
            self.alloc(
                NodeKind::AssignmentPattern { left: ident, right },
                self.span_from(start),
            )
        } else {
            ident
        };
        Ok(self.alloc(
            NodeKind::Property {
                key,
                value,
                computed: false,
                shorthand: true,
                method: false,
                kind,
            },
            self.span_from(start),
        ))
    }

    pub(crate) fn parse_template(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let TokenKind::Template(first) = self.advance().kind else {
            return Err(ParseError::new("Template literal expected", self.span_from(start)));
        };
        let mut tail = first.tail;
        let mut quasis = vec![TemplateElement {
            cooked: first.cooked,
            raw: first.raw,
        }];
        let mut expressions = Vec::new();
        while !tail {
            expressions.push(self.parse_expression()?);
            match self.peek().kind.clone() {
                TokenKind::Template(chunk) if !chunk.head => {
                    self.advance();
                    tail = chunk.tail;
                    quasis.push(TemplateElement {
                        cooked: chunk.cooked,
                        raw: chunk.raw,
                    });
                }
                _ => return Err(self.error_here("'}' expected")),
            }
        }
        Ok(self.alloc(
            NodeKind::Template {
                quasis,
                expressions,
            },
            self.span_from(start),
        ))
    }

    // =========================================================================
    // Opaque function and class literals
    // =========================================================================

    /// Whether the upcoming tokens start an arrow function.
    fn arrow_ahead(&self) -> bool {
        let mut offset = 0;
        if self.is_ident("async") && !self.peek_at(1).newline_before {
            let next = self.peek_at(1);
            if next.ident().is_some() {
                return self.peek_at(2).is_punct("=>");
            }
            if !next.is_punct("(") {
                return self.peek_at(1).is_punct("=>");
            }
            offset = 1;
        }
        let token = self.peek_at(offset);
        if offset == 0 && token.ident().is_some() {
            let next = self.peek_at(1);
            return next.is_punct("=>") && !next.newline_before;
        }
        if !token.is_punct("(") {
            return false;
        }
        let Some(close) = self.matching_close(self.pos + offset) else {
            return false;
        };
        let after = self.peek_at(close + 1 - self.pos);
        if after.is_punct("=>") {
            return true;
        }
        self.typescript && after.is_punct(":") && self.arrow_after_return_type(close + 2)
    }

    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (idx, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]" | "}") => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    fn arrow_after_return_type(&self, from: usize) -> bool {
        let mut depth = 0i32;
        for token in self.tokens.iter().skip(from) {
            match token.kind {
                TokenKind::Punct("(" | "[" | "{" | "<") => depth += 1,
                TokenKind::Punct(")" | "]" | "}" | ">") => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                TokenKind::Punct("=>") if depth == 0 => return true,
                TokenKind::Punct(";" | ",") if depth == 0 => return false,
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_arrow_function(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let is_async = self.is_ident("async") && !self.peek_at(1).is_punct("=>");
        if is_async {
            self.advance();
        }
        if self.is_punct("(") {
            self.skip_balanced()?;
        } else {
            self.advance();
        }
        if self.typescript && self.eat_punct(":") {
            self.skip_type()?;
        }
        self.expect_punct("=>")?;
        if self.is_punct("{") {
            self.skip_balanced()?;
        } else {
            // Expression body; parsed for its extent only.
            self.parse_assignment()?;
        }
        let span = self.span_from(start);
        Ok(self.alloc(
            NodeKind::Function {
                name: None,
                arrow: true,
                is_async,
                generator: false,
                text: span.text(&self.source).to_string(),
            },
            span,
        ))
    }

    pub(crate) fn parse_function_literal(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        let is_async = self.eat_ident("async");
        self.expect_ident("function")?;
        let generator = self.eat_punct("*");
        let name = self.peek().ident().map(str::to_string);
        if name.is_some() {
            self.advance();
        }
        if self.typescript && self.is_punct("<") {
            self.skip_type_arguments()?;
        }
        if !self.is_punct("(") {
            return Err(self.error_here("'(' expected"));
        }
        self.skip_balanced()?;
        if self.typescript && self.eat_punct(":") {
            self.skip_type()?;
        }
        if !self.is_punct("{") {
            return Err(self.error_here("'{' expected"));
        }
        self.skip_balanced()?;
        let span = self.span_from(start);
        Ok(self.alloc(
            NodeKind::Function {
                name,
                arrow: false,
                is_async,
                generator,
                text: span.text(&self.source).to_string(),
            },
            span,
        ))
    }

    pub(crate) fn parse_class_literal(&mut self) -> Result<NodeIndex, ParseError> {
        let start = self.token_start();
        self.expect_ident("class")?;
        let name = match self.peek().ident() {
            Some("extends" | "implements") | None => None,
            Some(name) => Some(name.to_string()),
        };
        if name.is_some() {
            self.advance();
        }
        while !self.is_punct("{") {
            if self.at_eof() {
                return Err(self.error_here("'{' expected"));
            }
            if self.is_punct("(") || self.is_punct("[") {
                self.skip_balanced()?;
            } else if self.typescript && self.is_punct("<") {
                self.skip_type_arguments()?;
            } else {
                self.advance();
            }
        }
        self.skip_balanced()?;
        let span = self.span_from(start);
        Ok(self.alloc(
            NodeKind::Class {
                name,
                text: span.text(&self.source).to_string(),
            },
            span,
        ))
    }
}
