//! Prints arena nodes back to compact JavaScript source.
//!
//! Parentheses are re-derived from operator precedence since the parser does
//! not keep parenthesized-expression nodes. Function and class literals print
//! their original text.

use crate::ast::{
    BinaryOperator, Literal, LogicalOperator, NodeArena, NodeIndex, NodeKind, PropertyKind,
};
use crate::numeric::format_number;

const PREC_SEQUENCE: u8 = 1;
const PREC_ASSIGNMENT: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_CALL: u8 = 17;
const PREC_PRIMARY: u8 = 18;

/// Quote a string as a single-quoted JavaScript string literal.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Source form of a literal value.
pub fn print_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Undefined => "undefined".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
        Literal::Number(n) => format_number(*n),
        Literal::BigInt(n) => format!("{n}n"),
        Literal::String(s) => quote_string(s),
        Literal::RegExp { pattern, flags } => format!("/{pattern}/{flags}"),
    }
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(crate::scanner::is_identifier_start)
        && chars.all(crate::scanner::is_identifier_part)
}

pub struct Printer<'a> {
    arena: &'a NodeArena,
}

impl<'a> Printer<'a> {
    pub fn new(arena: &'a NodeArena) -> Self {
        Printer { arena }
    }

    fn precedence(&self, idx: NodeIndex) -> u8 {
        let Some(kind) = self.arena.kind(idx) else {
            return PREC_PRIMARY;
        };
        match kind {
            NodeKind::Sequence { .. } => PREC_SEQUENCE,
            NodeKind::Assignment { .. }
            | NodeKind::Yield { .. }
            | NodeKind::AssignmentPattern { .. }
            | NodeKind::Function { arrow: true, .. } => PREC_ASSIGNMENT,
            NodeKind::Conditional { .. } => PREC_CONDITIONAL,
            NodeKind::Logical { operator, .. } => operator.precedence(),
            NodeKind::Binary { operator, .. } => operator.precedence(),
            NodeKind::Unary { .. } | NodeKind::Await { .. } => PREC_UNARY,
            NodeKind::Update { prefix: true, .. } => PREC_UNARY,
            NodeKind::Update { .. } => PREC_POSTFIX,
            NodeKind::Literal(Literal::Number(n)) if n.is_sign_negative() && !n.is_nan() => {
                PREC_UNARY
            }
            NodeKind::Call { .. }
            | NodeKind::New { .. }
            | NodeKind::Member { .. }
            | NodeKind::Chain { .. }
            | NodeKind::TaggedTemplate { .. }
            | NodeKind::ImportCall { .. } => PREC_CALL,
            _ => PREC_PRIMARY,
        }
    }

    fn wrap(&self, idx: NodeIndex, min: u8) -> String {
        let text = self.print(idx);
        if self.precedence(idx) < min {
            format!("({text})")
        } else {
            text
        }
    }

    fn list(&self, items: &[NodeIndex]) -> String {
        items
            .iter()
            .map(|&item| self.wrap(item, PREC_ASSIGNMENT))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn property_key(&self, key: NodeIndex, computed: bool) -> String {
        if computed {
            return format!("[{}]", self.wrap(key, PREC_ASSIGNMENT));
        }
        match self.arena.kind(key) {
            Some(NodeKind::Identifier { name }) => name.clone(),
            Some(NodeKind::Literal(Literal::String(s))) if is_identifier_name(s) => s.clone(),
            _ => self.print(key),
        }
    }

    fn logical_operand(&self, operator: LogicalOperator, operand: NodeIndex, min: u8) -> String {
        // `??` cannot be mixed with `||`/`&&` without parentheses.
        if let Some(NodeKind::Logical { operator: inner, .. }) = self.arena.kind(operand)
            && (operator == LogicalOperator::Nullish) != (*inner == LogicalOperator::Nullish)
        {
            return format!("({})", self.print(operand));
        }
        self.wrap(operand, min)
    }

    pub fn print(&self, idx: NodeIndex) -> String {
        let Some(kind) = self.arena.kind(idx) else {
            return String::new();
        };
        match kind {
            NodeKind::Program { body } => body
                .iter()
                .map(|&stmt| self.print(stmt))
                .collect::<Vec<_>>()
                .join("\n"),
            NodeKind::Block { body } => {
                let inner: Vec<String> = body.iter().map(|&stmt| self.print(stmt)).collect();
                format!("{{ {} }}", inner.join(" "))
            }
            NodeKind::Empty => ";".to_string(),
            NodeKind::ExpressionStatement { expression } => {
                format!("{};", self.print(*expression))
            }
            NodeKind::VariableDeclaration { kind, declarations } => {
                format!("{} {};", kind.as_str(), self.list(declarations))
            }
            NodeKind::VariableDeclarator { id, init } => {
                if init.is_none() {
                    self.print(*id)
                } else {
                    format!("{} = {}", self.print(*id), self.wrap(*init, PREC_ASSIGNMENT))
                }
            }
            NodeKind::FunctionDeclaration { function, .. } => self.print(*function),
            NodeKind::ClassDeclaration { class, .. } => self.print(*class),
            NodeKind::ImportDeclaration { source, .. } => {
                format!("import {};", quote_string(source))
            }
            NodeKind::ImportSpecifier { local, .. } => local.clone(),
            NodeKind::ExportNamed { declaration, .. } if declaration.is_some() => {
                format!("export {}", self.print(*declaration))
            }
            NodeKind::ExportNamed { specifiers, .. } => {
                let names: Vec<String> = specifiers
                    .iter()
                    .map(|s| {
                        if s.local == s.exported {
                            s.local.clone()
                        } else {
                            format!("{} as {}", s.local, s.exported)
                        }
                    })
                    .collect();
                format!("export {{ {} }};", names.join(", "))
            }
            NodeKind::ExportDefault { expression } => {
                format!("export default {};", self.wrap(*expression, PREC_ASSIGNMENT))
            }
            NodeKind::ExportAll { source, .. } => format!("export * from {};", quote_string(source)),

            NodeKind::Identifier { name } => name.clone(),
            NodeKind::Literal(literal) => print_literal(literal),
            NodeKind::Template {
                quasis,
                expressions,
            } => {
                let mut out = String::from("`");
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(&quasi.raw);
                    if let Some(&expr) = expressions.get(i) {
                        out.push_str("${");
                        out.push_str(&self.print(expr));
                        out.push('}');
                    }
                }
                out.push('`');
                out
            }
            NodeKind::TaggedTemplate { tag, quasi } => {
                format!("{}{}", self.wrap(*tag, PREC_CALL), self.print(*quasi))
            }
            NodeKind::Array { elements } | NodeKind::ArrayPattern { elements } => {
                let mut parts: Vec<String> = elements
                    .iter()
                    .map(|&element| {
                        if element.is_none() {
                            String::new()
                        } else {
                            self.wrap(element, PREC_ASSIGNMENT)
                        }
                    })
                    .collect();
                if elements.last().is_some_and(|e| e.is_none()) {
                    parts.push(String::new());
                }
                format!("[{}]", parts.join(", "))
            }
            NodeKind::Object { properties } | NodeKind::ObjectPattern { properties } => {
                if properties.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", self.list(properties))
                }
            }
            NodeKind::Property {
                key,
                value,
                computed,
                shorthand,
                method,
                kind,
            } => {
                if *method || *kind != PropertyKind::Init {
                    self.print(*value)
                } else if *shorthand {
                    self.print(*value)
                } else {
                    format!(
                        "{}: {}",
                        self.property_key(*key, *computed),
                        self.wrap(*value, PREC_ASSIGNMENT)
                    )
                }
            }
            NodeKind::Spread { argument } | NodeKind::Rest { argument } => {
                format!("...{}", self.wrap(*argument, PREC_ASSIGNMENT))
            }
            NodeKind::Unary { operator, argument } => {
                let arg = self.wrap(*argument, PREC_UNARY);
                if operator.is_keyword() {
                    format!("{} {}", operator.as_str(), arg)
                } else if arg.starts_with(operator.as_str()) {
                    format!("{} {}", operator.as_str(), arg)
                } else {
                    format!("{}{}", operator.as_str(), arg)
                }
            }
            NodeKind::Update {
                operator,
                prefix,
                argument,
            } => {
                if *prefix {
                    format!("{}{}", operator.as_str(), self.wrap(*argument, PREC_UNARY))
                } else {
                    format!("{}{}", self.wrap(*argument, PREC_POSTFIX), operator.as_str())
                }
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                let prec = operator.precedence();
                let (left_min, right_min) = if *operator == BinaryOperator::Exp {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                format!(
                    "{} {} {}",
                    self.wrap(*left, left_min),
                    operator.as_str(),
                    self.wrap(*right, right_min)
                )
            }
            NodeKind::Logical {
                operator,
                left,
                right,
            } => {
                let prec = operator.precedence();
                format!(
                    "{} {} {}",
                    self.logical_operand(*operator, *left, prec),
                    operator.as_str(),
                    self.logical_operand(*operator, *right, prec + 1)
                )
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => format!(
                "{} ? {} : {}",
                self.wrap(*test, PREC_CONDITIONAL + 1),
                self.wrap(*consequent, PREC_ASSIGNMENT),
                self.wrap(*alternate, PREC_ASSIGNMENT)
            ),
            NodeKind::Assignment {
                operator,
                target,
                value,
            } => format!(
                "{} {} {}",
                self.print(*target),
                operator.as_string(),
                self.wrap(*value, PREC_ASSIGNMENT)
            ),
            NodeKind::AssignmentPattern { left, right } => {
                format!("{} = {}", self.print(*left), self.wrap(*right, PREC_ASSIGNMENT))
            }
            NodeKind::Sequence { expressions } => self.list(expressions),
            NodeKind::Call {
                callee,
                arguments,
                optional,
            } => format!(
                "{}{}({})",
                self.wrap(*callee, PREC_CALL),
                if *optional { "?." } else { "" },
                self.list(arguments)
            ),
            NodeKind::New { callee, arguments } => format!(
                "new {}({})",
                self.wrap(*callee, PREC_PRIMARY),
                self.list(arguments)
            ),
            NodeKind::Member {
                object,
                property,
                computed,
                optional,
            } => {
                let object_text = match self.arena.literal(*object) {
                    Some(Literal::Number(_)) => format!("({})", self.print(*object)),
                    _ => self.wrap(*object, PREC_CALL),
                };
                match (*computed, *optional) {
                    (true, true) => format!("{object_text}?.[{}]", self.print(*property)),
                    (true, false) => format!("{object_text}[{}]", self.print(*property)),
                    (false, true) => format!("{object_text}?.{}", self.print(*property)),
                    (false, false) => format!("{object_text}.{}", self.print(*property)),
                }
            }
            NodeKind::Chain { expression } => self.print(*expression),
            NodeKind::This => "this".to_string(),
            NodeKind::Super => "super".to_string(),
            NodeKind::MetaProperty { meta, property } => format!("{meta}.{property}"),
            NodeKind::ImportCall { source } => {
                format!("import({})", self.wrap(*source, PREC_ASSIGNMENT))
            }
            NodeKind::Await { argument } => format!("await {}", self.wrap(*argument, PREC_UNARY)),
            NodeKind::Yield { argument, delegate } => {
                let star = if *delegate { "*" } else { "" };
                if argument.is_none() {
                    format!("yield{star}")
                } else {
                    format!("yield{star} {}", self.wrap(*argument, PREC_ASSIGNMENT))
                }
            }
            NodeKind::Function { text, .. } | NodeKind::Class { text, .. } => text.clone(),
        }
    }
}

/// Print the node at `idx` as JavaScript source.
pub fn print_node(arena: &NodeArena, idx: NodeIndex) -> String {
    Printer::new(arena).print(idx)
}
