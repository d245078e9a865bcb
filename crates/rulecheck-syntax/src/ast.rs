//! Arena-allocated AST for the JavaScript subset rulecheck understands.
//!
//! Nodes are appended to a `NodeArena` bottom-up and never mutated afterwards.
//! Everything that needs node identity (memo caches, cycle detection) keys on
//! `NodeIndex`. Transformations produce new nodes in another arena and copy
//! untouched subtrees across with [`NodeArena::copy_subtree`].

use rulecheck_common::Span;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Index of a node inside its `NodeArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// Sentinel for an absent optional child (array hole, missing initializer, ...).
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != Self::NONE
    }
}

// =============================================================================
// Literals and operators
// =============================================================================

/// Literal-equivalent values.
///
/// `Undefined` and non-finite numbers never come out of the parser; the static
/// evaluator synthesizes them so that `undefined`, `NaN` and `Infinity` still
/// fold through arithmetic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    RegExp { pattern: String, flags: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

impl UnaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
            UnaryOperator::Typeof => "typeof",
            UnaryOperator::Void => "void",
            UnaryOperator::Delete => "delete",
        }
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            UnaryOperator::Typeof | UnaryOperator::Void | UnaryOperator::Delete
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateOperator {
    Increment,
    Decrement,
}

impl UpdateOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOperator::Increment => "++",
            UpdateOperator::Decrement => "--",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    BitOr,
    BitXor,
    BitAnd,
    In,
    Instanceof,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::StrictEq => "===",
            BinaryOperator::StrictNotEq => "!==",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::UShr => ">>>",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Exp => "**",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::In => "in",
            BinaryOperator::Instanceof => "instanceof",
        }
    }

    /// Map an operator token (punctuator or keyword text) to a binary operator.
    pub fn from_token(text: &str) -> Option<Self> {
        Some(match text {
            "==" => BinaryOperator::Eq,
            "!=" => BinaryOperator::NotEq,
            "===" => BinaryOperator::StrictEq,
            "!==" => BinaryOperator::StrictNotEq,
            "<" => BinaryOperator::Lt,
            "<=" => BinaryOperator::LtEq,
            ">" => BinaryOperator::Gt,
            ">=" => BinaryOperator::GtEq,
            "<<" => BinaryOperator::Shl,
            ">>" => BinaryOperator::Shr,
            ">>>" => BinaryOperator::UShr,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Sub,
            "*" => BinaryOperator::Mul,
            "/" => BinaryOperator::Div,
            "%" => BinaryOperator::Rem,
            "**" => BinaryOperator::Exp,
            "|" => BinaryOperator::BitOr,
            "^" => BinaryOperator::BitXor,
            "&" => BinaryOperator::BitAnd,
            "in" => BinaryOperator::In,
            "instanceof" => BinaryOperator::Instanceof,
            _ => return None,
        })
    }

    /// Binding power, higher binds tighter. Shares the scale of
    /// [`LogicalOperator::precedence`].
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::BitOr => 6,
            BinaryOperator::BitXor => 7,
            BinaryOperator::BitAnd => 8,
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::StrictEq
            | BinaryOperator::StrictNotEq => 9,
            BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
            | BinaryOperator::In
            | BinaryOperator::Instanceof => 10,
            BinaryOperator::Shl | BinaryOperator::Shr | BinaryOperator::UShr => 11,
            BinaryOperator::Add | BinaryOperator::Sub => 12,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Rem => 13,
            BinaryOperator::Exp => 14,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    Or,
    And,
    Nullish,
}

impl LogicalOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::Or => "||",
            LogicalOperator::And => "&&",
            LogicalOperator::Nullish => "??",
        }
    }

    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "||" => Some(LogicalOperator::Or),
            "&&" => Some(LogicalOperator::And),
            "??" => Some(LogicalOperator::Nullish),
            _ => None,
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            LogicalOperator::Nullish | LogicalOperator::Or => 4,
            LogicalOperator::And => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentOperator {
    Assign,
    Compound(BinaryOperator),
    Logical(LogicalOperator),
}

impl AssignmentOperator {
    pub fn from_token(text: &str) -> Option<Self> {
        if text == "=" {
            return Some(AssignmentOperator::Assign);
        }
        let op = text.strip_suffix('=')?;
        if let Some(logical) = LogicalOperator::from_token(op) {
            return Some(AssignmentOperator::Logical(logical));
        }
        match BinaryOperator::from_token(op)? {
            // `==`, `<=`, ... are comparisons, not compound assignments
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::StrictEq
            | BinaryOperator::StrictNotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
            | BinaryOperator::In
            | BinaryOperator::Instanceof => None,
            other => Some(AssignmentOperator::Compound(other)),
        }
    }

    pub fn as_string(self) -> String {
        match self {
            AssignmentOperator::Assign => "=".to_string(),
            AssignmentOperator::Compound(op) => format!("{}=", op.as_str()),
            AssignmentOperator::Logical(op) => format!("{}=", op.as_str()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationKind {
    Const,
    Let,
    Var,
}

impl DeclarationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclarationKind::Const => "const",
            DeclarationKind::Let => "let",
            DeclarationKind::Var => "var",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Init,
    Get,
    Set,
}

/// How an import specifier binds its local name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import local from "m"`
    Default,
    /// `import * as local from "m"`
    Namespace,
    /// `import { imported as local } from "m"`
    Named(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateElement {
    /// `None` when the chunk contains an invalid escape (allowed in tagged templates).
    pub cooked: Option<String>,
    pub raw: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    // Module and statements
    Program {
        body: Vec<NodeIndex>,
    },
    VariableDeclaration {
        kind: DeclarationKind,
        declarations: Vec<NodeIndex>,
    },
    VariableDeclarator {
        id: NodeIndex,
        init: NodeIndex,
    },
    ImportDeclaration {
        specifiers: Vec<NodeIndex>,
        source: String,
    },
    ImportSpecifier {
        kind: ImportKind,
        local: String,
    },
    ExportNamed {
        declaration: NodeIndex,
        specifiers: Vec<ExportSpecifier>,
        source: Option<String>,
    },
    ExportDefault {
        expression: NodeIndex,
    },
    ExportAll {
        exported: Option<String>,
        source: String,
    },
    FunctionDeclaration {
        name: String,
        function: NodeIndex,
    },
    ClassDeclaration {
        name: String,
        class: NodeIndex,
    },
    ExpressionStatement {
        expression: NodeIndex,
    },
    Block {
        body: Vec<NodeIndex>,
    },
    Empty,

    // Expressions
    Identifier {
        name: String,
    },
    Literal(Literal),
    Template {
        quasis: Vec<TemplateElement>,
        expressions: Vec<NodeIndex>,
    },
    TaggedTemplate {
        tag: NodeIndex,
        quasi: NodeIndex,
    },
    /// `NodeIndex::NONE` elements are holes.
    Array {
        elements: Vec<NodeIndex>,
    },
    Object {
        properties: Vec<NodeIndex>,
    },
    Property {
        key: NodeIndex,
        value: NodeIndex,
        computed: bool,
        shorthand: bool,
        method: bool,
        kind: PropertyKind,
    },
    Spread {
        argument: NodeIndex,
    },
    Unary {
        operator: UnaryOperator,
        argument: NodeIndex,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        argument: NodeIndex,
    },
    Binary {
        operator: BinaryOperator,
        left: NodeIndex,
        right: NodeIndex,
    },
    Logical {
        operator: LogicalOperator,
        left: NodeIndex,
        right: NodeIndex,
    },
    Conditional {
        test: NodeIndex,
        consequent: NodeIndex,
        alternate: NodeIndex,
    },
    Assignment {
        operator: AssignmentOperator,
        target: NodeIndex,
        value: NodeIndex,
    },
    Sequence {
        expressions: Vec<NodeIndex>,
    },
    Call {
        callee: NodeIndex,
        arguments: Vec<NodeIndex>,
        optional: bool,
    },
    New {
        callee: NodeIndex,
        arguments: Vec<NodeIndex>,
    },
    Member {
        object: NodeIndex,
        property: NodeIndex,
        computed: bool,
        optional: bool,
    },
    /// Wraps an optional chain (`a?.b.c`).
    Chain {
        expression: NodeIndex,
    },
    This,
    Super,
    MetaProperty {
        meta: String,
        property: String,
    },
    ImportCall {
        source: NodeIndex,
    },
    Await {
        argument: NodeIndex,
    },
    Yield {
        argument: NodeIndex,
        delegate: bool,
    },
    /// Function, arrow or method literal. Bodies are never analysed; the
    /// source text is kept so the node can be printed and copied.
    Function {
        name: Option<String>,
        arrow: bool,
        is_async: bool,
        generator: bool,
        text: String,
    },
    Class {
        name: Option<String>,
        text: String,
    },

    // Binding patterns
    ArrayPattern {
        elements: Vec<NodeIndex>,
    },
    ObjectPattern {
        properties: Vec<NodeIndex>,
    },
    AssignmentPattern {
        left: NodeIndex,
        right: NodeIndex,
    },
    Rest {
        argument: NodeIndex,
    },
}

impl NodeKind {
    /// Short name of the node kind, as used in logs and visitor dispatch.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::VariableDeclarator { .. } => "VariableDeclarator",
            NodeKind::ImportDeclaration { .. } => "ImportDeclaration",
            NodeKind::ImportSpecifier { .. } => "ImportSpecifier",
            NodeKind::ExportNamed { .. } => "ExportNamedDeclaration",
            NodeKind::ExportDefault { .. } => "ExportDefaultDeclaration",
            NodeKind::ExportAll { .. } => "ExportAllDeclaration",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::ClassDeclaration { .. } => "ClassDeclaration",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::Block { .. } => "BlockStatement",
            NodeKind::Empty => "EmptyStatement",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Literal(_) => "Literal",
            NodeKind::Template { .. } => "TemplateLiteral",
            NodeKind::TaggedTemplate { .. } => "TaggedTemplateExpression",
            NodeKind::Array { .. } => "ArrayExpression",
            NodeKind::Object { .. } => "ObjectExpression",
            NodeKind::Property { .. } => "Property",
            NodeKind::Spread { .. } => "SpreadElement",
            NodeKind::Unary { .. } => "UnaryExpression",
            NodeKind::Update { .. } => "UpdateExpression",
            NodeKind::Binary { .. } => "BinaryExpression",
            NodeKind::Logical { .. } => "LogicalExpression",
            NodeKind::Conditional { .. } => "ConditionalExpression",
            NodeKind::Assignment { .. } => "AssignmentExpression",
            NodeKind::Sequence { .. } => "SequenceExpression",
            NodeKind::Call { .. } => "CallExpression",
            NodeKind::New { .. } => "NewExpression",
            NodeKind::Member { .. } => "MemberExpression",
            NodeKind::Chain { .. } => "ChainExpression",
            NodeKind::This => "ThisExpression",
            NodeKind::Super => "Super",
            NodeKind::MetaProperty { .. } => "MetaProperty",
            NodeKind::ImportCall { .. } => "ImportExpression",
            NodeKind::Await { .. } => "AwaitExpression",
            NodeKind::Yield { .. } => "YieldExpression",
            NodeKind::Function { arrow: true, .. } => "ArrowFunctionExpression",
            NodeKind::Function { .. } => "FunctionExpression",
            NodeKind::Class { .. } => "ClassExpression",
            NodeKind::ArrayPattern { .. } => "ArrayPattern",
            NodeKind::ObjectPattern { .. } => "ObjectPattern",
            NodeKind::AssignmentPattern { .. } => "AssignmentPattern",
            NodeKind::Rest { .. } => "RestElement",
        }
    }

    /// Child node indices in source order. Absent optional children are skipped.
    pub fn children(&self) -> SmallVec<[NodeIndex; 4]> {
        let mut out: SmallVec<[NodeIndex; 4]> = SmallVec::new();
        let mut push = |idx: NodeIndex| {
            if idx.is_some() {
                out.push(idx);
            }
        };
        match self {
            NodeKind::Program { body } | NodeKind::Block { body } => {
                body.iter().copied().for_each(&mut push)
            }
            NodeKind::VariableDeclaration { declarations, .. } => {
                declarations.iter().copied().for_each(&mut push)
            }
            NodeKind::VariableDeclarator { id, init } => {
                push(*id);
                push(*init);
            }
            NodeKind::ImportDeclaration { specifiers, .. } => {
                specifiers.iter().copied().for_each(&mut push)
            }
            NodeKind::ExportNamed { declaration, .. } => push(*declaration),
            NodeKind::ExportDefault { expression } => push(*expression),
            NodeKind::FunctionDeclaration { function, .. } => push(*function),
            NodeKind::ClassDeclaration { class, .. } => push(*class),
            NodeKind::ExpressionStatement { expression } => push(*expression),
            NodeKind::Template { expressions, .. } => {
                expressions.iter().copied().for_each(&mut push)
            }
            NodeKind::TaggedTemplate { tag, quasi } => {
                push(*tag);
                push(*quasi);
            }
            NodeKind::Array { elements } | NodeKind::ArrayPattern { elements } => {
                elements.iter().copied().for_each(&mut push)
            }
            NodeKind::Object { properties } | NodeKind::ObjectPattern { properties } => {
                properties.iter().copied().for_each(&mut push)
            }
            NodeKind::Property {
                key,
                value,
                shorthand,
                ..
            } => {
                push(*key);
                if !*shorthand {
                    push(*value);
                }
            }
            NodeKind::Spread { argument }
            | NodeKind::Unary { argument, .. }
            | NodeKind::Update { argument, .. }
            | NodeKind::Await { argument }
            | NodeKind::Yield { argument, .. }
            | NodeKind::Rest { argument } => push(*argument),
            NodeKind::Binary { left, right, .. }
            | NodeKind::Logical { left, right, .. }
            | NodeKind::AssignmentPattern { left, right } => {
                push(*left);
                push(*right);
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                push(*test);
                push(*consequent);
                push(*alternate);
            }
            NodeKind::Assignment { target, value, .. } => {
                push(*target);
                push(*value);
            }
            NodeKind::Sequence { expressions } => expressions.iter().copied().for_each(&mut push),
            NodeKind::Call {
                callee, arguments, ..
            }
            | NodeKind::New { callee, arguments } => {
                push(*callee);
                arguments.iter().copied().for_each(&mut push);
            }
            NodeKind::Member {
                object, property, ..
            } => {
                push(*object);
                push(*property);
            }
            NodeKind::Chain { expression } => push(*expression),
            NodeKind::ImportCall { source } => push(*source),
            NodeKind::ImportSpecifier { .. }
            | NodeKind::ExportAll { .. }
            | NodeKind::Empty
            | NodeKind::Identifier { .. }
            | NodeKind::Literal(_)
            | NodeKind::This
            | NodeKind::Super
            | NodeKind::MetaProperty { .. }
            | NodeKind::Function { .. }
            | NodeKind::Class { .. } => {}
        }
        out
    }

    /// Clone this kind with every child index passed through `f`.
    /// `NodeIndex::NONE` children are preserved without calling `f`.
    pub fn map_children(&self, mut f: impl FnMut(NodeIndex) -> NodeIndex) -> NodeKind {
        let mut one = |idx: NodeIndex| if idx.is_none() { idx } else { f(idx) };
        macro_rules! list {
            ($v:expr) => {
                $v.iter().map(|&idx| one(idx)).collect::<Vec<_>>()
            };
        }
        match self {
            NodeKind::Program { body } => NodeKind::Program { body: list!(body) },
            NodeKind::Block { body } => NodeKind::Block { body: list!(body) },
            NodeKind::VariableDeclaration { kind, declarations } => {
                NodeKind::VariableDeclaration {
                    kind: *kind,
                    declarations: list!(declarations),
                }
            }
            NodeKind::VariableDeclarator { id, init } => NodeKind::VariableDeclarator {
                id: one(*id),
                init: one(*init),
            },
            NodeKind::ImportDeclaration { specifiers, source } => NodeKind::ImportDeclaration {
                specifiers: list!(specifiers),
                source: source.clone(),
            },
            NodeKind::ExportNamed {
                declaration,
                specifiers,
                source,
            } => NodeKind::ExportNamed {
                declaration: one(*declaration),
                specifiers: specifiers.clone(),
                source: source.clone(),
            },
            NodeKind::ExportDefault { expression } => NodeKind::ExportDefault {
                expression: one(*expression),
            },
            NodeKind::FunctionDeclaration { name, function } => NodeKind::FunctionDeclaration {
                name: name.clone(),
                function: one(*function),
            },
            NodeKind::ClassDeclaration { name, class } => NodeKind::ClassDeclaration {
                name: name.clone(),
                class: one(*class),
            },
            NodeKind::ExpressionStatement { expression } => NodeKind::ExpressionStatement {
                expression: one(*expression),
            },
            NodeKind::Template {
                quasis,
                expressions,
            } => NodeKind::Template {
                quasis: quasis.clone(),
                expressions: list!(expressions),
            },
            NodeKind::TaggedTemplate { tag, quasi } => NodeKind::TaggedTemplate {
                tag: one(*tag),
                quasi: one(*quasi),
            },
            NodeKind::Array { elements } => NodeKind::Array {
                elements: list!(elements),
            },
            NodeKind::ArrayPattern { elements } => NodeKind::ArrayPattern {
                elements: list!(elements),
            },
            NodeKind::Object { properties } => NodeKind::Object {
                properties: list!(properties),
            },
            NodeKind::ObjectPattern { properties } => NodeKind::ObjectPattern {
                properties: list!(properties),
            },
            NodeKind::Property {
                key,
                value,
                computed,
                shorthand,
                method,
                kind,
            } => NodeKind::Property {
                key: one(*key),
                value: one(*value),
                computed: *computed,
                shorthand: *shorthand,
                method: *method,
                kind: *kind,
            },
            NodeKind::Spread { argument } => NodeKind::Spread {
                argument: one(*argument),
            },
            NodeKind::Rest { argument } => NodeKind::Rest {
                argument: one(*argument),
            },
            NodeKind::Await { argument } => NodeKind::Await {
                argument: one(*argument),
            },
            NodeKind::Yield { argument, delegate } => NodeKind::Yield {
                argument: one(*argument),
                delegate: *delegate,
            },
            NodeKind::Unary { operator, argument } => NodeKind::Unary {
                operator: *operator,
                argument: one(*argument),
            },
            NodeKind::Update {
                operator,
                prefix,
                argument,
            } => NodeKind::Update {
                operator: *operator,
                prefix: *prefix,
                argument: one(*argument),
            },
            NodeKind::Binary {
                operator,
                left,
                right,
            } => NodeKind::Binary {
                operator: *operator,
                left: one(*left),
                right: one(*right),
            },
            NodeKind::Logical {
                operator,
                left,
                right,
            } => NodeKind::Logical {
                operator: *operator,
                left: one(*left),
                right: one(*right),
            },
            NodeKind::AssignmentPattern { left, right } => NodeKind::AssignmentPattern {
                left: one(*left),
                right: one(*right),
            },
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => NodeKind::Conditional {
                test: one(*test),
                consequent: one(*consequent),
                alternate: one(*alternate),
            },
            NodeKind::Assignment {
                operator,
                target,
                value,
            } => NodeKind::Assignment {
                operator: *operator,
                target: one(*target),
                value: one(*value),
            },
            NodeKind::Sequence { expressions } => NodeKind::Sequence {
                expressions: list!(expressions),
            },
            NodeKind::Call {
                callee,
                arguments,
                optional,
            } => NodeKind::Call {
                callee: one(*callee),
                arguments: list!(arguments),
                optional: *optional,
            },
            NodeKind::New { callee, arguments } => NodeKind::New {
                callee: one(*callee),
                arguments: list!(arguments),
            },
            NodeKind::Member {
                object,
                property,
                computed,
                optional,
            } => NodeKind::Member {
                object: one(*object),
                property: one(*property),
                computed: *computed,
                optional: *optional,
            },
            NodeKind::Chain { expression } => NodeKind::Chain {
                expression: one(*expression),
            },
            NodeKind::ImportCall { source } => NodeKind::ImportCall {
                source: one(*source),
            },
            leaf @ (NodeKind::ImportSpecifier { .. }
            | NodeKind::ExportAll { .. }
            | NodeKind::Empty
            | NodeKind::Identifier { .. }
            | NodeKind::Literal(_)
            | NodeKind::This
            | NodeKind::Super
            | NodeKind::MetaProperty { .. }
            | NodeKind::Function { .. }
            | NodeKind::Class { .. }) => leaf.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

// =============================================================================
// Arena
// =============================================================================

/// Append-only storage for AST nodes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> NodeArena {
        NodeArena::default()
    }

    pub fn with_capacity(capacity: usize) -> NodeArena {
        NodeArena {
            nodes: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a node. Children must already live in this arena.
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span });
        idx
    }

    #[inline]
    pub fn get(&self, idx: NodeIndex) -> Option<&Node> {
        self.nodes.get(idx.0 as usize)
    }

    #[inline]
    pub fn kind(&self, idx: NodeIndex) -> Option<&NodeKind> {
        self.get(idx).map(|node| &node.kind)
    }

    /// Span of a node; empty for `NONE` or out-of-range indices.
    #[inline]
    pub fn span(&self, idx: NodeIndex) -> Span {
        self.get(idx).map(|node| node.span).unwrap_or_default()
    }

    pub fn children(&self, idx: NodeIndex) -> SmallVec<[NodeIndex; 4]> {
        self.kind(idx).map(NodeKind::children).unwrap_or_default()
    }

    pub fn identifier_name(&self, idx: NodeIndex) -> Option<&str> {
        match self.kind(idx)? {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }

    pub fn literal(&self, idx: NodeIndex) -> Option<&Literal> {
        match self.kind(idx)? {
            NodeKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn string_literal(&self, idx: NodeIndex) -> Option<&str> {
        match self.literal(idx)? {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_literal(&self, idx: NodeIndex) -> bool {
        self.literal(idx).is_some()
    }

    /// Deep-copy the subtree rooted at `idx` in `from` into this arena.
    ///
    /// Subtrees shared inside `from` (a DAG produced by an evaluator) are
    /// copied once per reference; the result is always a tree.
    pub fn copy_subtree(&mut self, from: &NodeArena, idx: NodeIndex) -> NodeIndex {
        let Some(node) = from.get(idx) else {
            return NodeIndex::NONE;
        };
        let kind = node.kind.map_children(|child| self.copy_subtree(from, child));
        self.alloc(kind, node.span)
    }

    /// Iterate over every node index in allocation order.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        (0..self.nodes.len() as u32).map(NodeIndex)
    }
}
