//! Tree-walking evaluator over arena expressions.
//!
//! One interpreter serves both stages. The static stage runs it over source
//! nodes with the module's scope tree and an environment that only knows the
//! builtins; the dynamic stage runs it over a residual expression with an
//! environment that loads imports. Any node that cannot be evaluated makes the
//! whole evaluation `None`; partial arrays or objects are never returned.

use crate::error::EvalError;
use crate::globals::own_entries;
use crate::js_ops::{binary_op, unary_op};
use crate::prototype::get_property;
use crate::value::{RegExpValue, Value};
use indexmap::IndexMap;
use rulecheck_syntax::numeric::format_number;
use rulecheck_syntax::{
    AssignmentOperator, DeclarationKind, Definition, Literal, LogicalOperator, NodeArena,
    NodeIndex, NodeKind, PropertyKind, ScopeTree, UnaryOperator,
};
use rustc_hash::FxHashSet;
use std::rc::Rc;
use tracing::trace;

/// Supplies values for identifiers that are not bound in scope.
pub trait Environment {
    fn free_identifier(&mut self, name: &str) -> Option<Value>;

    /// Whether `await x` may evaluate to `x`. Only the dynamic stage, which
    /// loads modules eagerly, allows it.
    fn allows_await(&self) -> bool {
        false
    }
}

/// Result of evaluating something in callee position.
enum Reference {
    Value(Value),
    Method { this: Value, func: Value },
    /// An optional link (`?.`) hit `null`/`undefined`.
    ShortCircuit,
}

impl Reference {
    fn into_value(self) -> Value {
        match self {
            Reference::Value(value) | Reference::Method { func: value, .. } => value,
            Reference::ShortCircuit => Value::Undefined,
        }
    }
}

pub struct Interpreter<'a> {
    arena: &'a NodeArena,
    scopes: Option<&'a ScopeTree>,
    env: &'a mut dyn Environment,
    depth: u32,
    max_depth: u32,
    visiting: FxHashSet<NodeIndex>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        arena: &'a NodeArena,
        scopes: Option<&'a ScopeTree>,
        env: &'a mut dyn Environment,
        max_depth: u32,
    ) -> Self {
        Interpreter {
            arena,
            scopes,
            env,
            depth: 0,
            max_depth,
            visiting: FxHashSet::default(),
        }
    }

    /// Evaluate `node`; `None` means the value is not determinable.
    pub fn evaluate(&mut self, node: NodeIndex) -> Option<Value> {
        if self.depth >= self.max_depth {
            trace!(node = node.0, "evaluation depth exceeded");
            return None;
        }
        self.depth += 1;
        let result = self.eval_kind(node);
        self.depth -= 1;
        result
    }

    fn native<T>(&self, result: Result<T, EvalError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                trace!(error = %err, "builtin raised");
                None
            }
        }
    }

    fn eval_kind(&mut self, node: NodeIndex) -> Option<Value> {
        let arena = self.arena;
        let kind = arena.kind(node)?;
        match kind {
            NodeKind::Literal(literal) => Some(literal_value(literal)),
            NodeKind::Identifier { name } => self.eval_identifier(node, name),
            NodeKind::Template {
                quasis,
                expressions,
            } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi.cooked.as_deref()?);
                    if let Some(&expr) = expressions.get(i) {
                        let value = self.evaluate(expr)?;
                        if matches!(value, Value::Function(_)) {
                            return None;
                        }
                        out.push_str(&value.to_js_string());
                    }
                }
                Some(Value::string(out))
            }
            NodeKind::TaggedTemplate { tag, quasi } => self.eval_tagged_template(*tag, *quasi),
            NodeKind::Array { elements } => self.eval_elements(elements).map(Value::array),
            NodeKind::Object { properties } => self.eval_object(properties),
            NodeKind::Unary { operator, argument } => {
                if *operator == UnaryOperator::Delete {
                    return None;
                }
                let value = self.evaluate(*argument)?;
                self.native(unary_op(*operator, &value))
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(*left)?;
                let right = self.evaluate(*right)?;
                self.native(binary_op(*operator, &left, &right))
            }
            NodeKind::Logical {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(*left)?;
                let short_circuits = match operator {
                    LogicalOperator::And => !left.is_truthy(),
                    LogicalOperator::Or => left.is_truthy(),
                    LogicalOperator::Nullish => !left.is_nullish(),
                };
                if short_circuits {
                    Some(left)
                } else {
                    self.evaluate(*right)
                }
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.evaluate(*test)?;
                if test.is_truthy() {
                    self.evaluate(*consequent)
                } else {
                    self.evaluate(*alternate)
                }
            }
            NodeKind::Assignment {
                operator: AssignmentOperator::Assign,
                value,
                ..
            } => self.evaluate(*value),
            NodeKind::Sequence { expressions } => {
                let mut last = Value::Undefined;
                for &expr in expressions {
                    last = self.evaluate(expr)?;
                }
                Some(last)
            }
            NodeKind::Member { .. } | NodeKind::Call { .. } => {
                self.eval_reference(node).map(Reference::into_value)
            }
            NodeKind::Chain { expression } => {
                self.eval_reference(*expression).map(Reference::into_value)
            }
            NodeKind::New { callee, arguments } => {
                let callee = self.evaluate(*callee)?;
                let args = self.eval_elements(arguments)?;
                let Value::Function(function) = callee else {
                    return None;
                };
                self.native(function.construct(&args))
            }
            NodeKind::Await { argument } if self.env.allows_await() => self.evaluate(*argument),
            _ => {
                trace!(kind = kind.name(), "not evaluable");
                None
            }
        }
    }

    fn eval_identifier(&mut self, node: NodeIndex, name: &str) -> Option<Value> {
        if let Some(scopes) = self.scopes {
            let scope = scopes.scope_at(self.arena.span(node).pos);
            if let Some(variable) = scopes.lookup(scope, name) {
                return self.eval_binding(&variable.defs);
            }
        }
        self.env.free_identifier(name)
    }

    /// Only a single `const` binding of a plain identifier is followed; any
    /// destructuring or reassignable binding is not determinable here.
    fn eval_binding(&mut self, defs: &[Definition]) -> Option<Value> {
        let [Definition::Variable {
            kind: DeclarationKind::Const,
            declarator,
            name_node,
            init,
        }] = defs
        else {
            return None;
        };
        let Some(NodeKind::VariableDeclarator { id, .. }) = self.arena.kind(*declarator) else {
            return None;
        };
        if id != name_node || init.is_none() || !self.visiting.insert(*init) {
            return None;
        }
        let value = self.evaluate(*init);
        self.visiting.remove(init);
        value
    }

    fn eval_tagged_template(&mut self, tag: NodeIndex, quasi: NodeIndex) -> Option<Value> {
        let tag = self.evaluate(tag)?;
        let Value::Function(function) = &tag else {
            return None;
        };
        if function.intrinsic != Some("String.raw") {
            return None;
        }
        let Some(NodeKind::Template {
            quasis,
            expressions,
        }) = self.arena.kind(quasi)
        else {
            return None;
        };
        let raw: Vec<Value> = quasis
            .iter()
            .map(|q| Value::string(q.raw.as_str()))
            .collect();
        let mut properties = IndexMap::new();
        for (i, q) in quasis.iter().enumerate() {
            let cooked = q
                .cooked
                .as_deref()
                .map_or(Value::Undefined, Value::string);
            properties.insert(i.to_string(), cooked);
        }
        properties.insert("raw".to_string(), Value::array(raw));
        let mut args = vec![Value::object(properties)];
        for &expr in expressions {
            args.push(self.evaluate(expr)?);
        }
        self.native(function.call(&Value::Undefined, &args))
    }

    /// Evaluate an element list with holes and spreads (array literals and
    /// call arguments).
    fn eval_elements(&mut self, elements: &[NodeIndex]) -> Option<Vec<Value>> {
        let arena = self.arena;
        let mut out = Vec::with_capacity(elements.len());
        for &element in elements {
            if element.is_none() {
                out.push(Value::Undefined);
                continue;
            }
            if let Some(NodeKind::Spread { argument }) = arena.kind(element) {
                match self.evaluate(*argument)? {
                    Value::Array(items) => out.extend(items.iter().cloned()),
                    Value::String(s) => out.extend(s.chars().map(|c| Value::string(c.to_string()))),
                    _ => return None,
                }
                continue;
            }
            out.push(self.evaluate(element)?);
        }
        Some(out)
    }

    fn eval_object(&mut self, properties: &[NodeIndex]) -> Option<Value> {
        let arena = self.arena;
        let mut out = IndexMap::new();
        for &property in properties {
            match arena.kind(property)? {
                NodeKind::Property {
                    key,
                    value,
                    computed,
                    kind: PropertyKind::Init,
                    ..
                } => {
                    let key = self.property_key(*key, *computed)?;
                    let value = self.evaluate(*value)?;
                    out.insert(key, value);
                }
                NodeKind::Spread { argument } => {
                    let source = self.evaluate(*argument)?;
                    if source.is_nullish() {
                        continue;
                    }
                    out.extend(self.native(own_entries(&source))?);
                }
                _ => return None,
            }
        }
        Some(Value::object(out))
    }

    pub(crate) fn property_key(&mut self, key: NodeIndex, computed: bool) -> Option<String> {
        if computed {
            return Some(self.evaluate(key)?.to_property_key());
        }
        static_property_key(self.arena, key)
    }

    fn eval_reference(&mut self, node: NodeIndex) -> Option<Reference> {
        let arena = self.arena;
        match arena.kind(node)? {
            NodeKind::Member {
                object,
                property,
                computed,
                optional,
            } => {
                let object = match self.eval_reference(*object)? {
                    Reference::ShortCircuit => return Some(Reference::ShortCircuit),
                    reference => reference.into_value(),
                };
                if *optional && object.is_nullish() {
                    return Some(Reference::ShortCircuit);
                }
                let key = self.property_key(*property, *computed)?;
                let func = self.native(get_property(&object, &key))?;
                Some(Reference::Method { this: object, func })
            }
            NodeKind::Call {
                callee,
                arguments,
                optional,
            } => {
                let (this, func) = match self.eval_reference(*callee)? {
                    Reference::ShortCircuit => return Some(Reference::ShortCircuit),
                    Reference::Method { this, func } => (this, func),
                    Reference::Value(func) => (Value::Undefined, func),
                };
                if *optional && func.is_nullish() {
                    return Some(Reference::ShortCircuit);
                }
                let Value::Function(function) = &func else {
                    trace!("callee is not a function");
                    return None;
                };
                let args = self.eval_elements(arguments)?;
                self.native(function.call(&this, &args)).map(Reference::Value)
            }
            _ => self.evaluate(node).map(Reference::Value),
        }
    }
}

/// Key of a non-computed property (`a`, `'a'`, `1`).
pub fn static_property_key(arena: &NodeArena, key: NodeIndex) -> Option<String> {
    match arena.kind(key)? {
        NodeKind::Identifier { name } => Some(name.clone()),
        NodeKind::Literal(Literal::String(s)) => Some(s.clone()),
        NodeKind::Literal(Literal::Number(n)) => Some(format_number(*n)),
        NodeKind::Literal(Literal::BigInt(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Runtime value of a literal node.
pub fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::BigInt(n) => Value::BigInt(*n),
        Literal::String(s) => Value::string(s.as_str()),
        Literal::RegExp { pattern, flags } => Value::RegExp(Rc::new(RegExpValue {
            pattern: pattern.clone(),
            flags: flags.clone(),
        })),
    }
}
