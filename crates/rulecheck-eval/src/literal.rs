//! Conversion of runtime values back into literal-equivalent nodes.

use crate::value::Value;
use indexmap::IndexMap;
use rulecheck_common::Span;
use rulecheck_syntax::{Literal, NodeArena, NodeIndex, NodeKind, PropertyKind};

/// Build the literal-equivalent node for `value` in `arena`.
///
/// Arrays and plain objects become array/object literals of literal nodes.
/// Functions, builtin namespaces and objects created by a constructor have
/// no literal form and yield `None`.
pub fn value_to_literal(arena: &mut NodeArena, value: &Value, span: Span) -> Option<NodeIndex> {
    let kind = match value {
        Value::Undefined => NodeKind::Literal(Literal::Undefined),
        Value::Null => NodeKind::Literal(Literal::Null),
        Value::Bool(b) => NodeKind::Literal(Literal::Bool(*b)),
        Value::Number(n) => NodeKind::Literal(Literal::Number(*n)),
        Value::BigInt(n) => NodeKind::Literal(Literal::BigInt(*n)),
        Value::String(s) => NodeKind::Literal(Literal::String(s.to_string())),
        Value::RegExp(re) => NodeKind::Literal(Literal::RegExp {
            pattern: re.pattern.clone(),
            flags: re.flags.clone(),
        }),
        Value::Array(items) => {
            let elements = items
                .iter()
                .map(|item| value_to_literal(arena, item, span))
                .collect::<Option<Vec<_>>>()?;
            NodeKind::Array { elements }
        }
        Value::Object(obj) if obj.is_plain() => {
            let properties = object_properties(arena, &obj.properties, span)?;
            NodeKind::Object { properties }
        }
        Value::Object(_) | Value::Function(_) => return None,
    };
    Some(arena.alloc(kind, span))
}

fn object_properties(
    arena: &mut NodeArena,
    properties: &IndexMap<String, Value>,
    span: Span,
) -> Option<Vec<NodeIndex>> {
    let mut out = Vec::with_capacity(properties.len());
    for (key, value) in properties {
        let value = value_to_literal(arena, value, span)?;
        let key = arena.alloc(NodeKind::Literal(Literal::String(key.clone())), span);
        out.push(arena.alloc(
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
    Some(out)
}

/// Whether `node` is fully literal: a literal, or an array/object literal
/// whose every element/property is itself fully literal.
pub fn is_literal_tree(arena: &NodeArena, node: NodeIndex) -> bool {
    match arena.kind(node) {
        Some(NodeKind::Literal(_)) => true,
        Some(NodeKind::Array { elements }) => elements
            .iter()
            .all(|&element| element.is_some() && is_literal_tree(arena, element)),
        Some(NodeKind::Object { properties }) => properties.iter().all(|&property| {
            matches!(
                arena.kind(property),
                Some(NodeKind::Property {
                    key,
                    value,
                    computed: false,
                    method: false,
                    kind: PropertyKind::Init,
                    ..
                }) if matches!(arena.kind(*key), Some(NodeKind::Literal(Literal::String(_)) | NodeKind::Identifier { .. }))
                    && is_literal_tree(arena, *value)
            )
        }),
        _ => false,
    }
}
