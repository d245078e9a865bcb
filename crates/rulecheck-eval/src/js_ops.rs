//! JavaScript operator semantics over [`Value`].
//!
//! Shared by the best-effort static folder and the dynamic evaluator, so both
//! stages agree on what `1 + "2"` or `1n + 1` means.

use crate::error::EvalError;
use crate::value::Value;
use rulecheck_syntax::numeric::{to_int32, to_uint32};
use rulecheck_syntax::{BinaryOperator, UnaryOperator};
use std::cmp::Ordering;
use std::rc::Rc;

// =============================================================================
// Equality
// =============================================================================

/// IsStrictlyEqual (`===`).
pub fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::BigInt(a), Value::BigInt(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::RegExp(a), Value::RegExp(b)) => Rc::ptr_eq(a, b),
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// SameValueZero, used by `includes`.
pub fn same_value_zero(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
        _ => strict_equals(left, right),
    }
}

/// IsLooselyEqual (`==`).
pub fn loose_equals(left: &Value, right: &Value) -> Result<bool, EvalError> {
    if std::mem::discriminant(left) == std::mem::discriminant(right) {
        return Ok(strict_equals(left, right));
    }
    Ok(match (left, right) {
        (a, b) if a.is_nullish() && b.is_nullish() => true,
        (a, b) if a.is_nullish() || b.is_nullish() => false,
        (Value::Number(a), Value::String(_)) => *a == right.to_number()?,
        (Value::String(_), Value::Number(b)) => left.to_number()? == *b,
        (Value::BigInt(a), Value::String(s)) => string_to_bigint(s).is_some_and(|b| *a == b),
        (Value::String(s), Value::BigInt(b)) => string_to_bigint(s).is_some_and(|a| a == *b),
        (Value::Bool(b), other) => return loose_equals(&Value::Number(f64::from(u8::from(*b))), other),
        (other, Value::Bool(b)) => return loose_equals(other, &Value::Number(f64::from(u8::from(*b)))),
        (Value::BigInt(a), Value::Number(b)) | (Value::Number(b), Value::BigInt(a)) => {
            b.is_finite() && b.fract() == 0.0 && (*a as f64) == *b
        }
        (a, b) if a.is_primitive() && !b.is_primitive() => {
            return loose_equals(a, &b.to_primitive());
        }
        (a, b) if !a.is_primitive() && b.is_primitive() => {
            return loose_equals(&a.to_primitive(), b);
        }
        _ => false,
    })
}

fn string_to_bigint(text: &str) -> Option<i128> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0);
    }
    trimmed.parse::<i128>().ok()
}

// =============================================================================
// Operators
// =============================================================================

pub fn type_of(value: &Value) -> Value {
    Value::string(value.type_of())
}

pub fn unary_op(operator: UnaryOperator, value: &Value) -> Result<Value, EvalError> {
    Ok(match operator {
        UnaryOperator::Not => Value::Bool(!value.is_truthy()),
        UnaryOperator::Typeof => type_of(value),
        UnaryOperator::Void => Value::Undefined,
        UnaryOperator::Plus => Value::Number(value.to_number()?),
        UnaryOperator::Minus => match value.to_primitive() {
            Value::BigInt(n) => Value::BigInt(
                n.checked_neg()
                    .ok_or_else(|| EvalError::Range("BigInt overflow".into()))?,
            ),
            other => Value::Number(-other.to_number()?),
        },
        UnaryOperator::BitNot => match value.to_primitive() {
            Value::BigInt(n) => Value::BigInt(!n),
            other => Value::Number(f64::from(!to_int32(other.to_number()?))),
        },
        UnaryOperator::Delete => return Err(EvalError::unsupported("delete")),
    })
}

pub fn binary_op(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    use BinaryOperator as Op;
    Ok(match operator {
        Op::StrictEq => Value::Bool(strict_equals(left, right)),
        Op::StrictNotEq => Value::Bool(!strict_equals(left, right)),
        Op::Eq => Value::Bool(loose_equals(left, right)?),
        Op::NotEq => Value::Bool(!loose_equals(left, right)?),
        Op::Lt => Value::Bool(compare(left, right)? == Some(true)),
        Op::Gt => Value::Bool(compare(right, left)? == Some(true)),
        Op::LtEq => Value::Bool(compare(right, left)? == Some(false)),
        Op::GtEq => Value::Bool(compare(left, right)? == Some(false)),
        Op::Add => add(left, right)?,
        Op::In => has_property(right, &left.to_property_key())?,
        Op::Instanceof => instance_of(left, right)?,
        _ => numeric_op(operator, &left.to_primitive(), &right.to_primitive())?,
    })
}

fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let left = left.to_primitive();
    let right = right.to_primitive();
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        let mut out = left.to_js_string();
        out.push_str(&right.to_js_string());
        return Ok(Value::string(out));
    }
    numeric_op(BinaryOperator::Add, &left, &right)
}

fn numeric_op(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::BigInt(a), Value::BigInt(b)) => bigint_op(operator, *a, *b).map(Value::BigInt),
        (Value::BigInt(_), _) | (_, Value::BigInt(_)) => Err(EvalError::type_error(
            "Cannot mix BigInt and other types, use explicit conversions",
        )),
        _ => Ok(Value::Number(number_op(
            operator,
            left.to_number()?,
            right.to_number()?,
        ))),
    }
}

fn number_op(operator: BinaryOperator, a: f64, b: f64) -> f64 {
    use BinaryOperator as Op;
    match operator {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::Rem => js_remainder(a, b),
        Op::Exp => js_pow(a, b),
        Op::BitAnd => f64::from(to_int32(a) & to_int32(b)),
        Op::BitOr => f64::from(to_int32(a) | to_int32(b)),
        Op::BitXor => f64::from(to_int32(a) ^ to_int32(b)),
        Op::Shl => f64::from(to_int32(a).wrapping_shl(to_uint32(b) & 31)),
        Op::Shr => f64::from(to_int32(a) >> (to_uint32(b) & 31)),
        Op::UShr => f64::from(to_uint32(a) >> (to_uint32(b) & 31)),
        _ => f64::NAN,
    }
}

fn js_remainder(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() || a.is_infinite() || b == 0.0 {
        return f64::NAN;
    }
    if b.is_infinite() || a == 0.0 {
        return a;
    }
    a % b
}

fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() {
        return f64::NAN;
    }
    if base.abs() == 1.0 && exponent.is_infinite() {
        return f64::NAN;
    }
    base.powf(exponent)
}

fn bigint_op(operator: BinaryOperator, a: i128, b: i128) -> Result<i128, EvalError> {
    use BinaryOperator as Op;
    let overflow = || EvalError::Range("Maximum BigInt size exceeded".into());
    match operator {
        Op::Add => a.checked_add(b).ok_or_else(overflow),
        Op::Sub => a.checked_sub(b).ok_or_else(overflow),
        Op::Mul => a.checked_mul(b).ok_or_else(overflow),
        Op::Div | Op::Rem if b == 0 => Err(EvalError::Range("Division by zero".into())),
        Op::Div => a.checked_div(b).ok_or_else(overflow),
        Op::Rem => a.checked_rem(b).ok_or_else(overflow),
        Op::Exp => {
            let exponent = u32::try_from(b)
                .map_err(|_| EvalError::Range("Exponent must be non-negative".into()))?;
            a.checked_pow(exponent).ok_or_else(overflow)
        }
        Op::BitAnd => Ok(a & b),
        Op::BitOr => Ok(a | b),
        Op::BitXor => Ok(a ^ b),
        Op::Shl | Op::Shr => {
            let shift = if operator == Op::Shl { b } else { -b };
            if shift >= 0 {
                let shift = u32::try_from(shift).map_err(|_| overflow())?;
                let shifted = a.checked_shl(shift).ok_or_else(overflow)?;
                if shifted >> shift != a {
                    return Err(overflow());
                }
                Ok(shifted)
            } else {
                let shift = u32::try_from(-shift).unwrap_or(127).min(127);
                Ok(a >> shift)
            }
        }
        Op::UShr => Err(EvalError::type_error(
            "BigInts have no unsigned right shift, use >> instead",
        )),
        _ => Err(EvalError::unsupported(operator.as_str())),
    }
}

/// IsLessThan. `None` is the undefined outcome (a NaN was involved).
fn compare(left: &Value, right: &Value) -> Result<Option<bool>, EvalError> {
    let left = left.to_primitive();
    let right = right.to_primitive();
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Ok(Some(compare_utf16(a, b) == Ordering::Less));
    }
    match (&left, &right) {
        (Value::BigInt(a), Value::BigInt(b)) => Ok(Some(a < b)),
        (Value::BigInt(a), other) | (other, Value::BigInt(a)) => {
            let n = match other {
                Value::String(s) => match string_to_bigint(s) {
                    Some(b) => b as f64,
                    None => return Ok(None),
                },
                other => other.to_number()?,
            };
            if n.is_nan() {
                return Ok(None);
            }
            let a = *a as f64;
            let bigint_on_left = matches!(left, Value::BigInt(_));
            Ok(Some(if bigint_on_left { a < n } else { n < a }))
        }
        _ => {
            let a = left.to_number()?;
            let b = right.to_number()?;
            if a.is_nan() || b.is_nan() {
                Ok(None)
            } else {
                Ok(Some(a < b))
            }
        }
    }
}

/// Compare strings by UTF-16 code units, like the relational operators do.
pub fn compare_utf16(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

fn has_property(target: &Value, key: &str) -> Result<Value, EvalError> {
    let found = match target {
        Value::Object(obj) => obj.properties.contains_key(key),
        Value::Array(items) => {
            key == "length" || key.parse::<usize>().is_ok_and(|i| i < items.len())
        }
        Value::Function(f) => f.properties.contains_key(key) || key == "name" || key == "length",
        Value::RegExp(_) => matches!(key, "source" | "flags" | "lastIndex"),
        other => {
            return Err(EvalError::type_error(format!(
                "Cannot use 'in' operator to search for '{key}' in {}",
                other.to_js_string()
            )));
        }
    };
    Ok(Value::Bool(found))
}

fn instance_of(value: &Value, constructor: &Value) -> Result<Value, EvalError> {
    let Value::Function(ctor) = constructor else {
        return Err(EvalError::type_error(
            "Right-hand side of 'instanceof' is not callable",
        ));
    };
    let result = match (ctor.intrinsic, value) {
        (Some("Object"), v) => !v.is_primitive(),
        (Some("Array"), Value::Array(_)) => true,
        (Some("RegExp"), Value::RegExp(_)) => true,
        (Some("Function"), Value::Function(_)) => true,
        (_, Value::Object(obj)) => obj
            .constructor
            .as_ref()
            .is_some_and(|c| Rc::ptr_eq(c, ctor)),
        _ => false,
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
#[path = "tests/js_ops_tests.rs"]
mod tests;
