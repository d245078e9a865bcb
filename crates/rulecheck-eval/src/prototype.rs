//! Property access and the pure prototype methods of primitives and arrays.
//!
//! Strings are indexed by UTF-16 code unit, as in JavaScript. Methods are
//! materialized on access as native functions that read their receiver from
//! `this`.

use crate::error::EvalError;
use crate::js_ops::{same_value_zero, strict_equals};
use crate::value::{Function, Value};
use rulecheck_syntax::numeric::format_number;

/// Argument `index`, or `undefined` when absent.
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// Invoke `callee` if it is a function.
pub fn call_value(callee: &Value, this: &Value, args: &[Value]) -> Result<Value, EvalError> {
    match callee {
        Value::Function(f) => f.call(this, args),
        other => Err(EvalError::type_error(format!(
            "{} is not a function",
            other.to_js_string()
        ))),
    }
}

/// ToIntegerOrInfinity
pub fn to_integer_or_infinity(value: &Value) -> Result<f64, EvalError> {
    let n = value.to_number()?;
    Ok(if n.is_nan() { 0.0 } else { n.trunc() })
}

pub fn to_uint16(n: f64) -> u16 {
    rulecheck_syntax::numeric::to_uint32(n) as u16
}

/// Resolve a relative index argument (`slice(-2)`) against `len`.
fn relative_index(value: &Value, len: usize, default: usize) -> Result<usize, EvalError> {
    if matches!(value, Value::Undefined) {
        return Ok(default);
    }
    let n = to_integer_or_infinity(value)?;
    let len_f = len as f64;
    Ok(if n < 0.0 {
        (len_f + n).max(0.0) as usize
    } else {
        n.min(len_f) as usize
    })
}

fn cannot_read(target: &Value, key: &str) -> EvalError {
    EvalError::type_error(format!(
        "Cannot read properties of {} (reading '{key}')",
        target.to_js_string()
    ))
}

fn unknown(key: &str) -> EvalError {
    EvalError::UnknownProperty(key.to_string())
}

fn array_index(key: &str) -> Option<usize> {
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<usize>().ok()
}

/// `Object.prototype` members other than the modeled ones.
const OBJECT_PROTOTYPE_KEYS: &[&str] = &[
    "constructor",
    "__proto__",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toLocaleString",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
];

/// `target[key]`. Reading from `null`/`undefined` is a TypeError.
///
/// A key that is neither an own property nor a modeled method is an
/// [`EvalError::UnknownProperty`], except on plain objects, where it is
/// known to be `undefined`.
pub fn get_property(target: &Value, key: &str) -> Result<Value, EvalError> {
    match target {
        Value::Undefined | Value::Null => Err(cannot_read(target, key)),
        Value::String(s) => string_property(s, key),
        Value::Array(items) => match array_index(key) {
            Some(i) => Ok(items.get(i).cloned().unwrap_or(Value::Undefined)),
            None if key == "length" => Ok(Value::Number(items.len() as f64)),
            None => array_method(key).ok_or_else(|| unknown(key)),
        },
        Value::Object(obj) => {
            if let Some(value) = obj.properties.get(key) {
                return Ok(value.clone());
            }
            if let Some(method) = object_method(key) {
                return Ok(method);
            }
            if obj.is_plain() && !OBJECT_PROTOTYPE_KEYS.contains(&key) {
                Ok(Value::Undefined)
            } else {
                Err(unknown(key))
            }
        }
        Value::Function(f) => match f.properties.get(key) {
            Some(value) => Ok(value.clone()),
            None if key == "name" => Ok(Value::string(f.name.as_str())),
            None => Err(unknown(key)),
        },
        Value::Number(_) => number_method(key).ok_or_else(|| unknown(key)),
        Value::BigInt(_) | Value::Bool(_) => match key {
            "toString" => Ok(to_string_method()),
            "valueOf" => Ok(value_of_method()),
            _ => Err(unknown(key)),
        },
        Value::RegExp(re) => Ok(match key {
            "source" => Value::string(re.pattern.as_str()),
            "flags" => Value::string(re.flags.as_str()),
            "global" => Value::Bool(re.flags.contains('g')),
            "ignoreCase" => Value::Bool(re.flags.contains('i')),
            "multiline" => Value::Bool(re.flags.contains('m')),
            "sticky" => Value::Bool(re.flags.contains('y')),
            "unicode" => Value::Bool(re.flags.contains('u')),
            "lastIndex" => Value::Number(0.0),
            "toString" => to_string_method(),
            _ => return Err(unknown(key)),
        }),
    }
}

fn method(
    name: &'static str,
    call: impl Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static,
) -> Value {
    Value::function(Function::native(name, call))
}

fn to_string_method() -> Value {
    method("toString", |this, _| Ok(Value::string(this.to_js_string())))
}

fn value_of_method() -> Value {
    method("valueOf", |this, _| Ok(this.clone()))
}

fn object_method(key: &str) -> Option<Value> {
    Some(match key {
        "hasOwnProperty" => method("hasOwnProperty", |this, args| {
            let key = arg(args, 0).to_property_key();
            Ok(Value::Bool(
                this.as_object()
                    .is_some_and(|obj| obj.properties.contains_key(&key)),
            ))
        }),
        "toString" => to_string_method(),
        "valueOf" => value_of_method(),
        _ => return None,
    })
}

// =============================================================================
// Numbers
// =============================================================================

fn this_number(this: &Value) -> Result<f64, EvalError> {
    match this {
        Value::Number(n) => Ok(*n),
        other => Err(EvalError::type_error(format!(
            "Number.prototype method called on {}",
            other.type_of()
        ))),
    }
}

fn number_method(key: &str) -> Option<Value> {
    Some(match key {
        "toString" => method("toString", |this, args| {
            let n = this_number(this)?;
            match arg(args, 0) {
                Value::Undefined => Ok(Value::string(format_number(n))),
                radix => {
                    let radix = to_integer_or_infinity(&radix)?;
                    if !(2.0..=36.0).contains(&radix) {
                        return Err(EvalError::Range(
                            "toString() radix must be between 2 and 36".into(),
                        ));
                    }
                    Ok(Value::string(format_radix(n, radix as u32)))
                }
            }
        }),
        "toFixed" => method("toFixed", |this, args| {
            let n = this_number(this)?;
            let digits = to_integer_or_infinity(&arg(args, 0))?;
            if !(0.0..=100.0).contains(&digits) {
                return Err(EvalError::Range(
                    "toFixed() digits argument must be between 0 and 100".into(),
                ));
            }
            if !n.is_finite() || n.abs() >= 1e21 {
                return Ok(Value::string(format_number(n)));
            }
            Ok(Value::string(format!("{:.*}", digits as usize, n)))
        }),
        "valueOf" => value_of_method(),
        _ => return None,
    })
}

/// Integer part in `radix`; fractional digits are dropped unless the radix is 10.
fn format_radix(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() || n.fract() != 0.0 || n.abs() >= 1e21 {
        return format_number(n);
    }
    let negative = n < 0.0;
    let mut value = n.abs() as u128;
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % u128::from(radix)) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        value /= u128::from(radix);
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

// =============================================================================
// Strings
// =============================================================================

fn string_property(s: &str, key: &str) -> Result<Value, EvalError> {
    if let Some(index) = array_index(key) {
        return Ok(s
            .encode_utf16()
            .nth(index)
            .map(|unit| Value::string(String::from_utf16_lossy(&[unit])))
            .unwrap_or(Value::Undefined));
    }
    if key == "length" {
        return Ok(Value::Number(s.encode_utf16().count() as f64));
    }
    string_method(key).ok_or_else(|| unknown(key))
}

fn this_string(this: &Value) -> Result<String, EvalError> {
    match this {
        Value::Undefined | Value::Null => Err(EvalError::type_error(
            "String.prototype method called on null or undefined",
        )),
        other => Ok(other.to_js_string()),
    }
}

fn utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn from_utf16(units: &[u16]) -> Value {
    Value::string(String::from_utf16_lossy(units))
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn rfind_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = (haystack.len() - needle.len()).min(from);
    (0..=last)
        .rev()
        .find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn pad(this: &Value, args: &[Value], at_start: bool) -> Result<Value, EvalError> {
    let s = utf16(&this_string(this)?);
    let target = to_integer_or_infinity(&arg(args, 0))?;
    let filler = match arg(args, 1) {
        Value::Undefined => vec![u16::from(b' ')],
        other => utf16(&other.to_js_string()),
    };
    if target <= s.len() as f64 || filler.is_empty() {
        return Ok(from_utf16(&s));
    }
    let missing = target as usize - s.len();
    let padding: Vec<u16> = filler.iter().copied().cycle().take(missing).collect();
    let mut out = Vec::with_capacity(target as usize);
    if at_start {
        out.extend_from_slice(&padding);
        out.extend_from_slice(&s);
    } else {
        out.extend_from_slice(&s);
        out.extend_from_slice(&padding);
    }
    Ok(from_utf16(&out))
}

fn no_regexp(value: &Value, name: &str) -> Result<(), EvalError> {
    if matches!(value, Value::RegExp(_)) {
        return Err(EvalError::unsupported(format!(
            "regular expression argument to String.prototype.{name}"
        )));
    }
    Ok(())
}

fn string_method(key: &str) -> Option<Value> {
    Some(match key {
        "toUpperCase" | "toLocaleUpperCase" => method("toUpperCase", |this, _| {
            Ok(Value::string(this_string(this)?.to_uppercase()))
        }),
        "toLowerCase" | "toLocaleLowerCase" => method("toLowerCase", |this, _| {
            Ok(Value::string(this_string(this)?.to_lowercase()))
        }),
        "trim" => method("trim", |this, _| {
            Ok(Value::string(this_string(this)?.trim()))
        }),
        "trimStart" | "trimLeft" => method("trimStart", |this, _| {
            Ok(Value::string(this_string(this)?.trim_start()))
        }),
        "trimEnd" | "trimRight" => method("trimEnd", |this, _| {
            Ok(Value::string(this_string(this)?.trim_end()))
        }),
        "slice" => method("slice", |this, args| {
            let s = utf16(&this_string(this)?);
            let start = relative_index(&arg(args, 0), s.len(), 0)?;
            let end = relative_index(&arg(args, 1), s.len(), s.len())?;
            Ok(from_utf16(if start < end { &s[start..end] } else { &[] }))
        }),
        "substring" => method("substring", |this, args| {
            let s = utf16(&this_string(this)?);
            let clamp = |v: &Value, default: usize| -> Result<usize, EvalError> {
                if matches!(v, Value::Undefined) {
                    return Ok(default);
                }
                Ok(to_integer_or_infinity(v)?.clamp(0.0, s.len() as f64) as usize)
            };
            let a = clamp(&arg(args, 0), 0)?;
            let b = clamp(&arg(args, 1), s.len())?;
            Ok(from_utf16(&s[a.min(b)..a.max(b)]))
        }),
        "charAt" => method("charAt", |this, args| {
            let s = utf16(&this_string(this)?);
            let i = to_integer_or_infinity(&arg(args, 0))?;
            Ok(if i >= 0.0 && (i as usize) < s.len() {
                from_utf16(&s[i as usize..i as usize + 1])
            } else {
                Value::string("")
            })
        }),
        "charCodeAt" => method("charCodeAt", |this, args| {
            let s = utf16(&this_string(this)?);
            let i = to_integer_or_infinity(&arg(args, 0))?;
            Ok(Value::Number(if i >= 0.0 && (i as usize) < s.len() {
                f64::from(s[i as usize])
            } else {
                f64::NAN
            }))
        }),
        "at" => method("at", |this, args| {
            let s = utf16(&this_string(this)?);
            let i = to_integer_or_infinity(&arg(args, 0))?;
            let i = if i < 0.0 { s.len() as f64 + i } else { i };
            Ok(if i >= 0.0 && (i as usize) < s.len() {
                from_utf16(&s[i as usize..i as usize + 1])
            } else {
                Value::Undefined
            })
        }),
        "indexOf" => method("indexOf", |this, args| {
            let s = utf16(&this_string(this)?);
            let needle = utf16(&arg(args, 0).to_js_string());
            let from = relative_index(&arg(args, 1), s.len(), 0)?;
            Ok(Value::Number(
                find_units(&s, &needle, from).map_or(-1.0, |i| i as f64),
            ))
        }),
        "lastIndexOf" => method("lastIndexOf", |this, args| {
            let s = utf16(&this_string(this)?);
            let needle = utf16(&arg(args, 0).to_js_string());
            let from = match arg(args, 1) {
                Value::Undefined => s.len(),
                v => to_integer_or_infinity(&v)?.max(0.0) as usize,
            };
            Ok(Value::Number(
                rfind_units(&s, &needle, from).map_or(-1.0, |i| i as f64),
            ))
        }),
        "includes" => method("includes", |this, args| {
            no_regexp(&arg(args, 0), "includes")?;
            let s = utf16(&this_string(this)?);
            let needle = utf16(&arg(args, 0).to_js_string());
            let from = relative_index(&arg(args, 1), s.len(), 0)?;
            Ok(Value::Bool(find_units(&s, &needle, from).is_some()))
        }),
        "startsWith" => method("startsWith", |this, args| {
            no_regexp(&arg(args, 0), "startsWith")?;
            let s = utf16(&this_string(this)?);
            let needle = utf16(&arg(args, 0).to_js_string());
            let from = relative_index(&arg(args, 1), s.len(), 0)?;
            Ok(Value::Bool(s[from..].starts_with(&needle)))
        }),
        "endsWith" => method("endsWith", |this, args| {
            no_regexp(&arg(args, 0), "endsWith")?;
            let s = utf16(&this_string(this)?);
            let needle = utf16(&arg(args, 0).to_js_string());
            let end = relative_index(&arg(args, 1), s.len(), s.len())?;
            Ok(Value::Bool(s[..end].ends_with(&needle)))
        }),
        "split" => method("split", |this, args| {
            let s = this_string(this)?;
            let limit = match arg(args, 1) {
                Value::Undefined => usize::MAX,
                v => rulecheck_syntax::numeric::to_uint32(v.to_number()?) as usize,
            };
            let parts: Vec<Value> = match arg(args, 0) {
                Value::Undefined => vec![Value::string(s)],
                Value::RegExp(_) => {
                    return Err(EvalError::unsupported(
                        "regular expression argument to String.prototype.split",
                    ));
                }
                separator => {
                    let separator = separator.to_js_string();
                    if separator.is_empty() {
                        s.encode_utf16()
                            .map(|unit| from_utf16(&[unit]))
                            .collect()
                    } else {
                        s.split(separator.as_str()).map(Value::string).collect()
                    }
                }
            };
            Ok(Value::array(parts.into_iter().take(limit).collect()))
        }),
        "repeat" => method("repeat", |this, args| {
            let s = this_string(this)?;
            let count = to_integer_or_infinity(&arg(args, 0))?;
            if count < 0.0 || count.is_infinite() {
                return Err(EvalError::Range(format!(
                    "Invalid count value: {}",
                    format_number(count)
                )));
            }
            Ok(Value::string(s.repeat(count as usize)))
        }),
        "padStart" => method("padStart", |this, args| pad(this, args, true)),
        "padEnd" => method("padEnd", |this, args| pad(this, args, false)),
        "concat" => method("concat", |this, args| {
            let mut s = this_string(this)?;
            for a in args {
                s.push_str(&a.to_js_string());
            }
            Ok(Value::string(s))
        }),
        "replace" | "replaceAll" => {
            let all = key == "replaceAll";
            method(if all { "replaceAll" } else { "replace" }, move |this, args| {
                let s = this_string(this)?;
                let pattern = arg(args, 0);
                let replacement = arg(args, 1);
                no_regexp(&pattern, "replace")?;
                if matches!(replacement, Value::Function(_)) {
                    return Err(EvalError::unsupported(
                        "function replacement in String.prototype.replace",
                    ));
                }
                let pattern = pattern.to_js_string();
                let replacement = replacement.to_js_string();
                Ok(Value::string(if all {
                    s.replace(&pattern, &replacement)
                } else {
                    s.replacen(&pattern, &replacement, 1)
                }))
            })
        }
        "toString" | "valueOf" => method("toString", |this, _| Ok(Value::string(this_string(this)?))),
        _ => return None,
    })
}

// =============================================================================
// Arrays
// =============================================================================

fn this_array(this: &Value) -> Result<&[Value], EvalError> {
    match this {
        Value::Array(items) => Ok(items),
        other => Err(EvalError::type_error(format!(
            "Array.prototype method called on {}",
            other.type_of()
        ))),
    }
}

/// Call `callback(item, index, array)` for each element until `stop` says so.
fn each<T>(
    this: &Value,
    callback: &Value,
    mut step: impl FnMut(usize, &Value, Value) -> Option<T>,
) -> Result<Option<T>, EvalError> {
    let items = this_array(this)?;
    if !matches!(callback, Value::Function(_)) {
        return Err(EvalError::type_error(format!(
            "{} is not a function",
            callback.to_js_string()
        )));
    }
    for (i, item) in items.iter().enumerate() {
        let result = call_value(
            callback,
            &Value::Undefined,
            &[item.clone(), Value::Number(i as f64), this.clone()],
        )?;
        if let Some(done) = step(i, item, result) {
            return Ok(Some(done));
        }
    }
    Ok(None)
}

fn flatten_into(items: &[Value], depth: f64, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) if depth >= 1.0 => flatten_into(inner, depth - 1.0, out),
            other => out.push(other.clone()),
        }
    }
}

fn array_method(key: &str) -> Option<Value> {
    Some(match key {
        "join" => method("join", |this, args| {
            let items = this_array(this)?;
            let separator = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                other => other.to_js_string(),
            };
            Ok(Value::string(
                items
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.to_js_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(&separator),
            ))
        }),
        "slice" => method("slice", |this, args| {
            let items = this_array(this)?;
            let start = relative_index(&arg(args, 0), items.len(), 0)?;
            let end = relative_index(&arg(args, 1), items.len(), items.len())?;
            Ok(Value::array(if start < end {
                items[start..end].to_vec()
            } else {
                Vec::new()
            }))
        }),
        "concat" => method("concat", |this, args| {
            let mut out = this_array(this)?.to_vec();
            for a in args {
                match a {
                    Value::Array(inner) => out.extend(inner.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::array(out))
        }),
        "includes" => method("includes", |this, args| {
            let needle = arg(args, 0);
            Ok(Value::Bool(
                this_array(this)?
                    .iter()
                    .any(|item| same_value_zero(item, &needle)),
            ))
        }),
        "indexOf" => method("indexOf", |this, args| {
            let needle = arg(args, 0);
            Ok(Value::Number(
                this_array(this)?
                    .iter()
                    .position(|item| strict_equals(item, &needle))
                    .map_or(-1.0, |i| i as f64),
            ))
        }),
        "lastIndexOf" => method("lastIndexOf", |this, args| {
            let needle = arg(args, 0);
            Ok(Value::Number(
                this_array(this)?
                    .iter()
                    .rposition(|item| strict_equals(item, &needle))
                    .map_or(-1.0, |i| i as f64),
            ))
        }),
        "at" => method("at", |this, args| {
            let items = this_array(this)?;
            let i = to_integer_or_infinity(&arg(args, 0))?;
            let i = if i < 0.0 { items.len() as f64 + i } else { i };
            Ok(if i >= 0.0 && (i as usize) < items.len() {
                items[i as usize].clone()
            } else {
                Value::Undefined
            })
        }),
        "flat" => method("flat", |this, args| {
            let depth = match arg(args, 0) {
                Value::Undefined => 1.0,
                other => to_integer_or_infinity(&other)?,
            };
            let mut out = Vec::new();
            flatten_into(this_array(this)?, depth, &mut out);
            Ok(Value::array(out))
        }),
        "toReversed" => method("toReversed", |this, _| {
            Ok(Value::array(this_array(this)?.iter().rev().cloned().collect()))
        }),
        "map" => method("map", |this, args| {
            let mut out = Vec::new();
            each::<()>(this, &arg(args, 0), |_, _, result| {
                out.push(result);
                None
            })?;
            Ok(Value::array(out))
        }),
        "filter" => method("filter", |this, args| {
            let mut out = Vec::new();
            each::<()>(this, &arg(args, 0), |_, item, result| {
                if result.is_truthy() {
                    out.push(item.clone());
                }
                None
            })?;
            Ok(Value::array(out))
        }),
        "some" => method("some", |this, args| {
            let found = each(this, &arg(args, 0), |_, _, r| r.is_truthy().then_some(()))?;
            Ok(Value::Bool(found.is_some()))
        }),
        "every" => method("every", |this, args| {
            let failed = each(this, &arg(args, 0), |_, _, r| (!r.is_truthy()).then_some(()))?;
            Ok(Value::Bool(failed.is_none()))
        }),
        "find" => method("find", |this, args| {
            let found = each(this, &arg(args, 0), |_, item, r| {
                r.is_truthy().then(|| item.clone())
            })?;
            Ok(found.unwrap_or(Value::Undefined))
        }),
        "findIndex" => method("findIndex", |this, args| {
            let found = each(this, &arg(args, 0), |i, _, r| r.is_truthy().then_some(i))?;
            Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
        }),
        "reduce" => method("reduce", |this, args| {
            let items = this_array(this)?;
            let callback = arg(args, 0);
            let mut iter = items.iter().enumerate();
            let mut acc = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match iter.next() {
                    Some((_, first)) => first.clone(),
                    None => {
                        return Err(EvalError::type_error(
                            "Reduce of empty array with no initial value",
                        ));
                    }
                },
            };
            for (i, item) in iter {
                acc = call_value(
                    &callback,
                    &Value::Undefined,
                    &[acc, item.clone(), Value::Number(i as f64), this.clone()],
                )?;
            }
            Ok(acc)
        }),
        "toString" => to_string_method(),
        _ => return None,
    })
}

#[cfg(test)]
#[path = "tests/prototype_tests.rs"]
mod tests;
