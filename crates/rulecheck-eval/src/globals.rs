//! Builtin global bindings available to both evaluator stages.
//!
//! Only side-effect free builtins are provided (no `Math.random`, no `Date`).
//! The table is built once per thread so builtin identity is stable inside a
//! worker.

use crate::error::EvalError;
use crate::prototype::{arg, call_value, to_integer_or_infinity};
use crate::value::{Function, JsObject, RegExpValue, Value};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::rc::Rc;

thread_local! {
    static GLOBALS: FxHashMap<&'static str, Value> = build_globals();
}

/// Names that resolve to builtins when they are not bound in scope.
pub const GLOBAL_NAMES: &[&str] = &[
    "undefined",
    "NaN",
    "Infinity",
    "String",
    "Number",
    "Boolean",
    "BigInt",
    "Math",
    "Object",
    "Array",
    "JSON",
    "RegExp",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
];

/// Look up a builtin global by name.
pub fn global(name: &str) -> Option<Value> {
    GLOBALS.with(|globals| globals.get(name).cloned())
}

pub fn is_global_name(name: &str) -> bool {
    GLOBAL_NAMES.contains(&name)
}

fn build_globals() -> FxHashMap<&'static str, Value> {
    let mut globals = FxHashMap::default();
    globals.insert("undefined", Value::Undefined);
    globals.insert("NaN", Value::Number(f64::NAN));
    globals.insert("Infinity", Value::Number(f64::INFINITY));
    globals.insert("String", string_constructor());
    globals.insert("Number", number_constructor());
    globals.insert("Boolean", boolean_constructor());
    globals.insert("BigInt", bigint_constructor());
    globals.insert("Math", math_namespace());
    globals.insert("Object", object_constructor());
    globals.insert("Array", array_constructor());
    globals.insert("JSON", json_namespace());
    globals.insert("RegExp", regexp_constructor());
    globals.insert("parseInt", native("parseInt", |_, args| parse_int_call(args)));
    globals.insert(
        "parseFloat",
        native("parseFloat", |_, args| {
            Ok(Value::Number(parse_float(&arg(args, 0).to_js_string())))
        }),
    );
    globals.insert(
        "isNaN",
        native("isNaN", |_, args| Ok(Value::Bool(arg(args, 0).to_number()?.is_nan()))),
    );
    globals.insert(
        "isFinite",
        native("isFinite", |_, args| {
            Ok(Value::Bool(arg(args, 0).to_number()?.is_finite()))
        }),
    );
    globals
}

fn native(
    name: &'static str,
    call: impl Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static,
) -> Value {
    Value::function(Function::native(name, call))
}

fn number_fn(name: &'static str, f: fn(f64) -> f64) -> Value {
    native(name, move |_, args| Ok(Value::Number(f(arg(args, 0).to_number()?))))
}

// =============================================================================
// Constructors
// =============================================================================

fn string_constructor() -> Value {
    let raw = Value::function(
        Function::native("raw", |_, args| string_raw(args)).with_intrinsic("String.raw"),
    );
    let from_char_code = native("fromCharCode", |_, args| {
        let units = args
            .iter()
            .map(|a| a.to_number().map(crate::prototype::to_uint16))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::string(String::from_utf16_lossy(&units)))
    });
    Value::function(
        Function::native("String", |_, args| {
            Ok(Value::string(match args.first() {
                Some(v) => v.to_js_string(),
                None => String::new(),
            }))
        })
        .with_intrinsic("String")
        .with_property("raw", raw)
        .with_property("fromCharCode", from_char_code),
    )
}

/// `String.raw`, either as a tag (`String.raw\`...\``) or called with a
/// `{ raw: [...] }` object.
fn string_raw(args: &[Value]) -> Result<Value, EvalError> {
    let strings = arg(args, 0);
    let raw = crate::prototype::get_property(&strings, "raw")?;
    let Value::Array(chunks) = raw else {
        return Err(EvalError::type_error("Cannot convert undefined or null to object"));
    };
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        out.push_str(&chunk.to_js_string());
        if i + 1 < chunks.len()
            && let Some(sub) = args.get(i + 1)
        {
            out.push_str(&sub.to_js_string());
        }
    }
    Ok(Value::string(out))
}

fn number_constructor() -> Value {
    let mut function = Function::native("Number", |_, args| {
        Ok(Value::Number(match args.first() {
            Some(Value::BigInt(n)) => *n as f64,
            Some(v) => v.to_number()?,
            None => 0.0,
        }))
    })
    .with_intrinsic("Number");
    let constants = [
        ("MAX_SAFE_INTEGER", 9_007_199_254_740_991.0),
        ("MIN_SAFE_INTEGER", -9_007_199_254_740_991.0),
        ("EPSILON", f64::EPSILON),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ];
    for (name, value) in constants {
        function = function.with_property(name, Value::Number(value));
    }
    let function = function
        .with_property(
            "isNaN",
            native("isNaN", |_, args| {
                Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_nan())))
            }),
        )
        .with_property(
            "isFinite",
            native("isFinite", |_, args| {
                Ok(Value::Bool(matches!(arg(args, 0), Value::Number(n) if n.is_finite())))
            }),
        )
        .with_property(
            "isInteger",
            native("isInteger", |_, args| {
                Ok(Value::Bool(
                    matches!(arg(args, 0), Value::Number(n) if n.is_finite() && n.fract() == 0.0),
                ))
            }),
        )
        .with_property(
            "isSafeInteger",
            native("isSafeInteger", |_, args| {
                Ok(Value::Bool(matches!(
                    arg(args, 0),
                    Value::Number(n) if n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_991.0
                )))
            }),
        )
        .with_property("parseInt", native("parseInt", |_, args| parse_int_call(args)))
        .with_property(
            "parseFloat",
            native("parseFloat", |_, args| {
                Ok(Value::Number(parse_float(&arg(args, 0).to_js_string())))
            }),
        );
    Value::function(function)
}

fn boolean_constructor() -> Value {
    Value::function(
        Function::native("Boolean", |_, args| Ok(Value::Bool(arg(args, 0).is_truthy())))
            .with_intrinsic("Boolean"),
    )
}

fn bigint_constructor() -> Value {
    Value::function(
        Function::native("BigInt", |_, args| match arg(args, 0) {
            Value::BigInt(n) => Ok(Value::BigInt(n)),
            Value::Bool(b) => Ok(Value::BigInt(i128::from(b))),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => Ok(Value::BigInt(n as i128)),
            Value::Number(n) => Err(EvalError::Range(format!(
                "The number {} cannot be converted to a BigInt because it is not an integer",
                Value::Number(n).to_js_string()
            ))),
            Value::String(s) => s
                .trim()
                .parse::<i128>()
                .map(Value::BigInt)
                .map_err(|_| EvalError::Syntax(format!("Cannot convert {s} to a BigInt"))),
            other => Err(EvalError::type_error(format!(
                "Cannot convert {} to a BigInt",
                other.to_js_string()
            ))),
        })
        .with_intrinsic("BigInt"),
    )
}

fn regexp_constructor() -> Value {
    fn build(args: &[Value]) -> Result<Value, EvalError> {
        let pattern = match arg(args, 0) {
            Value::RegExp(re) => re.pattern.clone(),
            Value::Undefined => "(?:)".to_string(),
            other => other.to_js_string(),
        };
        let flags = match arg(args, 1) {
            Value::Undefined => match arg(args, 0) {
                Value::RegExp(re) => re.flags.clone(),
                _ => String::new(),
            },
            other => other.to_js_string(),
        };
        if let Some(bad) = flags.chars().find(|c| !"dgimsuvy".contains(*c)) {
            return Err(EvalError::Syntax(format!(
                "Invalid flags supplied to RegExp constructor '{bad}'"
            )));
        }
        Ok(Value::RegExp(Rc::new(RegExpValue { pattern, flags })))
    }
    Value::function(
        Function::native("RegExp", |_, args| build(args))
            .with_construct(build)
            .with_intrinsic("RegExp"),
    )
}

fn object_constructor() -> Value {
    Value::function(
        Function::native("Object", |_, args| {
            Ok(match arg(args, 0) {
                v if v.is_nullish() => Value::object(IndexMap::new()),
                v => v,
            })
        })
        .with_construct(|_| Ok(Value::object(IndexMap::new())))
        .with_intrinsic("Object")
        .with_property(
            "keys",
            native("keys", |_, args| {
                Ok(Value::array(
                    own_entries(&arg(args, 0))?
                        .into_iter()
                        .map(|(k, _)| Value::string(k))
                        .collect(),
                ))
            }),
        )
        .with_property(
            "values",
            native("values", |_, args| {
                Ok(Value::array(
                    own_entries(&arg(args, 0))?.into_iter().map(|(_, v)| v).collect(),
                ))
            }),
        )
        .with_property(
            "entries",
            native("entries", |_, args| {
                Ok(Value::array(
                    own_entries(&arg(args, 0))?
                        .into_iter()
                        .map(|(k, v)| Value::array(vec![Value::string(k), v]))
                        .collect(),
                ))
            }),
        )
        .with_property("fromEntries", native("fromEntries", |_, args| from_entries(&arg(args, 0))))
        .with_property("assign", native("assign", |_, args| object_assign(args)))
        .with_property("freeze", native("freeze", |_, args| Ok(arg(args, 0))))
        .with_property("isFrozen", native("isFrozen", |_, _| Ok(Value::Bool(true)))),
    )
}

/// Own enumerable string-keyed properties, in insertion order.
pub fn own_entries(value: &Value) -> Result<Vec<(String, Value)>, EvalError> {
    Ok(match value {
        Value::Undefined | Value::Null => {
            return Err(EvalError::type_error("Cannot convert undefined or null to object"));
        }
        Value::Object(obj) => obj
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        Value::String(s) => s
            .encode_utf16()
            .enumerate()
            .map(|(i, unit)| (i.to_string(), Value::string(String::from_utf16_lossy(&[unit]))))
            .collect(),
        Value::Function(f) => f
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => Vec::new(),
    })
}

fn from_entries(iterable: &Value) -> Result<Value, EvalError> {
    let Value::Array(entries) = iterable else {
        return Err(EvalError::type_error(format!(
            "{} is not iterable",
            iterable.to_js_string()
        )));
    };
    let mut properties = IndexMap::new();
    for entry in entries.iter() {
        let key = crate::prototype::get_property(entry, "0")?.to_property_key();
        let value = crate::prototype::get_property(entry, "1")?;
        properties.insert(key, value);
    }
    Ok(Value::object(properties))
}

/// `Object.assign`. Values are immutable, so the merged object is a copy of
/// the target with every source's own properties applied in order.
pub fn object_assign(args: &[Value]) -> Result<Value, EvalError> {
    let target = arg(args, 0);
    let constructor = target.as_object().and_then(|obj| obj.constructor.clone());
    let intrinsic = target.as_object().and_then(|obj| obj.intrinsic);
    let mut properties: IndexMap<String, Value> = own_entries(&target)?.into_iter().collect();
    for source in args.iter().skip(1) {
        if source.is_nullish() {
            continue;
        }
        properties.extend(own_entries(source)?);
    }
    Ok(Value::Object(Rc::new(JsObject {
        constructor,
        intrinsic,
        ..JsObject::new(properties)
    })))
}

fn array_constructor() -> Value {
    fn build(args: &[Value]) -> Result<Value, EvalError> {
        if let [Value::Number(n)] = args {
            if n.fract() != 0.0 || *n < 0.0 || *n > f64::from(u32::MAX) {
                return Err(EvalError::Range("Invalid array length".into()));
            }
            return Ok(Value::array(vec![Value::Undefined; *n as usize]));
        }
        Ok(Value::array(args.to_vec()))
    }
    Value::function(
        Function::native("Array", |_, args| build(args))
            .with_construct(build)
            .with_intrinsic("Array")
            .with_property(
                "isArray",
                native("isArray", |_, args| Ok(Value::Bool(matches!(arg(args, 0), Value::Array(_))))),
            )
            .with_property("of", native("of", |_, args| Ok(Value::array(args.to_vec()))))
            .with_property("from", native("from", |_, args| array_from(args))),
    )
}

fn array_from(args: &[Value]) -> Result<Value, EvalError> {
    let source = arg(args, 0);
    let items: Vec<Value> = match &source {
        Value::Array(items) => items.to_vec(),
        Value::String(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
        Value::Object(_) => {
            let length = to_integer_or_infinity(&crate::prototype::get_property(&source, "length")?)?;
            let length = if length.is_finite() && length > 0.0 { length as usize } else { 0 };
            (0..length)
                .map(|i| crate::prototype::get_property(&source, &i.to_string()))
                .collect::<Result<_, _>>()?
        }
        v if v.is_nullish() => {
            return Err(EvalError::type_error(format!(
                "{} is not iterable",
                v.to_js_string()
            )));
        }
        _ => Vec::new(),
    };
    match args.get(1) {
        Some(mapper) if !mapper.is_nullish() => Ok(Value::array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    call_value(mapper, &Value::Undefined, &[item, Value::Number(i as f64)])
                })
                .collect::<Result<_, _>>()?,
        )),
        _ => Ok(Value::array(items)),
    }
}

// =============================================================================
// Namespaces
// =============================================================================

fn math_namespace() -> Value {
    let mut properties = IndexMap::new();
    let constants = [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ];
    for (name, value) in constants {
        properties.insert(name.to_string(), Value::Number(value));
    }
    let unary: [(&'static str, fn(f64) -> f64); 18] = [
        ("abs", f64::abs),
        ("ceil", f64::ceil),
        ("floor", f64::floor),
        ("round", js_round),
        ("trunc", f64::trunc),
        ("sign", js_sign),
        ("sqrt", f64::sqrt),
        ("cbrt", f64::cbrt),
        ("log", f64::ln),
        ("log2", f64::log2),
        ("log10", f64::log10),
        ("exp", f64::exp),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("atan", f64::atan),
        ("asin", f64::asin),
        ("acos", f64::acos),
    ];
    for (name, f) in unary {
        properties.insert(name.to_string(), number_fn(name, f));
    }
    properties.insert(
        "max".to_string(),
        native("max", |_, args| {
            let mut result = f64::NEG_INFINITY;
            for a in args {
                let n = a.to_number()?;
                if n.is_nan() {
                    return Ok(Value::Number(f64::NAN));
                }
                result = result.max(n);
            }
            Ok(Value::Number(result))
        }),
    );
    properties.insert(
        "min".to_string(),
        native("min", |_, args| {
            let mut result = f64::INFINITY;
            for a in args {
                let n = a.to_number()?;
                if n.is_nan() {
                    return Ok(Value::Number(f64::NAN));
                }
                result = result.min(n);
            }
            Ok(Value::Number(result))
        }),
    );
    properties.insert(
        "pow".to_string(),
        native("pow", |_, args| {
            crate::js_ops::binary_op(
                rulecheck_syntax::BinaryOperator::Exp,
                &Value::Number(arg(args, 0).to_number()?),
                &Value::Number(arg(args, 1).to_number()?),
            )
        }),
    );
    properties.insert(
        "atan2".to_string(),
        native("atan2", |_, args| {
            Ok(Value::Number(
                arg(args, 0).to_number()?.atan2(arg(args, 1).to_number()?),
            ))
        }),
    );
    properties.insert(
        "hypot".to_string(),
        native("hypot", |_, args| {
            let mut sum = 0.0;
            for a in args {
                let n = a.to_number()?;
                sum += n * n;
            }
            Ok(Value::Number(sum.sqrt()))
        }),
    );
    namespace("Math", properties)
}

fn namespace(name: &'static str, properties: IndexMap<String, Value>) -> Value {
    Value::Object(Rc::new(JsObject {
        intrinsic: Some(name),
        ..JsObject::new(properties)
    }))
}

fn js_round(n: f64) -> f64 {
    if !n.is_finite() || n.fract() == 0.0 {
        return n;
    }
    (n + 0.5).floor()
}

fn js_sign(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 { n } else { n.signum() }
}

fn json_namespace() -> Value {
    let properties = [
        ("stringify", native("stringify", |_, args| json_stringify(args))),
        (
            "parse",
            native("parse", |_, args| {
                let text = arg(args, 0).to_js_string();
                serde_json::from_str::<serde_json::Value>(&text)
                    .map(|json| Value::from_json(&json))
                    .map_err(|err| EvalError::Syntax(format!("{err} in JSON")))
            }),
        ),
    ];
    namespace(
        "JSON",
        properties
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

fn json_stringify(args: &[Value]) -> Result<Value, EvalError> {
    let value = arg(args, 0);
    if matches!(value, Value::BigInt(_)) {
        return Err(EvalError::type_error("Do not know how to serialize a BigInt"));
    }
    let Some(json) = value.to_json() else {
        return Ok(Value::Undefined);
    };
    let indent = match arg(args, 2) {
        Value::Number(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        json.serialize(&mut serializer)
            .map(|()| String::from_utf8_lossy(&out).into_owned())
    };
    text.map(Value::string)
        .map_err(|err| EvalError::type_error(err.to_string()))
}

// =============================================================================
// Number parsing
// =============================================================================

fn parse_int_call(args: &[Value]) -> Result<Value, EvalError> {
    let text = arg(args, 0).to_js_string();
    let radix = match arg(args, 1) {
        Value::Undefined => 0,
        other => rulecheck_syntax::numeric::to_int32(other.to_number()?),
    };
    Ok(Value::Number(parse_int(&text, radix)))
}

/// `parseInt` on an already stringified input.
pub fn parse_int(text: &str, radix: i32) -> f64 {
    let mut rest = text.trim_start();
    let mut sign = 1.0;
    if let Some(stripped) = rest.strip_prefix('-') {
        sign = -1.0;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    let mut radix = radix;
    let mut strip_prefix = true;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return f64::NAN;
        }
        if radix != 16 {
            strip_prefix = false;
        }
    } else {
        radix = 10;
    }
    if strip_prefix && (rest.starts_with("0x") || rest.starts_with("0X")) {
        rest = &rest[2..];
        radix = 16;
    }
    let mut value = 0.0f64;
    let mut any = false;
    for ch in rest.chars() {
        let Some(digit) = ch.to_digit(radix as u32) else {
            break;
        };
        value = value * f64::from(radix) + f64::from(digit);
        any = true;
    }
    if any { sign * value } else { f64::NAN }
}

/// `parseFloat` on an already stringified input.
pub fn parse_float(text: &str) -> f64 {
    let rest = text.trim_start();
    let bytes = rest.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    if rest[end..].starts_with("Infinity") {
        return if rest.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    let mantissa = &rest[digits_start..end];
    if mantissa.is_empty() || mantissa == "." {
        return f64::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    rest[..end].parse::<f64>().unwrap_or(f64::NAN)
}
