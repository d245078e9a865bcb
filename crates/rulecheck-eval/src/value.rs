//! Runtime values shared by both evaluation stages.
//!
//! Values are immutable once built. Arrays, objects and functions are
//! reference counted, so cloning a value is cheap and never deep-copies.

use crate::error::EvalError;
use indexmap::IndexMap;
use rulecheck_syntax::numeric::format_number;
use std::fmt;
use std::rc::Rc;

pub type NativeCall = dyn Fn(&Value, &[Value]) -> Result<Value, EvalError>;
pub type NativeConstruct = dyn Fn(&[Value]) -> Result<Value, EvalError>;

/// A host-provided callable.
pub struct Function {
    pub name: String,
    /// Identifies builtins (`"Array"`, `"String.raw"`, ...).
    pub intrinsic: Option<&'static str>,
    pub properties: IndexMap<String, Value>,
    call: Option<Rc<NativeCall>>,
    construct: Option<Rc<NativeConstruct>>,
}

impl Function {
    pub fn native(
        name: impl Into<String>,
        call: impl Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Function {
        Function {
            name: name.into(),
            intrinsic: None,
            properties: IndexMap::new(),
            call: Some(Rc::new(call)),
            construct: None,
        }
    }

    /// A function that can only be used with `new`.
    pub fn constructor_only(
        name: impl Into<String>,
        construct: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Function {
        Function {
            name: name.into(),
            intrinsic: None,
            properties: IndexMap::new(),
            call: None,
            construct: Some(Rc::new(construct)),
        }
    }

    pub fn with_construct(
        mut self,
        construct: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Function {
        self.construct = Some(Rc::new(construct));
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Function {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_intrinsic(mut self, id: &'static str) -> Function {
        self.intrinsic = Some(id);
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.construct.is_some()
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, EvalError> {
        match &self.call {
            Some(call) => call(this, args),
            None => Err(EvalError::type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                self.name
            ))),
        }
    }

    pub fn construct(&self, args: &[Value]) -> Result<Value, EvalError> {
        match &self.construct {
            Some(construct) => construct(args),
            None => Err(EvalError::type_error(format!(
                "{} is not a constructor",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("intrinsic", &self.intrinsic)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Default)]
pub struct JsObject {
    pub properties: IndexMap<String, Value>,
    /// Constructor that created this object, for `instanceof`.
    pub constructor: Option<Rc<Function>>,
    /// Identifies builtin namespaces (`"Math"`, `"JSON"`).
    pub intrinsic: Option<&'static str>,
}

impl JsObject {
    /// A plain object. Keys are put in JavaScript own-key order: array
    /// indices ascending, then the other keys in insertion order.
    pub fn new(properties: IndexMap<String, Value>) -> JsObject {
        JsObject {
            properties: own_key_order(properties),
            constructor: None,
            intrinsic: None,
        }
    }

    /// Whether missing keys are known to be absent. Builtin namespaces and
    /// instances of host constructors have members this model cannot see.
    pub fn is_plain(&self) -> bool {
        self.intrinsic.is_none() && self.constructor.is_none()
    }
}

/// Canonical array index (`"0"`, `"17"`, but not `"01"` or `"-1"`).
pub fn is_array_index(key: &str) -> bool {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return false;
    }
    key.bytes().all(|b| b.is_ascii_digit()) && key.parse::<u32>().is_ok_and(|n| n != u32::MAX)
}

fn own_key_order(properties: IndexMap<String, Value>) -> IndexMap<String, Value> {
    if !properties.keys().any(|key| is_array_index(key)) {
        return properties;
    }
    let (mut indices, names): (Vec<_>, Vec<_>) = properties
        .into_iter()
        .partition(|(key, _)| is_array_index(key));
    indices.sort_by_key(|(key, _)| key.parse::<u32>().unwrap_or(u32::MAX));
    indices.into_iter().chain(names).collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegExpValue {
    pub pattern: String,
    pub flags: String,
}

#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(Rc<str>),
    RegExp(Rc<RegExpValue>),
    Array(Rc<Vec<Value>>),
    Object(Rc<JsObject>),
    Function(Rc<Function>),
}

impl Value {
    pub fn string(value: impl Into<Rc<str>>) -> Value {
        Value::String(value.into())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(items))
    }

    pub fn object(properties: IndexMap<String, Value>) -> Value {
        Value::Object(Rc::new(JsObject::new(properties)))
    }

    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn function(function: Function) -> Value {
        Value::Function(Rc::new(function))
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::RegExp(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// ToBoolean
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !(n.is_nan() || *n == 0.0),
            Value::BigInt(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            Value::RegExp(_) | Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Value::RegExp(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// ToPrimitive with the default hint. Plain objects and arrays have no
    /// custom `valueOf`, so this is their string form.
    pub fn to_primitive(&self) -> Value {
        if self.is_primitive() {
            self.clone()
        } else {
            Value::string(self.to_js_string())
        }
    }

    /// ToNumber
    pub fn to_number(&self) -> Result<f64, EvalError> {
        Ok(match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::BigInt(_) => {
                return Err(EvalError::type_error(
                    "Cannot convert a BigInt value to a number",
                ));
            }
            Value::String(s) => string_to_number(s),
            _ => string_to_number(&self.to_js_string()),
        })
    }

    /// ToString
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::BigInt(n) => n.to_string(),
            Value::String(s) => s.to_string(),
            Value::RegExp(re) => format!("/{}/{}", re.pattern, re.flags),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name),
        }
    }

    /// ToPropertyKey
    pub fn to_property_key(&self) -> String {
        self.to_js_string()
    }

    /// JSON form, following `JSON.stringify`: `undefined` and functions are
    /// dropped from objects and become `null` in arrays; non-finite numbers
    /// become `null`. Returns `None` where `JSON.stringify` would produce
    /// nothing or throw (top-level `undefined`, functions, bigints).
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Undefined | Value::Function(_) | Value::BigInt(_) => return None,
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::RegExp(_) => serde_json::Value::Object(serde_json::Map::new()),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    match item {
                        Value::Undefined | Value::Function(_) => out.push(serde_json::Value::Null),
                        Value::BigInt(_) => return None,
                        other => out.push(other.to_json()?),
                    }
                }
                serde_json::Value::Array(out)
            }
            Value::Object(obj) => {
                let mut out = serde_json::Map::new();
                for (key, value) in &obj.properties {
                    match value {
                        Value::Undefined | Value::Function(_) => {}
                        Value::BigInt(_) => return None,
                        other => {
                            out.insert(key.clone(), other.to_json()?);
                        }
                    }
                }
                serde_json::Value::Object(out)
            }
        })
    }

    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn is_js_whitespace(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{feff}'
}

/// StringToNumber
pub fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let bytes = trimmed.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' {
        let radix = match bytes[1] {
            b'x' | b'X' => 16,
            b'o' | b'O' => 8,
            b'b' | b'B' => 2,
            _ => 0,
        };
        if radix != 0 {
            return u128::from_str_radix(&trimmed[2..], radix)
                .map(|v| v as f64)
                .unwrap_or(f64::NAN);
        }
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        && trimmed.chars().any(|c| c.is_ascii_digit());
    if !valid {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}
