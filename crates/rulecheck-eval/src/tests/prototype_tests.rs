use super::*;

fn call_method(target: &Value, name: &str, args: &[Value]) -> Value {
    let method = get_property(target, name).unwrap();
    call_value(&method, target, args).unwrap()
}

fn text(value: &Value) -> &str {
    value.as_str().expect("string value")
}

#[test]
fn string_length_and_indexing_use_utf16_units() {
    let s = Value::string("a😀");
    assert_eq!(get_property(&s, "length").unwrap().as_number(), Some(3.0));
    assert_eq!(text(&get_property(&s, "0").unwrap()), "a");
    assert!(matches!(get_property(&s, "7").unwrap(), Value::Undefined));
}

#[test]
fn string_methods() {
    let s = Value::string("Hello, World");
    assert_eq!(text(&call_method(&s, "toUpperCase", &[])), "HELLO, WORLD");
    assert_eq!(
        text(&call_method(&s, "slice", &[Value::Number(-5.0)])),
        "World"
    );
    assert_eq!(
        text(&call_method(&s, "substring", &[Value::Number(5.0), Value::Number(0.0)])),
        "Hello"
    );
    assert_eq!(
        call_method(&s, "indexOf", &[Value::string("o")]).as_number(),
        Some(4.0)
    );
    assert_eq!(
        call_method(&s, "lastIndexOf", &[Value::string("o")]).as_number(),
        Some(8.0)
    );
    assert!(call_method(&s, "startsWith", &[Value::string("Hell")]).is_truthy());
    assert_eq!(
        text(&call_method(&Value::string("5"), "padStart", &[Value::Number(3.0), Value::string("0")])),
        "005"
    );
    assert_eq!(
        text(&call_method(&Value::string("a-b-c"), "replaceAll", &[Value::string("-"), Value::string("+")])),
        "a+b+c"
    );
}

#[test]
fn split_and_join() {
    let parts = call_method(&Value::string("a,b,,c"), "split", &[Value::string(",")]);
    assert_eq!(parts.as_array().map(<[Value]>::len), Some(4));
    let joined = call_method(&parts, "join", &[Value::string("|")]);
    assert_eq!(text(&joined), "a|b||c");
}

#[test]
fn array_methods_with_native_callbacks() {
    let array = Value::array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
    let double = Value::function(Function::native("double", |_, args| {
        Ok(Value::Number(arg(args, 0).to_number()? * 2.0))
    }));
    let doubled = call_method(&array, "map", &[double]);
    assert_eq!(doubled.to_json(), Some(serde_json::json!([2, 4, 6])));

    let is_odd = Value::function(Function::native("isOdd", |_, args| {
        Ok(Value::Bool(arg(args, 0).to_number()? % 2.0 == 1.0))
    }));
    let odd = call_method(&array, "filter", &[is_odd]);
    assert_eq!(odd.to_json(), Some(serde_json::json!([1, 3])));

    let sum = Value::function(Function::native("sum", |_, args| {
        Ok(Value::Number(arg(args, 0).to_number()? + arg(args, 1).to_number()?))
    }));
    assert_eq!(call_method(&array, "reduce", &[sum]).as_number(), Some(6.0));
}

#[test]
fn array_includes_uses_same_value_zero() {
    let array = Value::array(vec![Value::Number(f64::NAN)]);
    assert!(call_method(&array, "includes", &[Value::Number(f64::NAN)]).is_truthy());
    assert_eq!(
        call_method(&array, "indexOf", &[Value::Number(f64::NAN)]).as_number(),
        Some(-1.0)
    );
}

#[test]
fn reading_from_nullish_is_an_error() {
    assert!(get_property(&Value::Undefined, "a").is_err());
    assert!(get_property(&Value::Null, "length").is_err());
}

#[test]
fn number_to_string_with_radix() {
    let n = Value::Number(255.0);
    assert_eq!(text(&call_method(&n, "toString", &[Value::Number(16.0)])), "ff");
    assert_eq!(text(&call_method(&Value::Number(1.5), "toFixed", &[Value::Number(2.0)])), "1.50");
}

#[test]
fn unmodeled_members_are_unknown() {
    let is_unknown = |target: &Value, key: &str| {
        matches!(get_property(target, key), Err(EvalError::UnknownProperty(_)))
    };
    assert!(is_unknown(&Value::array(Vec::new()), "sort"));
    assert!(is_unknown(&Value::string("a"), "localeCompare"));
    assert!(is_unknown(&Value::Number(1.0), "toPrecision"));
    assert!(is_unknown(&Value::Bool(true), "flag"));
    assert!(is_unknown(&crate::globals::global("Math").unwrap(), "random"));
    assert!(is_unknown(&crate::globals::global("Number").unwrap(), "isInteger"));

    let plain = Value::from_entries([("a", Value::Null)]);
    assert!(is_unknown(&plain, "constructor"));
    assert!(matches!(get_property(&plain, "b"), Ok(Value::Undefined)));
}
