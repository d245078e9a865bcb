use super::*;

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn s(text: &str) -> Value {
    Value::string(text)
}

fn number_of(value: Result<Value, EvalError>) -> f64 {
    match value {
        Ok(Value::Number(n)) => n,
        other => panic!("expected number, got {other:?}"),
    }
}

fn bool_of(value: Result<Value, EvalError>) -> bool {
    match value {
        Ok(Value::Bool(b)) => b,
        other => panic!("expected boolean, got {other:?}"),
    }
}

#[test]
fn addition_concatenates_when_either_side_is_a_string() {
    let result = binary_op(BinaryOperator::Add, &num(1.0), &s("2")).unwrap();
    assert_eq!(result.as_str(), Some("12"));
    let result = binary_op(BinaryOperator::Add, &s("a"), &Value::Undefined).unwrap();
    assert_eq!(result.as_str(), Some("aundefined"));
    let result = binary_op(
        BinaryOperator::Add,
        &Value::array(vec![num(1.0), num(2.0)]),
        &s(""),
    )
    .unwrap();
    assert_eq!(result.as_str(), Some("1,2"));
}

#[test]
fn numeric_addition_coerces_booleans_and_null() {
    assert_eq!(number_of(binary_op(BinaryOperator::Add, &Value::Bool(true), &Value::Null)), 1.0);
    assert!(number_of(binary_op(BinaryOperator::Add, &num(1.0), &Value::Undefined)).is_nan());
}

#[test]
fn bigint_arithmetic() {
    let pow = binary_op(BinaryOperator::Exp, &Value::BigInt(2), &Value::BigInt(10)).unwrap();
    assert!(matches!(pow, Value::BigInt(1024)));
    let div = binary_op(BinaryOperator::Div, &Value::BigInt(7), &Value::BigInt(2)).unwrap();
    assert!(matches!(div, Value::BigInt(3)));
    assert!(binary_op(BinaryOperator::Div, &Value::BigInt(1), &Value::BigInt(0)).is_err());
}

#[test]
fn mixing_bigint_and_number_is_a_type_error() {
    let err = binary_op(BinaryOperator::Add, &Value::BigInt(1), &num(1.0)).unwrap_err();
    assert!(matches!(err, EvalError::Type(_)));
    // Comparison across the two is allowed.
    assert!(bool_of(binary_op(BinaryOperator::Lt, &Value::BigInt(1), &num(1.5))));
}

#[test]
fn loose_equality_rules() {
    assert!(loose_equals(&Value::Null, &Value::Undefined).unwrap());
    assert!(loose_equals(&s("1"), &num(1.0)).unwrap());
    assert!(loose_equals(&num(0.0), &s("")).unwrap());
    assert!(loose_equals(&Value::Bool(true), &s("1")).unwrap());
    assert!(!loose_equals(&Value::Null, &num(0.0)).unwrap());
    assert!(!loose_equals(&num(f64::NAN), &num(f64::NAN)).unwrap());
}

#[test]
fn strict_equality_uses_identity_for_objects() {
    let array = Value::array(vec![num(1.0)]);
    assert!(strict_equals(&array, &array.clone()));
    assert!(!strict_equals(&array, &Value::array(vec![num(1.0)])));
    assert!(same_value_zero(&num(f64::NAN), &num(f64::NAN)));
}

#[test]
fn relational_comparison() {
    assert!(bool_of(binary_op(BinaryOperator::Lt, &s("a"), &s("b"))));
    assert!(bool_of(binary_op(BinaryOperator::Gt, &s("10"), &num(9.0))));
    assert!(!bool_of(binary_op(BinaryOperator::Lt, &num(f64::NAN), &num(1.0))));
    assert!(!bool_of(binary_op(BinaryOperator::LtEq, &num(1.0), &num(f64::NAN))));
    assert!(bool_of(binary_op(BinaryOperator::GtEq, &num(2.0), &num(2.0))));
}

#[test]
fn bitwise_operators_use_int32() {
    assert_eq!(
        number_of(binary_op(BinaryOperator::UShr, &num(-1.0), &num(0.0))),
        4_294_967_295.0
    );
    assert_eq!(
        number_of(binary_op(BinaryOperator::Shl, &num(1.0), &num(31.0))),
        -2_147_483_648.0
    );
    assert_eq!(number_of(binary_op(BinaryOperator::BitOr, &num(5.7), &num(0.0))), 5.0);
    assert_eq!(number_of(unary_op(UnaryOperator::BitNot, &num(0.0))), -1.0);
}

#[test]
fn remainder_and_exponent_edge_cases() {
    assert_eq!(number_of(binary_op(BinaryOperator::Rem, &num(5.5), &num(2.0))), 1.5);
    assert!(number_of(binary_op(BinaryOperator::Rem, &num(1.0), &num(0.0))).is_nan());
    assert!(number_of(binary_op(BinaryOperator::Exp, &num(1.0), &num(f64::INFINITY))).is_nan());
    assert_eq!(number_of(binary_op(BinaryOperator::Exp, &num(2.0), &num(-1.0))), 0.5);
}

#[test]
fn typeof_and_void() {
    assert_eq!(unary_op(UnaryOperator::Typeof, &Value::Null).unwrap().as_str(), Some("object"));
    assert_eq!(unary_op(UnaryOperator::Typeof, &Value::BigInt(1)).unwrap().as_str(), Some("bigint"));
    assert!(matches!(unary_op(UnaryOperator::Void, &num(1.0)), Ok(Value::Undefined)));
    assert!(unary_op(UnaryOperator::Delete, &num(1.0)).is_err());
}

#[test]
fn in_operator_checks_own_keys() {
    let object = Value::from_entries([("a", num(1.0))]);
    assert!(bool_of(binary_op(BinaryOperator::In, &s("a"), &object)));
    assert!(!bool_of(binary_op(BinaryOperator::In, &s("b"), &object)));
    assert!(binary_op(BinaryOperator::In, &s("a"), &s("abc")).is_err());
}
