use super::*;
use crate::modules::ModuleRegistry;
use crate::worker::Flavor;
use rulecheck_eval::ResolvedExpression;
use std::path::PathBuf;
use std::sync::Arc;

fn runner() -> RuleRunner {
    let host = ModuleHost::new(Arc::new(ModuleRegistry::new()), PathBuf::from("/"), Flavor::Native);
    RuleRunner::new(host, "input.js".to_string())
}

fn expression(value: Value) -> ResolvedExpression {
    ResolvedExpression::from_value(&value).unwrap()
}

fn json(value: Option<&Value>) -> Option<Json> {
    value.and_then(Value::to_json)
}

#[test]
fn constructor_defaults_then_literals_then_deferred() {
    let defaults = Value::from_entries([
        ("filename", Value::string("default.js")),
        ("settings", Value::from_entries([("shared", Value::Bool(true))])),
    ]);
    let config = TestCaseConfig::new("foo;")
        .with_field("filename", Json::from("case.js"))
        .with_deferred("filename", expression(Value::string("ignored.js")))
        .with_deferred("options", expression(Value::array(vec![Value::Number(2.0)])))
        .with_constructor(expression(defaults));

    let resolved = runner().resolve_config(&config);
    assert_eq!(json(resolved.get("code")), Some(Json::from("foo;")));
    assert_eq!(json(resolved.get("filename")), Some(Json::from("case.js")));
    assert_eq!(json(resolved.get("options")), Some(serde_json::json!([2])));
    assert_eq!(json(resolved.get("settings")), Some(serde_json::json!({ "shared": true })));
}

#[test]
fn undeterminable_deferred_properties_are_left_out() {
    let module = rulecheck_syntax::ParsedModule::parse("/p/case.js", "missing();").unwrap();
    let [statement] = module.statements() else {
        panic!("expected one statement");
    };
    let Some(rulecheck_syntax::NodeKind::ExpressionStatement { expression: call }) =
        module.arena.kind(*statement)
    else {
        panic!("expected an expression statement");
    };
    let residual = rulecheck_eval::resolve_expression(&module, *call, std::path::Path::new("/p/case.js"));

    let config = TestCaseConfig::new("x;").with_deferred("options", residual);
    let resolved = runner().resolve_config(&config);
    assert!(resolved.get("options").is_none());
    assert_eq!(resolved.len(), 1);
}

#[test]
fn rule_failures_carry_their_location() {
    let failure = RuleFailure {
        error: RuleError::FixWithoutFixable,
        rule_id: "test/no-foo".to_string(),
        filename: "input.js".to_string(),
        line: Some(3),
    };
    let error = WorkerError::from(failure);
    assert!(error.message.starts_with("Fixable rules must set"));
    assert_eq!(error.property("ruleId"), Some(&Json::from("test/no-foo")));
    assert_eq!(error.property("filename"), Some(&Json::from("input.js")));
    assert_eq!(error.property("line"), Some(&Json::from(3)));
}

#[test]
fn thrown_errors_keep_their_properties() {
    let mut properties = IndexMap::new();
    properties.insert("code".to_string(), Json::from("E_RULE"));
    let error = WorkerError::from(RuleError::Thrown {
        message: "boom".to_string(),
        properties,
    });
    assert_eq!(error.message, "boom");
    assert_eq!(error.property("code"), Some(&Json::from("E_RULE")));
}

#[test]
fn unknown_rules_fail_the_run() {
    let args = CallArgs {
        rule_name: "missing".to_string(),
        rule_address: "/p/missing.js".to_string(),
        config: TestCaseConfig::new("x;"),
    };
    let error = runner().run(&args).unwrap_err();
    assert_eq!(error.message, "Cannot find rule '/p/missing.js'");
}
