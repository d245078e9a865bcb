use rulecheck_eval::{ResolvedExpression, Value, resolve_expression};
use rulecheck_syntax::{NodeIndex, NodeKind, ParsedModule};
use rulecheck_worker::{
    ModuleRegistry, PoolConfig, Report, Rule, RuleContext, RuleError, RuleMeta, RuleVisitor,
    ServiceError, TestCaseConfig, VisitorMap, WorkerPool,
};
use rulecheck_common::Span;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const RULE: &str = "/virtual/pkg/describe.js";
const TEST_FILE: &str = "/virtual/pkg/describe.test.js";

/// Reports what the rule was configured with, once per file.
struct Describe;

impl Rule for Describe {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new()
    }

    fn create(&self, _context: &RuleContext<'_>) -> Result<Box<dyn RuleVisitor>, RuleError> {
        Ok(Box::new(VisitorMap::new().on("Program", |node, context| {
            let options = Value::array(context.options.to_vec()).to_json();
            let settings = context.settings.to_json();
            let source_type = context
                .language_options
                .as_object()
                .and_then(|object| object.properties.get("sourceType"))
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            let text = format!(
                "{} options={} settings={} sourceType={source_type}",
                context.filename,
                options.unwrap_or_default(),
                settings.unwrap_or_default()
            );
            context.report(Report::message(Span::empty_at(node.span.pos), text))
        })))
    }
}

fn pool() -> WorkerPool {
    let mut registry = ModuleRegistry::new();
    registry
        .register_rule(RULE, || Box::new(Describe))
        .register_module("virtual:limits", || {
            Value::from_entries([
                ("default", Value::array(vec![Value::Number(3.0)])),
                ("strict", Value::Bool(true)),
            ])
        });
    let config = PoolConfig {
        restart_window_ms: 0,
        ..PoolConfig::default()
    };
    WorkerPool::new(registry, config)
}

/// The residual of the last variable initializer in `source`.
fn deferred(source: &str) -> ResolvedExpression {
    let module = ParsedModule::parse(TEST_FILE, source).unwrap();
    let mut init = NodeIndex::NONE;
    for &stmt in module.statements() {
        if let Some(NodeKind::VariableDeclaration { declarations, .. }) = module.arena.kind(stmt) {
            for &declarator in declarations {
                if let Some(NodeKind::VariableDeclarator { init: found, .. }) = module.arena.kind(declarator) {
                    init = *found;
                }
            }
        }
    }
    resolve_expression(&module, init, Path::new(TEST_FILE))
}

fn describe(config: TestCaseConfig) -> String {
    let result = pool()
        .linter_service("describe", RULE)
        .linter_result(config)
        .unwrap();
    assert_eq!(result.diagnostics.len(), 1);
    result.diagnostics[0].message.clone()
}

#[test]
fn defaults_apply_without_config() {
    assert_eq!(describe(TestCaseConfig::new("x;")), "input.js options=[] settings={} sourceType=module");
}

#[test]
fn deferred_properties_load_modules_in_the_worker() {
    let options = deferred("import limits from 'virtual:limits';\nconst options = limits;");
    let settings = deferred("import { strict } from 'virtual:limits';\nconst settings = { strict };");
    let config = TestCaseConfig::new("x;")
        .with_deferred("options", options)
        .with_deferred("settings", settings);
    assert_eq!(
        describe(config),
        r#"input.js options=[3] settings={"strict":true} sourceType=module"#
    );
}

#[test]
fn constructor_config_supplies_defaults() {
    let constructor = deferred("const config = { settings: { shared: 1 }, filename: 'base.js' };");
    let config = TestCaseConfig::new("x;")
        .with_field("filename", serde_json::json!("case.js"))
        .with_constructor(constructor);
    assert_eq!(describe(config), r#"case.js options=[] settings={"shared":1} sourceType=module"#);
}

#[test]
fn language_options_override_the_defaults() {
    let config = TestCaseConfig::new("x;")
        .with_field("languageOptions", serde_json::json!({ "sourceType": "script" }));
    assert_eq!(describe(config), "input.js options=[] settings={} sourceType=script");
}

#[test]
fn invalid_code_is_a_worker_error() {
    let config = TestCaseConfig::default().with_field("code", serde_json::json!(42));
    let pool = pool();
    let service = pool.service(RULE).unwrap();
    let error = service.call("describe", RULE, config).unwrap_err();
    assert_eq!(error.to_string(), "Invalid test case config: `code` must be a string");
}

#[test]
fn parse_errors_are_reported_as_diagnostics() {
    let result = pool()
        .linter_service("describe", RULE)
        .linter_result(TestCaseConfig::new("let = ;"))
        .unwrap();
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].message.starts_with("Parsing error: "));
    assert_eq!(result.diagnostics[0].rule_id, None);
}

#[test]
fn a_panicking_module_load_can_be_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = ModuleRegistry::new();
    registry
        .register_rule(RULE, || Box::new(Describe))
        .register_module("virtual:flaky", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first load fails");
            }
            Value::from_entries([("default", Value::string("x;"))])
        });
    let pool = WorkerPool::new(
        registry,
        PoolConfig {
            restart_window_ms: 0,
            ..PoolConfig::default()
        },
    );
    let service = pool.service(RULE).unwrap();
    let config = || {
        TestCaseConfig::default()
            .with_deferred("code", deferred("import code from 'virtual:flaky';\nconst source = code;"))
    };

    match service.call("describe", RULE, config()) {
        Err(ServiceError::Worker(error)) => assert_eq!(error.message, "first load fails"),
        other => panic!("expected a worker error, got {other:?}"),
    }
    let result = service.call("describe", RULE, config()).unwrap();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
