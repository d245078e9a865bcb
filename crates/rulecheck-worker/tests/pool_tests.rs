use rulecheck_worker::{
    Fix, Fixable, PoolConfig, Report, Rule, RuleContext, RuleError, RuleMeta, RuleVisitor,
    ServiceError, TestCaseConfig, VisitorMap, WorkerPool,
};
use rulecheck_worker::{ModuleRegistry, RestartMode};
use rulecheck_syntax::NodeKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const BAN: &str = "/virtual/pkg/ban.js";

/// Reports and fixes every `bad` identifier.
struct Ban;

impl Rule for Ban {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new()
            .with_message("banned", "'{{name}}' is banned.")
            .fixable(Fixable::Code)
    }

    fn create(&self, _context: &RuleContext<'_>) -> Result<Box<dyn RuleVisitor>, RuleError> {
        Ok(Box::new(VisitorMap::new().on("Identifier", |node, context| {
            match node.kind {
                NodeKind::Identifier { name } if name == "bad" => context.report(
                    Report::message_id(node.span, "banned")
                        .with_data("name", name.clone())
                        .with_fix(Fix::replace(node.span, "ok")),
                ),
                _ => Ok(()),
            }
        })))
    }
}

struct Panics;

impl Rule for Panics {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new()
    }

    fn create(&self, _context: &RuleContext<'_>) -> Result<Box<dyn RuleVisitor>, RuleError> {
        panic!("boom")
    }
}

struct Throws;

impl Rule for Throws {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new()
    }

    fn create(&self, _context: &RuleContext<'_>) -> Result<Box<dyn RuleVisitor>, RuleError> {
        Err(RuleError::thrown("boom"))
    }
}

struct Sleeps;

impl Rule for Sleeps {
    fn meta(&self) -> RuleMeta {
        RuleMeta::new()
    }

    fn create(&self, _context: &RuleContext<'_>) -> Result<Box<dyn RuleVisitor>, RuleError> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(Box::new(VisitorMap::new()))
    }
}

fn counting_registry(calls: &Arc<AtomicUsize>) -> ModuleRegistry {
    let counter = Arc::clone(calls);
    let mut registry = ModuleRegistry::new();
    registry
        .register_rule(BAN, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(Ban)
        })
        .register_rule("/virtual/pkg/panics.js", || Box::new(Panics))
        .register_rule("/virtual/pkg/throws.js", || Box::new(Throws))
        .register_rule("/virtual/pkg/sleeps.js", || Box::new(Sleeps));
    registry
}

fn no_restarts() -> PoolConfig {
    PoolConfig {
        restart_window_ms: 0,
        ..PoolConfig::default()
    }
}

#[test]
fn quick_reanalysis_restarts_the_worker() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(counting_registry(&calls), PoolConfig::default());

    let first = pool.service(BAN).unwrap();
    let result = first.call("ban", BAN, TestCaseConfig::new("bad;")).unwrap();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = pool.service(BAN).unwrap();
    assert_ne!(second.worker_id(), first.worker_id());
    assert_eq!(pool.restart_count(), 1);
    second.call("ban", BAN, TestCaseConfig::new("bad;")).unwrap();
    // The fresh worker has an empty rule cache.
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert!(matches!(
        first.call("ban", BAN, TestCaseConfig::new("bad;")),
        Err(ServiceError::Terminated(_))
    ));
}

#[test]
fn workers_are_reused_outside_the_window() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(counting_registry(&calls), no_restarts());

    let first = pool.service(BAN).unwrap();
    first.call("ban", BAN, TestCaseConfig::new("bad;")).unwrap();
    let second = pool.service(BAN).unwrap();
    second.call("ban", BAN, TestCaseConfig::new("x;")).unwrap();

    assert_eq!(second.worker_id(), first.worker_id());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(pool.restart_count(), 0);
}

#[test]
fn after_window_mode_waits_for_the_window() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = PoolConfig {
        restart_window_ms: 100,
        restart_mode: RestartMode::AfterWindow,
        ..PoolConfig::default()
    };
    let pool = WorkerPool::new(counting_registry(&calls), config);

    let first = pool.service(BAN).unwrap();
    assert_eq!(pool.service(BAN).unwrap().worker_id(), first.worker_id());
    std::thread::sleep(Duration::from_millis(150));
    assert_ne!(pool.service(BAN).unwrap().worker_id(), first.worker_id());
}

#[test]
fn workers_are_keyed_by_package_and_flavor() {
    let pool = WorkerPool::new(ModuleRegistry::new(), no_restarts());
    let a = pool.service("/virtual/a/rule.js").unwrap();
    let a_ts = pool.service("/virtual/a/rule.ts").unwrap();
    let b = pool.service("/virtual/b/rule.js").unwrap();
    let a_again = pool.service("/virtual/a/other.js").unwrap();

    assert_ne!(a.worker_id(), a_ts.worker_id());
    assert_ne!(a.worker_id(), b.worker_id());
    assert_eq!(a.worker_id(), a_again.worker_id());
    assert_eq!(pool.worker_count(), 3);

    pool.shutdown();
    assert_eq!(pool.worker_count(), 0);
}

#[test]
fn rule_errors_come_back_as_worker_errors() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(counting_registry(&calls), no_restarts());

    for address in ["/virtual/pkg/panics.js", "/virtual/pkg/throws.js"] {
        let service = pool.service(address).unwrap();
        match service.call("boom", address, TestCaseConfig::new("x;")) {
            Err(ServiceError::Worker(error)) => assert_eq!(error.message, "boom"),
            other => panic!("expected a worker error, got {other:?}"),
        }
    }

    // The worker survives a panicking rule.
    let service = pool.service(BAN).unwrap();
    let result = service.call("ban", BAN, TestCaseConfig::new("bad;")).unwrap();
    assert_eq!(result.fixed_output(), Some("ok;"));
    assert_eq!(pool.worker_count(), 1);
}

#[test]
fn linter_service_swallows_failures() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(counting_registry(&calls), no_restarts());

    let linter = pool.linter_service("ban", BAN);
    let result = linter.linter_result(TestCaseConfig::new("let bad = 1;")).unwrap();
    assert_eq!(result.diagnostics[0].message, "'bad' is banned.");
    assert_eq!(result.diagnostics[0].rule_id.as_deref(), Some("test/ban"));
    assert_eq!(result.output, Some(Some("let ok = 1;".to_string())));

    let failing = pool.linter_service("throws", "/virtual/pkg/throws.js");
    assert!(failing.linter_result(TestCaseConfig::new("x;")).is_none());

    let unknown = pool.linter_service("missing", "/virtual/pkg/missing.js");
    assert!(unknown.linter_result(TestCaseConfig::new("x;")).is_none());
}

#[test]
fn timed_out_workers_are_replaced() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = PoolConfig {
        call_timeout_ms: Some(20),
        ..no_restarts()
    };
    let pool = WorkerPool::new(counting_registry(&calls), config);
    let address = "/virtual/pkg/sleeps.js";

    let service = pool.service(address).unwrap();
    assert!(matches!(
        service.call("sleeps", address, TestCaseConfig::new("x;")),
        Err(ServiceError::TimedOut { .. })
    ));
    assert_eq!(pool.worker_count(), 0);

    let replacement = pool.service(address).unwrap();
    assert_ne!(replacement.worker_id(), service.worker_id());
    assert!(pool.linter_service("sleeps", address).linter_result(TestCaseConfig::new("x;")).is_none());
}

#[test]
fn pools_leave_the_global_subscriber_to_the_host() {
    let pool = WorkerPool::new(ModuleRegistry::new(), no_restarts());
    pool.service(BAN).unwrap();
    assert!(!tracing::dispatcher::has_been_set());
}
