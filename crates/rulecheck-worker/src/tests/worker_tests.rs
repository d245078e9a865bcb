use super::*;

#[test]
fn flavor_follows_the_extension() {
    assert_eq!(Flavor::for_address("/p/rule.ts"), Flavor::Transpiled);
    assert_eq!(Flavor::for_address("/p/rule.mts"), Flavor::Transpiled);
    assert_eq!(Flavor::for_address("/p/rule.cts"), Flavor::Transpiled);
    assert_eq!(Flavor::for_address("/p/rule.js"), Flavor::Native);
    assert_eq!(Flavor::for_address("/p/rule.tsx"), Flavor::Native);
    assert!(Flavor::Transpiled.allows_typescript());
    assert!(!Flavor::Native.allows_typescript());
}

#[test]
fn panic_payloads_become_messages() {
    assert_eq!(panic_message(Box::new("boom")), "boom");
    assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
    assert_eq!(panic_message(Box::new(42_u8)), "worker panicked");
}

#[test]
fn terminated_handles_refuse_calls() {
    let handle = WorkerHandle::spawn(
        WorkerId(7),
        Flavor::Native,
        PathBuf::from("/"),
        Arc::new(ModuleRegistry::new()),
        &PoolConfig::default(),
    )
    .unwrap();
    assert_eq!(handle.id().to_string(), "#7");
    handle.terminate();
    assert!(handle.is_terminated());

    let args = CallArgs {
        rule_name: "r".to_string(),
        rule_address: "/r.js".to_string(),
        config: crate::protocol::TestCaseConfig::new("x;"),
    };
    assert!(matches!(
        handle.call(args, None),
        Err(ServiceError::Terminated(WorkerId(7)))
    ));
}
