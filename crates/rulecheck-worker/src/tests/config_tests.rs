use super::*;
use std::collections::HashMap;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn defaults() {
    let config = PoolConfig::default();
    assert_eq!(config.restart_window(), Duration::from_millis(1000));
    assert_eq!(config.restart_mode, RestartMode::WithinWindow);
    assert_eq!(config.call_timeout(), None);
    assert_eq!(config.default_filename, "input.js");
    assert_eq!(config.worker_stack_size, None);
}

#[test]
fn parses_partial_camel_case_json() {
    let config = PoolConfig::parse(r#"{ "restartWindowMs": 250, "restartMode": "after-window" }"#).unwrap();
    assert_eq!(config.restart_window_ms, 250);
    assert_eq!(config.restart_mode, RestartMode::AfterWindow);
    assert_eq!(config.default_filename, "input.js");

    assert!(PoolConfig::parse(r#"{ "restartMode": "sometimes" }"#).is_err());
}

#[test]
fn environment_overrides_file_values() {
    let config = PoolConfig::default()
        .with_overrides(lookup(&[
            (ENV_RESTART_WINDOW_MS, " 40 "),
            (ENV_RESTART_MODE, "After"),
            (ENV_CALL_TIMEOUT_MS, "1500"),
        ]))
        .unwrap();
    assert_eq!(config.restart_window_ms, 40);
    assert_eq!(config.restart_mode, RestartMode::AfterWindow);
    assert_eq!(config.call_timeout(), Some(Duration::from_millis(1500)));

    let config = config
        .with_overrides(lookup(&[(ENV_CALL_TIMEOUT_MS, "off")]))
        .unwrap();
    assert_eq!(config.call_timeout(), None);
}

#[test]
fn invalid_environment_values_are_reported() {
    let err = PoolConfig::default()
        .with_overrides(lookup(&[(ENV_RESTART_WINDOW_MS, "soon")]))
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidEnv { name: ENV_RESTART_WINDOW_MS, ref value } if value == "soon"
    ));
}

#[test]
fn loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rulecheck.json");
    std::fs::write(&path, r#"{ "callTimeoutMs": 20, "defaultFilename": "case.ts" }"#).unwrap();
    let config = PoolConfig::load(&path).unwrap();
    assert_eq!(config.call_timeout(), Some(Duration::from_millis(20)));
    assert_eq!(config.default_filename, "case.ts");

    let missing = PoolConfig::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, ConfigError::Read { .. }));
}
