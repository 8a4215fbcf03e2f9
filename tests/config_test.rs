use std::collections::HashMap;
use std::time::Duration;

use orchestrator::config::Config;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_when_unset() {
    let config = Config::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config.bind_addr.port(), 5000);
    assert_eq!(config.services_file.to_str(), Some("services.toml"));
    assert_eq!(config.workers, 1);
    assert_eq!(config.backend_timeout, Duration::from_secs(3600));
    assert_eq!(config.retention_warn_threshold, Some(10_000));
    assert!(config.otel_endpoint.is_none());
    assert_eq!(config.log_level, "info");
}

#[test]
fn values_are_read_from_lookup() {
    let config = Config::from_lookup(lookup(&[
        ("ORCH_BIND_ADDR", "127.0.0.1:8080"),
        ("ORCH_SERVICES_FILE", "/etc/orchestrator/services.toml"),
        ("ORCH_WORKERS", "4"),
        ("ORCH_BACKEND_TIMEOUT_SECS", "90"),
        ("ORCH_RETENTION_WARN", "0"),
        ("OTEL_ENDPOINT", "http://localhost:4317"),
        ("LOG_LEVEL", "debug"),
    ]))
    .unwrap();

    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
    assert_eq!(config.workers, 4);
    assert_eq!(config.backend_timeout, Duration::from_secs(90));
    assert_eq!(config.retention_warn_threshold, None);
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(config.log_level, "debug");
}

#[test]
fn malformed_values_fail_fast() {
    assert!(Config::from_lookup(lookup(&[("ORCH_WORKERS", "many")])).is_err());
    assert!(Config::from_lookup(lookup(&[("ORCH_WORKERS", "0")])).is_err());
    assert!(Config::from_lookup(lookup(&[("ORCH_BACKEND_TIMEOUT_SECS", "0")])).is_err());
    assert!(Config::from_lookup(lookup(&[("ORCH_BIND_ADDR", "localhost")])).is_err());
}

#[test]
fn config_from_env_uses_process_environment() {
    unsafe {
        std::env::set_var("ORCH_WORKERS", "2");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.workers, 2);
    unsafe {
        std::env::remove_var("ORCH_WORKERS");
    }
}
