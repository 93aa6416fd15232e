use std::{env, fs};

use hmdp_cache::ReadStrategy;
use hmdp_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("hmdp.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8082

[redis]
enabled = false
url = "redis://cache:6379"

[cache]
lock_ttl_secs = 5
retry_interval_ms = 20
rebuild_workers = 4

[shop]
strategy = "logical_expire"
ttl_secs = 20
warm_up_ids = [1, 2, 3]

[logging]
level = "debug"
json = true
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses, unspecified fields keep defaults
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8082);
    assert_eq!(cfg.cache.lock_ttl_secs, 5);
    assert_eq!(cfg.cache.rebuild_workers, 4);
    assert_eq!(cfg.cache.rebuild_queue_capacity, 1024);
    assert_eq!(cfg.shop.strategy, ReadStrategy::LogicalExpire);
    assert_eq!(cfg.shop.warm_up_ids, vec![1, 2, 3]);
    assert_eq!(cfg.shop.null_ttl_secs, 120);
    assert_eq!(cfg.shop.key_prefix, "cache:shop:");
    assert!(cfg.logging.json);

    // 2) Env override should win over file
    unsafe {
        env::set_var("HMDP__CACHE__RETRY_INTERVAL_MS", "75");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.cache.retry_interval_ms, 75);
    unsafe {
        env::remove_var("HMDP__CACHE__RETRY_INTERVAL_MS");
    }

    // 3) Invalid config should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[cache]
rebuild_workers = 0
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("rebuild_workers"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");

    let cfg = load_config(path.to_str()).expect("defaults are valid");
    assert_eq!(cfg.shop.strategy, ReadStrategy::Mutex);
    assert_eq!(cfg.cache.lock_ttl_secs, 10);
    assert!(!cfg.redis.enabled);
}
