use std::{env, fs};

use dinerank_core::CoreError;
use dinerank_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("dinerank.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
body_limit_bytes = 1024

[logging]
level = "debug"

[ranking]
default_k = 3
active_only = true

[cache]
entity_ttl_secs = 120
listing_ttl_secs = 60
search_ttl_secs = 30
compute_timeout_ms = 500
key_prefix = "test"
invalidate_on_write = false

[redis]
enabled = false

[bootstrap]
seed_sample_data = true
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.ranking.default_k, 3);
    assert!(cfg.ranking.active_only);
    assert_eq!(cfg.cache.listing_ttl_secs, 60);
    assert_eq!(cfg.cache.key_prefix, "test");
    assert!(!cfg.cache.invalidate_on_write);
    assert!(cfg.bootstrap.seed_sample_data);
    assert_eq!(cfg.logging.level.to_ascii_lowercase(), "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("DINERANK__CACHE__SEARCH_TTL_SECS", "15");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.cache.search_ttl_secs, 15);
    unsafe {
        env::remove_var("DINERANK__CACHE__SEARCH_TTL_SECS");
    }

    // 3) Invalid values are rejected
    let bad_path = dir.path().join("bad.toml");
    fs::write(&bad_path, "[ranking]\ndefault_k = 0\n").expect("write bad toml");
    let err = load_config(bad_path.to_str()).expect_err("zero k must fail");
    assert!(matches!(err, CoreError::Configuration(_)));
    assert!(err.to_string().contains("ranking.default_k"));
}

#[test]
fn missing_file_uses_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");
    let cfg = load_config(path.to_str()).expect("defaults are valid");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.cache.entity_ttl_secs, 3600);
    assert_eq!(cfg.ranking.default_k, 5);
}
