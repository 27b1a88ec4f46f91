use std::env;
use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use super::{StoreBackend, load_config, settings::Settings};

/// Runs `f` with a temporary working directory, restoring the old one after.
fn in_temp_dir<T>(config_toml: Option<&str>, f: impl FnOnce() -> T) -> T {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    if let Some(toml) = config_toml {
        fs::create_dir_all("config").expect("create config dir");
        fs::write("config/default.toml", toml).expect("write config file");
    }

    let out = f();
    env::set_current_dir(orig).expect("restore cwd");
    out
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.broker.max_connections, 1000);
    assert_eq!(settings.store.backend, StoreBackend::Sled);
    assert_eq!(settings.store.path, "jobcast_db");
    assert_eq!(settings.store.record_ttl_secs, None);
    assert_eq!(settings.log.level, "info");
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    let cfg = in_temp_dir(None, || load_config().expect("load_config failed"));
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.store.backend, StoreBackend::Sled);
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [broker]
        max_connections = 10

        [store]
        backend = "memory"
        record_ttl_secs = 60
    "#;

    let cfg = in_temp_dir(Some(toml), || load_config().expect("load_config failed"));
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.broker.max_connections, 10);
    assert_eq!(cfg.store.backend, StoreBackend::Memory);
    assert_eq!(cfg.store.record_ttl_secs, Some(60));
    // Untouched sections keep their defaults.
    assert_eq!(cfg.store.path, "jobcast_db");
    assert_eq!(cfg.log.level, "info");
}

#[test]
#[serial]
fn load_config_env_overrides_file() {
    let toml = r#"
        [server]
        port = 9000
    "#;

    let cfg = temp_env::with_vars(
        [
            ("JOBCAST__SERVER__PORT", Some("9100")),
            ("JOBCAST__LOG__LEVEL", Some("debug")),
        ],
        || in_temp_dir(Some(toml), || load_config().expect("load_config failed")),
    );
    assert_eq!(cfg.server.port, 9100);
    assert_eq!(cfg.log.level, "debug");
}
