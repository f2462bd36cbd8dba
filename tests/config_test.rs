//! Tests for environment-based configuration
//!
//! These mutate process environment variables, so they run serially.

use hakwonplus::config::Config;
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;

const VARS: &[&str] = &[
    "HAKWON_API_BASE_URL",
    "HAKWON_CDN_BASE_URL",
    "HAKWON_REQUEST_TIMEOUT",
    "HAKWON_HOSTNAME",
    "HAKWON_TENANT_CODE",
    "HAKWON_STORAGE_PATH",
    "HAKWON_LOG_FORMAT",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = Config::from_env().unwrap();
    assert_eq!(config.api.base_url, "http://localhost:8000");
    assert_eq!(config.api_root(), "http://localhost:8000/api/v1");
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert!(config.tenant.code.is_none());
    assert!(config.storage.path.is_none());
    assert_eq!(config.logging.format, "text");
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("HAKWON_API_BASE_URL", "https://api.hakwonplus.com/");
    std::env::set_var("HAKWON_REQUEST_TIMEOUT", "5");
    std::env::set_var("HAKWON_HOSTNAME", "limglish.kr");
    std::env::set_var("HAKWON_TENANT_CODE", "  tchul ");
    std::env::set_var("HAKWON_STORAGE_PATH", "/tmp/hakwon.json");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.api.base_url, "https://api.hakwonplus.com");
    assert_eq!(config.request_timeout(), Duration::from_secs(5));
    assert_eq!(config.tenant.hostname.as_deref(), Some("limglish.kr"));
    assert_eq!(config.tenant.code.as_deref(), Some("tchul"));
    assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/hakwon.json")));
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_blank_values_fall_back() {
    clear_env();
    std::env::set_var("HAKWON_TENANT_CODE", "   ");
    std::env::set_var("HAKWON_REQUEST_TIMEOUT", "soon");

    let config = Config::from_env().unwrap();
    clear_env();

    assert!(config.tenant.code.is_none());
    assert_eq!(config.api.request_timeout_secs, 30);
}
