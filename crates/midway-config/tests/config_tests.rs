// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the midway configuration system.

use std::path::PathBuf;

use midway_config::diagnostic::ConfigError;
use midway_config::model::MidwayConfig;
use midway_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_midway_config() {
    let toml = r#"
[host]
extension_root = "/opt/extension"
plugin_dirs = ["middleware", "community"]
catalog_path = "state/catalog.json"
log_level = "debug"

[sandbox]
fuel = 5000
epoch_timeout_secs = 3
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.host.extension_root, "/opt/extension");
    assert_eq!(config.host.plugin_dirs, vec!["middleware", "community"]);
    assert_eq!(config.host.catalog_path, "state/catalog.json");
    assert_eq!(config.host.log_level, "debug");
    assert_eq!(config.sandbox.fuel, 5000);
    assert_eq!(config.sandbox.epoch_timeout_secs, 3);
    assert_eq!(
        config.host.plugin_roots(),
        vec![
            PathBuf::from("/opt/extension/middleware"),
            PathBuf::from("/opt/extension/community")
        ]
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.host.extension_root, ".");
    assert_eq!(config.host.plugin_dirs, vec!["middleware"]);
    assert_eq!(config.host.catalog_path, "storage/middleware.db.json");
    assert_eq!(config.host.log_level, "info");
    assert_eq!(config.sandbox.fuel, 1_000_000_000);
    assert_eq!(config.sandbox.epoch_timeout_secs, 30);
}

/// Unknown field in [host] section produces an UnknownField error.
#[test]
fn unknown_field_in_host_produces_error() {
    let toml = r#"
[host]
plugn_dirs = ["middleware"]
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("plugn_dirs"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Dot-notation overrides (the shape the env provider produces) win over TOML.
#[test]
fn dotted_override_replaces_catalog_path() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[host]
catalog_path = "from-toml.json"
"#;

    let config: MidwayConfig = Figment::new()
        .merge(Serialized::defaults(MidwayConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("host.catalog_path", "from-env.json"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.host.catalog_path, "from-env.json");
}

/// MIDWAY_HOST_CATALOG_PATH maps to host.catalog_path, not host.catalog.path.
#[test]
#[serial_test::serial]
fn env_var_overrides_catalog_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("midway.toml");
    std::fs::write(&path, "[host]\ncatalog_path = \"file.json\"\n").unwrap();

    // SAFETY: serialised with every other env-mutating test in this binary.
    unsafe { std::env::set_var("MIDWAY_HOST_CATALOG_PATH", "env.json") };
    let result = load_and_validate_path(&path);
    unsafe { std::env::remove_var("MIDWAY_HOST_CATALOG_PATH") };

    let config = result.expect("config with env override should validate");
    assert_eq!(config.host.catalog_path, "env.json");
}

/// MIDWAY_SANDBOX_EPOCH_TIMEOUT_SECS maps to sandbox.epoch_timeout_secs.
#[test]
#[serial_test::serial]
fn env_var_overrides_sandbox_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("midway.toml");
    std::fs::write(&path, "").unwrap();

    // SAFETY: serialised with every other env-mutating test in this binary.
    unsafe { std::env::set_var("MIDWAY_SANDBOX_EPOCH_TIMEOUT_SECS", "7") };
    let result = load_and_validate_path(&path);
    unsafe { std::env::remove_var("MIDWAY_SANDBOX_EPOCH_TIMEOUT_SECS") };

    let config = result.expect("config with env override should validate");
    assert_eq!(config.sandbox.epoch_timeout_secs, 7);
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
#[serial_test::serial]
fn missing_config_file_uses_defaults() {
    let config = load_and_validate_path(std::path::Path::new("/nonexistent/path/midway.toml"))
        .expect("missing file should be silently skipped");
    assert_eq!(config.host.plugin_dirs, vec!["middleware"]);
}

/// Error output from load_and_validate_str includes the unknown key and a suggestion.
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[host]
catalog_pth = "x.json"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "catalog_pth"
                && suggestion.as_deref() == Some("catalog_path")
                && valid_keys.contains("plugin_dirs")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'catalog_pth' with suggestion, got: {errors:?}"
    );
}

/// Invalid type (string where number expected) produces clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[sandbox]
fuel = "lots"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("fuel"))),
        "expected InvalidType for sandbox.fuel, got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_surface_through_load_and_validate() {
    let toml = r#"
[host]
plugin_dirs = []

[sandbox]
fuel = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2, "got: {errors:?}");
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
}
