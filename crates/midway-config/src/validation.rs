// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty plugin roots and positive sandbox limits.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::diagnostic::ConfigError;
use crate::model::MidwayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MidwayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.host.extension_root.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "host.extension_root must not be empty".to_string(),
        });
    }

    if config.host.plugin_dirs.is_empty() {
        errors.push(ConfigError::Validation {
            message: "host.plugin_dirs must list at least one directory".to_string(),
        });
    }

    for (i, dir) in config.host.plugin_dirs.iter().enumerate() {
        if dir.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("host.plugin_dirs[{i}] must not be empty"),
            });
        }
    }

    // Scanning a root twice would register every unit in it twice.
    let mut seen_dirs = HashSet::new();
    for dir in &config.host.plugin_dirs {
        if !dir.trim().is_empty() && !seen_dirs.insert(dir.trim()) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate plugin directory `{dir}` in host.plugin_dirs"),
            });
        }
    }

    // Module paths are keyed by the root's final component, so two roots
    // sharing one would map different modules onto the same catalog key.
    let mut base_names: HashMap<String, &str> = HashMap::new();
    for dir in seen_dirs {
        let Some(base) = Path::new(dir).file_name() else {
            continue;
        };
        let base = base.to_string_lossy().into_owned();
        if let Some(other) = base_names.insert(base.clone(), dir) {
            let (first, second) = if other < dir { (other, dir) } else { (dir, other) };
            errors.push(ConfigError::Validation {
                message: format!(
                    "plugin directories `{first}` and `{second}` share the name `{base}` in host.plugin_dirs"
                ),
            });
        }
    }

    if config.host.catalog_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "host.catalog_path must not be empty".to_string(),
        });
    }

    let level = config.host.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "host.log_level `{}` is not one of {}",
                config.host.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.sandbox.fuel == 0 {
        errors.push(ConfigError::Validation {
            message: "sandbox.fuel must be greater than 0".to_string(),
        });
    }

    if config.sandbox.epoch_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "sandbox.epoch_timeout_secs must be greater than 0".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
