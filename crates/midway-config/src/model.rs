// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the midway middleware host.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level midway configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MidwayConfig {
    /// Plugin discovery and catalog settings.
    #[serde(default)]
    pub host: HostConfig,

    /// Resource limits applied to every unit run.
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

/// Plugin discovery and catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Directory that relative plugin and catalog paths are resolved against.
    #[serde(default = "default_extension_root")]
    pub extension_root: String,

    /// Plugin root directories, scanned in this order.
    #[serde(default = "default_plugin_dirs")]
    pub plugin_dirs: Vec<String>,

    /// Location of the persisted catalog file.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            extension_root: default_extension_root(),
            plugin_dirs: default_plugin_dirs(),
            catalog_path: default_catalog_path(),
            log_level: default_log_level(),
        }
    }
}

impl HostConfig {
    /// Resolves `path` against `extension_root` unless it is already absolute.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.extension_root).join(path)
        }
    }

    /// Plugin roots in scan order, resolved against the extension root.
    pub fn plugin_roots(&self) -> Vec<PathBuf> {
        self.plugin_dirs.iter().map(|d| self.resolve(d)).collect()
    }

    /// Absolute (or extension-relative) path of the catalog file.
    pub fn catalog_file(&self) -> PathBuf {
        self.resolve(&self.catalog_path)
    }
}

fn default_extension_root() -> String {
    ".".to_string()
}

fn default_plugin_dirs() -> Vec<String> {
    vec!["middleware".to_string()]
}

fn default_catalog_path() -> String {
    "storage/middleware.db.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resource limits for the unit sandbox.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    /// Fuel units available to a single run.
    #[serde(default = "default_fuel")]
    pub fuel: u64,

    /// Wall-clock deadline for a single run, in seconds.
    #[serde(default = "default_epoch_timeout_secs")]
    pub epoch_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            fuel: default_fuel(),
            epoch_timeout_secs: default_epoch_timeout_secs(),
        }
    }
}

fn default_fuel() -> u64 {
    1_000_000_000
}

fn default_epoch_timeout_secs() -> u64 {
    30
}
