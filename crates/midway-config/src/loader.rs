// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./midway.toml` > `~/.config/midway/midway.toml` > `/etc/midway/midway.toml`
//! with environment variable overrides via `MIDWAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MidwayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/midway/midway.toml` (system-wide)
/// 3. `~/.config/midway/midway.toml` (user XDG config)
/// 4. `./midway.toml` (local directory)
/// 5. `MIDWAY_*` environment variables
pub fn load_config() -> Result<MidwayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MidwayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MidwayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MidwayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MidwayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MidwayConfig::default()))
        .merge(Toml::file("/etc/midway/midway.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("midway/midway.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("midway.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `MIDWAY_HOST_CATALOG_PATH` must map to `host.catalog_path`,
/// not `host.catalog.path`.
fn env_provider() -> Env {
    Env::prefixed("MIDWAY_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("host_", "host.", 1)
            .replacen("sandbox_", "sandbox.", 1);
        mapped.into()
    })
}
