// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Module manifest parsing from `middleware.toml` files.
//!
//! A module opts into discovery by declaring a `[[middleware]]` array. Each
//! entry becomes one [`UnitClass`]:
//!
//! ```toml
//! [[middleware]]
//! uid = "example_middleware"
//! name = "Example Middleware"
//! description = "Adds a watermark to every result."
//! source = "example.wat"
//!
//! [middleware.default_config]
//! opacity = 0.5
//! ```

use midway_core::{ConfigPayload, DEFAULT_DESCRIPTION, MidwayError, UnitDescriptor};
use serde::Deserialize;
use tracing::warn;

use crate::unit::{ModuleRef, UnitClass};

/// File name that marks a directory as a plugin module.
pub const MANIFEST_FILE: &str = "middleware.toml";

/// Export invoked when the manifest does not name one.
pub const DEFAULT_EXPORT: &str = "run";

/// Key of the exported unit list.
const UNITS_KEY: &str = "middleware";

/// One `[[middleware]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSection {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// WASM source relative to the module directory.
    pub source: String,
    #[serde(default)]
    pub export: Option<String>,
    #[serde(default)]
    pub default_config: ConfigPayload,
}

impl UnitSection {
    /// Binds this entry to the module it was read from.
    pub fn into_class(self, module: &ModuleRef, generation: u64) -> UnitClass {
        UnitClass {
            descriptor: UnitDescriptor::new(self.uid, self.name),
            description: self
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            default_config: self.default_config,
            source: module.dir.join(&self.source),
            module: module.clone(),
            export: self.export,
            generation,
        }
    }
}

/// Parses the units a module exports.
///
/// A manifest without a `middleware` key exports nothing. A `middleware` key
/// that is not an array is ignored with a warning, like any other attribute
/// that does not hold a unit list.
pub fn parse_module_manifest(
    module_path: &str,
    toml_content: &str,
) -> Result<Vec<UnitSection>, MidwayError> {
    let import_err = |message: String| MidwayError::DiscoveryImport {
        module: module_path.to_string(),
        message,
    };

    let table: toml::Table = toml::from_str(toml_content)
        .map_err(|e| import_err(format!("invalid {MANIFEST_FILE}: {e}")))?;

    let items = match table.get(UNITS_KEY) {
        None => return Ok(Vec::new()),
        Some(toml::Value::Array(items)) => items,
        Some(other) => {
            warn!(
                module = %module_path,
                found = other.type_str(),
                "`{UNITS_KEY}` is not an array; module exports no units"
            );
            return Ok(Vec::new());
        }
    };

    let mut units = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let section: UnitSection = item
            .clone()
            .try_into()
            .map_err(|e| import_err(format!("{UNITS_KEY}[{i}]: {e}")))?;
        validate_section(&section).map_err(|msg| import_err(format!("{UNITS_KEY}[{i}]: {msg}")))?;
        units.push(section);
    }
    Ok(units)
}

/// Reads and parses the manifest of `module`, binding every entry to it.
pub fn read_module_manifest(
    module: &ModuleRef,
    generation: u64,
) -> Result<Vec<UnitClass>, MidwayError> {
    let path = module.manifest_path();
    let content = std::fs::read_to_string(&path).map_err(|e| MidwayError::DiscoveryImport {
        module: module.path.clone(),
        message: format!("failed to read '{}': {e}", path.display()),
    })?;

    Ok(parse_module_manifest(&module.path, &content)?
        .into_iter()
        .map(|section| section.into_class(module, generation))
        .collect())
}

/// Both fields end up inside `"<name> (<uid>)"`, and the uid is read back
/// from the first parenthesised group, so neither may contain parentheses.
fn validate_section(section: &UnitSection) -> Result<(), String> {
    if section.uid.is_empty() {
        return Err("uid must not be empty".to_string());
    }
    if section.uid.contains(['(', ')']) {
        return Err(format!("uid '{}' must not contain parentheses", section.uid));
    }
    if section.name.trim().is_empty() {
        return Err(format!("unit '{}': name must not be empty", section.uid));
    }
    if section.name.contains(['(', ')']) {
        return Err(format!(
            "unit '{}': name '{}' must not contain parentheses",
            section.uid, section.name
        ));
    }
    if section.source.trim().is_empty() {
        return Err(format!("unit '{}': source must not be empty", section.uid));
    }
    Ok(())
}
