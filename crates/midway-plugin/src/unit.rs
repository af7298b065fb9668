// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unit classes and the modules that define them.

use std::path::{Path, PathBuf};

use midway_core::{ConfigPayload, UnitDescriptor};

use crate::manifest::{DEFAULT_EXPORT, MANIFEST_FILE};

/// A plugin module: one directory under a plugin root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    /// Dotted module path, `<root dir name>.<module dir name>`.
    pub path: String,
    /// The module directory.
    pub dir: PathBuf,
}

impl ModuleRef {
    /// Builds the reference for `dir`, a direct child of `root`.
    pub fn new(root: &Path, dir: PathBuf) -> Self {
        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let module_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = if root_name.is_empty() {
            module_name
        } else {
            format!("{root_name}.{module_name}")
        };
        Self { path, dir }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }
}

/// A discoverable processing unit, as declared by its module.
///
/// This is the class, not an instance: it carries identity, metadata, the
/// default configuration and where its code lives. `generation` identifies the
/// module load that produced it; a reload yields a class with a newer
/// generation, and the older value must no longer be run.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitClass {
    pub descriptor: UnitDescriptor,
    pub description: String,
    pub default_config: ConfigPayload,
    pub module: ModuleRef,
    /// Absolute path of the WASM source (binary or text format).
    pub source: PathBuf,
    /// Export named by the manifest; `None` means the conventional `run`.
    pub export: Option<String>,
    pub generation: u64,
}

impl UnitClass {
    pub fn uid(&self) -> &str {
        &self.descriptor.uid
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Configuration a fresh editor surface starts from. `{}` when the unit declares none.
    pub fn default_configuration(&self) -> ConfigPayload {
        self.default_config.clone()
    }

    /// Name of the export that implements `run`.
    pub fn run_export(&self) -> &str {
        self.export.as_deref().unwrap_or(DEFAULT_EXPORT)
    }

    /// True when the manifest named the export explicitly, so a missing export is an error
    /// rather than a fall back to passthrough.
    pub fn requires_export(&self) -> bool {
        self.export.is_some()
    }

    pub fn is_base(&self) -> bool {
        self.descriptor.is_base()
    }
}
