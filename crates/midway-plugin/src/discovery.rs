// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem discovery of plugin modules and their units.
//!
//! Roots are walked in configuration order and modules in file-name order
//! within a root. A module that fails to import is logged and skipped; the
//! rest of the pass carries on. Each pass imports every module from disk, so
//! edits made since the previous pass are always picked up.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use midway_core::MidwayError;
use tracing::{debug, info, warn};

use crate::manifest::read_module_manifest;
use crate::registry::MiddlewareRegistry;
use crate::unit::{ModuleRef, UnitClass};

/// Loads the unit classes a module exports.
///
/// Implementations must read the module from disk on every call.
pub trait ModuleImporter: Send + Sync {
    fn import(&self, module: &ModuleRef) -> Result<Vec<UnitClass>, MidwayError>;
}

/// Importer that reads manifests and checks that every declared source exists.
///
/// It does not compile unit code; runtimes that need compiled code provide
/// their own importer.
#[derive(Debug, Default)]
pub struct ManifestImporter {
    generation: AtomicU64,
}

impl ManifestImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModuleImporter for ManifestImporter {
    fn import(&self, module: &ModuleRef) -> Result<Vec<UnitClass>, MidwayError> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let classes = read_module_manifest(module, generation)?;
        for class in &classes {
            if !class.source.is_file() {
                return Err(MidwayError::DiscoveryImport {
                    module: module.path.clone(),
                    message: format!(
                        "source '{}' of unit {} does not exist",
                        class.source.display(),
                        class.uid()
                    ),
                });
            }
        }
        Ok(classes)
    }
}

/// Lists the modules of one plugin root, sorted by directory name.
///
/// A module is a non-hidden sub-directory holding a manifest. A missing root
/// yields no modules.
pub fn find_modules(root: &Path) -> Result<Vec<ModuleRef>, MidwayError> {
    if !root.exists() {
        debug!(root = %root.display(), "plugin root does not exist, skipping");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(root).map_err(|e| MidwayError::io("read", root, e))?;

    let mut dirs: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MidwayError::io("read", root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        dirs.push(path);
    }
    dirs.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    Ok(dirs
        .into_iter()
        .map(|dir| ModuleRef::new(root, dir))
        .filter(|module| {
            let has_manifest = module.manifest_path().is_file();
            if !has_manifest {
                debug!(module = %module.path, "no manifest, not a plugin module");
            }
            has_manifest
        })
        .collect())
}

/// Runs one discovery pass over `roots` and returns the resulting registry.
pub fn discover(roots: &[PathBuf], importer: &dyn ModuleImporter) -> MiddlewareRegistry {
    let mut registry = MiddlewareRegistry::new();
    let mut failed = 0usize;

    for root in roots {
        let modules = match find_modules(root) {
            Ok(modules) => modules,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "failed to scan plugin root");
                continue;
            }
        };

        for module in modules {
            let classes = match importer.import(&module) {
                Ok(classes) => classes,
                Err(e) => {
                    failed += 1;
                    warn!(module = %module.path, error = %e, "Failed to import the {} module", module.path);
                    continue;
                }
            };

            debug!(module = %module.path, units = classes.len(), "imported module");
            for class in classes {
                registry.register(class);
            }
        }
    }

    info!(units = registry.len(), failed_modules = failed, "middleware discovery complete");
    registry
}
