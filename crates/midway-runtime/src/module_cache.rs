// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiled plugin modules, keyed by module path.
//!
//! Loading a module reads its manifest and compiles every unit source it
//! names into a fresh [`wasmtime::Module`]. A reload is just another load:
//! the cache entry is replaced, never patched, and every load carries a new
//! generation so a class from an older load can be told apart from the
//! current one.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use midway_core::MidwayError;
use midway_plugin::manifest::read_module_manifest;
use midway_plugin::{ModuleImporter, ModuleRef, UnitClass};
use tracing::{debug, info};
use wasmtime::{Engine, Module};

/// A unit class together with the code compiled for it.
#[derive(Clone)]
pub struct LoadedUnit {
    pub class: UnitClass,
    pub code: Module,
}

impl std::fmt::Debug for LoadedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedUnit")
            .field("uid", &self.class.uid())
            .field("generation", &self.class.generation)
            .finish_non_exhaustive()
    }
}

struct LoadedModule {
    units: Vec<LoadedUnit>,
}

/// Process-wide cache of compiled plugin modules.
pub struct ModuleCache {
    engine: Engine,
    modules: Mutex<HashMap<String, Arc<LoadedModule>>>,
    generation: AtomicU64,
}

impl ModuleCache {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            modules: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Generation of the most recent load.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// A reload handle for `module`.
    pub fn module_ref<'a>(&'a self, module: &'a ModuleRef) -> ReloadableModuleRef<'a> {
        ReloadableModuleRef { cache: self, module }
    }

    /// Returns true if `module_path` has been loaded at least once.
    pub fn is_loaded(&self, module_path: &str) -> Result<bool, MidwayError> {
        Ok(self.lock()?.contains_key(module_path))
    }

    /// The currently cached unit `uid` of `module_path`, if any.
    pub fn cached_unit(&self, module_path: &str, uid: &str) -> Result<Option<LoadedUnit>, MidwayError> {
        let modules = self.lock()?;
        Ok(modules
            .get(module_path)
            .and_then(|m| m.units.iter().find(|u| u.class.uid() == uid).cloned()))
    }

    /// Drops every cached module whose path is not in `live`.
    ///
    /// Returns the number of entries evicted.
    pub fn retain_modules(&self, live: &HashSet<String>) -> Result<usize, MidwayError> {
        let mut modules = self.lock()?;
        let before = modules.len();
        modules.retain(|path, _| live.contains(path));
        let evicted = before - modules.len();
        if evicted > 0 {
            debug!(evicted, remaining = modules.len(), "evicted removed modules from cache");
        }
        Ok(evicted)
    }

    /// Reads and compiles `module` from disk and replaces its cache entry.
    ///
    /// Failures are reported as import errors and leave the previous entry in place.
    fn load(&self, module: &ModuleRef) -> Result<Arc<LoadedModule>, MidwayError> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let classes = read_module_manifest(module, generation)?;

        let mut compiled: HashMap<PathBuf, Module> = HashMap::new();
        let mut units = Vec::with_capacity(classes.len());
        for class in classes {
            let code = match compiled.get(&class.source) {
                Some(code) => code.clone(),
                None => {
                    let code = Module::from_file(&self.engine, &class.source).map_err(|e| {
                        MidwayError::DiscoveryImport {
                            module: module.path.clone(),
                            message: format!(
                                "failed to compile '{}' for unit {}: {e:#}",
                                class.source.display(),
                                class.uid()
                            ),
                        }
                    })?;
                    compiled.insert(class.source.clone(), code.clone());
                    code
                }
            };
            units.push(LoadedUnit { class, code });
        }

        let loaded = Arc::new(LoadedModule { units });
        self.lock()?.insert(module.path.clone(), Arc::clone(&loaded));
        debug!(module = %module.path, generation, units = loaded.units.len(), "module loaded");
        Ok(loaded)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Arc<LoadedModule>>>, MidwayError> {
        self.modules
            .lock()
            .map_err(|_| MidwayError::Internal("module cache lock poisoned".to_string()))
    }
}

impl ModuleImporter for ModuleCache {
    fn import(&self, module: &ModuleRef) -> Result<Vec<UnitClass>, MidwayError> {
        let loaded = self.load(module)?;
        Ok(loaded.units.iter().map(|u| u.class.clone()).collect())
    }
}

/// Reload capability for one plugin module.
pub struct ReloadableModuleRef<'a> {
    cache: &'a ModuleCache,
    module: &'a ModuleRef,
}

impl ReloadableModuleRef<'_> {
    pub fn module(&self) -> &ModuleRef {
        self.module
    }

    /// Loads the module if the cache has never seen it.
    pub fn ensure_loaded(&self) -> Result<(), MidwayError> {
        if self.cache.is_loaded(&self.module.path)? {
            return Ok(());
        }
        self.cache.load(self.module).map(|_| ()).map_err(|e| self.reload_error(e))
    }

    /// Recompiles the module from disk and returns the fresh unit `uid`.
    ///
    /// A module that no longer parses, or no longer declares `uid`, fails the
    /// reload. The previously compiled unit is never handed out instead.
    pub fn reload(&self, uid: &str) -> Result<LoadedUnit, MidwayError> {
        let loaded = self.cache.load(self.module).map_err(|e| self.reload_error(e))?;
        let unit = loaded
            .units
            .iter()
            .find(|u| u.class.uid() == uid)
            .cloned()
            .ok_or_else(|| MidwayError::Reload {
                module: self.module.path.clone(),
                message: format!("module no longer exports middleware {uid}"),
            })?;
        info!(
            module = %self.module.path,
            uid,
            generation = unit.class.generation,
            "module reloaded"
        );
        Ok(unit)
    }

    fn reload_error(&self, err: MidwayError) -> MidwayError {
        let message = match err {
            MidwayError::DiscoveryImport { message, .. } => message,
            other => other.to_string(),
        };
        MidwayError::Reload {
            module: self.module.path.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use midway_test_utils::harness::{BROKEN, PASSTHROUGH, PluginTree, unit_manifest};

    use super::*;
    use crate::sandbox::sandbox_engine;

    fn cache() -> ModuleCache {
        ModuleCache::new(sandbox_engine().unwrap())
    }

    fn module_of(tree: &PluginTree, name: &str) -> ModuleRef {
        let root = tree.root();
        ModuleRef::new(&root, root.join(name))
    }

    #[test]
    fn import_compiles_and_caches() {
        let tree = PluginTree::new();
        tree.write_module("m", &unit_manifest("u", "U", "u.wat"), &[("u.wat", PASSTHROUGH)]);
        let cache = cache();
        let module = module_of(&tree, "m");

        let classes = cache.import(&module).unwrap();
        assert_eq!(classes.len(), 1);
        assert!(cache.is_loaded("middleware.m").unwrap());
        assert!(cache.cached_unit("middleware.m", "u").unwrap().is_some());
    }

    #[test]
    fn import_reports_compile_failure() {
        let tree = PluginTree::new();
        tree.write_module("m", &unit_manifest("u", "U", "u.wat"), &[("u.wat", BROKEN)]);
        let err = cache().import(&module_of(&tree, "m")).unwrap_err();
        assert!(matches!(err, MidwayError::DiscoveryImport { .. }), "{err:?}");
    }

    #[test]
    fn ensure_loaded_only_loads_once() {
        let tree = PluginTree::new();
        tree.write_module("m", &unit_manifest("u", "U", "u.wat"), &[("u.wat", PASSTHROUGH)]);
        let cache = cache();
        let module = module_of(&tree, "m");
        let handle = cache.module_ref(&module);

        handle.ensure_loaded().unwrap();
        let generation = cache.generation();
        handle.ensure_loaded().unwrap();
        assert_eq!(cache.generation(), generation);
    }

    #[test]
    fn reload_yields_newer_generation() {
        let tree = PluginTree::new();
        tree.write_module("m", &unit_manifest("u", "U", "u.wat"), &[("u.wat", PASSTHROUGH)]);
        let cache = cache();
        let module = module_of(&tree, "m");
        let before = cache.import(&module).unwrap().remove(0);

        let after = cache.module_ref(&module).reload("u").unwrap();
        assert!(after.class.generation > before.generation);
        assert_eq!(after.class.uid(), before.uid());
    }

    #[test]
    fn reload_failure_is_reload_error_and_keeps_cache() {
        let tree = PluginTree::new();
        tree.write_module("m", &unit_manifest("u", "U", "u.wat"), &[("u.wat", PASSTHROUGH)]);
        let cache = cache();
        let module = module_of(&tree, "m");
        cache.import(&module).unwrap();

        tree.write_source("m", "u.wat", BROKEN);
        let err = cache.module_ref(&module).reload("u").unwrap_err();
        assert!(matches!(err, MidwayError::Reload { .. }), "{err:?}");
        assert!(cache.cached_unit("middleware.m", "u").unwrap().is_some());
    }

    #[test]
    fn reload_of_removed_uid_fails() {
        let tree = PluginTree::new();
        tree.write_module("m", &unit_manifest("u", "U", "u.wat"), &[("u.wat", PASSTHROUGH)]);
        let cache = cache();
        let module = module_of(&tree, "m");
        cache.import(&module).unwrap();

        tree.write_module("m", &unit_manifest("renamed", "U", "u.wat"), &[]);
        let err = cache.module_ref(&module).reload("u").unwrap_err();
        assert!(err.to_string().contains("no longer exports middleware u"), "{err}");
    }

    #[test]
    fn retain_modules_evicts_paths_not_listed() {
        let tree = PluginTree::new();
        tree.write_module("kept", &unit_manifest("k", "K", "k.wat"), &[("k.wat", PASSTHROUGH)]);
        tree.write_module("gone", &unit_manifest("g", "G", "g.wat"), &[("g.wat", PASSTHROUGH)]);
        let cache = cache();
        cache.import(&module_of(&tree, "kept")).unwrap();
        cache.import(&module_of(&tree, "gone")).unwrap();

        let live = HashSet::from(["middleware.kept".to_string()]);
        assert_eq!(cache.retain_modules(&live).unwrap(), 1);
        assert!(cache.is_loaded("middleware.kept").unwrap());
        assert!(!cache.is_loaded("middleware.gone").unwrap());
        assert_eq!(cache.retain_modules(&live).unwrap(), 0);
    }
}
