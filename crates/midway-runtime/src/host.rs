// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The middleware host: registry ownership, catalog refresh and dispatch.
//!
//! Discovery is the only writer of the registry and always installs a whole
//! new snapshot. Readers take an `Arc` of the current snapshot and keep
//! seeing it until they ask again. Catalog writes and dispatches are not
//! coordinated across callers; concurrent refreshes are last-writer-wins.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use midway_config::MidwayConfig;
use midway_core::{ConfigPayload, MidwayError, Pipeline, ProcessingContext, ProcessingResult};
use midway_plugin::{
    Catalog, CatalogStore, MiddlewareRegistry, UnitClass, discover, find_modules, selector,
};
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::module_cache::ModuleCache;
use crate::sandbox::{UnitSandbox, sandbox_engine};

pub struct MiddlewareHost {
    config: MidwayConfig,
    modules: Arc<ModuleCache>,
    registry: ArcSwap<MiddlewareRegistry>,
    catalog: CatalogStore,
    dispatcher: Dispatcher,
}

impl MiddlewareHost {
    /// Creates a host with an empty registry. Nothing is read from disk yet.
    pub fn new(config: MidwayConfig, pipeline: Arc<dyn Pipeline>) -> Result<Self, MidwayError> {
        let engine = sandbox_engine()?;
        let modules = Arc::new(ModuleCache::new(engine.clone()));
        let sandbox = UnitSandbox::new(engine, config.sandbox.clone());
        let dispatcher = Dispatcher::new(Arc::clone(&modules), sandbox, pipeline);
        let catalog = CatalogStore::new(config.host.catalog_file());

        Ok(Self {
            config,
            modules,
            registry: ArcSwap::from_pointee(MiddlewareRegistry::new()),
            catalog,
            dispatcher,
        })
    }

    /// Creates a host and runs the start-up catalog refresh.
    ///
    /// A catalog write failure is logged; the registry is still populated.
    pub fn start(config: MidwayConfig, pipeline: Arc<dyn Pipeline>) -> Result<Self, MidwayError> {
        let host = Self::new(config, pipeline)?;
        if let Err(e) = host.refresh_catalog() {
            warn!(error = %e, path = %host.catalog.path().display(), "catalog refresh failed at start");
        }
        Ok(host)
    }

    pub fn catalog_store(&self) -> &CatalogStore {
        &self.catalog
    }

    /// The current registry snapshot.
    pub fn registry(&self) -> Arc<MiddlewareRegistry> {
        self.registry.load_full()
    }

    /// Rebuilds the registry from disk and installs it.
    pub fn discover(&self) -> Arc<MiddlewareRegistry> {
        let roots = self.config.host.plugin_roots();
        let registry = Arc::new(discover(&roots, self.modules.as_ref()));
        self.registry.store(Arc::clone(&registry));
        self.evict_removed_modules(&roots);
        registry
    }

    /// Drops cache entries for modules that are no longer on disk.
    ///
    /// Nothing is evicted when a root cannot be scanned.
    fn evict_removed_modules(&self, roots: &[PathBuf]) {
        let mut live = HashSet::new();
        for root in roots {
            match find_modules(root) {
                Ok(modules) => live.extend(modules.into_iter().map(|m| m.path)),
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "skipping module cache eviction");
                    return;
                }
            }
        }
        if let Err(e) = self.modules.retain_modules(&live) {
            warn!(error = %e, "module cache eviction failed");
        }
    }

    /// Rediscovers units and upserts them into the on-disk catalog.
    ///
    /// The new registry stays installed even when the catalog write fails.
    pub fn refresh_catalog(&self) -> Result<Catalog, MidwayError> {
        let registry = self.discover();
        let catalog = self.catalog.update_from(&registry)?;
        info!(
            discovered = registry.len(),
            catalog_entries = catalog.len(),
            path = %self.catalog.path().display(),
            "middleware catalog refreshed"
        );
        Ok(catalog)
    }

    /// Selection strings for the current registry, naturally sorted.
    pub fn list_selectable_units(&self) -> Vec<String> {
        selector::list_selectable_units(&self.registry())
    }

    /// Resolves a selection against the current registry.
    pub fn resolve(&self, selection: Option<&str>) -> Result<UnitClass, MidwayError> {
        let registry = self.registry();
        selector::resolve(&registry, selection).cloned()
    }

    /// Resolves, reloads and runs the selected unit.
    pub async fn dispatch(
        &self,
        selection: Option<&str>,
        config: Option<ConfigPayload>,
        context: ProcessingContext,
    ) -> Result<ProcessingResult, MidwayError> {
        let registry = self.registry();
        self.dispatcher.dispatch(&registry, selection, config, context).await
    }
}
