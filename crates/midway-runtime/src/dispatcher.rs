// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolve, reload, instantiate, run.
//!
//! The class found in the registry only tells the dispatcher which module to
//! reload and which identifier to fetch from it. The unit that runs is always
//! the one produced by the reload; if the reload fails the dispatch fails.

use std::sync::Arc;

use midway_core::{ConfigPayload, MidwayError, Pipeline, ProcessingContext, ProcessingResult};
use midway_plugin::{MiddlewareRegistry, resolve};
use tracing::{debug, info};

use crate::instance::UnitInstance;
use crate::module_cache::ModuleCache;
use crate::sandbox::UnitSandbox;

pub struct Dispatcher {
    modules: Arc<ModuleCache>,
    sandbox: UnitSandbox,
    pipeline: Arc<dyn Pipeline>,
}

impl Dispatcher {
    pub fn new(modules: Arc<ModuleCache>, sandbox: UnitSandbox, pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            modules,
            sandbox,
            pipeline,
        }
    }

    /// Dispatches `selection` against `context`.
    ///
    /// A missing configuration is the empty mapping. Nothing runs unless
    /// resolution and the reload both succeed.
    pub async fn dispatch(
        &self,
        registry: &MiddlewareRegistry,
        selection: Option<&str>,
        config: Option<ConfigPayload>,
        context: ProcessingContext,
    ) -> Result<ProcessingResult, MidwayError> {
        let class = resolve(registry, selection)?;
        debug!(uid = %class.uid(), module = %class.module.path, "resolved selection");

        let module = self.modules.module_ref(&class.module);
        module.ensure_loaded()?;
        let unit = module.reload(class.uid())?;

        let instance = UnitInstance::initialize(unit, config.unwrap_or_default());
        info!(
            uid = %instance.uid(),
            generation = instance.generation(),
            "dispatching middleware"
        );
        instance.run(&self.sandbox, Arc::clone(&self.pipeline), context).await
    }
}
