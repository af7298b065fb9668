// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A unit bound to one configuration, for exactly one run.

use std::sync::Arc;

use midway_core::{ConfigPayload, MidwayError, Pipeline, ProcessingContext, ProcessingResult};

use crate::module_cache::LoadedUnit;
use crate::sandbox::UnitSandbox;

/// A unit instance. Built per dispatch and consumed by [`UnitInstance::run`].
#[derive(Debug)]
pub struct UnitInstance {
    unit: LoadedUnit,
    config: ConfigPayload,
}

impl UnitInstance {
    /// Binds `unit` to `config`. No unit code runs here.
    pub fn initialize(unit: LoadedUnit, config: ConfigPayload) -> Self {
        Self { unit, config }
    }

    pub fn uid(&self) -> &str {
        self.unit.class.uid()
    }

    pub fn generation(&self) -> u64 {
        self.unit.class.generation
    }

    /// Runs the unit against `context` and discards the instance.
    pub async fn run(
        self,
        sandbox: &UnitSandbox,
        pipeline: Arc<dyn Pipeline>,
        context: ProcessingContext,
    ) -> Result<ProcessingResult, MidwayError> {
        sandbox.run(&self.unit, &self.config, context, pipeline).await
    }
}
