// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host pipeline boundary.

use crate::error::MidwayError;
use crate::types::{ProcessingContext, ProcessingResult};

/// The host's processing pipeline.
///
/// Units reach it through the `process` host function; a unit without a run
/// export is handed straight to it. Implementations are called from the
/// sandbox's blocking thread, so they must not assume an async context.
pub trait Pipeline: Send + Sync + 'static {
    /// Processes a context and returns the host's result.
    fn process(&self, context: ProcessingContext) -> Result<ProcessingResult, MidwayError>;
}

/// No-op pipeline that returns the context unchanged as the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPipeline;

impl Pipeline for IdentityPipeline {
    fn process(&self, context: ProcessingContext) -> Result<ProcessingResult, MidwayError> {
        Ok(context.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_pipeline_passes_context_through() {
        let ctx = ProcessingContext(serde_json::json!({"steps": 20}));
        let result = IdentityPipeline.process(ctx.clone()).unwrap();
        assert_eq!(result.0, ctx.0);
    }
}
