// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording pipeline for deterministic dispatch tests.

use std::sync::Mutex;

use midway_core::{MidwayError, Pipeline, ProcessingContext, ProcessingResult};
use serde_json::json;

/// A pipeline that records each context it is given.
///
/// The result wraps the context as `{"processed": <context>}` so tests can tell
/// a pipeline result apart from one a unit set directly. With
/// [`RecordingPipeline::failing`] every call returns a pipeline error instead.
#[derive(Default)]
pub struct RecordingPipeline {
    calls: Mutex<Vec<ProcessingContext>>,
    fail_with: Option<String>,
}

impl RecordingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pipeline that rejects every context with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    /// Contexts processed so far, oldest first.
    pub fn calls(&self) -> Vec<ProcessingContext> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl Pipeline for RecordingPipeline {
    fn process(&self, context: ProcessingContext) -> Result<ProcessingResult, MidwayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(context.clone());
        }
        match &self.fail_with {
            Some(message) => Err(MidwayError::Pipeline(message.clone())),
            None => Ok(ProcessingResult(json!({ "processed": context.0 }))),
        }
    }
}
