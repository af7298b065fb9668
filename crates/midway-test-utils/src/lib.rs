// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for midway integration tests.
//!
//! Provides throwaway plugin trees and a recording pipeline so discovery,
//! catalog and dispatch can be exercised without a real host application.
//!
//! # Components
//!
//! - [`PluginTree`] - temp extension root with helpers for writing modules
//! - [`RecordingPipeline`] - pipeline that records every context it processes
//! - [`wat`] - text-format unit fixtures

pub mod harness;
pub mod mock_pipeline;
pub mod wat;

pub use harness::{PluginTree, unit_manifest};
pub use mock_pipeline::RecordingPipeline;
