// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the midway middleware host.
//!
//! This crate provides the error taxonomy, the opaque values exchanged with
//! the host pipeline, and the [`Pipeline`] boundary trait. Every other crate
//! in the workspace depends on it.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MidwayError;
pub use traits::{IdentityPipeline, Pipeline};
pub use types::{
    BASE_UID, ConfigPayload, DEFAULT_DESCRIPTION, ProcessingContext, ProcessingResult,
    UnitDescriptor, UnitLogLevel, config_payload_from_value, parse_config_payload,
};
