// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary traits between midway and its host.

pub mod pipeline;

pub use pipeline::{IdentityPipeline, Pipeline};
