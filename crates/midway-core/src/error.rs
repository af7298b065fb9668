// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the midway middleware host.

use thiserror::Error;

/// The primary error type used across discovery, catalog, resolution and dispatch.
///
/// None of these variants is fatal to the host process: discovery failures are
/// isolated per module, and everything else aborts only the current operation.
#[derive(Debug, Error)]
pub enum MidwayError {
    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Catalog or filesystem errors.
    #[error("storage error: {message}")]
    Storage {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A plugin module could not be imported during discovery.
    #[error("failed to import module {module}: {message}")]
    DiscoveryImport { module: String, message: String },

    /// Dispatch was requested without a selection.
    #[error("Middleware is required")]
    NoSelection,

    /// The selection named an identifier that is not in the registry.
    #[error("Middleware {uid} not found")]
    UnknownUnit { uid: String },

    /// The selection string has no `(<uid>)` group.
    #[error("malformed middleware selection `{selection}`: expected `<name> (<uid>)`")]
    MalformedSelection { selection: String },

    /// The unit's module failed to re-import from disk.
    #[error("failed to reload module {module}: {message}")]
    Reload { module: String, message: String },

    /// The configuration payload is not a valid JSON object.
    #[error("invalid middleware configuration: {message}")]
    ConfigurationParse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The unit trapped, ran out of fuel, or exceeded its deadline.
    #[error("middleware {uid} failed: {message}")]
    Unit { uid: String, message: String },

    /// The host pipeline rejected the processing context.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MidwayError {
    /// Wraps an I/O failure on `path` as a storage error.
    pub fn io(action: &str, path: &std::path::Path, err: std::io::Error) -> Self {
        MidwayError::Storage {
            message: format!("failed to {action} '{}': {err}", path.display()),
            source: Some(Box::new(err)),
        }
    }
}
