// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hot-reloading dispatch of middleware units.
//!
//! Unit code is WebAssembly. The [`ModuleCache`] compiles every module at
//! discovery time and recompiles it from disk right before each run, so edits
//! take effect without restarting the host. The [`UnitSandbox`] runs one
//! [`UnitInstance`] per dispatch in a fresh wasmtime store with fuel and
//! deadline limits. [`MiddlewareHost`] ties discovery, catalog and dispatch
//! together behind one handle.

pub mod dispatcher;
pub mod host;
pub mod instance;
pub mod module_cache;
pub mod sandbox;

pub use dispatcher::Dispatcher;
pub use host::MiddlewareHost;
pub use instance::UnitInstance;
pub use module_cache::{LoadedUnit, ModuleCache, ReloadableModuleRef};
pub use sandbox::{UnitSandbox, sandbox_engine};
