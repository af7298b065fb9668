// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unit manifests, registry, discovery, catalog store, and selector resolution.
//!
//! A plugin root is a directory of modules. Each module is a sub-directory with
//! a `middleware.toml` manifest whose `[[middleware]]` entries declare units.
//! Discovery imports every module through a [`ModuleImporter`], registers the
//! resulting [`UnitClass`]es into a fresh [`MiddlewareRegistry`], and the
//! [`CatalogStore`] snapshots that registry to disk. The [`selector`] module
//! owns the `"<name> (<uid>)"` presentation format.

pub mod catalog;
pub mod discovery;
pub mod manifest;
pub mod registry;
pub mod selector;
pub mod unit;

pub use catalog::{Catalog, CatalogEntry, CatalogStore};
pub use discovery::{ManifestImporter, ModuleImporter, discover, find_modules};
pub use manifest::{DEFAULT_EXPORT, MANIFEST_FILE, UnitSection, parse_module_manifest};
pub use registry::{MiddlewareRegistry, RegisterOutcome};
pub use selector::{format_selection, list_selectable_units, natural_cmp, parse_selection, resolve};
pub use unit::{ModuleRef, UnitClass};
