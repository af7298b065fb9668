// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent JSON catalog of discovered units.
//!
//! The catalog maps each unit identifier to its display name and module path.
//! Refreshing upserts every discovered unit and leaves everything else in the
//! document alone: entries for units that vanished stay, and so do unknown
//! top-level keys. Writes go through a temp file in the same directory and a
//! rename, so a crash never leaves a half-written catalog. Concurrent refreshes
//! are last-writer-wins.

use std::io::Write;
use std::path::{Path, PathBuf};

use midway_core::MidwayError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::registry::MiddlewareRegistry;
use crate::unit::UnitClass;

/// Catalog record for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub module: String,
}

impl From<&UnitClass> for CatalogEntry {
    fn from(class: &UnitClass) -> Self {
        Self {
            name: class.name().to_string(),
            module: class.module.path.clone(),
        }
    }
}

/// The catalog document.
///
/// Entries are kept as raw JSON so that records this host did not write,
/// whatever their shape, survive a refresh untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub middleware: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Catalog {
    /// Inserts or fully overwrites the record for `uid`.
    pub fn upsert(&mut self, uid: &str, entry: CatalogEntry) {
        let value = serde_json::json!({ "name": entry.name, "module": entry.module });
        self.middleware.insert(uid.to_string(), value);
    }

    /// Upserts every unit in `registry`.
    pub fn merge(&mut self, registry: &MiddlewareRegistry) {
        for class in registry.iter() {
            self.upsert(class.uid(), CatalogEntry::from(class));
        }
    }

    /// Returns the record for `uid` if it has the `name`/`module` shape.
    pub fn entry(&self, uid: &str) -> Option<CatalogEntry> {
        self.middleware
            .get(uid)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

/// Reads and writes the catalog file.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the catalog. A missing file is an empty catalog; an unreadable
    /// or invalid one is a storage error.
    pub fn load(&self) -> Result<Catalog, MidwayError> {
        if !self.path.exists() {
            return Ok(Catalog::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| MidwayError::io("read", &self.path, e))?;
        serde_json::from_str(&content).map_err(|e| MidwayError::Storage {
            message: format!("invalid catalog '{}': {e}", self.path.display()),
            source: Some(Box::new(e)),
        })
    }

    /// Writes `catalog` atomically, creating the parent directory if needed.
    pub fn save(&self, catalog: &Catalog) -> Result<(), MidwayError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| MidwayError::io("create", &parent, e))?;

        let json = serde_json::to_string_pretty(catalog).map_err(|e| MidwayError::Storage {
            message: format!("failed to serialize catalog: {e}"),
            source: Some(Box::new(e)),
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| MidwayError::io("create temp file in", &parent, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.write_all(b"\n"))
            .map_err(|e| MidwayError::io("write", tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| MidwayError::io("replace", &self.path, e.error))?;

        debug!(path = %self.path.display(), entries = catalog.len(), "catalog written");
        Ok(())
    }

    /// Loads the catalog, merges `registry` into it, and writes it back.
    pub fn update_from(&self, registry: &MiddlewareRegistry) -> Result<Catalog, MidwayError> {
        let mut catalog = self.load()?;
        catalog.merge(registry);
        self.save(&catalog)?;
        Ok(catalog)
    }
}
