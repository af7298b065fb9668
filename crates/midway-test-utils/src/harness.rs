// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Throwaway extension roots for discovery and dispatch tests.
//!
//! `PluginTree` owns a temp directory laid out like an extension root:
//! plugin roots below it, one sub-directory per module, each with a
//! `middleware.toml` manifest and its unit sources.

use std::path::{Path, PathBuf};

use midway_config::{HostConfig, MidwayConfig, SandboxConfig};

pub use crate::wat::{
    BROKEN, CALLS_PROCESS, ECHO_CONFIG, INFINITE_LOOP, LOGGING, NO_EXPORT, PASSTHROUGH, TRAPS,
    result_unit,
};

/// Plugin root used by [`PluginTree::write_module`].
pub const DEFAULT_ROOT: &str = "middleware";

/// A temp extension root. Removed on drop.
pub struct PluginTree {
    dir: tempfile::TempDir,
}

impl PluginTree {
    /// Creates an empty extension root.
    ///
    /// Panics if the temp directory cannot be created.
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().expect("failed to create temp extension root");
        Self { dir }
    }

    /// The extension root itself.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The default plugin root, `<extension root>/middleware`.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join(DEFAULT_ROOT)
    }

    /// Where the default configuration puts the catalog.
    pub fn catalog_path(&self) -> PathBuf {
        self.dir.path().join("storage").join("middleware.db.json")
    }

    /// Writes a module under the default plugin root and returns its directory.
    pub fn write_module(&self, module: &str, manifest: &str, sources: &[(&str, &str)]) -> PathBuf {
        self.write_module_in(DEFAULT_ROOT, module, manifest, sources)
    }

    /// Writes a module under `root` (relative to the extension root).
    ///
    /// The manifest is always rewritten; sources are written or overwritten
    /// by file name and existing files not listed are left alone.
    pub fn write_module_in(
        &self,
        root: &str,
        module: &str,
        manifest: &str,
        sources: &[(&str, &str)],
    ) -> PathBuf {
        let dir = self.dir.path().join(root).join(module);
        std::fs::create_dir_all(&dir).expect("failed to create module directory");
        std::fs::write(dir.join("middleware.toml"), manifest).expect("failed to write manifest");
        for (file, content) in sources {
            std::fs::write(dir.join(file), content).expect("failed to write unit source");
        }
        dir
    }

    /// Overwrites one source file of a module under the default root.
    pub fn write_source(&self, module: &str, file: &str, content: &str) {
        let path = self.root().join(module).join(file);
        std::fs::write(path, content).expect("failed to write unit source");
    }

    /// Configuration rooted at this tree, with a small sandbox budget.
    pub fn config(&self) -> MidwayConfig {
        MidwayConfig {
            host: HostConfig {
                extension_root: self.dir.path().to_string_lossy().into_owned(),
                ..HostConfig::default()
            },
            sandbox: SandboxConfig {
                fuel: 10_000_000,
                epoch_timeout_secs: 5,
            },
        }
    }
}

impl Default for PluginTree {
    fn default() -> Self {
        Self::new()
    }
}

/// A one-unit `[[middleware]]` manifest entry.
pub fn unit_manifest(uid: &str, name: &str, source: &str) -> String {
    format!("[[middleware]]\nuid = \"{uid}\"\nname = \"{name}\"\nsource = \"{source}\"\n")
}
