// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scaffold generator for `midway init`.
//!
//! Creates a passthrough middleware module ready to edit:
//! ```text
//! {plugin_root}/{name}/
//! +-- middleware.toml   # one [[middleware]] entry
//! +-- {name}.wat        # run() hands the context to the pipeline
//! ```

use std::path::{Path, PathBuf};

use midway_core::MidwayError;

/// Scaffolds a new middleware module under `plugin_root` and returns its directory.
///
/// The unit identifier is `name` lowercased with hyphens turned into
/// underscores. Fails if the module directory already exists.
pub fn scaffold_module(name: &str, plugin_root: &Path) -> Result<PathBuf, MidwayError> {
    if name.is_empty() {
        return Err(MidwayError::Config("module name must not be empty".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(MidwayError::Config(format!(
            "module name '{name}' contains invalid characters \
             (only alphanumeric, hyphens, underscores allowed)"
        )));
    }

    let module_dir = plugin_root.join(name);
    if module_dir.exists() {
        return Err(MidwayError::Config(format!(
            "directory '{}' already exists",
            module_dir.display()
        )));
    }
    std::fs::create_dir_all(&module_dir).map_err(|e| MidwayError::io("create", &module_dir, e))?;

    let uid = name.to_lowercase().replace('-', "_");
    let manifest = format!(
        r#"# name can be anything, but uid must be unique
[[middleware]]
uid = "{uid}"
name = "{name}"
description = "Passes the processing context through unchanged."
source = "{name}.wat"
# export = "run"

[middleware.default_config]
"#
    );
    write_file(&module_dir.join("middleware.toml"), &manifest)?;

    let wat = r#";; Host functions live in the "midway" module:
;;   log(level, ptr, len)                  emit a log line (0 trace .. 4 error)
;;   config_len() -> i32, read_config(ptr)    instance configuration JSON
;;   context_len() -> i32, read_context(ptr)  processing context JSON
;;   set_context(ptr, len) -> i32         replace the context
;;   process() -> i32                     run the host pipeline on the context
;;   set_result(ptr, len)                 set the result JSON
(module
  (import "midway" "process" (func $process (result i32)))
  (memory (export "memory") 1)
  (func (export "run")
    (drop (call $process))))
"#;
    write_file(&module_dir.join(format!("{name}.wat")), wat)?;

    Ok(module_dir)
}

fn write_file(path: &Path, content: &str) -> Result<(), MidwayError> {
    std::fs::write(path, content).map_err(|e| MidwayError::io("write", path, e))
}

#[cfg(test)]
mod tests {
    use midway_plugin::{ManifestImporter, discover};

    use super::*;

    #[test]
    fn scaffold_creates_module_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = scaffold_module("My-Middleware", tmp.path()).unwrap();

        assert_eq!(dir, tmp.path().join("My-Middleware"));
        assert!(dir.join("middleware.toml").is_file());
        assert!(dir.join("My-Middleware.wat").is_file());
    }

    #[test]
    fn scaffolded_module_is_discoverable() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("middleware");
        scaffold_module("sharpen", &root).unwrap();

        let registry = discover(&[root], &ManifestImporter::new());
        let class = registry.get("sharpen").unwrap();
        assert_eq!(class.name(), "sharpen");
        assert_eq!(class.module.path, "middleware.sharpen");
        assert!(class.default_configuration().is_empty());
    }

    #[test]
    fn scaffold_rejects_empty_name() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scaffold_module("", tmp.path()).is_err());
    }

    #[test]
    fn scaffold_rejects_invalid_characters() {
        let tmp = tempfile::tempdir().unwrap();
        let err = scaffold_module("bad name!", tmp.path()).unwrap_err();
        assert!(err.to_string().contains("invalid characters"));
    }

    #[test]
    fn scaffold_rejects_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("taken")).unwrap();
        let err = scaffold_module("taken", tmp.path()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
