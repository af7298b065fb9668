// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-format unit fixtures built against the `midway` host module.

/// Hands the context to the pipeline unchanged.
pub const PASSTHROUGH: &str = r#"(module
  (import "midway" "process" (func $process (result i32)))
  (memory (export "memory") 1)
  (func (export "run")
    (drop (call $process))))
"#;

/// Replaces the context with `{"via":"unit"}`, then runs the pipeline on it.
pub const CALLS_PROCESS: &str = r#"(module
  (import "midway" "set_context" (func $set_context (param i32 i32) (result i32)))
  (import "midway" "process" (func $process (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "{\"via\":\"unit\"}")
  (func (export "run")
    (drop (call $set_context (i32.const 0) (i32.const 14)))
    (drop (call $process))))
"#;

/// Returns the instance configuration as the result.
pub const ECHO_CONFIG: &str = r#"(module
  (import "midway" "config_len" (func $config_len (result i32)))
  (import "midway" "read_config" (func $read_config (param i32)))
  (import "midway" "set_result" (func $set_result (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "run") (local $len i32)
    (local.set $len (call $config_len))
    (call $read_config (i32.const 0))
    (call $set_result (i32.const 0) (local.get $len))))
"#;

/// Logs one line at info level, then runs the pipeline.
pub const LOGGING: &str = r#"(module
  (import "midway" "log" (func $log (param i32 i32 i32)))
  (import "midway" "process" (func $process (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "hello from unit")
  (func (export "run")
    (call $log (i32.const 2) (i32.const 0) (i32.const 15))
    (drop (call $process))))
"#;

/// A module with memory but no `run` export.
pub const NO_EXPORT: &str = r#"(module
  (memory (export "memory") 1))
"#;

/// Traps as soon as it runs.
pub const TRAPS: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "run") unreachable))
"#;

/// Spins until fuel or the deadline runs out.
pub const INFINITE_LOOP: &str = r#"(module
  (memory (export "memory") 1)
  (func (export "run")
    (loop $forever
      (br $forever))))
"#;

/// Does not parse.
pub const BROKEN: &str = r#"(module
  (func (export "run")
"#;

/// A unit whose result is the literal JSON `json`.
pub fn result_unit(json: &str) -> String {
    let escaped = json.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"(module
  (import "midway" "set_result" (func $set_result (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "{escaped}")
  (func (export "run")
    (call $set_result (i32.const 0) (i32.const {len}))))
"#,
        len = json.len()
    )
}
