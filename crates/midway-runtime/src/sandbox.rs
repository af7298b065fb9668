// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WASM unit sandbox using wasmtime.
//!
//! Each run creates a fresh [`wasmtime::Store`] holding the instance
//! configuration, the current processing context and the host pipeline.
//! Units talk to the host through the `midway` import module:
//!
//! | import | signature |
//! |---|---|
//! | `log` | `(level, ptr, len)` |
//! | `config_len` / `read_config` | `() -> i32` / `(ptr)` |
//! | `context_len` / `read_context` | `() -> i32` / `(ptr)` |
//! | `set_context` | `(ptr, len) -> i32` |
//! | `process` | `() -> i32` |
//! | `set_result` | `(ptr, len)` |
//!
//! Host functions that cannot complete trap instead of returning error codes,
//! so a misbehaving unit halts at the faulting call.

use std::sync::Arc;

use anyhow::anyhow;
use midway_config::SandboxConfig;
use midway_core::{
    ConfigPayload, MidwayError, Pipeline, ProcessingContext, ProcessingResult, UnitLogLevel,
};
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};
use wasmtime::{Caller, Config, Engine, Linker, Memory, Store};

use crate::module_cache::LoadedUnit;

/// Host import module name.
pub const HOST_MODULE: &str = "midway";

/// Per-run state stored in the wasmtime store.
struct UnitState {
    uid: String,
    config_json: String,
    context: Value,
    pipeline: Arc<dyn Pipeline>,
    /// Result of the most recent `process` call.
    processed: Option<ProcessingResult>,
    /// Result set explicitly through `set_result`.
    explicit: Option<Value>,
    /// The pipeline error that caused a `process` trap, if any.
    pipeline_error: Option<MidwayError>,
    output: Vec<String>,
}

impl UnitState {
    fn run_pipeline(&mut self) -> Result<(), MidwayError> {
        match self.pipeline.process(ProcessingContext(self.context.clone())) {
            Ok(result) => {
                self.processed = Some(result);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.pipeline_error = Some(e);
                Err(MidwayError::Pipeline(message))
            }
        }
    }

    fn context_json(&self) -> String {
        self.context.to_string()
    }

    /// Explicit result, else the pipeline result, else JSON null.
    fn into_result(self) -> ProcessingResult {
        match (self.explicit, self.processed) {
            (Some(value), _) => ProcessingResult(value),
            (None, Some(result)) => result,
            (None, None) => ProcessingResult(Value::Null),
        }
    }
}

/// Creates the wasmtime engine shared by the module cache and the sandbox,
/// with fuel metering and epoch interruption enabled.
pub fn sandbox_engine() -> Result<Engine, MidwayError> {
    let mut config = Config::new();
    config.consume_fuel(true);
    config.epoch_interruption(true);

    let engine = Engine::new(&config).map_err(|e| {
        MidwayError::Internal(format!("failed to create wasmtime engine: {e}"))
    })?;
    info!("WASM unit runtime initialized");
    Ok(engine)
}

/// Epoch increments the ticker issues: one past the deadline, so an
/// overrunning unit always sees it.
fn epoch_ticks(timeout_secs: u64) -> u64 {
    timeout_secs.saturating_add(1)
}

/// Runs unit code with per-run fuel and wall-clock limits.
pub struct UnitSandbox {
    engine: Engine,
    limits: SandboxConfig,
}

impl UnitSandbox {
    pub fn new(engine: Engine, limits: SandboxConfig) -> Self {
        Self { engine, limits }
    }

    /// Runs `unit` once against `context`.
    ///
    /// The store is created with the configured fuel and an epoch deadline.
    /// A background ticker advances the engine epoch once a second while the
    /// unit executes on a blocking thread.
    pub async fn run(
        &self,
        unit: &LoadedUnit,
        config: &ConfigPayload,
        context: ProcessingContext,
        pipeline: Arc<dyn Pipeline>,
    ) -> Result<ProcessingResult, MidwayError> {
        let uid = unit.class.uid().to_string();
        let config_json = serde_json::to_string(config).map_err(|e| MidwayError::ConfigurationParse {
            message: format!("failed to serialize configuration: {e}"),
            source: Some(Box::new(e)),
        })?;

        let state = UnitState {
            uid: uid.clone(),
            config_json,
            context: context.0,
            pipeline,
            processed: None,
            explicit: None,
            pipeline_error: None,
            output: Vec::new(),
        };
        let mut store = Store::new(&self.engine, state);

        store.set_fuel(self.limits.fuel).map_err(|e| MidwayError::Unit {
            uid: uid.clone(),
            message: format!("failed to set fuel: {e}"),
        })?;
        store.epoch_deadline_trap();
        store.set_epoch_deadline(self.limits.epoch_timeout_secs);

        let mut linker = Linker::new(&self.engine);
        define_host_functions(&mut linker)?;

        let engine = self.engine.clone();
        let timeout_secs = self.limits.epoch_timeout_secs;
        let ticker = tokio::spawn(async move {
            for _ in 0..epoch_ticks(timeout_secs) {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                engine.increment_epoch();
            }
        });

        let code = unit.code.clone();
        let export = unit.class.run_export().to_string();
        let requires_export = unit.class.requires_export();

        let joined = tokio::task::spawn_blocking(move || {
            let outcome = execute(&mut store, &linker, &code, &export, requires_export);
            (store, outcome)
        })
        .await;
        ticker.abort();

        let (store, outcome) = joined.map_err(|e| MidwayError::Unit {
            uid: uid.clone(),
            message: format!("unit execution task panicked: {e}"),
        })?;

        let mut state = store.into_data();
        for line in &state.output {
            trace!(uid = %uid, "{line}");
        }

        if let Err(e) = outcome {
            if let Some(pipeline_error) = state.pipeline_error.take() {
                return Err(pipeline_error);
            }
            let message = describe_failure(&e, &self.limits);
            error!(uid = %uid, error = %message, "middleware run failed");
            return Err(MidwayError::Unit { uid, message });
        }

        debug!(uid = %uid, "middleware run complete");
        Ok(state.into_result())
    }
}

/// Instantiates the unit and calls its run export. A unit without the
/// conventional export, and without an explicit one in its manifest, passes
/// the context straight to the pipeline.
fn execute(
    store: &mut Store<UnitState>,
    linker: &Linker<UnitState>,
    code: &wasmtime::Module,
    export: &str,
    requires_export: bool,
) -> anyhow::Result<()> {
    let instance = linker.instantiate(&mut *store, code)?;

    let Some(func) = instance.get_func(&mut *store, export) else {
        if requires_export {
            return Err(anyhow!("unit has no '{export}' export"));
        }
        debug!(uid = %store.data().uid, "no run export, passing context through");
        store.data_mut().run_pipeline()?;
        return Ok(());
    };

    let run = func
        .typed::<(), ()>(&*store)
        .map_err(|e| anyhow!("export '{export}' has the wrong signature: {e}"))?;
    run.call(&mut *store, ())?;
    Ok(())
}

fn describe_failure(e: &anyhow::Error, limits: &SandboxConfig) -> String {
    let message = format!("{e:#}");
    if message.contains("all fuel consumed") {
        format!("exceeded fuel limit ({} fuel units): {message}", limits.fuel)
    } else if message.contains("wasm trap: interrupt") {
        format!(
            "exceeded wall-clock timeout ({}s): {message}",
            limits.epoch_timeout_secs
        )
    } else {
        format!("execution error: {message}")
    }
}

fn define_host_functions(linker: &mut Linker<UnitState>) -> Result<(), MidwayError> {
    linker
        .func_wrap(
            HOST_MODULE,
            "log",
            |mut caller: Caller<'_, UnitState>, level: i32, ptr: i32, len: i32| {
                let Some(memory) = exported_memory(&mut caller) else {
                    return;
                };
                if let Some(msg) = read_string_from_memory(&memory, &caller, ptr, len) {
                    let level = UnitLogLevel::from_raw(level);
                    let uid = caller.data().uid.clone();
                    match level {
                        UnitLogLevel::Warn | UnitLogLevel::Error => {
                            warn!(uid = %uid, unit_log = %msg, level = %level, "middleware log")
                        }
                        _ => debug!(uid = %uid, unit_log = %msg, level = %level, "middleware log"),
                    }
                    caller.data_mut().output.push(format!("[{level}] {msg}"));
                }
            },
        )
        .map_err(linker_err)?;

    linker
        .func_wrap(HOST_MODULE, "config_len", |caller: Caller<'_, UnitState>| -> i32 {
            caller.data().config_json.len() as i32
        })
        .map_err(linker_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "read_config",
            |mut caller: Caller<'_, UnitState>, ptr: i32| -> Result<(), wasmtime::Error> {
                let config = caller.data().config_json.clone();
                write_to_guest(&mut caller, ptr, config.as_bytes())
            },
        )
        .map_err(linker_err)?;

    linker
        .func_wrap(HOST_MODULE, "context_len", |caller: Caller<'_, UnitState>| -> i32 {
            caller.data().context_json().len() as i32
        })
        .map_err(linker_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "read_context",
            |mut caller: Caller<'_, UnitState>, ptr: i32| -> Result<(), wasmtime::Error> {
                let context = caller.data().context_json();
                write_to_guest(&mut caller, ptr, context.as_bytes())
            },
        )
        .map_err(linker_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "set_context",
            |mut caller: Caller<'_, UnitState>, ptr: i32, len: i32| -> Result<i32, wasmtime::Error> {
                let text = read_from_guest(&mut caller, ptr, len)?;
                let value: Value = serde_json::from_str(&text)
                    .map_err(|e| anyhow!("set_context: invalid JSON: {e}"))?;
                caller.data_mut().context = value;
                Ok(0)
            },
        )
        .map_err(linker_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "process",
            |mut caller: Caller<'_, UnitState>| -> Result<i32, wasmtime::Error> {
                caller
                    .data_mut()
                    .run_pipeline()
                    .map_err(|e| anyhow!("process: {e}"))?;
                Ok(0)
            },
        )
        .map_err(linker_err)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "set_result",
            |mut caller: Caller<'_, UnitState>, ptr: i32, len: i32| -> Result<(), wasmtime::Error> {
                let text = read_from_guest(&mut caller, ptr, len)?;
                let value: Value = serde_json::from_str(&text)
                    .map_err(|e| anyhow!("set_result: invalid JSON: {e}"))?;
                caller.data_mut().explicit = Some(value);
                Ok(())
            },
        )
        .map_err(linker_err)?;

    Ok(())
}

fn exported_memory(caller: &mut Caller<'_, UnitState>) -> Option<Memory> {
    match caller.get_export("memory") {
        Some(wasmtime::Extern::Memory(mem)) => Some(mem),
        _ => None,
    }
}

fn read_from_guest(
    caller: &mut Caller<'_, UnitState>,
    ptr: i32,
    len: i32,
) -> Result<String, wasmtime::Error> {
    let memory =
        exported_memory(caller).ok_or_else(|| anyhow!("WASM module has no exported memory"))?;
    let text = read_string_from_memory(&memory, caller, ptr, len)
        .ok_or_else(|| anyhow!("invalid UTF-8 or out-of-bounds read at {ptr}+{len}"))?;
    Ok(text)
}

fn write_to_guest(
    caller: &mut Caller<'_, UnitState>,
    ptr: i32,
    bytes: &[u8],
) -> Result<(), wasmtime::Error> {
    let memory =
        exported_memory(caller).ok_or_else(|| anyhow!("WASM module has no exported memory"))?;
    if !write_bytes_to_memory(&memory, caller, ptr, bytes) {
        return Err(anyhow!("out-of-bounds write of {} bytes at {ptr}", bytes.len()).into());
    }
    Ok(())
}

fn read_string_from_memory(
    memory: &Memory,
    caller: &Caller<'_, UnitState>,
    ptr: i32,
    len: i32,
) -> Option<String> {
    let ptr = usize::try_from(ptr).ok()?;
    let len = usize::try_from(len).ok()?;
    let data = memory.data(caller);
    let end = ptr.checked_add(len)?;
    if end > data.len() {
        return None;
    }
    String::from_utf8(data[ptr..end].to_vec()).ok()
}

fn write_bytes_to_memory(
    memory: &Memory,
    caller: &mut Caller<'_, UnitState>,
    ptr: i32,
    bytes: &[u8],
) -> bool {
    let Ok(ptr) = usize::try_from(ptr) else {
        return false;
    };
    let data = memory.data_mut(caller);
    match ptr.checked_add(bytes.len()) {
        Some(end) if end <= data.len() => {
            data[ptr..end].copy_from_slice(bytes);
            true
        }
        _ => false,
    }
}

fn linker_err(e: wasmtime::Error) -> MidwayError {
    MidwayError::Internal(format!("failed to define host function: {e}"))
}
