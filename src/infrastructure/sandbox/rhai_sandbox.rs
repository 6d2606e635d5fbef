//! Rhai-backed script sandbox
//!
//! Scripts run in a fresh engine with no module resolution, no `eval` and
//! hard limits on operations, call depth and data sizes. The engine is only
//! ever given the bindings it is handed; Rhai has no filesystem, process or
//! network access of its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::workflow::{ScriptRequest, ScriptSandbox, WorkflowError};

/// Name of the variable a script assigns its result to
pub const OUTPUT_VARIABLE: &str = "output";

/// Resource limits applied to every script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
    /// Zero disables the operation limit; the wall-clock timeout still applies
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_operations: 1_000_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_string_size: 1_048_576,
            max_array_size: 10_000,
            max_map_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RhaiSandbox {
    limits: SandboxLimits,
}

impl RhaiSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: SandboxLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }
}

fn build_engine(limits: &SandboxLimits, abort: Option<Arc<AtomicBool>>) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.set_max_expr_depths(limits.max_expr_depth, limits.max_expr_depth);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);

    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");

    engine.on_print(|text| info!(target: "script", "{}", text));
    engine.on_debug(|text, source, pos| {
        debug!(target: "script", source = source.unwrap_or(""), position = %pos, "{}", text)
    });

    if let Some(abort) = abort {
        engine.on_progress(move |_| {
            if abort.load(Ordering::Relaxed) {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });
    }

    engine
}

fn to_dynamic(name: &str, value: &Value) -> Result<Dynamic, WorkflowError> {
    rhai::serde::to_dynamic(value)
        .map_err(|e| WorkflowError::script(format!("Cannot bind '{}': {}", name, e)))
}

fn script_error(err: Box<EvalAltResult>) -> WorkflowError {
    match *err {
        EvalAltResult::ErrorTooManyOperations(_) => {
            WorkflowError::script("Script exceeded the operation limit")
        }
        other => WorkflowError::script(other.to_string()),
    }
}

/// Compile and run a script, returning the final value of `output`
fn run_blocking(
    limits: &SandboxLimits,
    abort: Arc<AtomicBool>,
    request: &ScriptRequest,
) -> Result<Value, WorkflowError> {
    let engine = build_engine(limits, Some(abort));
    let ast = engine
        .compile(&request.code)
        .map_err(|e| WorkflowError::script(format!("Syntax error: {}", e)))?;

    let mut scope = Scope::new();
    scope.push_dynamic("inputs", to_dynamic("inputs", &request.inputs)?);
    scope.push_dynamic("results", to_dynamic("results", &request.results)?);
    scope.push_dynamic("context", to_dynamic("context", &request.context)?);
    scope.push(OUTPUT_VARIABLE, ());

    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(script_error)?;

    let output = scope
        .get_value::<Dynamic>(OUTPUT_VARIABLE)
        .unwrap_or(Dynamic::UNIT);

    rhai::serde::from_dynamic::<Value>(&output)
        .map_err(|e| WorkflowError::script(format!("Unsupported output value: {}", e)))
}

/// Stops a running script once its caller is gone
struct AbortOnDrop(Arc<AtomicBool>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Truthiness of an evaluated condition
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[async_trait]
impl ScriptSandbox for RhaiSandbox {
    async fn run(&self, request: ScriptRequest) -> Result<Value, WorkflowError> {
        let timeout = request.timeout;
        let timeout_ms = timeout.as_millis() as u64;
        let cancellation = request.cancellation.clone();
        let abort = Arc::new(AtomicBool::new(false));
        let _guard = AbortOnDrop(abort.clone());

        let task = tokio::task::spawn_blocking({
            let limits = self.limits.clone();
            let abort = abort.clone();
            move || run_blocking(&limits, abort, &request)
        });

        tokio::select! {
            joined = tokio::time::timeout(timeout, task) => match joined {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(WorkflowError::script(format!("Script task failed: {}", e))),
                Err(_) => {
                    warn!(timeout_ms, "Script timed out");
                    Err(WorkflowError::timeout("script", timeout_ms))
                }
            },
            _ = cancellation.cancelled() => Err(WorkflowError::Cancelled),
        }
    }

    fn evaluate_condition(&self, expression: &str) -> Result<bool, WorkflowError> {
        let engine = build_engine(&self.limits, None);
        let result = engine
            .eval_expression::<Dynamic>(expression)
            .map_err(script_error)?;

        let value = rhai::serde::from_dynamic::<Value>(&result)
            .map_err(|e| WorkflowError::script(e.to_string()))?;

        Ok(is_truthy(&value))
    }
}
