//! Debug Adapter Protocol subset used to inspect a paused session
//!
//! Only four requests are ever issued: `threads`, `stackTrace`, `evaluate`
//! and `readMemory`. Wire types come from the `dap` crate. [`DebugTransport`]
//! is the capability the capture core depends on; any host supplies an
//! implementation.

use async_trait::async_trait;

use crate::error::TransportError;

pub use dap::requests::{EvaluateArguments, ReadMemoryArguments, StackTraceArguments};
pub use dap::responses::{EvaluateResponse, ReadMemoryResponse, StackTraceResponse, ThreadsResponse};
pub use dap::types::{EvaluateArgumentsContext, StackFrame, Thread};

/// Build a thread entry
pub fn thread(id: i64, name: impl Into<String>) -> Thread {
    Thread {
        id,
        name: name.into(),
    }
}

/// Build a stack frame without source information
pub fn stack_frame(id: i64, name: impl Into<String>) -> StackFrame {
    StackFrame {
        id,
        name: name.into(),
        ..Default::default()
    }
}

/// Build an `evaluate` result
pub fn evaluate_response(
    result: impl Into<String>,
    type_name: impl Into<String>,
    memory_reference: Option<&str>,
) -> EvaluateResponse {
    EvaluateResponse {
        result: result.into(),
        type_field: Some(type_name.into()),
        memory_reference: memory_reference.map(str::to_string),
        ..Default::default()
    }
}

/// Runtime type of an evaluated expression, empty when the adapter omits it
pub fn value_type(response: &EvaluateResponse) -> &str {
    response.type_field.as_deref().unwrap_or("")
}

/// Request/response channel to a paused debug session
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DebugTransport: Send + Sync {
    /// All threads of the debuggee
    async fn threads(&self) -> Result<Vec<Thread>, TransportError>;

    /// Stack frames of a thread; `levels: None` requests every frame
    async fn stack_trace(
        &self,
        thread_id: i64,
        start_frame: i64,
        levels: Option<i64>,
    ) -> Result<Vec<StackFrame>, TransportError>;

    /// Evaluate an expression in the scope of a frame
    async fn evaluate(
        &self,
        expression: &str,
        frame_id: i64,
        context: EvaluateArgumentsContext,
    ) -> Result<EvaluateResponse, TransportError>;

    /// Read raw bytes starting at a memory reference
    async fn read_memory(
        &self,
        memory_reference: &str,
        offset: i64,
        count: u64,
    ) -> Result<ReadMemoryResponse, TransportError>;
}
