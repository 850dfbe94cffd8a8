//! Factory-surface error taxonomy.
//!
//! Resolution-level degradation never reaches here (it falls back to
//! empty paths locally), and late idle callbacks are swallowed at the
//! coordinator. What remains: a fatal engine construction failure after
//! the single degraded retry, and capability gaps that fail fast.

use crate::engine::EngineInitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Engine construction failed, including the retry with caching
    /// disabled. There is no engine to return.
    #[error("engine initialization failed: {0}")]
    EngineInit(#[from] EngineInitError),

    /// The requested operation is not provided by this engine backend.
    /// Deterministic and never retried.
    #[error("{0} is not supported on JSIExecutor+V8Runtime")]
    UnsupportedCapability(&'static str),
}
