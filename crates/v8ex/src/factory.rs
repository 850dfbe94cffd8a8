//! Executor factory.
//!
//! Binds one [`RuntimeConfig`] to repeated executor creation requests.
//! Each [`ExecutorFactory::create`] resolves a fresh startup plan (the
//! cache directory may have changed since the last call), constructs an
//! independent engine instance, and attaches its idle-maintenance
//! registration. The factory holds no instance state.

use crate::config::{CodecacheMode, RuntimeConfig};
use crate::engine::{self, EngineBackend};
use crate::env::HostEnv;
use crate::error::ExecutorError;
use crate::executor::Executor;
use crate::mainloop::IdleSource;
use crate::plan::{self, ResolvedStartupPlan};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Fixed identity literal for this backend+runtime pairing, surfaced to
/// the host for diagnostics.
pub const EXECUTOR_IDENTITY: &str = "JSIExecutor+V8Runtime";

/// Bootstrap-bundle name substituted when a warm bytecode cache makes
/// the full main bundle redundant.
pub const STUB_BUNDLE_NAME: &str = "stub.bundle";

pub struct ExecutorFactory {
    config: Arc<RuntimeConfig>,
    env: Arc<dyn HostEnv>,
    backend: Arc<dyn EngineBackend>,
    idle_source: Arc<dyn IdleSource>,
}

impl ExecutorFactory {
    pub fn new(
        config: RuntimeConfig,
        env: Arc<dyn HostEnv>,
        backend: Arc<dyn EngineBackend>,
        idle_source: Arc<dyn IdleSource>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            env,
            backend,
            idle_source,
        }
    }

    /// The captured configuration. Shared and immutable; concurrent
    /// creations all observe the same values.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Create one executor.
    ///
    /// If the engine rejects the resolved plan (incompatible snapshot,
    /// corrupt cache), retries exactly once with caching disabled; a
    /// second rejection is fatal. The caller receives either a working
    /// executor or an error, never a partial instance.
    pub fn create(&self) -> Result<Executor, ExecutorError> {
        engine::init_process();

        let plan = plan::resolve(&self.config, &*self.env);
        let mut executor = match Executor::start(&*self.backend, &self.config, &plan) {
            Ok(executor) => executor,
            Err(err) => {
                warn!(error = %err, "engine rejected startup plan; retrying without caching");
                Executor::start(&*self.backend, &self.config, &ResolvedStartupPlan::disabled())?
            }
        };
        executor.attach_idle(Arc::clone(&self.idle_source));
        Ok(executor)
    }

    /// Sampling-profiler integration is not provided by this backend.
    pub fn start_sampling_profiler(&self) -> Result<(), ExecutorError> {
        Err(ExecutorError::UnsupportedCapability(
            "starting sampling profiler",
        ))
    }

    /// Sampling-profiler integration is not provided by this backend.
    pub fn stop_sampling_profiler(&self, _filename: &str) -> Result<(), ExecutorError> {
        Err(ExecutorError::UnsupportedCapability(
            "stopping sampling profiler",
        ))
    }

    /// Substitute bootstrap-bundle name, or `None` for no substitution.
    ///
    /// Returns [`STUB_BUNDLE_NAME`] only when developer support is
    /// disabled, the mode is `NormalWithStubBundle`, and a prior cache
    /// blob exists at the resolved path right now.
    pub fn bundle_asset_name(&self, use_developer_support: bool) -> Option<String> {
        if use_developer_support {
            return None;
        }
        let plan = plan::resolve(&self.config, &*self.env);
        if plan.codecache_mode == CodecacheMode::NormalWithStubBundle && plan.use_stub_bundle {
            Some(STUB_BUNDLE_NAME.to_string())
        } else {
            None
        }
    }
}

impl fmt::Display for ExecutorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(EXECUTOR_IDENTITY)
    }
}
