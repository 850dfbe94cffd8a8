//! Engine backend seam.
//!
//! The native engine (compilation, execution, GC) is an external
//! collaborator. The core talks to it through two traits: a
//! [`EngineBackend`] that turns startup parameters into live sessions,
//! and the [`EngineSession`] itself, which accepts maintenance signals
//! until it is shut down.

use crate::config::{CodecacheMode, RuntimeConfig};
use crate::plan::ResolvedStartupPlan;
use std::sync::{Arc, Once};
use thiserror::Error;
use tracing::info;

/// Everything the engine needs to construct one instance.
#[derive(Debug, Clone)]
pub struct EngineStartup {
    pub timezone_id: String,
    pub enable_inspector: bool,
    pub app_name: String,
    pub device_name: String,
    /// Empty means "no snapshot".
    pub snapshot_path: String,
    pub codecache_mode: CodecacheMode,
    /// Empty means "no cache".
    pub codecache_path: String,
    /// Load the stub bootstrap bundle instead of the full main bundle.
    pub use_stub_bundle: bool,
}

impl EngineStartup {
    pub fn new(config: &RuntimeConfig, plan: &ResolvedStartupPlan) -> Self {
        Self {
            timezone_id: config.timezone_id.clone(),
            enable_inspector: config.enable_inspector,
            app_name: config.app_name.clone(),
            device_name: config.device_name.clone(),
            snapshot_path: plan.snapshot_path.clone(),
            codecache_mode: plan.codecache_mode,
            codecache_path: plan.codecache_path.clone(),
            use_stub_bundle: plan.use_stub_bundle,
        }
    }
}

/// Construction-level failure reported by the engine.
///
/// Every variant triggers exactly one retry with caching disabled; a
/// second failure propagates to the caller as fatal.
#[derive(Debug, Error)]
pub enum EngineInitError {
    /// Snapshot blob rejected (version/ABI mismatch).
    #[error("incompatible startup snapshot: {0}")]
    IncompatibleSnapshot(String),

    /// Bytecode cache blob rejected as corrupt.
    #[error("corrupt bytecode cache: {0}")]
    CorruptCache(String),

    /// Any other failure the native layer reports.
    #[error("engine initialization failed: {0}")]
    Native(String),
}

/// One live engine instance.
///
/// Sessions are handed out as `Arc<dyn EngineSession>`; the executor
/// keeps the only strong reference on the lifecycle path, while the
/// idle coordinator holds a `Weak` so late signals observe teardown.
pub trait EngineSession: Send + Sync {
    /// Low-priority maintenance signal, forwarded when the host loop
    /// is idle. Must be a no-op after shutdown.
    fn notify_idle(&self);

    /// Release native resources. Called exactly once by the executor.
    fn shutdown(&self);
}

/// Constructs engine sessions from startup parameters.
pub trait EngineBackend: Send + Sync {
    fn init(&self, startup: &EngineStartup) -> Result<Arc<dyn EngineSession>, EngineInitError>;
}

static PROCESS_INIT: Once = Once::new();

/// One-time process-wide engine platform setup.
///
/// Replaces the classic static native-library-loading side effect with
/// an explicit, idempotent step. Runs before the first executor is
/// created; repeat calls are no-ops.
pub fn init_process() {
    PROCESS_INIT.call_once(|| {
        info!("engine platform initialized for this process");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{BuildFlags, DirHostEnv};
    use tempfile::TempDir;

    #[test]
    fn test_startup_carries_config_and_plan_fields() {
        let dir = TempDir::new().unwrap();
        let env = DirHostEnv::new(
            dir.path().join("assets"),
            dir.path().join("code_cache"),
            "x86_64",
            BuildFlags::default(),
        );
        let mut config = RuntimeConfig::create_default(&env);
        config.app_name = "app".to_string();
        config.enable_inspector = true;

        let plan = ResolvedStartupPlan {
            snapshot_path: "assets://x86_64/snapshot_blob.bin".to_string(),
            codecache_path: "/cache/v8codecache.bin".to_string(),
            codecache_mode: CodecacheMode::Normal,
            use_stub_bundle: false,
        };

        let startup = EngineStartup::new(&config, &plan);
        assert_eq!(startup.app_name, "app");
        assert!(startup.enable_inspector);
        assert_eq!(startup.snapshot_path, plan.snapshot_path);
        assert_eq!(startup.codecache_mode, CodecacheMode::Normal);
    }

    #[test]
    fn test_init_process_is_idempotent() {
        init_process();
        init_process();
    }
}
