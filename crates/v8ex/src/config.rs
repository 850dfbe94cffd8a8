//! Executor runtime configuration.
//!
//! One [`RuntimeConfig`] describes the policy for one executor
//! instantiation: engine identity strings, inspector wiring, and the
//! startup-acceleration inputs (snapshot blob and bytecode cache).
//! The factory captures the config once; it is never mutated afterwards.

use crate::env::HostEnv;
use serde::{Deserialize, Serialize};

/// Bytecode caching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecacheMode {
    /// Bytecode caching disabled.
    #[default]
    None,

    /// Classic bytecode caching: read the cache blob when present,
    /// write it back after a successful compile.
    Normal,

    /// **EXPERIMENTAL** Prebuilt bytecode cache shipped as a bundled
    /// asset. Read-only; never written back.
    Prebuilt,

    /// **EXPERIMENTAL** Classic caching, plus loading a stub bundle
    /// instead of the full main bundle when a prior cache blob exists.
    NormalWithStubBundle,
}

/// Policy for one executor instantiation.
///
/// Immutable once built. `None` override paths trigger default
/// resolution against the host environment (see [`crate::plan`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Olson/IANA timezone id handed to the engine at init.
    pub timezone_id: String,

    /// True to enable the engine inspector for DevTools.
    pub enable_inspector: bool,

    /// Application name surfaced to engine debugging/telemetry.
    pub app_name: String,

    /// Device name surfaced to engine debugging/telemetry.
    pub device_name: String,

    /// Startup snapshot blob path. `None` resolves the bundled default.
    pub snapshot_blob_path: Option<String>,

    /// Bytecode caching mode.
    pub codecache_mode: CodecacheMode,

    /// Bytecode cache blob path. `None` resolves the per-mode default.
    pub codecache_path: Option<String>,
}

impl RuntimeConfig {
    /// Default config: no inspector, no caching, timezone resolved from
    /// the host environment. Timezone resolution may touch disk, so it
    /// happens here, once, off any latency-sensitive path.
    pub fn create_default(env: &dyn HostEnv) -> Self {
        Self {
            timezone_id: env.timezone_id(),
            enable_inspector: false,
            app_name: String::new(),
            device_name: String::new(),
            snapshot_blob_path: None,
            codecache_mode: CodecacheMode::None,
            codecache_path: None,
        }
    }
}
