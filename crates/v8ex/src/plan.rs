//! Startup-plan resolution.
//!
//! [`resolve`] turns a [`RuntimeConfig`] plus host filesystem state into
//! the concrete snapshot/cache locations handed to the engine. It is a
//! pure function: its only observation of the outside world is read-only
//! existence checks, and it never fails. An unresolvable input degrades
//! to an empty path, which the engine layer reads as "skip this
//! optimization".
//!
//! Precedence, for both snapshot and cache, in every mode:
//! explicit config > build-flag-gated bundled asset >
//! writable-directory default > empty.

use crate::config::{CodecacheMode, RuntimeConfig};
use crate::env::{asset_path, path_to_string, HostEnv};
use tracing::debug;

/// File name of the bundled startup snapshot asset.
pub const SNAPSHOT_BLOB_NAME: &str = "snapshot_blob.bin";

/// File name of the bytecode cache blob, both as a bundled asset
/// (prebuilt mode) and in the writable cache directory.
pub const CODECACHE_BLOB_NAME: &str = "v8codecache.bin";

/// Concrete startup inputs for one engine instantiation.
///
/// Recomputed on every executor creation; never cached, since the
/// writable cache directory may change between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStartupPlan {
    /// Snapshot blob location. Empty means "no snapshot".
    pub snapshot_path: String,

    /// Bytecode cache blob location. Empty means "no cache".
    pub codecache_path: String,

    /// Caching mode, passed through to the engine.
    pub codecache_mode: CodecacheMode,

    /// True only under [`CodecacheMode::NormalWithStubBundle`] when a
    /// prior cache blob already exists at the resolved path. Signals
    /// the bundle loader to substitute the stub bootstrap script for
    /// the full main bundle.
    pub use_stub_bundle: bool,
}

impl ResolvedStartupPlan {
    /// The fully-degraded plan: no snapshot, no caching. Used for the
    /// single retry after the engine rejects the resolved inputs.
    pub fn disabled() -> Self {
        Self {
            snapshot_path: String::new(),
            codecache_path: String::new(),
            codecache_mode: CodecacheMode::None,
            use_stub_bundle: false,
        }
    }

    pub fn has_snapshot(&self) -> bool {
        !self.snapshot_path.is_empty()
    }

    pub fn has_codecache(&self) -> bool {
        !self.codecache_path.is_empty()
    }
}

/// Resolve a [`RuntimeConfig`] into a [`ResolvedStartupPlan`].
pub fn resolve(config: &RuntimeConfig, env: &dyn HostEnv) -> ResolvedStartupPlan {
    let snapshot_path = resolve_snapshot_path(config, env);
    let codecache_path = resolve_codecache_path(config, env);

    let use_stub_bundle = config.codecache_mode == CodecacheMode::NormalWithStubBundle
        && !codecache_path.is_empty()
        && env.path_exists(&codecache_path);

    ResolvedStartupPlan {
        snapshot_path,
        codecache_path,
        codecache_mode: config.codecache_mode,
        use_stub_bundle,
    }
}

fn resolve_snapshot_path(config: &RuntimeConfig, env: &dyn HostEnv) -> String {
    if let Some(path) = &config.snapshot_blob_path {
        return path.clone();
    }
    if env.build_flags().use_snapshot {
        return asset_path(env.primary_abi(), SNAPSHOT_BLOB_NAME);
    }
    debug!("build carries no snapshot blob; starting without one");
    String::new()
}

fn resolve_codecache_path(config: &RuntimeConfig, env: &dyn HostEnv) -> String {
    match config.codecache_mode {
        // Explicit overrides lose to the mode switch here: NONE means
        // no cache file, full stop.
        CodecacheMode::None => String::new(),
        CodecacheMode::Normal | CodecacheMode::NormalWithStubBundle => {
            match &config.codecache_path {
                Some(path) => path.clone(),
                None => path_to_string(&env.code_cache_dir().join(CODECACHE_BLOB_NAME)),
            }
        }
        CodecacheMode::Prebuilt => match &config.codecache_path {
            Some(path) => path.clone(),
            None => {
                if env.build_flags().prebuilt_codecache {
                    asset_path(env.primary_abi(), CODECACHE_BLOB_NAME)
                } else {
                    debug!("build carries no prebuilt codecache; caching skipped");
                    String::new()
                }
            }
        },
    }
}
