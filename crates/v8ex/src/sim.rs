//! Simulated engine backend.
//!
//! Stands in for the native engine bindings while honoring the full
//! startup contract: framed snapshot/cache blobs with magic-and-version
//! validation, write-back of the bytecode cache after a successful
//! compile in the writable modes, and a strictly read-only prebuilt
//! path. The shell binary and the crate's own tests run against it.

use crate::config::CodecacheMode;
use crate::engine::{EngineBackend, EngineInitError, EngineSession, EngineStartup};
use crate::env::HostEnv;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Magic bytes opening a simulated bytecode cache blob.
const CACHE_MAGIC: &[u8; 8] = b"V8XCACHE";

/// Magic bytes opening a simulated snapshot blob.
const SNAPSHOT_MAGIC: &[u8; 8] = b"V8XSNAP\0";

/// Format version stamped into both blob kinds.
const FORMAT_VERSION: u32 = 1;

/// Simulated engine backend bound to a host environment.
pub struct SimEngine {
    env: Arc<dyn HostEnv>,
}

impl SimEngine {
    pub fn new(env: Arc<dyn HostEnv>) -> Self {
        Self { env }
    }

    /// Encode a blob in the simulated framing. Public so tests and the
    /// shell can pre-seed cache/snapshot files the backend accepts.
    pub fn encode_blob(magic: &[u8; 8], payload: &[u8]) -> Vec<u8> {
        let mut blob = Vec::with_capacity(12 + payload.len());
        blob.extend_from_slice(magic);
        blob.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        blob.extend_from_slice(payload);
        blob
    }

    /// A snapshot blob the simulated engine will accept.
    pub fn valid_snapshot_blob() -> Vec<u8> {
        Self::encode_blob(SNAPSHOT_MAGIC, b"heap-image")
    }

    /// A cache blob the simulated engine will accept.
    pub fn valid_cache_blob() -> Vec<u8> {
        Self::encode_blob(CACHE_MAGIC, b"compiled-bytecode")
    }

    fn check_frame(blob: &[u8], magic: &[u8; 8]) -> Result<(), String> {
        if blob.len() < 12 || &blob[..8] != magic {
            return Err("bad magic".to_string());
        }
        let version = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]);
        if version != FORMAT_VERSION {
            return Err(format!("format version {version}, expected {FORMAT_VERSION}"));
        }
        Ok(())
    }

    fn load_snapshot(&self, startup: &EngineStartup) -> Result<bool, EngineInitError> {
        if startup.snapshot_path.is_empty() {
            return Ok(false);
        }
        if !self.env.path_exists(&startup.snapshot_path) {
            debug!(path = %startup.snapshot_path, "snapshot blob missing; cold start");
            return Ok(false);
        }
        let blob = self
            .env
            .read_blob(&startup.snapshot_path)
            .map_err(|e| EngineInitError::Native(e.to_string()))?;
        Self::check_frame(&blob, SNAPSHOT_MAGIC).map_err(EngineInitError::IncompatibleSnapshot)?;
        Ok(true)
    }

    /// Load the cache blob when the mode calls for one. Mirrors the
    /// native load path: NONE skips, PREBUILT reads the bundled blob,
    /// the writable modes read whatever a prior run left behind.
    fn load_codecache(&self, startup: &EngineStartup) -> Result<bool, EngineInitError> {
        if startup.codecache_mode == CodecacheMode::None || startup.codecache_path.is_empty() {
            return Ok(false);
        }
        if !self.env.path_exists(&startup.codecache_path) {
            debug!(path = %startup.codecache_path, "no codecache blob yet");
            return Ok(false);
        }
        let blob = self
            .env
            .read_blob(&startup.codecache_path)
            .map_err(|e| EngineInitError::Native(e.to_string()))?;
        Self::check_frame(&blob, CACHE_MAGIC).map_err(EngineInitError::CorruptCache)?;
        Ok(true)
    }

    /// Write the cache blob back after a successful compile. Only the
    /// writable modes write; PREBUILT is read-only by contract.
    fn save_codecache(&self, startup: &EngineStartup, consumed_cache: bool) {
        match startup.codecache_mode {
            CodecacheMode::Normal | CodecacheMode::NormalWithStubBundle => {}
            CodecacheMode::None | CodecacheMode::Prebuilt => return,
        }
        if startup.codecache_path.is_empty() || consumed_cache {
            return;
        }
        if let Err(e) = self
            .env
            .write_blob(&startup.codecache_path, &Self::valid_cache_blob())
        {
            // Write-back failure costs the next startup, nothing else.
            warn!(path = %startup.codecache_path, error = %e, "codecache write-back failed");
        } else {
            debug!(path = %startup.codecache_path, "codecache written back");
        }
    }

    /// Same as [`EngineBackend::init`] but with the concrete session
    /// type, so callers can observe what construction consumed.
    pub fn init_sim(&self, startup: &EngineStartup) -> Result<Arc<SimSession>, EngineInitError> {
        let used_snapshot = self.load_snapshot(startup)?;
        let consumed_cache = self.load_codecache(startup)?;

        // Compilation happens here in a real engine; the simulated one
        // goes straight to the write-back decision.
        self.save_codecache(startup, consumed_cache);

        let bundle = if startup.use_stub_bundle { "stub" } else { "full" };
        info!(
            timezone = %startup.timezone_id,
            inspector = startup.enable_inspector,
            snapshot = used_snapshot,
            codecache = consumed_cache,
            bundle,
            "simulated engine instance up"
        );

        Ok(Arc::new(SimSession {
            alive: AtomicBool::new(true),
            used_snapshot,
            consumed_cache,
            idle_signals: AtomicU64::new(0),
        }))
    }
}

impl EngineBackend for SimEngine {
    fn init(&self, startup: &EngineStartup) -> Result<Arc<dyn EngineSession>, EngineInitError> {
        let session = self.init_sim(startup)?;
        Ok(session)
    }
}

/// One live simulated engine instance.
pub struct SimSession {
    alive: AtomicBool,
    used_snapshot: bool,
    consumed_cache: bool,
    idle_signals: AtomicU64,
}

impl SimSession {
    /// Whether construction consumed a startup snapshot.
    pub fn used_snapshot(&self) -> bool {
        self.used_snapshot
    }

    /// Whether construction consumed a bytecode cache blob.
    pub fn consumed_cache(&self) -> bool {
        self.consumed_cache
    }

    /// Maintenance signals forwarded so far.
    pub fn idle_signals(&self) -> u64 {
        self.idle_signals.load(Ordering::Relaxed)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

impl EngineSession for SimSession {
    fn notify_idle(&self) {
        if !self.is_alive() {
            return;
        }
        self.idle_signals.fetch_add(1, Ordering::Relaxed);
        debug!("low-memory maintenance pass");
    }

    fn shutdown(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            debug!("simulated engine instance released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::env::{path_to_string, BuildFlags, DirHostEnv};
    use crate::plan::{self, CODECACHE_BLOB_NAME};
    use std::fs;
    use tempfile::TempDir;

    fn env_in(dir: &TempDir, flags: BuildFlags) -> Arc<DirHostEnv> {
        Arc::new(DirHostEnv::new(
            dir.path().join("assets"),
            dir.path().join("code_cache"),
            "arm64-v8a",
            flags,
        ))
    }

    fn startup(env: &DirHostEnv, mode: CodecacheMode) -> EngineStartup {
        let mut config = RuntimeConfig::create_default(env);
        config.codecache_mode = mode;
        let plan = plan::resolve(&config, env);
        EngineStartup::new(&config, &plan)
    }

    #[test]
    fn test_normal_mode_writes_back_then_consumes() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir, BuildFlags::default());
        let backend = SimEngine::new(env.clone());
        let startup = startup(&*env, CodecacheMode::Normal);

        // Cold run: nothing to consume, blob written back.
        let session = backend.init(&startup).unwrap();
        drop(session);
        assert!(env.path_exists(&startup.codecache_path));

        // Warm run: the blob from the first run is consumed.
        let session = backend.init_sim(&startup).unwrap();
        assert!(session.consumed_cache());
    }

    #[test]
    fn test_prebuilt_mode_never_writes() {
        let dir = TempDir::new().unwrap();
        let env = env_in(
            &dir,
            BuildFlags {
                prebuilt_codecache: true,
                ..BuildFlags::default()
            },
        );
        let backend = SimEngine::new(env.clone());
        let startup = startup(&*env, CodecacheMode::Prebuilt);

        // Missing bundled blob degrades to a cold start, no write.
        backend.init(&startup).unwrap();
        assert!(!env.path_exists(&startup.codecache_path));

        let bundled = dir.path().join("assets/arm64-v8a").join(CODECACHE_BLOB_NAME);
        fs::create_dir_all(bundled.parent().unwrap()).unwrap();
        fs::write(&bundled, SimEngine::valid_cache_blob()).unwrap();
        let before = fs::read(&bundled).unwrap();

        backend.init(&startup).unwrap();
        assert_eq!(fs::read(&bundled).unwrap(), before);
    }

    #[test]
    fn test_corrupt_cache_is_rejected() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir, BuildFlags::default());
        let backend = SimEngine::new(env.clone());
        let startup = startup(&*env, CodecacheMode::Normal);

        env.write_blob(&startup.codecache_path, b"garbage").unwrap();

        let Err(err) = backend.init(&startup) else {
            panic!("corrupt cache blob was accepted");
        };
        assert!(matches!(err, EngineInitError::CorruptCache(_)));
    }

    #[test]
    fn test_incompatible_snapshot_is_rejected() {
        let dir = TempDir::new().unwrap();
        let env = env_in(
            &dir,
            BuildFlags {
                use_snapshot: true,
                ..BuildFlags::default()
            },
        );
        let backend = SimEngine::new(env.clone());
        let startup = startup(&*env, CodecacheMode::None);

        let blob_path = dir.path().join("assets/arm64-v8a/snapshot_blob.bin");
        fs::create_dir_all(blob_path.parent().unwrap()).unwrap();
        fs::write(&blob_path, b"not a snapshot").unwrap();

        let Err(err) = backend.init(&startup) else {
            panic!("incompatible snapshot blob was accepted");
        };
        assert!(matches!(err, EngineInitError::IncompatibleSnapshot(_)));
    }

    #[test]
    fn test_valid_snapshot_is_consumed() {
        let dir = TempDir::new().unwrap();
        let env = env_in(
            &dir,
            BuildFlags {
                use_snapshot: true,
                ..BuildFlags::default()
            },
        );
        let backend = SimEngine::new(env.clone());
        let startup = startup(&*env, CodecacheMode::None);

        let blob_path = dir.path().join("assets/arm64-v8a/snapshot_blob.bin");
        fs::create_dir_all(blob_path.parent().unwrap()).unwrap();
        fs::write(&blob_path, SimEngine::valid_snapshot_blob()).unwrap();

        backend.init(&startup).unwrap();
    }

    #[test]
    fn test_explicit_cache_path_is_honored() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir, BuildFlags::default());
        let backend = SimEngine::new(env.clone());

        let mut config = RuntimeConfig::create_default(&*env);
        config.codecache_mode = CodecacheMode::Normal;
        config.codecache_path = Some(path_to_string(&dir.path().join("elsewhere/cc.bin")));
        let plan = plan::resolve(&config, &*env);

        backend.init(&EngineStartup::new(&config, &plan)).unwrap();
        assert!(env.path_exists(plan.codecache_path.as_str()));
    }

    #[test]
    fn test_session_idle_counting_stops_after_shutdown() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir, BuildFlags::default());
        let backend = SimEngine::new(env.clone());
        let startup = startup(&*env, CodecacheMode::None);
        let session = backend.init_sim(&startup).unwrap();

        session.notify_idle();
        session.notify_idle();
        assert_eq!(session.idle_signals(), 2);

        session.shutdown();
        assert!(!session.is_alive());

        session.notify_idle();
        assert_eq!(session.idle_signals(), 2);

        // Second release is a no-op.
        session.shutdown();
        assert!(!session.is_alive());
    }
}
