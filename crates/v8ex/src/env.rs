//! Host environment seam.
//!
//! The executor core never touches the filesystem directly; everything
//! goes through [`HostEnv`]. Paths come in two namespaces: plain
//! filesystem paths (the app-private writable cache directory lives
//! here) and the read-only packaged-asset namespace addressed with an
//! `assets://` prefix.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Scheme prefix for the read-only packaged-asset namespace.
pub const ASSETS_SCHEME: &str = "assets://";

/// Build-time feature flags gating default path derivation.
///
/// The historical builds hardcoded these per variant; they are modeled
/// as named flags reported by the host environment instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFlags {
    /// Build ships a startup snapshot blob in the asset bundle.
    pub use_snapshot: bool,

    /// Build ships a prebuilt bytecode cache in the asset bundle.
    pub prebuilt_codecache: bool,
}

/// Filesystem, identity, and build-flag primitives supplied by the
/// embedding host.
///
/// All I/O is bounded and synchronous (local storage or packaged
/// assets); nothing here retries on slow I/O.
pub trait HostEnv: Send + Sync {
    /// App-private writable directory for bytecode cache blobs.
    fn code_cache_dir(&self) -> PathBuf;

    /// Primary supported ABI tag, used to key bundled-asset paths.
    fn primary_abi(&self) -> &str;

    /// Build-time feature flags for this binary.
    fn build_flags(&self) -> BuildFlags;

    /// Olson/IANA timezone id for the device.
    fn timezone_id(&self) -> String;

    /// Read-only existence check; understands both namespaces.
    fn path_exists(&self, path: &str) -> bool;

    /// Read an entire blob from either namespace.
    fn read_blob(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Write a blob. The asset namespace is read-only; writes to it
    /// must be refused.
    fn write_blob(&self, path: &str, data: &[u8]) -> io::Result<()>;
}

/// [`HostEnv`] backed by two local directories: an assets root standing
/// in for the packaged-asset namespace, and a writable cache directory.
#[derive(Debug, Clone)]
pub struct DirHostEnv {
    assets_root: PathBuf,
    cache_dir: PathBuf,
    abi: String,
    flags: BuildFlags,
}

impl DirHostEnv {
    pub fn new(
        assets_root: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        abi: impl Into<String>,
        flags: BuildFlags,
    ) -> Self {
        Self {
            assets_root: assets_root.into(),
            cache_dir: cache_dir.into(),
            abi: abi.into(),
            flags,
        }
    }

    /// Map a path in either namespace onto the local filesystem.
    fn local_path(&self, path: &str) -> PathBuf {
        match path.strip_prefix(ASSETS_SCHEME) {
            Some(rest) => self.assets_root.join(rest),
            None => PathBuf::from(path),
        }
    }

    fn is_asset(path: &str) -> bool {
        path.starts_with(ASSETS_SCHEME)
    }
}

impl HostEnv for DirHostEnv {
    fn code_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    fn primary_abi(&self) -> &str {
        &self.abi
    }

    fn build_flags(&self) -> BuildFlags {
        self.flags
    }

    fn timezone_id(&self) -> String {
        if let Ok(tz) = std::env::var("TZ") {
            if !tz.is_empty() {
                return tz;
            }
        }
        if let Ok(tz) = fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if !tz.is_empty() {
                return tz.to_string();
            }
        }
        "UTC".to_string()
    }

    fn path_exists(&self, path: &str) -> bool {
        self.local_path(path).is_file()
    }

    fn read_blob(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.local_path(path))
    }

    fn write_blob(&self, path: &str, data: &[u8]) -> io::Result<()> {
        if Self::is_asset(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("asset namespace is read-only: {path}"),
            ));
        }
        let local = self.local_path(path);
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(local, data)
    }
}

/// Join an ABI-keyed bundled-asset path, e.g.
/// `assets://arm64-v8a/snapshot_blob.bin`.
pub fn asset_path(abi: &str, file_name: &str) -> String {
    format!("{ASSETS_SCHEME}{abi}/{file_name}")
}

/// Render a filesystem path for the engine interface, which takes
/// strings in both namespaces.
pub fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env_in(dir: &TempDir) -> DirHostEnv {
        DirHostEnv::new(
            dir.path().join("assets"),
            dir.path().join("code_cache"),
            "arm64-v8a",
            BuildFlags::default(),
        )
    }

    #[test]
    fn test_asset_namespace_mapping() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir);
        let asset = asset_path("arm64-v8a", "snapshot_blob.bin");

        assert!(!env.path_exists(&asset));

        let backing = dir.path().join("assets/arm64-v8a/snapshot_blob.bin");
        fs::create_dir_all(backing.parent().unwrap()).unwrap();
        fs::write(&backing, b"blob").unwrap();

        assert!(env.path_exists(&asset));
        assert_eq!(env.read_blob(&asset).unwrap(), b"blob");
    }

    #[test]
    fn test_asset_namespace_is_read_only() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir);
        let asset = asset_path("arm64-v8a", "v8codecache.bin");

        let err = env.write_blob(&asset, b"nope").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_cache_dir_write_round_trip() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir);
        let path = path_to_string(&env.code_cache_dir().join("v8codecache.bin"));

        env.write_blob(&path, b"cache").unwrap();
        assert!(env.path_exists(&path));
        assert_eq!(env.read_blob(&path).unwrap(), b"cache");
    }

    #[test]
    fn test_timezone_id_is_nonempty() {
        let dir = TempDir::new().unwrap();
        assert!(!env_in(&dir).timezone_id().is_empty());
    }
}
