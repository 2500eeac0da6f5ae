//! Snapshot persistence for state sync.
//!
//! Only the opening of the store lives here: the directory layout and the
//! metadata database location. Producing and restoring snapshots belongs to
//! the engine.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreOpenError;
use crate::options::{
    AppOptions, AppOptionsExt, FLAG_APP_DB_BACKEND, FLAG_HOME, FLAG_SNAPSHOT_INTERVAL,
    FLAG_SNAPSHOT_KEEP_RECENT,
};

pub const DEFAULT_DB_BACKEND: &str = "goleveldb";

const KNOWN_BACKENDS: &[&str] = &[
    "goleveldb",
    "cleveldb",
    "memdb",
    "boltdb",
    "rocksdb",
    "badgerdb",
    "pebbledb",
];

const METADATA_DB: &str = "metadata";

/// `<home>/data/snapshots`
pub fn snapshot_dir(opts: &dyn AppOptions) -> PathBuf {
    PathBuf::from(opts.get_string(FLAG_HOME))
        .join("data")
        .join("snapshots")
}

/// The configured database backend, or [`DEFAULT_DB_BACKEND`].
pub fn db_backend(opts: &dyn AppOptions) -> String {
    let backend = opts.get_string(FLAG_APP_DB_BACKEND);
    if backend.trim().is_empty() {
        DEFAULT_DB_BACKEND.to_string()
    } else {
        backend.trim().to_ascii_lowercase()
    }
}

/// How often snapshots are taken and how many are retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Block interval between snapshots; 0 disables snapshotting.
    pub interval: u64,
    pub keep_recent: u32,
}

impl SnapshotOptions {
    pub fn new(interval: u64, keep_recent: u32) -> Self {
        Self {
            interval,
            keep_recent,
        }
    }

    pub fn from_options(opts: &dyn AppOptions) -> Self {
        Self::new(
            opts.get_u64(FLAG_SNAPSHOT_INTERVAL),
            opts.get_u32(FLAG_SNAPSHOT_KEEP_RECENT),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.interval > 0
    }
}

/// An opened snapshot store.
#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    metadata_path: PathBuf,
    backend: String,
}

impl SnapshotStore {
    /// Open (creating if needed) the store rooted at `dir`.
    pub fn open(backend: &str, dir: &Path) -> Result<Self, StoreOpenError> {
        let fail = |reason: String| StoreOpenError {
            path: dir.to_path_buf(),
            reason,
        };

        if !KNOWN_BACKENDS.contains(&backend) {
            return Err(fail(format!("unknown db backend {backend:?}")));
        }
        fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))?;
        if !dir.is_dir() {
            return Err(fail("not a directory".to_string()));
        }

        let metadata_path = dir.join(format!("{METADATA_DB}.db"));
        if backend != "memdb" {
            fs::create_dir_all(&metadata_path).map_err(|e| fail(e.to_string()))?;
        }

        debug!(dir = %dir.display(), backend, "opened snapshot store");
        Ok(Self {
            dir: dir.to_path_buf(),
            metadata_path,
            backend: backend.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::MapOptions;

    #[test]
    fn test_snapshot_dir_under_home() {
        let opts = MapOptions::new().set(FLAG_HOME, "/var/lib/simd");
        assert_eq!(
            snapshot_dir(&opts),
            PathBuf::from("/var/lib/simd/data/snapshots")
        );
    }

    #[test]
    fn test_db_backend_default() {
        assert_eq!(db_backend(&MapOptions::new()), "goleveldb");
        assert_eq!(
            db_backend(&MapOptions::new().set(FLAG_APP_DB_BACKEND, "RocksDB")),
            "rocksdb"
        );
    }

    #[test]
    fn test_open_creates_layout() {
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join("data").join("snapshots");

        let store = SnapshotStore::open(DEFAULT_DB_BACKEND, &dir).unwrap();
        assert!(dir.is_dir());
        assert!(store.metadata_path().is_dir());
        assert_eq!(store.backend(), "goleveldb");

        // Reopening an existing store is fine.
        assert!(SnapshotStore::open(DEFAULT_DB_BACKEND, &dir).is_ok());
    }

    #[test]
    fn test_open_fails_on_file_collision() {
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join("snapshots");
        fs::write(&dir, b"not a directory").unwrap();

        let err = SnapshotStore::open(DEFAULT_DB_BACKEND, &dir).unwrap_err();
        assert_eq!(err.path, dir);
    }

    #[test]
    fn test_open_fails_on_unknown_backend() {
        let home = tempfile::tempdir().unwrap();
        let err = SnapshotStore::open("floppydb", home.path()).unwrap_err();
        assert!(err.reason.contains("floppydb"));
    }

    #[test]
    fn test_snapshot_options() {
        let opts = MapOptions::new()
            .set(FLAG_SNAPSHOT_INTERVAL, 1000)
            .set(FLAG_SNAPSHOT_KEEP_RECENT, "2");
        let options = SnapshotOptions::from_options(&opts);
        assert_eq!(options, SnapshotOptions::new(1000, 2));
        assert!(options.is_enabled());
        assert!(!SnapshotOptions::default().is_enabled());
    }
}
