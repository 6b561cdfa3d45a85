//! File-backed store: one JSON file per key.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{CartStore, StorageError};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stores each key as `<dir>/<key>.json`.
///
/// Saves go to a temporary sibling, named per process and save, which is
/// then renamed over the target. A reader sees either the old record or the
/// new one, never a partial write; concurrent savers never share a temp
/// file. A failed save removes its temp file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` unless the key is non-empty ASCII
    /// alphanumerics, `-`, `_` or `.`, and does not start with `.`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(key: &str, source: io::Error) -> StorageError {
    StorageError::Io {
        key: key.to_string(),
        source,
    }
}

impl CartStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| io_error(key, e))?;

        let tmp = temp_path(&path);
        let written = write_synced(&tmp, bytes).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(io_error(key, e));
        }
        Ok(())
    }
}

/// Sibling of `path` unique to this process and save.
fn temp_path(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_load_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load("cart").unwrap().is_none());
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("store"));

        store.save("cart", b"{\"items\":[]}").unwrap();
        assert_eq!(
            store.load("cart").unwrap().as_deref(),
            Some(&b"{\"items\":[]}"[..])
        );
    }

    #[test]
    fn test_save_replaces_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save("cart", b"first").unwrap();
        store.save("cart", b"second").unwrap();
        assert_eq!(store.load("cart").unwrap().as_deref(), Some(&b"second"[..]));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, ["cart.json"]);
    }

    #[test]
    fn test_rejects_unsafe_keys() {
        let store = FileStore::new("/tmp/unused");
        for key in ["", "../cart", ".hidden", "a/b", "cart key"] {
            assert!(matches!(
                store.path_for(key),
                Err(StorageError::InvalidKey(_))
            ));
        }
        assert!(store.path_for("recipe-box.cart_v1").is_ok());
    }

    #[test]
    fn test_unreadable_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        // A directory where the file should be cannot be read as bytes.
        fs::create_dir_all(dir.path().join("cart.json")).unwrap();
        assert!(matches!(store.load("cart"), Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_temp_paths_are_unique_per_save() {
        let path = Path::new("/tmp/store/cart.json");
        let first = temp_path(path);
        let second = temp_path(path);
        assert_ne!(first, second);
        assert_eq!(first.parent(), path.parent());
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(&format!("cart.json.{}.", std::process::id())));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        // A non-empty directory at the target makes the rename fail.
        fs::create_dir_all(dir.path().join("cart.json").join("blocker")).unwrap();

        assert!(matches!(store.save("cart", b"{}"), Err(StorageError::Io { .. })));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, ["cart.json"]);
    }
}
