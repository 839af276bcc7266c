use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::{BlobStore, StoreError, StoreResult, TEMP_SUFFIX, validate_id};

/// One file per blob at `{root}/{id}`.
///
/// Writes land in a temp file next to the target and are renamed into
/// place, so a reader sees either the old bytes or the new ones.
/// [`BlobStore::put_new`] hard-links the temp file instead, which fails
/// if the target exists, even when another process holds the directory.
pub struct FsBlobStore {
    root: PathBuf,
    next_temp: AtomicU64,
}

impl FsBlobStore {
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            id: root.display().to_string(),
            source,
        })?;
        info!("Blob store opened at {}", root.display());
        Ok(Self {
            root,
            next_temp: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, id: &str) -> StoreResult<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(id))
    }

    /// Fully written and synced temp file for `id`, named so `list` skips it.
    fn write_temp(&self, id: &str, bytes: &[u8]) -> StoreResult<PathBuf> {
        let n = self.next_temp.fetch_add(1, Ordering::Relaxed);
        let temp = self
            .root
            .join(format!(".{id}.{}.{n}{TEMP_SUFFIX}", std::process::id()));

        let write = || -> std::io::Result<()> {
            let mut file = std::fs::File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()
        };
        if let Err(e) = write() {
            let _ = std::fs::remove_file(&temp);
            return Err(io_err(id)(e));
        }
        Ok(temp)
    }
}

fn io_err(id: &str) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        id: id.to_string(),
        source,
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, id: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path(id)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(id)(e)),
        }
    }

    fn put(&self, id: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.path(id)?;
        let temp = self.write_temp(id, bytes)?;
        if let Err(e) = std::fs::rename(&temp, &path) {
            let _ = std::fs::remove_file(&temp);
            return Err(io_err(id)(e));
        }
        debug!(id, len = bytes.len(), "Blob written");
        Ok(())
    }

    fn put_new(&self, id: &str, bytes: &[u8]) -> StoreResult<bool> {
        let path = self.path(id)?;
        let temp = self.write_temp(id, bytes)?;
        // Unlike rename, link fails if the target exists.
        let linked = std::fs::hard_link(&temp, &path);
        let _ = std::fs::remove_file(&temp);
        match linked {
            Ok(()) => {
                debug!(id, len = bytes.len(), "Blob created");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(id, "Blob already present, left untouched");
                Ok(false)
            }
            Err(e) => Err(io_err(id)(e)),
        }
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        let root = self.root.display().to_string();
        let entries = std::fs::read_dir(&self.root).map_err(io_err(&root))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err(&root))?;
            if !entry.file_type().map_err(io_err(&root))?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(TEMP_SUFFIX) {
                    ids.push(name.to_string());
                }
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        assert_eq!(store.get("15551234567").unwrap(), None);
        store.put("15551234567", b"der").unwrap();
        store.put(".self_number", b"15551234567").unwrap();

        assert_eq!(store.get("15551234567").unwrap().as_deref(), Some(&b"der"[..]));
        let mut ids = store.list().unwrap();
        ids.sort();
        assert_eq!(ids, vec![".self_number", "15551234567"]);
    }

    #[test]
    fn put_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        store.put("a", b"one").unwrap();
        store.put("a", b"two").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some(&b"two"[..]));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn put_new_never_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        assert!(store.put_new("15551234567", b"first").unwrap());
        assert!(!store.put_new("15551234567", b"second").unwrap());
        assert_eq!(store.get("15551234567").unwrap().as_deref(), Some(&b"first"[..]));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(matches!(store.put_new("../evil", b"x"), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn put_new_has_one_winner_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let winners: usize = std::thread::scope(|s| {
            let racers: Vec<_> = (0..8u8)
                .map(|i| {
                    let root = dir.path();
                    s.spawn(move || {
                        let store = FsBlobStore::open(root).unwrap();
                        usize::from(store.put_new(".private_key", &[i; 64]).unwrap())
                    })
                })
                .collect();
            racers.into_iter().map(|r| r.join().unwrap()).sum()
        });
        assert_eq!(winners, 1);

        let store = FsBlobStore::open(dir.path()).unwrap();
        let stored = store.get(".private_key").unwrap().unwrap();
        assert_eq!(stored.len(), 64);
        assert!(stored.iter().all(|b| *b == stored[0]));
        assert_eq!(store.list().unwrap(), vec![".private_key"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn open_creates_nested_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("keys");
        let store = FsBlobStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FsBlobStore::open(dir.path()).unwrap().put("k", b"v").unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"v"[..]));
    }

    #[test]
    fn rejects_escaping_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("store")).unwrap();
        assert!(matches!(store.put("../evil", b"x"), Err(StoreError::InvalidId(_))));
        assert!(matches!(store.get(".."), Err(StoreError::InvalidId(_))));
        assert!(!dir.path().join("evil").exists());
    }

    #[test]
    fn subdirectories_are_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        store.put("k", b"v").unwrap();
        assert_eq!(store.list().unwrap(), vec!["k"]);
    }
}
