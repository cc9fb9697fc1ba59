use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{Storage, StorageError};

/// File name used when a storage directory rather than a file is given
pub const STORAGE_FILE: &str = "local_storage.json";

/// Suffix of the file a write is staged in before it replaces the storage file
const TEMP_SUFFIX: &str = ".tmp";

/// Suffix an unreadable storage file is moved to when a write recovers from it
const CORRUPT_SUFFIX: &str = ".corrupt";

type Items = BTreeMap<String, String>;

/// Storage area persisted as one JSON object on disk.
///
/// The file is re-read on every operation, so changes made by another
/// process are picked up. A missing file is an empty area.
///
/// Writes go to a sibling temp file which is then renamed over the storage
/// file, so a crash leaves either the old or the new contents. If the file
/// is unreadable anyway, reads report `StorageError::Corrupt`, while writes
/// and removals move it aside to `<file>.corrupt` and start from an empty area.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Use the exact file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `STORAGE_FILE` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(STORAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable storage file is kept after recovery
    pub fn corrupt_path(&self) -> PathBuf {
        self.sibling(CORRUPT_SUFFIX)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(STORAGE_FILE));
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn load(&self) -> Result<Items, StorageError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Items::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        serde_json::from_str(&contents).map_err(|source| {
            warn!(path = %self.path.display(), "Storage file is not a JSON object");
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Load for a write. A corrupt file is moved aside and the area starts empty.
    fn load_for_write(&self) -> Result<Items, StorageError> {
        match self.load() {
            Err(StorageError::Corrupt { .. }) => {
                let aside = self.corrupt_path();
                std::fs::rename(&self.path, &aside).map_err(|source| self.io_error(source))?;
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    "Discarded unreadable storage file"
                );
                Ok(Items::new())
            }
            other => other,
        }
    }

    fn persist(&self, items: &Items) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let contents = serde_json::to_string_pretty(items)
            .map_err(|e| self.io_error(std::io::Error::other(e)))?;

        let temp = self.sibling(TEMP_SUFFIX);
        let write_temp = || -> std::io::Result<()> {
            let mut file = File::create(&temp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        };
        if let Err(source) = write_temp() {
            let _ = std::fs::remove_file(&temp);
            return Err(self.io_error(source));
        }
        std::fs::rename(&temp, &self.path).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.load_for_write()?;
        items.insert(key.to_string(), value.to_string());
        self.persist(&items)?;
        debug!(key, path = %self.path.display(), "Stored item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.load_for_write()?;
        if items.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&items)?;
        debug!(key, path = %self.path.display(), "Removed item");
        Ok(())
    }
}
