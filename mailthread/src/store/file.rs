//! # File store
//!
//! Key-value store persisted as a JSON object in a single file. Every
//! operation holds an exclusive advisory lock on the file, so
//! processes sharing the same file never corrupt it. Operations are
//! not grouped into transactions: the last writer wins.

use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use advisory_lock::{AdvisoryFileLock, FileLockMode};
use async_trait::async_trait;
use tracing::{debug, trace, warn};

use super::ThreadStore;
use crate::{AnyResult, Error, Result};

type Entries = BTreeMap<String, String>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a file store at the given path. The file is created on
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a file store at the default location, inside the user
    /// data directory.
    pub fn try_default() -> Result<Self> {
        let path = Self::find_default_path().ok_or(Error::GetStoreDirectoryError)?;
        Ok(Self::new(path))
    }

    pub fn find_default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("mailthread").join("store.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the store file and lock it exclusively.
    fn open(&self) -> Result<File> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .map_err(|err| Error::CreateStoreDirectoryError(err, dir.to_owned()))?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|err| Error::OpenStoreFileError(err, self.path.clone()))?;

        AdvisoryFileLock::lock(&file, FileLockMode::Exclusive)
            .map_err(|err| Error::LockStoreFileError(err, self.path.clone()))?;

        Ok(file)
    }

    /// Release the lock of the store file.
    ///
    /// The lock is also released when the file is closed, so a
    /// failure is only logged.
    fn unlock(&self, file: &File) {
        if let Err(err) = AdvisoryFileLock::unlock(file) {
            let err = Error::UnlockStoreFileError(err, self.path.clone());
            warn!("{err}");
            debug!("{err:?}");
        }
    }

    fn read(&self, file: &mut File) -> Result<Entries> {
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|err| Error::ReadStoreFileError(err, self.path.clone()))?;

        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&content)
            .map_err(|err| Error::ParseStoreFileError(err, self.path.clone()))
    }

    fn write(&self, file: &mut File, entries: &Entries) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|err| Error::SerializeStoreFileError(err, self.path.clone()))?;

        file.set_len(0)
            .and_then(|()| file.seek(SeekFrom::Start(0)))
            .and_then(|_| file.write_all(content.as_bytes()))
            .and_then(|()| file.flush())
            .map_err(|err| Error::WriteStoreFileError(err, self.path.clone()))
    }

    /// Run the given update on the entries while holding the lock.
    fn update(&self, f: impl FnOnce(&mut Entries)) -> Result<()> {
        let mut file = self.open()?;
        let mut entries = self.read(&mut file)?;
        f(&mut entries);
        let res = self.write(&mut file, &entries);
        self.unlock(&file);
        res
    }

    fn get_entry(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut file = self.open()?;
        let entries = self.read(&mut file);
        self.unlock(&file);
        Ok(entries?.get(key).cloned())
    }
}

#[async_trait]
impl ThreadStore for FileStore {
    async fn get(&self, key: &str) -> AnyResult<Option<String>> {
        trace!("getting file store value at {key:?}");
        Ok(self.get_entry(key)?)
    }

    async fn set(&self, key: &str, val: &str) -> AnyResult<()> {
        debug!("setting file store value at {key:?}");
        self.update(|entries| {
            entries.insert(key.to_owned(), val.to_owned());
        })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AnyResult<()> {
        debug!("deleting file store value at {key:?}");
        if !self.path.exists() {
            return Ok(());
        }

        self.update(|entries| {
            entries.remove(key);
        })?;
        Ok(())
    }
}
