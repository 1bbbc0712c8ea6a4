use crate::constants::BACKUP_FILE_PREFIX;
use crate::errors::{ClientError, ErrorKind};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use url::form_urlencoded::byte_serialize;

/// A storage API used to persist the last known feature set, making custom backup implementations possible.
pub trait BackupStore: Sync + Send {
    /// Reads the backup stored for the application identified by `key`.
    ///
    /// Returns `Ok(None)` when nothing was stored yet.
    fn load(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// Replaces the backup of the application identified by `key` with `value`.
    fn save(&self, key: &str, value: &str) -> Result<(), ClientError>;
}

/// Stores backups as JSON files in a directory, one file per application.
pub struct FileBackup {
    dir: PathBuf,
}

impl FileBackup {
    /// Creates a [`FileBackup`] writing into `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the backup file that belongs to `key`.
    ///
    /// The key is percent-encoded, so distinct keys never share a file and never leave `dir`.
    pub fn path(&self, key: &str) -> PathBuf {
        let name = byte_serialize(key.as_bytes())
            .collect::<String>()
            .replace('*', "%2A");
        self.dir.join(format!("{BACKUP_FILE_PREFIX}{name}.json"))
    }
}

impl BackupStore for FileBackup {
    fn load(&self, key: &str) -> Result<Option<String>, ClientError> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ClientError::new(
                ErrorKind::BackupReadFailure,
                format!("Failed to read backup file '{}'. {err}", path.display()),
            )),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        let write_failure = |err: io::Error| {
            ClientError::new(
                ErrorKind::BackupWriteFailure,
                format!("Failed to write backup file '{}'. {err}", path.display()),
            )
        };
        fs::write(&tmp, value).map_err(write_failure)?;
        fs::rename(&tmp, &path).map_err(|err| {
            _ = fs::remove_file(&tmp);
            write_failure(err)
        })
    }
}

/// Backup implementation that stores nothing.
pub struct NoBackup {}

impl NoBackup {
    /// Creates a [`NoBackup`].
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NoBackup {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupStore for NoBackup {
    fn load(&self, _: &str) -> Result<Option<String>, ClientError> {
        Ok(None)
    }

    fn save(&self, _: &str, _: &str) -> Result<(), ClientError> {
        Ok(())
    }
}
