#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **coffer-store-fs** – Filesystem storage driver for coffer.
//!
//! On-disk layout under the repository's store directory:
//!
//! ```text
//! <store>/
//!   objects/<2-hex>/<38-hex>     raw object bytes, sharded by identity
//!   refs/heads/<name>            40-hex identity plus a trailing newline
//!   current.txt                  the current refspec, one trimmed line
//!   bank-record-ids/<record-id>  newline-separated transaction identities
//! ```
//!
//! Object and ref writes go through a temporary file in the destination
//! directory followed by a rename, so a crash never leaves a half-written
//! object visible. Repeated writes of the same object are no-ops.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use coffer_store_core::{StorageBackend, StoreError, DEFAULT_BRANCH};
use coffer_types::ObjectId;

/// Directory holding object files.
const OBJECTS_DIR: &str = "objects";

/// Directory holding branch pointers.
const HEADS_DIR: &str = "refs/heads";

/// File holding the current refspec.
const CURRENT_FILE: &str = "current.txt";

/// Directory holding the bank record index.
const BANK_RECORDS_DIR: &str = "bank-record-ids";

/// A persistent backend rooted at a repository's store directory.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Opens an existing store directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let meta = tokio::fs::metadata(&root).await?;
        if !meta.is_dir() {
            return Err(StoreError::Storage(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }
        Ok(FsBackend { root })
    }

    /// Creates a fresh store skeleton at `root` and opens it.
    ///
    /// The new repository starts on the default branch, pointing at the
    /// null identity. Fails when `root` already exists.
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir(&root).await?;
        tokio::fs::create_dir_all(root.join(OBJECTS_DIR)).await?;
        tokio::fs::create_dir_all(root.join(HEADS_DIR)).await?;
        tokio::fs::create_dir_all(root.join(BANK_RECORDS_DIR)).await?;

        let backend = FsBackend { root };
        backend
            .write_branch(DEFAULT_BRANCH, ObjectId::NULL)
            .await?;
        backend.set_current(DEFAULT_BRANCH).await?;
        Ok(backend)
    }

    /// The store directory this backend reads and writes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root
            .join(OBJECTS_DIR)
            .join(&hex[..2])
            .join(&hex[2..])
    }

    fn branch_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_ref_name(name)?;
        Ok(self.root.join(HEADS_DIR).join(name))
    }

    fn record_path(&self, record_id: &str) -> Result<PathBuf, StoreError> {
        validate_ref_name(record_id)?;
        Ok(self.root.join(BANK_RECORDS_DIR).join(record_id))
    }

    /// Writes `bytes` to `target` through a sibling temporary file and a
    /// rename. Concurrent writers racing on one path are unsupported; the
    /// temporary name only has to be unique within this process's use.
    async fn write_atomic(&self, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let parent = target.parent().ok_or_else(|| {
            StoreError::Storage(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no parent directory", target.display()),
            ))
        })?;
        tokio::fs::create_dir_all(parent).await?;

        let mut temp = target.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, target).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn put_object(&self, id: ObjectId, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.object_path(id);
        if tokio::fs::try_exists(&path).await? {
            return Ok(());
        }
        self.write_atomic(&path, bytes).await
    }

    async fn get_object(&self, id: ObjectId) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.object_path(id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn contains_object(&self, id: ObjectId) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.object_path(id)).await?)
    }

    async fn write_branch(&self, name: &str, id: ObjectId) -> Result<(), StoreError> {
        let path = self.branch_path(name)?;
        let mut contents = id.to_hex();
        contents.push('\n');
        self.write_atomic(&path, contents.as_bytes()).await
    }

    async fn read_branch(&self, name: &str) -> Result<Option<ObjectId>, StoreError> {
        let path = self.branch_path(name)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let id = contents.trim().parse().map_err(|_| {
            StoreError::Storage(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} does not hold a transaction identity", path.display()),
            ))
        })?;
        Ok(Some(id))
    }

    async fn list_branches(&self) -> Result<Vec<String>, StoreError> {
        let heads = self.root.join(HEADS_DIR);
        let mut names = Vec::new();
        let mut pending = vec![(heads.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let qualified = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), qualified));
                } else {
                    names.push(qualified);
                }
            }
        }

        Ok(names)
    }

    async fn set_current(&self, refspec: &str) -> Result<(), StoreError> {
        let mut contents = refspec.to_string();
        contents.push('\n');
        self.write_atomic(&self.root.join(CURRENT_FILE), contents.as_bytes())
            .await
    }

    async fn current(&self) -> Result<String, StoreError> {
        let contents = tokio::fs::read_to_string(self.root.join(CURRENT_FILE)).await?;
        Ok(contents.trim().to_string())
    }

    async fn append_bank_record(&self, record_id: &str, id: ObjectId) -> Result<(), StoreError> {
        use tokio::io::AsyncWriteExt;

        let path = self.record_path(record_id)?;
        let mut line = id.to_hex();
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn bank_record(&self, record_id: &str) -> Result<Vec<ObjectId>, StoreError> {
        let path = self.record_path(record_id)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut ids = Vec::new();
        for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let id = line.parse().map_err(|_| {
                StoreError::Storage(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{} holds a malformed identity line", path.display()),
                ))
            })?;
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Rejects names that would escape the store directory.
fn validate_ref_name(name: &str) -> Result<(), StoreError> {
    let acceptable = !name.is_empty()
        && !name.contains('\\')
        && name
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");
    if acceptable {
        Ok(())
    } else {
        Err(StoreError::Storage(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{name:?} is not usable as a ref name"),
        )))
    }
}
