//! Opening the repository that surrounds the current directory.

use std::path::{Path, PathBuf};

use coffer_index::{root_directory, store_directory};
use coffer_store_core::Repository;
use coffer_store_fs::FsBackend;

/// A located repository: the working-tree root and the typed store over it.
pub struct Workspace {
    /// The directory containing `accounts/`, `budget/`, and the store.
    pub root: PathBuf,
    /// The repository opened from the store directory.
    pub repo: Repository<FsBackend>,
}

/// Discovers the repository around the current directory and opens its
/// store with the default cache size.
pub async fn open() -> anyhow::Result<Workspace> {
    let root = root_directory(Path::new("."))?;
    let backend = FsBackend::open(store_directory(&root)).await?;
    Ok(Workspace {
        root,
        repo: Repository::new(backend),
    })
}
