//! Locating the repository around a working path.

use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::{ACCOUNTS_DIR, BUDGET_DIR, REPO_DIR};

/// Walks from `start` toward the filesystem root, looking for the directory
/// that contains the repository's store directory.
pub fn root_directory(start: &Path) -> Result<PathBuf, IndexError> {
    let mut dir = start.canonicalize()?;
    if !dir.is_dir() {
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return Err(IndexError::NotARepository(start.to_path_buf())),
        }
    }

    loop {
        if dir.join(REPO_DIR).is_dir() {
            return Ok(dir);
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return Err(IndexError::NotARepository(start.to_path_buf())),
        }
    }
}

/// The store directory beneath a repository root.
pub fn store_directory(root: &Path) -> PathBuf {
    root.join(REPO_DIR)
}

/// The account name a working-tree path refers to, relative to the
/// repository's accounts directory. The accounts directory itself maps to
/// the empty name.
pub fn account_name(path: &Path) -> Result<String, IndexError> {
    entity_name(path, ACCOUNTS_DIR)?.ok_or_else(|| IndexError::NotAnAccount(path.to_path_buf()))
}

/// The budget path a working-tree path refers to, relative to the
/// repository's budget directory. The budget directory itself maps to the
/// empty name (the root envelope).
pub fn budget_name(path: &Path) -> Result<String, IndexError> {
    entity_name(path, BUDGET_DIR)?.ok_or_else(|| IndexError::NotABudget(path.to_path_buf()))
}

fn entity_name(path: &Path, dimension: &str) -> Result<Option<String>, IndexError> {
    let root = root_directory(path)?;
    let mut target = path.canonicalize()?;
    if !target.is_dir() {
        if let Some(parent) = target.parent() {
            target = parent.to_path_buf();
        }
    }

    let prefix = root.join(dimension);
    Ok(target
        .strip_prefix(&prefix)
        .ok()
        .map(join_components))
}

/// Joins path components with `/` regardless of platform separator.
pub(crate) fn join_components(path: &Path) -> String {
    path.iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaffold() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(REPO_DIR)).unwrap();
        std::fs::create_dir_all(dir.path().join("accounts/citi/checking")).unwrap();
        std::fs::create_dir_all(dir.path().join("budget/groceries")).unwrap();
        dir
    }

    #[test]
    fn root_is_found_from_nested_directories() {
        let dir = scaffold();
        let nested = dir.path().join("accounts/citi/checking");
        let root = root_directory(&nested).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn missing_repository_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            root_directory(dir.path()),
            Err(IndexError::NotARepository(_))
        ));
    }

    #[test]
    fn account_names_are_relative_with_forward_slashes() {
        let dir = scaffold();
        let name = account_name(&dir.path().join("accounts/citi/checking")).unwrap();
        assert_eq!(name, "citi/checking");

        let root_name = account_name(&dir.path().join("accounts")).unwrap();
        assert_eq!(root_name, "");
    }

    #[test]
    fn budget_paths_reject_accounts() {
        let dir = scaffold();
        assert_eq!(
            budget_name(&dir.path().join("budget/groceries")).unwrap(),
            "groceries"
        );
        assert!(matches!(
            budget_name(&dir.path().join("accounts/citi")),
            Err(IndexError::NotABudget(_))
        ));
    }
}
