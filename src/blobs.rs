//! Content-addressed blob store.
//!
//! Large files exported by module hooks land in a two-level hashed directory
//! under `.git/blobs`; the tracked path becomes a symbolic link into the
//! store. Two files with identical content share one physical copy.

use crate::git::Git;
use crate::{Result, VaultError};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A stored blob: content hash plus its physical location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub hash: String,
    pub path: PathBuf,
}

pub struct BlobStore {
    repo_root: PathBuf,
    store_root: PathBuf,
}

impl BlobStore {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        let store_root = repo_root.join(".git").join("blobs");
        Self {
            repo_root,
            store_root,
        }
    }

    /// Move the file at `rel_path` (relative to the repository root) into
    /// the store and replace it with a relative symlink.
    ///
    /// When a blob with the same content already exists the working copy is
    /// simply discarded (dedup hit); the first writer keeps the physical
    /// copy.
    pub fn add(&self, git: &Git, rel_path: &str) -> Result<Blob> {
        let hash = git.hash_object(rel_path)?;
        let (prefix, id) = hash.split_at(2);

        let blob_dir = self.store_root.join(prefix);
        fs::create_dir_all(&blob_dir).map_err(|e| VaultError::BlobStoreIo {
            path: blob_dir.clone(),
            reason: format!("mkdir failed: {}", e),
        })?;

        let blob_path = blob_dir.join(id);
        let link_path = self.repo_root.join(rel_path);
        let link_dir = link_path
            .parent()
            .unwrap_or(self.repo_root.as_path())
            .to_path_buf();

        if blob_path.is_file() {
            debug!("dedup hit for {} ({})", rel_path, hash);
            fs::remove_file(&link_path).map_err(|e| VaultError::BlobStoreIo {
                path: link_path.clone(),
                reason: format!("unlink failed: {}", e),
            })?;
        } else {
            debug!("storing {} as {}", rel_path, hash);
            fs::rename(&link_path, &blob_path).map_err(|e| VaultError::BlobStoreIo {
                path: blob_path.clone(),
                reason: format!("rename failed: {}", e),
            })?;
        }

        // A relative target keeps the repository relocatable.
        let target = relative_target(&blob_path, &link_dir);
        symlink(&target, &link_path).map_err(|e| VaultError::BlobStoreIo {
            path: link_path.clone(),
            reason: format!("symlink failed: {}", e),
        })?;

        Ok(Blob {
            hash,
            path: blob_path,
        })
    }
}

/// Path to `target` expressed relative to the directory `base`.
///
/// Both paths must be either absolute or relative to the same root.
pub fn relative_target(target: &Path, base: &Path) -> PathBuf {
    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let shared = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in shared..base_parts.len() {
        result.push("..");
    }
    for part in &target_parts[shared..] {
        result.push(part.as_os_str());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_relative_target_sibling_tree() {
        let target = Path::new("/repo/.git/blobs/ab/cdef");
        let base = Path::new("/repo/mod/blobs");
        assert_eq!(
            relative_target(target, base),
            PathBuf::from("../../.git/blobs/ab/cdef")
        );
    }

    #[test]
    fn test_relative_target_same_directory() {
        let target = Path::new("/repo/dir/file");
        let base = Path::new("/repo/dir");
        assert_eq!(relative_target(target, base), PathBuf::from("file"));
    }

    #[test]
    fn test_relative_target_base_below_target() {
        let target = Path::new("/repo/file");
        let base = Path::new("/repo/a/b/c");
        assert_eq!(
            relative_target(target, base),
            PathBuf::from("../../../file")
        );
    }
}
