use crate::{fsync_dir, StoreError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Capability interface for the filesystem-like store beneath a registry root.
///
/// The engine only ever mutates state through these four operations, so a
/// remote object-store variant can replace [`LocalFs`] without the engine
/// changing.
pub trait StorageBackend: Send + Sync {
    /// Create `path` and all missing ancestors. Succeeds if it already exists.
    fn ensure_dirs(&self, path: &Path) -> Result<(), StoreError>;

    /// Existence check; never fails.
    fn exists(&self, path: &Path) -> bool;

    /// Recursively copy `src` into a new directory `dst`.
    ///
    /// Must fail with [`StoreError::DestinationExists`] rather than merge into
    /// an existing `dst`.
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<(), StoreError>;

    /// Replace `path` with `content` so observers see either the old file or
    /// the complete new one.
    fn atomic_write_text(&self, path: &Path, content: &str) -> Result<(), StoreError>;
}

/// Local filesystem backend.
///
/// `copy_tree` stages into a hidden sibling directory and renames it into
/// place, so a crash mid-copy never leaves a half-populated `dst` behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl StorageBackend for LocalFs {
    fn ensure_dirs(&self, path: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<(), StoreError> {
        if dst.exists() {
            return Err(StoreError::DestinationExists(dst.to_path_buf()));
        }
        let parent = match dst.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let name = dst
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        // Dropping the guard removes the staging tree on every early return.
        let staging = tempfile::Builder::new()
            .prefix(&format!(".staging-{name}-"))
            .tempdir_in(parent)?;

        let mut count = 0;
        copy_recursive(src, staging.path(), &mut count)?;
        // The staging dir is created 0700; give the version dir the source's mode.
        fs::set_permissions(staging.path(), fs::metadata(src)?.permissions())?;
        debug!(
            "staged {count} files from {} in {}",
            src.display(),
            staging.path().display()
        );

        if let Err(e) = fs::rename(staging.path(), dst) {
            if dst.exists() {
                return Err(StoreError::DestinationExists(dst.to_path_buf()));
            }
            return Err(StoreError::Io(e));
        }
        fsync_dir(parent)?;
        Ok(())
    }

    fn atomic_write_text(&self, path: &Path, content: &str) -> Result<(), StoreError> {
        write_atomic(path, content.as_bytes())
    }
}

/// Write `data` to a temporary file next to `path`, then rename it over `path`.
///
/// The temporary file is deleted if any step before the rename fails.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let prefix = path
        .file_name()
        .map(|n| format!(".{}.", n.to_string_lossy()))
        .unwrap_or_else(|| ".tmp.".to_owned());
    let mut tmp: NamedTempFile = tempfile::Builder::new()
        .prefix(&prefix)
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    fsync_dir(dir)?;
    Ok(())
}

fn copy_recursive(src: &Path, dst: &Path, count: &mut usize) -> Result<(), StoreError> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_recursive(&src_path, &dst_path, count)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
            *count += 1;
        }
    }
    Ok(())
}
