//! Storage layer for the modelreg artifact registry.
//!
//! This crate provides the pure `RegistryLayout` path mapping, the
//! `StorageBackend` capability trait with its `LocalFs` implementation
//! (staged directory copies and atomic text writes), sha256 content manifests,
//! required-file package validation, alias and metadata documents, and the
//! append-only promotion audit log.

pub mod alias;
pub mod audit;
pub mod backend;
pub mod layout;
pub mod manifest;
pub mod metadata;
pub mod validate;

pub use alias::{list_aliases, AliasDocument};
pub use audit::{append_event, now_utc_iso, read_events, PromotionEvent};
pub use backend::{LocalFs, StorageBackend};
pub use layout::{
    validate_identifier, PackagePaths, RegistryLayout, HASHED_FILES, MANIFEST_FILE, META_FILE,
    PROMOTIONS_LOG, REQUIRED_FILES,
};
pub use manifest::{read_manifest, sha256_file, verify_manifest, write_manifest, Manifest};
pub use metadata::{merge_defaults, read_metadata, render_document, Metadata};
pub use validate::{missing_required_files, validate_required_files};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fsync a directory to ensure that a preceding `rename()` is durable.
///
/// POSIX does not guarantee a rename survives a crash until the parent
/// directory itself has been synced.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("missing manifest: {}", .0.display())]
    ManifestMissing(PathBuf),
    #[error("manifest is not valid text: {}", .0.display())]
    ManifestCorrupt(PathBuf),
    #[error("manifest expects file missing: {0}")]
    ManifestFileMissing(String),
    #[error("sha256 mismatch for {file}: expected {expected}, got {actual}")]
    DigestMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("package missing required files: {missing:?} in {}", dir.display())]
    MissingRequiredFiles { dir: PathBuf, missing: Vec<String> },
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),
    #[error("invalid {kind}: {reason}")]
    InvalidIdentifier { kind: &'static str, reason: String },
}

impl StoreError {
    /// True for the manifest-driven verification failures.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            StoreError::ManifestMissing(_)
                | StoreError::ManifestFileMissing(_)
                | StoreError::DigestMismatch { .. }
        )
    }
}
