//! Registry engine for modelreg.
//!
//! This crate ties the storage layer together into the `Registry`: the one
//! place that enforces version immutability, package integrity, and
//! alias-to-version consistency while implementing register, resolve, promote
//! and verify. It also provides the `RegistryConfig` loader and the
//! `<model>@<selector>` reference parser.

pub mod config;
pub mod engine;
pub mod reference;

pub use config::{BackendKind, ConfigLayer, RegistryConfig, ENV_BACKEND, ENV_ROOT, ENV_STRICT};
pub use engine::{PackageMetadata, RegisterOptions, RegisterResult, Registry};
pub use reference::{parse_model_ref, ModelRef};

use modelreg_store::StoreError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("registry not configured: {0}")]
    NotConfigured(String),
    #[error("unsupported storage backend '{0}' (only 'localfs' is available)")]
    UnsupportedBackend(String),
    #[error("invalid model reference '{0}': expected '<model_name>@<alias_or_version>'")]
    InvalidReference(String),
    #[error("{0}")]
    InvalidIdentifier(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("model version already exists: {0}")]
    AlreadyExists(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("model package missing required files: {missing:?} in {}", dir.display())]
    IncompletePackage { dir: PathBuf, missing: Vec<String> },
    #[error("integrity check failed for '{file}': {reason}")]
    Integrity { file: String, reason: String },
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of a [`CoreError`].
///
/// Everything except `Unclassified` is a recoverable domain condition the
/// caller must resolve; `Unclassified` signals an environment or system fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotConfigured,
    InvalidReference,
    NotFound,
    AlreadyExists,
    Validation,
    Integrity,
    Unclassified,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotConfigured => "not_configured",
            ErrorKind::InvalidReference => "invalid_reference",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Validation => "validation",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotConfigured(_) | CoreError::UnsupportedBackend(_) => {
                ErrorKind::NotConfigured
            }
            CoreError::InvalidReference(_) => ErrorKind::InvalidReference,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            CoreError::InvalidIdentifier(_)
            | CoreError::Validation(_)
            | CoreError::IncompletePackage { .. } => ErrorKind::Validation,
            CoreError::Integrity { .. } => ErrorKind::Integrity,
            CoreError::Store(_) | CoreError::Io(_) | CoreError::Serialization(_) => {
                ErrorKind::Unclassified
            }
        }
    }

    /// True for the typed registry taxonomy, false for system faults.
    pub fn is_domain_error(&self) -> bool {
        self.kind() != ErrorKind::Unclassified
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MissingRequiredFiles { dir, missing } => {
                CoreError::IncompletePackage { dir, missing }
            }
            StoreError::ManifestMissing(path) => CoreError::Integrity {
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                reason: format!("missing manifest: {}", path.display()),
            },
            StoreError::ManifestCorrupt(path) => CoreError::Integrity {
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                reason: format!("unreadable manifest: {}", path.display()),
            },
            StoreError::ManifestFileMissing(file) => CoreError::Integrity {
                file,
                reason: "manifest expects file missing".to_owned(),
            },
            StoreError::DigestMismatch {
                file,
                expected,
                actual,
            } => CoreError::Integrity {
                file,
                reason: format!("sha256 mismatch: expected {expected}, got {actual}"),
            },
            StoreError::DestinationExists(path) => {
                CoreError::AlreadyExists(path.display().to_string())
            }
            e @ StoreError::InvalidIdentifier { .. } => CoreError::InvalidIdentifier(e.to_string()),
            other => CoreError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_mismatch_becomes_integrity_naming_file() {
        let e: CoreError = StoreError::DigestMismatch {
            file: "model.pt".to_owned(),
            expected: "a".to_owned(),
            actual: "b".to_owned(),
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::Integrity);
        assert!(e.to_string().contains("model.pt"));
    }

    #[test]
    fn manifest_missing_becomes_integrity() {
        let e: CoreError = StoreError::ManifestMissing(PathBuf::from("/v/sha256sums.txt")).into();
        match e {
            CoreError::Integrity { ref file, .. } => assert_eq!(file, "sha256sums.txt"),
            ref other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn corrupt_manifest_becomes_integrity() {
        let e: CoreError = StoreError::ManifestCorrupt(PathBuf::from("/v/sha256sums.txt")).into();
        assert_eq!(e.kind(), ErrorKind::Integrity);
        assert!(e.is_domain_error());
        assert!(e.to_string().contains("sha256sums.txt"));
    }

    #[test]
    fn missing_required_files_becomes_validation() {
        let e: CoreError = StoreError::MissingRequiredFiles {
            dir: PathBuf::from("/v"),
            missing: vec!["metrics.json".to_owned()],
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::Validation);
        assert!(e.to_string().contains("metrics.json"));
    }

    #[test]
    fn destination_exists_becomes_already_exists() {
        let e: CoreError = StoreError::DestinationExists(PathBuf::from("/v1")).into();
        assert_eq!(e.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn io_stays_unclassified() {
        let e: CoreError = StoreError::Io(std::io::Error::other("disk full")).into();
        assert_eq!(e.kind(), ErrorKind::Unclassified);
        assert!(!e.is_domain_error());
    }

    #[test]
    fn error_kind_display_matches_serde() {
        for kind in [
            ErrorKind::NotConfigured,
            ErrorKind::InvalidReference,
            ErrorKind::NotFound,
            ErrorKind::AlreadyExists,
            ErrorKind::Validation,
            ErrorKind::Integrity,
            ErrorKind::Unclassified,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
