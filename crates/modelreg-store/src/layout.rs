use crate::StoreError;
use std::path::{Path, PathBuf};

/// Files every registered package must contain.
pub const REQUIRED_FILES: &[&str] = &[
    "model.pt",
    "model_genes.txt",
    "label_map.json",
    "model_meta.json",
    "metrics.json",
    "feature_schema.json",
    "sha256sums.txt",
];

/// Files covered by the content manifest. The manifest never lists itself.
pub const HASHED_FILES: &[&str] = &[
    "model.pt",
    "model_genes.txt",
    "label_map.json",
    "model_meta.json",
    "metrics.json",
    "feature_schema.json",
];

pub const META_FILE: &str = "model_meta.json";
pub const MANIFEST_FILE: &str = "sha256sums.txt";
pub const PROMOTIONS_LOG: &str = "promotions.jsonl";

/// Directory layout of a registry root.
///
/// ```text
/// <root>/tasks/<task>/models/<model>/
///     versions/<version>/
///     aliases/<alias>.json
///     audit/promotions.jsonl
/// ```
///
/// Every method is a pure path computation; nothing here touches the
/// filesystem. Callers validate identifiers with [`validate_identifier`]
/// before asking for paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLayout {
    root: PathBuf,
}

impl RegistryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn task_dir(&self, task: &str) -> PathBuf {
        self.root.join("tasks").join(task)
    }

    #[inline]
    pub fn models_dir(&self, task: &str) -> PathBuf {
        self.task_dir(task).join("models")
    }

    #[inline]
    pub fn model_dir(&self, task: &str, model: &str) -> PathBuf {
        self.models_dir(task).join(model)
    }

    #[inline]
    pub fn versions_dir(&self, task: &str, model: &str) -> PathBuf {
        self.model_dir(task, model).join("versions")
    }

    #[inline]
    pub fn version_dir(&self, task: &str, model: &str, version: &str) -> PathBuf {
        self.versions_dir(task, model).join(version)
    }

    #[inline]
    pub fn aliases_dir(&self, task: &str, model: &str) -> PathBuf {
        self.model_dir(task, model).join("aliases")
    }

    #[inline]
    pub fn alias_path(&self, task: &str, model: &str, alias: &str) -> PathBuf {
        self.aliases_dir(task, model).join(format!("{alias}.json"))
    }

    #[inline]
    pub fn audit_dir(&self, task: &str, model: &str) -> PathBuf {
        self.model_dir(task, model).join("audit")
    }

    #[inline]
    pub fn promotions_log(&self, task: &str, model: &str) -> PathBuf {
        self.audit_dir(task, model).join(PROMOTIONS_LOG)
    }

    pub fn package(&self, task: &str, model: &str, version: &str) -> PackagePaths {
        PackagePaths::new(self.version_dir(task, model, version))
    }
}

/// Paths of the engine-managed files inside one version directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePaths {
    version_dir: PathBuf,
}

impl PackagePaths {
    pub fn new(version_dir: impl Into<PathBuf>) -> Self {
        Self {
            version_dir: version_dir.into(),
        }
    }

    #[inline]
    pub fn version_dir(&self) -> &Path {
        &self.version_dir
    }

    #[inline]
    pub fn meta_path(&self) -> PathBuf {
        self.version_dir.join(META_FILE)
    }

    #[inline]
    pub fn manifest_path(&self) -> PathBuf {
        self.version_dir.join(MANIFEST_FILE)
    }
}

/// Reject identifiers that cannot safely be used as a single path segment.
///
/// `kind` names the identifier in the error ("task", "model", ...).
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), StoreError> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value == "." || value == ".." {
        Some("must not be '.' or '..'")
    } else if value.starts_with('.') {
        Some("must not start with '.'")
    } else if value.contains(['/', '\\', '\0']) {
        Some("must not contain path separators or NUL")
    } else if value.trim() != value {
        Some("must not have leading or trailing whitespace")
    } else {
        None
    };
    match reason {
        Some(r) => Err(StoreError::InvalidIdentifier {
            kind,
            reason: format!("'{value}' {r}"),
        }),
        None => Ok(()),
    }
}
