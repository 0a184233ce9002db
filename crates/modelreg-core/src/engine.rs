use crate::config::{BackendKind, RegistryConfig};
use crate::reference::parse_model_ref;
use crate::CoreError;
use modelreg_store::{
    append_event, merge_defaults, now_utc_iso, read_events, render_document,
    validate_identifier, validate_required_files, verify_manifest, write_manifest,
    AliasDocument, LocalFs, Manifest, Metadata, PromotionEvent, RegistryLayout, StorageBackend,
    HASHED_FILES,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DEFAULT_ALIAS: &str = "latest";
const REGISTER_REASON: &str = "register_model";

/// Central registry engine.
///
/// Owns the path layout and one storage backend, and is the only component
/// that enforces version immutability, package integrity and alias-to-version
/// consistency. Callers build one instance from configuration and pass it
/// around explicitly.
pub struct Registry {
    config: RegistryConfig,
    layout: RegistryLayout,
    backend: Box<dyn StorageBackend>,
}

/// Optional knobs for [`Registry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Alias to promote the new version to. `None` or an empty string skips
    /// promotion.
    pub set_alias: Option<String>,
    pub actor: Option<String>,
    pub reason: Option<String>,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            set_alias: Some(DEFAULT_ALIAS.to_owned()),
            actor: None,
            reason: None,
        }
    }
}

impl RegisterOptions {
    /// Register without touching any alias.
    pub fn no_alias() -> Self {
        Self {
            set_alias: None,
            ..Self::default()
        }
    }
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterResult {
    pub ok: bool,
    pub task: String,
    pub model_name: String,
    pub version: String,
    pub package_path: PathBuf,
    pub hashes: Manifest,
    pub alias_set: Option<String>,
}

/// A resolved package directory together with its parsed metadata document.
#[derive(Debug, Clone, Serialize)]
pub struct PackageMetadata {
    pub package_dir: PathBuf,
    pub meta: Metadata,
}

impl Registry {
    /// Build a registry over the backend named in `config`.
    ///
    /// Only `LocalFs` exists today and cannot fail to open; the `Result` is
    /// the seam for backends that connect or check on construction.
    pub fn new(config: RegistryConfig) -> Result<Self, CoreError> {
        let backend: Box<dyn StorageBackend> = match config.backend {
            BackendKind::LocalFs => Box::new(LocalFs::new()),
        };
        Ok(Self::with_backend(config, backend))
    }

    pub fn with_backend(config: RegistryConfig, backend: Box<dyn StorageBackend>) -> Self {
        let layout = RegistryLayout::new(&config.root);
        Self {
            config,
            layout,
            backend,
        }
    }

    pub fn from_env() -> Result<Self, CoreError> {
        Self::new(RegistryConfig::from_env()?)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    /// Register a new immutable version from the files in `artifacts_dir`.
    ///
    /// A failure after the package has been placed (metadata write, required
    /// file validation, manifest) leaves the version directory in place.
    pub fn register(
        &self,
        task: &str,
        model_name: &str,
        version: &str,
        artifacts_dir: &Path,
        metadata: Metadata,
        options: &RegisterOptions,
    ) -> Result<RegisterResult, CoreError> {
        validate_identifier("task", task)?;
        validate_identifier("model name", model_name)?;
        validate_identifier("version", version)?;
        let alias = options
            .set_alias
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());
        if let Some(alias) = alias {
            validate_identifier("alias", alias)?;
        }

        if !artifacts_dir.exists() {
            return Err(CoreError::Validation(format!(
                "artifacts_dir does not exist: {}",
                artifacts_dir.display()
            )));
        }
        if !artifacts_dir.is_dir() {
            return Err(CoreError::Validation(format!(
                "artifacts_dir is not a directory: {}",
                artifacts_dir.display()
            )));
        }

        info!("registering {task}/{model_name}@{version}");
        self.backend
            .ensure_dirs(&self.layout.versions_dir(task, model_name))?;
        self.backend
            .ensure_dirs(&self.layout.aliases_dir(task, model_name))?;
        self.backend
            .ensure_dirs(&self.layout.audit_dir(task, model_name))?;

        let package = self.layout.package(task, model_name, version);
        let version_dir = package.version_dir().to_path_buf();
        if self.backend.exists(&version_dir) {
            return Err(CoreError::AlreadyExists(format!(
                "{task}/{model_name}@{version}"
            )));
        }

        self.backend.copy_tree(artifacts_dir, &version_dir)?;
        debug!("copied {} -> {}", artifacts_dir.display(), version_dir.display());

        let meta = merge_defaults(metadata, task, model_name, version, &now_utc_iso());
        self.backend
            .atomic_write_text(&package.meta_path(), &render_document(&meta)?)?;

        validate_required_files(&version_dir)?;

        let hashes = write_manifest(&version_dir, &package.manifest_path(), HASHED_FILES)?;
        debug!("manifest written with {} entries", hashes.len());

        let alias_set = match alias {
            Some(alias) => {
                let reason = options
                    .reason
                    .clone()
                    .unwrap_or_else(|| REGISTER_REASON.to_owned());
                self.promote(
                    task,
                    model_name,
                    alias,
                    version,
                    options.actor.as_deref(),
                    Some(&reason),
                )?;
                Some(alias.to_owned())
            }
            None => None,
        };

        Ok(RegisterResult {
            ok: true,
            task: task.to_owned(),
            model_name: model_name.to_owned(),
            version: version.to_owned(),
            package_path: version_dir,
            hashes,
            alias_set,
        })
    }

    /// Resolve `<model>@<alias_or_version>` to a version directory.
    ///
    /// Alias documents take precedence over literal version names. When
    /// `verify` is set, or the registry runs with strict verification, the
    /// package is fully checked before its path is returned.
    pub fn resolve(&self, task: &str, model_ref: &str, verify: bool) -> Result<PathBuf, CoreError> {
        let r = parse_model_ref(model_ref)?;
        validate_identifier("task", task)?;
        validate_identifier("model name", &r.model_name)?;
        validate_identifier("selector", &r.selector)?;

        let alias_path = self.layout.alias_path(task, &r.model_name, &r.selector);
        let version = if self.backend.exists(&alias_path) {
            let doc = AliasDocument::load(&alias_path)?;
            validate_identifier("version", &doc.version)?;
            debug!("alias {} -> {}", r.selector, doc.version);
            doc.version
        } else {
            r.selector.clone()
        };

        let package = self.layout.package(task, &r.model_name, &version);
        let version_dir = package.version_dir();
        if !self.backend.exists(version_dir) {
            return Err(CoreError::NotFound(format!(
                "{task}/{}@{version}",
                r.model_name
            )));
        }

        if verify || self.config.strict_verify {
            validate_required_files(version_dir)?;
            verify_manifest(version_dir, &package.manifest_path())?;
            debug!("verified {}", version_dir.display());
        }
        Ok(version_dir.to_path_buf())
    }

    /// Point `alias` at `version` and record the promotion in the audit log.
    pub fn promote(
        &self,
        task: &str,
        model_name: &str,
        alias: &str,
        version: &str,
        actor: Option<&str>,
        reason: Option<&str>,
    ) -> Result<AliasDocument, CoreError> {
        validate_identifier("task", task)?;
        validate_identifier("model name", model_name)?;
        validate_identifier("alias", alias)?;
        validate_identifier("version", version)?;

        let version_dir = self.layout.version_dir(task, model_name, version);
        if !self.backend.exists(&version_dir) {
            return Err(CoreError::NotFound(format!(
                "cannot promote missing version {task}/{model_name}@{version}"
            )));
        }

        let ts = now_utc_iso();
        let doc = AliasDocument {
            task: task.to_owned(),
            model_name: model_name.to_owned(),
            alias: alias.to_owned(),
            version: version.to_owned(),
            updated_at: ts.clone(),
            actor: actor.map(str::to_owned),
            reason: reason.map(str::to_owned),
        };
        self.backend
            .ensure_dirs(&self.layout.aliases_dir(task, model_name))?;
        self.backend.atomic_write_text(
            &self.layout.alias_path(task, model_name, alias),
            &doc.to_document()?,
        )?;

        let event = PromotionEvent {
            task: doc.task.clone(),
            model_name: doc.model_name.clone(),
            alias: doc.alias.clone(),
            version: doc.version.clone(),
            actor: doc.actor.clone(),
            reason: doc.reason.clone(),
            ts_utc: ts,
        };
        append_event(&self.layout.promotions_log(task, model_name), &event)?;

        info!("promoted {task}/{model_name}: {alias} -> {version}");
        Ok(doc)
    }

    /// Full integrity check of the referenced package.
    pub fn verify(&self, task: &str, model_ref: &str) -> Result<(), CoreError> {
        self.resolve(task, model_ref, true).map(|_| ())
    }

    /// Model names registered under `task`, sorted.
    pub fn list_models(&self, task: &str) -> Result<Vec<String>, CoreError> {
        validate_identifier("task", task)?;
        list_subdirs(&self.layout.models_dir(task))
    }

    /// Version names of a model, sorted. Hidden staging entries are skipped.
    pub fn list_versions(&self, task: &str, model_name: &str) -> Result<Vec<String>, CoreError> {
        validate_identifier("task", task)?;
        validate_identifier("model name", model_name)?;
        list_subdirs(&self.layout.versions_dir(task, model_name))
    }

    pub fn list_aliases(
        &self,
        task: &str,
        model_name: &str,
    ) -> Result<Vec<AliasDocument>, CoreError> {
        validate_identifier("task", task)?;
        validate_identifier("model name", model_name)?;
        Ok(modelreg_store::list_aliases(
            &self.layout.aliases_dir(task, model_name),
        )?)
    }

    pub fn read_metadata(
        &self,
        task: &str,
        model_ref: &str,
        verify: bool,
    ) -> Result<PackageMetadata, CoreError> {
        let package_dir = self.resolve(task, model_ref, verify)?;
        let meta_path = modelreg_store::PackagePaths::new(&package_dir).meta_path();
        if !meta_path.exists() {
            return Err(CoreError::NotFound(format!(
                "metadata document {}",
                meta_path.display()
            )));
        }
        let meta = modelreg_store::read_metadata(&meta_path)?;
        Ok(PackageMetadata { package_dir, meta })
    }

    pub fn promotion_history(
        &self,
        task: &str,
        model_name: &str,
    ) -> Result<Vec<PromotionEvent>, CoreError> {
        validate_identifier("task", task)?;
        validate_identifier("model name", model_name)?;
        Ok(read_events(&self.layout.promotions_log(task, model_name))?)
    }
}

fn list_subdirs(dir: &Path) -> Result<Vec<String>, CoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}
