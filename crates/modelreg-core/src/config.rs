use crate::CoreError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_ROOT: &str = "MODELREG_ROOT";
pub const ENV_BACKEND: &str = "MODELREG_BACKEND";
pub const ENV_STRICT: &str = "MODELREG_STRICT_VERIFY";

/// Storage backend selector. Only the local filesystem exists today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    LocalFs,
}

impl FromStr for BackendKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "localfs" => Ok(BackendKind::LocalFs),
            other => Err(CoreError::UnsupportedBackend(other.to_owned())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::LocalFs => f.write_str("localfs"),
        }
    }
}

/// Process-wide registry settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub root: PathBuf,
    pub backend: BackendKind,
    /// Verify the full manifest on every resolve, not only on explicit verify.
    pub strict_verify: bool,
}

impl RegistryConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backend: BackendKind::LocalFs,
            strict_verify: true,
        }
    }

    #[must_use]
    pub fn with_strict_verify(mut self, strict: bool) -> Self {
        self.strict_verify = strict;
        self
    }

    /// Build from `MODELREG_ROOT`, `MODELREG_BACKEND` and
    /// `MODELREG_STRICT_VERIFY`.
    pub fn from_env() -> Result<Self, CoreError> {
        ConfigLayer::from_env().finish()
    }

    /// TOML file values, overridden by any environment variables that are set.
    pub fn resolve(config_file: Option<&Path>) -> Result<Self, CoreError> {
        let base = match config_file {
            Some(path) => ConfigLayer::load(path)?,
            None => ConfigLayer::default(),
        };
        base.merge(ConfigLayer::from_env()).finish()
    }
}

/// One partial source of configuration. Layers are merged with later layers
/// winning, then [`finish`](Self::finish)ed into a [`RegistryConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub root: Option<String>,
    pub backend: Option<String>,
    pub strict_verify: Option<bool>,
}

impl ConfigLayer {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let root = lookup(ENV_ROOT).filter(|v| !v.trim().is_empty());
        let backend = lookup(ENV_BACKEND).filter(|v| !v.trim().is_empty());
        let strict_verify = lookup(ENV_STRICT).map(|v| parse_strict_flag(&v));
        Self {
            root,
            backend,
            strict_verify,
        }
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::NotConfigured(format!("cannot read config {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            CoreError::NotConfigured(format!("invalid config {}: {e}", path.display()))
        })
    }

    #[must_use]
    pub fn merge(self, over: ConfigLayer) -> Self {
        Self {
            root: over.root.or(self.root),
            backend: over.backend.or(self.backend),
            strict_verify: over.strict_verify.or(self.strict_verify),
        }
    }

    pub fn finish(self) -> Result<RegistryConfig, CoreError> {
        let root = self
            .root
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                CoreError::NotConfigured(format!(
                    "{ENV_ROOT} is not set. Example: export {ENV_ROOT}=~/model_registry"
                ))
            })?;
        let backend = match self.backend {
            Some(b) => b.parse()?,
            None => BackendKind::LocalFs,
        };
        Ok(RegistryConfig {
            root: expand_tilde(&root),
            backend,
            strict_verify: self.strict_verify.unwrap_or(true),
        })
    }
}

/// Strict verification stays on unless explicitly disabled.
fn parse_strict_flag(value: &str) -> bool {
    !matches!(value.trim(), "0" | "false" | "False")
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
