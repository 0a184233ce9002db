use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Mutable pointer from an alias name to one version, overwritten on every
/// promotion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AliasDocument {
    pub task: String,
    pub model_name: String,
    pub alias: String,
    pub version: String,
    pub updated_at: String,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AliasDocument {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Pretty JSON with a trailing newline, as written to `aliases/<alias>.json`.
    pub fn to_document(&self) -> Result<String, StoreError> {
        let mut s = serde_json::to_string_pretty(self)?;
        s.push('\n');
        Ok(s)
    }
}

/// Load every `*.json` alias document in `aliases_dir`, sorted by alias name.
///
/// Unreadable documents are skipped with a warning. A missing directory
/// yields an empty list.
pub fn list_aliases(aliases_dir: &Path) -> Result<Vec<AliasDocument>, StoreError> {
    if !aliases_dir.exists() {
        return Ok(Vec::new());
    }
    let mut docs = Vec::new();
    for entry in fs::read_dir(aliases_dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_str().unwrap_or("");
        if name_str.starts_with('.') || path.extension().and_then(|e| e.to_str()) != Some("json")
        {
            continue;
        }
        match AliasDocument::load(&path) {
            Ok(doc) => docs.push(doc),
            Err(e) => warn!("skipping unreadable alias '{name_str}': {e}"),
        }
    }
    docs.sort_by(|a, b| a.alias.cmp(&b.alias));
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(alias: &str, version: &str) -> AliasDocument {
        AliasDocument {
            task: "t".to_owned(),
            model_name: "m".to_owned(),
            alias: alias.to_owned(),
            version: version.to_owned(),
            updated_at: "2026-01-01T00:00:00+00:00".to_owned(),
            actor: None,
            reason: Some("test".to_owned()),
        }
    }

    #[test]
    fn document_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        let d = doc("latest", "v1");
        fs::write(&path, d.to_document().unwrap()).unwrap();
        assert_eq!(AliasDocument::load(&path).unwrap(), d);
    }

    #[test]
    fn document_has_null_actor_and_trailing_newline() {
        let text = doc("latest", "v1").to_document().unwrap();
        assert!(text.ends_with("}\n"));
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(v["actor"].is_null());
        assert_eq!(v["version"], "v1");
    }

    #[test]
    fn load_tolerates_missing_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        fs::write(
            &path,
            r#"{"task":"t","model_name":"m","alias":"old","version":"v0","updated_at":"x"}"#,
        )
        .unwrap();
        let d = AliasDocument::load(&path).unwrap();
        assert_eq!(d.version, "v0");
        assert_eq!(d.actor, None);
    }

    #[test]
    fn list_sorted_and_skips_junk() {
        let dir = tempfile::tempdir().unwrap();
        for (a, v) in [("production", "v1"), ("latest", "v2")] {
            fs::write(
                dir.path().join(format!("{a}.json")),
                doc(a, v).to_document().unwrap(),
            )
            .unwrap();
        }
        fs::write(dir.path().join("broken.json"), "NOT JSON").unwrap();
        fs::write(dir.path().join(".latest.json.tmp"), "{}").unwrap();
        fs::write(dir.path().join("README"), "x").unwrap();

        let docs = list_aliases(dir.path()).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.alias.as_str()).collect();
        assert_eq!(names, vec!["latest", "production"]);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_aliases(&dir.path().join("aliases")).unwrap().is_empty());
    }
}
