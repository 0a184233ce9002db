//! sha256 content manifests (`sha256sums.txt`).
//!
//! One line per hashed file, `"<64-hex-digest>  <filename>"`, LF terminated.
//! An empty file set produces a zero-byte manifest.

use crate::backend::write_atomic;
use crate::StoreError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const CHUNK_SIZE: usize = 1024 * 1024;

/// Stream `path` through sha256 in fixed-size chunks and return the hex digest.
pub fn sha256_file(path: &Path) -> Result<String, StoreError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub file: String,
    pub digest: String,
}

/// Ordered filename → digest mapping.
///
/// Serializes as a JSON object in entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the digest for `file`, keeping its first position.
    pub fn insert(&mut self, file: impl Into<String>, digest: impl Into<String>) {
        let file = file.into();
        let digest = digest.into();
        if let Some(existing) = self.entries.iter_mut().find(|e| e.file == file) {
            existing.digest = digest;
        } else {
            self.entries.push(ManifestEntry { file, digest });
        }
    }

    pub fn digest(&self, file: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.file == file)
            .map(|e| e.digest.as_str())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the on-disk text form.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            out.push_str(&e.digest);
            out.push_str("  ");
            out.push_str(&e.file);
            out.push('\n');
        }
        out
    }

    /// Parse the text form. Blank lines and lines with fewer than two tokens
    /// are skipped; the first token is the digest and the last is the filename.
    pub fn parse(text: &str) -> Self {
        let mut manifest = Self::new();
        for line in text.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 {
                continue;
            }
            manifest.insert(parts[parts.len() - 1], parts[0]);
        }
        manifest
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for e in &self.entries {
            map.serialize_entry(&e.file, &e.digest)?;
        }
        map.end()
    }
}

/// Hash every name in `include_files` that exists in `dir` and write the
/// manifest to `manifest_path`, in the given order.
///
/// Names absent from `dir` are skipped, and the manifest's own filename is
/// never hashed.
pub fn write_manifest(
    dir: &Path,
    manifest_path: &Path,
    include_files: &[&str],
) -> Result<Manifest, StoreError> {
    let manifest_name = manifest_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    let mut manifest = Manifest::new();
    for name in include_files {
        if manifest_name.as_deref() == Some(*name) {
            continue;
        }
        let path = dir.join(name);
        if !path.exists() {
            debug!("manifest: skipping absent {name}");
            continue;
        }
        manifest.insert(*name, sha256_file(&path)?);
    }

    write_atomic(manifest_path, manifest.to_text().as_bytes())?;
    Ok(manifest)
}

pub fn read_manifest(manifest_path: &Path) -> Result<Manifest, StoreError> {
    if !manifest_path.exists() {
        return Err(StoreError::ManifestMissing(manifest_path.to_path_buf()));
    }
    let text = std::fs::read_to_string(manifest_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            StoreError::ManifestCorrupt(manifest_path.to_path_buf())
        } else {
            StoreError::Io(e)
        }
    })?;
    Ok(Manifest::parse(&text))
}

/// Recompute every digest recorded in the manifest and compare.
///
/// Files in `dir` that the manifest does not list are not checked.
pub fn verify_manifest(dir: &Path, manifest_path: &Path) -> Result<Manifest, StoreError> {
    let expected = read_manifest(manifest_path)?;
    for entry in expected.entries() {
        let path = dir.join(&entry.file);
        if !path.exists() {
            return Err(StoreError::ManifestFileMissing(entry.file.clone()));
        }
        let actual = sha256_file(&path)?;
        if actual != entry.digest {
            return Err(StoreError::DigestMismatch {
                file: entry.file.clone(),
                expected: entry.digest.clone(),
                actual,
            });
        }
    }
    Ok(expected)
}
