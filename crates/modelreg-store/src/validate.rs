use crate::layout::REQUIRED_FILES;
use crate::StoreError;
use std::path::Path;

/// Required filenames absent from `version_dir`, in [`REQUIRED_FILES`] order.
pub fn missing_required_files(version_dir: &Path) -> Vec<&'static str> {
    REQUIRED_FILES
        .iter()
        .copied()
        .filter(|f| !version_dir.join(f).exists())
        .collect()
}

/// Fail with every missing required filename, not just the first.
pub fn validate_required_files(version_dir: &Path) -> Result<(), StoreError> {
    let missing = missing_required_files(version_dir);
    if missing.is_empty() {
        return Ok(());
    }
    Err(StoreError::MissingRequiredFiles {
        dir: version_dir.to_path_buf(),
        missing: missing.into_iter().map(str::to_owned).collect(),
    })
}
