use crate::CoreError;
use std::fmt;
use std::str::FromStr;

/// A parsed `<model_name>@<selector>` reference, where the selector is either
/// an alias name or a literal version string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub model_name: String,
    pub selector: String,
}

/// Parse `"human_pbmc@production"` or `"human_pbmc@2026-02-13_001"`.
///
/// Exactly one `@` is required and both sides must be non-empty after
/// trimming.
pub fn parse_model_ref(model_ref: &str) -> Result<ModelRef, CoreError> {
    let invalid = || CoreError::InvalidReference(model_ref.to_owned());

    let (name, selector) = model_ref.split_once('@').ok_or_else(invalid)?;
    if selector.contains('@') {
        return Err(invalid());
    }
    let model_name = name.trim();
    let selector = selector.trim();
    if model_name.is_empty() || selector.is_empty() {
        return Err(invalid());
    }
    Ok(ModelRef {
        model_name: model_name.to_owned(),
        selector: selector.to_owned(),
    })
}

impl FromStr for ModelRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_model_ref(s)
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.model_name, self.selector)
    }
}
